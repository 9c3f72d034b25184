//! The UI surface the coordinator drives.
//!
//! Controls and panels are addressed by logical name; a front-end binds
//! those names to its widgets once, when it is constructed.

use std::fmt;

use uuid::Uuid;

use crate::export::ExportArtifact;

/// Controls that show a loading state while their call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    Login,
    RegisterSubmit,
    Export,
}

impl Control {
    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::RegisterSubmit => "register-submit",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    Login,
    UserInfo,
    Main,
    Registration,
}

/// Single-select button groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterGroup {
    Category,
    Status,
}

/// An entry in the assignee picker. `None` is the implicit "self" entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeOption {
    pub user_id: Option<Uuid>,
    pub label: String,
}

impl AssigneeOption {
    pub fn myself() -> Self {
        Self {
            user_id: None,
            label: "Myself".to_string(),
        }
    }
}

pub trait Shell {
    fn set_panel_visible(&mut self, panel: Panel, visible: bool);

    /// Loading state also disables the control.
    fn set_loading(&mut self, control: Control, loading: bool);

    fn set_welcome(&mut self, text: &str);

    fn set_username_input(&mut self, value: &str);

    fn reset_registration_form(&mut self);

    fn set_assignee_options(&mut self, options: &[AssigneeOption]);

    /// Marks `key` active in `group`, clearing the group's previous choice.
    fn mark_active(&mut self, group: FilterGroup, key: &str);

    fn offer_download(&mut self, artifact: &ExportArtifact) -> anyhow::Result<()>;
}
