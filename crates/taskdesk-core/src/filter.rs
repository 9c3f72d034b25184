use std::collections::BTreeSet;

use chrono::{
  DateTime,
  Utc
};
use tracing::trace;
use uuid::Uuid;

use crate::task::{
  Priority,
  is_due_within,
  is_overdue
};
use crate::view::TaskEntry;

pub const ALL_KEY: &str = "all";

/// Status/priority axis. Unknown keys
/// map to `All` so a bad button never
/// hides the whole list.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Pending,
  Completed,
  High
}

impl StatusFilter {
  pub fn from_key(key: &str) -> Self {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "pending" => Self::Pending,
      | "completed" => Self::Completed,
      | "high" => Self::High,
      | "all" => Self::All,
      | other => {
        trace!(
          key = other,
          "unknown status filter; \
           showing all"
        );
        Self::All
      }
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      | Self::All => ALL_KEY,
      | Self::Pending => "pending",
      | Self::Completed => "completed",
      | Self::High => "high"
    }
  }

  pub fn matches(
    self,
    entry: &TaskEntry
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Pending => {
        !entry.completed
      }
      | Self::Completed => {
        entry.completed
      }
      | Self::High => {
        entry.priority == Priority::High
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Named(String)
}

impl CategoryFilter {
  pub fn from_key(key: &str) -> Self {
    let key = key.trim();
    if key.is_empty()
      || key.eq_ignore_ascii_case(ALL_KEY)
    {
      Self::All
    } else {
      Self::Named(key.to_string())
    }
  }

  pub fn key(&self) -> &str {
    match self {
      | Self::All => ALL_KEY,
      | Self::Named(name) => name
    }
  }

  pub fn matches(
    &self,
    entry: &TaskEntry
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Named(name) => {
        entry.category == *name
      }
    }
  }
}

/// One active value per axis; the
/// visible set is the intersection.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
)]
pub struct FilterState {
  pub category: CategoryFilter,
  pub status:   StatusFilter
}

impl FilterState {
  pub fn matches(
    &self,
    entry: &TaskEntry
  ) -> bool {
    self.category.matches(entry)
      && self.status.matches(entry)
  }

  pub fn is_unfiltered(&self) -> bool {
    self.category == CategoryFilter::All
      && self.status == StatusFilter::All
  }
}

/// Date-based views a full task view
/// can narrow to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum QuickFilter {
  Overdue {
    now: DateTime<Utc>
  },
  DueSoon {
    now:  DateTime<Utc>,
    days: i64
  }
}

impl QuickFilter {
  pub fn matches(
    self,
    entry: &TaskEntry
  ) -> bool {
    match self {
      | Self::Overdue {
        now
      } => is_overdue(
        entry.due,
        entry.completed,
        now
      ),
      | Self::DueSoon {
        now,
        days
      } => is_due_within(
        entry.due,
        entry.completed,
        now,
        days
      )
    }
  }
}

#[tracing::instrument(skip(
  entries, state
))]
pub fn visible_ids(
  entries: &[TaskEntry],
  state: &FilterState
) -> BTreeSet<Uuid> {
  entries
    .iter()
    .filter(|entry| state.matches(entry))
    .map(|entry| entry.id)
    .collect()
}
