//! Session coordinator.
//!
//! [`App`] owns every collaborator and exposes one handler per UI control.
//! Handlers take `&mut self`, so two session-mutating calls can never
//! overlap on the same application.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppSettings;
use crate::controller::{TaskController, TaskService, UserController, UserService};
use crate::error::{AppError, AppResult};
use crate::export::ExportArtifact;
use crate::filter::{CategoryFilter, FilterState, StatusFilter, visible_ids};
use crate::repository::{TaskRepository, UserRepository};
use crate::session::Session;
use crate::shell::{AssigneeOption, Control, FilterGroup, Panel, Shell};
use crate::storage::{FileStorage, Storage};
use crate::task::{NewTask, Priority};
use crate::user::{NewUser, User};
use crate::view::{MessageLevel, TaskView, ViewBinding};

const LOGOUT_MESSAGE: &str = "You have been logged out";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Task form input. The assignee is named by username; blank means the
/// current user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
}

pub struct App {
    settings: AppSettings,
    storage: Arc<dyn Storage>,
    users: Arc<dyn UserService>,
    tasks: Arc<dyn TaskService>,
    view: ViewBinding,
    shell: Box<dyn Shell>,
    session: Session,
    filters: FilterState,
    directory: Vec<User>,
    registration_open: bool,
    clock: Clock,
}

/// Runs `call` for at least `min`, so a loading indicator stays visible
/// long enough to be seen.
async fn with_min_display<F: Future>(min: Duration, call: F) -> F::Output {
    let (output, ()) = tokio::join!(call, tokio::time::sleep(min));
    output
}

fn apply_fallback(view: &mut dyn TaskView, filters: &FilterState) {
    let visible = visible_ids(view.entries(), filters);
    debug!(visible = visible.len(), "applying coordinator-computed visibility");
    view.set_visible(&visible);
}

impl App {
    /// Opens file storage and wires the stock controllers. A storage failure
    /// is reported once through the view and aborts setup.
    #[instrument(skip_all, fields(data_dir = %settings.data_dir.display()))]
    pub fn initialize(
        settings: AppSettings,
        mut view: ViewBinding,
        shell: Box<dyn Shell>,
    ) -> AppResult<Self> {
        let storage: Arc<dyn Storage> =
            match FileStorage::open(&settings.data_dir, &settings.namespace, &settings.version) {
                Ok(storage) => Arc::new(storage),
                Err(err) => {
                    let fatal = AppError::environment(format!(
                        "failed to initialize application: {err:#}"
                    ));
                    error!(error = %fatal, "initialization aborted");
                    view.view_mut()
                        .show_message(&fatal.to_string(), MessageLevel::Error);
                    return Err(fatal);
                }
            };

        let user_repo = Arc::new(UserRepository::new(Arc::clone(&storage)));
        let task_repo = Arc::new(TaskRepository::new(Arc::clone(&storage)));
        if settings.seed_demo_users {
            seed_demo_users(&user_repo, Utc::now());
        }

        let users = Arc::new(UserController::new(Arc::clone(&user_repo)));
        let tasks = Arc::new(TaskController::new(task_repo, user_repo));
        info!("application initialized");
        Ok(Self::with_services(settings, storage, users, tasks, view, shell))
    }

    pub fn with_services(
        settings: AppSettings,
        storage: Arc<dyn Storage>,
        users: Arc<dyn UserService>,
        tasks: Arc<dyn TaskService>,
        view: ViewBinding,
        shell: Box<dyn Shell>,
    ) -> Self {
        let mut app = Self {
            settings,
            storage,
            users,
            tasks,
            view,
            shell,
            session: Session::default(),
            filters: FilterState::default(),
            directory: vec![],
            registration_open: false,
            clock: Arc::new(Utc::now),
        };
        app.show_login_screen();
        app
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn view(&self) -> &dyn TaskView {
        self.view.view()
    }

    pub fn directory(&self) -> &[User] {
        &self.directory
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_registration_open(&self) -> bool {
        self.registration_open
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn notify(&mut self, text: &str, level: MessageLevel) {
        debug!(level = %level, text, "user message");
        self.view.view_mut().show_message(text, level);
    }

    fn report(&mut self, err: &AppError) {
        warn!(kind = err.kind(), error = %err, "operation failed");
        self.notify(&err.to_string(), MessageLevel::Error);
    }

    fn require_session(&mut self) -> AppResult<Uuid> {
        match self.session.current_user_id() {
            Some(id) => Ok(id),
            None => {
                let err = AppError::no_session();
                self.report(&err);
                Err(err)
            }
        }
    }

    fn show_login_screen(&mut self) {
        self.shell.set_panel_visible(Panel::Login, true);
        self.shell.set_panel_visible(Panel::UserInfo, false);
        self.shell.set_panel_visible(Panel::Main, false);
        self.shell.set_username_input("");
    }

    fn show_main_screen(&mut self, user: &User) {
        self.shell.set_panel_visible(Panel::Login, false);
        self.shell.set_panel_visible(Panel::UserInfo, true);
        self.shell.set_panel_visible(Panel::Main, true);
        self.shell
            .set_welcome(&format!("Welcome, {}!", user.display_name()));
    }

    #[instrument(skip(self))]
    pub async fn login(&mut self, username: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            let err = AppError::validation("username required");
            self.report(&err);
            return Err(err);
        }

        let users = Arc::clone(&self.users);
        self.shell.set_loading(Control::Login, true);
        let result = with_min_display(self.settings.min_loading, users.login(username)).await;
        self.shell.set_loading(Control::Login, false);

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        let user = reply.data;
        self.session.begin(user.clone());
        self.tasks.set_current_user(Some(user.id));
        self.show_main_screen(&user);
        self.load_directory().await;
        // A failed first load is already reported; the login stands.
        let _ = self.reload_tasks().await;
        self.notify(&reply.message, MessageLevel::Success);
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn logout(&mut self) {
        let users = Arc::clone(&self.users);
        let message = match users.logout().await {
            Ok(reply) => reply.message,
            Err(err) => {
                warn!(error = %err, "controller logout failed; clearing session anyway");
                LOGOUT_MESSAGE.to_string()
            }
        };

        self.session.end();
        self.tasks.set_current_user(None);
        self.directory.clear();
        self.view.view_mut().refresh(&[]);
        self.show_login_screen();
        self.notify(&message, MessageLevel::Info);
    }

    pub fn open_registration(&mut self) {
        self.registration_open = true;
        self.shell.set_panel_visible(Panel::Registration, true);
    }

    pub fn cancel_registration(&mut self) {
        self.close_registration();
        self.shell.set_loading(Control::RegisterSubmit, false);
    }

    fn close_registration(&mut self) {
        self.registration_open = false;
        self.shell.set_panel_visible(Panel::Registration, false);
        self.shell.reset_registration_form();
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&mut self, form: NewUser) -> AppResult<User> {
        let fields = form.trimmed();
        let prefill = fields.username.clone();

        let users = Arc::clone(&self.users);
        self.shell.set_loading(Control::RegisterSubmit, true);
        let result = with_min_display(self.settings.min_loading, users.register(fields)).await;
        self.shell.set_loading(Control::RegisterSubmit, false);

        match result {
            Ok(reply) => {
                self.close_registration();
                self.notify(&reply.message, MessageLevel::Success);
                self.shell.set_username_input(&prefill);
                Ok(reply.data)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    async fn load_directory(&mut self) {
        let users = Arc::clone(&self.users);
        match users.get_all_users().await {
            Ok(reply) => {
                let me = self.session.current_user_id();
                let mut options = vec![AssigneeOption::myself()];
                options.extend(
                    reply
                        .data
                        .iter()
                        .filter(|u| Some(u.id) != me)
                        .map(|u| AssigneeOption {
                            user_id: Some(u.id),
                            label: u.display_name().to_string(),
                        }),
                );
                self.shell.set_assignee_options(&options);
                self.directory = reply.data;
            }
            Err(err) => self.report(&err),
        }
    }

    async fn reload_tasks(&mut self) -> AppResult<usize> {
        let tasks = Arc::clone(&self.tasks);
        match tasks.list_tasks().await {
            Ok(reply) => {
                self.view.view_mut().refresh(&reply.data);
                self.apply_filters();
                Ok(reply.data.len())
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Re-reads the session's tasks into the view.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> AppResult<usize> {
        self.require_session()?;
        self.reload_tasks().await
    }

    fn apply_filters(&mut self) {
        match &mut self.view {
            ViewBinding::Full(view) => {
                view.filter_by_category(&self.filters.category);
                view.filter_tasks(self.filters.status);
            }
            ViewBinding::Basic(view) => apply_fallback(view.as_mut(), &self.filters),
        }
    }

    #[instrument(skip(self))]
    pub fn select_category(&mut self, key: &str) -> CategoryFilter {
        let category = CategoryFilter::from_key(key);
        self.filters.category = category.clone();
        self.shell.mark_active(FilterGroup::Category, key);

        match &mut self.view {
            ViewBinding::Full(view) => view.filter_by_category(&category),
            ViewBinding::Basic(view) => apply_fallback(view.as_mut(), &self.filters),
        }
        category
    }

    #[instrument(skip(self))]
    pub fn select_status(&mut self, key: &str) -> StatusFilter {
        let status = StatusFilter::from_key(key);
        self.filters.status = status;
        self.shell.mark_active(FilterGroup::Status, key);

        match &mut self.view {
            ViewBinding::Full(view) => view.filter_tasks(status),
            ViewBinding::Basic(view) => apply_fallback(view.as_mut(), &self.filters),
        }
        status
    }

    #[instrument(skip(self))]
    pub async fn show_overdue(&mut self) -> AppResult<usize> {
        self.require_session()?;
        let now = self.now();
        let tasks = Arc::clone(&self.tasks);

        let batch = match tasks.get_overdue_tasks(now).await {
            Ok(batch) => batch,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        if batch.count == 0 {
            self.notify("No overdue tasks", MessageLevel::Info);
        } else {
            self.notify(
                &format!("Found {} overdue task(s)", batch.count),
                MessageLevel::Warning,
            );
            if let Some(view) = self.view.filtering() {
                view.filter_overdue(now);
            }
        }
        Ok(batch.count)
    }

    #[instrument(skip(self))]
    pub async fn show_due_soon(&mut self) -> AppResult<usize> {
        self.require_session()?;
        let now = self.now();
        let days = self.settings.due_soon_days;
        let tasks = Arc::clone(&self.tasks);

        let batch = match tasks.get_tasks_due_soon(now, days).await {
            Ok(batch) => batch,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        if batch.count == 0 {
            self.notify(
                &format!("No tasks due in the next {days} days"),
                MessageLevel::Info,
            );
        } else {
            self.notify(
                &format!("Found {} task(s) due in the next {days} days", batch.count),
                MessageLevel::Warning,
            );
            if let Some(view) = self.view.filtering() {
                view.filter_due_soon(now, days);
            }
        }
        Ok(batch.count)
    }

    #[instrument(skip(self))]
    pub async fn export_app_data(&mut self) -> AppResult<ExportArtifact> {
        let storage = Arc::clone(&self.storage);
        self.shell.set_loading(Control::Export, true);
        let snapshot =
            with_min_display(self.settings.min_loading, async move { storage.export_data() })
                .await;
        let result = self.deliver_export(snapshot);
        self.shell.set_loading(Control::Export, false);

        match result {
            Ok(artifact) => {
                info!(file = %artifact.file_name, bytes = artifact.body.len(), "data exported");
                self.notify("Data exported successfully", MessageLevel::Success);
                Ok(artifact)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    fn deliver_export(&mut self, snapshot: Option<Value>) -> AppResult<ExportArtifact> {
        let snapshot = snapshot.ok_or_else(|| AppError::domain("failed to export data"))?;
        let artifact = ExportArtifact::from_snapshot(&snapshot, self.now().date_naive())
            .map_err(|err| AppError::storage(&err))?;
        self.shell
            .offer_download(&artifact)
            .map_err(|err| AppError::storage(&err))?;
        Ok(artifact)
    }

    fn resolve_assignee(&self, name: Option<&str>) -> AppResult<Option<Uuid>> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let user = self
            .directory
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::validation(format!("unknown assignee '{name}'")))?;
        if Some(user.id) == self.session.current_user_id() {
            Ok(None)
        } else {
            Ok(Some(user.id))
        }
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_task(&mut self, draft: TaskDraft) -> AppResult<Uuid> {
        self.require_session()?;
        if draft.title.trim().is_empty() {
            let err = AppError::validation("title required");
            self.report(&err);
            return Err(err);
        }
        let assignee_id = match self.resolve_assignee(draft.assignee.as_deref()) {
            Ok(id) => id,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };

        let fields = NewTask {
            title: draft.title,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            due: draft.due,
            assignee_id,
        };
        let now = self.now();
        let tasks = Arc::clone(&self.tasks);
        match tasks.create_task(fields, now).await {
            Ok(reply) => {
                self.notify(&reply.message, MessageLevel::Success);
                let _ = self.reload_tasks().await;
                Ok(reply.data.id)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn toggle_task(&mut self, id: Uuid) -> AppResult<bool> {
        self.require_session()?;
        let now = self.now();
        let tasks = Arc::clone(&self.tasks);
        match tasks.toggle_task(id, now).await {
            Ok(reply) => {
                self.notify(&reply.message, MessageLevel::Success);
                let _ = self.reload_tasks().await;
                Ok(reply.data.completed)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&mut self, id: Uuid) -> AppResult<()> {
        self.require_session()?;
        let tasks = Arc::clone(&self.tasks);
        match tasks.delete_task(id).await {
            Ok(reply) => {
                self.notify(&reply.message, MessageLevel::Success);
                let _ = self.reload_tasks().await;
                Ok(())
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }
}

#[instrument(skip(repo, now))]
fn seed_demo_users(repo: &UserRepository, now: DateTime<Utc>) {
    match repo.find_all() {
        Ok(users) if !users.is_empty() => {
            debug!(count = users.len(), "users present; skipping demo seed");
        }
        Ok(_) => {
            for fields in [
                NewUser::new("demo", "demo@example.com", "Demo User"),
                NewUser::new("john", "john@example.com", "John Doe"),
            ] {
                if let Err(err) = repo.create(fields, now) {
                    error!(error = %err, "failed to create demo user");
                    return;
                }
            }
            info!("demo users created");
        }
        Err(err) => error!(error = %err, "failed to read users for demo seed"),
    }
}
