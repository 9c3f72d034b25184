#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use taskdesk_core::App;
use taskdesk_core::config::{AppSettings, ViewMode};
use taskdesk_core::controller::{Reply, TaskController, UserController, UserService};
use taskdesk_core::error::{AppError, AppResult};
use taskdesk_core::export::ExportArtifact;
use taskdesk_core::filter::{CategoryFilter, StatusFilter};
use taskdesk_core::repository::{TaskPatch, TaskRepository, UserRepository};
use taskdesk_core::shell::{AssigneeOption, Control, FilterGroup, Panel, Shell};
use taskdesk_core::storage::{MemoryStorage, Storage};
use taskdesk_core::task::{NewTask, Priority, Task};
use taskdesk_core::user::{NewUser, User};
use taskdesk_core::view::{
    FilteringView, Message, MessageLevel, TaskEntry, TaskListView, TaskView, ViewBinding,
};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap()
}

#[derive(Debug, Default)]
pub struct ShellLog {
    pub panels: BTreeMap<Panel, bool>,
    pub loading: BTreeMap<Control, bool>,
    pub loading_on: BTreeMap<Control, usize>,
    pub loading_off: BTreeMap<Control, usize>,
    pub welcome: Option<String>,
    pub username_input: String,
    pub form_resets: usize,
    pub assignees: Vec<AssigneeOption>,
    pub active: BTreeMap<FilterGroup, String>,
    pub downloads: Vec<ExportArtifact>,
}

impl ShellLog {
    pub fn visible(&self, panel: Panel) -> bool {
        self.panels.get(&panel).copied().unwrap_or(false)
    }

    pub fn on_count(&self, control: Control) -> usize {
        self.loading_on.get(&control).copied().unwrap_or(0)
    }

    pub fn off_count(&self, control: Control) -> usize {
        self.loading_off.get(&control).copied().unwrap_or(0)
    }
}

#[derive(Clone, Default)]
pub struct RecordingShell(pub Rc<RefCell<ShellLog>>);

impl Shell for RecordingShell {
    fn set_panel_visible(&mut self, panel: Panel, visible: bool) {
        self.0.borrow_mut().panels.insert(panel, visible);
    }

    fn set_loading(&mut self, control: Control, loading: bool) {
        let mut log = self.0.borrow_mut();
        log.loading.insert(control, loading);
        let counter = if loading {
            &mut log.loading_on
        } else {
            &mut log.loading_off
        };
        *counter.entry(control).or_default() += 1;
    }

    fn set_welcome(&mut self, text: &str) {
        self.0.borrow_mut().welcome = Some(text.to_string());
    }

    fn set_username_input(&mut self, value: &str) {
        self.0.borrow_mut().username_input = value.to_string();
    }

    fn reset_registration_form(&mut self) {
        self.0.borrow_mut().form_resets += 1;
    }

    fn set_assignee_options(&mut self, options: &[AssigneeOption]) {
        self.0.borrow_mut().assignees = options.to_vec();
    }

    fn mark_active(&mut self, group: FilterGroup, key: &str) {
        self.0.borrow_mut().active.insert(group, key.to_string());
    }

    fn offer_download(&mut self, artifact: &ExportArtifact) -> anyhow::Result<()> {
        self.0.borrow_mut().downloads.push(artifact.clone());
        Ok(())
    }
}

/// A task list whose messages stay readable after the view moves into
/// the application.
pub struct SharedView {
    list: TaskListView,
    pub messages: Rc<RefCell<Vec<Message>>>,
    pub overdue_calls: Rc<RefCell<usize>>,
}

impl SharedView {
    pub fn new() -> Self {
        Self {
            list: TaskListView::new(),
            messages: Rc::default(),
            overdue_calls: Rc::default(),
        }
    }
}

impl TaskView for SharedView {
    fn refresh(&mut self, tasks: &[Task]) {
        self.list.refresh(tasks);
    }

    fn show_message(&mut self, text: &str, level: MessageLevel) {
        self.messages.borrow_mut().push(Message {
            text: text.to_string(),
            level,
        });
    }

    fn entries(&self) -> &[TaskEntry] {
        self.list.entries()
    }

    fn visible_ids(&self) -> BTreeSet<Uuid> {
        self.list.visible_ids()
    }

    fn set_visible(&mut self, ids: &BTreeSet<Uuid>) {
        self.list.set_visible(ids);
    }
}

impl FilteringView for SharedView {
    fn filter_by_category(&mut self, category: &CategoryFilter) {
        self.list.filter_by_category(category);
    }

    fn filter_tasks(&mut self, status: StatusFilter) {
        self.list.filter_tasks(status);
    }

    fn filter_overdue(&mut self, now: DateTime<Utc>) {
        *self.overdue_calls.borrow_mut() += 1;
        self.list.filter_overdue(now);
    }

    fn filter_due_soon(&mut self, now: DateTime<Utc>, days: i64) {
        self.list.filter_due_soon(now, days);
    }
}

/// Wraps the stock user controller, counting logins and optionally
/// failing logout.
pub struct CountingUsers {
    inner: UserController,
    pub logins: AtomicUsize,
    pub fail_logout: bool,
}

#[async_trait]
impl UserService for CountingUsers {
    async fn login(&self, username: &str) -> AppResult<Reply<User>> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.inner.login(username).await
    }

    async fn register(&self, fields: NewUser) -> AppResult<Reply<User>> {
        self.inner.register(fields).await
    }

    async fn logout(&self) -> AppResult<Reply<()>> {
        if self.fail_logout {
            return Err(AppError::domain("logout endpoint unavailable"));
        }
        self.inner.logout().await
    }

    async fn get_all_users(&self) -> AppResult<Reply<Vec<User>>> {
        self.inner.get_all_users().await
    }
}

/// Storage whose snapshot is unavailable.
pub struct NoSnapshotStorage;

impl Storage for NoSnapshotStorage {
    fn load(&self, _key: &str) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }

    fn save(&self, key: &str, _value: &Value) -> anyhow::Result<()> {
        Err(anyhow!("read-only storage: {key}"))
    }

    fn export_data(&self) -> Option<Value> {
        None
    }
}

pub struct Fixture {
    pub app: App,
    pub shell: Rc<RefCell<ShellLog>>,
    pub messages: Rc<RefCell<Vec<Message>>>,
    pub overdue_calls: Rc<RefCell<usize>>,
    pub users: Arc<CountingUsers>,
    pub user_repo: Arc<UserRepository>,
    pub task_repo: Arc<TaskRepository>,
    pub storage: Arc<dyn Storage>,
    pub demo: User,
    pub john: User,
}

pub struct FixtureOptions {
    pub mode: ViewMode,
    pub fail_logout: bool,
    pub storage: Option<Arc<dyn Storage>>,
    pub min_loading: std::time::Duration,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            mode: ViewMode::Full,
            fail_logout: false,
            storage: None,
            min_loading: std::time::Duration::ZERO,
        }
    }
}

pub fn fixture(mode: ViewMode) -> Fixture {
    fixture_with(FixtureOptions {
        mode,
        ..FixtureOptions::default()
    })
}

pub fn fixture_with(options: FixtureOptions) -> Fixture {
    let data: Arc<dyn Storage> = Arc::new(MemoryStorage::new("taskdesk", "2.0"));
    let user_repo = Arc::new(UserRepository::new(Arc::clone(&data)));
    let task_repo = Arc::new(TaskRepository::new(Arc::clone(&data)));
    let now = fixed_now();
    let demo = user_repo
        .create(NewUser::new("demo", "demo@example.com", "Demo User"), now)
        .unwrap();
    let john = user_repo
        .create(NewUser::new("john", "john@example.com", "John Doe"), now)
        .unwrap();

    let users = Arc::new(CountingUsers {
        inner: UserController::new(Arc::clone(&user_repo)),
        logins: AtomicUsize::new(0),
        fail_logout: options.fail_logout,
    });
    let tasks = Arc::new(TaskController::new(
        Arc::clone(&task_repo),
        Arc::clone(&user_repo),
    ));

    let view = SharedView::new();
    let messages = Rc::clone(&view.messages);
    let overdue_calls = Rc::clone(&view.overdue_calls);
    let binding = match options.mode {
        ViewMode::Full => ViewBinding::full(view),
        ViewMode::Basic => ViewBinding::basic(view),
    };
    let shell = RecordingShell::default();
    let log = Rc::clone(&shell.0);

    let mut settings = AppSettings::for_data_dir(Path::new("/nonexistent/taskdesk"));
    settings.view_mode = options.mode;
    settings.min_loading = options.min_loading;
    let storage = options.storage.unwrap_or_else(|| Arc::clone(&data));

    let app = App::with_services(
        settings,
        Arc::clone(&storage),
        Arc::clone(&users) as Arc<dyn UserService>,
        tasks,
        binding,
        Box::new(shell),
    )
    .with_clock(Arc::new(fixed_now));

    Fixture {
        app,
        shell: log,
        messages,
        overdue_calls,
        users,
        user_repo,
        task_repo,
        storage,
        demo,
        john,
    }
}

impl Fixture {
    pub fn add_task(
        &self,
        owner: &User,
        title: &str,
        category: &str,
        priority: Priority,
        due_in_days: Option<i64>,
    ) -> Task {
        self.task_repo
            .create(
                owner.id,
                NewTask {
                    title: title.to_string(),
                    category: Some(category.to_string()),
                    priority: Some(priority),
                    due: due_in_days.map(|d| fixed_now() + Duration::days(d)),
                    ..NewTask::default()
                },
                fixed_now(),
            )
            .unwrap()
    }

    pub fn complete(&self, task: &Task) {
        self.task_repo
            .update(
                task.id,
                TaskPatch {
                    completed: Some(true),
                    ..Default::default()
                },
                fixed_now(),
            )
            .unwrap();
    }

    pub fn message_count(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn last_message(&self) -> Message {
        self.messages.borrow().last().cloned().unwrap()
    }

    pub fn visible(&self) -> BTreeSet<Uuid> {
        self.app.view().visible_ids()
    }

    pub fn logins(&self) -> usize {
        self.users.logins.load(Ordering::SeqCst)
    }
}
