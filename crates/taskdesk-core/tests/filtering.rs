mod support;

use std::collections::BTreeSet;

use taskdesk_core::TaskDraft;
use taskdesk_core::config::ViewMode;
use taskdesk_core::error::AppError;
use taskdesk_core::filter::StatusFilter;
use taskdesk_core::shell::FilterGroup;
use taskdesk_core::task::{Priority, Task};
use taskdesk_core::view::MessageLevel;
use uuid::Uuid;

use support::{Fixture, fixture};

fn ids(tasks: &[&Task]) -> BTreeSet<Uuid> {
    tasks.iter().map(|t| t.id).collect()
}

struct Board {
    fx: Fixture,
    work_open: Task,
    work_done: Task,
    home_high: Task,
    late: Task,
    later: Task,
}

async fn board(mode: ViewMode) -> Board {
    let mut fx = fixture(mode);
    let demo = fx.demo.clone();
    let work_open = fx.add_task(&demo, "draft memo", "work", Priority::Medium, Some(10));
    let work_done = fx.add_task(&demo, "file report", "work", Priority::High, None);
    fx.complete(&work_done);
    let home_high = fx.add_task(&demo, "fix roof", "home", Priority::High, Some(2));
    let late = fx.add_task(&demo, "pay rent", "home", Priority::Low, Some(-3));
    let later = fx.add_task(&demo, "renew visa", "admin", Priority::Medium, Some(-1));
    fx.app.login("demo").await.unwrap();

    Board {
        fx,
        work_open,
        work_done,
        home_high,
        late,
        later,
    }
}

#[tokio::test]
async fn status_filters_are_history_free() {
    let mut b = board(ViewMode::Full).await;

    b.fx.app.select_status("pending");
    let pending_only = b.fx.visible();

    b.fx.app.select_status("completed");
    assert_eq!(b.fx.visible(), ids(&[&b.work_done]));
    b.fx.app.select_status("pending");

    assert_eq!(b.fx.visible(), pending_only);
    assert_eq!(
        pending_only,
        ids(&[&b.work_open, &b.home_high, &b.late, &b.later])
    );
    assert_eq!(
        b.fx.shell.borrow().active.get(&FilterGroup::Status).map(String::as_str),
        Some("pending")
    );
}

#[tokio::test]
async fn unknown_status_shows_everything() {
    let mut b = board(ViewMode::Full).await;

    b.fx.app.select_status("completed");
    assert_eq!(b.fx.app.select_status("urgent"), StatusFilter::All);

    assert_eq!(b.fx.visible().len(), 5);
}

#[tokio::test]
async fn category_and_status_intersect() {
    let mut b = board(ViewMode::Full).await;

    b.fx.app.select_category("home");
    b.fx.app.select_status("high");
    assert_eq!(b.fx.visible(), ids(&[&b.home_high]));

    b.fx.app.select_category("all");
    assert_eq!(b.fx.visible(), ids(&[&b.work_done, &b.home_high]));
}

#[tokio::test]
async fn refresh_keeps_the_selection() {
    let mut b = board(ViewMode::Full).await;
    b.fx.app.select_category("work");

    let demo = b.fx.demo.clone();
    let extra = b.fx.add_task(&demo, "book room", "work", Priority::Low, None);
    b.fx.app.refresh().await.unwrap();

    assert_eq!(
        b.fx.visible(),
        ids(&[&b.work_open, &b.work_done, &extra])
    );
}

#[tokio::test]
async fn overdue_without_hits_changes_nothing() {
    let mut fx = fixture(ViewMode::Full);
    let demo = fx.demo.clone();
    fx.add_task(&demo, "someday", "general", Priority::Low, Some(30));
    fx.app.login("demo").await.unwrap();
    let before = fx.visible();

    assert_eq!(fx.app.show_overdue().await.unwrap(), 0);

    assert_eq!(fx.visible(), before);
    assert_eq!(*fx.overdue_calls.borrow(), 0);
    let message = fx.last_message();
    assert_eq!(message.level, MessageLevel::Info);
    assert_eq!(message.text, "No overdue tasks");
}

#[tokio::test]
async fn overdue_hits_narrow_a_full_view() {
    let mut b = board(ViewMode::Full).await;

    assert_eq!(b.fx.app.show_overdue().await.unwrap(), 2);

    assert_eq!(*b.fx.overdue_calls.borrow(), 1);
    assert_eq!(b.fx.visible(), ids(&[&b.late, &b.later]));
    let message = b.fx.last_message();
    assert_eq!(message.level, MessageLevel::Warning);
    assert_eq!(message.text, "Found 2 overdue task(s)");

    // The next filter selection replaces the quick view.
    b.fx.app.select_status("all");
    assert_eq!(b.fx.visible().len(), 5);
}

#[tokio::test]
async fn overdue_hits_leave_a_basic_view_alone() {
    let mut b = board(ViewMode::Basic).await;
    let before = b.fx.visible();

    assert_eq!(b.fx.app.show_overdue().await.unwrap(), 2);

    assert_eq!(b.fx.visible(), before);
    assert_eq!(b.fx.last_message().level, MessageLevel::Warning);
}

#[tokio::test]
async fn due_soon_uses_configured_horizon() {
    let mut b = board(ViewMode::Full).await;

    assert_eq!(b.fx.app.show_due_soon().await.unwrap(), 1);

    assert_eq!(b.fx.visible(), ids(&[&b.home_high]));
    assert_eq!(
        b.fx.last_message().text,
        "Found 1 task(s) due in the next 3 days"
    );
}

#[tokio::test]
async fn full_and_basic_views_agree() {
    let mut full = board(ViewMode::Full).await;
    let mut basic = board(ViewMode::Basic).await;

    let steps: [(&str, &str); 7] = [
        ("status", "pending"),
        ("category", "home"),
        ("status", "high"),
        ("category", "nope"),
        ("status", "bogus"),
        ("category", "ALL"),
        ("status", "completed"),
    ];

    for (axis, key) in steps {
        for b in [&mut full, &mut basic] {
            if axis == "status" {
                b.fx.app.select_status(key);
            } else {
                b.fx.app.select_category(key);
            }
        }

        let titles = |b: &Board| -> BTreeSet<String> {
            let visible = b.fx.visible();
            b.fx.app
                .view()
                .entries()
                .iter()
                .filter(|e| visible.contains(&e.id))
                .map(|e| e.title.clone())
                .collect()
        };
        assert_eq!(titles(&full), titles(&basic), "after {axis}={key}");
    }
}

#[tokio::test]
async fn tasks_can_be_assigned_toggled_and_deleted() {
    let mut b = board(ViewMode::Full).await;

    let id = b
        .fx
        .app
        .create_task(TaskDraft {
            title: "review budget".to_string(),
            category: Some("work".to_string()),
            assignee: Some("John".to_string()),
            ..TaskDraft::default()
        })
        .await
        .unwrap();
    assert_eq!(b.fx.app.view().entries().len(), 6);
    let entry = b
        .fx
        .app
        .view()
        .entries()
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .unwrap();
    assert_eq!(entry.assignee_id, Some(b.fx.john.id));

    assert!(b.fx.app.toggle_task(id).await.unwrap());
    assert_eq!(b.fx.last_message().text, "Task 'review budget' completed");

    b.fx.app.logout().await;
    b.fx.app.login("john").await.unwrap();
    assert_eq!(b.fx.app.view().entries().len(), 1);

    let err = b.fx.app.delete_task(id).await.unwrap_err();
    assert_eq!(err, AppError::domain("only the owner can delete a task"));
    assert!(!b.fx.app.toggle_task(id).await.unwrap());

    b.fx.app.logout().await;
    b.fx.app.login("demo").await.unwrap();
    b.fx.app.delete_task(id).await.unwrap();
    assert_eq!(b.fx.app.view().entries().len(), 5);
}

#[tokio::test]
async fn task_form_errors_are_reported_once() {
    let mut b = board(ViewMode::Full).await;
    let before = b.fx.message_count();

    let err = b
        .fx
        .app
        .create_task(TaskDraft {
            title: "  ".to_string(),
            ..TaskDraft::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, AppError::validation("title required"));

    let err = b
        .fx
        .app
        .create_task(TaskDraft {
            title: "call".to_string(),
            assignee: Some("zed".to_string()),
            ..TaskDraft::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, AppError::validation("unknown assignee 'zed'"));

    assert_eq!(b.fx.message_count(), before + 2);
    assert_eq!(b.fx.app.view().entries().len(), 5);
}
