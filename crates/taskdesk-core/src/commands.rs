//! Console command parsing and dispatch.
//!
//! Each command maps onto one coordinator handler. Handlers report their
//! own failures through the view, so dispatch only logs them.

use std::collections::BTreeSet;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::app::{App, TaskDraft};
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::task::Priority;
use crate::user::NewUser;
use crate::view::TaskEntry;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "login", "logout", "register", "cancel", "users", "list", "add", "done", "delete",
        "category", "filter", "overdue", "soon", "export", "refresh", "help", "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login(String),
    Logout,
    OpenRegistration,
    Register(NewUser),
    CancelRegistration,
    Users,
    List,
    Add(TaskDraft),
    /// Toggles completion of the n-th listed task.
    Done(usize),
    Delete(usize),
    Category(String),
    Filter(String),
    Overdue,
    DueSoon,
    Export,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Command {
    /// Returns `None` for a blank line.
    #[instrument(skip(now))]
    pub fn parse(line: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some((head, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let lowered = head.to_ascii_lowercase();
        let known = known_command_names();
        let command = expand_command_abbrev(&lowered, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {head} (try help)"))?;
        debug!(token = %head, expanded = command, "resolved command token");

        let parsed = match command {
            "login" => Self::Login(args.first().cloned().unwrap_or_default()),
            "logout" => Self::Logout,
            "register" => match args {
                [] => Self::OpenRegistration,
                [username, email, full_name @ ..] => Self::Register(NewUser::new(
                    username.as_str(),
                    email.as_str(),
                    full_name.join(" "),
                )),
                [_] => return Err(anyhow!("register: expected <username> <email> [full name]")),
            },
            "cancel" => Self::CancelRegistration,
            "users" => Self::Users,
            "list" => Self::List,
            "add" => Self::Add(parse_task_draft(args, now)?),
            "done" => Self::Done(parse_index(args)?),
            "delete" => Self::Delete(parse_index(args)?),
            "category" => Self::Category(args.join(" ")),
            "filter" => Self::Filter(args.first().cloned().unwrap_or_default()),
            "overdue" => Self::Overdue,
            "soon" => Self::DueSoon,
            "export" => Self::Export,
            "refresh" => Self::Refresh,
            "help" => Self::Help,
            "quit" => Self::Quit,
            other => return Err(anyhow!("unhandled command: {other}")),
        };
        Ok(Some(parsed))
    }
}

fn parse_index(args: &[String]) -> anyhow::Result<usize> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("expected a task number from the list"))?;
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(anyhow!("invalid task number: {raw}")),
        Ok(n) => Ok(n),
    }
}

#[derive(Debug, Clone)]
enum Mod {
    Category(String),
    Priority(Priority),
    Due(DateTime<Utc>),
    Assignee(String),
    Description(String),
}

#[instrument(skip(args, now))]
fn parse_task_draft(args: &[String], now: DateTime<Utc>) -> anyhow::Result<TaskDraft> {
    let mut title_parts = Vec::new();
    let mut draft = TaskDraft::default();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            match one_mod {
                Mod::Category(c) => draft.category = Some(c),
                Mod::Priority(p) => draft.priority = Some(p),
                Mod::Due(d) => draft.due = Some(d),
                Mod::Assignee(a) => draft.assignee = Some(a),
                Mod::Description(d) => draft.description = d,
            }
            continue;
        }

        title_parts.push(arg.clone());
    }

    if title_parts.is_empty() {
        return Err(anyhow!("add: title is required"));
    }
    draft.title = title_parts.join(" ");
    Ok(draft)
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "cat" | "category" => Ok(Some(Mod::Category(value.to_string()))),
        "pri" | "priority" => Ok(Some(Mod::Priority(value.parse()?))),
        "due" => Ok(Some(Mod::Due(parse_date_expr(value, now)?))),
        "assign" | "to" => Ok(Some(Mod::Assignee(value.to_string()))),
        "desc" => Ok(Some(Mod::Description(value.replace('_', " ")))),
        _ => Ok(None),
    }
}

fn visible_entries(app: &App) -> Vec<&TaskEntry> {
    let visible: BTreeSet<Uuid> = app.view().visible_ids();
    app.view()
        .entries()
        .iter()
        .filter(|e| visible.contains(&e.id))
        .collect()
}

fn task_at(app: &App, index: usize) -> anyhow::Result<Uuid> {
    visible_entries(app)
        .get(index - 1)
        .map(|e| e.id)
        .ok_or_else(|| anyhow!("no task number {index} in the current list"))
}

fn print_tasks(app: &App, renderer: &Renderer) -> anyhow::Result<()> {
    if !app.session().is_active() {
        return Ok(());
    }
    renderer.print_task_table(&visible_entries(app), app.directory(), Utc::now())
}

/// Runs one command against the coordinator.
#[instrument(skip(app, renderer))]
pub async fn execute(app: &mut App, renderer: &Renderer, command: Command) -> anyhow::Result<Flow> {
    let outcome = match command {
        Command::Login(username) => app.login(&username).await.map(|_| ()),
        Command::Logout => {
            app.logout().await;
            Ok(())
        }
        Command::OpenRegistration => {
            app.open_registration();
            return Ok(Flow::Continue);
        }
        Command::Register(fields) => {
            if !app.is_registration_open() {
                app.open_registration();
            }
            app.register(fields).await.map(|_| ())
        }
        Command::CancelRegistration => {
            app.cancel_registration();
            return Ok(Flow::Continue);
        }
        Command::Users => {
            for user in app.directory() {
                println!("{:<12} {}", user.username, user.display_name());
            }
            return Ok(Flow::Continue);
        }
        Command::List => Ok(()),
        Command::Add(draft) => app.create_task(draft).await.map(|_| ()),
        Command::Done(index) => {
            let id = task_at(app, index)?;
            app.toggle_task(id).await.map(|_| ())
        }
        Command::Delete(index) => {
            let id = task_at(app, index)?;
            app.delete_task(id).await
        }
        Command::Category(key) => {
            app.select_category(&key);
            Ok(())
        }
        Command::Filter(key) => {
            app.select_status(&key);
            Ok(())
        }
        Command::Overdue => app.show_overdue().await.map(|_| ()),
        Command::DueSoon => app.show_due_soon().await.map(|_| ()),
        Command::Export => {
            if let Err(err) = app.export_app_data().await {
                warn!(kind = err.kind(), "export failed");
            }
            return Ok(Flow::Continue);
        }
        Command::Refresh => app.refresh().await.map(|_| ()),
        Command::Help => {
            print_help();
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    if let Err(err) = outcome {
        // Already shown to the user by the handler.
        warn!(kind = err.kind(), "command failed");
        return Ok(Flow::Continue);
    }

    print_tasks(app, renderer)?;
    Ok(Flow::Continue)
}

fn print_help() {
    println!(
        "\
login <username>                      log in
logout                                log out
register [<username> <email> [name]]  open the registration form or submit it
cancel                                close the registration form
users                                 list known users
list                                  show visible tasks
add <title..> [cat:X] [pri:l|m|h] [due:DATE] [assign:USER] [desc:X]
done <n>                              toggle completion of task n
delete <n>                            delete task n
category <name|all>                   filter by category
filter <all|pending|completed|high>   filter by status
overdue | soon                        show overdue or soon-due tasks
export                                write a JSON backup
refresh                               reload tasks
quit"
    );
}
