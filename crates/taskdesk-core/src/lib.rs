pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod controller;
pub mod datetime;
pub mod error;
pub mod export;
pub mod filter;
pub mod render;
pub mod repository;
pub mod session;
pub mod shell;
pub mod storage;
pub mod task;
pub mod user;
pub mod view;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

pub use app::{App, TaskDraft};
pub use error::{AppError, AppResult};

use commands::{Command, Flow};
use config::{AppSettings, ViewMode};
use console::{ConsoleShell, ConsoleView};
use render::Renderer;
use view::ViewBinding;

/// Exit status when the application could not initialize its storage.
const EXIT_UNAVAILABLE: u8 = 2;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<ExitCode> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting taskdesk"
    );
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.taskdeskrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides.into_iter().chain(
            cli.rc_overrides
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.clone())),
        ),
    );

    let settings = AppSettings::from_config(&cfg, cli.data.as_deref())
        .context("failed to resolve settings")?;
    let script = cli.script();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let code = runtime.block_on(console_session(settings, script))?;

    info!("done");
    Ok(code)
}

async fn console_session(settings: AppSettings, script: Vec<String>) -> anyhow::Result<ExitCode> {
    let renderer = Renderer::new(settings.color);
    let view = ConsoleView::new(renderer.clone());
    let view = match settings.view_mode {
        ViewMode::Full => ViewBinding::full(view),
        ViewMode::Basic => ViewBinding::basic(view),
    };
    let shell = Box::new(ConsoleShell::new(settings.export_dir.clone()));

    let mut app = match App::initialize(settings, view, shell) {
        Ok(app) => app,
        // The view has already shown the failure.
        Err(err) => {
            debug!(kind = err.kind(), "initialization failed");
            return Ok(ExitCode::from(EXIT_UNAVAILABLE));
        }
    };

    for line in &script {
        if run_line(&mut app, &renderer, line).await == Flow::Quit {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&app)?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            println!();
            break;
        };
        if run_line(&mut app, &renderer, &line).await == Flow::Quit {
            break;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_line(app: &mut App, renderer: &Renderer, line: &str) -> Flow {
    let outcome = match Command::parse(line, Utc::now()) {
        Ok(None) => return Flow::Continue,
        Ok(Some(command)) => commands::execute(app, renderer, command).await,
        Err(err) => Err(err),
    };

    outcome.unwrap_or_else(|err| {
        eprintln!("error: {err:#}");
        Flow::Continue
    })
}

fn print_prompt(app: &App) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match app.session().current_user() {
        Some(user) => write!(out, "{}@taskdesk> ", user.username)?,
        None => write!(out, "taskdesk> ")?,
    }
    out.flush()?;
    Ok(())
}
