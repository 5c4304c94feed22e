/*!
 * genie - natural language to shell command
 *
 * Turns a task description into one shell command using a local Ollama
 * model. Can run the command behind a confirmation gate and ask the model
 * for a fix when it fails. The last task/command/error is kept on disk so
 * `--mode refine --use-last` and `--mode explain` pick up where the previous
 * invocation left off.
 */

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use genie_core::backend;
use genie_core::config::{Overrides, Settings};
use genie_core::confirm::TerminalConfirm;
use genie_core::error::{GenieError, EXIT_FAILURE};
use genie_core::executor::SystemShell;
use genie_core::session::{join_task, Mode, Outcome, Request, Session};
use genie_core::state_store::FileStateStore;

#[derive(Parser, Debug)]
#[command(name = "genie", version)]
#[command(about = "Local shell command genie using Ollama, with refine", long_about = None)]
struct Cli {
    /// What you want to do (natural language). Omit in refine mode when using --use-last.
    task: Vec<String>,

    /// suggest (default), run (with confirmation), explain, refine
    #[arg(long, value_enum, default_value_t = Mode::Suggest)]
    mode: Mode,

    /// Ollama model (default: $GENIE_MODEL, then config, then mistral)
    #[arg(long)]
    model: Option<String>,

    /// Shell used in run mode (default: $SHELL, then config, then /bin/bash)
    #[arg(long)]
    shell: Option<String>,

    /// Do not append to the history log
    #[arg(long)]
    no_history: bool,

    /// Refine: use the last saved task, command and error
    #[arg(long)]
    use_last: bool,

    /// Refine: describe what was wrong (error message, behavior, platform constraints)
    #[arg(long, default_value = "")]
    why: String,

    /// Explain: the command to explain (default: the last command)
    #[arg(long = "cmd")]
    command: Option<String>,

    /// Config file (default: $GENIE_CONFIG, then ~/.config/genie-local/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            // usage errors share status 1; 2 means the model answered badly
            _ => {
                let _ = e.print();
                process::exit(EXIT_FAILURE);
            }
        },
    };

    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("[err] {:#}", e);
            e.downcast_ref::<GenieError>()
                .map(GenieError::exit_code)
                .unwrap_or(EXIT_FAILURE)
        }
    };
    process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GENIE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let settings = Settings::load(Overrides {
        model: cli.model,
        shell: cli.shell,
        no_history: cli.no_history,
        config: cli.config,
    })
    .context("failed to load configuration")?;
    tracing::debug!(?settings, "resolved settings");

    let request = Request {
        mode: cli.mode,
        task: join_task(&cli.task),
        use_last: cli.use_last,
        why: cli.why,
        command: cli.command,
    };

    let backend = backend::from_settings(&settings);
    let store = FileStateStore::new(settings.state_path.clone(), settings.history_path.clone());
    let mut confirm = TerminalConfirm;
    let mut out = io::stdout();
    let mut err = io::stderr();

    let mut session = Session::new(
        backend.as_ref(),
        &SystemShell,
        &store,
        &mut confirm,
        &mut out,
        &mut err,
    )
    .with_shell(settings.shell.clone())
    .with_history(settings.record_history);

    Ok(session.dispatch(&request)?)
}
