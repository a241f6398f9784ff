//! `dev` application entry point.
//!
//! This binary resolves the development container for the current directory
//! and drives it through the `devctr` orchestration API. It uses `eyre` for
//! opaque error handling at the application boundary, converting
//! domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/devctr/config.toml` or path from `DEVCTR_CONFIG_PATH`)
//! 3. Environment variables (`DEVCTR_*`)
//! 4. Command-line arguments
//!
//! Log verbosity follows `DEVCTR_LOG` (an `EnvFilter` directive, default
//! `info`). Logs go to stderr so stdout stays free for `status` and `logs`.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use devctr::api::{
    self, BuildCommand, CleanupCommand, CommandContext, CommandOutcome, Confirm, ExecCommand,
    PruneCommand, StopCommand,
};
use devctr::config::{Cli, Commands, load_config};
use devctr::engine::{DockerRuntime, LogsRequest, local_stdio_is_terminal};
use devctr::error::Result as DevctrResult;
use devctr::session::{Invocation, SessionSettings, TcpPortChecker};
use eyre::{Report, Result as EyreResult};
use mockable::DefaultEnv;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DEVCTR_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Application entry point.
///
/// Loads configuration, connects to the engine, then dispatches to the
/// matching orchestration function. Exec exit codes become the process exit
/// code; every other outcome exits 0.
fn main() -> EyreResult<ExitCode> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;
    let env = DefaultEnv::new();
    let settings = SessionSettings::from_config(&config, &env).map_err(Report::from)?;
    let invocation =
        Invocation::from_current_dir(local_stdio_is_terminal()).map_err(Report::from)?;
    let runtime =
        DockerRuntime::connect(config.engine_socket.as_deref(), &env).map_err(Report::from)?;

    let ctx = CommandContext {
        runtime: &runtime,
        settings: &settings,
        env: &env,
        cwd: &invocation.cwd,
    };
    let outcome = run(&cli, &ctx).map_err(Report::from)?;
    Ok(exit_code(outcome))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Execute the CLI command, returning domain-specific errors.
///
/// Keeps semantic errors inside the run loop so the CLI boundary owns
/// conversion to `eyre::Report`.
fn run(
    cli: &Cli,
    ctx: &CommandContext<'_, DockerRuntime, DefaultEnv>,
) -> DevctrResult<CommandOutcome> {
    let checker = TcpPortChecker;
    match cli.command() {
        Commands::Shell => api::shell(ctx, &checker, local_stdio_is_terminal()),
        Commands::Stop(args) => api::stop(
            ctx,
            &StopCommand {
                name: args.name.clone(),
                all: args.all,
                assume_yes: args.yes,
            },
            &StdinConfirm,
        ),
        Commands::Delete(args) => api::delete(ctx, args.name.as_deref()),
        Commands::Status(args) => {
            let report = api::status(ctx, args.name.as_deref())?;
            print_status(&report);
            Ok(CommandOutcome::Success)
        }
        Commands::Exec(args) => api::exec(
            ctx,
            &checker,
            &ExecCommand {
                name: args.name.clone(),
                command: args.command.clone(),
                interactive: args.interactive,
                tty: args.interactive && local_stdio_is_terminal(),
            },
        ),
        Commands::Logs(args) => api::logs(
            ctx,
            args.name.as_deref(),
            &LogsRequest {
                follow: args.follow,
                tail: args.lines,
            },
        ),
        Commands::Cleanup(args) => api::cleanup(
            ctx,
            CleanupCommand {
                all: args.all,
                assume_yes: args.yes,
            },
            &StdinConfirm,
        ),
        Commands::Prune(args) => api::prune(
            ctx,
            PruneCommand {
                all: args.all,
                volumes: args.volumes,
                assume_yes: args.yes,
            },
            &StdinConfirm,
        ),
        Commands::Build(args) => api::build(
            ctx,
            &BuildCommand {
                no_cache: args.no_cache,
            },
        ),
        Commands::Rebuild(args) => api::rebuild(
            ctx,
            args.name.as_deref(),
            &BuildCommand {
                no_cache: args.no_cache,
            },
        ),
    }
}

#[expect(clippy::print_stdout, reason = "status output is the command's result")]
fn print_status(report: &api::StatusReport) {
    println!("{report}");
}

fn exit_code(outcome: CommandOutcome) -> ExitCode {
    match outcome {
        CommandOutcome::Success | CommandOutcome::Cancelled => ExitCode::SUCCESS,
        CommandOutcome::CommandExit { code } => {
            ExitCode::from(u8::try_from(code.clamp(1, 255)).unwrap_or(1))
        }
    }
}

/// Asks on stderr and reads a `y`/`N` answer from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    #[expect(clippy::print_stderr, reason = "interactive prompt for the user")]
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        if std::io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
