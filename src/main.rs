//! promptbridge - run an interactive tool and answer its prompts from the console

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info};

use promptbridge::{
    describe_error, ConsoleDisplay, ConsoleResponder, Error, Invocation, OutputChannel, Supervisor,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Command line arguments
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug logging
    debug: bool,
    working_directory: Option<PathBuf>,
    agent_socket: Option<PathBuf>,
    interpreter: Option<PathBuf>,
    executable: Option<PathBuf>,
    /// Everything after the executable, passed through untouched
    tool_args: Vec<String>,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse() -> anyhow::Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut app_args = AppArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    app_args.config_path = Some(PathBuf::from(value(&mut args, &arg)?));
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--cwd" => {
                    app_args.working_directory = Some(PathBuf::from(value(&mut args, &arg)?));
                }
                "--agent-socket" => {
                    app_args.agent_socket = Some(PathBuf::from(value(&mut args, &arg)?));
                }
                "--interpreter" | "-i" => {
                    app_args.interpreter = Some(PathBuf::from(value(&mut args, &arg)?));
                }
                "--help" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-V" => {
                    println!("promptbridge v{}", promptbridge::VERSION);
                    process::exit(0);
                }
                "--" => {
                    if let Some(executable) = args.next() {
                        app_args.executable = Some(PathBuf::from(executable));
                    }
                    app_args.tool_args.extend(args);
                    break;
                }
                flag if flag.starts_with('-') => {
                    anyhow::bail!("Unknown option: {}", flag);
                }
                _ => {
                    app_args.executable = Some(PathBuf::from(arg));
                    app_args.tool_args.extend(args);
                    break;
                }
            }
        }

        Ok(app_args)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("Missing value for {}", flag))
}

/// Print help information
fn print_help() {
    println!("promptbridge - run an interactive tool and answer its prompts");
    println!();
    println!("USAGE:");
    println!("    promptbridge [OPTIONS] --interpreter <PATH> <EXECUTABLE> [ARGS...]");
    println!();
    println!("OPTIONS:");
    println!("    -i, --interpreter <PATH>   Program that runs the executable");
    println!("        --cwd <DIR>            Working directory (default: current)");
    println!("        --agent-socket <PATH>  SSH agent socket handed to the tool");
    println!("    -c, --config <PATH>        Path to configuration file");
    println!("    -d, --debug                Enable debug logging");
    println!("    -h, --help                 Print this help message");
    println!("    -V, --version              Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    Looked up in order: --config, $PROMPTBRIDGE_CONFIG, ./promptbridge.toml,");
    println!("    <config dir>/promptbridge/config.toml, then built-in defaults.");
    println!();
    println!("ENVIRONMENT:");
    println!("    PROMPTBRIDGE_CONFIG    Path to configuration file");
    println!("    PROMPTBRIDGE_DEBUG     Enable debug logging (1 or true)");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

fn init_logging(debug: bool) {
    let debug = debug
        || env::var("PROMPTBRIDGE_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    let log_level = if debug { "debug" } else { "info" };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn build_invocation(args: &AppArgs) -> anyhow::Result<Invocation> {
    let interpreter = args
        .interpreter
        .clone()
        .context("--interpreter is required")?;
    let executable = args.executable.clone().context("No executable given")?;
    let working_directory = match &args.working_directory {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("Cannot determine the current directory")?,
    };

    let mut invocation = Invocation::new(executable, interpreter, args.tool_args.clone())
        .in_directory(working_directory);
    if let Some(socket) = &args.agent_socket {
        invocation = invocation.with_agent_socket(socket);
    }
    Ok(invocation)
}

fn exit_code_for(err: &Error) -> i32 {
    match err {
        // Out-of-range codes would wrap in the process exit status
        Error::NonZeroExit { code, .. } if (1..=255).contains(code) => *code,
        Error::PreconditionMissing { .. } => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

async fn run(args: AppArgs) -> i32 {
    let invocation = match build_invocation(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("error: {:#}", e);
            print_help();
            return EXIT_USAGE;
        }
    };

    let config = match promptbridge::load_config(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            return EXIT_FAILURE;
        }
    };

    let display = OutputChannel::open("promptbridge", Arc::new(ConsoleDisplay::new()));
    let supervisor = match Supervisor::new(
        display.clone(),
        Arc::new(ConsoleResponder::stdio()),
        config,
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("{}", describe_error(&e));
            return EXIT_FAILURE;
        }
    };

    let code = tokio::select! {
        result = supervisor.invoke(invocation) => match result {
            Ok(report) => {
                debug!(
                    "{} finished in {:?} with {} prompt(s) answered",
                    report.subcommand, report.duration, report.prompts_answered
                );
                0
            }
            Err(e) => {
                debug!("{}", describe_error(&e));
                exit_code_for(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping the tool");
            EXIT_INTERRUPTED
        }
    };

    display.close();
    code
}

fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("error: {:#}", e);
        print_help();
        process::exit(EXIT_USAGE);
    });

    init_logging(args.debug);
    info!("Starting promptbridge v{}", promptbridge::VERSION);
    debug!("Arguments: {:?}", args);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };

    let code = runtime.block_on(run(args));
    // A console read may still be parked on stdin
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    process::exit(code);
}
