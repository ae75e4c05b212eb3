//! fairgate-cli entry point.
//!
//! ## CLI Subcommands
//!
//! - `fairgate-cli simulate` - Closed-loop fairness simulation
//! - `fairgate-cli config show|defaults|validate` - Inspect configuration
//! - `fairgate-cli version` - Print the version

use std::process::ExitCode;

use fairgate_core::cli::config_cmd::{self, ConfigArgs};
use fairgate_core::cli::{run_simulate, EXIT_CONFIG_ERROR, EXIT_FAILURE};
use fairgate_core::config as fg_config;
use fairgate_core::telemetry::{describe_metrics, init_logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    let log_config = fg_config::load().log_config();
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Logging disabled: {}", e);
    }
    describe_metrics();

    let code = match command {
        "simulate" => run_simulate(&args[2..]).await,
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            let rest = args.get(3..).unwrap_or(&[]);
            let opts = match ConfigArgs::parse(rest) {
                Ok(opts) => opts,
                Err(msg) => {
                    eprintln!("{}", msg);
                    print_command_help("config");
                    return exit_code(EXIT_CONFIG_ERROR);
                }
            };
            match subcommand {
                "show" => config_cmd::run_show(&opts),
                "defaults" => config_cmd::run_defaults(&opts),
                "validate" => config_cmd::run_validate(&opts),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    EXIT_FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            match args.get(2) {
                Some(subcommand) => print_command_help(subcommand),
                None => print_usage(),
            }
            0
        }
        "version" | "--version" | "-V" => {
            println!("fairgate-cli {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            EXIT_FAILURE
        }
    };
    exit_code(code)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "fairgate-cli - seat-aware fair queuing admission v{}

USAGE:
    fairgate-cli [COMMAND] [OPTIONS]

COMMANDS:
    simulate     Run closed-loop clients against an in-process queue set
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    fairgate-cli simulate --clients 8,8
    fairgate-cli simulate --clients 1,12 --json
    fairgate-cli config validate --config fairgate.toml

ENVIRONMENT:
    FAIRGATE_NAME                    Queue set name (default: default)
    FAIRGATE_QUEUES                  Number of queues, 0 disables queuing (default: 64)
    FAIRGATE_QUEUE_LENGTH_LIMIT      Max waiting per queue, 0 disables queuing (default: 50)
    FAIRGATE_HAND_SIZE               Queues dealt per flow (default: 8)
    FAIRGATE_REQUEST_WAIT_LIMIT_MS   Max queued wait (default: 15000)
    FAIRGATE_CONCURRENCY_LIMIT       Seats available (default: 100)
    FAIRGATE_LOG_LEVEL               Log filter (default: info)
    FAIRGATE_LOG_FORMAT              json or pretty (default: json)

EXIT CODES:
    0  Success
    1  Failure
    2  Configuration error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "simulate" => {
            eprintln!(
                "fairgate-cli simulate - Closed-loop fairness simulation

USAGE:
    fairgate-cli simulate [OPTIONS]

OPTIONS:
    --config PATH      Load engine configuration from a TOML file
    --clients N,N,...  Clients per flow, one entry per flow (default: 8,8)
    --seats N          Seats per request (default: 1)
    --service-ms N     Mean service time; actual is 0.5x to 1.5x (default: 20)
    --duration-ms N    Length of the run (default: 2000)
    --seed N           Seed for flow hashes and service jitter (default: 1)
    --json             Print the report as JSON

DESCRIPTION:
    Every client submits a request, holds it for its service time, and
    submits again. The report shows each flow's average seats in use next
    to its max-min fair share of the concurrency limit.
"
            );
        }
        "config" => {
            eprintln!(
                "fairgate-cli config - Inspect configuration

USAGE:
    fairgate-cli config <show|defaults|validate> [--config PATH] [--json]

SUBCOMMANDS:
    show       Print effective values from the environment or file
    defaults   Print built-in defaults
    validate   Exit 0 if the engine accepts the configuration, 2 if not
"
            );
        }
        _ => print_usage(),
    }
}
