use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;

use clap::Parser;
use lantern_common::AllowedOrigins;

#[derive(Parser)]
#[command(name = "Lantern")]
#[command(version)]
#[command(about = "Serves Starknet contract calls and class queries over JSON-RPC.")]
struct Cli {
    #[arg(
        long,
        value_name = "DIR",
        value_hint = clap::ValueHint::DirPath,
        long_help = "Directory where the node stores its database",
        env = "LANTERN_DATA_DIRECTORY",
        default_value_os_t = (&std::path::Component::CurDir).into()
    )]
    data_directory: PathBuf,

    #[arg(
        long = "http-rpc",
        long_help = "HTTP-RPC listening address",
        value_name = "IP:PORT",
        default_value = "127.0.0.1:9545",
        env = "LANTERN_HTTP_RPC_ADDRESS"
    )]
    rpc_address: SocketAddr,

    #[arg(
        long = "rpc.cors-domains",
        long_help = r"Comma separated list of domains from which Cross-Origin requests will be accepted by the RPC server.

Use '*' to indicate any domain and an empty list to disable CORS.

Examples:
    single: http://one.io
    a list: http://first.com,http://second.com:1234
    any:    *",
        value_name = "DOMAIN LIST",
        value_delimiter = ',',
        env = "LANTERN_RPC_CORS_DOMAINS"
    )]
    rpc_cors_domains: Vec<String>,

    #[arg(
        long = "max-rpc-connections",
        long_help = "Set the maximum number of connections allowed",
        env = "LANTERN_MAX_RPC_CONNECTIONS",
        default_value = "1024"
    )]
    max_rpc_connections: NonZeroU32,

    #[arg(
        long = "rpc.batch-concurrency-limit",
        long_help = "Sets the concurrency limit for request batch processing. May lower the \
                     latency for large batches, but may also increase CPU usage.",
        default_value = "1",
        env = "LANTERN_RPC_BATCH_CONCURRENCY_LIMIT"
    )]
    batch_concurrency_limit: NonZeroUsize,

    #[arg(
        long = "engine.command",
        long_help = r"Executable of the external execution engine. It is started with the database path as its only argument.

Without an engine 'starknet_call' fails with an internal error, while the class queries keep working.",
        value_name = "PATH",
        value_hint = clap::ValueHint::ExecutablePath,
        env = "LANTERN_ENGINE_COMMAND"
    )]
    engine_command: Option<PathBuf>,

    #[arg(
        long = "engine.processes",
        long_help = "Number of execution engine processes to start",
        default_value = "2",
        env = "LANTERN_ENGINE_PROCESSES"
    )]
    engine_processes: NonZeroUsize,

    #[arg(
        long = "import-state",
        long_help = "JSON file of declared classes and deployed contracts to import before \
                     serving requests",
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath,
        env = "LANTERN_IMPORT_STATE"
    )]
    import_state: Option<PathBuf>,

    #[arg(
        long = "log-output-json",
        long_help = "Emit logs as JSON lines instead of human readable text",
        env = "LANTERN_LOG_OUTPUT_JSON"
    )]
    log_output_json: bool,
}

pub struct Config {
    pub data_directory: PathBuf,
    pub rpc_address: SocketAddr,
    pub rpc_cors_domains: Option<AllowedOrigins>,
    pub max_rpc_connections: NonZeroU32,
    pub batch_concurrency_limit: NonZeroUsize,
    pub engine: Option<EngineConfig>,
    pub import_state: Option<PathBuf>,
    pub log_output_json: bool,
}

pub struct EngineConfig {
    pub command: PathBuf,
    pub processes: NonZeroUsize,
}

impl Config {
    pub fn parse() -> Self {
        Self::from_cli(Cli::parse())
    }

    fn from_cli(cli: Cli) -> Self {
        Config {
            data_directory: cli.data_directory,
            rpc_address: cli.rpc_address,
            rpc_cors_domains: parse_cors(cli.rpc_cors_domains),
            max_rpc_connections: cli.max_rpc_connections,
            batch_concurrency_limit: cli.batch_concurrency_limit,
            engine: cli.engine_command.map(|command| EngineConfig {
                command,
                processes: cli.engine_processes,
            }),
            import_state: cli.import_state,
            log_output_json: cli.log_output_json,
        }
    }
}

fn parse_cors(domains: Vec<String>) -> Option<AllowedOrigins> {
    let domains = domains
        .into_iter()
        .map(|domain| domain.trim().to_owned())
        .filter(|domain| !domain.is_empty())
        .collect::<Vec<_>>();

    match domains.as_slice() {
        [] => None,
        [single] if single == "*" => Some(AllowedOrigins::Any),
        _ => Some(AllowedOrigins::List(domains)),
    }
}
