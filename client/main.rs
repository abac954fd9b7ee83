// ledctl: command line client for ledsrv
use anyhow::{Context, Result};
use clap::Parser;
use ledsrv_client::{ClientConfig, LedClient};
use ledsrv_core::{ClientId, Response};
use ledsrv_transport::ConnectionPaths;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ledctl")]
#[command(about = "Query and change the LED served by ledsrv", long_about = None)]
#[command(version)]
struct Cli {
    /// Control pipe of the server (default: $LEDSRV_FIFO or /tmp/ledsrv)
    #[arg(short = 'c', long, value_name = "PATH")]
    control: Option<PathBuf>,

    /// Request pipe template, {id} is replaced by the client id
    #[arg(long, value_name = "TEMPLATE")]
    in_fifo: Option<String>,

    /// Response pipe template, {id} is replaced by the client id
    #[arg(long, value_name = "TEMPLATE")]
    out_fifo: Option<String>,

    /// Client id to announce (default: own process id)
    #[arg(long, value_name = "ID")]
    id: Option<u32>,

    /// Read requests from stdin, one per line, and send them as one batch
    #[arg(long, conflicts_with = "request")]
    stdin: bool,

    /// Request to send, e.g. `set-led-color blue`
    #[arg(value_name = "REQUEST", trailing_var_arg = true, allow_hyphen_values = true)]
    request: Vec<String>,
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let mut config = ClientConfig::from_env();
    if let Some(control) = cli.control {
        config.control_path = control;
    }
    config.paths = ConnectionPaths::new(
        cli.in_fifo.unwrap_or(config.paths.inbound),
        cli.out_fifo.unwrap_or(config.paths.outbound),
    );
    if !config.paths.is_valid() {
        anyhow::bail!("pipe templates must both contain {{id}} and differ");
    }

    let mut client = LedClient::new(config);
    if let Some(id) = cli.id {
        let id = ClientId::new(id).context("client id must be non-zero")?;
        client = client.with_id(id);
    }

    let requests: Vec<String> = if cli.stdin {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<String>>>()
            .context("Failed to read requests from stdin")?
    } else if cli.request.is_empty() {
        anyhow::bail!("no request given (try `ledctl get-led-state`)");
    } else {
        vec![cli.request.join(" ")]
    };

    let responses = client.batch(&requests).context("Request failed")?;
    for response in &responses {
        println!("{}", response);
    }

    if responses.iter().all(Response::is_ok) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
