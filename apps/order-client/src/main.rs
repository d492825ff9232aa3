//! Interactive client for the order management service.
//!
//! Prompts for an interaction mode (`unary`, `server_stream`, `client_stream`,
//! `bidi_stream`), then for order names, and prints every response as
//! `Received: <id>, <name>, <timestamp>`. Type `exit` to finish a batch of
//! names or to quit.

mod session;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;

use order_bootstrap::{LoggingConfig, init_logging};
use order_management_sdk::{OrderManagementGrpcClient, SERVICE_NAME};
use order_transport_grpc::client::{GrpcClientConfig, KeepAlive};

use crate::session::OperatorSession;

/// Order management interactive client
#[derive(Parser)]
#[command(name = "order-client")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(long, default_value = "http://127.0.0.1:50505")]
    addr: String,

    /// Deadline of each call, in seconds (0 sends calls without a deadline)
    #[arg(long, default_value_t = 1200)]
    timeout_secs: u64,

    /// Connection establishment timeout, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,

    /// Interval between keepalive pings on an idle connection, in seconds (0 disables)
    #[arg(long, default_value_t = 30)]
    keepalive_secs: u64,

    /// How long an unanswered keepalive ping may wait before the connection is dropped, in seconds
    #[arg(long, default_value_t = 10)]
    keepalive_timeout_secs: u64,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn transport(&self) -> GrpcClientConfig {
        let keepalive = (self.keepalive_secs > 0).then(|| KeepAlive {
            interval: Duration::from_secs(self.keepalive_secs),
            timeout: Duration::from_secs(self.keepalive_timeout_secs),
        });
        GrpcClientConfig::new(SERVICE_NAME)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_call_timeout((self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)))
            .with_keepalive(keepalive)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stay quiet unless asked so prompts remain readable.
    let logging = LoggingConfig {
        level: "warn".to_owned(),
        ..LoggingConfig::default()
    };
    init_logging(&logging, cli.verbose)?;

    let client = OrderManagementGrpcClient::connect(&cli.addr, cli.transport()).await?;

    println!("Possible values: unary, server_stream, client_stream, bidi_stream (exit to quit)");

    let input = BufReader::new(tokio::io::stdin());
    OperatorSession::new(client, input, tokio::io::stdout())
        .run()
        .await
}
