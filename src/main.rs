//! # stockmarket-bootstrap - brings up the stock market's MongoDB connection
//!
//! Connects to the `rs0` replica set, prints every database the connected
//! identity can see, and hands the live connection to whatever runs next.
//!
//! ## Environment Variables
//!
//! - `MONGO_*`: connection settings, see `stockmarket_bootstrap::config`
//! - `RUST_LOG`: log filter (default `info`)
//! - `LOG_FORMAT`: `json` for machine-readable logs

use std::process::ExitCode;

use tracing::{error, info};

use stockmarket_bootstrap::{
    bootstrap::Bootstrapper,
    cli::{self, Action},
    health,
    logging::{LogFormat, init_tracing},
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env(), "info");

    let matches = cli::cli().get_matches();
    let config = match cli::resolve_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid MongoDB configuration");
            return ExitCode::FAILURE;
        }
    };

    let bootstrapper = Bootstrapper::new(config);
    let code = match cli::action(&matches) {
        Action::List => list(&bootstrapper).await,
        Action::Ping { json } => ping(&bootstrapper, json).await,
    };

    bootstrapper.shutdown().await;
    code
}

async fn list(bootstrapper: &Bootstrapper) -> ExitCode {
    match bootstrapper.initialize().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn ping(bootstrapper: &Bootstrapper, json: bool) -> ExitCode {
    let connection = match bootstrapper.initialize_to(&mut std::io::sink()).await {
        Ok(connection) => connection,
        Err(_) => return ExitCode::FAILURE,
    };

    let status = health::check_health(&connection).await;
    if json {
        match serde_json::to_string(&status) {
            Ok(body) => println!("{body}"),
            Err(e) => error!(error = %e, "Failed to serialize health report"),
        }
    } else if status.healthy {
        println!("MongoDB healthy, latency: {}ms", status.response_time_ms);
    } else {
        println!(
            "MongoDB unhealthy: {}",
            status.message.as_deref().unwrap_or("unknown error")
        );
    }

    info!(healthy = status.healthy, "Health check finished");
    if status.healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
