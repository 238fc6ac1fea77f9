//! Search Index Main Entry Point
//!
//! Runs one maintenance command against the configured search backend. The
//! backend is selected by the `SEARCH_ENGINE` environment variable (`.env` is
//! honored).

use dotenv::dotenv;
use search_index::{CliError, Command};
use search_index_repository::{EnvSource, SearchIndex};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("search_index=info,search_index_repository=info"));

    let json_output = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    info!(
        service_name = "search-index",
        service_version = env!("CARGO_PKG_VERSION"),
        json = json_output,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    let command = Command::parse(env::args().skip(1))?;

    let index = match SearchIndex::from_source(&EnvSource::new()) {
        Ok(index) => index,
        Err(e) => {
            error!(error = %e, "Failed to configure search index");
            return Err(e.into());
        }
    };

    match command.run(&index).await {
        Ok(report) => {
            info!(command = ?command, "Command completed");
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!(command = ?command, error = %e, "Command failed");
            Err(e)
        }
    }
}
