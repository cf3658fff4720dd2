//! Search provider - main entry point.
//!
//! Connects to the session bus, claims the well-known name, exports the
//! provider object and serves calls until the inactivity timeout fires.
//! Set `EXAMPLE_SEARCH_PROVIDER_PERSIST` to keep it running.

use std::process::ExitCode;
use std::sync::Arc;

use search_provider::bus::SessionBus;
use search_provider::types::ServiceIdentity;
use search_provider::{Config, LoggingProvider, SearchProviderService};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::from_env();
    search_provider::observability::init_tracing(&config.observability);

    let bus = match SessionBus::connect().await {
        Ok(bus) => bus,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to the session bus");
            return ExitCode::FAILURE;
        }
    };

    let identity = ServiceIdentity::default();
    tracing::info!(
        bus_name = %identity.bus_name(),
        path = %identity.object_path(),
        persist = config.service.persist,
        timeout = ?config.service.inactivity_timeout,
        "search provider starting"
    );

    let service = SearchProviderService::new(bus, identity, Arc::new(LoggingProvider::new()), &config);

    let handle = service.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.shutdown();
        }
    });

    match service.run().await {
        Ok(reason) => {
            tracing::info!(?reason, "search provider exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "search provider failed");
            ExitCode::FAILURE
        }
    }
}
