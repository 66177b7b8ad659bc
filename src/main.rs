use std::future::Future;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod auth;
mod browser;
mod client;
mod config;
mod error;
mod extract;
mod harvester;
mod models;
mod store;
mod traits;

use auth::CookieStore;
use browser::BrowserSession;
use client::CatalogClient;
use config::Config;
use error::HarvestError;
use extract::Extractor;
use harvester::{Harvester, Mode};
use store::{IdentifierStore, RecordSink};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = run().await;
    info!("run finished");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run() -> Result<(), HarvestError> {
    let mode = Mode::from_arg(std::env::args().nth(1).as_deref())?;
    let config = Config::from_env().map_err(HarvestError::Other)?;

    // Credential gate comes before any network activity.
    let cookies = CookieStore::load(&config.cookies_file)?;

    let harvester = Harvester::new(
        IdentifierStore::new(&config.ids_file),
        RecordSink::new(&config.records_file),
        Extractor::new(config.site_url.clone()),
    );
    let mut catalog = CatalogClient::new(&config, &cookies)?;

    match mode {
        Mode::Identifiers => with_cancel(harvester.collect_identifiers(&mut catalog)).await,
        Mode::Extract => {
            let session = with_cancel(BrowserSession::launch(&config, &cookies)).await?;
            let result =
                with_cancel(harvester.extract_from_catalog(&mut catalog, &session)).await;
            session.close().await;
            result
        }
        Mode::Resume => {
            let session = with_cancel(BrowserSession::launch(&config, &cookies)).await?;
            let result = with_cancel(harvester.extract_from_store(&catalog, &session)).await;
            session.close().await;
            result
        }
    }
}

/// Race a pipeline stage against ctrl-c so an interrupt unwinds through
/// the session releases with a distinguished outcome.
async fn with_cancel<T, F>(task: F) -> Result<T, HarvestError>
where
    F: Future<Output = Result<T, HarvestError>>,
{
    tokio::select! {
        result = task => result,
        _ = tokio::signal::ctrl_c() => Err(HarvestError::Cancelled),
    }
}
