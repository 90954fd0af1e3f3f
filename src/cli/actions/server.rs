use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::warn;
use url::Url;

use crate::access::{
    AccessState,
    config::AccessConfig,
    store::{memory::MemoryStore, postgres::PgStore},
};
use crate::api;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub session_ttl_seconds: i64,
    pub store_timeout_seconds: u64,
}

/// Handle the server action
/// # Errors
/// Returns an error if the DSN is malformed or the server fails to start.
pub async fn handle(args: Args) -> Result<()> {
    let config = AccessConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_store_timeout(Duration::from_secs(args.store_timeout_seconds));

    match args.dsn {
        Some(dsn) => {
            // Validate the DSN shape before handing it to the pool.
            Url::parse(&dsn).context("invalid DSN")?;

            let store = PgStore::connect(&dsn).await?;
            store.migrate().await?;

            let state = Arc::new(AccessState::new(Arc::new(store), config));
            api::serve(args.port, state).await
        }
        None => {
            warn!("no DSN configured; records will not survive a restart");

            let state = Arc::new(AccessState::new(Arc::new(MemoryStore::new()), config));
            api::serve(args.port, state).await
        }
    }
}
