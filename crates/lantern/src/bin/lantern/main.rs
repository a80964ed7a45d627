#![deny(rust_2018_idioms)]

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Context;
use lantern_rpc::{RpcConfig, RpcContext, RpcServer};
use lantern_storage::{JournalMode, StorageBuilder};
use tracing::info;

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::parse();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "lantern=info");
    }

    setup_tracing(config.log_output_json);

    info!(version = env!("CARGO_PKG_VERSION"), "🏁 Starting node.");

    permission_check(&config.data_directory)?;

    let database_path = config.data_directory.join("lantern.sqlite");
    let storage_manager = StorageBuilder::file(database_path.clone())
        .journal_mode(JournalMode::WAL)
        .migrate()
        .context("Migrating database")?;

    if let Some(path) = &config.import_state {
        let storage = storage_manager
            .create_pool(NonZeroU32::MIN)
            .context("Creating database connection pool for import")?;
        lantern_lib::import::import_state(&storage, path).context("Importing state")?;
    }

    let storage = storage_manager
        .create_read_only_pool(config.max_rpc_connections)
        .context("Creating database connection pool for RPC")?;

    let context = RpcContext::without_engine(
        storage,
        RpcConfig {
            batch_concurrency_limit: config.batch_concurrency_limit,
        },
    );

    let (context, engine_handle) = match &config.engine {
        Some(engine) => {
            let (handle, supervisor) = lantern_executor::external::start(
                engine.command.clone(),
                database_path,
                engine.processes,
                // Shut the engine processes down gracefully on ctrl-c.
                async {
                    let _ = tokio::signal::ctrl_c().await;
                },
            )
            .await
            .context("Starting execution engine")?;

            (context.with_engine(Arc::new(handle)), Some(supervisor))
        }
        None => {
            tracing::warn!("No execution engine configured, calls will fail");
            (context, None)
        }
    };

    let mut rpc_server = RpcServer::new(config.rpc_address, context)
        .with_max_connections(config.max_rpc_connections.get() as usize);
    if let Some(allowed_origins) = config.rpc_cors_domains {
        rpc_server = rpc_server.with_cors(allowed_origins);
    }

    let (rpc_handle, local_addr) = rpc_server
        .spawn()
        .await
        .context("Starting the RPC server")?;

    info!(address=%local_addr, "📡 HTTP-RPC server started");

    tokio::select! {
        result = rpc_handle => {
            match result {
                Ok(Ok(())) => anyhow::bail!("RPC server stopped unexpectedly"),
                Ok(Err(e)) => return Err(e.context("RPC server failed")),
                Err(e) => return Err(anyhow::Error::from(e).context("RPC server task panicked")),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if let Some(supervisor) = engine_handle {
        if let Err(e) = supervisor.await {
            tracing::debug!(reason=?e, "Engine supervisor did not shut down cleanly");
        }
    }

    Ok(())
}

fn setup_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn permission_check(base: &std::path::Path) -> Result<(), anyhow::Error> {
    tempfile::tempfile_in(base)
        .with_context(|| format!("Failed to create a file in {}. Make sure the directory is writable by the user running lantern.", base.display()))?;

    Ok(())
}

