//! `hivemind serve`: boot the core and run until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hivemind_db::{DbConfig, KnowledgeStore, PgStore};
use hivemind_sanitize::Sanitizer;
use hivemind_server::{
    router, verify_deployment_identity, ApiKeyAuthenticator, AppState, Notifier, NotifierConfig,
};

use crate::cli::{build_embedder, config};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides config and HIVEMIND_BIND)
    #[arg(long)]
    bind: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = config::load()?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    // Singletons, in dependency order. Model/pattern load happens here,
    // once, before the listener opens.
    let sanitizer = Arc::new(Sanitizer::new().context("sanitiser construction failed")?);
    let embedder = build_embedder(config.embed_queue_depth)?;

    let store = PgStore::connect(
        &DbConfig::new(config.database_url.clone()),
        embedder.dimensions() as u32,
    )
    .await
    .context("database connection failed")?;
    let store: Arc<dyn KnowledgeStore> = Arc::new(store);

    verify_deployment_identity(store.as_ref(), embedder.as_ref())
        .await
        .context("deployment identity check failed")?;

    let credentials = std::fs::read_to_string(&config.credentials_path).with_context(|| {
        format!(
            "failed to read credentials at {}",
            config.credentials_path.display()
        )
    })?;
    let auth = Arc::new(
        ApiKeyAuthenticator::from_toml(&credentials).context("invalid credentials file")?,
    );
    if auth.is_empty() {
        anyhow::bail!("credentials file defines no keys; nobody could call the server");
    }

    // Approval fan-out rides a dedicated listener connection.
    let stream = store
        .subscribe_approvals()
        .await
        .context("approval subscription failed")?;
    let (notifier, _notifier_task) = Notifier::spawn(
        stream,
        NotifierConfig {
            buffer: config.settings.event_buffer,
            heartbeat: config.settings.heartbeat,
        },
    );

    let state = AppState::new(
        store,
        sanitizer,
        embedder,
        auth,
        notifier,
        config.settings.clone(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "hivemind listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("hivemind stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
