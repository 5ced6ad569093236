use anyhow::Result;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use wiki_index_core::{config, routes, server, state};

#[tokio::main]
async fn main() -> Result<()> {
    let log_dir = std::env::var("WIKI_LOG_DIR").unwrap_or_else(|_| {
        dirs::data_local_dir()
            .map(|d| d.join("wiki-index-core").join("logs").to_string_lossy().to_string())
            .unwrap_or_else(|| ".wiki-data/logs".to_string())
    });
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "wiki-index-core.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wiki_index_core=info,tower_http=info".into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(non_blocking_writer)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())).unwrap_or_default();
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        error!(target: "wiki_index_core::panic", location = %location, payload = %payload, "PANIC: thread panicked");
        default_panic(info);
    }));

    routes::health::init_start_time();

    let config = config::AppConfig::from_env();
    let strict_startup = config.strict_startup;
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        spaces_root_dir = %config.spaces_root_dir,
        extract_workers = config.extract_workers,
        rebuild_interval_secs = config.rebuild_interval_secs,
        aicontext_interval_secs = config.aicontext_interval_secs,
        log_dir = %log_dir,
        "wiki index core starting"
    );

    let app_state = match state::AppState::new(config).await {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "failed to initialize app state");
            if strict_startup {
                std::process::exit(1);
            }
            return Err(err.into());
        }
    };

    let app = server::create_app(app_state.clone());

    // Bind and start serving before the first full index build, so
    // /applications/wiki/api/health is reachable immediately rather than
    // waiting on a potentially slow walk of every space (SPEC_FULL.md §A).
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("wiki index core listening on {}", addr);

    let rebuild_state = app_state.clone();
    tokio::spawn(async move {
        if let Err(err) = rebuild_state.rebuild().await {
            tracing::warn!(error = %err, "initial index build failed");
        }
    });

    if app_state.config.rebuild_interval_secs > 0 {
        let scheduled_state = app_state.clone();
        let interval_secs = app_state.config.rebuild_interval_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            ticker.tick().await; // first tick fires immediately; skip it, the initial build already ran
            loop {
                ticker.tick().await;
                if let Err(err) = scheduled_state.rebuild().await {
                    tracing::warn!(error = %err, "scheduled index rebuild failed");
                }
            }
        });
    }

    if app_state.config.aicontext_interval_secs > 0 {
        let scheduled_state = app_state.clone();
        let interval_secs = app_state.config.aicontext_interval_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                for space in scheduled_state.spaces.all() {
                    if let Err(err) = scheduled_state.aicontext.generate_for_space(&space).await {
                        tracing::warn!(space = %space.name, error = %err, "scheduled aicontext generation failed");
                    }
                }
            }
        });
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("wiki index core shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install secondary Ctrl+C handler");
    };

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, initiating shutdown"); },
        _ = terminate => { info!("received terminate signal, initiating shutdown"); },
    }

    info!("shutdown signal received");
}
