use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use slotbook::config::Config;
use slotbook::engine::Engine;
use slotbook::model::{parse_timestamp, NewEvent};
use slotbook::rpc::{self, AppState};
use slotbook::{confirm, observability};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    observability::init(config.metrics_port)?;

    let engine = Arc::new(Engine::new(config.working_hours));
    if config.seed_demo {
        seed_demo_events(&engine).await?;
    }

    let state = AppState {
        engine: engine.clone(),
        confirmer: confirm::from_config(&config.llm),
        static_dir: config.static_dir.clone(),
    };
    let app = rpc::router(state);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("slotbook listening on {addr}");
    info!(
        "  working hours: {}-{}",
        config.working_hours.start.format("%H:%M"),
        config.working_hours.end.format("%H:%M")
    );
    info!("  static_dir: {}", config.static_dir.display());
    match &config.llm.api_key {
        Some(_) => info!("  llm: {} via {}", config.llm.model, config.llm.url),
        None => info!("  llm: disabled (templated confirmations)"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("slotbook stopped ({} events in memory discarded)", engine.store.len());
    Ok(())
}

/// Resolves on SIGTERM or ctrl-c; in-flight requests are drained by axum.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
    info!("shutdown signal received, draining requests");
}

/// The two meetings the demo calendar starts with.
async fn seed_demo_events(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let demo = [
        ("Weekly team sync", "2025-10-22T10:00:00", "2025-10-22T10:30:00", "alice@example.com"),
        ("Project planning", "2025-10-22T15:00:00", "2025-10-22T16:00:00", "bob@example.com"),
    ];
    for (title, start, end, attendee) in demo {
        let (Some(start), Some(end)) = (parse_timestamp(start), parse_timestamp(end)) else {
            return Err(format!("bad demo timestamp for {title}").into());
        };
        engine
            .create_event(NewEvent {
                title: title.into(),
                start,
                end,
                attendees: vec![attendee.into()],
                created_by: "system".into(),
            })
            .await?;
    }
    info!("seeded {} demo events", demo.len());
    Ok(())
}
