//! Startup orchestration.
//!
//! Order: metrics exporter → route table and limiter → admin listener →
//! public listener. Any bind failure is fatal.

use tokio::net::TcpListener;

use crate::admin;
use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_on_signal;
use crate::observability::metrics;

/// Run the gateway until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        rate_limiting = config.rate_limit.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);

    let admin_task = if server.config().admin.enabled {
        let listener = TcpListener::bind(&server.config().admin.bind_address).await?;
        let state = server.admin_state();
        let rx = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    server.run(listener, shutdown.subscribe()).await?;

    // The public server may also stop on an I/O error; bring the admin API
    // down with it.
    shutdown.trigger();
    if let Some(task) = admin_task {
        let _ = task.await;
    }

    Ok(())
}
