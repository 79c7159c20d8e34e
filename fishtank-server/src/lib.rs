use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::app::{create_app, Services};
use crate::configs::{SchemaManager, Settings, Storage};
use crate::services::serial::{first_available_port, NativeConnector};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod middlewares;
pub mod models;
pub mod repositories;
pub mod services;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .context("failed to open database")?,
    );

    let port_name = match &settings.device.port_path {
        Some(port_path) => port_path.clone(),
        None => first_available_port().unwrap_or_else(|e| {
            tracing::warn!("No serial port configured or found: {}", e);
            String::new()
        }),
    };

    let connector = Arc::new(NativeConnector::new(settings.device.baud_rate));
    let services = Services::new(settings, storage.clone(), connector, port_name);

    if let Err(e) = services.device_link.open().await {
        tracing::warn!("Device not ready, the link will retry on first command: {}", e);
    }

    services.task_service.start().await;
    services.temperature_service.start().await;

    let app = create_app(&services);

    let ip_addr = settings.server.host.parse::<IpAddr>()
        .with_context(|| format!("invalid server host {}", settings.server.host))?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!("listening on {:?}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.task_service.stop().await;
    services.temperature_service.stop().await;
    services.device_link.close().await;
    storage.close().await;

    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("shutdown signal received");
}
