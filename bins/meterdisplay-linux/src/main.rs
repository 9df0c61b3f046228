use anyhow::{bail, Context};
use meterdisplay_core::{
    connection_plan, image, validate_all, ConfigError, ConfigHandlers, ConfigStorage,
    DeviceSettings, KnownNetworks, SettingsLayout,
};
use meterdisplay_web::{create_router, FileConfigStorage, ServerState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: meterdisplay [serve | check | export-image <path>]";

/// Settings read from the environment.
struct Config {
    /// Directory holding the JSON configuration files.
    data_dir: PathBuf,
    /// Address the REST API listens on.
    bind_addr: SocketAddr,
    /// Settings layout of the device being served.
    layout: SettingsLayout,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(
            std::env::var("METERDISPLAY_DATA_DIR").unwrap_or_else(|_| "./meterdisplay-data".into()),
        );
        let bind_addr = std::env::var("METERDISPLAY_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse::<SocketAddr>()
            .context("invalid METERDISPLAY_BIND")?;
        let layout = std::env::var("METERDISPLAY_LAYOUT")
            .unwrap_or_else(|_| SettingsLayout::EnergyAndWater.as_str().into())
            .parse::<SettingsLayout>()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            data_dir,
            bind_addr,
            layout,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,meterdisplay_web=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None | Some("serve") => serve(&config).await,
        Some("check") => check(&config),
        Some("export-image") => {
            let path = args.get(1).context(USAGE)?;
            export_image(&config, path)
        }
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

/// Load all configuration, writing defaults for anything missing or stale.
fn load_all(
    storage: &FileConfigStorage,
    layout: SettingsLayout,
) -> anyhow::Result<(DeviceSettings, KnownNetworks)> {
    let settings = ConfigHandlers::load_or_default(storage, DeviceSettings::defaults_for(layout))?;
    let networks = ConfigHandlers::networks_or_default(storage)?;
    ConfigHandlers::display_or_default(storage)?;
    Ok((settings, networks))
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Meter display settings service starting...");

    let storage = FileConfigStorage::new(config.data_dir.clone())?;
    let (settings, networks) = load_all(&storage, config.layout)?;

    if let Err(e) = validate_all(&settings, &networks) {
        for violation in &e.violations {
            tracing::warn!("Configuration problem: {}", violation);
        }
    }

    let primary = settings.primary_network();
    let plan: Vec<&str> = connection_plan(Some(&primary), &networks, None)
        .into_iter()
        .map(|n| n.ssid.as_str())
        .collect();
    tracing::info!(layout = %config.layout, tag = %settings.version_tag(), "Settings loaded");
    tracing::info!("WiFi connection order: {}", plan.join(", "));

    let state = ServerState::new(Arc::new(storage), config.layout);
    let app = create_router(Arc::new(state)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("HTTP API listening on http://{}/api", config.bind_addr);
    tracing::info!("Data directory: {}", config.data_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}

/// Read stored configuration without writing anything back. Missing, stale
/// or unreadable records are replaced by defaults in the returned values.
fn stored_or_defaults<S: ConfigStorage + ?Sized>(
    storage: &S,
    layout: SettingsLayout,
) -> Result<(DeviceSettings, KnownNetworks), ConfigError> {
    let settings = match storage.load_settings(layout) {
        Ok(settings) => settings,
        Err(e) if e.is_recoverable() => {
            tracing::warn!("Stored settings unusable ({}), checking defaults", e);
            DeviceSettings::defaults_for(layout)
        }
        Err(e) => return Err(e),
    };
    let networks = match storage.load_networks() {
        Ok(networks) => networks,
        Err(e) if e.is_recoverable() => {
            tracing::warn!("Stored networks unusable ({}), checking defaults", e);
            KnownNetworks::defaults()
        }
        Err(e) => return Err(e),
    };
    Ok((settings, networks))
}

/// Validate stored configuration without modifying it.
fn check(config: &Config) -> anyhow::Result<()> {
    let storage = FileConfigStorage::new(config.data_dir.clone())?;
    let (settings, networks) = stored_or_defaults(&storage, config.layout)?;

    if let Err(e) = validate_all(&settings, &networks) {
        for violation in &e.violations {
            tracing::error!("{}", violation);
        }
        bail!("configuration check failed: {}", e);
    }

    tracing::info!(
        tag = %settings.version_tag(),
        networks = networks.len(),
        "Configuration OK"
    );
    Ok(())
}

/// Write the EEPROM image of the stored settings to `path`.
fn export_image(config: &Config, path: &str) -> anyhow::Result<()> {
    let storage = FileConfigStorage::new(config.data_dir.clone())?;
    let (settings, _) = load_all(&storage, config.layout)?;

    let bytes = image::encode(&settings)?;
    std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path))?;

    tracing::info!(
        bytes = bytes.len(),
        tag = %settings.version_tag(),
        "Wrote settings image to {}",
        path
    );
    Ok(())
}
