//! # meterdisplay-web
//!
//! REST API and file-backed configuration storage for the meter display.
//!
//! This crate provides:
//! - [`FileConfigStorage`], one JSON file per configuration key
//! - REST endpoints to read and update settings, known networks and the
//!   display configuration, and to close the day
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meterdisplay_web::{create_router, FileConfigStorage, ServerState};
//!
//! let storage = FileConfigStorage::new("/var/lib/meterdisplay")?;
//! let state = ServerState::new(Arc::new(storage), SettingsLayout::EnergyAndWater);
//! let app = create_router(Arc::new(state));
//!
//! let listener = TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod routes;
pub mod storage;

// Re-exports
pub use error::ApiError;
pub use routes::create_router;
pub use storage::FileConfigStorage;

use meterdisplay_core::{ConfigStorage, SettingsLayout};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Placeholder shown instead of stored passwords.
///
/// A password equal to this value in an update keeps the stored password.
pub const REDACTED: &str = "********";

/// Shared state for all route handlers.
pub struct ServerState {
    /// Where configuration is persisted.
    pub storage: Arc<dyn ConfigStorage>,

    /// Settings layout this device was built for.
    pub layout: SettingsLayout,

    /// Held across read-modify-write cycles on the storage.
    pub write_lock: Mutex<()>,
}

impl ServerState {
    /// Create new server state.
    pub fn new(storage: Arc<dyn ConfigStorage>, layout: SettingsLayout) -> Self {
        Self {
            storage,
            layout,
            write_lock: Mutex::new(()),
        }
    }
}

/// Type alias for shared state in Axum handlers.
pub type AppState = Arc<ServerState>;
