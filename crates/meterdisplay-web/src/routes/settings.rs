//! Settings record routes.
//!
//! # Endpoints
//!
//! ### `GET /api/settings`
//! Returns the stored settings record with its version tag. The WiFi
//! password is replaced by a placeholder.
//!
//! ### `PUT /api/settings`
//! Replaces the settings record. The record must have the device's layout
//! (409 otherwise) and pass validation (422 with a list of violations
//! otherwise). Sending the placeholder as password keeps the stored one.

use axum::{extract::State, response::Json, routing::get, Router};
use meterdisplay_core::{ConfigError, ConfigHandlers, DeviceSettings};
use serde_json::Value;

use crate::{ApiError, AppState, REDACTED};

/// Create settings routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(put_settings))
}

/// JSON view of a record with the password hidden.
fn settings_view(settings: &DeviceSettings) -> Result<Value, ApiError> {
    let mut value =
        serde_json::to_value(settings).map_err(|e| ConfigError::InvalidData(e.to_string()))?;
    if !settings.password.is_empty() {
        value["password"] = Value::from(REDACTED);
    }
    value["chkDigit"] = Value::from(settings.version_tag().to_string());
    Ok(value)
}

/// GET /api/settings
async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let settings = ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;
    Ok(Json(settings_view(&settings)?))
}

/// PUT /api/settings
async fn put_settings(
    State(state): State<AppState>,
    Json(mut update): Json<DeviceSettings>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.write_lock.lock().await;

    if update.password.as_str() == REDACTED {
        let current = ConfigHandlers::load_or_default(
            state.storage.as_ref(),
            DeviceSettings::defaults_for(state.layout),
        )?;
        update.password = current.password;
    }

    ConfigHandlers::put_settings(state.storage.as_ref(), state.layout, &update)?;
    tracing::info!(ssid = %update.ssid, "Settings updated");
    Ok(Json(settings_view(&update)?))
}
