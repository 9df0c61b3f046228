//! Usage routes.
//!
//! # Endpoints
//!
//! ### `GET /api/limits`
//! Returns today's reference maxima.
//!
//! ### `POST /api/usage/close-day`
//! Closes the day with the current meter totals. Returns the day's usage,
//! the commodities that went over the day's limits and the limits for the
//! new day.
//!
//! **Request:**
//! ```json
//! { "power": 1012, "gas": 203, "water": 30250 }
//! ```

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use meterdisplay_core::{
    Commodity, ConfigHandlers, DailyLimits, DailyUsage, DeviceSettings, MeterReadings,
};
use serde::Serialize;

use crate::{ApiError, AppState};

/// Result of closing a day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseDayResponse {
    pub usage: DailyUsage,
    pub exceeded: Vec<Commodity>,
    pub limits: DailyLimits,
}

/// Create usage routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/limits", get(get_limits))
        .route("/api/usage/close-day", post(close_day))
}

/// GET /api/limits
async fn get_limits(State(state): State<AppState>) -> Result<Json<DailyLimits>, ApiError> {
    let _guard = state.write_lock.lock().await;
    ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;
    let limits = ConfigHandlers::limits(state.storage.as_ref(), state.layout)?;
    Ok(Json(limits))
}

/// POST /api/usage/close-day
async fn close_day(
    State(state): State<AppState>,
    Json(current): Json<MeterReadings>,
) -> Result<Json<CloseDayResponse>, ApiError> {
    let _guard = state.write_lock.lock().await;
    ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;

    let previous = ConfigHandlers::limits(state.storage.as_ref(), state.layout)?;
    let (usage, limits) = ConfigHandlers::close_day(state.storage.as_ref(), state.layout, current)?;
    let exceeded = previous.exceeded_by(&usage);

    if !exceeded.is_empty() {
        tracing::warn!(?exceeded, "Daily limits exceeded");
    }

    Ok(Json(CloseDayResponse {
        usage,
        exceeded,
        limits,
    }))
}
