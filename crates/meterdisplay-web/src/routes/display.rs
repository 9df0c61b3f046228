//! Display configuration routes.
//!
//! # Endpoints
//!
//! ### `GET /api/display`
//! Returns the rotation (index and degrees) and the start screen.
//!
//! ### `PUT /api/display`
//! Sets the rotation and, when given, the start screen. Rotations outside
//! `0..=3` are rejected with 422.

use axum::{extract::State, response::Json, routing::get, Router};
use meterdisplay_core::{
    ConfigHandlers, ConfigStorage, DeviceSettings, DisplayConfig, ScreenRotation,
};
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

/// Display state as exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    pub rotation: ScreenRotation,
    pub degrees: u16,
    pub screen: u8,
}

/// Body of `PUT /api/display`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayUpdate {
    pub rotation: ScreenRotation,
    #[serde(default)]
    pub screen: Option<u8>,
}

/// Create display routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/display", get(get_display).put(put_display))
}

fn view(display: DisplayConfig, settings: &DeviceSettings) -> DisplayView {
    DisplayView {
        rotation: display.rotation,
        degrees: display.rotation.degrees(),
        screen: settings.display_screen,
    }
}

/// GET /api/display
async fn get_display(State(state): State<AppState>) -> Result<Json<DisplayView>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let display = ConfigHandlers::display_or_default(state.storage.as_ref())?;
    let settings = ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;
    Ok(Json(view(display, &settings)))
}

/// PUT /api/display
async fn put_display(
    State(state): State<AppState>,
    Json(update): Json<DisplayUpdate>,
) -> Result<Json<DisplayView>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let mut settings = ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;

    // Settings go first so a rejected record leaves the rotation untouched.
    if let Some(screen) = update.screen {
        settings.display_screen = screen;
        ConfigHandlers::put_settings(state.storage.as_ref(), state.layout, &settings)?;
    }

    let config = DisplayConfig {
        rotation: update.rotation,
    };
    state.storage.save_display(&config)?;

    let degrees = config.rotation.degrees();
    tracing::info!(degrees, "Display updated");
    Ok(Json(view(config, &settings)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use meterdisplay_core::{
        ConfigStorage, DeviceSettings, DisplayConfig, ScreenRotation, SettingsLayout,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_get_display_defaults() {
        let (app, _) = app(SettingsLayout::EnergyAndWater);
        let (status, json) = send(&app, Method::GET, "/api/display", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"rotation": 0, "degrees": 0, "screen": 0}));
    }

    #[tokio::test]
    async fn test_put_display() {
        let (app, storage) = app(SettingsLayout::EnergyAndWater);
        let (status, json) = send(
            &app,
            Method::PUT,
            "/api/display",
            Some(json!({"rotation": 3, "screen": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"rotation": 3, "degrees": 270, "screen": 2}));
        assert_eq!(storage.load_display().unwrap().rotation, ScreenRotation::Deg270);
        assert_eq!(
            storage
                .load_settings(SettingsLayout::EnergyAndWater)
                .unwrap()
                .display_screen,
            2
        );
    }

    #[tokio::test]
    async fn test_put_display_rotation_only() {
        let (app, _) = app(SettingsLayout::EnergyOnly);
        let (status, json) =
            send(&app, Method::PUT, "/api/display", Some(json!({"rotation": 1}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["degrees"], 90);
        assert_eq!(json["screen"], 0);
    }

    #[tokio::test]
    async fn test_put_display_rejects_bad_rotation() {
        let (app, storage) = app(SettingsLayout::EnergyOnly);
        let (status, _) =
            send(&app, Method::PUT, "/api/display", Some(json!({"rotation": 4}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!storage.has_key("display"));
    }

    #[tokio::test]
    async fn test_put_display_invalid_settings_keeps_rotation() {
        let (app, storage) = app(SettingsLayout::EnergyAndWater);
        let mut settings = DeviceSettings::energy_and_water_defaults();
        settings.max_phase_power_watts = 20_000;
        settings.max_total_power_watts = 10_000;
        storage.save_settings(&settings).unwrap();
        storage
            .save_display(&DisplayConfig {
                rotation: ScreenRotation::Deg90,
            })
            .unwrap();

        let (status, json) = send(
            &app,
            Method::PUT,
            "/api/display",
            Some(json!({"rotation": 2, "screen": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["violations"].as_array().unwrap().len(), 1);
        assert_eq!(storage.load_display().unwrap().rotation, ScreenRotation::Deg90);
        assert_eq!(
            storage
                .load_settings(SettingsLayout::EnergyAndWater)
                .unwrap()
                .display_screen,
            0
        );
    }
}
