//! HTTP route handlers.
//!
//! All endpoints live under `/api`:
//! - `/api/settings` - settings record (passwords redacted on read)
//! - `/api/networks` - known networks and the connection plan
//! - `/api/display` - rotation and start screen
//! - `/api/usage`, `/api/limits` - day rollover and reference maxima

pub mod display;
pub mod networks;
pub mod settings;
pub mod usage;

use crate::AppState;
use axum::{extract::State, response::Json, routing::get, Router};

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(discovery_handler))
        .merge(api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(settings::routes())
        .merge(networks::routes())
        .merge(display::routes())
        .merge(usage::routes())
}

/// Handler for `/api`.
///
/// Describes the device layout and the available endpoints.
async fn discovery_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "layout": state.layout,
        "chkDigit": state.layout.tag(),
        "endpoints": [
            "/api/settings",
            "/api/networks",
            "/api/networks/plan",
            "/api/display",
            "/api/limits",
            "/api/usage/close-day"
        ],
        "server": {
            "id": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{create_router, ServerState};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use meterdisplay_core::{MemoryConfigStorage, SettingsLayout};
    use std::sync::Arc;
    use tower::ServiceExt;

    pub fn app(layout: SettingsLayout) -> (Router, Arc<MemoryConfigStorage>) {
        let storage = Arc::new(MemoryConfigStorage::new());
        let state = ServerState::new(storage.clone(), layout);
        (create_router(Arc::new(state)), storage)
    }

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Extractor rejections answer in plain text.
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use meterdisplay_core::SettingsLayout;

    #[tokio::test]
    async fn test_discovery() {
        let (app, _) = app(SettingsLayout::EnergyAndWater);
        let (status, json) = send(&app, Method::GET, "/api", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["layout"], "energy-and-water");
        assert_eq!(json["chkDigit"], "!");
        assert_eq!(json["server"]["id"], "meterdisplay-web");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _) = app(SettingsLayout::EnergyOnly);
        let (status, _) = send(&app, Method::GET, "/api/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
