//! Known network routes.
//!
//! # Endpoints
//!
//! ### `GET /api/networks`
//! Returns the known networks in order, passwords replaced by a placeholder.
//!
//! ### `PUT /api/networks`
//! Replaces the list. A placeholder password keeps the stored password of
//! the network with the same SSID.
//!
//! ### `GET /api/networks/plan?visible=ssid1,ssid2`
//! Returns the SSIDs in the order they would be tried, starting with the
//! primary network. With `visible`, only networks seen in that scan remain.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use meterdisplay_core::{
    connection_plan, ConfigError, ConfigHandlers, DeviceSettings, KnownNetworks, ValidationError,
    Violation,
};
use serde::Deserialize;

use crate::{ApiError, AppState, REDACTED};

/// Create network routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/networks", get(get_networks).put(put_networks))
        .route("/api/networks/plan", get(get_plan))
}

fn redacted(networks: &KnownNetworks) -> KnownNetworks {
    let mut networks = networks.clone();
    for network in networks.iter_mut() {
        if !network.password.is_empty() {
            network.password = REDACTED.to_string();
        }
    }
    networks
}

/// GET /api/networks
async fn get_networks(State(state): State<AppState>) -> Result<Json<KnownNetworks>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let networks = ConfigHandlers::networks_or_default(state.storage.as_ref())?;
    Ok(Json(redacted(&networks)))
}

/// PUT /api/networks
async fn put_networks(
    State(state): State<AppState>,
    Json(mut update): Json<KnownNetworks>,
) -> Result<Json<KnownNetworks>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let current = ConfigHandlers::networks_or_default(state.storage.as_ref())?;

    let mut unresolved = Vec::new();
    for (index, network) in update.iter_mut().enumerate() {
        if network.password != REDACTED {
            continue;
        }
        match current.find(&network.ssid) {
            Some(stored) => network.password = stored.password.clone(),
            None => unresolved.push(Violation::UnknownStoredPassword {
                index,
                ssid: network.ssid.clone(),
            }),
        }
    }
    if !unresolved.is_empty() {
        return Err(ConfigError::Invalid(ValidationError {
            violations: unresolved,
        })
        .into());
    }

    ConfigHandlers::put_networks(state.storage.as_ref(), &update)?;
    tracing::info!(count = update.len(), "Known networks updated");
    Ok(Json(redacted(&update)))
}

#[derive(Debug, Deserialize)]
struct PlanQuery {
    /// Comma-separated SSIDs seen in a scan.
    visible: Option<String>,
}

/// GET /api/networks/plan
async fn get_plan(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let _guard = state.write_lock.lock().await;
    let settings = ConfigHandlers::load_or_default(
        state.storage.as_ref(),
        DeviceSettings::defaults_for(state.layout),
    )?;
    let known = ConfigHandlers::networks_or_default(state.storage.as_ref())?;

    let visible: Option<Vec<String>> = query.visible.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|ssid| !ssid.is_empty())
            .map(String::from)
            .collect()
    });

    let primary = settings.primary_network();
    let plan = connection_plan(Some(&primary), &known, visible.as_deref())
        .into_iter()
        .map(|network| network.ssid.clone())
        .collect();
    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use meterdisplay_core::{ConfigStorage, SettingsLayout};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_networks_redacted() {
        let (app, _) = app(SettingsLayout::EnergyAndWater);
        let (status, json) = send(&app, Method::GET, "/api/networks", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[0]["ssid"], "PI4RAZ");
        assert_eq!(json[0]["password"], "********");
    }

    #[tokio::test]
    async fn test_put_networks_keeps_redacted_passwords() {
        let (app, storage) = app(SettingsLayout::EnergyAndWater);
        let body = json!([
            {"ssid": "Loretz_Gast", "password": "********"},
            {"ssid": "Cafe", "password": "latte-art"}
        ]);

        let (status, json) = send(&app, Method::PUT, "/api/networks", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[1]["password"], "********");

        let stored = storage.load_networks().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.find("Loretz_Gast").unwrap().password, "Lor_Steg_98");
        assert_eq!(stored.find("Cafe").unwrap().password, "latte-art");
    }

    #[tokio::test]
    async fn test_put_networks_violation() {
        let (app, _) = app(SettingsLayout::EnergyOnly);
        let body = json!([{"ssid": "", "password": "x"}]);

        let (status, json) = send(&app, Method::PUT, "/api/networks", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["violations"][0], "known network #0 has an empty SSID");
    }

    #[tokio::test]
    async fn test_put_networks_rejects_unknown_masked_password() {
        let (app, storage) = app(SettingsLayout::EnergyAndWater);
        let body = json!([
            {"ssid": "PI4RAZ", "password": "********"},
            {"ssid": "NewNet", "password": "********"}
        ]);

        let (status, json) = send(&app, Method::PUT, "/api/networks", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json["violations"][0],
            "known network 'NewNet' has no stored password to keep"
        );

        let stored = storage.load_networks().unwrap();
        assert!(stored.find("NewNet").is_none());
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_connection_plan() {
        let (app, _) = app(SettingsLayout::EnergyOnly);

        let (status, json) = send(&app, Method::GET, "/api/networks/plan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!(["YourSSID", "PI4RAZ", "Loretz_Gast", "YourWiFi"]));

        let (_, json) = send(
            &app,
            Method::GET,
            "/api/networks/plan?visible=YourWiFi,Loretz_Gast",
            None,
        )
        .await;
        assert_eq!(json, json!(["Loretz_Gast", "YourWiFi"]));
    }
}
