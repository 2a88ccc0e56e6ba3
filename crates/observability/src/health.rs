//! Health-Check-Endpunkt fuer Parla
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Startzeit, Uptime und laufenden Anrufen.
//! Waehrend des Herunterfahrens antwortet der Endpunkt mit 503.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use prometheus::IntGauge;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub active_calls: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start: Instant,
    gestartet_um: DateTime<Utc>,
    aktive_anrufe: IntGauge,
    faehrt_herunter: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu(aktive_anrufe: IntGauge) -> Self {
        Self {
            start: Instant::now(),
            gestartet_um: Utc::now(),
            aktive_anrufe,
            faehrt_herunter: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend (Health -> 503)
    pub fn herunterfahren(&self) {
        self.faehrt_herunter.store(true, Ordering::Relaxed);
    }

    pub fn antwort(&self) -> HealthResponse {
        let status = if self.faehrt_herunter.load(Ordering::Relaxed) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        };
        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: self.gestartet_um,
            uptime_seconds: self.uptime_seconds(),
            active_calls: self.aktive_anrufe.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn gauge() -> IntGauge {
        IntGauge::new("test_aktive_anrufe", "test").unwrap()
    }

    #[test]
    fn antwort_enthaelt_aktive_anrufe() {
        let g = gauge();
        let state = HealthState::neu(g.clone());
        g.set(3);
        let antwort = state.antwort();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.active_calls, 3);
        assert!(antwort.uptime_seconds < 5);
    }

    #[test]
    fn herunterfahren_macht_unhealthy() {
        let state = HealthState::neu(gauge());
        state.clone().herunterfahren();
        assert_eq!(state.antwort().status, HealthStatus::Unhealthy);
    }

    #[test]
    fn health_response_serialisierung() {
        let state = HealthState::neu(gauge());
        let json = serde_json::to_string(&state.antwort()).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"active_calls\":0"));
        assert!(json.contains("\"started_at\""));
    }

    #[tokio::test]
    async fn endpunkt_liefert_503_beim_herunterfahren() {
        let state = HealthState::neu(gauge());
        let app = health_router(state.clone());

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        state.herunterfahren();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "unhealthy");
    }
}
