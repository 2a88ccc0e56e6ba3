//! parla-server – Bibliotheks-Root
//!
//! HTTP-Oberflaeche des Relays:
//!
//! | Route           | Zweck                                            |
//! |-----------------|--------------------------------------------------|
//! | `GET /`         | Lebenszeichen                                    |
//! | `POST /voice`   | TwiML-Webhook, verbindet den Anruf mit dem Stream |
//! | `GET {media}`   | WebSocket-Upgrade, ein Task pro Anruf             |
//! | `GET /health`   | Health-Check                                     |
//! | `GET /metrics`  | Prometheus                                       |

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use config::ServerConfig;
use parla_audio::AmbientQuelle;
use parla_observability::{
    observability_router, request_timing_layer, timing_middleware, HealthState, ParlaMetrics,
};
use parla_relay::AnrufRelay;
use parla_store::InMemoryStore;

/// Geteilter Zustand der HTTP-Handler
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<AnrufRelay>,
    pub media_pfad: String,
    pub region: String,
}

/// Baut den vollstaendigen Router
pub fn router(state: AppState, metriken: ParlaMetrics, health: Option<HealthState>) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/voice", post(voice))
        .route(&state.media_pfad, get(media_stream))
        .with_state(state);

    if let Some(health) = health {
        app = app.merge(observability_router(metriken.clone(), health));
    }

    app.layer(axum::middleware::from_fn_with_state(
        metriken,
        timing_middleware,
    ))
    .layer(request_timing_layer())
}

async fn index() -> &'static str {
    "Server running"
}

/// TwiML-Antwort: verbindet den Anruf mit dem Media-Stream dieses Servers
async fn voice(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    tracing::info!(host = %host, "Anruf eingegangen");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml(host, &state.media_pfad, &state.region),
    )
}

/// Erzeugt das TwiML-Dokument fuer `<Connect><Stream>`
pub fn twiml(host: &str, media_pfad: &str, region: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Connect>
    <Stream url="wss://{host}{pfad}">
      <Parameter name="Twilio-Region" value="{region}" />
    </Stream>
  </Connect>
</Response>"#,
        host = xml_maskieren(host),
        pfad = xml_maskieren(media_pfad),
        region = xml_maskieren(region),
    )
}

fn xml_maskieren(wert: &str) -> String {
    let mut aus = String::with_capacity(wert.len());
    for c in wert.chars() {
        match c {
            '&' => aus.push_str("&amp;"),
            '<' => aus.push_str("&lt;"),
            '>' => aus.push_str("&gt;"),
            '"' => aus.push_str("&quot;"),
            '\'' => aus.push_str("&apos;"),
            c => aus.push(c),
        }
    }
    aus
}

async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        match state.relay.anruf_bearbeiten(socket).await {
            Ok(statistik) => tracing::info!(
                grund = %statistik.grund,
                barge_ins = statistik.barge_ins,
                werkzeug_aufrufe = statistik.werkzeug_aufrufe,
                "Media-Stream beendet"
            ),
            Err(e) => tracing::warn!(fehler = %e, "Media-Stream abgebrochen"),
        }
    })
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    metriken: ParlaMetrics,
    health: HealthState,
    relay: Arc<AnrufRelay>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    ///
    /// Laedt das Ambient-Bett. Eine fehlerhafte Ambient-Datei deaktiviert
    /// nur das Bett, der Server startet trotzdem.
    pub fn neu(config: ServerConfig) -> Result<Self> {
        config.validieren()?;

        let metriken = ParlaMetrics::neu()?;
        let health = HealthState::neu(metriken.aktive_anrufe.clone());

        let ambient = match &config.ambient.datei {
            Some(pfad) => match AmbientQuelle::laden(pfad) {
                Ok(quelle) => Some(quelle),
                Err(e) => {
                    tracing::warn!(pfad = %pfad, fehler = %e, "Ambient-Datei nicht ladbar, Ambient-Bett deaktiviert");
                    None
                }
            },
            None => None,
        };

        let relay = AnrufRelay::neu(
            config.relay_config(),
            config.inferenz_config(),
            config.synthese_config(),
            Arc::new(InMemoryStore::neu()),
            ambient,
            Arc::new(metriken.clone()),
        )
        .context("Relay-Konfiguration ungueltig")?;

        Ok(Self {
            config,
            metriken,
            health,
            relay: Arc::new(relay),
        })
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            relay: Arc::clone(&self.relay),
            media_pfad: self.config.server.media_pfad.clone(),
            region: self.config.server.region.clone(),
        };
        let health = self
            .config
            .observability
            .aktiviert
            .then(|| self.health.clone());
        router(state, self.metriken.clone(), health)
    }

    /// Startet den HTTP-Server und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.bind_adresse();
        let listener = tokio::net::TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;

        tracing::info!(
            adresse = %adresse,
            media_pfad = %self.config.server.media_pfad,
            region = %self.config.server.region,
            ambient = self.config.ambient.datei.is_some(),
            "Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );

        let health = self.health.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(fehler = %e, "Signal-Handler nicht verfuegbar");
                }
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                health.herunterfahren();
            })
            .await?;

        Ok(())
    }
}
