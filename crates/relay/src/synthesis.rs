//! Synthese-Bein – Text-Stream zur Sprachsynthese
//!
//! Eine Verbindung pro Anruf. Textstuecke des Chunkers gehen als
//! `{text, flush}` raus, das Audio kommt als [`SyntheseAntwort`] zurueck.

use parla_protocol::{SyntheseAnfrage, SyntheseAntwort};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::HeaderValue;

use crate::bein;
use crate::chunker::TextChunk;
use crate::config::SyntheseConfig;
use crate::error::{RelayError, RelayResult};
use crate::telephony::KANAL_GROESSE;

const BEIN: &str = "synthese";

/// Sende-Handle der Sitzung auf das Synthese-Bein
#[derive(Debug, Clone)]
pub struct SyntheseBruecke {
    tx: mpsc::Sender<SyntheseAnfrage>,
}

impl SyntheseBruecke {
    pub fn kanal() -> (Self, mpsc::Receiver<SyntheseAnfrage>) {
        let (tx, rx) = mpsc::channel(KANAL_GROESSE);
        (Self { tx }, rx)
    }

    /// Spricht ein Textstueck, Abschluss-Stuecke erzwingen `flush`
    pub async fn sprechen(&self, stueck: &TextChunk) -> RelayResult<()> {
        self.senden(SyntheseAnfrage::text(&stueck.text, stueck.ist_abschluss()))
            .await
    }

    /// Verwirft laufende Synthese, die Verbindung bleibt offen
    pub async fn stoppen(&self) -> RelayResult<()> {
        self.senden(SyntheseAnfrage::stopp()).await
    }

    async fn senden(&self, anfrage: SyntheseAnfrage) -> RelayResult<()> {
        self.tx
            .send(anfrage)
            .await
            .map_err(|_| RelayError::SendFehler(BEIN))
    }
}

/// Baut die Verbindung auf und sendet die Initialisierung
pub async fn verbinden(
    konfig: &SyntheseConfig,
) -> RelayResult<(SyntheseBruecke, mpsc::Receiver<SyntheseAntwort>)> {
    if konfig.api_schluessel.is_empty() {
        return Err(RelayError::Konfiguration(
            "API-Schluessel fuer den Synthesedienst fehlt".into(),
        ));
    }

    let mut anfrage = konfig.verbindungs_url().into_client_request()?;
    anfrage.headers_mut().insert(
        "xi-api-key",
        HeaderValue::from_str(&konfig.api_schluessel)
            .map_err(|e| RelayError::Konfiguration(format!("API-Schluessel: {e}")))?,
    );

    let (socket, _antwort) = connect_async(anfrage)
        .await
        .map_err(|e| RelayError::verbindung(BEIN, e.to_string()))?;
    tracing::info!(stimme = %konfig.stimme, modell = %konfig.modell, "Synthesedienst verbunden");

    let (bruecke, ausgang_rx) = SyntheseBruecke::kanal();
    bruecke
        .senden(SyntheseAnfrage::initialisierung(
            konfig.stimm_einstellungen.clone(),
            konfig.chunk_zeitplan.clone(),
        ))
        .await?;

    let antworten = bein::pumpen(
        socket,
        ausgang_rx,
        BEIN,
        SyntheseAntwort::parsen,
        SyntheseAnfrage::als_json,
    );
    Ok((bruecke, antworten))
}
