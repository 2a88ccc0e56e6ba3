//! Inferenz-Bein – Realtime-Verbindung zum Sprachmodell
//!
//! Nach dem Verbindungsaufbau geht als erstes `session.update` raus,
//! danach fortlaufend das Anruferaudio. Antworten kommen als
//! [`InferenzEreignis`] ueber den Empfangskanal der Sitzung.

use parla_core::{GenerationId, ToolCallId};
use parla_protocol::{AudioFrame, InferenzAnfrage, InferenzEreignis, SitzungsKonfiguration};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};

use crate::bein;
use crate::config::InferenzConfig;
use crate::error::{RelayError, RelayResult};
use crate::telephony::KANAL_GROESSE;

const BEIN: &str = "inferenz";

/// Sende-Handle der Sitzung auf das Inferenz-Bein
#[derive(Debug, Clone)]
pub struct InferenzBruecke {
    tx: mpsc::Sender<InferenzAnfrage>,
}

impl InferenzBruecke {
    pub fn kanal() -> (Self, mpsc::Receiver<InferenzAnfrage>) {
        let (tx, rx) = mpsc::channel(KANAL_GROESSE);
        (Self { tx }, rx)
    }

    pub async fn konfigurieren(&self, sitzung: SitzungsKonfiguration) -> RelayResult<()> {
        self.senden(InferenzAnfrage::SitzungAktualisieren { session: sitzung })
            .await
    }

    /// Anruferaudio anhaengen (`appendAudio`)
    pub async fn audio_anhaengen(&self, frame: &AudioFrame) -> RelayResult<()> {
        self.senden(InferenzAnfrage::AudioAnhaengen {
            audio: frame.als_base64(),
        })
        .await
    }

    /// Bricht genau diese Generierung ab (`cancelActive`)
    pub async fn abbrechen(&self, generierung: &GenerationId) -> RelayResult<()> {
        self.senden(InferenzAnfrage::abbrechen(generierung)).await
    }

    /// Fordert eine neue Antwort an (`requestTurn`)
    pub async fn zug_anfordern(&self) -> RelayResult<()> {
        self.senden(InferenzAnfrage::AntwortAnfordern).await
    }

    /// Liefert das Ergebnis eines Werkzeugaufrufs (`toolResult`)
    pub async fn werkzeug_ergebnis(&self, call_id: &ToolCallId, ausgabe: String) -> RelayResult<()> {
        self.senden(InferenzAnfrage::werkzeug_ergebnis(call_id, ausgabe))
            .await
    }

    /// Fuegt eine Assistenten-Nachricht ein (Begruessung)
    pub async fn assistent_sagen(&self, text: &str) -> RelayResult<()> {
        self.senden(InferenzAnfrage::assistent_nachricht(text))
            .await
    }

    async fn senden(&self, anfrage: InferenzAnfrage) -> RelayResult<()> {
        self.tx
            .send(anfrage)
            .await
            .map_err(|_| RelayError::SendFehler(BEIN))
    }
}

/// Baut die Verbindung auf und sendet die Sitzungskonfiguration
pub async fn verbinden(
    konfig: &InferenzConfig,
    sitzung: SitzungsKonfiguration,
) -> RelayResult<(InferenzBruecke, mpsc::Receiver<InferenzEreignis>)> {
    if konfig.api_schluessel.is_empty() {
        return Err(RelayError::Konfiguration(
            "API-Schluessel fuer den Inferenzdienst fehlt".into(),
        ));
    }

    let mut anfrage = konfig.verbindungs_url().into_client_request()?;
    let kopf = anfrage.headers_mut();
    kopf.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", konfig.api_schluessel))
            .map_err(|e| RelayError::Konfiguration(format!("API-Schluessel: {e}")))?,
    );
    kopf.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    let (socket, _antwort) = connect_async(anfrage)
        .await
        .map_err(|e| RelayError::verbindung(BEIN, e.to_string()))?;
    tracing::info!(modell = %konfig.modell, "Inferenzdienst verbunden");

    let (bruecke, ausgang_rx) = InferenzBruecke::kanal();
    bruecke.konfigurieren(sitzung).await?;

    let ereignisse = bein::pumpen(
        socket,
        ausgang_rx,
        BEIN,
        InferenzEreignis::parsen,
        InferenzAnfrage::als_json,
    );
    Ok((bruecke, ereignisse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abbruch_nennt_generierung() {
        let (b, mut rx) = InferenzBruecke::kanal();
        b.abbrechen(&GenerationId::neu("resp_7")).await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(InferenzAnfrage::AntwortAbbrechen {
                response_id: Some("resp_7".into())
            })
        );
    }

    #[tokio::test]
    async fn audio_wird_base64_kodiert() {
        let (b, mut rx) = InferenzBruecke::kanal();
        b.audio_anhaengen(&AudioFrame::from(vec![0xFF; 3]))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(InferenzAnfrage::AudioAnhaengen {
                audio: "////".into()
            })
        );
    }

    #[tokio::test]
    async fn ohne_schluessel_keine_verbindung() {
        let konfig = InferenzConfig::default();
        let ergebnis = verbinden(&konfig, konfig.sitzungs_konfiguration(vec![])).await;
        assert!(matches!(ergebnis, Err(RelayError::Konfiguration(_))));
    }
}
