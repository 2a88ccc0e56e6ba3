//! Fehlertypen fuer den Relay

use parla_core::{ParlaError, StreamId};
use thiserror::Error;

/// Fehlertyp fuer Anrufsitzungen und ihre Beine
#[derive(Debug, Error)]
pub enum RelayError {
    /// Ein Bein ist nicht erreichbar oder wurde abgewiesen
    #[error("Verbindung fehlgeschlagen ({bein}): {grund}")]
    Verbindung { bein: &'static str, grund: String },

    /// WebSocket-Fehler eines Dienst-Beins
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Ausgehender Kanal eines Beins ist geschlossen
    #[error("Senden fehlgeschlagen ({0}): Bein geschlossen")]
    SendFehler(&'static str),

    /// Telefonie-Stream wurde vor dem `start`-Ereignis beendet
    #[error("Kein Stream-Start empfangen")]
    KeinStart,

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error(transparent)]
    Protokoll(#[from] ParlaError),

    /// Fuer diese Stream-ID laeuft bereits eine Sitzung
    #[error("Stream {0} ist bereits aktiv")]
    DoppelterStream(StreamId),
}

impl RelayError {
    pub fn verbindung(bein: &'static str, grund: impl Into<String>) -> Self {
        Self::Verbindung {
            bein,
            grund: grund.into(),
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
