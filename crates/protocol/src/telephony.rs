//! Telefonie-Media-Stream (JSON ueber WebSocket)
//!
//! Eingehend sendet der Anbieter `connected`, `start`, `media`, `mark` und
//! `stop`. Ausgehend sendet der Relay `media`, `clear` und `mark`, jeweils
//! mit der Stream-ID der Sitzung.
//!
//! ## Design
//! - Tagged Enums ueber das Feld `event`
//! - Unbekannte Ereignisse (z.B. `dtmf`) werden als `Unbekannt` gelesen
//!   und vom Relay ignoriert

use std::collections::HashMap;

use parla_core::{ParlaError, StreamId};
use serde::{Deserialize, Serialize};

use crate::frame::AudioFrame;

// ---------------------------------------------------------------------------
// Eingehende Nachrichten
// ---------------------------------------------------------------------------

/// Metadaten des `start`-Ereignisses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInfo {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

/// Nutzlast eines eingehenden `media`-Ereignisses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEingang {
    /// base64-kodiertes μ-law-Audio
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInfo {
    #[serde(default)]
    pub call_sid: Option<String>,
}

/// Alle Ereignisse die der Telefonieanbieter sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelefonieEingang {
    Connected,
    Start {
        start: StartInfo,
    },
    Media {
        media: MediaEingang,
    },
    Mark {
        mark: MarkInfo,
    },
    Stop {
        #[serde(default)]
        stop: StopInfo,
    },
    #[serde(other)]
    Unbekannt,
}

impl TelefonieEingang {
    /// Parst eine Textnachricht des Anbieters
    pub fn parsen(text: &str) -> Result<Self, ParlaError> {
        serde_json::from_str(text)
            .map_err(|e| ParlaError::UngueltigeNachricht(format!("Telefonie: {e}")))
    }

    /// Dekodiert das Audio eines `media`-Ereignisses
    pub fn audio(&self) -> Option<Result<AudioFrame, ParlaError>> {
        match self {
            Self::Media { media } => Some(AudioFrame::aus_base64(&media.payload)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAusgang {
    pub payload: String,
}

/// Alle Nachrichten die der Relay an den Anbieter sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelefonieAusgang {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaAusgang,
    },
    /// Verwirft bereits gepuffertes Audio beim Anbieter (Barge-in)
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkInfo,
    },
}

impl TelefonieAusgang {
    pub fn media(stream_id: &StreamId, frame: &AudioFrame) -> Self {
        Self::Media {
            stream_sid: stream_id.as_str().to_string(),
            media: MediaAusgang {
                payload: frame.als_base64(),
            },
        }
    }

    pub fn clear(stream_id: &StreamId) -> Self {
        Self::Clear {
            stream_sid: stream_id.as_str().to_string(),
        }
    }

    pub fn mark(stream_id: &StreamId, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_id.as_str().to_string(),
            mark: MarkInfo { name: name.into() },
        }
    }

    pub fn als_json(&self) -> Result<String, ParlaError> {
        serde_json::to_string(self).map_err(|e| ParlaError::intern(format!("Telefonie: {e}")))
    }
}
