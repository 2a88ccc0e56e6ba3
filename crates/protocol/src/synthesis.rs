//! Synthesedienst (Text-Stream rein, μ-law-Audio raus)
//!
//! Eine langlebige Verbindung pro Sitzung. Nach dem Aufbau wird einmal die
//! Initialisierung mit Stimmeinstellungen gesendet, danach Textstuecke mit
//! `flush`-Markierung. Der Dienst antwortet mit base64-kodierten
//! Audio-Stuecken.
//!
//! Ein leerer Text beendet beim Dienst den Eingabestrom. Ein leeres
//! Abschluss-Stueck wird deshalb als einzelnes Leerzeichen gesendet.

use parla_core::ParlaError;
use serde::{Deserialize, Serialize};

use crate::frame::AudioFrame;

/// Stimmeinstellungen der Initialisierungsnachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimmEinstellungen {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl Default for StimmEinstellungen {
    fn default() -> Self {
        Self {
            stability: 0.3,
            similarity_boost: 0.8,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerierungsKonfig {
    pub chunk_length_schedule: Vec<u32>,
}

/// Alle Nachrichten die der Relay an den Synthesedienst sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyntheseAnfrage {
    Initialisierung {
        text: String,
        voice_settings: StimmEinstellungen,
        generation_config: GenerierungsKonfig,
    },
    Text {
        text: String,
        flush: bool,
    },
    Stopp {
        stop: bool,
    },
}

impl SyntheseAnfrage {
    pub fn initialisierung(stimme: StimmEinstellungen, zeitplan: Vec<u32>) -> Self {
        Self::Initialisierung {
            text: " ".into(),
            voice_settings: stimme,
            generation_config: GenerierungsKonfig {
                chunk_length_schedule: zeitplan,
            },
        }
    }

    /// Textstueck, `abschluss` erzwingt die sofortige Synthese
    pub fn text(text: &str, abschluss: bool) -> Self {
        let text = if text.is_empty() { " " } else { text };
        Self::Text {
            text: text.to_string(),
            flush: abschluss,
        }
    }

    pub fn stopp() -> Self {
        Self::Stopp { stop: true }
    }

    pub fn als_json(&self) -> Result<String, ParlaError> {
        serde_json::to_string(self).map_err(|e| ParlaError::intern(format!("Synthese: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyntheseRoh {
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    is_final: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Normalisierte Antworten des Synthesedienstes
#[derive(Debug, Clone, PartialEq)]
pub enum SyntheseAntwort {
    Audio(AudioFrame),
    /// Der Dienst hat den aktuellen Eingabestrom fertig gesprochen
    Fertig,
    Fehler(String),
    /// Nachricht ohne Audio (z.B. nur Alignment-Daten)
    Leer,
}

impl SyntheseAntwort {
    pub fn parsen(text: &str) -> Result<Self, ParlaError> {
        let roh: SyntheseRoh = serde_json::from_str(text)
            .map_err(|e| ParlaError::UngueltigeNachricht(format!("Synthese: {e}")))?;

        if let Some(fehler) = roh.error {
            let nachricht = match roh.message {
                Some(m) => format!("{fehler}: {m}"),
                None => fehler,
            };
            return Ok(Self::Fehler(nachricht));
        }

        match roh.audio.filter(|a| !a.is_empty()) {
            Some(audio) => Ok(Self::Audio(AudioFrame::aus_base64(&audio)?)),
            None if roh.is_final == Some(true) => Ok(Self::Fertig),
            None => Ok(Self::Leer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialisierung_format() {
        let json = SyntheseAnfrage::initialisierung(StimmEinstellungen::default(), vec![50])
            .als_json()
            .unwrap();
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["text"], " ");
        assert_eq!(wert["voice_settings"]["use_speaker_boost"], true);
        assert_eq!(wert["generation_config"]["chunk_length_schedule"][0], 50);
    }

    #[test]
    fn text_format() {
        let json = SyntheseAnfrage::text("Hallo,", false).als_json().unwrap();
        assert_eq!(json, r#"{"text":"Hallo,","flush":false}"#);
    }

    #[test]
    fn leerer_abschluss_wird_leerzeichen() {
        let json = SyntheseAnfrage::text("", true).als_json().unwrap();
        assert_eq!(json, r#"{"text":" ","flush":true}"#);
    }

    #[test]
    fn stopp_format() {
        assert_eq!(
            SyntheseAnfrage::stopp().als_json().unwrap(),
            r#"{"stop":true}"#
        );
    }

    #[test]
    fn audio_antwort_parsen() {
        let a = SyntheseAntwort::parsen(r#"{"audio":"//8=","isFinal":null}"#).unwrap();
        assert_eq!(a, SyntheseAntwort::Audio(AudioFrame::from(vec![0xFF, 0xFF])));
    }

    #[test]
    fn abschluss_und_leer_parsen() {
        assert_eq!(
            SyntheseAntwort::parsen(r#"{"isFinal":true}"#).unwrap(),
            SyntheseAntwort::Fertig
        );
        assert_eq!(
            SyntheseAntwort::parsen(r#"{"audio":null,"normalizedAlignment":{}}"#).unwrap(),
            SyntheseAntwort::Leer
        );
    }

    #[test]
    fn fehler_antwort_parsen() {
        let a = SyntheseAntwort::parsen(r#"{"message":"quota","error":"rate_limited"}"#).unwrap();
        assert_eq!(a, SyntheseAntwort::Fehler("rate_limited: quota".into()));
    }
}
