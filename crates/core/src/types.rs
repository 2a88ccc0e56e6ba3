//! Gemeinsame Identifikationstypen fuer Parla
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Die IDs der
//! externen Dienste (Stream, Generierung, Werkzeugaufruf) sind opake
//! Strings, nur die Sitzungs-ID wird lokal erzeugt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opake Stream-ID des Telefonieanbieters, Schluessel einer Anrufsitzung
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream:{}", self.0)
    }
}

/// Kennung der laufenden Antwort des Inferenzdienstes
///
/// Wird als Ziel fuer Abbrueche verwendet. Pro Sitzung ist hoechstens
/// eine Generierung aktiv.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(pub String);

impl GenerationId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "generierung:{}", self.0)
    }
}

/// Korrelations-ID eines Werkzeugaufrufs (Anfrage und Ergebnis 1:1)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallId(pub String);

impl ToolCallId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aufruf:{}", self.0)
    }
}

/// Lokale Sitzungs-ID (fuer Logs, bevor die Stream-ID bekannt ist)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitzung:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
    }

    #[test]
    fn stream_id_display() {
        let id = StreamId::neu("MZ123");
        assert_eq!(id.to_string(), "stream:MZ123");
        assert_eq!(id.as_str(), "MZ123");
    }

    #[test]
    fn generation_id_vergleich() {
        assert_eq!(GenerationId::neu("resp_1"), GenerationId::neu("resp_1"));
        assert_ne!(GenerationId::neu("resp_1"), GenerationId::neu("resp_2"));
    }

    #[test]
    fn ids_sind_transparent_serialisiert() {
        let id = ToolCallId::neu("call_abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"call_abc\"");
        let zurueck: ToolCallId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, zurueck);
    }
}
