//! Fehlertypen fuer Parla
//!
//! Fehler der Nachrichtenschicht. Verbindungs- und Sitzungsfehler liegen in
//! `parla-relay` (`RelayError`) und konvertieren diesen Typ via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Parla
pub type Result<T> = std::result::Result<T, ParlaError>;

#[derive(Debug, Error)]
pub enum ParlaError {
    /// Eingehende Nachricht nicht lesbar, wird gemeldet und verworfen
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl ParlaError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeNachricht(msg.into())
    }
}
