//! Fehlertypen fuer den Reservierungsspeicher

use thiserror::Error;

use crate::models::RowId;

/// Speicher-Fehlertypen
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Reservierung nicht gefunden: {0}")]
    NichtGefunden(RowId),

    #[error("Reservierung bereits storniert: {0}")]
    BereitsStorniert(RowId),

    #[error("Interner Speicherfehler: {0}")]
    Intern(String),
}

impl StoreError {
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeDaten(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
