//! Fehlertypen fuer Codec und Ambient-Quelle

use std::path::PathBuf;

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Bausteine
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audiodatei nicht lesbar ({pfad}): {grund}")]
    Datei { pfad: PathBuf, grund: String },

    #[error("Nicht unterstuetztes Audioformat: {0}")]
    Format(String),

    #[error("Audioquelle ist leer")]
    LeereQuelle,

    #[error("Ungueltige Lautstaerke: {0}")]
    Lautstaerke(f32),

    #[error("WAV-Fehler: {0}")]
    Wav(#[from] hound::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
