//! Audio-Frame (8 kHz, 8 Bit μ-law, mono)
//!
//! Ein Frame ist eine unveraenderliche Byte-Sequenz. Auf dem Draht wird er
//! base64-kodiert transportiert. Die Standardgroesse betraegt 160 Bytes,
//! das entspricht 20 ms Audio.
//!
//! ```text
//! 8000 Samples/s * 0.020 s = 160 Samples = 160 Bytes (1 Byte pro Sample)
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use parla_core::ParlaError;

/// Bytes pro 20-ms-Frame
pub const FRAME_BYTES: usize = 160;

/// μ-law-Kodierung von Stille (linear 0)
pub const STILLE_BYTE: u8 = 0xFF;

/// Unveraenderlicher μ-law-Audio-Frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioFrame(Bytes);

impl AudioFrame {
    pub fn neu(daten: impl Into<Bytes>) -> Self {
        Self(daten.into())
    }

    /// Erzeugt einen Stille-Frame der Standardgroesse
    pub fn stille() -> Self {
        Self(Bytes::from(vec![STILLE_BYTE; FRAME_BYTES]))
    }

    /// Dekodiert eine base64-Nutzlast vom Draht
    pub fn aus_base64(nutzlast: &str) -> Result<Self, ParlaError> {
        let daten = STANDARD
            .decode(nutzlast)
            .map_err(|e| ParlaError::UngueltigeNachricht(format!("base64: {e}")))?;
        Ok(Self(Bytes::from(daten)))
    }

    /// Kodiert den Frame als base64 fuer den Draht
    pub fn als_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Fuellt einen kurzen Frame mit Stille auf die Standardgroesse auf
    pub fn aufgefuellt(daten: &[u8]) -> Self {
        let mut v = Vec::with_capacity(FRAME_BYTES.max(daten.len()));
        v.extend_from_slice(daten);
        if v.len() < FRAME_BYTES {
            v.resize(FRAME_BYTES, STILLE_BYTE);
        }
        Self(Bytes::from(v))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn laenge(&self) -> usize {
        self.0.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.0.is_empty()
    }

    /// Dauer des Frames in Millisekunden bei 8 kHz
    pub fn dauer_ms(&self) -> u64 {
        (self.0.len() as u64) / 8
    }
}

impl From<Vec<u8>> for AudioFrame {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}
