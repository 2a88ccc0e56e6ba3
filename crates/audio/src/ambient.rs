//! Ambient-Bett (Hintergrundspur)
//!
//! Die Quelle wird einmal beim Serverstart geladen und zwischen allen
//! Sitzungen geteilt. Jede Sitzung besitzt ein eigenes [`AmbientBett`] mit
//! eigenem Lesezeiger, das die Spur in 160-Byte-Fenstern endlos abspielt.
//!
//! ```text
//!  Quelle:  [##########################]   (Arc, read-only)
//!                ^ position
//!  Fenster: 160 Bytes ab position, am Ende zyklisch zum Anfang
//! ```
//!
//! Unterstuetzte Dateien:
//! - Roh-μ-law (8 kHz mono), z.B. `.ulaw` / `.raw`
//! - WAV 8 kHz mono 16 Bit PCM (wird beim Laden nach μ-law kodiert)

use std::path::Path;
use std::sync::Arc;

use parla_protocol::{AudioFrame, FRAME_BYTES};

use crate::codec::{encode_frame, scale};
use crate::error::{AudioError, AudioResult};

/// Erwartete Abtastrate der Quelle
pub const ABTASTRATE: u32 = 8000;

/// Geladene, geteilte Ambient-Spur (μ-law-Bytes)
#[derive(Debug, Clone)]
pub struct AmbientQuelle {
    samples: Arc<[u8]>,
}

impl AmbientQuelle {
    /// Erstellt eine Quelle aus bereits kodierten μ-law-Bytes
    pub fn aus_bytes(bytes: Vec<u8>) -> AudioResult<Self> {
        if bytes.is_empty() {
            return Err(AudioError::LeereQuelle);
        }
        Ok(Self {
            samples: Arc::from(bytes),
        })
    }

    /// Laedt eine Ambient-Datei von der Platte
    pub fn laden(pfad: impl AsRef<Path>) -> AudioResult<Self> {
        let pfad = pfad.as_ref();
        let ist_wav = pfad
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        let bytes = if ist_wav {
            wav_laden(pfad)?
        } else {
            std::fs::read(pfad).map_err(|e| AudioError::Datei {
                pfad: pfad.to_path_buf(),
                grund: e.to_string(),
            })?
        };

        tracing::debug!(
            pfad = %pfad.display(),
            bytes = bytes.len(),
            sekunden = bytes.len() as f64 / ABTASTRATE as f64,
            "Ambient-Quelle geladen"
        );
        Self::aus_bytes(bytes)
    }

    /// Erstellt ein Bett mit eigenem Lesezeiger fuer eine Sitzung
    pub fn bett(&self, lautstaerke: f32) -> AudioResult<AmbientBett> {
        if !lautstaerke.is_finite() || lautstaerke < 0.0 {
            return Err(AudioError::Lautstaerke(lautstaerke));
        }
        Ok(AmbientBett {
            samples: Arc::clone(&self.samples),
            position: 0,
            lautstaerke,
        })
    }

    pub fn laenge(&self) -> usize {
        self.samples.len()
    }
}

fn wav_laden(pfad: &Path) -> AudioResult<Vec<u8>> {
    let leser = hound::WavReader::open(pfad)?;
    let kopf = leser.spec();

    if kopf.sample_rate != ABTASTRATE
        || kopf.channels != 1
        || kopf.bits_per_sample != 16
        || kopf.sample_format != hound::SampleFormat::Int
    {
        return Err(AudioError::Format(format!(
            "{} Hz, {} Kanaele, {} Bit ({:?}) – erwartet 8000 Hz mono 16 Bit",
            kopf.sample_rate, kopf.channels, kopf.bits_per_sample, kopf.sample_format
        )));
    }

    let samples = leser
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()?;
    Ok(encode_frame(&samples))
}

/// Zyklischer Leser ueber eine Ambient-Quelle
#[derive(Debug, Clone)]
pub struct AmbientBett {
    samples: Arc<[u8]>,
    position: usize,
    lautstaerke: f32,
}

impl AmbientBett {
    /// Liefert das naechste 20-ms-Fenster, skaliert mit der Lautstaerke
    pub fn naechster_frame(&mut self) -> AudioFrame {
        let mut fenster = Vec::with_capacity(FRAME_BYTES);
        let laenge = self.samples.len();
        while fenster.len() < FRAME_BYTES {
            let rest = FRAME_BYTES - fenster.len();
            let ende = (self.position + rest).min(laenge);
            fenster.extend_from_slice(&self.samples[self.position..ende]);
            self.position = if ende == laenge { 0 } else { ende };
        }
        scale(&AudioFrame::from(fenster), self.lautstaerke)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn lautstaerke(&self) -> f32 {
        self.lautstaerke
    }
}
