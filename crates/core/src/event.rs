//! Sitzungsereignisse und Ereignis-Senke
//!
//! Der Sitzungscontroller meldet Lebenszyklus- und Zaehlereignisse an
//! eine [`EreignisSenke`]. Die Prometheus-Implementierung liegt in
//! `parla-observability`, Tests verwenden [`KeineSenke`] oder eine
//! sammelnde Senke.

use crate::types::StreamId;
use serde::{Deserialize, Serialize};

/// Art eines ausgehenden Audio-Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameArt {
    Sprache,
    Ambient,
}

impl FrameArt {
    pub fn als_label(&self) -> &'static str {
        match self {
            Self::Sprache => "sprache",
            Self::Ambient => "ambient",
        }
    }
}

/// Alle Ereignisse die eine Anrufsitzung nach aussen meldet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SitzungsEreignis {
    /// Der Telefonie-Stream wurde gestartet
    AnrufBegonnen { stream_id: StreamId },
    /// Der Anrufer hat die laufende Ausgabe unterbrochen
    BargeIn { stream_id: StreamId },
    /// Ein Werkzeugaufruf wurde abgeschlossen
    WerkzeugAufgerufen { werkzeug: String, erfolg: bool },
    /// Ein Audio-Frame wurde an die Telefonie gesendet
    FrameGesendet { art: FrameArt },
    /// Die Sitzung ist vollstaendig abgebaut
    AnrufBeendet { stream_id: StreamId, grund: String },
}

/// Empfaenger fuer Sitzungsereignisse
///
/// `melden` wird aus dem Sitzungs-Task aufgerufen und darf nicht blockieren.
pub trait EreignisSenke: Send + Sync + 'static {
    fn melden(&self, ereignis: SitzungsEreignis);
}

/// Senke die alle Ereignisse verwirft
#[derive(Debug, Default, Clone, Copy)]
pub struct KeineSenke;

impl EreignisSenke for KeineSenke {
    fn melden(&self, _ereignis: SitzungsEreignis) {}
}
