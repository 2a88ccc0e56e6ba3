//! Ausgabe-Planer – taktet Sprache und Ambient-Bett auf die Telefonie
//!
//! Synthese-Audio kommt in beliebig grossen Stuecken an und wird hier in
//! 160-Byte-Frames zerlegt. Pro Takt verlaesst hoechstens ein Frame den
//! Planer:
//!
//! ```text
//! unterdrueckt          -> nichts
//! Sprache ausstehend    -> naechster Sprach-Frame (Rest mit Stille aufgefuellt)
//! Ambient konfiguriert  -> naechstes Fenster des Ambient-Betts
//! sonst                 -> nichts
//! ```
//!
//! Sprache und Ambient schliessen sich damit pro Takt gegenseitig aus.

use bytes::{Buf, BytesMut};
use parla_audio::AmbientBett;
use parla_core::FrameArt;
use parla_protocol::{AudioFrame, FRAME_BYTES};

/// Ein ausgehender Frame mit seiner Herkunft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ausgabe {
    Sprache(AudioFrame),
    Ambient(AudioFrame),
}

impl Ausgabe {
    pub fn frame(&self) -> &AudioFrame {
        match self {
            Self::Sprache(f) | Self::Ambient(f) => f,
        }
    }

    pub fn art(&self) -> FrameArt {
        match self {
            Self::Sprache(_) => FrameArt::Sprache,
            Self::Ambient(_) => FrameArt::Ambient,
        }
    }
}

#[derive(Debug)]
pub struct AusgabePlaner {
    ausstehend: BytesMut,
    ambient: Option<AmbientBett>,
}

impl AusgabePlaner {
    pub fn neu(ambient: Option<AmbientBett>) -> Self {
        Self {
            ausstehend: BytesMut::with_capacity(FRAME_BYTES * 50),
            ambient,
        }
    }

    /// Haengt Synthese-Audio an die Sprachwarteschlange an
    pub fn sprache_einreihen(&mut self, audio: &AudioFrame) {
        self.ausstehend.extend_from_slice(audio.as_slice());
    }

    /// Verwirft alle ausstehenden Sprach-Bytes, gibt deren Anzahl zurueck
    pub fn sprache_verwerfen(&mut self) -> usize {
        let anzahl = self.ausstehend.len();
        self.ausstehend.clear();
        anzahl
    }

    pub fn hat_sprache(&self) -> bool {
        !self.ausstehend.is_empty()
    }

    pub fn hat_ambient(&self) -> bool {
        self.ambient.is_some()
    }

    /// Liefert den Frame fuer den aktuellen Takt
    pub fn takt(&mut self, unterdrueckt: bool) -> Option<Ausgabe> {
        if unterdrueckt {
            return None;
        }

        if !self.ausstehend.is_empty() {
            let n = self.ausstehend.len().min(FRAME_BYTES);
            let frame = AudioFrame::aufgefuellt(&self.ausstehend[..n]);
            self.ausstehend.advance(n);
            return Some(Ausgabe::Sprache(frame));
        }

        self.ambient
            .as_mut()
            .map(|bett| Ausgabe::Ambient(bett.naechster_frame()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parla_audio::AmbientQuelle;

    fn bett() -> AmbientBett {
        AmbientQuelle::aus_bytes(vec![0x10; 400])
            .unwrap()
            .bett(0.5)
            .unwrap()
    }

    #[test]
    fn ohne_ambient_und_sprache_nichts() {
        let mut p = AusgabePlaner::neu(None);
        assert!(p.takt(false).is_none());
    }

    #[test]
    fn sprache_wird_in_frames_zerlegt() {
        let mut p = AusgabePlaner::neu(None);
        p.sprache_einreihen(&AudioFrame::from(vec![0x20; 400]));

        let f1 = p.takt(false).unwrap();
        let f2 = p.takt(false).unwrap();
        let f3 = p.takt(false).unwrap();
        assert!(p.takt(false).is_none());

        for f in [&f1, &f2, &f3] {
            assert_eq!(f.art(), FrameArt::Sprache);
            assert_eq!(f.frame().laenge(), FRAME_BYTES);
        }
        // Letzter Frame: 80 Bytes Sprache, Rest Stille
        assert_eq!(f3.frame().as_slice()[79], 0x20);
        assert_eq!(f3.frame().as_slice()[80], parla_protocol::STILLE_BYTE);
    }

    #[test]
    fn sprache_hat_vorrang_vor_ambient() {
        let mut p = AusgabePlaner::neu(Some(bett()));
        p.sprache_einreihen(&AudioFrame::from(vec![0x20; FRAME_BYTES]));
        assert!(matches!(p.takt(false), Some(Ausgabe::Sprache(_))));
        assert!(matches!(p.takt(false), Some(Ausgabe::Ambient(_))));
    }

    #[test]
    fn unterdrueckt_gibt_nichts_aus() {
        let mut p = AusgabePlaner::neu(Some(bett()));
        p.sprache_einreihen(&AudioFrame::from(vec![0x20; FRAME_BYTES]));
        assert!(p.takt(true).is_none());
        // Sprache bleibt bis zum Verwerfen erhalten
        assert!(p.hat_sprache());
        assert_eq!(p.sprache_verwerfen(), FRAME_BYTES);
        assert!(!p.hat_sprache());
    }

    #[test]
    fn pro_takt_hoechstens_ein_frame_einer_art() {
        let mut p = AusgabePlaner::neu(Some(bett()));
        let mut sprache = 0;
        let mut ambient = 0;
        for i in 0..50 {
            if i % 7 == 0 {
                p.sprache_einreihen(&AudioFrame::from(vec![0x30; 250]));
            }
            match p.takt(i % 11 == 0) {
                Some(Ausgabe::Sprache(f)) => {
                    sprache += 1;
                    assert_eq!(f.laenge(), FRAME_BYTES);
                }
                Some(Ausgabe::Ambient(f)) => {
                    ambient += 1;
                    assert_eq!(f.laenge(), FRAME_BYTES);
                }
                None => {}
            }
        }
        assert!(sprache > 0 && ambient > 0);
    }
}
