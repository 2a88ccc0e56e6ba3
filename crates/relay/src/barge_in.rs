//! Barge-in-Steuerung – Zustandsautomat einer Anrufsitzung
//!
//! Der Automat ist rein: er kennt keine Kanaele und keine Zeit. Er nimmt
//! einen [`Ausloeser`] entgegen, wechselt den Zustand und liefert die
//! auszufuehrenden [`Aktion`]en in Ausfuehrungsreihenfolge. Der
//! Sitzungscontroller fuehrt sie gegen die drei Beine aus.
//!
//! ## Zustaende
//! ```text
//!              GenerierungErstellt               SprachStart
//!   Leerlauf ----------------------> Assistent -------------+
//!      ^  ^          ZugEnde         Generiert              |
//!      |  +--------------------------+   ^                  v
//!      |                                 | Gnadenfrist  Unterdrueckt
//!      +------------- Gnadenfrist -------+---- (Handle) ---+
//!                    (kein Handle)
//!
//!   jeder Zustand --Beenden--> Schliessend --AbbauFertig--> Geschlossen
//! ```
//!
//! Die aktive Generierung liegt im Automaten. Damit ist "hoechstens eine
//! aktive Generierung" strukturell garantiert.

use parla_core::GenerationId;

// ---------------------------------------------------------------------------
// Zustand, Ausloeser, Aktionen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsZustand {
    Leerlauf,
    AssistentGeneriert,
    /// Der Anrufer spricht, ausgehende Sprache ist gesperrt
    Unterdrueckt,
    Schliessend,
    Geschlossen,
}

impl SitzungsZustand {
    pub fn ist_beendet(&self) -> bool {
        matches!(self, Self::Schliessend | Self::Geschlossen)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ausloeser {
    SprachStart,
    SprachEnde,
    GnadenfristAbgelaufen,
    GenerierungErstellt(GenerationId),
    ZugEnde(GenerationId),
    Beenden,
    AbbauFertig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aktion {
    /// `response.cancel` fuer genau diese Generierung
    GenerierungAbbrechen(GenerationId),
    SyntheseStoppen,
    TextVerwerfen,
    /// Verwirft ausstehende Sprach-Frames und leert den Puffer beim Anbieter
    AusgabeVerwerfen,
    UnterdrueckungSetzen,
    UnterdrueckungAufheben,
    GnadenfristStarten,
    GnadenfristVerwerfen,
    /// Restlichen Text des beendeten Zugs als Abschluss-Stueck sprechen
    TextSpuelen,
    Abbauen,
}

// ---------------------------------------------------------------------------
// BargeInSteuerung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BargeInSteuerung {
    zustand: SitzungsZustand,
    aktiv: Option<GenerationId>,
}

impl Default for BargeInSteuerung {
    fn default() -> Self {
        Self::neu()
    }
}

impl BargeInSteuerung {
    pub fn neu() -> Self {
        Self {
            zustand: SitzungsZustand::Leerlauf,
            aktiv: None,
        }
    }

    pub fn zustand(&self) -> SitzungsZustand {
        self.zustand
    }

    pub fn aktive_generierung(&self) -> Option<&GenerationId> {
        self.aktiv.as_ref()
    }

    /// Gehoert `generierung` zum aktuell aktiven Zug?
    pub fn ist_aktiv(&self, generierung: &GenerationId) -> bool {
        self.aktiv.as_ref() == Some(generierung)
    }

    pub fn ist_unterdrueckt(&self) -> bool {
        self.zustand == SitzungsZustand::Unterdrueckt
    }

    /// Fuehrt einen Uebergang aus und liefert die Aktionen
    ///
    /// Nicht aufgefuehrte Kombinationen aendern nichts und liefern eine
    /// leere Liste.
    pub fn verarbeiten(&mut self, ausloeser: Ausloeser) -> Vec<Aktion> {
        use Ausloeser as A;
        use SitzungsZustand as Z;

        let vorher = self.zustand;
        let aktionen = match (self.zustand, ausloeser) {
            (Z::Geschlossen, _) => Vec::new(),

            (Z::Schliessend, A::AbbauFertig) => {
                self.aktiv = None;
                self.zustand = Z::Geschlossen;
                Vec::new()
            }
            (Z::Schliessend, _) => Vec::new(),

            (_, A::Beenden) => {
                self.zustand = Z::Schliessend;
                vec![Aktion::Abbauen]
            }

            // Barge-in: Abbruch strikt vor Synthese-Stopp
            (Z::Leerlauf | Z::AssistentGeneriert, A::SprachStart) => {
                let mut aktionen = Vec::with_capacity(5);
                if let Some(alt) = self.aktiv.take() {
                    aktionen.push(Aktion::GenerierungAbbrechen(alt));
                }
                aktionen.extend([
                    Aktion::SyntheseStoppen,
                    Aktion::TextVerwerfen,
                    Aktion::AusgabeVerwerfen,
                    Aktion::UnterdrueckungSetzen,
                ]);
                self.zustand = Z::Unterdrueckt;
                aktionen
            }
            (Z::Unterdrueckt, A::SprachStart) => {
                let mut aktionen = Vec::with_capacity(4);
                if let Some(alt) = self.aktiv.take() {
                    aktionen.push(Aktion::GenerierungAbbrechen(alt));
                    aktionen.push(Aktion::SyntheseStoppen);
                    aktionen.push(Aktion::TextVerwerfen);
                }
                aktionen.push(Aktion::GnadenfristVerwerfen);
                aktionen
            }
            (Z::Unterdrueckt, A::SprachEnde) => vec![Aktion::GnadenfristStarten],
            (Z::Unterdrueckt, A::GnadenfristAbgelaufen) => {
                self.zustand = if self.aktiv.is_some() {
                    Z::AssistentGeneriert
                } else {
                    Z::Leerlauf
                };
                vec![Aktion::UnterdrueckungAufheben]
            }

            (zustand, A::GenerierungErstellt(neu)) => {
                let mut aktionen = Vec::with_capacity(2);
                if let Some(alt) = self.aktiv.take() {
                    if alt != neu {
                        aktionen.push(Aktion::GenerierungAbbrechen(alt));
                        aktionen.push(Aktion::TextVerwerfen);
                    }
                }
                self.aktiv = Some(neu);
                if zustand == Z::Leerlauf {
                    self.zustand = Z::AssistentGeneriert;
                }
                aktionen
            }

            (zustand, A::ZugEnde(generierung)) => {
                if !self.ist_aktiv(&generierung) {
                    // Veraltetes Zugende (z.B. nach Abbruch)
                    return Vec::new();
                }
                self.aktiv = None;
                if zustand == Z::AssistentGeneriert {
                    self.zustand = Z::Leerlauf;
                }
                vec![Aktion::TextSpuelen]
            }

            _ => Vec::new(),
        };

        if vorher != self.zustand {
            tracing::debug!(von = ?vorher, nach = ?self.zustand, "Sitzungszustand gewechselt");
        }
        aktionen
    }
}
