//! Sitzungscontroller – ein Task pro Anruf
//!
//! Der Controller besitzt den gesamten veraenderlichen Anrufzustand
//! ([`CallSession`]) allein. Alle Eingaben kommen ueber Kanaele:
//!
//! ```text
//!                    +---------------------------+
//! Telefonie ------>  |                           | --> Telefonie (media/clear)
//! Inferenz  ------>  |  tokio::select! Schleife  | --> Inferenz  (audio/cancel/...)
//! Synthese  ------>  |  BargeInSteuerung         | --> Synthese  (text/stop)
//! Timer/Werkzeuge -> |  TextChunker, Planer      |
//! Ausgabetakt ---->  +---------------------------+
//! ```
//!
//! Timer (Gnadenfrist, Begruessung, Auflegen) und Werkzeugaufrufe laufen
//! als eigene Tasks und melden sich ueber den internen Kanal zurueck.
//! Gnadenfrist-Timer tragen ein Token, veraltete Timer werden ignoriert.
//!
//! Endet eines der drei Beine, wird die Sitzung abgebaut. Das Fallenlassen
//! der Bruecken schliesst die anderen beiden Beine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parla_audio::AmbientQuelle;
use parla_core::{EreignisSenke, GenerationId, SessionId, SitzungsEreignis, StreamId, ToolCallId};
use parla_protocol::{InferenzEreignis, SyntheseAntwort, TelefonieEingang};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::Instrument;

use crate::barge_in::{Aktion, Ausloeser, BargeInSteuerung, SitzungsZustand};
use crate::chunker::{TextChunk, TextChunker};
use crate::config::RelayConfig;
use crate::dispatcher::{FunctionCallDispatcher, ToolCallRequest, ToolCallResult};
use crate::error::RelayResult;
use crate::inference::InferenzBruecke;
use crate::mixer::AusgabePlaner;
use crate::synthesis::SyntheseBruecke;
use crate::telephony::TelefonieBruecke;

/// Maximale Anzahl gleichzeitig eingesammelter Inferenz-Ereignisse
const MAX_STAPEL: usize = 64;

// ---------------------------------------------------------------------------
// Oeffentliche Typen
// ---------------------------------------------------------------------------

/// Prozessweit geteilte Bausteine aller Sitzungen
pub struct SitzungsKontext {
    pub relay: RelayConfig,
    /// Einmalige Begruessung nach Stream-Start
    pub begruessung: Option<String>,
    pub dispatcher: FunctionCallDispatcher,
    pub ambient: Option<AmbientQuelle>,
    pub senke: Arc<dyn EreignisSenke>,
}

/// Die drei verbundenen Beine eines Anrufs
pub struct Beine {
    pub telefonie: TelefonieBruecke,
    pub telefonie_rx: mpsc::Receiver<TelefonieEingang>,
    pub inferenz: InferenzBruecke,
    pub inferenz_rx: mpsc::Receiver<InferenzEreignis>,
    pub synthese: SyntheseBruecke,
    pub synthese_rx: mpsc::Receiver<SyntheseAntwort>,
}

/// Zaehler einer beendeten Sitzung
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitzungsStatistik {
    pub barge_ins: u32,
    pub werkzeug_aufrufe: u32,
    pub sprach_frames: u64,
    pub ambient_frames: u64,
    /// Gesendete Wiedergabe-Marken, eine pro vollstaendig ausgespieltem Zug
    pub marken: u32,
    /// Verworfene Synthese-Bytes (Barge-in, Unterdrueckung)
    pub verworfene_audio_bytes: u64,
    pub grund: String,
}

/// Rueckmeldungen von Timern und Werkzeug-Tasks
#[derive(Debug)]
enum Intern {
    BegruessungFaellig,
    GnadenfristAbgelaufen(u64),
    Auflegen,
    WerkzeugErgebnis(ToolCallResult),
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

pub struct SessionController {
    kontext: Arc<SitzungsKontext>,
}

impl SessionController {
    pub fn neu(kontext: Arc<SitzungsKontext>) -> Self {
        Self { kontext }
    }

    /// Fuehrt die Sitzung aus bis eines der Beine endet
    pub async fn ausfuehren(&self, beine: Beine) -> SitzungsStatistik {
        let span = tracing::info_span!(
            "sitzung",
            stream_id = %beine.telefonie.stream_id(),
            id = %SessionId::new()
        );
        self.schleife(beine).instrument(span).await
    }

    async fn schleife(&self, beine: Beine) -> SitzungsStatistik {
        let Beine {
            telefonie,
            mut telefonie_rx,
            inferenz,
            mut inferenz_rx,
            synthese,
            mut synthese_rx,
        } = beine;

        let (intern_tx, mut intern_rx) = mpsc::channel(32);
        let mut sitzung = CallSession::neu(
            Arc::clone(&self.kontext),
            telefonie,
            inferenz,
            synthese,
            intern_tx,
        );
        sitzung.starten();

        let mut takt = time::interval(self.kontext.relay.ausgabe_takt);
        takt.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let ergebnis = tokio::select! {
                biased;

                Some(intern) = intern_rx.recv() => sitzung.intern(intern).await,

                ereignis = inferenz_rx.recv() => match ereignis {
                    Some(erstes) => {
                        let stapel = stapel_sammeln(erstes, &mut inferenz_rx);
                        sitzung.inferenz(stapel).await
                    }
                    None => {
                        sitzung.beenden("Inferenzdienst getrennt");
                        Ok(())
                    }
                },

                eingang = telefonie_rx.recv() => match eingang {
                    Some(e) => sitzung.telefonie(e).await,
                    None => {
                        sitzung.beenden("Media-Stream getrennt");
                        Ok(())
                    }
                },

                antwort = synthese_rx.recv() => match antwort {
                    Some(a) => {
                        sitzung.synthese(a);
                        Ok(())
                    }
                    None => {
                        sitzung.beenden("Synthesedienst getrennt");
                        Ok(())
                    }
                },

                _ = takt.tick() => sitzung.takt().await,
            };

            let ergebnis = match ergebnis {
                Ok(()) => sitzung.ausstehenden_zug_pruefen().await,
                Err(e) => Err(e),
            };
            if let Err(e) = ergebnis {
                tracing::warn!(fehler = %e, "Bein nicht mehr erreichbar");
                sitzung.beenden(e.to_string());
            }

            if sitzung.zustand() == SitzungsZustand::Schliessend {
                break;
            }
        }

        sitzung.abbauen().await
    }
}

/// Sammelt bereits wartende Ereignisse ein und ordnet sie nach Prioritaet
///
/// Sprachbeginn und -ende ziehen vor alles andere. Die uebrigen Ereignisse
/// werden nur innerhalb eines Laufs derselben Generierung sortiert, eine
/// spaetere Generierung ueberholt nie den Rest einer frueheren. Ereignisse
/// ohne Generierung haengen am laufenden Lauf. Alle Sortierungen sind
/// stabil.
fn stapel_sammeln(
    erstes: InferenzEreignis,
    rx: &mut mpsc::Receiver<InferenzEreignis>,
) -> Vec<InferenzEreignis> {
    let mut eingang = vec![erstes];
    while eingang.len() < MAX_STAPEL {
        match rx.try_recv() {
            Ok(e) => eingang.push(e),
            Err(_) => break,
        }
    }

    let (mut stapel, rest): (Vec<_>, Vec<_>) = eingang.into_iter().partition(|e| {
        matches!(e, InferenzEreignis::SprachStart | InferenzEreignis::SprachEnde)
    });
    stapel.sort_by_key(InferenzEreignis::prioritaet);

    let mut lauf: Vec<InferenzEreignis> = Vec::new();
    let mut lauf_generierung: Option<GenerationId> = None;
    for ereignis in rest {
        if let Some(g) = ereignis.generierung() {
            if lauf_generierung.as_ref().is_some_and(|l| l != g) {
                lauf.sort_by_key(InferenzEreignis::prioritaet);
                stapel.append(&mut lauf);
            }
            lauf_generierung = Some(g.clone());
        }
        lauf.push(ereignis);
    }
    lauf.sort_by_key(InferenzEreignis::prioritaet);
    stapel.append(&mut lauf);
    stapel
}

// ---------------------------------------------------------------------------
// CallSession
// ---------------------------------------------------------------------------

/// Veraenderlicher Zustand eines Anrufs, gehoert exklusiv dem Sitzungs-Task
pub struct CallSession {
    stream_id: StreamId,
    kontext: Arc<SitzungsKontext>,
    telefonie: TelefonieBruecke,
    inferenz: InferenzBruecke,
    synthese: SyntheseBruecke,
    intern_tx: mpsc::Sender<Intern>,

    steuerung: BargeInSteuerung,
    chunker: TextChunker,
    planer: AusgabePlaner,

    /// Synthese-Audio verwerfen bis zum naechsten gesendeten Text
    synthese_verwerfen: bool,
    /// Im aktuellen Zug wurde bereits Text an die Synthese gesendet
    text_gesendet: bool,
    /// Zugende waehrend der Unterdrueckung, Spuelen nach Aufhebung
    spuelen_ausstehend: bool,
    /// Synthese des Zugs fertig, Marke folgt dem letzten Sprach-Frame
    marke_ausstehend: bool,
    /// Seit der letzten Marke ausgespielte Sprache
    gesprochen_ms: u64,
    begruessung_gesendet: bool,
    gnadenfrist_token: u64,

    werkzeug_namen: HashMap<ToolCallId, String>,
    werkzeug_laufend: HashSet<ToolCallId>,
    werkzeug_erledigt: HashSet<ToolCallId>,
    /// Nach einem Werkzeugergebnis steht ein `requestTurn` aus
    zug_nach_werkzeug: bool,
    auflegen_geplant: bool,

    abbau_grund: Option<String>,
    statistik: SitzungsStatistik,
}

impl CallSession {
    fn neu(
        kontext: Arc<SitzungsKontext>,
        telefonie: TelefonieBruecke,
        inferenz: InferenzBruecke,
        synthese: SyntheseBruecke,
        intern_tx: mpsc::Sender<Intern>,
    ) -> Self {
        let ambient = kontext.ambient.as_ref().and_then(|quelle| {
            quelle
                .bett(kontext.relay.ambient_lautstaerke)
                .map_err(|e| tracing::warn!(fehler = %e, "Ambient-Bett deaktiviert"))
                .ok()
        });

        Self {
            stream_id: telefonie.stream_id().clone(),
            chunker: TextChunker::neu(kontext.relay.max_chunk_zeichen),
            planer: AusgabePlaner::neu(ambient),
            kontext,
            telefonie,
            inferenz,
            synthese,
            intern_tx,
            steuerung: BargeInSteuerung::neu(),
            synthese_verwerfen: false,
            text_gesendet: false,
            spuelen_ausstehend: false,
            marke_ausstehend: false,
            gesprochen_ms: 0,
            begruessung_gesendet: false,
            gnadenfrist_token: 0,
            werkzeug_namen: HashMap::new(),
            werkzeug_laufend: HashSet::new(),
            werkzeug_erledigt: HashSet::new(),
            zug_nach_werkzeug: false,
            auflegen_geplant: false,
            abbau_grund: None,
            statistik: SitzungsStatistik::default(),
        }
    }

    pub fn zustand(&self) -> SitzungsZustand {
        self.steuerung.zustand()
    }

    fn starten(&mut self) {
        tracing::info!(ambient = self.planer.hat_ambient(), "Anruf begonnen");
        self.kontext.senke.melden(SitzungsEreignis::AnrufBegonnen {
            stream_id: self.stream_id.clone(),
        });
        if self.kontext.begruessung.is_some() {
            self.planen(
                self.kontext.relay.begruessung_verzoegerung,
                Intern::BegruessungFaellig,
            );
        }
    }

    fn planen(&self, nach: Duration, ereignis: Intern) {
        let tx = self.intern_tx.clone();
        tokio::spawn(async move {
            time::sleep(nach).await;
            let _ = tx.send(ereignis).await;
        });
    }

    /// Leitet den Abbau ein (idempotent)
    fn beenden(&mut self, grund: impl Into<String>) {
        if self.zustand().ist_beendet() {
            return;
        }
        let grund = grund.into();
        tracing::info!(grund = %grund, "Sitzung wird beendet");
        self.abbau_grund = Some(grund);
        // Einzige Aktion ist `Abbauen`, ausgefuehrt von der Schleife
        self.steuerung.verarbeiten(Ausloeser::Beenden);
    }

    async fn abbauen(mut self) -> SitzungsStatistik {
        if let Err(e) = self.telefonie.auflegen().await {
            tracing::debug!(fehler = %e, "Media-Stream bereits geschlossen");
        }
        self.steuerung.verarbeiten(Ausloeser::AbbauFertig);

        let grund = self.abbau_grund.take().unwrap_or_default();
        tracing::info!(
            grund = %grund,
            barge_ins = self.statistik.barge_ins,
            werkzeug_aufrufe = self.statistik.werkzeug_aufrufe,
            sprach_frames = self.statistik.sprach_frames,
            "Anruf beendet"
        );
        self.kontext.senke.melden(SitzungsEreignis::AnrufBeendet {
            stream_id: self.stream_id.clone(),
            grund: grund.clone(),
        });
        self.statistik.grund = grund;
        self.statistik
    }

    // -----------------------------------------------------------------------
    // Eingaenge
    // -----------------------------------------------------------------------

    async fn intern(&mut self, ereignis: Intern) -> RelayResult<()> {
        match ereignis {
            Intern::BegruessungFaellig => self.begruessen().await,
            Intern::GnadenfristAbgelaufen(token) => {
                if token != self.gnadenfrist_token {
                    tracing::trace!(token, "Veraltete Gnadenfrist ignoriert");
                    return Ok(());
                }
                self.steuern(Ausloeser::GnadenfristAbgelaufen).await
            }
            Intern::Auflegen => {
                self.beenden("end_call");
                Ok(())
            }
            Intern::WerkzeugErgebnis(ergebnis) => self.werkzeug_abschliessen(ergebnis).await,
        }
    }

    async fn inferenz(&mut self, stapel: Vec<InferenzEreignis>) -> RelayResult<()> {
        for ereignis in stapel {
            if self.zustand().ist_beendet() {
                break;
            }
            self.inferenz_ereignis(ereignis).await?;
        }
        Ok(())
    }

    async fn inferenz_ereignis(&mut self, ereignis: InferenzEreignis) -> RelayResult<()> {
        match ereignis {
            InferenzEreignis::SprachStart => self.steuern(Ausloeser::SprachStart).await,
            InferenzEreignis::SprachEnde => self.steuern(Ausloeser::SprachEnde).await,
            InferenzEreignis::GenerierungErstellt { generierung } => {
                if self.spuelen_ausstehend {
                    // Neuer Zug ersetzt den noch nicht gesprochenen Rest
                    self.text_verwerfen();
                }
                tracing::debug!(generierung = %generierung, "Generierung erstellt");
                self.steuern(Ausloeser::GenerierungErstellt(generierung))
                    .await?;
                self.text_gesendet = false;
                Ok(())
            }
            InferenzEreignis::TextDelta { generierung, text } => {
                if !self.steuerung.ist_aktiv(&generierung) {
                    tracing::trace!(generierung = %generierung, "Text einer inaktiven Generierung verworfen");
                    return Ok(());
                }
                self.chunker.append(&text);
                if self.steuerung.ist_unterdrueckt() {
                    return Ok(());
                }
                self.stuecke_sprechen().await
            }
            InferenzEreignis::ZugEnde { generierung } => {
                self.steuern(Ausloeser::ZugEnde(generierung)).await
            }
            InferenzEreignis::WerkzeugAngekuendigt { call_id, name } => {
                self.werkzeug_namen.insert(call_id, name);
                Ok(())
            }
            InferenzEreignis::WerkzeugFertig {
                call_id,
                name,
                argumente,
            } => {
                self.werkzeug_starten(call_id, name, argumente);
                Ok(())
            }
            InferenzEreignis::Fehler { nachricht } => {
                tracing::warn!(fehler = %nachricht, "Inferenzdienst meldet Fehler");
                Ok(())
            }
            InferenzEreignis::Ignoriert => Ok(()),
        }
    }

    async fn telefonie(&mut self, eingang: TelefonieEingang) -> RelayResult<()> {
        if let Some(audio) = eingang.audio() {
            return match audio {
                Ok(frame) => self.inferenz.audio_anhaengen(&frame).await,
                Err(e) => {
                    tracing::warn!(fehler = %e, "Ungueltiges Anruferaudio verworfen");
                    Ok(())
                }
            };
        }
        match eingang {
            TelefonieEingang::Stop { .. } => self.beenden("stop vom Anbieter"),
            TelefonieEingang::Mark { mark } => tracing::debug!(mark = %mark.name, "Mark bestaetigt"),
            TelefonieEingang::Start { .. } => tracing::warn!("Wiederholtes start-Ereignis ignoriert"),
            _ => {}
        }
        Ok(())
    }

    fn synthese(&mut self, antwort: SyntheseAntwort) {
        match antwort {
            SyntheseAntwort::Audio(frame) => {
                if self.steuerung.ist_unterdrueckt() || self.synthese_verwerfen {
                    self.statistik.verworfene_audio_bytes += frame.laenge() as u64;
                    tracing::trace!(bytes = frame.laenge(), "Synthese-Audio verworfen");
                } else {
                    self.planer.sprache_einreihen(&frame);
                }
            }
            SyntheseAntwort::Fertig => {
                tracing::debug!("Synthese abgeschlossen");
                if !self.steuerung.ist_unterdrueckt() && !self.synthese_verwerfen {
                    self.marke_ausstehend = true;
                }
            }
            SyntheseAntwort::Fehler(nachricht) => {
                tracing::warn!(fehler = %nachricht, "Synthesedienst meldet Fehler")
            }
            SyntheseAntwort::Leer => {}
        }
    }

    async fn takt(&mut self) -> RelayResult<()> {
        let unterdrueckt = self.steuerung.ist_unterdrueckt();
        if let Some(ausgabe) = self.planer.takt(unterdrueckt) {
            self.telefonie.media(ausgabe.frame()).await?;

            let art = ausgabe.art();
            match art {
                parla_core::FrameArt::Sprache => {
                    self.statistik.sprach_frames += 1;
                    self.gesprochen_ms += ausgabe.frame().dauer_ms();
                }
                parla_core::FrameArt::Ambient => self.statistik.ambient_frames += 1,
            }
            self.kontext
                .senke
                .melden(SitzungsEreignis::FrameGesendet { art });
        }

        if self.marke_ausstehend && !unterdrueckt && !self.planer.hat_sprache() {
            self.marke_ausstehend = false;
            self.statistik.marken += 1;
            let name = format!("zug-{}", self.statistik.marken);
            tracing::debug!(mark = %name, gesprochen_ms = self.gesprochen_ms, "Wiedergabe-Marke gesendet");
            self.gesprochen_ms = 0;
            self.telefonie.mark(name).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Zustandsautomat
    // -----------------------------------------------------------------------

    async fn steuern(&mut self, ausloeser: Ausloeser) -> RelayResult<()> {
        for aktion in self.steuerung.verarbeiten(ausloeser) {
            self.aktion(aktion).await?;
        }
        Ok(())
    }

    async fn aktion(&mut self, aktion: Aktion) -> RelayResult<()> {
        match aktion {
            Aktion::GenerierungAbbrechen(generierung) => {
                tracing::debug!(generierung = %generierung, "Generierung wird abgebrochen");
                self.inferenz.abbrechen(&generierung).await?;
            }
            Aktion::SyntheseStoppen => {
                self.synthese_verwerfen = true;
                self.synthese.stoppen().await?;
            }
            Aktion::TextVerwerfen => self.text_verwerfen(),
            Aktion::AusgabeVerwerfen => {
                let bytes = self.planer.sprache_verwerfen();
                self.statistik.verworfene_audio_bytes += bytes as u64;
                self.marke_ausstehend = false;
                self.gesprochen_ms = 0;
                self.telefonie.clear().await?;
            }
            Aktion::UnterdrueckungSetzen => {
                self.statistik.barge_ins += 1;
                tracing::info!("Barge-in: Anrufer spricht");
                self.kontext.senke.melden(SitzungsEreignis::BargeIn {
                    stream_id: self.stream_id.clone(),
                });
            }
            Aktion::UnterdrueckungAufheben => {
                if self.spuelen_ausstehend {
                    self.spuelen().await?;
                } else {
                    self.stuecke_sprechen().await?;
                }
            }
            Aktion::GnadenfristStarten => {
                self.gnadenfrist_token += 1;
                self.planen(
                    self.kontext.relay.gnadenfrist,
                    Intern::GnadenfristAbgelaufen(self.gnadenfrist_token),
                );
            }
            Aktion::GnadenfristVerwerfen => self.gnadenfrist_token += 1,
            Aktion::TextSpuelen => {
                if self.steuerung.ist_unterdrueckt() {
                    self.spuelen_ausstehend = true;
                } else {
                    self.spuelen().await?;
                }
            }
            Aktion::Abbauen => tracing::debug!("Abbau eingeleitet"),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Text -> Synthese
    // -----------------------------------------------------------------------

    fn text_verwerfen(&mut self) {
        self.chunker.verwerfen();
        self.text_gesendet = false;
        self.spuelen_ausstehend = false;
    }

    async fn sprechen(&mut self, stueck: &TextChunk) -> RelayResult<()> {
        self.synthese_verwerfen = false;
        self.text_gesendet = true;
        self.synthese.sprechen(stueck).await
    }

    async fn stuecke_sprechen(&mut self) -> RelayResult<()> {
        for stueck in self.chunker.drain() {
            self.sprechen(&stueck).await?;
        }
        Ok(())
    }

    /// Spricht den Rest des Zugs und schliesst ihn mit `flush` ab
    async fn spuelen(&mut self) -> RelayResult<()> {
        self.stuecke_sprechen().await?;
        let rest = self.chunker.flush();
        if !rest.text.is_empty() || self.text_gesendet {
            self.sprechen(&rest).await?;
        }
        self.text_gesendet = false;
        self.spuelen_ausstehend = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Begruessung und Werkzeuge
    // -----------------------------------------------------------------------

    async fn begruessen(&mut self) -> RelayResult<()> {
        if self.begruessung_gesendet {
            return Ok(());
        }
        let Some(text) = self.kontext.begruessung.clone() else {
            return Ok(());
        };
        self.begruessung_gesendet = true;
        tracing::debug!("Begruessung wird angefordert");
        self.inferenz.assistent_sagen(&text).await?;
        self.inferenz.zug_anfordern().await
    }

    fn werkzeug_starten(&mut self, call_id: ToolCallId, name: Option<String>, argumente: String) {
        if self.werkzeug_erledigt.contains(&call_id) || self.werkzeug_laufend.contains(&call_id) {
            tracing::debug!(aufruf = %call_id, "Doppelter Werkzeugaufruf ignoriert");
            return;
        }
        let name = name
            .or_else(|| self.werkzeug_namen.get(&call_id).cloned())
            .unwrap_or_default();
        tracing::info!(werkzeug = %name, aufruf = %call_id, "Werkzeugaufruf");
        self.werkzeug_laufend.insert(call_id.clone());

        let dispatcher = self.kontext.dispatcher.clone();
        let tx = self.intern_tx.clone();
        let anfrage = ToolCallRequest {
            call_id,
            name,
            argumente,
        };
        tokio::spawn(async move {
            let ergebnis = dispatcher.dispatch(anfrage).await;
            let _ = tx.send(Intern::WerkzeugErgebnis(ergebnis)).await;
        });
    }

    async fn werkzeug_abschliessen(&mut self, ergebnis: ToolCallResult) -> RelayResult<()> {
        self.werkzeug_laufend.remove(&ergebnis.call_id);
        if !self.werkzeug_erledigt.insert(ergebnis.call_id.clone()) {
            return Ok(());
        }

        let erfolg = ergebnis.erfolg();
        self.statistik.werkzeug_aufrufe += 1;
        self.kontext.senke.melden(SitzungsEreignis::WerkzeugAufgerufen {
            werkzeug: ergebnis.werkzeug.clone(),
            erfolg,
        });
        tracing::info!(werkzeug = %ergebnis.werkzeug, erfolg, "Werkzeugergebnis gesendet");

        self.inferenz
            .werkzeug_ergebnis(&ergebnis.call_id, ergebnis.ausgabe())
            .await?;
        self.zug_nach_werkzeug = true;

        if ergebnis.auflegen && !self.auflegen_geplant {
            self.auflegen_geplant = true;
            self.planen(self.kontext.relay.auflegen_verzoegerung, Intern::Auflegen);
        }
        Ok(())
    }

    /// Fordert nach Werkzeugergebnissen genau einen neuen Zug an, sobald
    /// keine Generierung mehr laeuft und der Anrufer nicht spricht
    async fn ausstehenden_zug_pruefen(&mut self) -> RelayResult<()> {
        if !self.zug_nach_werkzeug
            || self.steuerung.aktive_generierung().is_some()
            || self.steuerung.ist_unterdrueckt()
            || self.zustand().ist_beendet()
        {
            return Ok(());
        }
        self.zug_nach_werkzeug = false;
        self.inferenz.zug_anfordern().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stapel_wird_stabil_nach_prioritaet_sortiert() {
        let (tx, mut rx) = mpsc::channel(8);
        let g = GenerationId::neu("r1");
        for e in [
            InferenzEreignis::TextDelta {
                generierung: g.clone(),
                text: "b".into(),
            },
            InferenzEreignis::SprachEnde,
            InferenzEreignis::TextDelta {
                generierung: g.clone(),
                text: "c".into(),
            },
            InferenzEreignis::SprachStart,
        ] {
            tx.try_send(e).unwrap();
        }
        let erstes = InferenzEreignis::TextDelta {
            generierung: g.clone(),
            text: "a".into(),
        };
        let stapel = stapel_sammeln(erstes, &mut rx);

        assert_eq!(stapel[0], InferenzEreignis::SprachStart);
        assert_eq!(stapel[1], InferenzEreignis::SprachEnde);
        let texte: Vec<_> = stapel[2..]
            .iter()
            .map(|e| match e {
                InferenzEreignis::TextDelta { text, .. } => text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(texte, vec!["a", "b", "c"]);
    }

    #[test]
    fn spaetere_generierung_ueberholt_fruehere_nicht() {
        let (tx, mut rx) = mpsc::channel(8);
        let r1 = GenerationId::neu("r1");
        let r2 = GenerationId::neu("r2");
        for e in [
            InferenzEreignis::TextDelta {
                generierung: r1.clone(),
                text: "Bis bald.".into(),
            },
            InferenzEreignis::ZugEnde {
                generierung: r1.clone(),
            },
            InferenzEreignis::GenerierungErstellt {
                generierung: r2.clone(),
            },
            InferenzEreignis::SprachEnde,
        ] {
            tx.try_send(e).unwrap();
        }
        let erstes = InferenzEreignis::GenerierungErstellt {
            generierung: r1.clone(),
        };
        let stapel = stapel_sammeln(erstes, &mut rx);

        assert_eq!(stapel[0], InferenzEreignis::SprachEnde);
        assert_eq!(
            stapel[1..],
            [
                InferenzEreignis::GenerierungErstellt {
                    generierung: r1.clone()
                },
                InferenzEreignis::TextDelta {
                    generierung: r1.clone(),
                    text: "Bis bald.".into(),
                },
                InferenzEreignis::ZugEnde { generierung: r1 },
                InferenzEreignis::GenerierungErstellt { generierung: r2 },
            ]
        );
    }
}
