//! Anruf-Relay – verbindet die drei Beine eines eingehenden Anrufs
//!
//! Ablauf pro Media-Stream:
//! 1. Auf `start` warten (Stream-ID)
//! 2. Inferenz- und Synthesedienst parallel verbinden
//! 3. Sitzung ausfuehren bis ein Bein endet
//!
//! Schlaegt Schritt 2 fehl, wird der Media-Stream sofort geschlossen.
//!
//! Laufende Sitzungen stehen im Stream-Register, eine zweite Verbindung mit
//! derselben Stream-ID wird abgewiesen.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocket;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parla_audio::AmbientQuelle;
use parla_core::{EreignisSenke, StreamId};
use parla_store::ReservationStore;

use crate::config::{InferenzConfig, RelayConfig, SyntheseConfig};
use crate::dispatcher::{werkzeug_schema, FunctionCallDispatcher};
use crate::error::{RelayError, RelayResult};
use crate::session::{Beine, SessionController, SitzungsKontext, SitzungsStatistik};
use crate::{inference, synthesis, telephony};

pub struct AnrufRelay {
    controller: SessionController,
    inferenz: InferenzConfig,
    synthese: SyntheseConfig,
    /// Aktive Streams mit Beginn der Sitzung
    aktiv: DashMap<StreamId, Instant>,
}

/// Eintrag im Stream-Register, wird beim Drop entfernt
struct Anmeldung<'a> {
    register: &'a DashMap<StreamId, Instant>,
    stream_id: StreamId,
}

impl Drop for Anmeldung<'_> {
    fn drop(&mut self) {
        if let Some((_, beginn)) = self.register.remove(&self.stream_id) {
            tracing::debug!(
                stream_id = %self.stream_id,
                dauer_ms = beginn.elapsed().as_millis() as u64,
                "Stream abgemeldet"
            );
        }
    }
}

impl AnrufRelay {
    pub fn neu(
        relay: RelayConfig,
        inferenz: InferenzConfig,
        synthese: SyntheseConfig,
        store: Arc<dyn ReservationStore>,
        ambient: Option<AmbientQuelle>,
        senke: Arc<dyn EreignisSenke>,
    ) -> RelayResult<Self> {
        relay.validieren().map_err(RelayError::Konfiguration)?;

        let kontext = SitzungsKontext {
            relay,
            begruessung: inferenz.begruessung.clone(),
            dispatcher: FunctionCallDispatcher::neu(store),
            ambient,
            senke,
        };
        Ok(Self {
            controller: SessionController::neu(Arc::new(kontext)),
            inferenz,
            synthese,
            aktiv: DashMap::new(),
        })
    }

    /// Anzahl der Streams mit laufender Sitzung
    pub fn aktive_anrufe(&self) -> usize {
        self.aktiv.len()
    }

    pub fn ist_aktiv(&self, stream_id: &StreamId) -> bool {
        self.aktiv.contains_key(stream_id)
    }

    fn anmelden(&self, stream_id: &StreamId) -> RelayResult<Anmeldung<'_>> {
        match self.aktiv.entry(stream_id.clone()) {
            Entry::Occupied(_) => Err(RelayError::DoppelterStream(stream_id.clone())),
            Entry::Vacant(eintrag) => {
                eintrag.insert(Instant::now());
                Ok(Anmeldung {
                    register: &self.aktiv,
                    stream_id: stream_id.clone(),
                })
            }
        }
    }

    /// Bearbeitet einen Media-Stream vom Upgrade bis zum Auflegen
    pub async fn anruf_bearbeiten(&self, socket: WebSocket) -> RelayResult<SitzungsStatistik> {
        let telefonie = telephony::verbinden(socket).await?;
        let stream_id = telefonie.stream_id().clone();
        let _anmeldung = match self.anmelden(&stream_id) {
            Ok(anmeldung) => anmeldung,
            Err(e) => {
                tracing::warn!(stream_id = %stream_id, "Stream-ID bereits aktiv, Verbindung abgewiesen");
                let _ = telefonie.bruecke.auflegen().await;
                return Err(e);
            }
        };

        let sitzung = self.inferenz.sitzungs_konfiguration(werkzeug_schema());
        let verbunden = tokio::try_join!(
            inference::verbinden(&self.inferenz, sitzung),
            synthesis::verbinden(&self.synthese),
        );
        let ((inferenz, inferenz_rx), (synthese, synthese_rx)) = match verbunden {
            Ok(beine) => beine,
            Err(e) => {
                tracing::error!(stream_id = %stream_id, fehler = %e, "Dienste nicht erreichbar, Anruf wird beendet");
                let _ = telefonie.bruecke.auflegen().await;
                return Err(e);
            }
        };

        let beine = Beine {
            telefonie: telefonie.bruecke,
            telefonie_rx: telefonie.ereignisse,
            inferenz,
            inferenz_rx,
            synthese,
            synthese_rx,
        };
        Ok(self.controller.ausfuehren(beine).await)
    }
}
