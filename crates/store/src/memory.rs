//! In-Memory-Reservierungsspeicher
//!
//! Zeilen liegen in einer geordneten Map hinter einem `RwLock`. Die
//! Zeilennummern werden fortlaufend vergeben und nie wiederverwendet,
//! stornierte Zeilen bleiben mit Status `storniert` erhalten.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    NeueReservierung, Reservierung, ReservierungsAenderung, ReservierungsStatus,
    ReservierungsSuche, RowId,
};
use crate::repository::ReservationStore;

pub struct InMemoryStore {
    zeilen: RwLock<BTreeMap<RowId, Reservierung>>,
    naechste_zeile: AtomicU64,
}

impl InMemoryStore {
    pub fn neu() -> Self {
        Self {
            zeilen: RwLock::new(BTreeMap::new()),
            naechste_zeile: AtomicU64::new(1),
        }
    }

    /// Anzahl aller Zeilen inklusive stornierter
    pub fn anzahl(&self) -> usize {
        self.zeilen.read().len()
    }

    pub fn laden(&self, row_id: RowId) -> Option<Reservierung> {
        self.zeilen.read().get(&row_id).cloned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::neu()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn create(&self, neu: NeueReservierung) -> StoreResult<Reservierung> {
        let geprueft = neu.validieren()?;
        let row_id = RowId(self.naechste_zeile.fetch_add(1, Ordering::Relaxed));

        let reservierung = Reservierung {
            row_id,
            reservation_date: geprueft.reservation_date,
            guests_count: geprueft.guests_count,
            name: geprueft.name,
            phone: geprueft.phone,
            email: geprueft.email,
            status: ReservierungsStatus::Bestaetigt,
            created_at: Utc::now(),
        };

        self.zeilen.write().insert(row_id, reservierung.clone());
        tracing::info!(
            zeile = %row_id,
            gaeste = reservierung.guests_count,
            datum = %reservierung.reservation_date,
            "Reservierung angelegt"
        );
        Ok(reservierung)
    }

    async fn find(&self, suche: ReservierungsSuche) -> StoreResult<Vec<Reservierung>> {
        if suche.ist_leer() {
            return Err(StoreError::ungueltig(
                "Telefon oder Name fuer die Suche erforderlich",
            ));
        }
        let treffer = self
            .zeilen
            .read()
            .values()
            .filter(|r| r.status == ReservierungsStatus::Bestaetigt && suche.passt(r))
            .cloned()
            .collect();
        Ok(treffer)
    }

    async fn modify(
        &self,
        row_id: RowId,
        aenderung: ReservierungsAenderung,
    ) -> StoreResult<Reservierung> {
        if aenderung.ist_leer() {
            return Err(StoreError::ungueltig("keine Felder zum Aendern angegeben"));
        }

        let mut zeilen = self.zeilen.write();
        let alt = zeilen
            .get(&row_id)
            .ok_or(StoreError::NichtGefunden(row_id))?;
        if alt.status == ReservierungsStatus::Storniert {
            return Err(StoreError::BereitsStorniert(row_id));
        }

        let neu = aenderung.validieren(alt)?;
        zeilen.insert(row_id, neu.clone());
        tracing::info!(zeile = %row_id, "Reservierung geaendert");
        Ok(neu)
    }

    async fn cancel(&self, row_id: RowId) -> StoreResult<Reservierung> {
        let mut zeilen = self.zeilen.write();
        let eintrag = zeilen
            .get_mut(&row_id)
            .ok_or(StoreError::NichtGefunden(row_id))?;
        if eintrag.status == ReservierungsStatus::Storniert {
            return Err(StoreError::BereitsStorniert(row_id));
        }
        eintrag.status = ReservierungsStatus::Storniert;
        tracing::info!(zeile = %row_id, "Reservierung storniert");
        Ok(eintrag.clone())
    }
}
