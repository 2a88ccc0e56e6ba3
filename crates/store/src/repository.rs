//! Repository-Trait fuer Reservierungen
//!
//! Entkoppelt den Funktionsaufruf-Dispatcher von der konkreten
//! Speicherung. Der Dispatcher haelt den Speicher als
//! `Arc<dyn ReservationStore>`.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{
    NeueReservierung, Reservierung, ReservierungsAenderung, ReservierungsSuche, RowId,
};

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Legt eine Reservierung an (prueft die Eingaben)
    async fn create(&self, neu: NeueReservierung) -> StoreResult<Reservierung>;

    /// Sucht bestaetigte Reservierungen nach Telefon und/oder Name
    async fn find(&self, suche: ReservierungsSuche) -> StoreResult<Vec<Reservierung>>;

    /// Aendert einzelne Felder einer bestaetigten Reservierung
    async fn modify(
        &self,
        row_id: RowId,
        aenderung: ReservierungsAenderung,
    ) -> StoreResult<Reservierung>;

    /// Storniert eine Reservierung
    async fn cancel(&self, row_id: RowId) -> StoreResult<Reservierung>;
}
