//! parla-store – Reservierungsspeicher
//!
//! Der Relay greift ausschliesslich ueber den [`ReservationStore`]-Trait
//! auf Reservierungen zu. Die Validierung der Eingaben liegt im Speicher,
//! der Dispatcher reicht die Argumente des Modells nur weiter.
//!
//! [`InMemoryStore`] ist die mitgelieferte Implementierung fuer Betrieb
//! ohne externen Speicher und fuer Tests.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use models::{
    NeueReservierung, Reservierung, ReservierungsAenderung, ReservierungsStatus,
    ReservierungsSuche, RowId,
};
pub use repository::ReservationStore;
