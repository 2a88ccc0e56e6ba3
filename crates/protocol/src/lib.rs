//! parla-protocol – Nachrichtenformate der drei Anrufbeine
//!
//! Dieses Crate definiert alle JSON-Nachrichten die mit dem
//! Telefonieanbieter, dem Inferenzdienst und dem Synthesedienst
//! ausgetauscht werden, sowie den gemeinsamen Audio-Frame.
//!
//! Die Typen sind reine Datenstrukturen. Verbindungsaufbau und
//! Nachrichtenpumpen liegen in `parla-relay`.

pub mod frame;
pub mod inference;
pub mod synthesis;
pub mod telephony;

pub use frame::{AudioFrame, FRAME_BYTES, STILLE_BYTE};
pub use inference::{InferenzAnfrage, InferenzEreignis, SitzungsKonfiguration};
pub use synthesis::{SyntheseAnfrage, SyntheseAntwort};
pub use telephony::{TelefonieAusgang, TelefonieEingang};
