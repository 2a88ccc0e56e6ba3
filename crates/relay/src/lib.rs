//! parla-relay – Echtzeit-Relay eines Telefonanrufs
//!
//! Verbindet drei Duplex-Streams pro Anruf:
//!
//! ```text
//!            +-----------+  audio   +------------+
//! Telefonie -|           |--------->| Inferenz   |
//!            |  Sitzung  |<---------| (Text,     |
//!            |           |  Text    |  Werkzeug) |
//!            |           |          +------------+
//!            |           |  Text    +------------+
//!            |           |--------->| Synthese   |
//! Telefonie <|  Planer   |<---------| (μ-law)    |
//!            +-----------+  audio   +------------+
//! ```
//!
//! ## Module
//! - [`barge_in`]: Zustandsautomat (Unterbrechung, aktive Generierung)
//! - [`chunker`]: Zerlegung des Textstroms in sprechbare Stuecke
//! - [`mixer`]: Ausgabetakt mit Sprache und Ambient-Bett
//! - [`dispatcher`]: Werkzeugaufrufe gegen den Reservierungsspeicher
//! - [`telephony`], [`inference`], [`synthesis`]: die drei Beine
//! - [`session`]: Sitzungscontroller (ein Task pro Anruf)
//! - [`anruf`]: Verbindungsaufbau eines eingehenden Anrufs

pub mod anruf;
pub mod barge_in;
mod bein;
pub mod chunker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inference;
pub mod mixer;
pub mod session;
pub mod synthesis;
pub mod telephony;

pub use anruf::AnrufRelay;
pub use barge_in::{Aktion, Ausloeser, BargeInSteuerung, SitzungsZustand};
pub use chunker::{ChunkArt, TextChunk, TextChunker};
pub use config::{InferenzConfig, RelayConfig, SyntheseConfig};
pub use dispatcher::{FunctionCallDispatcher, ToolCallRequest, ToolCallResult};
pub use error::{RelayError, RelayResult};
pub use session::{Beine, SessionController, SitzungsKontext, SitzungsStatistik};
