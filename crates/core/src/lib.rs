//! parla-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Parla-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ParlaError, Result};
pub use event::{EreignisSenke, FrameArt, KeineSenke, SitzungsEreignis};
pub use types::{GenerationId, SessionId, StreamId, ToolCallId};
