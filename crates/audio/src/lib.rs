//! parla-audio – Audio-Bausteine des Relays
//!
//! - G.711 μ-law Kodierung/Dekodierung und Lautstaerke-Skalierung
//! - Ambient-Bett: geladene Hintergrundspur, die in 20-ms-Fenstern
//!   endlos abgespielt wird

pub mod ambient;
pub mod codec;
pub mod error;

// Bequeme Re-Exporte der wichtigsten Typen
pub use ambient::{AmbientBett, AmbientQuelle};
pub use codec::{decode, decode_frame, encode, encode_frame, scale};
pub use error::{AudioError, AudioResult};
