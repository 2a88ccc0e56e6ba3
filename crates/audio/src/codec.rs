//! G.711 μ-law Codec
//!
//! Jedes Byte kodiert ein 14-Bit-Sample logarithmisch:
//!
//! ```text
//!  Bit  7     6..4      3..0
//!       Vorz. Exponent  Mantisse      (gespeichert invertiert)
//! ```
//!
//! Kodierung: Betrag begrenzen (32635), Bias 0x84 addieren, Exponent aus
//! dem hoechsten gesetzten Bit bestimmen, Mantisse sind die vier Bits
//! darunter. Dekodierung liefert die Mitte des Quantisierungsintervalls,
//! der Fehler eines Round-Trips ist daher hoechstens eine Stufe.

use parla_protocol::AudioFrame;

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;

/// Kodiert ein lineares 16-Bit-Sample nach μ-law
pub fn encode(sample: i16) -> u8 {
    let mut betrag = sample as i32;
    let vorzeichen = if betrag < 0 {
        betrag = -betrag;
        0x80
    } else {
        0x00
    };

    let wert = betrag.min(CLIP) + BIAS;

    let mut exponent = 7;
    let mut maske = 0x4000;
    while exponent > 0 && wert & maske == 0 {
        exponent -= 1;
        maske >>= 1;
    }

    let mantisse = (wert >> (exponent + 3)) & 0x0F;
    !((vorzeichen | (exponent << 4) | mantisse) as u8)
}

/// Dekodiert ein μ-law-Byte in ein lineares 16-Bit-Sample
pub fn decode(byte: u8) -> i16 {
    let b = !byte;
    let exponent = ((b >> 4) & 0x07) as i32;
    let mantisse = (b & 0x0F) as i32;

    let betrag = ((((mantisse << 3) + BIAS) << exponent) - BIAS) as i16;
    if b & 0x80 != 0 {
        -betrag
    } else {
        betrag
    }
}

pub fn decode_frame(daten: &[u8]) -> Vec<i16> {
    daten.iter().copied().map(decode).collect()
}

pub fn encode_frame(samples: &[i16]) -> Vec<u8> {
    samples.iter().copied().map(encode).collect()
}

/// Skaliert die Lautstaerke eines Frames
///
/// Dekodiert jedes Sample, multipliziert mit `gain`, begrenzt auf den
/// 16-Bit-Bereich und kodiert neu. Der Eingabe-Frame bleibt unveraendert.
pub fn scale(frame: &AudioFrame, gain: f32) -> AudioFrame {
    let skaliert: Vec<u8> = frame
        .as_slice()
        .iter()
        .map(|&b| {
            let linear = decode(b) as f32 * gain;
            encode(linear.clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        })
        .collect();
    AudioFrame::from(skaliert)
}
