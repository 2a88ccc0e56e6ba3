//! Laufzeitkonfiguration des Relays
//!
//! Der Server bildet seine TOML-Abschnitte auf diese Strukturen ab.
//! Alle Werte haben Standardwerte, die dem Verhalten des produktiven
//! Reservierungsassistenten entsprechen.

use std::time::Duration;

use parla_protocol::inference::{SitzungsKonfiguration, Transkription, TurnDetection};
use parla_protocol::synthesis::StimmEinstellungen;

/// Verbindung zum Inferenzdienst
#[derive(Debug, Clone)]
pub struct InferenzConfig {
    /// Basis-URL ohne Query (z.B. `wss://api.openai.com/v1/realtime`)
    pub url: String,
    pub modell: String,
    pub api_schluessel: String,
    pub anweisungen: String,
    /// Wird einmal pro Anruf als Assistenten-Nachricht eingefuegt
    pub begruessung: Option<String>,
    pub transkriptions_modell: Option<String>,
    pub vad_schwelle: f32,
    pub vad_vorlauf_ms: u32,
    pub vad_stille_ms: u32,
    pub temperatur: Option<f32>,
}

impl Default for InferenzConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime".into(),
            modell: "gpt-4o-mini-realtime-preview".into(),
            api_schluessel: String::new(),
            anweisungen: "You are the reservation assistant for Casa Masa restaurant. \
                Collect date, time, number of guests, name and phone before calling \
                make_reservation. Keep responses brief and conversational."
                .into(),
            begruessung: Some(
                "Hello! Welcome to Casa Masa, thank you for calling. What brings you in today?"
                    .into(),
            ),
            transkriptions_modell: Some("whisper-1".into()),
            vad_schwelle: 0.5,
            vad_vorlauf_ms: 300,
            vad_stille_ms: 200,
            temperatur: None,
        }
    }
}

impl InferenzConfig {
    /// Vollstaendige Verbindungs-URL mit Modell-Parameter
    pub fn verbindungs_url(&self) -> String {
        format!("{}?model={}", self.url, self.modell)
    }

    /// Baut die `session.update`-Konfiguration
    pub fn sitzungs_konfiguration(&self, werkzeuge: Vec<serde_json::Value>) -> SitzungsKonfiguration {
        let mut konfig = SitzungsKonfiguration::neu(self.anweisungen.clone(), werkzeuge);
        konfig.input_audio_transcription = self
            .transkriptions_modell
            .as_ref()
            .map(|m| Transkription { model: m.clone() });
        konfig.turn_detection = TurnDetection {
            art: "server_vad".into(),
            threshold: self.vad_schwelle,
            prefix_padding_ms: self.vad_vorlauf_ms,
            silence_duration_ms: self.vad_stille_ms,
        };
        konfig.temperature = self.temperatur;
        konfig
    }
}

/// Verbindung zum Synthesedienst
#[derive(Debug, Clone)]
pub struct SyntheseConfig {
    /// Basis-URL, `{stimme}` wird durch die Stimm-ID ersetzt
    pub url: String,
    pub stimme: String,
    pub modell: String,
    pub api_schluessel: String,
    pub latenz_stufe: u8,
    pub stimm_einstellungen: StimmEinstellungen,
    pub chunk_zeitplan: Vec<u32>,
}

impl Default for SyntheseConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.elevenlabs.io/v1/text-to-speech/{stimme}/stream-input".into(),
            stimme: "EXAVITQu4vr4xnSDxMaL".into(),
            modell: "eleven_flash_v2".into(),
            api_schluessel: String::new(),
            latenz_stufe: 4,
            stimm_einstellungen: StimmEinstellungen::default(),
            chunk_zeitplan: vec![50],
        }
    }
}

impl SyntheseConfig {
    /// Vollstaendige Verbindungs-URL (μ-law 8 kHz Ausgabe)
    pub fn verbindungs_url(&self) -> String {
        format!(
            "{}?model_id={}&output_format=ulaw_8000&optimize_streaming_latency={}",
            self.url.replace("{stimme}", &self.stimme),
            self.modell,
            self.latenz_stufe
        )
    }
}

/// Zeitkonstanten und Grenzen einer Anrufsitzung
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Laenge eines Textstuecks in Zeichen
    pub max_chunk_zeichen: usize,
    /// Wartezeit nach Sprachende bevor die Unterdrueckung endet
    pub gnadenfrist: Duration,
    /// Verzoegerung zwischen `end_call` und Abbau
    pub auflegen_verzoegerung: Duration,
    /// Verzoegerung der Begruessung nach Stream-Start
    pub begruessung_verzoegerung: Duration,
    /// Takt der ausgehenden Audio-Frames
    pub ausgabe_takt: Duration,
    /// Lautstaerke des Ambient-Betts
    pub ambient_lautstaerke: f32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_chunk_zeichen: 40,
            gnadenfrist: Duration::from_millis(100),
            auflegen_verzoegerung: Duration::from_millis(4000),
            begruessung_verzoegerung: Duration::from_millis(300),
            ausgabe_takt: Duration::from_millis(20),
            ambient_lautstaerke: 0.1,
        }
    }
}

impl RelayConfig {
    /// Prueft die Werte auf Plausibilitaet
    pub fn validieren(&self) -> Result<(), String> {
        if self.max_chunk_zeichen < 2 {
            return Err("max_chunk_zeichen muss mindestens 2 sein".into());
        }
        if self.ausgabe_takt.is_zero() {
            return Err("ausgabe_takt darf nicht 0 sein".into());
        }
        if !(0.0..=1.0).contains(&self.ambient_lautstaerke) {
            return Err(format!(
                "ambient_lautstaerke ausserhalb 0.0..=1.0: {}",
                self.ambient_lautstaerke
            ));
        }
        Ok(())
    }
}
