//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. API-Schluessel und einige Betriebswerte koennen per
//! Umgebungsvariable ueberschrieben werden:
//!
//! | Variable              | Feld                   |
//! |-----------------------|------------------------|
//! | `OPENAI_API_KEY`      | `inferenz.api_schluessel` |
//! | `ELEVENLABS_API_KEY`  | `synthese.api_schluessel` |
//! | `ELEVENLABS_VOICE_ID` | `synthese.stimme`      |
//! | `PORT`                | `server.port`          |
//! | `TWILIO_REGION`       | `server.region`        |

use std::time::Duration;

use anyhow::{bail, Context};
use parla_observability::logging::{log_format_gueltig, log_level_gueltig};
use parla_protocol::synthesis::StimmEinstellungen;
use parla_relay::{InferenzConfig, RelayConfig, SyntheseConfig};
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP-Server und TwiML
    pub server: ServerEinstellungen,
    /// Inferenzdienst (Realtime-Modell)
    pub inferenz: InferenzEinstellungen,
    /// Synthesedienst (Text-zu-Sprache)
    pub synthese: SyntheseEinstellungen,
    /// Zeitkonstanten der Anrufsitzung
    pub relay: RelayEinstellungen,
    /// Hintergrundspur
    pub ambient: AmbientEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// HTTP-Server und TwiML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    pub bind_adresse: String,
    pub port: u16,
    /// Pfad des Media-Stream-Upgrades (im TwiML verwendet)
    pub media_pfad: String,
    /// Region des Telefonieanbieters, als `<Parameter>` im TwiML
    pub region: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3000,
            media_pfad: "/media-stream".into(),
            region: "ie1".into(),
        }
    }
}

/// Inferenzdienst
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenzEinstellungen {
    pub url: String,
    pub modell: String,
    pub api_schluessel: String,
    pub anweisungen: String,
    /// Leer oder fehlend = keine Begruessung
    pub begruessung: Option<String>,
    pub transkriptions_modell: Option<String>,
    pub vad_schwelle: f32,
    pub vad_vorlauf_ms: u32,
    pub vad_stille_ms: u32,
    pub temperatur: Option<f32>,
}

impl Default for InferenzEinstellungen {
    fn default() -> Self {
        let c = InferenzConfig::default();
        Self {
            url: c.url,
            modell: c.modell,
            api_schluessel: c.api_schluessel,
            anweisungen: c.anweisungen,
            begruessung: c.begruessung,
            transkriptions_modell: c.transkriptions_modell,
            vad_schwelle: c.vad_schwelle,
            vad_vorlauf_ms: c.vad_vorlauf_ms,
            vad_stille_ms: c.vad_stille_ms,
            temperatur: c.temperatur,
        }
    }
}

/// Synthesedienst
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheseEinstellungen {
    /// `{stimme}` wird durch die Stimm-ID ersetzt
    pub url: String,
    pub stimme: String,
    pub modell: String,
    pub api_schluessel: String,
    /// `optimize_streaming_latency` (0-4)
    pub latenz_stufe: u8,
    pub stimm_einstellungen: StimmEinstellungen,
    pub chunk_zeitplan: Vec<u32>,
}

impl Default for SyntheseEinstellungen {
    fn default() -> Self {
        let c = SyntheseConfig::default();
        Self {
            url: c.url,
            stimme: c.stimme,
            modell: c.modell,
            api_schluessel: c.api_schluessel,
            latenz_stufe: c.latenz_stufe,
            stimm_einstellungen: c.stimm_einstellungen,
            chunk_zeitplan: c.chunk_zeitplan,
        }
    }
}

/// Zeitkonstanten der Anrufsitzung (Millisekunden)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    pub max_chunk_zeichen: usize,
    pub gnadenfrist_ms: u64,
    pub auflegen_verzoegerung_ms: u64,
    pub begruessung_verzoegerung_ms: u64,
    pub ausgabe_takt_ms: u64,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        let c = RelayConfig::default();
        Self {
            max_chunk_zeichen: c.max_chunk_zeichen,
            gnadenfrist_ms: c.gnadenfrist.as_millis() as u64,
            auflegen_verzoegerung_ms: c.auflegen_verzoegerung.as_millis() as u64,
            begruessung_verzoegerung_ms: c.begruessung_verzoegerung.as_millis() as u64,
            ausgabe_takt_ms: c.ausgabe_takt.as_millis() as u64,
        }
    }
}

/// Hintergrundspur
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientEinstellungen {
    /// μ-law-Rohdatei oder WAV (8 kHz mono), fehlend = kein Ambient-Bett
    pub datei: Option<String>,
    pub lautstaerke: f32,
}

impl Default for AmbientEinstellungen {
    fn default() -> Self {
        Self {
            datei: None,
            lautstaerke: RelayConfig::default().ambient_lautstaerke,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// `/metrics` und `/health` auf dem Hauptserver bereitstellen
    pub aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self { aktiviert: true }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Uebernimmt Werte aus der Prozessumgebung
    pub fn umgebung_anwenden(&mut self) -> anyhow::Result<()> {
        self.umgebung_anwenden_mit(|name| std::env::var(name).ok())
    }

    /// Wie [`Self::umgebung_anwenden`], mit austauschbarer Quelle
    pub fn umgebung_anwenden_mit(
        &mut self,
        lesen: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let lesen = |name: &str| lesen(name).filter(|w| !w.trim().is_empty());

        if let Some(schluessel) = lesen("OPENAI_API_KEY") {
            self.inferenz.api_schluessel = schluessel;
        }
        if let Some(schluessel) = lesen("ELEVENLABS_API_KEY") {
            self.synthese.api_schluessel = schluessel;
        }
        if let Some(stimme) = lesen("ELEVENLABS_VOICE_ID") {
            self.synthese.stimme = stimme;
        }
        if let Some(region) = lesen("TWILIO_REGION") {
            self.server.region = region;
        }
        if let Some(port) = lesen("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT ist keine gueltige Portnummer: '{port}'"))?;
        }
        Ok(())
    }

    /// Prueft die Konfiguration auf Plausibilitaet
    ///
    /// Fehlende API-Schluessel sind kein Fehler, Anrufe schlagen dann beim
    /// Verbindungsaufbau fehl.
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        if !self.server.media_pfad.starts_with('/') {
            bail!("media_pfad muss mit '/' beginnen: '{}'", self.server.media_pfad);
        }
        self.relay_config()
            .validieren()
            .map_err(|e| anyhow::anyhow!("[relay]: {e}"))?;

        if self.inferenz.api_schluessel.is_empty() {
            tracing::warn!("Kein API-Schluessel fuer den Inferenzdienst (OPENAI_API_KEY)");
        }
        if self.synthese.api_schluessel.is_empty() {
            tracing::warn!("Kein API-Schluessel fuer den Synthesedienst (ELEVENLABS_API_KEY)");
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse des HTTP-Servers zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.server.bind_adresse, self.server.port)
    }

    pub fn inferenz_config(&self) -> InferenzConfig {
        let i = &self.inferenz;
        InferenzConfig {
            url: i.url.clone(),
            modell: i.modell.clone(),
            api_schluessel: i.api_schluessel.clone(),
            anweisungen: i.anweisungen.clone(),
            begruessung: i.begruessung.clone().filter(|b| !b.trim().is_empty()),
            transkriptions_modell: i.transkriptions_modell.clone(),
            vad_schwelle: i.vad_schwelle,
            vad_vorlauf_ms: i.vad_vorlauf_ms,
            vad_stille_ms: i.vad_stille_ms,
            temperatur: i.temperatur,
        }
    }

    pub fn synthese_config(&self) -> SyntheseConfig {
        let s = &self.synthese;
        SyntheseConfig {
            url: s.url.clone(),
            stimme: s.stimme.clone(),
            modell: s.modell.clone(),
            api_schluessel: s.api_schluessel.clone(),
            latenz_stufe: s.latenz_stufe,
            stimm_einstellungen: s.stimm_einstellungen.clone(),
            chunk_zeitplan: s.chunk_zeitplan.clone(),
        }
    }

    pub fn relay_config(&self) -> RelayConfig {
        let r = &self.relay;
        RelayConfig {
            max_chunk_zeichen: r.max_chunk_zeichen,
            gnadenfrist: Duration::from_millis(r.gnadenfrist_ms),
            auflegen_verzoegerung: Duration::from_millis(r.auflegen_verzoegerung_ms),
            begruessung_verzoegerung: Duration::from_millis(r.begruessung_verzoegerung_ms),
            ausgabe_takt: Duration::from_millis(r.ausgabe_takt_ms),
            ambient_lautstaerke: self.ambient.lautstaerke,
        }
    }
}
