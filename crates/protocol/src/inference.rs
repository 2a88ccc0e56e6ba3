//! Inferenzdienst (Realtime-Ereignisse als JSON ueber WebSocket)
//!
//! ## Ablauf
//!
//! ```text
//! Relay                                 Inferenzdienst
//!   |-- session.update ------------------->|   (einmal nach Verbindungsaufbau)
//!   |-- input_audio_buffer.append -------->|   (fortlaufend, Anruferaudio)
//!   |<----------- speech_started/stopped --|
//!   |<------------------ response.created --|
//!   |<--------------- response.text.delta --|   (inkrementeller Text)
//!   |<--------------------- response.done --|
//!   |<-- function_call_arguments.done ------|
//!   |-- conversation.item.create --------->|   (function_call_output)
//!   |-- response.create ------------------>|
//!   |-- response.cancel ------------------>|   (Barge-in)
//! ```
//!
//! Eingehende Rohnachrichten werden auf [`InferenzEreignis`] abgebildet.
//! Der Sitzungscontroller verarbeitet gleichzeitig eingetroffene Ereignisse
//! nach [`InferenzEreignis::prioritaet`], ohne die Reihenfolge
//! verschiedener Generierungen zu vertauschen.

use parla_core::{GenerationId, ParlaError, ToolCallId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sitzungskonfiguration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transkription {
    pub model: String,
}

/// Serverseitige Spracherkennung (Voice Activity Detection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub art: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            art: "server_vad".into(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 200,
        }
    }
}

/// Inhalt der `session.update`-Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitzungsKonfiguration {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub input_audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<Transkription>,
    pub turn_detection: TurnDetection,
    pub tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl SitzungsKonfiguration {
    /// Textausgabe, μ-law-Eingang, Standard-VAD
    pub fn neu(anweisungen: impl Into<String>, werkzeuge: Vec<serde_json::Value>) -> Self {
        Self {
            modalities: vec!["text".into()],
            instructions: anweisungen.into(),
            input_audio_format: "g711_ulaw".into(),
            input_audio_transcription: None,
            turn_detection: TurnDetection::default(),
            tools: werkzeuge,
            temperature: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Relay -> Dienst)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InhaltsTeil {
    Text { text: String },
    InputText { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KonversationsElement {
    Message {
        role: String,
        content: Vec<InhaltsTeil>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

/// Alle Nachrichten die der Relay an den Inferenzdienst sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InferenzAnfrage {
    #[serde(rename = "session.update")]
    SitzungAktualisieren { session: SitzungsKonfiguration },

    #[serde(rename = "input_audio_buffer.append")]
    AudioAnhaengen { audio: String },

    #[serde(rename = "conversation.item.create")]
    ElementErstellen { item: KonversationsElement },

    #[serde(rename = "response.create")]
    AntwortAnfordern,

    #[serde(rename = "response.cancel")]
    AntwortAbbrechen {
        #[serde(skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },
}

impl InferenzAnfrage {
    /// Fuegt eine Assistenten-Nachricht in die Konversation ein (Begruessung)
    pub fn assistent_nachricht(text: impl Into<String>) -> Self {
        Self::ElementErstellen {
            item: KonversationsElement::Message {
                role: "assistant".into(),
                content: vec![InhaltsTeil::Text { text: text.into() }],
            },
        }
    }

    /// Ergebnis eines Werkzeugaufrufs
    pub fn werkzeug_ergebnis(call_id: &ToolCallId, ausgabe: String) -> Self {
        Self::ElementErstellen {
            item: KonversationsElement::FunctionCallOutput {
                call_id: call_id.as_str().to_string(),
                output: ausgabe,
            },
        }
    }

    pub fn abbrechen(generierung: &GenerationId) -> Self {
        Self::AntwortAbbrechen {
            response_id: Some(generierung.as_str().to_string()),
        }
    }

    pub fn als_json(&self) -> Result<String, ParlaError> {
        serde_json::to_string(self).map_err(|e| ParlaError::intern(format!("Inferenz: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Eingehende Nachrichten (Dienst -> Relay)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AntwortRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AusgabeElement {
    #[serde(rename = "type")]
    art: String,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FehlerInfo {
    #[serde(default)]
    message: String,
}

/// Rohformat der Dienstnachrichten, nur fuer die Deserialisierung
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ServerNachricht {
    #[serde(rename = "input_audio_buffer.speech_started")]
    SprachStart,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SprachEnde,
    #[serde(rename = "response.created")]
    AntwortErstellt { response: AntwortRef },
    #[serde(rename = "response.text.delta")]
    TextDelta { response_id: String, delta: String },
    #[serde(rename = "response.done")]
    AntwortFertig { response: AntwortRef },
    #[serde(rename = "response.output_item.added")]
    ElementHinzugefuegt { item: AusgabeElement },
    #[serde(rename = "response.function_call_arguments.done")]
    FunktionsArgumente {
        call_id: String,
        #[serde(default)]
        name: Option<String>,
        arguments: String,
    },
    #[serde(rename = "error")]
    Fehler { error: FehlerInfo },
    #[serde(other)]
    Sonstiges,
}

/// Normalisierte Ereignisse des Inferenzdienstes
#[derive(Debug, Clone, PartialEq)]
pub enum InferenzEreignis {
    SprachStart,
    SprachEnde,
    GenerierungErstellt {
        generierung: GenerationId,
    },
    TextDelta {
        generierung: GenerationId,
        text: String,
    },
    ZugEnde {
        generierung: GenerationId,
    },
    /// Ein Funktionsaufruf wurde angekuendigt (liefert den Namen frueh)
    WerkzeugAngekuendigt {
        call_id: ToolCallId,
        name: String,
    },
    WerkzeugFertig {
        call_id: ToolCallId,
        name: Option<String>,
        argumente: String,
    },
    Fehler {
        nachricht: String,
    },
    /// Fuer den Relay irrelevante Nachricht
    Ignoriert,
}

impl InferenzEreignis {
    /// Parst eine Textnachricht des Dienstes
    pub fn parsen(text: &str) -> Result<Self, ParlaError> {
        let roh: ServerNachricht = serde_json::from_str(text)
            .map_err(|e| ParlaError::UngueltigeNachricht(format!("Inferenz: {e}")))?;

        Ok(match roh {
            ServerNachricht::SprachStart => Self::SprachStart,
            ServerNachricht::SprachEnde => Self::SprachEnde,
            ServerNachricht::AntwortErstellt { response } => Self::GenerierungErstellt {
                generierung: GenerationId(response.id),
            },
            ServerNachricht::TextDelta { response_id, delta } => Self::TextDelta {
                generierung: GenerationId(response_id),
                text: delta,
            },
            ServerNachricht::AntwortFertig { response } => Self::ZugEnde {
                generierung: GenerationId(response.id),
            },
            ServerNachricht::ElementHinzugefuegt { item } => match item {
                AusgabeElement {
                    art,
                    call_id: Some(call_id),
                    name: Some(name),
                } if art == "function_call" => Self::WerkzeugAngekuendigt {
                    call_id: ToolCallId(call_id),
                    name,
                },
                _ => Self::Ignoriert,
            },
            ServerNachricht::FunktionsArgumente {
                call_id,
                name,
                arguments,
            } => Self::WerkzeugFertig {
                call_id: ToolCallId(call_id),
                name,
                argumente: arguments,
            },
            ServerNachricht::Fehler { error } => Self::Fehler {
                nachricht: error.message,
            },
            ServerNachricht::Sonstiges => Self::Ignoriert,
        })
    }

    /// Generierung, zu der das Ereignis gehoert
    pub fn generierung(&self) -> Option<&GenerationId> {
        match self {
            Self::GenerierungErstellt { generierung }
            | Self::TextDelta { generierung, .. }
            | Self::ZugEnde { generierung } => Some(generierung),
            _ => None,
        }
    }

    /// Vorrang zwischen gleichzeitig eingetroffenen Ereignissen
    ///
    /// Kleinere Werte zuerst: Sprachbeginn vor Sprachende vor neuer
    /// Generierung vor Text vor Zugende vor Werkzeugaufruf.
    pub fn prioritaet(&self) -> u8 {
        match self {
            Self::SprachStart => 0,
            Self::SprachEnde => 1,
            Self::GenerierungErstellt { .. } => 2,
            Self::TextDelta { .. } => 3,
            Self::ZugEnde { .. } => 4,
            Self::WerkzeugAngekuendigt { .. } | Self::WerkzeugFertig { .. } => 5,
            Self::Fehler { .. } | Self::Ignoriert => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitzungs_update_format() {
        let mut konfig = SitzungsKonfiguration::neu("Sei freundlich", vec![]);
        konfig.input_audio_transcription = Some(Transkription {
            model: "whisper-1".into(),
        });
        let json = InferenzAnfrage::SitzungAktualisieren { session: konfig }
            .als_json()
            .unwrap();
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["type"], "session.update");
        assert_eq!(wert["session"]["modalities"][0], "text");
        assert_eq!(wert["session"]["input_audio_format"], "g711_ulaw");
        assert_eq!(wert["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(wert["session"]["turn_detection"]["silence_duration_ms"], 200);
        assert_eq!(wert["session"]["input_audio_transcription"]["model"], "whisper-1");
        assert!(wert["session"].get("temperature").is_none());
    }

    #[test]
    fn antwort_anfordern_ist_nur_typ() {
        let json = InferenzAnfrage::AntwortAnfordern.als_json().unwrap();
        assert_eq!(json, r#"{"type":"response.create"}"#);
    }

    #[test]
    fn abbrechen_zielt_auf_generierung() {
        let json = InferenzAnfrage::abbrechen(&GenerationId::neu("resp_7"))
            .als_json()
            .unwrap();
        assert_eq!(json, r#"{"type":"response.cancel","response_id":"resp_7"}"#);
    }

    #[test]
    fn werkzeug_ergebnis_format() {
        let json = InferenzAnfrage::werkzeug_ergebnis(
            &ToolCallId::neu("call_1"),
            r#"{"success":true}"#.into(),
        )
        .als_json()
        .unwrap();
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["type"], "conversation.item.create");
        assert_eq!(wert["item"]["type"], "function_call_output");
        assert_eq!(wert["item"]["call_id"], "call_1");
        assert_eq!(wert["item"]["output"], r#"{"success":true}"#);
    }

    #[test]
    fn assistent_nachricht_format() {
        let json = InferenzAnfrage::assistent_nachricht("Hallo!").als_json().unwrap();
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["item"]["type"], "message");
        assert_eq!(wert["item"]["role"], "assistant");
        assert_eq!(wert["item"]["content"][0]["type"], "text");
        assert_eq!(wert["item"]["content"][0]["text"], "Hallo!");
    }

    #[test]
    fn dienst_ereignisse_parsen() {
        let faelle = [
            (
                r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":100,"item_id":"i1"}"#,
                InferenzEreignis::SprachStart,
            ),
            (
                r#"{"type":"input_audio_buffer.speech_stopped","audio_end_ms":900}"#,
                InferenzEreignis::SprachEnde,
            ),
            (
                r#"{"type":"response.created","response":{"id":"resp_1","status":"in_progress"}}"#,
                InferenzEreignis::GenerierungErstellt {
                    generierung: GenerationId::neu("resp_1"),
                },
            ),
            (
                r#"{"type":"response.text.delta","response_id":"resp_1","item_id":"i","delta":"Hal"}"#,
                InferenzEreignis::TextDelta {
                    generierung: GenerationId::neu("resp_1"),
                    text: "Hal".into(),
                },
            ),
            (
                r#"{"type":"response.done","response":{"id":"resp_1","status":"completed"}}"#,
                InferenzEreignis::ZugEnde {
                    generierung: GenerationId::neu("resp_1"),
                },
            ),
            (
                r#"{"type":"session.created","session":{}}"#,
                InferenzEreignis::Ignoriert,
            ),
        ];
        for (json, erwartet) in faelle {
            assert_eq!(InferenzEreignis::parsen(json).unwrap(), erwartet, "{json}");
        }
    }

    #[test]
    fn funktionsaufruf_parsen() {
        let json = r#"{"type":"response.function_call_arguments.done","response_id":"resp_2","call_id":"call_9","name":"make_reservation","arguments":"{\"guests_count\":2}"}"#;
        let e = InferenzEreignis::parsen(json).unwrap();
        assert_eq!(
            e,
            InferenzEreignis::WerkzeugFertig {
                call_id: ToolCallId::neu("call_9"),
                name: Some("make_reservation".into()),
                argumente: r#"{"guests_count":2}"#.into(),
            }
        );
    }

    #[test]
    fn ausgabe_element_kuendigt_werkzeug_an() {
        let json = r#"{"type":"response.output_item.added","item":{"type":"function_call","call_id":"call_3","name":"end_call"}}"#;
        assert_eq!(
            InferenzEreignis::parsen(json).unwrap(),
            InferenzEreignis::WerkzeugAngekuendigt {
                call_id: ToolCallId::neu("call_3"),
                name: "end_call".into(),
            }
        );
        let text_element = r#"{"type":"response.output_item.added","item":{"type":"message","id":"m1"}}"#;
        assert_eq!(
            InferenzEreignis::parsen(text_element).unwrap(),
            InferenzEreignis::Ignoriert
        );
    }

    #[test]
    fn dienstfehler_wird_gemeldet() {
        let json = r#"{"type":"error","error":{"type":"invalid_request_error","message":"Cancellation failed"}}"#;
        assert_eq!(
            InferenzEreignis::parsen(json).unwrap(),
            InferenzEreignis::Fehler {
                nachricht: "Cancellation failed".into()
            }
        );
    }

    #[test]
    fn fehlendes_pflichtfeld_ist_fehlerhafte_nachricht() {
        let e = InferenzEreignis::parsen(r#"{"type":"response.text.delta"}"#).unwrap_err();
        assert!(matches!(e, ParlaError::UngueltigeNachricht(_)));
    }

    #[test]
    fn prioritaeten_reihenfolge() {
        let mut ereignisse = vec![
            InferenzEreignis::WerkzeugFertig {
                call_id: ToolCallId::neu("c"),
                name: None,
                argumente: "{}".into(),
            },
            InferenzEreignis::ZugEnde {
                generierung: GenerationId::neu("a"),
            },
            InferenzEreignis::TextDelta {
                generierung: GenerationId::neu("a"),
                text: "x".into(),
            },
            InferenzEreignis::SprachEnde,
            InferenzEreignis::GenerierungErstellt {
                generierung: GenerationId::neu("b"),
            },
            InferenzEreignis::SprachStart,
        ];
        ereignisse.sort_by_key(InferenzEreignis::prioritaet);
        let prios: Vec<u8> = ereignisse.iter().map(InferenzEreignis::prioritaet).collect();
        assert_eq!(prios, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn generierung_nur_bei_zugbezogenen_ereignissen() {
        let g = GenerationId::neu("resp_1");
        assert_eq!(
            InferenzEreignis::ZugEnde {
                generierung: g.clone()
            }
            .generierung(),
            Some(&g)
        );
        assert!(InferenzEreignis::SprachStart.generierung().is_none());
        assert!(InferenzEreignis::Ignoriert.generierung().is_none());
    }
}
