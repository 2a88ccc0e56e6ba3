//! Funktionsaufruf-Dispatcher
//!
//! Fuehrt die Werkzeugaufrufe des Modells gegen den Reservierungsspeicher
//! aus. Jeder Aufruf liefert genau ein [`ToolCallResult`], auch bei
//! Fehlern: unbekannte Werkzeuge, ungueltige Argumente und
//! Speicherfehler werden zu `{"success": false, "error": ...}`.
//!
//! ## Werkzeuge
//! | Name                 | Argumente                                        |
//! |----------------------|--------------------------------------------------|
//! | `make_reservation`   | reservation_date, guests_count, contact_info     |
//! | `find_reservation`   | phone?, name?                                    |
//! | `modify_reservation` | row_id + zu aendernde Felder                     |
//! | `cancel_reservation` | row_id                                           |
//! | `end_call`           | reason?                                          |

use std::sync::Arc;

use parla_core::ToolCallId;
use parla_store::{
    NeueReservierung, ReservationStore, ReservierungsAenderung, ReservierungsSuche, RowId,
    StoreError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Anfrage / Ergebnis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub call_id: ToolCallId,
    pub name: String,
    /// Argumente als JSON-Text, so wie das Modell sie liefert
    pub argumente: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: ToolCallId,
    pub werkzeug: String,
    pub payload: Value,
    /// Der Anruf soll nach der Antwort beendet werden
    pub auflegen: bool,
}

impl ToolCallResult {
    pub fn erfolg(&self) -> bool {
        self.payload["success"] == Value::Bool(true)
    }

    /// Ausgabe fuer `function_call_output`
    pub fn ausgabe(&self) -> String {
        self.payload.to_string()
    }
}

#[derive(Debug, Error)]
pub enum DispatchFehler {
    #[error("Unbekanntes Werkzeug: {0}")]
    UnbekanntesWerkzeug(String),

    #[error("Ungueltige Argumente: {0}")]
    Argumente(String),

    #[error(transparent)]
    Speicher(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Argumente
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct KontaktInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReservierenArgs {
    reservation_date: String,
    guests_count: f64,
    #[serde(default)]
    contact_info: KontaktInfo,
}

#[derive(Debug, Deserialize)]
struct AendernArgs {
    row_id: u64,
    #[serde(flatten)]
    aenderung: ReservierungsAenderung,
}

#[derive(Debug, Deserialize)]
struct StornierenArgs {
    row_id: u64,
}

#[derive(Debug, Default, Deserialize)]
struct AuflegenArgs {
    #[serde(default)]
    reason: Option<String>,
}

fn argumente<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, DispatchFehler> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(|e| DispatchFehler::Argumente(e.to_string()))
}

fn gaeste(anzahl: f64) -> Result<i64, DispatchFehler> {
    if !anzahl.is_finite() || anzahl.fract() != 0.0 {
        return Err(DispatchFehler::Argumente(format!(
            "guests_count muss ganzzahlig sein, erhalten {anzahl}"
        )));
    }
    Ok(anzahl as i64)
}

// ---------------------------------------------------------------------------
// FunctionCallDispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FunctionCallDispatcher {
    store: Arc<dyn ReservationStore>,
}

impl FunctionCallDispatcher {
    pub fn neu(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Fuehrt einen Werkzeugaufruf aus
    pub async fn dispatch(&self, anfrage: ToolCallRequest) -> ToolCallResult {
        let ToolCallRequest {
            call_id,
            name,
            argumente,
        } = anfrage;

        let auflegen = name == "end_call";
        let payload = match self.ausfuehren(&name, &argumente).await {
            Ok(mut wert) => {
                wert["success"] = Value::Bool(true);
                wert
            }
            Err(e) => {
                tracing::warn!(werkzeug = %name, aufruf = %call_id, fehler = %e, "Werkzeugaufruf fehlgeschlagen");
                json!({ "success": false, "error": e.to_string() })
            }
        };

        ToolCallResult {
            call_id,
            werkzeug: name,
            payload,
            auflegen,
        }
    }

    async fn ausfuehren(&self, name: &str, text: &str) -> Result<Value, DispatchFehler> {
        match name {
            "make_reservation" => {
                let args: ReservierenArgs = argumente(text)?;
                let neu = NeueReservierung {
                    reservation_date: args.reservation_date,
                    guests_count: gaeste(args.guests_count)?,
                    name: args.contact_info.name,
                    phone: args.contact_info.phone,
                    email: args.contact_info.email,
                };
                let r = self.store.create(neu).await?;
                Ok(json!({ "details": r }))
            }
            "find_reservation" => {
                let suche: ReservierungsSuche = argumente(text)?;
                let treffer = self.store.find(suche).await?;
                Ok(json!({ "matches": treffer }))
            }
            "modify_reservation" => {
                let args: AendernArgs = argumente(text)?;
                let r = self.store.modify(RowId(args.row_id), args.aenderung).await?;
                Ok(json!({ "updated": r }))
            }
            "cancel_reservation" => {
                let args: StornierenArgs = argumente(text)?;
                let r = self.store.cancel(RowId(args.row_id)).await?;
                Ok(json!({ "cancelled": r }))
            }
            "end_call" => {
                let args: AuflegenArgs = argumente(text)?;
                tracing::info!(grund = ?args.reason, "Anruf wird auf Wunsch des Modells beendet");
                Ok(json!({ "details": { "reason": args.reason } }))
            }
            andere => Err(DispatchFehler::UnbekanntesWerkzeug(andere.to_string())),
        }
    }
}

/// JSON-Schema aller Werkzeuge fuer `session.update`
pub fn werkzeug_schema() -> Vec<Value> {
    let kontakt = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "Customer name" },
            "phone": { "type": "string", "description": "Phone number" },
            "email": { "type": "string", "description": "Email address (optional)" }
        },
        "required": ["name", "phone"]
    });
    let row_id = json!({ "type": "integer", "description": "Row id returned by make_reservation or find_reservation" });

    vec![
        json!({
            "type": "function",
            "name": "make_reservation",
            "description": "Book restaurant reservation with complete details",
            "parameters": {
                "type": "object",
                "properties": {
                    "reservation_date": { "type": "string", "description": "Date and time in ISO format (YYYY-MM-DDTHH:MM:SS)" },
                    "guests_count": { "type": "number", "description": "Number of guests" },
                    "contact_info": kontakt
                },
                "required": ["reservation_date", "guests_count", "contact_info"]
            }
        }),
        json!({
            "type": "function",
            "name": "find_reservation",
            "description": "Look up existing reservations by phone number and/or name",
            "parameters": {
                "type": "object",
                "properties": {
                    "phone": { "type": "string" },
                    "name": { "type": "string" }
                }
            }
        }),
        json!({
            "type": "function",
            "name": "modify_reservation",
            "description": "Change date, guest count or contact details of an existing reservation",
            "parameters": {
                "type": "object",
                "properties": {
                    "row_id": row_id,
                    "reservation_date": { "type": "string" },
                    "guests_count": { "type": "number" },
                    "name": { "type": "string" },
                    "phone": { "type": "string" },
                    "email": { "type": "string" }
                },
                "required": ["row_id"]
            }
        }),
        json!({
            "type": "function",
            "name": "cancel_reservation",
            "description": "Cancel an existing reservation",
            "parameters": {
                "type": "object",
                "properties": { "row_id": row_id },
                "required": ["row_id"]
            }
        }),
        json!({
            "type": "function",
            "name": "end_call",
            "description": "End the phone call after saying goodbye",
            "parameters": {
                "type": "object",
                "properties": { "reason": { "type": "string" } }
            }
        }),
    ]
}
