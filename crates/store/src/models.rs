//! Reservierungsmodelle
//!
//! `NeueReservierung` und `ReservierungsAenderung` enthalten die Eingaben
//! so wie sie vom Modell kommen (Datum als String). Die Pruefung und
//! Umwandlung erfolgt in [`NeueReservierung::validieren`] bzw.
//! [`ReservierungsAenderung::validieren`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Zeilen-ID
// ---------------------------------------------------------------------------

/// Zeilennummer einer Reservierung im Speicher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "zeile:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Reservierung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservierungsStatus {
    Bestaetigt,
    Storniert,
}

/// Gespeicherte Reservierung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservierung {
    pub row_id: RowId,
    pub reservation_date: NaiveDateTime,
    pub guests_count: u32,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub status: ReservierungsStatus,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Anlegen einer Reservierung
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeueReservierung {
    pub reservation_date: String,
    pub guests_count: i64,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Gepruefte Werte einer neuen Reservierung
#[derive(Debug, Clone, PartialEq)]
pub struct GepruefteReservierung {
    pub reservation_date: NaiveDateTime,
    pub guests_count: u32,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl NeueReservierung {
    /// Prueft Pflichtfelder, Datum und Gaestezahl
    ///
    /// Name und Telefon sind Pflicht, E-Mail ist optional. Leere Strings
    /// gelten als fehlend.
    pub fn validieren(&self) -> StoreResult<GepruefteReservierung> {
        Ok(GepruefteReservierung {
            reservation_date: datum_parsen(&self.reservation_date)?,
            guests_count: gaeste_pruefen(self.guests_count)?,
            name: pflichtfeld("name", &self.name)?,
            phone: pflichtfeld("phone", &self.phone)?,
            email: optional(self.email.as_deref()),
        })
    }
}

/// Suchkriterien, mindestens eines muss gesetzt sein
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservierungsSuche {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ReservierungsSuche {
    pub fn ist_leer(&self) -> bool {
        optional(self.phone.as_deref()).is_none() && optional(self.name.as_deref()).is_none()
    }

    /// Prueft ob eine Reservierung zu den Kriterien passt
    ///
    /// Telefonnummern werden ueber ihre Ziffern verglichen, Namen ohne
    /// Beachtung der Gross-/Kleinschreibung als Teilstring.
    pub fn passt(&self, r: &Reservierung) -> bool {
        let telefon_ok = match optional(self.phone.as_deref()) {
            Some(p) => ziffern(&p) == ziffern(&r.phone),
            None => true,
        };
        let name_ok = match optional(self.name.as_deref()) {
            Some(n) => r.name.to_lowercase().contains(&n.to_lowercase()),
            None => true,
        };
        telefon_ok && name_ok
    }
}

/// Zu aendernde Felder, nicht gesetzte Felder bleiben unveraendert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservierungsAenderung {
    #[serde(default)]
    pub reservation_date: Option<String>,
    #[serde(default)]
    pub guests_count: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ReservierungsAenderung {
    pub fn ist_leer(&self) -> bool {
        self.reservation_date.is_none()
            && self.guests_count.is_none()
            && self.name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
    }

    /// Wendet die Aenderung geprueft auf eine Kopie an
    pub fn validieren(&self, alt: &Reservierung) -> StoreResult<Reservierung> {
        let mut neu = alt.clone();
        if let Some(datum) = &self.reservation_date {
            neu.reservation_date = datum_parsen(datum)?;
        }
        if let Some(gaeste) = self.guests_count {
            neu.guests_count = gaeste_pruefen(gaeste)?;
        }
        if let Some(name) = &self.name {
            neu.name = pflichtfeld("name", name)?;
        }
        if let Some(phone) = &self.phone {
            neu.phone = pflichtfeld("phone", phone)?;
        }
        if let Some(email) = &self.email {
            neu.email = optional(Some(email.as_str()));
        }
        Ok(neu)
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Akzeptiert `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DDTHH:MM` und RFC 3339
pub fn datum_parsen(text: &str) -> StoreResult<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|d| d.naive_local()))
        .map_err(|_| {
            StoreError::ungueltig(format!(
                "reservation_date '{text}' ist kein ISO-Datum (YYYY-MM-DDTHH:MM:SS)"
            ))
        })
}

fn gaeste_pruefen(anzahl: i64) -> StoreResult<u32> {
    if anzahl < 1 {
        return Err(StoreError::ungueltig(format!(
            "guests_count muss mindestens 1 sein, erhalten {anzahl}"
        )));
    }
    u32::try_from(anzahl)
        .map_err(|_| StoreError::ungueltig(format!("guests_count zu gross: {anzahl}")))
}

fn pflichtfeld(feld: &str, wert: &str) -> StoreResult<String> {
    optional(Some(wert)).ok_or_else(|| StoreError::ungueltig(format!("{feld} fehlt")))
}

fn optional(wert: Option<&str>) -> Option<String> {
    wert.map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
}

fn ziffern(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}
