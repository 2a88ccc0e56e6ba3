//! Telefonie-Bein – Media-Stream des Anbieters (Server-Seite via Axum)
//!
//! Der Anbieter oeffnet den WebSocket auf `/media-stream`. Vor dem
//! `start`-Ereignis gibt es keine Stream-ID und damit keine Sitzung:
//! [`verbinden`] wartet deshalb auf `start` und startet erst danach die
//! beiden Pumpen.
//!
//! ```text
//! WebSocket --(Lese-Task)--> mpsc<TelefonieEingang> --> Sitzung
//! Sitzung   --> mpsc<TelefonieBefehl> --(Schreib-Task)--> WebSocket
//! ```

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parla_core::StreamId;
use parla_protocol::telephony::StartInfo;
use parla_protocol::{AudioFrame, TelefonieAusgang, TelefonieEingang};
use tokio::sync::mpsc;

use crate::error::{RelayError, RelayResult};

const BEIN: &str = "telefonie";

/// Groesse der Warteschlangen pro Richtung
pub const KANAL_GROESSE: usize = 256;

/// Auftrag an den Schreib-Task
#[derive(Debug, Clone, PartialEq)]
pub enum TelefonieBefehl {
    Senden(TelefonieAusgang),
    /// Schliesst den Media-Stream (Auflegen)
    Auflegen,
}

// ---------------------------------------------------------------------------
// TelefonieBruecke
// ---------------------------------------------------------------------------

/// Sende-Handle der Sitzung auf das Telefonie-Bein
#[derive(Debug, Clone)]
pub struct TelefonieBruecke {
    tx: mpsc::Sender<TelefonieBefehl>,
    stream_id: StreamId,
}

impl TelefonieBruecke {
    /// Erstellt Bruecke und Empfangsseite ohne Socket (Tests, Verdrahtung)
    pub fn kanal(stream_id: StreamId) -> (Self, mpsc::Receiver<TelefonieBefehl>) {
        let (tx, rx) = mpsc::channel(KANAL_GROESSE);
        (Self { tx, stream_id }, rx)
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub async fn media(&self, frame: &AudioFrame) -> RelayResult<()> {
        self.senden(TelefonieAusgang::media(&self.stream_id, frame))
            .await
    }

    /// Verwirft beim Anbieter bereits gepuffertes Audio
    pub async fn clear(&self) -> RelayResult<()> {
        self.senden(TelefonieAusgang::clear(&self.stream_id)).await
    }

    /// Marke hinter dem zuletzt gesendeten Audio, der Anbieter bestaetigt
    /// sie nach der Wiedergabe mit einem eingehenden `mark`
    pub async fn mark(&self, name: impl Into<String>) -> RelayResult<()> {
        self.senden(TelefonieAusgang::mark(&self.stream_id, name))
            .await
    }

    pub async fn auflegen(&self) -> RelayResult<()> {
        self.tx
            .send(TelefonieBefehl::Auflegen)
            .await
            .map_err(|_| RelayError::SendFehler(BEIN))
    }

    async fn senden(&self, nachricht: TelefonieAusgang) -> RelayResult<()> {
        self.tx
            .send(TelefonieBefehl::Senden(nachricht))
            .await
            .map_err(|_| RelayError::SendFehler(BEIN))
    }
}

// ---------------------------------------------------------------------------
// Verbindungsaufbau
// ---------------------------------------------------------------------------

/// Gestarteter Media-Stream
pub struct TelefonieVerbindung {
    pub start: StartInfo,
    pub bruecke: TelefonieBruecke,
    pub ereignisse: mpsc::Receiver<TelefonieEingang>,
}

impl TelefonieVerbindung {
    pub fn stream_id(&self) -> &StreamId {
        self.bruecke.stream_id()
    }
}

/// Wartet auf `start` und startet Lese- und Schreib-Task
pub async fn verbinden(socket: WebSocket) -> RelayResult<TelefonieVerbindung> {
    let (sink, mut stream) = socket.split();

    let start = auf_start_warten(&mut stream).await?;
    let stream_id = StreamId::neu(start.stream_sid.clone());
    tracing::info!(
        stream_id = %stream_id,
        call_sid = start.call_sid.as_deref().unwrap_or("-"),
        "Media-Stream gestartet"
    );

    let (bruecke, befehl_rx) = TelefonieBruecke::kanal(stream_id.clone());
    let (ereignis_tx, ereignis_rx) = mpsc::channel(KANAL_GROESSE);

    tokio::spawn(schreiben(sink, befehl_rx, stream_id.clone()));
    tokio::spawn(lesen(stream, ereignis_tx, stream_id));

    Ok(TelefonieVerbindung {
        start,
        bruecke,
        ereignisse: ereignis_rx,
    })
}

async fn auf_start_warten(stream: &mut SplitStream<WebSocket>) -> RelayResult<StartInfo> {
    while let Some(nachricht) = stream.next().await {
        let text = match nachricht {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(RelayError::verbindung(BEIN, e.to_string())),
        };
        match nachricht_parsen(&text) {
            Some(TelefonieEingang::Start { start }) => return Ok(start),
            Some(TelefonieEingang::Connected) => tracing::debug!("Media-Stream verbunden"),
            Some(TelefonieEingang::Stop { .. }) => break,
            _ => {}
        }
    }
    Err(RelayError::KeinStart)
}

/// Parst eine Anbieter-Nachricht, ungueltige werden geloggt und verworfen
pub fn nachricht_parsen(text: &str) -> Option<TelefonieEingang> {
    match TelefonieEingang::parsen(text) {
        Ok(TelefonieEingang::Unbekannt) => None,
        Ok(e) => Some(e),
        Err(e) => {
            tracing::warn!(fehler = %e, "Ungueltige Telefonie-Nachricht verworfen");
            None
        }
    }
}

async fn lesen(
    mut stream: SplitStream<WebSocket>,
    tx: mpsc::Sender<TelefonieEingang>,
    stream_id: StreamId,
) {
    while let Some(nachricht) = stream.next().await {
        match nachricht {
            Ok(Message::Text(text)) => {
                if let Some(ereignis) = nachricht_parsen(&text) {
                    if tx.send(ereignis).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(stream_id = %stream_id, "Media-Stream vom Anbieter geschlossen");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(stream_id = %stream_id, fehler = %e, "Lesefehler Media-Stream");
                break;
            }
        }
    }
}

async fn schreiben(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<TelefonieBefehl>,
    stream_id: StreamId,
) {
    while let Some(befehl) = rx.recv().await {
        let nachricht = match befehl {
            TelefonieBefehl::Senden(n) => n,
            TelefonieBefehl::Auflegen => {
                tracing::info!(stream_id = %stream_id, "Media-Stream wird geschlossen");
                break;
            }
        };
        let text = match nachricht.als_json() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(stream_id = %stream_id, fehler = %e, "Serialisierung fehlgeschlagen");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            tracing::warn!(stream_id = %stream_id, fehler = %e, "Senden an Telefonie fehlgeschlagen");
            break;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bruecke_markiert_stream_id() {
        let (b, mut rx) = TelefonieBruecke::kanal(StreamId::neu("MZ9"));
        b.clear().await.unwrap();
        b.media(&AudioFrame::stille()).await.unwrap();
        b.auflegen().await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(TelefonieBefehl::Senden(TelefonieAusgang::Clear {
                stream_sid: "MZ9".into()
            }))
        );
        match rx.recv().await {
            Some(TelefonieBefehl::Senden(TelefonieAusgang::Media { stream_sid, media })) => {
                assert_eq!(stream_sid, "MZ9");
                assert!(!media.payload.is_empty());
            }
            andere => panic!("unerwartet: {andere:?}"),
        }
        assert_eq!(rx.recv().await, Some(TelefonieBefehl::Auflegen));
    }

    #[tokio::test]
    async fn geschlossener_kanal_ist_sendefehler() {
        let (b, rx) = TelefonieBruecke::kanal(StreamId::neu("MZ9"));
        drop(rx);
        assert!(matches!(
            b.clear().await,
            Err(RelayError::SendFehler("telefonie"))
        ));
    }

    #[test]
    fn unbekannte_und_kaputte_nachrichten_werden_verworfen() {
        assert!(nachricht_parsen(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).is_none());
        assert!(nachricht_parsen("kein json").is_none());
        assert!(matches!(
            nachricht_parsen(r#"{"event":"stop","stop":{}}"#),
            Some(TelefonieEingang::Stop { .. })
        ));
    }
}
