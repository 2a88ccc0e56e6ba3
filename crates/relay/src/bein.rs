//! Nachrichtenpumpen fuer die Dienst-Beine (WebSocket-Client)
//!
//! Inferenz- und Synthesedienst sprechen JSON-Textnachrichten. Pro Bein
//! laufen zwei Tasks:
//!
//! - Lese-Task: Text -> `parsen` -> mpsc an die Sitzung. Ungueltige
//!   Nachrichten werden geloggt und verworfen. Endet der Socket, endet
//!   der Kanal, die Sitzung sieht `None`.
//! - Schreib-Task: mpsc -> `serialisieren` -> Text. Wird die Bruecke der
//!   Sitzung fallen gelassen, schliesst der Task den Socket.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parla_core::ParlaError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::telephony::KANAL_GROESSE;

/// Startet beide Pumpen und liefert die Empfangsseite der Sitzung
pub(crate) fn pumpen<S, A, E>(
    socket: S,
    ausgang: mpsc::Receiver<A>,
    bein: &'static str,
    parsen: fn(&str) -> Result<E, ParlaError>,
    serialisieren: fn(&A) -> Result<String, ParlaError>,
) -> mpsc::Receiver<E>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Send + 'static,
    A: Send + 'static,
    E: Send + 'static,
{
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(KANAL_GROESSE);

    tokio::spawn(schreiben(sink, ausgang, bein, serialisieren));
    tokio::spawn(lesen(stream, tx, bein, parsen));
    rx
}

async fn lesen<R, E>(
    mut stream: R,
    tx: mpsc::Sender<E>,
    bein: &'static str,
    parsen: fn(&str) -> Result<E, ParlaError>,
) where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(nachricht) = stream.next().await {
        match nachricht {
            Ok(Message::Text(text)) => match parsen(&text) {
                Ok(ereignis) => {
                    if tx.send(ereignis).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(bein, fehler = %e, "Nachricht verworfen"),
            },
            Ok(Message::Close(rahmen)) => {
                tracing::info!(bein, grund = ?rahmen, "Dienst hat die Verbindung geschlossen");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(bein, fehler = %e, "Lesefehler");
                break;
            }
        }
    }
}

async fn schreiben<W, A>(
    mut sink: W,
    mut rx: mpsc::Receiver<A>,
    bein: &'static str,
    serialisieren: fn(&A) -> Result<String, ParlaError>,
) where
    W: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(anfrage) = rx.recv().await {
        let text = match serialisieren(&anfrage) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(bein, fehler = %e, "Serialisierung fehlgeschlagen");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            tracing::warn!(bein, fehler = %e, "Senden fehlgeschlagen");
            break;
        }
    }
    let _ = sink.close().await;
    tracing::debug!(bein, "Schreib-Task beendet");
}
