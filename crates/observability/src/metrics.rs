//! Prometheus-kompatible Metriken fuer Parla
//!
//! Registrierte Metriken:
//! - `parla_aktive_anrufe` – Gauge: Laufende Anrufsitzungen
//! - `parla_anrufe_total` – Counter: Begonnene Anrufe
//! - `parla_barge_ins_total` – Counter: Unterbrechungen durch den Anrufer
//! - `parla_werkzeug_aufrufe_total` – Counter: Werkzeugaufrufe (werkzeug, erfolg)
//! - `parla_ausgehende_frames_total` – Counter: Frames zur Telefonie (art)
//! - `parla_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `parla_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! [`ParlaMetrics`] ist zugleich die [`EreignisSenke`] der Sitzungen.

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use parla_core::{EreignisSenke, SitzungsEreignis};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Parla-Prometheus-Metriken
#[derive(Clone)]
pub struct ParlaMetrics {
    pub registry: Arc<Registry>,

    // Anruf-Metriken
    pub aktive_anrufe: IntGauge,
    pub anrufe_total: IntCounter,
    pub barge_ins_total: IntCounter,
    pub werkzeug_aufrufe_total: IntCounterVec,
    pub ausgehende_frames_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl ParlaMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Anruf-Metriken ---
        let aktive_anrufe = IntGauge::with_opts(Opts::new(
            "parla_aktive_anrufe",
            "Anzahl laufender Anrufsitzungen",
        ))?;
        registry.register(Box::new(aktive_anrufe.clone()))?;

        let anrufe_total = IntCounter::with_opts(Opts::new(
            "parla_anrufe_total",
            "Gesamtanzahl begonnener Anrufe",
        ))?;
        registry.register(Box::new(anrufe_total.clone()))?;

        let barge_ins_total = IntCounter::with_opts(Opts::new(
            "parla_barge_ins_total",
            "Gesamtanzahl Unterbrechungen durch den Anrufer",
        ))?;
        registry.register(Box::new(barge_ins_total.clone()))?;

        let werkzeug_aufrufe_total = IntCounterVec::new(
            Opts::new(
                "parla_werkzeug_aufrufe_total",
                "Abgeschlossene Werkzeugaufrufe",
            ),
            &["werkzeug", "erfolg"],
        )?;
        registry.register(Box::new(werkzeug_aufrufe_total.clone()))?;

        let ausgehende_frames_total = IntCounterVec::new(
            Opts::new(
                "parla_ausgehende_frames_total",
                "An die Telefonie gesendete Audio-Frames",
            ),
            &["art"],
        )?;
        registry.register(Box::new(ausgehende_frames_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("parla_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "parla_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            aktive_anrufe,
            anrufe_total,
            barge_ins_total,
            werkzeug_aufrufe_total,
            ausgehende_frames_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl EreignisSenke for ParlaMetrics {
    fn melden(&self, ereignis: SitzungsEreignis) {
        match ereignis {
            SitzungsEreignis::AnrufBegonnen { .. } => {
                self.anrufe_total.inc();
                self.aktive_anrufe.inc();
            }
            SitzungsEreignis::AnrufBeendet { .. } => self.aktive_anrufe.dec(),
            SitzungsEreignis::BargeIn { .. } => self.barge_ins_total.inc(),
            SitzungsEreignis::WerkzeugAufgerufen { werkzeug, erfolg } => self
                .werkzeug_aufrufe_total
                .with_label_values(&[werkzeug.as_str(), if erfolg { "true" } else { "false" }])
                .inc(),
            SitzungsEreignis::FrameGesendet { art } => self
                .ausgehende_frames_total
                .with_label_values(&[art.als_label()])
                .inc(),
        }
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: ParlaMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<ParlaMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(fehler = %err, "Metriken-Export fehlgeschlagen");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parla_core::{FrameArt, StreamId};

    fn anruf(id: &str) -> StreamId {
        StreamId::neu(id)
    }

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = ParlaMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn anruf_lebenszyklus_zaehlt() {
        let m = ParlaMetrics::neu().unwrap();
        m.melden(SitzungsEreignis::AnrufBegonnen {
            stream_id: anruf("A"),
        });
        m.melden(SitzungsEreignis::AnrufBegonnen {
            stream_id: anruf("B"),
        });
        assert_eq!(m.aktive_anrufe.get(), 2);

        m.melden(SitzungsEreignis::AnrufBeendet {
            stream_id: anruf("A"),
            grund: "end_call".into(),
        });
        assert_eq!(m.aktive_anrufe.get(), 1);
        assert_eq!(m.anrufe_total.get(), 2);
    }

    #[test]
    fn werkzeug_und_frames_mit_labels() {
        let m = ParlaMetrics::neu().unwrap();
        m.melden(SitzungsEreignis::WerkzeugAufgerufen {
            werkzeug: "make_reservation".into(),
            erfolg: true,
        });
        m.melden(SitzungsEreignis::WerkzeugAufgerufen {
            werkzeug: "make_reservation".into(),
            erfolg: false,
        });
        for _ in 0..3 {
            m.melden(SitzungsEreignis::FrameGesendet {
                art: FrameArt::Ambient,
            });
        }
        m.melden(SitzungsEreignis::BargeIn {
            stream_id: anruf("A"),
        });

        let ok = m
            .werkzeug_aufrufe_total
            .with_label_values(&["make_reservation", "true"])
            .get();
        assert_eq!(ok, 1);
        assert_eq!(
            m.ausgehende_frames_total
                .with_label_values(&["ambient"])
                .get(),
            3
        );
        assert_eq!(m.barge_ins_total.get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let m = ParlaMetrics::neu().unwrap();
        m.aktive_anrufe.set(5);
        m.anrufe_total.inc();

        let output = m.exportieren().unwrap();
        assert!(output.contains("parla_aktive_anrufe 5"));
        assert!(output.contains("parla_anrufe_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn alle_metriken_in_registry_registriert() {
        let m = ParlaMetrics::neu().unwrap();

        // Vec-Metriken erscheinen in gather() erst nach dem ersten Label-Zugriff
        m.werkzeug_aufrufe_total
            .with_label_values(&["end_call", "true"])
            .inc();
        m.ausgehende_frames_total
            .with_label_values(&["sprache"])
            .inc();
        m.http_requests_total
            .with_label_values(&["GET", "/health", "200"])
            .inc();
        m.http_request_duration_seconds
            .with_label_values(&["GET", "/health"])
            .observe(0.01);

        let families = m.registry.gather();
        let namen: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        for name in [
            "parla_aktive_anrufe",
            "parla_anrufe_total",
            "parla_barge_ins_total",
            "parla_werkzeug_aufrufe_total",
            "parla_ausgehende_frames_total",
            "parla_http_requests_total",
            "parla_http_request_duration_seconds",
        ] {
            assert!(namen.contains(&name), "{name} fehlt");
        }
    }
}
