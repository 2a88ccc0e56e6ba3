//! Integration-Tests fuer die HTTP-Oberflaeche
//!
//! Der Router wird ohne Listener ueber `tower::ServiceExt::oneshot`
//! angesprochen.

use std::io::Write;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use parla_server::config::ServerConfig;
use parla_server::{twiml, Server};
use tower::ServiceExt;

async fn text(res: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn server() -> Server {
    Server::neu(ServerConfig::default()).unwrap()
}

#[tokio::test]
async fn index_meldet_lebenszeichen() {
    let res = server()
        .router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(res).await, "Server running");
}

#[tokio::test]
async fn voice_liefert_twiml_mit_host_und_region() {
    let req = Request::builder()
        .method("POST")
        .uri("/voice")
        .header(header::HOST, "casa-masa.example.com")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("CallSid=CA123&From=%2B15550100"))
        .unwrap();
    let res = server().router().oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/xml");
    let xml = text(res).await;
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(r#"<Stream url="wss://casa-masa.example.com/media-stream">"#));
    assert!(xml.contains(r#"<Parameter name="Twilio-Region" value="ie1" />"#));
}

#[test]
fn twiml_maskiert_sonderzeichen() {
    let xml = twiml("a\"b", "/media-stream", "x&y");
    assert!(xml.contains("wss://a&quot;b/media-stream"));
    assert!(xml.contains(r#"value="x&amp;y""#));
}

#[tokio::test]
async fn media_stream_ohne_upgrade_wird_abgelehnt() {
    let res = server()
        .router()
        .oneshot(
            Request::builder()
                .uri("/media-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn health_und_metrics_verfuegbar() {
    let app = server().router();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["active_calls"], 0);

    let res = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let metriken = text(res).await;
    assert!(metriken.contains("parla_aktive_anrufe"));
    // Die Health-Anfrage wurde von der Middleware gezaehlt
    assert!(metriken.contains(r#"parla_http_requests_total{method="GET",path="/health",status="200"} 1"#));
}

#[tokio::test]
async fn observability_abschaltbar() {
    let mut config = ServerConfig::default();
    config.observability.aktiviert = false;
    let res = Server::neu(config)
        .unwrap()
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eigener_media_pfad_aus_toml() {
    let mut datei = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        datei,
        r#"
        [server]
        media_pfad = "/anruf"
        region = "us1"
        "#
    )
    .unwrap();
    let config = ServerConfig::laden(datei.path().to_str().unwrap()).unwrap();

    let req = Request::builder()
        .method("POST")
        .uri("/voice")
        .header(header::HOST, "relay.local")
        .body(Body::empty())
        .unwrap();
    let xml = text(Server::neu(config).unwrap().router().oneshot(req).await.unwrap()).await;
    assert!(xml.contains("wss://relay.local/anruf"));
    assert!(xml.contains(r#"value="us1""#));
}

#[test]
fn fehlende_datei_liefert_standardwerte() {
    let config = ServerConfig::laden("/gibt/es/nicht/parla.toml").unwrap();
    assert_eq!(config.server.port, 3000);
}

#[test]
fn kaputte_ambient_datei_verhindert_start_nicht() {
    let mut config = ServerConfig::default();
    config.ambient.datei = Some("/gibt/es/nicht/ambiance.ulaw".into());
    assert!(Server::neu(config).is_ok());
}
