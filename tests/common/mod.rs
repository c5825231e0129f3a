//! Shared integration-test harness, modeled on the teacher's
//! `tests/common/mod.rs`: bind to an ephemeral port, run a real server in a
//! background task, and give each test thin WS helpers to drive it.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use quiznight_server::codec::ServerMessage;
use quiznight_server::config::ServerConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a chance to shrink the auto-advance/reap windows so a test
    /// doesn't have to wait out production-length timers over real time.
    pub async fn spawn_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig::default();
        config.listen_addr = "127.0.0.1:0".parse().unwrap();
        configure(&mut config);

        let (app, _state) = quiznight_server::build_app(&config);

        let listener = tokio::net::TcpListener::bind(config.listen_addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn ws_connect(url: &str) -> WsClient {
    let (stream, _) = connect_async(url).await.expect("failed to connect ws");
    stream
}

pub async fn ws_send(client: &mut WsClient, raw: &str) {
    client.send(WsMessage::Text(raw.into())).await.expect("ws send failed");
}

pub async fn ws_read_raw(client: &mut WsClient) -> String {
    loop {
        match client.next().await {
            Some(Ok(WsMessage::Text(text))) => return text.to_string(),
            Some(Ok(_)) => continue,
            Some(Err(err)) => panic!("ws error: {err}"),
            None => panic!("connection closed unexpectedly"),
        }
    }
}

pub async fn ws_read_server_msg(client: &mut WsClient) -> ServerMessage {
    let raw = ws_read_raw(client).await;
    serde_json::from_str(&raw).unwrap_or_else(|err| panic!("bad server message {raw:?}: {err}"))
}

/// Create a session via the REST facade and return its pin.
pub async fn create_session(base_url: &str, questions_json: serde_json::Value) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/api/v1/sessions"))
        .json(&serde_json::json!({ "questions": questions_json }))
        .send()
        .await
        .expect("create_session request failed");
    assert!(resp.status().is_success(), "create_session returned {}", resp.status());
    let body: serde_json::Value = resp.json().await.expect("non-json create_session response");
    body["pin"].as_str().expect("response missing pin").to_string()
}
