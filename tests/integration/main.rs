//! Geotrace integration test harness.
//!
//! Every test runs a full in-process node: resolver, pipeline, hub and the
//! HTTP/WebSocket endpoint bound to an ephemeral loopback port. Lookups go
//! to a scripted HTTP provider on another ephemeral port, so nothing leaves
//! the machine.
//!
//!   cargo test --test integration

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use geotrace_core::{EnrichedEvent, Observation, ServerMessage};
use geotrace_services::{
    BroadcastHub, CooldownGate, EnrichmentPipeline, GeoResolver, HttpGeoProvider, PipelineStats,
    ResolutionCache,
};

mod status_api;
mod subscribers;

// ── Scripted provider ─────────────────────────────────────────────────────────

/// What the fake provider answers for one address.
#[derive(Clone)]
pub enum Reply {
    Located { city: &'static str, country: &'static str, lat: f64, lon: f64 },
    Status(u16),
    Fail(&'static str),
}

/// HTTP provider speaking the `status`/`lat`/`lon` JSON shape. Unscripted
/// addresses get a `fail` answer.
#[derive(Clone, Default)]
pub struct FakeProvider {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeProvider {
    pub fn script(&self, ip: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(ip.to_string(), reply);
    }

    pub fn locate(&self, ip: &str, city: &'static str, country: &'static str) {
        self.script(ip, Reply::Located { city, country, lat: 10.0, lon: 20.0 });
    }

    pub fn calls(&self, ip: &str) -> usize {
        self.calls.lock().unwrap().get(ip).copied().unwrap_or(0)
    }

    /// Serve on an ephemeral port. Returns the lookup base URL.
    pub async fn start(&self) -> Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let app = Router::new()
            .route("/json/{ip}", get(fake_lookup))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://127.0.0.1:{port}/json"))
    }
}

async fn fake_lookup(State(provider): State<FakeProvider>, Path(ip): Path<String>) -> Response {
    *provider.calls.lock().unwrap().entry(ip.clone()).or_default() += 1;
    let reply = provider.replies.lock().unwrap().get(&ip).cloned();
    match reply {
        Some(Reply::Located { city, country, lat, lon }) => Json(serde_json::json!({
            "status": "success",
            "query": ip,
            "lat": lat,
            "lon": lon,
            "city": city,
            "country": country,
        }))
        .into_response(),
        Some(Reply::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Reply::Fail(message)) => {
            Json(serde_json::json!({ "status": "fail", "message": message })).into_response()
        }
        None => Json(serde_json::json!({ "status": "fail", "message": "invalid query" }))
            .into_response(),
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// A running daemon minus the capture source: observations are fed directly.
pub struct Node {
    pub port: u16,
    pub provider: FakeProvider,
    pub hub: BroadcastHub,
    pub cache: ResolutionCache,
    pub stats: PipelineStats,
    observations: mpsc::Sender<Observation>,
    _shutdown: broadcast::Sender<()>,
}

impl Node {
    pub async fn start(cooldown: Duration) -> Result<Self> {
        let provider = FakeProvider::default();
        let base_url = provider.start().await?;

        let lookups = Arc::new(HttpGeoProvider::new(base_url, Duration::from_secs(2))?);
        let cache = ResolutionCache::new(1024);
        let cooldown = CooldownGate::new(cooldown);
        let stats = PipelineStats::new();
        let resolver = Arc::new(
            GeoResolver::new(lookups, cache.clone(), cooldown.clone()).with_stats(stats.clone()),
        );
        let hub = BroadcastHub::new(64);
        let pipeline = EnrichmentPipeline::new(resolver, hub.clone(), 64);

        let (shutdown_tx, _) = broadcast::channel(1);
        let (observations, rx) = mpsc::channel(64);
        tokio::spawn(pipeline.run(rx, shutdown_tx.subscribe()));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let state = geotrace_api::ApiState {
            hub: hub.clone(),
            cache: cache.clone(),
            cooldown,
            stats: stats.clone(),
        };
        tokio::spawn(geotrace_api::serve_on(listener, state));

        Ok(Self {
            port,
            provider,
            hub,
            cache,
            stats,
            observations,
            _shutdown: shutdown_tx,
        })
    }

    pub async fn feed(&self, src: &str, dst: &str) -> Result<()> {
        self.observations
            .send(Observation::new(src, dst))
            .await
            .context("pipeline closed")
    }

    /// Connect a subscriber and wait until the hub has registered it.
    pub async fn subscribe(&self) -> Result<Client> {
        let before = self.hub.len();
        let (ws, _) = connect_async(format!("ws://127.0.0.1:{}/ws", self.port))
            .await
            .context("websocket connect failed")?;
        self.wait_for_subscribers(before + 1).await?;
        Ok(Client { ws })
    }

    pub async fn wait_for_subscribers(&self, count: usize) -> Result<()> {
        for _ in 0..100 {
            if self.hub.len() == count {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        bail!("expected {count} subscribers, hub has {}", self.hub.len())
    }

    /// Wait until the pipeline has taken in `count` observations in total
    /// and finished with all of them.
    pub async fn wait_for_settled(&self, count: u64) -> Result<()> {
        for _ in 0..100 {
            let s = self.stats.snapshot();
            if s.observations >= count && s.events_published + s.dropped >= count {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        bail!("pipeline did not settle: {:?}", self.stats.snapshot())
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}/api{}", self.port, path)
    }
}

// ── Subscriber client ─────────────────────────────────────────────────────────

pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Next packet event, or None if nothing arrives within `wait`.
    pub async fn next_event(&mut self, wait: Duration) -> Result<Option<EnrichedEvent>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let msg = match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => bail!("stream closed"),
                Ok(Some(msg)) => msg?,
            };
            if let Message::Text(text) = msg {
                let ServerMessage::Packet(event) = serde_json::from_str(&text)?;
                return Ok(Some(event));
            }
        }
    }

    pub async fn raw_frame(&mut self, wait: Duration) -> Result<serde_json::Value> {
        match tokio::time::timeout(wait, self.ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => Ok(serde_json::from_str(&text)?),
            other => bail!("expected a text frame, got {other:?}"),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.send(Message::Close(None)).await?;
        Ok(())
    }
}

pub const QUIET: Duration = Duration::from_millis(300);
pub const PATIENT: Duration = Duration::from_secs(3);
