//! Live event stream.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use geotrace_core::{EnrichedEvent, ServerMessage};

use super::http::ws_url;

/// Subscribe and print one line per event until the daemon closes the stream.
pub async fn cmd_watch(port: u16) -> Result<()> {
    let url = ws_url(port);
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to geotraced at {}, is it running?", url))?;
    let (mut write, mut read) = ws_stream.split();
    eprintln!("watching {} (Ctrl-C to stop)", url);

    while let Some(msg) = read.next().await {
        match msg.context("stream error")? {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::Packet(event)) => println!("{}", format_event(&event)),
                Err(e) => eprintln!("unrecognised frame ({}): {}", e, text.as_str()),
            },
            Message::Ping(data) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    eprintln!("stream closed");
    Ok(())
}

fn format_event(event: &EnrichedEvent) -> String {
    format!(
        "[{}] {} ({}, {}) → {} ({}, {})",
        event.timestamp,
        event.src.address,
        place(&event.src.city, &event.src.country),
        coords(event.src.latitude, event.src.longitude),
        event.dst.address,
        place(&event.dst.city, &event.dst.country),
        coords(event.dst.latitude, event.dst.longitude),
    )
}

fn place(city: &str, country: &str) -> String {
    match (city.is_empty(), country.is_empty()) {
        (false, false) => format!("{}/{}", city, country),
        (true, false) => country.to_string(),
        (false, true) => city.to_string(),
        (true, true) => "?".to_string(),
    }
}

fn coords(lat: f64, lon: f64) -> String {
    format!("{:.2},{:.2}", lat, lon)
}
