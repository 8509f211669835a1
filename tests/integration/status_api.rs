//! JSON status and cache endpoints.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::*;

#[tokio::test]
async fn status_reports_counters_and_subscribers() -> Result<()> {
    let node = Node::start(Duration::from_secs(3)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");
    let mut client = node.subscribe().await?;

    node.feed("8.8.8.8", "1.1.1.1").await?;
    client.next_event(PATIENT).await?.context("event")?;
    node.feed("8.8.8.8", "10.0.0.1").await?;
    node.wait_for_settled(2).await?;

    let status: serde_json::Value = reqwest::get(node.api_url("/status")).await?.json().await?;
    assert_eq!(status["subscribers"], 1);
    assert_eq!(status["cache_entries"], 2);
    assert_eq!(status["cooldown_entries"], 2);
    assert_eq!(status["stats"]["observations"], 2);
    assert_eq!(status["stats"]["events_published"], 1);
    assert_eq!(status["stats"]["dropped"], 1);
    assert_eq!(status["stats"]["bogus"], 1);
    assert_eq!(status["stats"]["lookups_resolved"], 2);
    Ok(())
}

#[tokio::test]
async fn cache_can_be_inspected_and_cleared() -> Result<()> {
    let node = Node::start(Duration::from_millis(100)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");

    node.feed("8.8.8.8", "1.1.1.1").await?;
    node.wait_for_settled(1).await?;

    let cache: serde_json::Value = reqwest::get(node.api_url("/cache")).await?.json().await?;
    assert_eq!(cache["entries"], 2);
    assert_eq!(cache["capacity"], 1024);

    let cleared: serde_json::Value = reqwest::Client::new()
        .post(node.api_url("/cache/clear"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cleared["cleared"], 2);
    assert!(node.cache.is_empty());

    // Once the cooldown lapses the next observation goes back to the provider
    tokio::time::sleep(Duration::from_millis(150)).await;
    node.feed("8.8.8.8", "1.1.1.1").await?;
    node.wait_for_settled(2).await?;
    assert_eq!(node.provider.calls("8.8.8.8"), 2);
    Ok(())
}
