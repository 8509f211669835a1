//! Subscriber fan-out and disconnect handling.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::*;

#[tokio::test]
async fn every_subscriber_receives_each_event() -> Result<()> {
    let node = Node::start(Duration::from_secs(3)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");

    let mut a = node.subscribe().await?;
    let mut b = node.subscribe().await?;
    let mut c = node.subscribe().await?;

    node.feed("8.8.8.8", "1.1.1.1").await?;

    for client in [&mut a, &mut b, &mut c] {
        let event = client.next_event(PATIENT).await?.context("missing event")?;
        assert_eq!(event.src.address, "8.8.8.8");
    }
    Ok(())
}

#[tokio::test]
async fn disconnected_subscriber_is_removed() -> Result<()> {
    let node = Node::start(Duration::from_secs(3)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");

    let mut stays = node.subscribe().await?;
    let leaves = node.subscribe().await?;

    leaves.close().await?;
    node.wait_for_subscribers(1).await?;

    node.feed("8.8.8.8", "1.1.1.1").await?;
    assert!(stays.next_event(PATIENT).await?.is_some());
    assert_eq!(node.hub.len(), 1);
    Ok(())
}

#[tokio::test]
async fn late_subscriber_gets_no_backlog() -> Result<()> {
    let node = Node::start(Duration::from_secs(3)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");

    let mut early = node.subscribe().await?;
    node.feed("8.8.8.8", "1.1.1.1").await?;
    early.next_event(PATIENT).await?.context("early event")?;

    let mut late = node.subscribe().await?;
    assert!(late.next_event(QUIET).await?.is_none());

    node.feed("1.1.1.1", "8.8.8.8").await?;
    let event = late.next_event(PATIENT).await?.context("live event")?;
    assert_eq!(event.src.address, "1.1.1.1");
    Ok(())
}

#[tokio::test]
async fn events_without_subscribers_are_discarded() -> Result<()> {
    let node = Node::start(Duration::from_secs(3)).await?;
    node.provider.locate("8.8.8.8", "Mountain View", "United States");
    node.provider.locate("1.1.1.1", "Sydney", "Australia");

    node.feed("8.8.8.8", "1.1.1.1").await?;
    node.wait_for_settled(1).await?;
    assert_eq!(node.stats.snapshot().events_published, 1);

    let mut client = node.subscribe().await?;
    assert!(client.next_event(QUIET).await?.is_none());
    Ok(())
}
