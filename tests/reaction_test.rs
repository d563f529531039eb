//! Integration tests for reaction upserts and their relay to the 1:1
//! counterpart.

mod common;

use std::time::Duration;

use serde_json::json;

use common::*;
use huddle_server::store::models::OnlineStatus;

#[tokio::test]
async fn add_reaction_relays_and_persists_one_record() {
    let server = start_server().await;
    seed_user(&server, "u1", OnlineStatus::Online);
    seed_user(&server, "u2", OnlineStatus::Online);
    let conversation = seed_direct_conversation(&server, "u1", "u2");
    let message = seed_message(&server, &conversation, "u2", "hi");

    let mut ws1 = connect(server.addr).await;
    announce(&mut ws1, "u1").await;
    let mut ws2 = connect(server.addr).await;
    announce(&mut ws2, "u2").await;

    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "👍"
        }),
    )
    .await;

    let added = recv_event(&mut ws2, "reaction-added").await;
    assert_eq!(added["message_id"], message);
    assert_eq!(added["from"], "u1");
    assert_eq!(added["emoji"], "👍");

    // Same emoji again: still exactly one record.
    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "👍"
        }),
    )
    .await;
    recv_event(&mut ws2, "reaction-added").await;

    // Give the trailing upsert a moment to land.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stored = reactions(&server, &message);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, "u1");
    assert_eq!(stored[0].emoji, "👍");
}

#[tokio::test]
async fn new_emoji_replaces_previous_one() {
    let server = start_server().await;
    seed_user(&server, "u1", OnlineStatus::Online);
    seed_user(&server, "u2", OnlineStatus::Online);
    let conversation = seed_direct_conversation(&server, "u1", "u2");
    let message = seed_message(&server, &conversation, "u2", "hi");

    let mut ws1 = connect(server.addr).await;
    announce(&mut ws1, "u1").await;
    let mut ws2 = connect(server.addr).await;
    announce(&mut ws2, "u2").await;

    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "👍"
        }),
    )
    .await;
    recv_event(&mut ws2, "reaction-added").await;

    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "🔥"
        }),
    )
    .await;
    let replaced = recv_event(&mut ws2, "reaction-added").await;
    assert_eq!(replaced["emoji"], "🔥");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let stored = reactions(&server, &message);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].emoji, "🔥");
}

#[tokio::test]
async fn remove_reaction_relays_and_deletes() {
    let server = start_server().await;
    seed_user(&server, "u1", OnlineStatus::Online);
    seed_user(&server, "u2", OnlineStatus::Online);
    let conversation = seed_direct_conversation(&server, "u1", "u2");
    let message = seed_message(&server, &conversation, "u2", "hi");

    let mut ws1 = connect(server.addr).await;
    announce(&mut ws1, "u1").await;
    let mut ws2 = connect(server.addr).await;
    announce(&mut ws2, "u2").await;

    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "👍"
        }),
    )
    .await;
    recv_event(&mut ws2, "reaction-added").await;

    send_event(
        &mut ws1,
        json!({
            "event": "remove-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1"
        }),
    )
    .await;
    let removed = recv_event(&mut ws2, "reaction-removed").await;
    assert_eq!(removed["message_id"], message);
    assert_eq!(removed["from"], "u1");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(reactions(&server, &message).is_empty());
}

#[tokio::test]
async fn reaction_to_offline_counterpart_still_persists() {
    let server = start_server().await;
    seed_user(&server, "u1", OnlineStatus::Online);
    seed_user(&server, "u2", OnlineStatus::Online);
    let conversation = seed_direct_conversation(&server, "u1", "u2");
    let message = seed_message(&server, &conversation, "u2", "hi");

    let mut ws1 = connect(server.addr).await;
    announce(&mut ws1, "u1").await;

    // The relay is dropped (u2 offline) but the reaction row converges
    // through the store.
    send_event(
        &mut ws1,
        json!({
            "event": "add-reaction",
            "message_id": message,
            "to": "u2",
            "from": "u1",
            "emoji": "👍"
        }),
    )
    .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    let stored = reactions(&server, &message);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].emoji, "👍");
}
