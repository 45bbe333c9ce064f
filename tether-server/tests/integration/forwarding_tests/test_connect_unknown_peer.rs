use serde_json::json;
use std::time::Duration;
use tether_core::UserId;
use tether_server::{RelayConfig, RelayError};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::connect_user;

#[tokio::test]
async fn test_connect_unknown_peer() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());
    let (u1, _c1) = connect_user(&relay, "u1").await;
    let ghost = UserId::from("ghost");

    assert_eq!(
        relay.relay_connect(&u1, &ghost, json!({})).await,
        Err(RelayError::UserNotFound(ghost.clone()))
    );
    assert_eq!(
        relay.relay_ice_candidate(&u1, &ghost, json!({})).await,
        Err(RelayError::UserNotFound(ghost.clone()))
    );
    assert!(signaling.deliveries().await.is_empty());
}

#[tokio::test]
async fn test_connect_dead_peer_is_unreachable() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());
    let (u1, _c1) = connect_user(&relay, "u1").await;
    let (u2, c2) = connect_user(&relay, "u2").await;

    signaling.kill(c2).await;

    assert_eq!(
        relay.relay_connect(&u1, &u2, json!({"sdp": "offer"})).await,
        Err(RelayError::PeerUnreachable(u2.clone()))
    );
    assert_eq!(
        relay.relay_ice_candidate(&u1, &u2, json!({"candidate": "c"})).await,
        Err(RelayError::PeerUnreachable(u2.clone()))
    );
}

#[tokio::test]
async fn test_connect_without_answer_is_unreachable() {
    init_tracing();

    let config = RelayConfig {
        answer_timeout: Duration::from_millis(50),
        ..RelayConfig::default()
    };
    let (relay, _signaling) = create_test_relay(config);
    let (u1, _c1) = connect_user(&relay, "u1").await;
    let (u2, _c2) = connect_user(&relay, "u2").await;

    assert_eq!(
        relay.relay_connect(&u1, &u2, json!({"sdp": "offer"})).await,
        Err(RelayError::PeerUnreachable(u2.clone()))
    );
}
