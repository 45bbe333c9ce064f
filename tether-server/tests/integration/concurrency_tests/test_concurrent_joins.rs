use std::sync::Arc;
use tether_server::RelayConfig;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{assert_registry_consistent, connect_user};

const JOINERS: usize = 48;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());

    let mut users = Vec::with_capacity(JOINERS);
    for i in 0..JOINERS {
        users.push(connect_user(&relay, &format!("user-{i}")).await);
    }

    let handles: Vec<_> = users
        .iter()
        .map(|(identity, _)| {
            let relay = Arc::clone(&relay);
            let identity = identity.clone();
            tokio::spawn(async move { relay.join_room(&identity, "arena", Some("pw")).await })
        })
        .collect();

    for handle in handles {
        handle
            .await
            .expect("Join task panicked")
            .expect("Concurrent join failed");
    }

    assert_eq!(relay.registry().room_count(), 1, "Exactly one room must exist");
    let room = relay.registry().room("arena").expect("Room missing");
    assert_eq!(room.members.len(), JOINERS);
    assert!(room.is_protected());

    for (_, connection) in &users {
        assert!(
            !signaling.rooms_for(*connection).await.is_empty(),
            "Every joiner must receive at least its own snapshot"
        );
    }
    assert_registry_consistent(&relay);
}
