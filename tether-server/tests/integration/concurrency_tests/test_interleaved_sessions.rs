use std::sync::Arc;
use tether_core::{ConnectionId, UserId};
use tether_server::RelayConfig;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::assert_registry_consistent;

const USERS: usize = 16;
const ROUNDS: usize = 20;
const ROOMS: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_sessions() {
    init_tracing();

    let (relay, _signaling) = create_test_relay(RelayConfig::default());

    let handles: Vec<_> = (0..USERS)
        .map(|i| {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                let identity = UserId::from(format!("user-{i}"));
                for round in 0..ROUNDS {
                    let connection = ConnectionId::new();
                    let first = format!("room-{}", (i + round) % ROOMS);
                    let second = format!("room-{}", (i + round + 1) % ROOMS);

                    relay.on_connect(identity.clone(), connection, None).await;
                    relay.join_room(&identity, &first, None).await?;
                    relay.join_room(&identity, &second, None).await?;
                    relay.leave_room(&identity, &first).await?;
                    relay.on_disconnect(&identity, connection).await;
                }
                Ok::<_, tether_server::RelayError>(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .await
            .expect("Session task panicked")
            .expect("Session step failed");
    }

    assert_eq!(relay.registry().user_count(), 0);
    assert_eq!(relay.registry().room_count(), 0);
    assert_registry_consistent(&relay);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reconnect_races_stale_disconnect() {
    init_tracing();

    let (relay, _signaling) = create_test_relay(RelayConfig::default());
    let identity = UserId::from("flaky");

    for _ in 0..50 {
        let old = ConnectionId::new();
        relay.on_connect(identity.clone(), old, None).await;
        relay
            .join_room(&identity, "lobby", None)
            .await
            .expect("Join failed");

        let new = ConnectionId::new();
        let reconnect = {
            let relay = Arc::clone(&relay);
            let identity = identity.clone();
            tokio::spawn(async move { relay.on_connect(identity, new, None).await })
        };
        let disconnect = {
            let relay = Arc::clone(&relay);
            let identity = identity.clone();
            tokio::spawn(async move { relay.on_disconnect(&identity, old).await })
        };

        reconnect.await.expect("Reconnect panicked");
        disconnect.await.expect("Disconnect panicked");

        // Whatever the order, the newest handle wins.
        assert_eq!(relay.registry().connection_handle_of(&identity), Some(new));
        assert_registry_consistent(&relay);

        relay.on_disconnect(&identity, new).await;
        assert_eq!(relay.registry().user_count(), 0);
    }
}
