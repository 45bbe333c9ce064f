use tether_server::RelayConfig;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{assert_registry_consistent, connect_user};
use tether_core::ConnectionId;

#[tokio::test]
async fn test_stale_disconnect_ignored() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());
    let (u1, c1) = connect_user(&relay, "u1").await;
    relay.join_room(&u1, "lobby", None).await.expect("Join failed");

    let c1_new = ConnectionId::new();
    relay.on_connect(u1.clone(), c1_new, None).await;
    signaling.clear().await;

    relay.on_disconnect(&u1, c1).await;

    let user = relay.registry().user(&u1).expect("User must survive");
    assert_eq!(user.connection, c1_new);
    assert!(user.is_in("lobby"));
    assert!(signaling.deliveries().await.is_empty());

    relay.on_disconnect(&u1, c1_new).await;
    assert_eq!(relay.registry().user_count(), 0);
    assert_eq!(relay.registry().room_count(), 0);
    assert_registry_consistent(&relay);
}
