use tether_server::{MembershipPolicy, RelayConfig, RelayError};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{assert_registry_consistent, connect_user};

#[tokio::test]
async fn test_leave_last_room_releases_user() {
    init_tracing();

    let (relay, _signaling) = create_test_relay(RelayConfig::default());
    let (u1, _c1) = connect_user(&relay, "u1").await;

    relay.join_room(&u1, "a", None).await.expect("Join a failed");
    relay.join_room(&u1, "b", None).await.expect("Join b failed");

    relay.leave_room(&u1, "a").await.expect("Leave a failed");
    assert!(relay.registry().user(&u1).is_some());

    relay.leave_room(&u1, "b").await.expect("Leave b failed");
    assert!(
        relay.registry().user(&u1).is_none(),
        "User without rooms must be released"
    );
    assert_eq!(relay.registry().room_count(), 0);

    assert_eq!(
        relay.join_room(&u1, "a", None).await,
        Err(RelayError::UserNotFound(u1.clone()))
    );
    assert_registry_consistent(&relay);
}

#[tokio::test]
async fn test_retain_policy_keeps_idle_user() {
    init_tracing();

    let config = RelayConfig {
        membership: MembershipPolicy::RetainWhileConnected,
        ..RelayConfig::default()
    };
    let (relay, _signaling) = create_test_relay(config);
    let (u1, c1) = connect_user(&relay, "u1").await;

    relay.join_room(&u1, "a", None).await.expect("Join failed");
    relay.leave_room(&u1, "a").await.expect("Leave failed");

    assert_eq!(relay.registry().connection_handle_of(&u1), Some(c1));
    relay
        .join_room(&u1, "a", None)
        .await
        .expect("Idle user must be able to join again");
}

#[tokio::test]
async fn test_leave_unknown_room_is_rejected() {
    init_tracing();

    let (relay, _signaling) = create_test_relay(RelayConfig::default());
    let (u1, _c1) = connect_user(&relay, "u1").await;
    relay.join_room(&u1, "a", None).await.expect("Join failed");

    assert_eq!(
        relay.leave_room(&u1, "nowhere").await,
        Err(RelayError::RoomNotFound("nowhere".to_owned()))
    );
    assert!(relay.registry().user(&u1).unwrap().is_in("a"));
}
