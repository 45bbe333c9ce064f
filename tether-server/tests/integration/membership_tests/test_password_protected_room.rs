use tether_server::{RelayConfig, RelayError};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{assert_registry_consistent, connect_user, member_set, names};

#[tokio::test]
async fn test_first_joiner_sets_password() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());
    let (u1, c1) = connect_user(&relay, "u1").await;
    let (u2, _c2) = connect_user(&relay, "u2").await;

    relay
        .join_room(&u1, "secret", Some("pw1"))
        .await
        .expect("Creating the room failed");
    signaling.clear().await;

    let rejected = relay.join_room(&u2, "secret", Some("wrong")).await;
    assert_eq!(
        rejected,
        Err(RelayError::PasswordIncorrect("secret".to_owned()))
    );
    assert!(
        signaling.deliveries().await.is_empty(),
        "Rejected join must not broadcast"
    );
    assert!(!relay.registry().user(&u2).unwrap().is_in("secret"));

    let snapshot = relay
        .join_room(&u2, "secret", Some("pw1"))
        .await
        .expect("Join with the right password failed");
    assert_eq!(member_set(&snapshot), names(&["u1", "u2"]));

    let seen_by_u1 = signaling.last_room_for(c1).await.unwrap();
    assert_eq!(seen_by_u1, snapshot);
    assert_registry_consistent(&relay);
}

#[tokio::test]
async fn test_password_required_policy() {
    init_tracing();

    let config = RelayConfig {
        require_password: true,
        ..RelayConfig::default()
    };
    let (relay, _signaling) = create_test_relay(config);
    let (u1, _c1) = connect_user(&relay, "u1").await;

    assert_eq!(
        relay.join_room(&u1, "lobby", None).await,
        Err(RelayError::PasswordRequired("lobby".to_owned()))
    );
    assert_eq!(
        relay.join_room(&u1, "lobby", Some("")).await,
        Err(RelayError::PasswordRequired("lobby".to_owned()))
    );
    assert_eq!(relay.registry().room_count(), 0);

    relay
        .join_room(&u1, "lobby", Some("pw"))
        .await
        .expect("Join with a password failed");
}

#[tokio::test]
async fn test_join_requires_connected_user() {
    init_tracing();

    let (relay, _signaling) = create_test_relay(RelayConfig::default());
    let ghost = tether_core::UserId::from("ghost");

    assert_eq!(
        relay.join_room(&ghost, "lobby", None).await,
        Err(RelayError::UserNotFound(ghost.clone()))
    );
    assert_eq!(relay.registry().room_count(), 0);
}

#[tokio::test]
async fn test_set_room_password() {
    init_tracing();

    let (relay, signaling) = create_test_relay(RelayConfig::default());
    let (u1, _c1) = connect_user(&relay, "u1").await;
    let (u2, _c2) = connect_user(&relay, "u2").await;

    relay
        .join_room(&u1, "open", None)
        .await
        .expect("Join failed");
    signaling.clear().await;

    assert_eq!(
        relay.set_room_password("open", "").await,
        Err(RelayError::PasswordRequired("open".to_owned()))
    );
    assert_eq!(
        relay.set_room_password("missing", "pw").await,
        Err(RelayError::RoomNotFound("missing".to_owned()))
    );

    relay
        .set_room_password("open", "pw")
        .await
        .expect("Setting the password failed");
    assert!(
        signaling.deliveries().await.is_empty(),
        "Password change must not broadcast"
    );
    assert!(relay.registry().user(&u1).unwrap().is_in("open"));

    assert_eq!(
        relay.join_room(&u2, "open", None).await,
        Err(RelayError::PasswordIncorrect("open".to_owned()))
    );
    relay
        .join_room(&u2, "open", Some("pw"))
        .await
        .expect("Join with the new password failed");
}
