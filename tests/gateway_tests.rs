//! Gateway integration tests.
//!
//! Drives the hub end to end over real channels, with in-memory
//! collaborators standing in for the auth service, the chat participant
//! table, and the message store.

mod support;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use social_gateway::gateway::{ClientCommand, ServerEvent};
use social_gateway::shared::GatewayError;

use support::{build_hub, connect, join, send};

fn received_contents(events: &[ServerEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::ReceiveMessage { message } => Some(message.content.clone()),
            _ => None,
        })
        .collect()
}

fn offline_events(events: &[ServerEvent], user_id: i64) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, ServerEvent::UserOffline { user_id: u } if *u == user_id))
        .count()
}

#[tokio::test]
async fn user_is_online_iff_any_connection_remains() {
    let hub = build_hub(&[]);

    let a1 = connect(&hub, "alice").await;
    assert!(hub.is_online(1));

    let a2 = connect(&hub, "alice").await;
    let mut observer = connect(&hub, "bob").await;
    observer.drain();

    hub.disconnect(&a1.id);
    assert!(hub.is_online(1));
    assert_eq!(offline_events(&observer.drain(), 1), 0);

    hub.disconnect(&a2.id);
    assert!(!hub.is_online(1));
    // Exactly one offline edge for closing the last of n connections.
    assert_eq!(offline_events(&observer.drain(), 1), 1);
}

#[tokio::test]
async fn online_edge_fires_once_per_user() {
    let hub = build_hub(&[]);
    let mut observer = connect(&hub, "bob").await;
    observer.drain();

    let _a1 = connect(&hub, "alice").await;
    let _a2 = connect(&hub, "alice").await;

    let online = observer
        .drain()
        .iter()
        .filter(|e| matches!(e, ServerEvent::UserOnline { user_id: 1 }))
        .count();
    assert_eq!(online, 1);
}

#[tokio::test]
async fn refused_handshake_emits_nothing_to_peers() {
    let hub = build_hub(&[]);
    let mut observer = connect(&hub, "bob").await;
    observer.drain();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = hub.connect("stolen-token", tx).await;

    assert!(matches!(result, Err(GatewayError::Auth(_))));
    assert!(rx.try_recv().is_err());
    assert!(observer.drain().is_empty());
    assert_eq!(hub.connection_count(), 1);
}

#[tokio::test]
async fn denied_join_mutates_nothing_and_errors_caller_only() {
    let hub = build_hub(&[(2, 10)]);

    let mut bob = connect(&hub, "bob").await;
    join(&hub, &bob, 10).await;
    bob.drain();

    let mut alice = connect(&hub, "alice").await;
    alice.drain();
    join(&hub, &alice, 10).await;

    let alice_events = alice.drain();
    assert!(alice_events
        .iter()
        .any(|e| matches!(e, ServerEvent::Error { .. })));
    assert!(!alice_events
        .iter()
        .any(|e| matches!(e, ServerEvent::JoinedRoom { .. })));

    // Bob saw alice come online but nothing about the failed join.
    assert!(bob
        .drain()
        .iter()
        .all(|e| matches!(e, ServerEvent::UserOnline { .. })));
    assert_eq!(hub.room_members(10).len(), 1);
}

#[tokio::test]
async fn join_and_leave_acknowledge_caller_only() {
    let hub = build_hub(&[(1, 10), (2, 10)]);

    let mut bob = connect(&hub, "bob").await;
    join(&hub, &bob, 10).await;
    bob.drain();

    let mut alice = connect(&hub, "alice").await;
    alice.drain();
    join(&hub, &alice, 10).await;
    assert_eq!(alice.drain(), vec![ServerEvent::JoinedRoom { room_id: 10 }]);

    hub.handle_command(&alice.id, ClientCommand::LeaveRoom { room_id: 10 })
        .await;
    assert_eq!(alice.drain(), vec![ServerEvent::LeftRoom { room_id: 10 }]);

    // Leaving again is a no-op, not an error.
    hub.handle_command(&alice.id, ClientCommand::LeaveRoom { room_id: 10 })
        .await;
    assert_eq!(alice.drain(), vec![ServerEvent::LeftRoom { room_id: 10 }]);

    // The room never observed alice's membership changes.
    let bob_events = bob.drain();
    assert!(bob_events
        .iter()
        .all(|e| matches!(e, ServerEvent::UserOnline { .. })));
}

#[tokio::test]
async fn typing_signals_exclude_the_originator_and_keep_order() {
    let hub = build_hub(&[(1, 10), (2, 10)]);

    let alice = connect(&hub, "alice").await;
    let mut bob = connect(&hub, "bob").await;
    join(&hub, &alice, 10).await;
    join(&hub, &bob, 10).await;
    bob.drain();

    hub.handle_command(&alice.id, ClientCommand::TypingStart { room_id: 10 })
        .await;
    hub.handle_command(&alice.id, ClientCommand::TypingStop { room_id: 10 })
        .await;
    hub.handle_command(&alice.id, ClientCommand::TypingStart { room_id: 10 })
        .await;

    let typing: Vec<bool> = bob
        .drain()
        .iter()
        .filter_map(|e| match e {
            ServerEvent::UserTyping {
                room_id: 10,
                user_id: 1,
                is_typing,
            } => Some(*is_typing),
            _ => None,
        })
        .collect();
    assert_eq!(typing, vec![true, false, true]);
    assert_eq!(hub.typing_users(10), vec![1]);

    // The originator never hears its own typing signals.
    let mut alice = alice;
    assert!(!alice
        .drain()
        .iter()
        .any(|e| matches!(e, ServerEvent::UserTyping { .. })));
}

#[tokio::test]
async fn dispatch_reaches_members_at_dispatch_time_only() {
    let hub = build_hub(&[(1, 10), (2, 10), (3, 10)]);

    let alice = connect(&hub, "alice").await;
    let mut bob = connect(&hub, "bob").await;
    let mut carol = connect(&hub, "carol").await;
    join(&hub, &alice, 10).await;
    join(&hub, &bob, 10).await;
    bob.drain();
    carol.drain();

    send(&hub, &alice, 10, "first").await;

    // Carol joins after dispatch; no retroactive delivery.
    join(&hub, &carol, 10).await;
    send(&hub, &alice, 10, "second").await;

    assert_eq!(received_contents(&bob.drain()), vec!["first", "second"]);
    assert_eq!(received_contents(&carol.drain()), vec!["second"]);
}

#[tokio::test]
async fn per_room_order_matches_persistence_order() {
    let hub = build_hub(&[(1, 10), (2, 10)]);

    let alice = connect(&hub, "alice").await;
    let mut bob = connect(&hub, "bob").await;
    join(&hub, &alice, 10).await;
    join(&hub, &bob, 10).await;
    bob.drain();

    for i in 0..5 {
        send(&hub, &alice, 10, &format!("m{}", i)).await;
    }

    let ids: Vec<i64> = bob
        .drain()
        .iter()
        .filter_map(|e| match e {
            ServerEvent::ReceiveMessage { message } => Some(message.id),
            _ => None,
        })
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn disconnect_purges_every_joined_room() {
    let hub = build_hub(&[(1, 10), (1, 20), (2, 10), (2, 20)]);

    let alice = connect(&hub, "alice").await;
    let mut bob = connect(&hub, "bob").await;
    join(&hub, &alice, 10).await;
    join(&hub, &alice, 20).await;
    join(&hub, &bob, 10).await;
    join(&hub, &bob, 20).await;

    let mut alice = alice;
    hub.disconnect(&alice.id);

    assert_eq!(hub.room_members(10).len(), 1);
    assert_eq!(hub.room_members(20).len(), 1);

    send(&hub, &bob, 10, "after you left").await;
    assert!(received_contents(&alice.drain()).is_empty());

    // Duplicate disconnect notifications are absorbed.
    hub.disconnect(&alice.id);
    assert_eq!(hub.connection_count(), 1);
}

#[tokio::test]
async fn typing_state_resets_when_room_empties() {
    let hub = build_hub(&[(1, 10)]);

    let alice = connect(&hub, "alice").await;
    join(&hub, &alice, 10).await;
    hub.handle_command(&alice.id, ClientCommand::TypingStart { room_id: 10 })
        .await;
    assert_eq!(hub.typing_users(10), vec![1]);

    hub.disconnect(&alice.id);
    assert!(hub.typing_users(10).is_empty());
}

#[tokio::test]
async fn two_device_room_scenario() {
    // User A (connections a1, a2) and user B (connection b1) share room R.
    let hub = build_hub(&[(1, 40), (2, 40)]);

    let a1 = connect(&hub, "alice").await;
    let a2 = connect(&hub, "alice").await;
    let mut b1 = connect(&hub, "bob").await;
    join(&hub, &a1, 40).await;
    join(&hub, &a2, 40).await;
    join(&hub, &b1, 40).await;
    b1.drain();

    send(&hub, &a1, 40, "hi").await;

    let b_events = b1.drain();
    let received: Vec<_> = b_events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::ReceiveMessage { message } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender_id, 1);
    assert_eq!(received[0].content, "hi");

    // Both of A's devices get the normal dispatch and nothing else back
    // from the send path.
    let mut a1 = a1;
    let mut a2 = a2;
    assert_eq!(received_contents(&a1.drain()), vec!["hi"]);
    assert_eq!(received_contents(&a2.drain()), vec!["hi"]);

    hub.disconnect(&a1.id);
    assert_eq!(offline_events(&b1.drain(), 1), 0);

    hub.disconnect(&a2.id);
    assert_eq!(offline_events(&b1.drain(), 1), 1);
}

#[tokio::test]
async fn errors_never_leak_into_other_streams() {
    let hub = build_hub(&[(2, 10)]);

    let mut bob = connect(&hub, "bob").await;
    join(&hub, &bob, 10).await;
    bob.drain();

    let mut alice = connect(&hub, "alice").await;
    alice.drain();

    // Denied join and a send into a room alice never joined both fail.
    join(&hub, &alice, 10).await;
    hub.handle_command(
        &alice.id,
        ClientCommand::TypingStart { room_id: 10 },
    )
    .await;

    assert!(bob
        .drain()
        .iter()
        .all(|e| !matches!(e, ServerEvent::Error { .. })));
}
