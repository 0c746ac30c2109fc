//! End-to-end tests for the message routing flows over mock providers.

use chat_relay::{
    config::{IdempotencyConfig, PresenceConfig, PushConfig, RateLimitConfig},
    mocks::{
        MockIdempotencyStore, MockLiveTransport, MockMessageStore, MockPresenceStore,
        MockPushGateway, MockPushSubscriptionStore, MockRateLimitStore,
    },
    IdempotencyGuard, MessageRouter, MessageStatus, PresenceTracker, PushDispatcher, RateLimiter,
    SendMessageRequest, SendOutcome, SessionId, Topic, UserId,
};
use std::time::Duration;

type TestRouter = MessageRouter<
    MockMessageStore,
    MockPresenceStore,
    MockIdempotencyStore,
    MockPushSubscriptionStore,
    MockLiveTransport,
    MockPushGateway,
>;

struct TestApp {
    router: TestRouter,
    messages: MockMessageStore,
    transport: MockLiveTransport,
    gateway: MockPushGateway,
}

/// Assemble a full router over mock providers, the way the application's
/// composition root would over the Redis stores.
fn create_test_app() -> TestApp {
    let messages = MockMessageStore::new();
    let presence_store = MockPresenceStore::new();
    let transport = MockLiveTransport::new();
    let gateway = MockPushGateway::new();

    let router = MessageRouter::new(
        messages.clone(),
        PresenceTracker::new(
            presence_store.clone(),
            transport.clone(),
            PresenceConfig::default(),
        ),
        IdempotencyGuard::new(MockIdempotencyStore::new(), IdempotencyConfig::default()),
        PushDispatcher::new(
            MockPushSubscriptionStore::new(),
            gateway.clone(),
            presence_store,
            PushConfig::default(),
        ),
        transport.clone(),
    );

    TestApp {
        router,
        messages,
        transport,
        gateway,
    }
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_offline_recipient_gets_push_on_every_channel() {
    let app = create_test_app();
    let (sender, receiver) = (UserId::new(), UserId::new());
    let conversation = app.messages.create_conversation(&[sender, receiver]);

    // Receiver registered push on two devices, currently offline.
    app.router
        .push()
        .register_push_token(receiver, "tok-mobile", "mobile")
        .await
        .unwrap();
    app.router
        .push()
        .register_push_token(receiver, "tok-web", "web")
        .await
        .unwrap();

    let outcome = app
        .router
        .send_message(
            sender,
            receiver,
            SendMessageRequest {
                conversation_id: conversation,
                content: "are you there?".to_string(),
                idempotency_key: None,
            },
        )
        .await
        .unwrap();

    let SendOutcome::Sent(message) = outcome else {
        panic!("expected Sent outcome");
    };

    // Offline recipient: message stays Sent, nothing on the live transport,
    // one push per registered channel.
    assert_eq!(message.status, MessageStatus::Sent);
    assert_eq!(app.transport.sent_count(receiver, Topic::Message), 0);
    assert_eq!(app.gateway.dispatch_count(), 2);
    assert!(app.gateway.dispatched_to("mobile", "tok-mobile"));
    assert!(app.gateway.dispatched_to("web", "tok-web"));

    let payloads = app.gateway.payloads();
    assert_eq!(payloads[0].conversation_id, conversation);
    assert_eq!(payloads[0].message_id, message.id);
    assert_eq!(payloads[0].sender_id, sender);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_retried_send_with_same_key_is_a_no_op() {
    let app = create_test_app();
    let (sender, receiver) = (UserId::new(), UserId::new());
    let conversation = app.messages.create_conversation(&[sender, receiver]);

    app.router
        .push()
        .register_push_token(receiver, "tok", "mobile")
        .await
        .unwrap();

    let request = SendMessageRequest {
        conversation_id: conversation,
        content: "exactly once".to_string(),
        idempotency_key: Some("client-key-42".to_string()),
    };

    let first = app
        .router
        .send_message(sender, receiver, request.clone())
        .await
        .unwrap();
    assert!(matches!(first, SendOutcome::Sent(_)));

    // Client retry after a timeout: same key, no new message, no new push.
    let second = app
        .router
        .send_message(sender, receiver, request)
        .await
        .unwrap();
    assert_eq!(second, SendOutcome::Duplicate);

    assert_eq!(app.messages.message_count(), 1);
    assert_eq!(app.gateway.dispatch_count(), 1);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_presence_broadcasts_only_on_session_edges() {
    let app = create_test_app();
    let user = UserId::new();
    let (laptop, phone) = (SessionId::new(), SessionId::new());
    let presence = app.router.presence();

    // First session: offline → online edge.
    assert!(presence.set_online(user, laptop, "Alice").await.unwrap());
    assert_eq!(app.transport.broadcast_count(Topic::Presence), 1);

    // Second session: already online, no broadcast.
    assert!(!presence.set_online(user, phone, "Alice").await.unwrap());
    assert_eq!(app.transport.broadcast_count(Topic::Presence), 1);

    // Closing one of two sessions: still online, no broadcast.
    assert!(!presence.set_offline(user, laptop).await.unwrap());
    assert!(presence.is_online(user).await.unwrap());
    assert_eq!(app.transport.broadcast_count(Topic::Presence), 1);

    // Last session gone: online → offline edge.
    assert!(presence.set_offline(user, phone).await.unwrap());
    assert!(!presence.is_online(user).await.unwrap());
    assert_eq!(app.transport.broadcast_count(Topic::Presence), 2);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_category_multiplier_scales_the_limit() {
    // Base 10/sec with a 1.5× multiplier for messages → 15 per window.
    let limiter = RateLimiter::new(
        MockRateLimitStore::new(),
        RateLimitConfig::new()
            .with_base_rate(10)
            .with_window(Duration::from_secs(1))
            .with_category_multiplier("message", 1.5),
    );
    let user = UserId::new();

    assert_eq!(limiter.limit_for("message"), 15);

    for _ in 0..15 {
        assert!(limiter.is_allowed(user, "message").await);
    }
    assert!(!limiter.is_allowed(user, "message").await);
    assert_eq!(limiter.remaining_quota(user, "message").await, 0);

    // The unscaled category still has its own window.
    assert!(limiter.is_allowed(user, "typing").await);
}

#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn test_bulk_read_sends_one_receipt_to_online_sender() {
    let app = create_test_app();
    let (sender, reader) = (UserId::new(), UserId::new());
    let conversation = app.messages.create_conversation(&[sender, reader]);

    app.router
        .presence()
        .set_online(sender, SessionId::new(), "Alice")
        .await
        .unwrap();

    for i in 0..5 {
        app.router
            .send_message(
                sender,
                reader,
                SendMessageRequest {
                    conversation_id: conversation,
                    content: format!("message {i}"),
                    idempotency_key: None,
                },
            )
            .await
            .unwrap();
    }

    let count = app.router.mark_as_read(conversation, reader).await.unwrap();
    assert_eq!(count, 5);
    assert_eq!(app.transport.sent_count(sender, Topic::ReadReceipt), 1);

    // Nothing left unread: no count, no receipt.
    let count = app.router.mark_as_read(conversation, reader).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(app.transport.sent_count(sender, Topic::ReadReceipt), 1);
}
