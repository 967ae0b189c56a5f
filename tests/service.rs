mod common;

use std::sync::Arc;

use chatweave::config::ServiceConfig;
use chatweave::message::Role;
use chatweave::model::mock::{MockConnector, MockModelClient};
use chatweave::prompt::TemplateFormatter;
use chatweave::service::{ConversationService, ServiceError};

use common::degraded_config;

fn formatter() -> Arc<TemplateFormatter> {
    Arc::new(TemplateFormatter::default())
}

#[tokio::test]
async fn connect_yields_a_ready_service() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("Hello!")),
        formatter(),
    )
    .await
    .unwrap();

    assert!(service.is_initialized().await);
    let reply = service.converse("t1", "Hi", None).await.unwrap();
    assert!(reply.has_role(Role::Assistant));
    assert_eq!(reply.content, "Hello!");
}

#[tokio::test]
async fn converse_before_initialize_is_rejected() {
    let service = ConversationService::new(
        degraded_config(),
        Arc::new(MockConnector::with_reply("unused")),
        formatter(),
    );

    let err = service.converse("t1", "Hi", None).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotInitialized));
}

#[tokio::test]
async fn concurrent_initialization_connects_the_model_once() {
    let connector = Arc::new(MockConnector::with_reply("ok"));
    let service = Arc::new(ConversationService::new(
        degraded_config(),
        connector.clone(),
        formatter(),
    ));

    let racers = (0..16).map(|_| {
        let svc = service.clone();
        tokio::spawn(async move { svc.initialize().await })
    });
    for result in futures_util::future::join_all(racers).await {
        result.unwrap().unwrap();
    }

    assert_eq!(connector.connect_count(), 1);
    assert!(service.is_initialized().await);
}

#[tokio::test]
async fn repeated_initialize_is_a_no_op() {
    let connector = Arc::new(MockConnector::with_reply("ok"));
    let service =
        ConversationService::new(degraded_config(), connector.clone(), formatter());

    service.initialize().await.unwrap();
    service.initialize().await.unwrap();
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn failed_handshake_leaves_the_service_retryable() {
    let connector = Arc::new(MockConnector::with_reply("ok").fail_first(1));
    let service =
        ConversationService::new(degraded_config(), connector.clone(), formatter());

    let err = service.initialize().await.unwrap_err();
    assert!(matches!(err, ServiceError::Initialization { .. }));
    assert!(!service.is_initialized().await);

    // Nothing is cached from the failed attempt; the retry runs the full
    // sequence again.
    service.initialize().await.unwrap();
    assert_eq!(connector.connect_count(), 2);
    assert!(service.converse("t1", "Hi", None).await.is_ok());
}

#[tokio::test]
async fn unreachable_database_degrades_to_in_memory() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();

    assert!(!service.is_durable().await.unwrap());
    service.converse("t1", "Hi", None).await.unwrap();
    assert!(service.history("t1").await.unwrap().is_some());

    // A fresh service on the same unreachable URL sees none of it.
    let restarted = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();
    assert!(restarted.history("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn history_accumulates_in_turn_order() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::scripted(vec![
            "Hi".to_string(),
            "Doing well, thanks!".to_string(),
        ])),
        formatter(),
    )
    .await
    .unwrap();

    service.converse("t1", "Hello", None).await.unwrap();
    service.converse("t1", "How are you?", None).await.unwrap();

    let state = service.history("t1").await.unwrap().unwrap();
    let transcript: Vec<(Role, &str)> = state
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Role::User, "Hello"),
            (Role::Assistant, "Hi"),
            (Role::User, "How are you?"),
            (Role::Assistant, "Doing well, thanks!"),
        ]
    );
}

#[tokio::test]
async fn threads_are_isolated() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();

    service.converse("alpha", "from alpha", None).await.unwrap();
    service.converse("beta", "from beta", None).await.unwrap();

    let alpha = service.history("alpha").await.unwrap().unwrap();
    assert_eq!(alpha.messages.len(), 2);
    assert_eq!(alpha.messages[0].content, "from alpha");

    let beta = service.history("beta").await.unwrap().unwrap();
    assert_eq!(beta.messages[0].content, "from beta");
}

#[tokio::test]
async fn failed_invocation_persists_nothing() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::new(Arc::new(MockModelClient::failing()))),
        formatter(),
    )
    .await
    .unwrap();

    let err = service.converse("t1", "Hi", None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Upstream { .. }));
    assert!(service.history("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn user_context_reflects_the_latest_turn() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();

    service
        .converse("t1", "Hi", Some("Name: Ada"))
        .await
        .unwrap();
    let state = service.history("t1").await.unwrap().unwrap();
    assert_eq!(state.user_context.as_deref(), Some("Name: Ada"));

    // A turn without context clears the stored value instead of keeping a
    // stale one.
    service.converse("t1", "Hi again", None).await.unwrap();
    let state = service.history("t1").await.unwrap().unwrap();
    assert_eq!(state.user_context, None);
}

#[tokio::test]
async fn close_pool_is_idempotent() {
    let service = ConversationService::connect(
        degraded_config(),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();

    service.close_pool().await;
    service.close_pool().await;
}

#[tokio::test]
async fn configuration_is_first_writer_wins() {
    let service = ConversationService::connect(
        ServiceConfig::default()
            .with_model("custom-model", "mock")
            .with_database_url(common::BAD_DB_URL),
        Arc::new(MockConnector::with_reply("ok")),
        formatter(),
    )
    .await
    .unwrap();

    // Later initialize calls never re-read configuration or rebuild the
    // runtime; they return against the already-published one.
    service.initialize().await.unwrap();
    assert!(service.converse("t1", "Hi", None).await.is_ok());
}
