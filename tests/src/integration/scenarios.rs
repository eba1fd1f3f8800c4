//! # Dispatch Scenarios
//!
//! End-to-end behaviour of subscribe, trigger and unsubscribe against the
//! in-memory store:
//!
//! 1. Argument-keyed fan-out (`payload(id)`)
//! 2. Default elision and key spelling (`notification(userId, type = ONE)`)
//! 3. Scoped audiences (`inbox` scoped by viewer)
//! 4. Handled errors vs. unrecoverable faults

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_dispatch::{
        Dispatcher, DispatcherConfig, FaultPolicy, InMemorySubscriptionStore, SubscribeError,
        SubscribeRequest, SubscriptionApi, SubscriptionStore, TriggerError, TriggerRequest,
    };
    use serde_json::json;
    use shared_types::{ChannelId, QueryDocument};

    use crate::integration::support::{query, registry, PayloadExecutor, RecordingSink};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type TestDispatcher = Dispatcher<InMemorySubscriptionStore, PayloadExecutor, RecordingSink>;

    fn dispatcher() -> TestDispatcher {
        dispatcher_with(DispatcherConfig::default())
    }

    fn dispatcher_with(config: DispatcherConfig) -> TestDispatcher {
        match Dispatcher::with_config(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            Arc::new(RecordingSink::new()),
            config,
        ) {
            Ok(dispatcher) => dispatcher,
            Err(e) => panic!("invalid config: {e}"),
        }
    }

    async fn subscribe_payload(d: &TestDispatcher, sink_channel: &str, id: &str) {
        d.subscribe_event(
            "payload",
            json!({"id": id}),
            ChannelId::new(sink_channel),
            query("subscription { payload(id: $id) { value } }"),
            json!({}),
        )
        .await
        .expect("subscribe should succeed");
    }

    // =============================================================================
    // ARGUMENT-KEYED FAN-OUT
    // =============================================================================

    /// Two channels on different ids; only matching triggers reach each.
    #[tokio::test]
    async fn test_payload_fan_out_by_argument() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        subscribe_payload(&d, "1", "100").await;
        subscribe_payload(&d, "2", "200").await;

        for (id, value) in [("100", 1), ("200", 2), ("100", 3), ("300", 4)] {
            d.trigger_event("payload", json!({"id": id}), json!({"value": value}), None)
                .await
                .expect("trigger should succeed");
        }

        assert_eq!(sink.count("1"), 2);
        assert_eq!(sink.count("2"), 1);
        assert_eq!(sink.total(), 3);

        let first = &sink.for_channel("1")[0];
        assert_eq!(first.data, Some(json!({"payload": {"value": 1}})));
        let second = &sink.for_channel("1")[1];
        assert_eq!(second.data, Some(json!({"payload": {"value": 3}})));
    }

    /// A trigger with no indexed channels executes and delivers nothing.
    #[tokio::test]
    async fn test_trigger_without_subscribers() {
        let executor = Arc::new(PayloadExecutor::new());
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            executor.clone(),
            sink.clone(),
        );

        let report = d
            .trigger_event("payload", json!({"id": "300"}), json!({}), None)
            .await
            .expect("no-op trigger should succeed");

        assert_eq!(report.matched, 0);
        assert_eq!(executor.executions(), 0);
        assert_eq!(sink.total(), 0);
    }

    /// Numeric and string ids coerce to the same canonical ID.
    #[tokio::test]
    async fn test_loose_id_representation_matches() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        subscribe_payload(&d, "1", "100").await;

        d.trigger_event("payload", json!({"id": 100}), json!({}), None)
            .await
            .unwrap();

        assert_eq!(sink.count("1"), 1);
    }

    // =============================================================================
    // DEFAULTS AND KEY SPELLING
    // =============================================================================

    /// Omitting a defaulted argument equals supplying its default explicitly.
    #[tokio::test]
    async fn test_default_elision_produces_same_topic() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        d.subscribe_event(
            "notification",
            json!({"userId": "3"}),
            ChannelId::new("n"),
            query("subscription { notification(userId: \"3\") { body } }"),
            json!({}),
        )
        .await
        .unwrap();

        d.trigger_event(
            "notification",
            json!({"userId": "3", "type": "ONE"}),
            json!({"body": "hi"}),
            None,
        )
        .await
        .unwrap();
        assert_eq!(sink.count("n"), 1);

        d.trigger_event(
            "notification",
            json!({"userId": "3", "type": "TWO"}),
            json!({"body": "other"}),
            None,
        )
        .await
        .unwrap();
        assert_eq!(sink.count("n"), 1);
    }

    /// Key order and snake_case spelling do not change the topic.
    #[tokio::test]
    async fn test_key_order_and_spelling_produce_same_topic() {
        let d = dispatcher();
        let a = d
            .topic_for("notification", &json!({"type": "TWO", "userId": 3}), None)
            .unwrap();
        let b = d
            .topic_for("notification", &json!({"user_id": "3", "type": "TWO"}), None)
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_trigger_rejects_unknown_argument() {
        let d = dispatcher();
        let result = d
            .trigger_event("payload", json!({"id": "1", "extra": true}), json!({}), None)
            .await;
        assert!(matches!(result, Err(TriggerError::Arguments(_))));
    }

    // =============================================================================
    // SCOPED AUDIENCES
    // =============================================================================

    /// Scoped subscribers only see triggers with their scope; unscoped
    /// subscribers see every trigger of their event.
    #[tokio::test]
    async fn test_scoped_subscriptions_do_not_cross_deliver() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );

        for (channel, viewer) in [("alice", "S1"), ("bob", "S2")] {
            d.subscribe_event(
                "inbox",
                json!({}),
                ChannelId::new(channel),
                query("subscription { inbox { message } }"),
                json!({"viewer": {"id": viewer}}),
            )
            .await
            .unwrap();
        }
        d.subscribe_event(
            "broadcast",
            json!({}),
            ChannelId::new("everyone"),
            query("subscription { broadcast { message } }"),
            json!({}),
        )
        .await
        .unwrap();

        let s1 = json!("S1");
        d.trigger_event("inbox", json!({}), json!({"message": "a"}), Some(s1.clone()))
            .await
            .unwrap();
        d.trigger_event("inbox", json!({}), json!({"message": "b"}), Some(json!("S2")))
            .await
            .unwrap();
        d.trigger_event("inbox", json!({}), json!({"message": "c"}), None)
            .await
            .unwrap();
        d.trigger_event("broadcast", json!({}), json!({"message": "d"}), Some(s1))
            .await
            .unwrap();
        d.trigger_event("broadcast", json!({}), json!({"message": "e"}), None)
            .await
            .unwrap();

        let alice = sink.for_channel("alice");
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].data, Some(json!({"inbox": {"message": "a"}})));

        let bob = sink.for_channel("bob");
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].data, Some(json!({"inbox": {"message": "b"}})));

        assert_eq!(sink.count("everyone"), 2);
    }

    /// A numeric viewer id in the context matches its string form on trigger.
    #[tokio::test]
    async fn test_integer_scope_matches_string_trigger() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        let record = d
            .subscribe_event(
                "inbox",
                json!({}),
                ChannelId::new("carol"),
                query("subscription { inbox { message } }"),
                json!({"viewer": {"id": 3}}),
            )
            .await
            .unwrap();
        assert_eq!(record.events[0].scope, Some(json!("3")));

        let by_string = d
            .trigger_event("inbox", json!({}), json!({"message": "a"}), Some(json!("3")))
            .await
            .unwrap();
        let by_number = d
            .trigger_event("inbox", json!({}), json!({"message": "b"}), Some(json!(3)))
            .await
            .unwrap();

        assert_eq!(by_string.delivered, 1);
        assert_eq!(by_number.delivered, 1);
        assert_eq!(sink.count("carol"), 2);
    }

    #[tokio::test]
    async fn test_scoped_subscribe_without_scope_is_rejected() {
        let d = dispatcher();
        let result = d
            .subscribe_event(
                "inbox",
                json!({}),
                ChannelId::new("anon"),
                query("subscription { inbox { message } }"),
                json!({"viewer": null}),
            )
            .await;

        assert!(matches!(result, Err(SubscribeError::MissingScope { .. })));
        assert_eq!(d.store().len().await.unwrap(), 0);
    }

    // =============================================================================
    // ERRORS AND FAULTS
    // =============================================================================

    /// Handled errors are delivered in the result; the trigger succeeds.
    #[tokio::test]
    async fn test_handled_error_is_delivered() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        subscribe_payload(&d, "1", "100").await;

        let report = d
            .trigger_event("payload", json!({"id": "100"}), json!({"error": "denied"}), None)
            .await
            .expect("handled errors do not fail the trigger");

        assert_eq!(report.delivered, 1);
        let delivered = sink.for_channel("1");
        assert_eq!(delivered[0].data, None);
        assert_eq!(delivered[0].errors.len(), 1);
        assert_eq!(delivered[0].errors[0].message, "denied");

        let wire = serde_json::to_value(&delivered[0]).unwrap();
        assert_eq!(
            wire,
            json!({"data": null, "errors": [{"message": "denied", "path": ["payload"]}]})
        );
    }

    /// An unrecoverable fault propagates to the caller; nothing is delivered.
    #[tokio::test]
    async fn test_fault_propagates_to_caller() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        subscribe_payload(&d, "1", "100").await;

        let result = d
            .trigger_event("payload", json!({"id": "100"}), json!({"fault": "boom"}), None)
            .await;

        match result {
            Err(TriggerError::Fault { channel, fault }) => {
                assert_eq!(channel.as_str(), "1");
                assert_eq!(fault.message, "boom");
            }
            other => panic!("expected a fault, got {other:?}"),
        }
        assert_eq!(sink.total(), 0);
    }

    /// Isolating faults still reports them but lets the trigger succeed.
    #[tokio::test]
    async fn test_isolated_fault_is_reported() {
        let config = DispatcherConfig::default().with_fault_policy(FaultPolicy::IsolateAndContinue);
        let d = dispatcher_with(config);
        subscribe_payload(&d, "1", "100").await;
        subscribe_payload(&d, "2", "100").await;

        let report = d
            .trigger(TriggerRequest::new(
                "payload",
                json!({"id": "100"}),
                json!({"fault": "boom"}),
            ))
            .await
            .expect("isolated faults do not fail the trigger");

        assert_eq!(report.matched, 2);
        assert_eq!(report.faults.len(), 2);
        assert_eq!(report.delivered, 0);
    }

    /// A structurally invalid stored query leaves nothing registered.
    #[tokio::test]
    async fn test_invalid_query_leaves_no_registration() {
        let d = dispatcher();
        let request = SubscribeRequest::new(
            "1",
            QueryDocument::new("subscription { payload(id: $id) { value } }")
                .with_variable("id", json!(true)),
        )
        .event("payload", json!({"id": "100"}));

        let result = d.subscribe(request).await;

        assert!(matches!(result, Err(SubscribeError::InvalidQuery(_))));
        assert_eq!(d.store().len().await.unwrap(), 0);
        let topic = d.topic_for("payload", &json!({"id": "100"}), None).unwrap();
        assert!(d.store().channels_for(&topic).await.unwrap().is_empty());
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    /// Deleting a channel scrubs it from every topic it listened on.
    #[tokio::test]
    async fn test_unsubscribe_scrubs_all_topics() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        let request = SubscribeRequest::new("multi", query("subscription { payload broadcast }"))
            .event("payload", json!({"id": "1"}))
            .event("broadcast", json!(null));
        let record = d.subscribe(request).await.unwrap();
        assert_eq!(record.topics().len(), 2);

        d.unsubscribe(&ChannelId::new("multi")).await;

        d.trigger_event("payload", json!({"id": "1"}), json!({}), None)
            .await
            .unwrap();
        d.trigger_event("broadcast", json!({}), json!({}), None)
            .await
            .unwrap();

        assert_eq!(sink.total(), 0);
        for topic in record.topics() {
            assert!(d.store().channels_for(&topic).await.unwrap().is_empty());
        }
    }

    /// Re-subscribing under the same channel replaces the earlier registration.
    #[tokio::test]
    async fn test_resubscribe_replaces_registration() {
        let sink = Arc::new(RecordingSink::new());
        let d = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            sink.clone(),
        );
        subscribe_payload(&d, "1", "100").await;
        subscribe_payload(&d, "1", "200").await;

        d.trigger_event("payload", json!({"id": "100"}), json!({}), None)
            .await
            .unwrap();
        d.trigger_event("payload", json!({"id": "200"}), json!({}), None)
            .await
            .unwrap();

        assert_eq!(sink.count("1"), 1);
        assert_eq!(d.store().len().await.unwrap(), 1);
    }
}
