//! # Bus Delivery Flows
//!
//! Dispatcher results travelling over the shared delivery bus:
//!
//! 1. **Dispatcher → BusDeliverySink → InMemoryDeliveryBus**: results are
//!    published as `Delivery` envelopes.
//! 2. **Bus → ChannelSubscription**: each connection handle receives only the
//!    deliveries addressed to its channel, in publish order.
//! 3. **Completion**: a final result is delivered before the channel is
//!    unsubscribed.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::StreamExt;
    use relay_dispatch::{
        BusDeliverySink, Dispatcher, ExecutionRequest, InMemorySubscriptionStore, QueryExecutor,
        SubscriptionStore, SubscriptionUpdate,
    };
    use relay_telemetry::{init_telemetry, TelemetryConfig};
    use serde_json::{json, Value};
    use shared_bus::{ChannelFilter, DeliveryPublisher, InMemoryDeliveryBus};
    use shared_types::{ChannelId, ExecutionFault, ExecutionResult};
    use tokio::time::timeout;

    use crate::integration::support::{query, registry, PayloadExecutor};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn bus_dispatcher() -> (
        Dispatcher<InMemorySubscriptionStore, PayloadExecutor, BusDeliverySink>,
        Arc<InMemoryDeliveryBus>,
    ) {
        let bus = Arc::new(InMemoryDeliveryBus::new());
        let dispatcher = Dispatcher::new(
            registry(),
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(PayloadExecutor::new()),
            Arc::new(BusDeliverySink::new(bus.clone())),
        );
        (dispatcher, bus)
    }

    /// Completes the subscription once the payload carries `"last": true`.
    struct CountdownExecutor;

    #[async_trait]
    impl QueryExecutor for CountdownExecutor {
        async fn execute(
            &self,
            request: ExecutionRequest<'_>,
        ) -> Result<SubscriptionUpdate, ExecutionFault> {
            let result = ExecutionResult::data(request.root_value.clone());
            if request.root_value.get("last").and_then(Value::as_bool) == Some(true) {
                Ok(SubscriptionUpdate::Complete(Some(result)))
            } else {
                Ok(SubscriptionUpdate::Deliver(result))
            }
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: DISPATCHER → DELIVERY BUS
    // =============================================================================

    /// Each channel handle sees only its own deliveries.
    #[tokio::test]
    async fn test_channel_handles_receive_own_deliveries() {
        let _ = init_telemetry(&TelemetryConfig::default().with_log_level("debug"));
        let (d, bus) = bus_dispatcher();

        let mut one = bus.subscribe_channel(ChannelId::new("1"));
        let mut two = bus.subscribe_channel(ChannelId::new("2"));

        for (channel, id) in [("1", "100"), ("2", "200")] {
            d.subscribe_event(
                "payload",
                json!({"id": id}),
                ChannelId::new(channel),
                query("subscription { payload { value } }"),
                json!({}),
            )
            .await
            .unwrap();
        }

        d.trigger_event("payload", json!({"id": "200"}), json!({"value": 2}), None)
            .await
            .unwrap();
        d.trigger_event("payload", json!({"id": "100"}), json!({"value": 1}), None)
            .await
            .unwrap();

        let first = timeout(Duration::from_millis(100), one.recv())
            .await
            .expect("timeout waiting for channel 1")
            .expect("channel 1 should receive a delivery");
        assert_eq!(first.channel.as_str(), "1");
        assert_eq!(first.result.data, Some(json!({"payload": {"value": 1}})));

        let second = timeout(Duration::from_millis(100), two.recv())
            .await
            .expect("timeout waiting for channel 2")
            .expect("channel 2 should receive a delivery");
        assert_eq!(second.result.data, Some(json!({"payload": {"value": 2}})));

        assert!(matches!(one.try_recv(), Ok(None)));
        assert_eq!(bus.deliveries_published(), 2);
    }

    /// Deliveries to one channel arrive in trigger order with rising sequence.
    #[tokio::test]
    async fn test_per_channel_order_follows_trigger_order() {
        let (d, bus) = bus_dispatcher();
        let stream = bus.delivery_stream(ChannelFilter::channel(ChannelId::new("1")));

        d.subscribe_event(
            "payload",
            json!({"id": "1"}),
            ChannelId::new("1"),
            query("subscription { payload { value } }"),
            json!({}),
        )
        .await
        .unwrap();

        for value in 0..5 {
            d.trigger_event("payload", json!({"id": "1"}), json!({"value": value}), None)
                .await
                .unwrap();
        }

        let deliveries: Vec<_> = timeout(Duration::from_millis(200), stream.take(5).collect::<Vec<_>>())
            .await
            .expect("timeout collecting deliveries");

        let values: Vec<_> = deliveries
            .iter()
            .map(|d| d.result.data.clone().unwrap_or(Value::Null)["payload"]["value"].clone())
            .collect();
        assert_eq!(values, (0..5).map(|v| json!(v)).collect::<Vec<_>>());
        assert!(deliveries.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    /// A completing update delivers its final result, then removes the channel.
    #[tokio::test]
    async fn test_completion_delivers_then_unsubscribes() {
        let bus = Arc::new(InMemoryDeliveryBus::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        let d = Dispatcher::new(
            registry(),
            store.clone(),
            Arc::new(CountdownExecutor),
            Arc::new(BusDeliverySink::new(bus.clone())),
        );
        let mut handle = bus.subscribe_channel(ChannelId::new("c"));

        d.subscribe_event(
            "broadcast",
            json!({}),
            ChannelId::new("c"),
            query("subscription { broadcast }"),
            json!({}),
        )
        .await
        .unwrap();

        let first = d
            .trigger_event("broadcast", json!({}), json!({"n": 1}), None)
            .await
            .unwrap();
        let last = d
            .trigger_event("broadcast", json!({}), json!({"n": 2, "last": true}), None)
            .await
            .unwrap();
        let after = d
            .trigger_event("broadcast", json!({}), json!({"n": 3}), None)
            .await
            .unwrap();

        assert_eq!(first.delivered, 1);
        assert_eq!(last.completed, 1);
        assert_eq!(last.delivered, 1);
        assert_eq!(after.matched, 0);
        assert_eq!(store.len().await.unwrap(), 0);

        let mut received = Vec::new();
        while let Ok(Some(delivery)) = handle.try_recv() {
            received.push(delivery.result.data);
        }
        assert_eq!(
            received,
            vec![Some(json!({"n": 1})), Some(json!({"n": 2, "last": true}))]
        );
    }

    /// Publishing to a channel nobody listens on is dropped quietly.
    #[tokio::test]
    async fn test_delivery_without_listener_is_dropped() {
        let (d, bus) = bus_dispatcher();
        d.subscribe_event(
            "broadcast",
            json!({}),
            ChannelId::new("gone"),
            query("subscription { broadcast }"),
            json!({}),
        )
        .await
        .unwrap();

        let report = d
            .trigger_event("broadcast", json!({}), json!({}), None)
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(bus.listener_count(&ChannelId::new("gone")), 0);
    }

    #[test]
    fn test_telemetry_macros_in_dispatch_context() {
        relay_telemetry::log_channel_event!(info, ChannelId::new("1"), "Delivered", sequence = 1);
        relay_telemetry::log_topic_event!(info, "payload", "payload:{\"id\":\"1\"}", "Triggered");
    }
}
