//! Dispatcher Service
//!
//! Orchestrates subscribe and trigger: coerces arguments, derives topic
//! keys, writes through the store, and fans a trigger out to every channel
//! indexed under its topic.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use shared_types::{ChannelId, ExecutionFault, QueryDocument};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    CoercedArguments, DispatcherConfig, EventRegistry, EventSchema, EventSubscription,
    FaultPolicy, SubscriptionRecord, TopicKey, TopicKeyBuilder,
};
use crate::error::{ConfigError, StoreError, SubscribeError, TriggerError};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::ports::{
    DeliverySink, ExecutionRequest, QueryExecutor, SubscribeRequest, SubscriptionApi,
    SubscriptionStore, SubscriptionUpdate, TriggerReport, TriggerRequest,
};

/// What happened to one channel during a fan-out.
enum ChannelOutcome {
    Delivered,
    Skipped,
    Completed { delivered: bool },
    Missing,
    Faulted(ChannelId, ExecutionFault),
}

/// Subscription dispatcher
///
/// Implements the `SubscriptionApi` port over injected store, executor and
/// sink.
pub struct Dispatcher<S, E, D> {
    registry: Arc<EventRegistry>,
    store: Arc<S>,
    executor: Arc<E>,
    sink: Arc<D>,
    config: DispatcherConfig,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S, E, D> Dispatcher<S, E, D>
where
    S: SubscriptionStore,
    E: QueryExecutor,
    D: DeliverySink,
{
    /// Create a dispatcher with the default configuration
    pub fn new(
        registry: Arc<EventRegistry>,
        store: Arc<S>,
        executor: Arc<E>,
        sink: Arc<D>,
    ) -> Self {
        Self {
            registry,
            store,
            executor,
            sink,
            config: DispatcherConfig::default(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Create with a custom configuration
    pub fn with_config(
        registry: Arc<EventRegistry>,
        store: Arc<S>,
        executor: Arc<E>,
        sink: Arc<D>,
        config: DispatcherConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(registry, store, executor, sink)
        })
    }

    /// Replace the metrics recorder
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Derive the topic key a trigger with these arguments and scope would hit.
    pub fn topic_for(
        &self,
        event: &str,
        raw_args: &Value,
        scope: Option<&Value>,
    ) -> Result<TopicKey, TriggerError> {
        let schema = self.trigger_schema(event)?;
        let arguments = schema.coercer().coerce_value(raw_args)?;
        Ok(TopicKeyBuilder::for_event(&schema, &arguments, scope))
    }

    /// Subscribe a channel to a single event.
    pub async fn subscribe_event(
        &self,
        event: &str,
        raw_args: Value,
        channel: ChannelId,
        query: QueryDocument,
        context: Value,
    ) -> Result<SubscriptionRecord, SubscribeError> {
        let request = SubscribeRequest::new(channel, query)
            .context(context)
            .event(event, raw_args);
        self.register(request).await
    }

    /// Trigger a single event.
    pub async fn trigger_event(
        &self,
        event: &str,
        raw_args: Value,
        payload: Value,
        scope: Option<Value>,
    ) -> Result<TriggerReport, TriggerError> {
        let mut request = TriggerRequest::new(event, raw_args, payload);
        request.scope = scope;
        self.fire(request).await
    }

    #[instrument(skip(self, request), fields(channel = %request.channel))]
    async fn register(&self, request: SubscribeRequest) -> Result<SubscriptionRecord, SubscribeError> {
        let result = self.build_and_store(request).await;
        self.metrics.record_subscribe(result.is_ok());

        match &result {
            Ok(record) => info!(
                events = record.events.len(),
                topics = record.topics().len(),
                "Subscription registered"
            ),
            Err(error) => debug!(%error, "Subscription rejected"),
        }
        result
    }

    async fn build_and_store(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscriptionRecord, SubscribeError> {
        let SubscribeRequest {
            channel,
            query,
            context,
            events,
        } = request;

        if events.is_empty() {
            return Err(SubscribeError::NoEvents);
        }
        let max = self.config.max_topics_per_subscription;
        if events.len() > max {
            return Err(SubscribeError::TooManyEvents {
                count: events.len(),
                max,
            });
        }

        let events = events
            .iter()
            .map(|(name, raw_args)| self.event_subscription(name, raw_args, &context))
            .collect::<Result<Vec<_>, _>>()?;

        let record = SubscriptionRecord {
            channel_id: channel,
            query,
            context,
            events,
            created_at_ms: now_ms(),
        };

        if self.config.validate_on_subscribe {
            self.executor
                .validate(&record)
                .await
                .map_err(SubscribeError::InvalidQuery)?;
        }

        self.store.write(record.clone(), record.topics()).await?;
        Ok(record)
    }

    fn event_subscription(
        &self,
        event: &str,
        raw_args: &Value,
        context: &Value,
    ) -> Result<EventSubscription, SubscribeError> {
        let schema = self
            .registry
            .get(event)
            .ok_or_else(|| SubscribeError::UnknownEvent(event.to_string()))?;
        let arguments = schema.coercer().coerce_value(raw_args)?;

        let scope = match &schema.scope {
            Some(binding) => Some(binding.extract(context).ok_or_else(|| {
                SubscribeError::MissingScope {
                    event: event.to_string(),
                    binding: binding.name.clone(),
                }
            })?),
            None => None,
        };

        let topic = TopicKeyBuilder::for_event(&schema, &arguments, scope.as_ref());
        Ok(EventSubscription {
            event: schema.name.clone(),
            arguments,
            scope_binding: schema.scope.as_ref().map(|b| b.name.clone()),
            scope,
            topic,
        })
    }

    fn trigger_schema(&self, event: &str) -> Result<Arc<EventSchema>, TriggerError> {
        self.registry
            .get(event)
            .ok_or_else(|| TriggerError::UnknownEvent(event.to_string()))
    }

    #[instrument(skip(self, request), fields(event = %request.event))]
    async fn fire(&self, request: TriggerRequest) -> Result<TriggerReport, TriggerError> {
        let schema = self.trigger_schema(&request.event)?;
        let arguments = schema.coercer().coerce_value(&request.arguments)?;
        let topic = TopicKeyBuilder::for_event(&schema, &arguments, request.scope.as_ref());

        let channels = self.store.channels_for(&topic).await?;
        let matched = channels.len();
        debug!(topic = %topic, matched, "Trigger matched channels");

        let start = Instant::now();
        let result = self
            .fan_out(channels, topic, &schema.name, &arguments, &request.payload)
            .await;
        self.metrics.record_trigger(matched, start.elapsed());
        result
    }

    async fn fan_out(
        &self,
        channels: Vec<ChannelId>,
        topic: TopicKey,
        event: &str,
        arguments: &CoercedArguments,
        payload: &Value,
    ) -> Result<TriggerReport, TriggerError> {
        let mut report = TriggerReport::empty(topic);
        report.matched = channels.len();
        if channels.is_empty() {
            return Ok(report);
        }

        let start = Instant::now();
        let sweep = stream::iter(channels)
            .map(|channel| self.process_channel(channel, event, arguments, payload))
            .buffer_unordered(self.config.max_concurrent_deliveries)
            .try_fold(report, |mut report, outcome| {
                tally(&mut report, outcome);
                future::ready(Ok(report))
            });

        match self.config.trigger_timeout() {
            Some(limit) => match tokio::time::timeout(limit, sweep).await {
                Ok(result) => result,
                Err(_) => {
                    let elapsed = start.elapsed();
                    self.metrics.record_timeout();
                    warn!(?elapsed, "Trigger fan-out timed out");
                    Err(TriggerError::TimedOut { elapsed })
                }
            },
            None => sweep.await,
        }
    }

    async fn process_channel(
        &self,
        channel: ChannelId,
        event: &str,
        arguments: &CoercedArguments,
        payload: &Value,
    ) -> Result<ChannelOutcome, TriggerError> {
        let record = match self.store.read(&channel).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                debug!(channel = %channel, "Channel removed before delivery");
                return Ok(ChannelOutcome::Missing);
            }
            Err(e) => return Err(e.into()),
        };

        let request = ExecutionRequest {
            record: &record,
            event,
            arguments,
            root_value: payload,
        };

        match self.executor.execute(request).await {
            Ok(SubscriptionUpdate::Deliver(result)) => {
                self.sink.deliver(&channel, result).await;
                self.metrics.record_delivery();
                debug!(channel = %channel, "Delivered");
                Ok(ChannelOutcome::Delivered)
            }
            Ok(SubscriptionUpdate::Skip) => {
                self.metrics.record_skip();
                debug!(channel = %channel, "Skipped");
                Ok(ChannelOutcome::Skipped)
            }
            Ok(SubscriptionUpdate::Complete(last)) => {
                let delivered = last.is_some();
                if let Some(result) = last {
                    self.sink.deliver(&channel, result).await;
                    self.metrics.record_delivery();
                }
                self.remove(&channel).await;
                Ok(ChannelOutcome::Completed { delivered })
            }
            Err(fault) => {
                self.metrics.record_fault();
                match self.config.fault_policy {
                    FaultPolicy::AbortOnFault => {
                        warn!(channel = %channel, %fault, "Executor fault; aborting fan-out");
                        Err(TriggerError::Fault { channel, fault })
                    }
                    FaultPolicy::IsolateAndContinue => {
                        warn!(channel = %channel, %fault, "Executor fault; continuing");
                        Ok(ChannelOutcome::Faulted(channel, fault))
                    }
                }
            }
        }
    }

    async fn remove(&self, channel: &ChannelId) {
        match self.store.delete(channel).await {
            Ok(true) => {
                self.metrics.record_unsubscribe();
                info!(channel = %channel, "Subscription removed");
            }
            Ok(false) => debug!(channel = %channel, "Unsubscribe for absent channel"),
            Err(error) => warn!(channel = %channel, %error, "Failed to delete subscription"),
        }
    }
}

fn tally(report: &mut TriggerReport, outcome: ChannelOutcome) {
    match outcome {
        ChannelOutcome::Delivered => report.delivered += 1,
        ChannelOutcome::Skipped => report.skipped += 1,
        ChannelOutcome::Completed { delivered } => {
            report.completed += 1;
            if delivered {
                report.delivered += 1;
            }
        }
        ChannelOutcome::Missing => report.missing += 1,
        ChannelOutcome::Faulted(channel, fault) => report.faults.push((channel, fault)),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[async_trait]
impl<S, E, D> SubscriptionApi for Dispatcher<S, E, D>
where
    S: SubscriptionStore + 'static,
    E: QueryExecutor + 'static,
    D: DeliverySink + 'static,
{
    async fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Result<SubscriptionRecord, SubscribeError> {
        self.register(request).await
    }

    async fn trigger(&self, request: TriggerRequest) -> Result<TriggerReport, TriggerError> {
        self.fire(request).await
    }

    async fn unsubscribe(&self, channel: &ChannelId) {
        self.remove(channel).await;
    }
}
