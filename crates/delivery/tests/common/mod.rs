//! Shared fixtures for delivery integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use hermes_core::medium::Medium;
use hermes_core::rate_limit::RateLimiter;
use hermes_db::memory::{MemoryMessageLog, MemorySubscriberDirectory};
use hermes_db::models::subscriber::{CreateSubscriber, Subscriber};
use hermes_db::SubscriberDirectory;
use hermes_delivery::dispatch::ProviderResponse;
use hermes_delivery::{
    DeliveryError, Dispatcher, DispatcherRegistry, Ledger, Outbound, Publisher, PublisherConfig,
    ResolutionStrategy, SubscriberResolver,
};
use serde_json::{json, Map};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Recording dispatcher
// ---------------------------------------------------------------------------

/// Dispatcher that records every send instead of calling a provider.
pub struct RecordingDispatcher {
    medium: Medium,
    sent: Mutex<Vec<Outbound>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingDispatcher {
    pub fn new(medium: Medium) -> Self {
        Self {
            medium,
            sent: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            delay: None,
        }
    }

    /// Fail every send to `destination` with a transport error.
    pub fn failing_for(mut self, destination: &str) -> Self {
        self.failing.insert(destination.to_string());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self) -> Vec<String> {
        self.sent().await.into_iter().map(|o| o.destination).collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    fn medium(&self) -> Medium {
        self.medium
    }

    async fn send(&self, outbound: &Outbound) -> Result<ProviderResponse, DeliveryError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().await.push(outbound.clone());
        if self.failing.contains(&outbound.destination) {
            return Err(DeliveryError::HttpStatus(502));
        }
        let mut fields = Map::new();
        fields.insert("provider".to_string(), json!(self.medium.as_str()));
        Ok(fields)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub publisher: Publisher,
    pub directory: Arc<MemorySubscriberDirectory>,
    pub log: Arc<MemoryMessageLog>,
    pub email: Arc<RecordingDispatcher>,
    pub sms: Arc<RecordingDispatcher>,
    pub slack: Arc<RecordingDispatcher>,
    pub push: Arc<RecordingDispatcher>,
}

pub struct HarnessBuilder {
    threshold: usize,
    strategy: ResolutionStrategy,
    email: RecordingDispatcher,
    sms: RecordingDispatcher,
    slack: RecordingDispatcher,
    register_slack: bool,
    register_push: bool,
    log: MemoryMessageLog,
    timeout: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            threshold: 100,
            strategy: ResolutionStrategy::ScanFilter,
            email: RecordingDispatcher::new(Medium::Email),
            sms: RecordingDispatcher::new(Medium::Sms),
            slack: RecordingDispatcher::new(Medium::Slack),
            register_slack: true,
            register_push: false,
            log: MemoryMessageLog::default(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn email(mut self, email: RecordingDispatcher) -> Self {
        self.email = email;
        self
    }

    pub fn without_slack(mut self) -> Self {
        self.register_slack = false;
        self
    }

    pub fn with_push(mut self) -> Self {
        self.register_push = true;
        self
    }

    pub fn log(mut self, log: MemoryMessageLog) -> Self {
        self.log = log;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Harness {
        let directory = Arc::new(MemorySubscriberDirectory::new());
        let log = Arc::new(self.log);
        let email = Arc::new(self.email);
        let sms = Arc::new(self.sms);
        let slack = Arc::new(self.slack);
        let push = Arc::new(RecordingDispatcher::new(Medium::Push));

        let mut registry = DispatcherRegistry::new();
        registry.register(email.clone());
        registry.register(sms.clone());
        if self.register_slack {
            registry.register(slack.clone());
        }
        if self.register_push {
            registry.register(push.clone());
        }

        let publisher = Publisher::new(
            Arc::new(RateLimiter::new(self.threshold, TimeDelta::hours(1))),
            Ledger::new(log.clone()),
            SubscriberResolver::new(directory.clone(), self.strategy),
            registry,
            PublisherConfig {
                dispatch_timeout: self.timeout,
                ..PublisherConfig::default()
            },
        );

        Harness {
            publisher,
            directory,
            log,
            email,
            sms,
            slack,
            push,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// A verified subscriber with id `name` and email `<name>@example.org`.
pub fn subscriber(name: &str, topics: &[&str]) -> Subscriber {
    let mut s = Subscriber::new(CreateSubscriber {
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{name}@example.org"),
        country: "demo".to_string(),
        sms: None,
        slack: None,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        verified: true,
    });
    s.id = name.to_string();
    s
}

impl Harness {
    /// Store a subscriber and its subscription rows.
    pub async fn add(&self, subscriber: Subscriber) {
        self.directory.put(&subscriber).await.unwrap();
        self.directory
            .create_subscriptions(&subscriber.id, &subscriber.topics)
            .await
            .unwrap();
    }
}

pub fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|t| t.to_string()).collect()
}
