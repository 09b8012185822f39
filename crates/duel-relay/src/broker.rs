//! Backend B: an in-process topic broker with last-will messages.
//!
//! Sessions subscribe with MQTT-style filters and publish to concrete
//! topics. A publication reaches every session with a matching filter,
//! the publisher included; receivers drop their own echo by `clientId`.
//!
//! ## Last will
//!
//! A session may register a *last will* when it connects: a message the
//! broker publishes on its behalf if the session ends without a clean
//! [`disconnect`](BrokerSession::disconnect). The will fires after the
//! broker's will delay, so peers learn about a dropped session eventually
//! rather than immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use duel_protocol::ClientId;
use tokio::sync::mpsc;

use crate::RelayError;
use crate::topic::{topic_matches, validate_filter, validate_topic};

/// One delivered publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Channel the broker delivers publications through.
pub type MessageSender = mpsc::UnboundedSender<BrokerMessage>;

/// A message the broker publishes when a session drops uncleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub payload: Vec<u8>,
}

struct Subscriber {
    client_id: ClientId,
    filters: Vec<String>,
    outbox: MessageSender,
}

/// The broker. Share it behind an `Arc`.
pub struct Broker {
    sessions: DashMap<u64, Subscriber>,
    next_key: AtomicU64,
    will_delay: Duration,
}

impl Broker {
    pub fn new(will_delay: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            next_key: AtomicU64::new(1),
            will_delay,
        }
    }

    /// Opens a session. Publications matching its filters are sent to
    /// `outbox`.
    ///
    /// # Errors
    /// [`RelayError::InvalidTopic`] if the will's topic is not a concrete
    /// topic.
    pub fn connect(
        self: &Arc<Self>,
        client_id: ClientId,
        will: Option<LastWill>,
        outbox: MessageSender,
    ) -> Result<BrokerSession, RelayError> {
        if let Some(will) = &will {
            validate_topic(&will.topic)?;
        }
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(
            key,
            Subscriber {
                client_id: client_id.clone(),
                filters: Vec::new(),
                outbox,
            },
        );
        tracing::debug!(%client_id, has_will = will.is_some(), "broker session connected");
        Ok(BrokerSession {
            broker: Arc::clone(self),
            key,
            client_id,
            will,
        })
    }

    /// Delivers `payload` to every session subscribed to a matching
    /// filter and returns how many it reached.
    ///
    /// # Errors
    /// [`RelayError::InvalidTopic`] for an empty or wildcard topic.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<usize, RelayError> {
        validate_topic(topic)?;
        let mut delivered = 0;
        for entry in self.sessions.iter() {
            let subscriber = entry.value();
            if !subscriber.filters.iter().any(|f| topic_matches(f, topic)) {
                continue;
            }
            let message = BrokerMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            };
            match subscriber.outbox.send(message) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        topic,
                        client_id = %subscriber.client_id,
                        "broker delivery failed, skipping"
                    );
                }
            }
        }
        Ok(delivered)
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn subscribe(&self, key: u64, filter: &str) -> Result<(), RelayError> {
        validate_filter(filter)?;
        let mut subscriber = self.sessions.get_mut(&key).ok_or(RelayError::Closed)?;
        if !subscriber.filters.iter().any(|f| f == filter) {
            subscriber.filters.push(filter.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: u64) {
        self.sessions.remove(&key);
    }
}

/// One client's connection to the [`Broker`].
///
/// Dropping the session without calling [`disconnect`](Self::disconnect)
/// is an unclean end: the last will, if any, is published after the
/// broker's will delay.
pub struct BrokerSession {
    broker: Arc<Broker>,
    key: u64,
    client_id: ClientId,
    will: Option<LastWill>,
}

impl BrokerSession {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn subscribe(&self, filter: &str) -> Result<(), RelayError> {
        self.broker.subscribe(self.key, filter)
    }

    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<usize, RelayError> {
        self.broker.publish(topic, payload)
    }

    /// Clean close: the session stops receiving and its will is discarded.
    pub fn disconnect(mut self) {
        self.will = None;
        tracing::debug!(client_id = %self.client_id, "broker session disconnected cleanly");
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        self.broker.remove(self.key);
        let Some(will) = self.will.take() else {
            return;
        };

        let broker = Arc::clone(&self.broker);
        let delay = broker.will_delay;
        let client_id = self.client_id.clone();
        tracing::debug!(
            %client_id,
            topic = %will.topic,
            ?delay,
            "session dropped, last will scheduled"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    publish_will(&broker, &client_id, &will);
                });
            }
            Err(_) => publish_will(&broker, &client_id, &will),
        }
    }
}

fn publish_will(broker: &Broker, client_id: &ClientId, will: &LastWill) {
    match broker.publish(&will.topic, &will.payload) {
        Ok(delivered) => {
            tracing::info!(%client_id, topic = %will.topic, delivered, "last will published");
        }
        Err(e) => tracing::warn!(%client_id, error = %e, "last will not published"),
    }
}
