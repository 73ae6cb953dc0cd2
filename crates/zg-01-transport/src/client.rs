//! Broker session: connect, subscribe, deliver, publish.

use crate::config::{qos_level, MqttSettings};
use crate::error::TransportError;
use crate::targets::{dedupe_targets, SubscriptionLedger, SubscriptionTargets};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rumqttc::{
    AsyncClient, ConnAck, ConnectReturnCode, Event, EventLoop, Outgoing, Packet, SubAck,
    SubscribeReasonCode,
};
use shared_bus::{EnvelopePublisher, InboundSender, PublishOutcome, RawMessage};
use shared_types::{serial_from_topic, OutboundEnvelope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zone_telemetry::{metric_inc, BROKER_CONNECTED, MESSAGES_RECEIVED, PUBLISHES};

/// Interval between connection checks while `connect()` waits.
pub const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Session state as seen by the delivery task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Never connected, or the session dropped.
    Disconnected,
    /// `connect()` issued, waiting for the first ConnAck.
    Connecting,
    Connected,
    /// The first connection attempt failed; a new `connect()` is needed.
    Failed(String),
}

/// Emitted on every accepted ConnAck, after subscriptions are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    /// False for the first session of a `connect()`.
    pub reconnect: bool,
}

struct Shared {
    settings: MqttSettings,
    client_id: String,
    own_serial: String,
    publish_topic: String,
    inbound: InboundSender,
    targets: Arc<dyn SubscriptionTargets>,
    client: RwLock<Option<AsyncClient>>,
    link: watch::Sender<LinkState>,
    sessions: broadcast::Sender<SessionEvent>,
    ledger: Mutex<SubscriptionLedger>,
    envelopes_published: AtomicU64,
}

/// MQTT transport adapter.
///
/// Publishes to `{base_topic}/{own_serial}` and listens on the topic of every
/// target device. Inbound publishes are pushed onto the inbound queue
/// untouched.
pub struct MqttTransport {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    #[must_use]
    pub fn new(
        settings: MqttSettings,
        client_id: impl Into<String>,
        own_serial: impl Into<String>,
        inbound: InboundSender,
        targets: Arc<dyn SubscriptionTargets>,
    ) -> Self {
        let own_serial = own_serial.into();
        let publish_topic = settings.topic_for(&own_serial);
        let (link, _) = watch::channel(LinkState::Disconnected);
        let (sessions, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Shared {
                settings,
                client_id: client_id.into(),
                own_serial,
                publish_topic,
                inbound,
                targets,
                client: RwLock::new(None),
                link,
                sessions,
                ledger: Mutex::new(SubscriptionLedger::new()),
                envelopes_published: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Open the broker session and wait until it is up.
    ///
    /// Polls every [`CONNECT_POLL_INTERVAL`] until connected, the first
    /// attempt fails, or `connect_timeout` elapses. On failure the delivery
    /// task is stopped and the adapter stays unusable until the next call.
    pub async fn connect(&self) -> Result<(), TransportError> {
        self.stop_task();

        let settings = &self.shared.settings;
        let broker = format!("{}:{}", settings.broker_host, settings.broker_port);
        let options = settings.mqtt_options(&self.shared.client_id);
        let (client, eventloop) = AsyncClient::new(options, settings.request_capacity.max(1));

        *self.shared.client.write() = Some(client);
        self.shared.ledger.lock().reset();
        self.shared.set_link(LinkState::Connecting);
        info!(broker = %broker, client_id = %self.shared.client_id, "[zg-01] Connecting to broker");

        let shared = Arc::clone(&self.shared);
        *self.task.lock() = Some(tokio::spawn(drive(shared, eventloop)));

        let started = Instant::now();
        let mut ticks: u64 = 0;
        let timeout = settings.connect_timeout();
        loop {
            let state = self.link_state();
            match state {
                LinkState::Connected => {
                    info!(
                        elapsed_ms = ticks * CONNECT_POLL_INTERVAL.as_millis() as u64,
                        client_id = %self.shared.client_id,
                        "[zg-01] Connected flag detected"
                    );
                    return Ok(());
                }
                LinkState::Failed(reason) => {
                    self.abandon();
                    error!(broker = %broker, reason = %reason, "[zg-01] Connection failed");
                    return Err(TransportError::ConnectFailed { broker, reason });
                }
                LinkState::Connecting | LinkState::Disconnected => {}
            }
            if started.elapsed() >= timeout {
                self.abandon();
                error!(broker = %broker, "[zg-01] Connection timed out");
                return Err(TransportError::ConnectTimeout {
                    broker,
                    timeout_ms: settings.connect_timeout_ms,
                });
            }
            tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
            ticks += 1;
        }
    }

    /// Subscribe to every target device's topic. Returns the number of
    /// subscribe requests issued.
    pub async fn subscribe_all(&self) -> Result<usize, TransportError> {
        self.shared.subscribe_all().await
    }

    /// Close the session and stop the delivery task.
    pub async fn disconnect(&self) {
        let client = self.shared.client.write().take();
        if let Some(client) = client {
            if let Err(e) = client.disconnect().await {
                debug!(error = %e, "[zg-01] Disconnect request not delivered");
            }
        }
        self.stop_task();
        self.shared.set_link(LinkState::Disconnected);
        info!("[zg-01] MQTT client disconnected");
    }

    #[must_use]
    pub fn link_state(&self) -> LinkState {
        self.shared.link.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link_state() == LinkState::Connected
    }

    /// Receive a [`SessionEvent`] on every accepted ConnAck.
    #[must_use]
    pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.sessions.subscribe()
    }

    #[must_use]
    pub fn publish_topic(&self) -> &str {
        &self.shared.publish_topic
    }

    fn abandon(&self) {
        self.stop_task();
        self.shared.client.write().take();
    }

    fn stop_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.stop_task();
    }
}

#[async_trait]
impl EnvelopePublisher for MqttTransport {
    async fn publish(&self, envelope: OutboundEnvelope) -> PublishOutcome {
        let tag = envelope.tag();
        let outcome = self.shared.publish(&envelope).await;
        metric_inc!(PUBLISHES, &[tag, outcome.label()]);
        outcome
    }

    fn envelopes_published(&self) -> u64 {
        self.shared.envelopes_published.load(Ordering::Relaxed)
    }
}

impl Shared {
    fn set_link(&self, state: LinkState) {
        BROKER_CONNECTED.set(if state == LinkState::Connected { 1.0 } else { 0.0 });
        self.link.send_replace(state);
    }

    fn current_client(&self) -> Option<AsyncClient> {
        self.client.read().clone()
    }

    async fn publish(&self, envelope: &OutboundEnvelope) -> PublishOutcome {
        if *self.link.borrow() != LinkState::Connected {
            warn!(tag = envelope.tag(), "[zg-01] Client not connected, publish skipped");
            return PublishOutcome::SkippedDisconnected;
        }
        let Some(client) = self.current_client() else {
            warn!(tag = envelope.tag(), "[zg-01] Client not connected, publish skipped");
            return PublishOutcome::SkippedDisconnected;
        };

        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(tag = envelope.tag(), error = %e, "[zg-01] Failed to serialize envelope");
                return PublishOutcome::Failed(e.to_string());
            }
        };
        debug!(topic = %self.publish_topic, bytes = payload.len(), "[zg-01] Publishing");

        match client
            .publish(
                self.publish_topic.as_str(),
                qos_level(self.settings.publish_qos),
                false,
                payload,
            )
            .await
        {
            Ok(()) => {
                self.envelopes_published.fetch_add(1, Ordering::Relaxed);
                info!(
                    object_id = envelope.object_id(),
                    topic = %self.publish_topic,
                    tag = envelope.tag(),
                    "[zg-01] Publish successful"
                );
                PublishOutcome::Sent
            }
            Err(e) => {
                error!(tag = envelope.tag(), error = %e, "[zg-01] Failed to publish message");
                PublishOutcome::Failed(e.to_string())
            }
        }
    }

    async fn subscribe_all(&self) -> Result<usize, TransportError> {
        let client = self.current_client().ok_or(TransportError::NotConnected)?;

        let mut entries = self.targets.subscription_targets();
        entries.extend(self.settings.test_clients.iter().cloned());
        let targets = dedupe_targets(entries, &self.own_serial);
        debug!(count = targets.len(), "[zg-01] Subscription targets resolved");

        let qos = qos_level(self.settings.subscribe_qos);
        let mut issued = 0;
        for target in targets {
            let topic = self.settings.topic_for(&target.serial);
            self.ledger.lock().requested(topic.clone(), target.name.clone());
            match client.subscribe(topic.as_str(), qos).await {
                Ok(()) => {
                    issued += 1;
                    info!(topic = %topic, device = %target.name, "[zg-01] Subscribe requested");
                }
                Err(e) => {
                    self.ledger.lock().withdraw_last();
                    error!(topic = %topic, device = %target.name, error = %e, "[zg-01] Failed to subscribe");
                }
            }
        }
        info!(issued, "[zg-01] All subscriptions initialized");
        Ok(issued)
    }

    fn deliver(&self, topic: String, payload: Vec<u8>) {
        let source = serial_from_topic(&topic).to_string();
        metric_inc!(MESSAGES_RECEIVED, &[source.as_str()]);
        info!(topic = %topic, bytes = payload.len(), "[zg-01] Message received");
        self.inbound.push(RawMessage::new(topic, payload));
    }

    fn on_conn_ack(self: &Arc<Self>, ack: &ConnAck, reconnect: bool) -> bool {
        if ack.code != ConnectReturnCode::Success {
            let reason = format!("{:?}", ack.code);
            error!(reason = %reason, "[zg-01] Broker refused the connection");
            if reconnect {
                self.set_link(LinkState::Disconnected);
            } else {
                self.set_link(LinkState::Failed(reason));
            }
            return false;
        }

        info!(
            client_id = %self.client_id,
            broker = %self.settings.broker_host,
            reconnect,
            "[zg-01] Successfully connected"
        );
        self.ledger.lock().reset();
        self.set_link(LinkState::Connected);

        // Subscribing awaits the client's request queue, which this task drains.
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = shared.subscribe_all().await {
                error!(error = %e, "[zg-01] Re-subscription failed");
            }
            // No listeners is fine.
            let _ = shared.sessions.send(SessionEvent { reconnect });
        });
        true
    }

    fn on_sub_ack(&self, ack: &SubAck) {
        let entry = self.ledger.lock().acknowledged(ack.pkid);
        let (topic, device) = entry.map_or_else(
            || ("unknown".to_string(), "unknown".to_string()),
            |e| (e.topic, e.device_name),
        );
        match ack.return_codes.first() {
            Some(SubscribeReasonCode::Success(qos)) => {
                info!(topic = %topic, device = %device, qos = ?qos, "[zg-01] Subscribed");
            }
            Some(SubscribeReasonCode::Failure) => {
                warn!(topic = %topic, device = %device, "[zg-01] Subscription rejected by broker");
            }
            None => debug!(topic = %topic, "[zg-01] Empty SubAck"),
        }
    }
}

/// Delivery task: polls the event loop for the lifetime of the session.
///
/// Before the first ConnAck any error is terminal. Afterwards errors mark
/// the link down and polling resumes after `reconnect_delay`, which makes
/// the client reconnect.
async fn drive(shared: Arc<Shared>, mut eventloop: EventLoop) {
    let mut sessions: u64 = 0;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if shared.on_conn_ack(&ack, sessions > 0) {
                    sessions += 1;
                } else if sessions == 0 {
                    return;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                shared.deliver(publish.topic, publish.payload.to_vec());
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => shared.on_sub_ack(&ack),
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => {
                if let Some(entry) = shared.ledger.lock().assign(pkid) {
                    debug!(pkid, topic = %entry.topic, "[zg-01] Subscribe sent");
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                info!("[zg-01] Broker closed the session");
                shared.set_link(LinkState::Disconnected);
            }
            Ok(_) => {}
            Err(e) => {
                if sessions == 0 {
                    error!(error = %e, "[zg-01] Initial connection failed");
                    shared.set_link(LinkState::Failed(e.to_string()));
                    return;
                }
                if *shared.link.borrow() == LinkState::Connected {
                    warn!(error = %e, "[zg-01] Connection lost");
                } else {
                    debug!(error = %e, "[zg-01] Reconnect attempt failed");
                }
                shared.set_link(LinkState::Disconnected);
                tokio::time::sleep(shared.settings.reconnect_delay()).await;
            }
        }
    }
}
