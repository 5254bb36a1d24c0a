//! MQTT source for the event processor
//!
//! Subscribes to the core data topic, decodes each publish into an [`Event`]
//! and pushes it into the processor queue. Pushing awaits queue capacity, so
//! a saturated processor stops the broker connection from being polled.

use crate::{
    config::MqttSourceConfig,
    core::Event,
    error::{MonitorError, Result},
    parsing::parse_event,
};
use rumqttc::{AsyncClient, Event as MqttEvent, MqttOptions, Packet, QoS};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError, RwLock,
    },
    time::Duration,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Broker connection status as seen by the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// MQTT subscriber that feeds decoded events to the processor
pub struct MqttSubscriber {
    config: MqttSourceConfig,
    should_stop: watch::Sender<bool>,
    state: RwLock<ConnectionState>,
    events_received: AtomicU64,
    errors: AtomicU64,
}

impl MqttSubscriber {
    pub fn new(config: MqttSourceConfig) -> Self {
        let (should_stop, _) = watch::channel(false);
        Self {
            config,
            should_stop,
            state: RwLock::new(ConnectionState::Disconnected),
            events_received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Poll the broker until [`stop`](Self::stop) is called or the processor
    /// queue is closed. Connection errors are retried after one second.
    pub async fn run(&self, sink: mpsc::Sender<Event>) -> Result<()> {
        self.config.validate()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            topic = %self.config.topic,
            "starting MQTT subscriber"
        );

        let mut options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let mut stop = self.should_stop.subscribe();
        self.set_state(ConnectionState::Connecting);

        while !*stop.borrow_and_update() {
            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                notification = eventloop.poll() => match notification {
                    Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                        // Subscriptions do not survive a reconnect.
                        if let Err(e) = client.subscribe(&self.config.topic, QoS::AtLeastOnce).await {
                            let e = MonitorError::Mqtt(e.to_string());
                            warn!(topic = %self.config.topic, error = %e, "failed to subscribe");
                            continue;
                        }
                        self.set_state(ConnectionState::Connected);
                        info!(topic = %self.config.topic, "subscribed");
                    }
                    Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                        match parse_event(&publish.payload) {
                            Ok(event) => {
                                debug!(event_id = %event.id, "received event");
                                if sink.send(event).await.is_err() {
                                    info!("event queue closed, stopping MQTT subscriber");
                                    break;
                                }
                                self.events_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                warn!(error = %e, "failed to decode event");
                                self.errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT event loop error, retrying");
                        self.set_state(ConnectionState::Connecting);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }

        if let Err(e) = client.disconnect().await {
            debug!(error = %e, "disconnect request not delivered");
        }
        self.set_state(ConnectionState::Disconnected);

        let (events, errors) = self.get_metrics();
        info!(events, errors, "MQTT subscriber stopped");
        Ok(())
    }

    /// Stop the subscriber
    pub fn stop(&self) {
        self.should_stop.send_replace(true);
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Get metrics: (events forwarded, payloads that failed to decode)
    pub fn get_metrics(&self) -> (u64, u64) {
        (self.events_received.load(Ordering::Relaxed), self.errors.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscriber_is_disconnected() {
        let subscriber = MqttSubscriber::new(MqttSourceConfig::default());
        assert_eq!(subscriber.connection_state(), ConnectionState::Disconnected);
        assert!(!subscriber.is_connected());
        assert_eq!(subscriber.get_metrics(), (0, 0));
    }

    #[tokio::test]
    async fn test_stop_before_run_returns_immediately() {
        let subscriber = MqttSubscriber::new(MqttSourceConfig::default());
        let (tx, _rx) = mpsc::channel(1);

        subscriber.stop();
        subscriber.run(tx).await.unwrap();
        assert_eq!(subscriber.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = MqttSourceConfig { topic: String::new(), ..Default::default() };
        let subscriber = MqttSubscriber::new(config);
        let (tx, _rx) = mpsc::channel(1);

        assert!(matches!(subscriber.run(tx).await, Err(MonitorError::Config(_))));
    }
}
