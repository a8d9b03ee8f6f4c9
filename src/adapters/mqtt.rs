//! MQTT client adapter for the radio bridge.
//!
//! Implements [`PubSubPort`] on top of `esp_idf_svc::mqtt::client`.
//!
//! The client callback runs on the ESP-IDF MQTT task.  It forwards switch
//! messages straight into the serial TX queue and records session changes
//! in [`SessionFlags`]; the main loop polls those flags to run the
//! resubscribe and reconnect logic.  Built-in auto-reconnect is not used:
//! a dropped session tears the client down and
//! [`ReconnectPolicy`](crate::bridge::reconnect::ReconnectPolicy) decides
//! when to build a new one.
//!
//! On non-espidf targets `MqttLink` is a recorder for host tests.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;

use crate::app::ports::{PubSubError, PubSubPort};
use crate::config::BridgeConfig;

/// Session state shared between the client callback and the main loop.
#[derive(Debug, Default)]
pub struct SessionFlags {
    connected: AtomicBool,
    sessions: AtomicU32,
    lost: AtomicBool,
}

impl SessionFlags {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            sessions: AtomicU32::new(0),
            lost: AtomicBool::new(false),
        }
    }

    /// Broker accepted the connection.
    pub fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
        self.sessions.fetch_add(1, Ordering::AcqRel);
    }

    /// Session went away, or the connect attempt failed.
    pub fn mark_lost(&self) {
        self.connected.store(false, Ordering::Release);
        self.lost.store(true, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of sessions established so far.
    pub fn sessions(&self) -> u32 {
        self.sessions.load(Ordering::Acquire)
    }

    /// Whether a loss was recorded since the last call.
    pub fn take_lost(&self) -> bool {
        self.lost.swap(false, Ordering::AcqRel)
    }
}

/// Broker session parameters derived from [`BridgeConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings<'a> {
    pub keep_alive: Duration,
    /// Always `false`: reconnects are scheduled by `ReconnectPolicy`.
    pub auto_reconnect: bool,
    pub will_topic: &'a str,
    pub will_payload: &'static [u8],
    pub will_retain: bool,
}

impl<'a> SessionSettings<'a> {
    pub fn from_config(config: &'a BridgeConfig) -> Self {
        Self {
            keep_alive: Duration::from_secs(u64::from(config.keep_alive_secs)),
            auto_reconnect: false,
            will_topic: &config.status_topic,
            will_payload: b"offline",
            will_retain: true,
        }
    }
}

#[cfg(target_os = "espidf")]
mod imp {
    use std::sync::Arc;

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
    };
    use log::{error, info, warn};

    use super::{PubSubError, PubSubPort, SessionFlags, SessionSettings};
    use crate::adapters::device_id::{client_id, read_mac, ClientIdString};
    use crate::adapters::log_sink::LogEventSink;
    use crate::bridge::{forward_and_report, SwitchForwarder};
    use crate::config::BridgeConfig;
    use crate::error::CommsError;

    /// Broker session owned by the bridge main loop.
    pub struct MqttLink {
        config: BridgeConfig,
        client_id: ClientIdString,
        forwarder: SwitchForwarder<'static>,
        flags: Arc<SessionFlags>,
        client: Option<EspMqttClient<'static>>,
        seen_sessions: u32,
    }

    impl MqttLink {
        pub fn new(config: &BridgeConfig, forwarder: SwitchForwarder<'static>) -> Self {
            let client_id = client_id(&config.client_id_prefix, &read_mac());
            info!("mqtt: client id {}", client_id);
            Self {
                config: config.clone(),
                client_id,
                forwarder,
                flags: Arc::new(SessionFlags::new()),
                client: None,
                seen_sessions: 0,
            }
        }

        /// Create a client and start connecting.  Completion is reported
        /// through [`take_session_started`](Self::take_session_started).
        pub fn connect(&mut self) -> crate::error::Result<()> {
            self.client = None;

            let settings = SessionSettings::from_config(&self.config);
            let conf = MqttClientConfiguration {
                client_id: Some(self.client_id.as_str()),
                keep_alive_interval: Some(settings.keep_alive),
                disable_auto_reconnect: !settings.auto_reconnect,
                lwt: Some(LwtConfiguration {
                    topic: settings.will_topic,
                    payload: settings.will_payload,
                    qos: QoS::AtLeastOnce,
                    retain: settings.will_retain,
                }),
                ..Default::default()
            };

            let flags = Arc::clone(&self.flags);
            let forwarder = self.forwarder.clone();
            let client = EspMqttClient::new_cb(&self.config.broker_url, &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => flags.mark_connected(),
                    EventPayload::Disconnected => flags.mark_lost(),
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        ..
                    } => {
                        let _ = forward_and_report(&forwarder, topic, data, &mut LogEventSink);
                    }
                    EventPayload::Error(e) => warn!("mqtt: client error: {:?}", e),
                    _ => {}
                }
            });

            match client {
                Ok(c) => {
                    info!("mqtt: connecting to {}", self.config.broker_url);
                    self.client = Some(c);
                    Ok(())
                }
                Err(e) => {
                    error!("mqtt: client init failed: {}", e);
                    self.flags.mark_lost();
                    Err(CommsError::MqttConnectFailed.into())
                }
            }
        }

        /// Tear the client down.  Dropping it stops the MQTT task.
        pub fn disconnect(&mut self) {
            if self.client.take().is_some() {
                info!("mqtt: client stopped");
            }
        }

        /// True once per newly established session.
        pub fn take_session_started(&mut self) -> bool {
            let now = self.flags.sessions();
            let fresh = now != self.seen_sessions;
            self.seen_sessions = now;
            fresh
        }

        /// True once per recorded session loss.
        pub fn take_lost(&self) -> bool {
            self.flags.take_lost()
        }
    }

    impl PubSubPort for MqttLink {
        fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PubSubError> {
            if !self.flags.is_connected() {
                return Err(PubSubError::NotConnected);
            }
            let client = self.client.as_mut().ok_or(PubSubError::NotConnected)?;
            client
                .publish(topic, QoS::AtLeastOnce, retain, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("mqtt: publish to {} failed: {}", topic, e);
                    PubSubError::PublishFailed
                })
        }

        fn subscribe(&mut self, filter: &str) -> Result<(), PubSubError> {
            let client = self.client.as_mut().ok_or(PubSubError::NotConnected)?;
            client
                .subscribe(filter, QoS::AtLeastOnce)
                .map(|_| ())
                .map_err(|e| {
                    warn!("mqtt: subscribe to {} failed: {}", filter, e);
                    PubSubError::SubscribeFailed
                })
        }

        fn is_connected(&self) -> bool {
            self.client.is_some() && self.flags.is_connected()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod imp {
    use super::{PubSubError, PubSubPort};

    /// Host stand-in: records publishes and subscriptions.
    #[derive(Debug, Default)]
    pub struct MqttLink {
        pub connected: bool,
        pub published: Vec<(String, Vec<u8>, bool)>,
        pub subscriptions: Vec<String>,
    }

    impl MqttLink {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl PubSubPort for MqttLink {
        fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PubSubError> {
            if !self.connected {
                return Err(PubSubError::NotConnected);
            }
            self.published
                .push((topic.to_string(), payload.to_vec(), retain));
            Ok(())
        }

        fn subscribe(&mut self, filter: &str) -> Result<(), PubSubError> {
            if !self.connected {
                return Err(PubSubError::NotConnected);
            }
            self.subscriptions.push(filter.to_string());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }
}

pub use imp::MqttLink;
