//! MQTT ⇄ serial bridge translator (ESP32 radio bridge image).
//!
//! ```text
//!  broker ── switch/<dev> ──▶ SwitchForwarder ──▶ SERIAL_TX ──▶ UART ──▶ MPINO
//!  broker ◀── current ────── Bridge::on_serial_line ◀── LineAssembler ◀── UART
//! ```
//!
//! Inbound topic payloads look like
//! `{"pattern":"switch/<dev>","data":{"name":<dev>,"value":<bool>}}` and
//! become `{"cmd":"switch","dev":<dev>,"val":<bool>}` lines.  Serial
//! `current` telemetry goes the other way, wrapped in the same
//! pattern/data envelope.  Environment readings (pH, EC, water
//! temperature, air temperature and humidity) arrive as
//! `{"cmd":"environment","dev":<name>,"val":<number|string>}` lines and are
//! published on `environment/<name>` with the name lower-cased.
//!
//! The forwarder runs on the MQTT client's task and only touches the
//! queue; everything else runs on the main loop.

pub mod queue;
pub mod reconnect;

use heapless::FnvIndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PubSubError, PubSubPort};
use crate::config::BridgeConfig;
use crate::protocol::codec::{LineAssembler, LINE_CAPACITY};
use crate::protocol::transport::{write_all, Transport};
use crate::registry::{bounded_name, DeviceName, Reading, MAX_DEVICES};
use queue::{SerialLine, SerialTxQueue};

/// Size of the last-known switch state table.
const STATE_TABLE_CAPACITY: usize = 16;
const _: () = assert!(STATE_TABLE_CAPACITY >= MAX_DEVICES);

// ───────────────────────────────────────────────────────────────
// Envelopes
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, V> {
    pattern: &'a str,
    data: EnvelopeData<'a, V>,
}

#[derive(Serialize)]
struct EnvelopeData<'a, V> {
    name: &'a str,
    value: V,
}

#[derive(Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum SerialCommand<'a> {
    Switch { dev: &'a str, val: bool },
}

/// An environment sample.  Probe modules report text such as `"6.52"`,
/// which is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Number(f64),
    Text(String),
}

// ───────────────────────────────────────────────────────────────
// Inbound: topic message → serial line
// ───────────────────────────────────────────────────────────────

/// Why an inbound topic message was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    MissingPattern,
    MissingData,
    NotASwitchPattern,
    NameNotString,
    ValueNotBool,
    LineTooLong,
    QueueFull,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAnObject => "payload is not a JSON object",
            Self::MissingPattern => "missing pattern",
            Self::MissingData => "missing data",
            Self::NotASwitchPattern => "pattern is not a switch pattern",
            Self::NameNotString => "data.name is not a string",
            Self::ValueNotBool => "data.value is not a bool",
            Self::LineTooLong => "serial line too long",
            Self::QueueFull => "serial TX queue full",
        }
    }
}

impl core::fmt::Display for Rejection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.reason())
    }
}

/// A switch request that made it onto the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarded {
    pub name: DeviceName,
    pub on: bool,
}

/// Validates inbound switch messages and queues the serial line.
///
/// Cheap to clone; one copy lives in the MQTT callback.
#[derive(Clone)]
pub struct SwitchForwarder<'q> {
    switch_prefix: String,
    queue: &'q SerialTxQueue,
}

impl<'q> SwitchForwarder<'q> {
    pub fn new(switch_prefix: &str, queue: &'q SerialTxQueue) -> Self {
        Self {
            switch_prefix: switch_prefix.into(),
            queue,
        }
    }

    /// Turn a topic payload into a queued `switch` line.
    pub fn forward(&self, topic: &str, payload: &[u8]) -> Result<Forwarded, Rejection> {
        let (name, on) = self.translate(payload)?;
        let mut encoded = serde_json::to_vec(&SerialCommand::Switch { dev: &name, val: on })
            .map_err(|_| Rejection::LineTooLong)?;
        encoded.push(b'\n');
        let line = SerialLine::from_bytes(&encoded).ok_or(Rejection::LineTooLong)?;

        self.queue
            .try_send(line)
            .map_err(|_| Rejection::QueueFull)?;

        debug!("bridge: {} -> switch {} = {}", topic, name, on);
        Ok(Forwarded {
            name: bounded_name(&name),
            on,
        })
    }

    fn translate(&self, payload: &[u8]) -> Result<(String, bool), Rejection> {
        let value: Value = serde_json::from_slice(payload).map_err(|_| Rejection::NotAnObject)?;
        let obj = value.as_object().ok_or(Rejection::NotAnObject)?;

        let pattern = obj
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or(Rejection::MissingPattern)?;
        let data = obj
            .get("data")
            .and_then(Value::as_object)
            .ok_or(Rejection::MissingData)?;
        if !pattern.starts_with(self.switch_prefix.as_str()) {
            return Err(Rejection::NotASwitchPattern);
        }

        let name = data
            .get("name")
            .and_then(Value::as_str)
            .ok_or(Rejection::NameNotString)?;
        let on = data
            .get("value")
            .and_then(Value::as_bool)
            .ok_or(Rejection::ValueNotBool)?;
        Ok((name.into(), on))
    }
}

// ───────────────────────────────────────────────────────────────
// Bridge (main-loop side)
// ───────────────────────────────────────────────────────────────

pub struct Bridge<'q> {
    config: BridgeConfig,
    forwarder: SwitchForwarder<'q>,
    assembler: LineAssembler<LINE_CAPACITY>,
    last_states: FnvIndexMap<DeviceName, bool, STATE_TABLE_CAPACITY>,
}

impl<'q> Bridge<'q> {
    pub fn new(config: BridgeConfig, queue: &'q SerialTxQueue) -> Self {
        let forwarder = SwitchForwarder::new(&config.switch_prefix, queue);
        Self {
            config,
            forwarder,
            assembler: LineAssembler::new(),
            last_states: FnvIndexMap::new(),
        }
    }

    /// A forwarder for the MQTT client's callback.
    pub fn forwarder(&self) -> SwitchForwarder<'q> {
        self.forwarder.clone()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle one inbound topic message on the calling task.
    pub fn on_topic_message(
        &self,
        topic: &str,
        payload: &[u8],
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        forward_and_report(&self.forwarder, topic, payload, sink)
    }

    /// Run after every (re)connect: announce, then resubscribe.
    pub fn on_connected(&self, pubsub: &mut impl PubSubPort) -> Result<(), PubSubError> {
        pubsub.publish(&self.config.status_topic, b"online", true)?;
        pubsub.subscribe(&self.config.switch_filter)?;
        info!(
            "bridge: online on {}, subscribed to {}",
            self.config.status_topic, self.config.switch_filter
        );
        Ok(())
    }

    /// Write every queued line to the serial link.  Returns lines written.
    pub fn drain_tx<T: Transport>(&self, link: &mut T) -> usize {
        let mut written = 0;
        while let Ok(line) = self.forwarder.queue.try_receive() {
            match write_all(link, line.as_bytes()) {
                Ok(()) => written += 1,
                Err(e) => warn!("bridge: serial write failed, line dropped: {}", e),
            }
        }
        written
    }

    /// Read everything the controller sent and handle each complete line.
    pub fn poll_serial<T: Transport>(
        &mut self,
        link: &mut T,
        pubsub: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) {
        let mut buf = [0u8; 128];
        loop {
            let n = match link.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("bridge: serial read failed: {:?}", e);
                    break;
                }
            };
            let mut lines: Vec<Vec<u8>> = Vec::new();
            self.assembler.feed(&buf[..n], |line| lines.push(line.to_vec()));
            for line in &lines {
                self.on_serial_line(line, pubsub, sink);
            }
        }
    }

    /// Handle one line from the controller.
    pub fn on_serial_line(
        &mut self,
        line: &[u8],
        pubsub: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) {
        let text = String::from_utf8_lossy(line.trim_ascii());
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            warn!("bridge: non-JSON serial line ignored: {}", text);
            sink.emit(&AppEvent::BridgeDropped("serial line not JSON"));
            return;
        };

        if let Some(cmd) = value.get("cmd").and_then(Value::as_str) {
            match cmd {
                "current" => self.publish_current(&value, pubsub, sink),
                "environment" => self.relay_environment(&value, pubsub, sink),
                "switch" => self.note_switch(&value),
                "init_complete" => info!("bridge: controller ready"),
                other => warn!("bridge: serial cmd '{}' ignored", other),
            }
        } else if let Some(status) = value.get("status").and_then(Value::as_str) {
            if status == "ok" {
                info!("bridge: controller reply: {}", text);
            } else {
                let message = value.get("message").and_then(Value::as_str).unwrap_or("");
                warn!("bridge: controller error: {}", message);
            }
        } else {
            warn!("bridge: unrecognised serial line ignored: {}", text);
        }
    }

    /// Last switch state the controller echoed for `dev`.
    pub fn last_state(&self, dev: &str) -> Option<bool> {
        self.last_states.get(&bounded_name(dev)).copied()
    }

    fn publish_current(
        &mut self,
        value: &Value,
        pubsub: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) {
        let Some(dev) = value.get("dev").and_then(Value::as_str) else {
            warn!("bridge: current without dev");
            sink.emit(&AppEvent::BridgeDropped("current without dev"));
            return;
        };
        let Some(reading) = value.get("val").and_then(|v| Reading::deserialize(v).ok()) else {
            warn!("bridge: current for {} without a usable val", dev);
            sink.emit(&AppEvent::BridgeDropped("current without val"));
            return;
        };

        let pattern = format!("{}/{}", self.config.current_prefix, dev);
        let topic = if self.config.per_device_topics {
            pattern.as_str()
        } else {
            self.config.current_topic.as_str()
        };
        let envelope = Envelope {
            pattern: &pattern,
            data: EnvelopeData {
                name: dev,
                value: reading,
            },
        };
        let payload = match serde_json::to_vec(&envelope) {
            Ok(p) => p,
            Err(e) => {
                warn!("bridge: encode failed for {}: {}", dev, e);
                return;
            }
        };

        match pubsub.publish(topic, &payload, false) {
            Ok(()) => {
                debug!("bridge: published {} on {}", dev, topic);
                sink.emit(&AppEvent::BridgePublished {
                    name: bounded_name(dev),
                    reading,
                });
            }
            Err(e) => {
                warn!("bridge: publish of {} failed: {}", dev, e);
                sink.emit(&AppEvent::BridgeDropped("publish failed"));
            }
        }
    }

    /// Publish one environment sample on `<environment_prefix>/<name>`.
    pub fn publish_environment(
        &self,
        name: &str,
        value: &EnvValue,
        pubsub: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) -> Result<(), PubSubError> {
        let name = name.to_lowercase();
        let topic = format!("{}/{}", self.config.environment_prefix, name);
        let envelope = Envelope {
            pattern: &topic,
            data: EnvelopeData {
                name: &name,
                value,
            },
        };
        let payload = serde_json::to_vec(&envelope).map_err(|_| PubSubError::PublishFailed)?;

        match pubsub.publish(&topic, &payload, false) {
            Ok(()) => {
                debug!("bridge: published {} on {}", name, topic);
                sink.emit(&AppEvent::EnvironmentPublished {
                    name: bounded_name(&name),
                });
                Ok(())
            }
            Err(e) => {
                warn!("bridge: publish of {} failed: {}", name, e);
                sink.emit(&AppEvent::BridgeDropped("publish failed"));
                Err(e)
            }
        }
    }

    fn relay_environment(
        &self,
        value: &Value,
        pubsub: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) {
        let Some(dev) = value.get("dev").and_then(Value::as_str) else {
            warn!("bridge: environment without dev");
            sink.emit(&AppEvent::BridgeDropped("environment without dev"));
            return;
        };
        let Some(sample) = value.get("val").and_then(|v| EnvValue::deserialize(v).ok()) else {
            warn!("bridge: environment for {} without a usable val", dev);
            sink.emit(&AppEvent::BridgeDropped("environment without val"));
            return;
        };
        // Failures are already logged and reported.
        let _ = self.publish_environment(dev, &sample, pubsub, sink);
    }

    fn note_switch(&mut self, value: &Value) {
        let (Some(dev), Some(on)) = (
            value.get("dev").and_then(Value::as_str),
            value.get("val").and_then(Value::as_bool),
        ) else {
            warn!("bridge: malformed switch echo ignored");
            return;
        };

        let name = bounded_name(dev);
        let changed = self.last_states.get(&name) != Some(&on);
        if !changed {
            return;
        }
        info!("bridge: {} is now {}", dev, if on { "ON" } else { "OFF" });
        if self.last_states.insert(name, on).is_err() {
            warn!("bridge: state table full, {} not tracked", dev);
        }
    }
}

/// Forward on the calling task and report the outcome to `sink`.
pub fn forward_and_report(
    forwarder: &SwitchForwarder<'_>,
    topic: &str,
    payload: &[u8],
    sink: &mut impl EventSink,
) -> Result<(), Rejection> {
    match forwarder.forward(topic, payload) {
        Ok(Forwarded { name, on }) => {
            sink.emit(&AppEvent::BridgeForwarded { name, on });
            Ok(())
        }
        Err(rejection) => {
            match rejection {
                Rejection::QueueFull => log::error!("bridge: {} dropped: {}", topic, rejection),
                _ => warn!("bridge: {} rejected: {}", topic, rejection),
            }
            sink.emit(&AppEvent::BridgeDropped(rejection.reason()));
            Err(rejection)
        }
    }
}
