//! Command dispatcher: one frame in, one reply out.
//!
//! Decoding happens entirely before the registry is touched, so a frame
//! that fails to decode can never leave a half-applied change behind.

use log::{debug, warn};

use super::messages::{Command, Reply};
use crate::app::events::AppEvent;
use crate::app::ports::PinPort;
use crate::config::CapacityPolicy;
use crate::error::{ProtocolError, RegistryError};
use crate::registry::{DeviceName, Registry};

/// Outcome of dispatching one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Reply to write back on the link.
    pub reply: Reply,
    /// What happened, for the event sink.
    pub event: AppEvent,
}

/// Decode `frame` and apply it to `registry`.
///
/// Never fails: every error becomes an error reply.
pub fn dispatch(
    frame: &[u8],
    registry: &mut Registry,
    pins: &mut impl PinPort,
    policy: CapacityPolicy,
) -> Dispatched {
    let result = Command::decode(frame).and_then(|cmd| {
        debug!("dispatch: {}", cmd.name());
        execute(cmd, registry, pins, policy)
    });

    match result {
        Ok(done) => done,
        Err(err) => {
            warn!("dispatch: rejected frame: {}", err);
            Dispatched {
                reply: Reply::error(&err),
                event: AppEvent::Rejected(err),
            }
        }
    }
}

fn execute(
    cmd: Command,
    registry: &mut Registry,
    pins: &mut impl PinPort,
    policy: CapacityPolicy,
) -> Result<Dispatched, ProtocolError> {
    match cmd {
        Command::Config(specs) => {
            let outcome = registry.replace_all(&specs, pins);
            if outcome.dropped() > 0 && policy == CapacityPolicy::Reject {
                // The entries that fit stay applied.
                return Err(ProtocolError::TooManyDevices);
            }

            // Capacity overflow and refused names are both reported as dropped.
            let not_applied = outcome.dropped() + outcome.rejected();
            let mut reply = Reply::ok().with_count(outcome.applied());
            if not_applied > 0 {
                reply = reply.with_dropped(not_applied);
            }
            Ok(Dispatched {
                reply,
                event: AppEvent::Configured {
                    applied: outcome.applied(),
                    dropped: outcome.dropped(),
                    duplicates: outcome.duplicates(),
                    rejected: outcome.rejected(),
                },
            })
        }

        Command::ConfigStart => {
            registry.clear();
            Ok(Dispatched {
                reply: Reply::ok().with_message("config_started"),
                event: AppEvent::ConfigStarted,
            })
        }

        Command::ConfigDevice { index, spec } => {
            let index = usize::try_from(index).map_err(|_| RegistryError::IndexOutOfRange)?;
            let device = registry.write_at(index, &spec, pins)?;
            let name = DeviceName::try_from(device.name()).unwrap_or_default();
            Ok(Dispatched {
                reply: Reply::ok().with_device(device.name()).with_index(index),
                event: AppEvent::DeviceWritten { index, name },
            })
        }

        Command::ConfigEnd => {
            let count = registry.len();
            Ok(Dispatched {
                reply: Reply::ok().with_count(count),
                event: AppEvent::ConfigEnded { count },
            })
        }

        Command::Switch { dev, val } => {
            let device = registry
                .find(&dev)
                .ok_or_else(|| ProtocolError::UnknownDevice(dev.clone()))?;
            let relay = match device.relay() {
                Some(relay) if device.is_machine() => relay,
                _ => return Err(ProtocolError::NotAMachine(dev)),
            };
            pins.write(relay, val);
            let name = DeviceName::try_from(device.name()).unwrap_or_default();
            Ok(Dispatched {
                reply: Reply::ok().with_device(&dev).with_value(val),
                event: AppEvent::Switched { name, on: val },
            })
        }
    }
}
