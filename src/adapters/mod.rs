//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements  | Connects to                    |
//! |-------------|-------------|--------------------------------|
//! | `device_id` | -           | eFuse MAC → MQTT client id     |
//! | `hardware`  | PinPort     | ESP32 GPIO, ADC oneshot        |
//! | `log_sink`  | EventSink   | Serial log output              |
//! | `mqtt`      | PubSubPort  | ESP-IDF MQTT client            |
//! | `time`      | -           | ESP32 system timer             |
//! | `uart`      | Transport   | UART link to the other board   |
//! | `wifi`      | -           | ESP-IDF WiFi STA               |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod uart;
pub mod wifi;
