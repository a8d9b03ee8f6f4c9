//! Serial JSON line protocol shared by every PlantPoint image.
//!
//! ```text
//!  Transport ──▶ LineAssembler ──▶ Command::decode ──▶ dispatch ──▶ Registry
//!      ▲                                                   │
//!      └──────────────── Reply / Telemetry ◀───────────────┘
//! ```
//!
//! One JSON object per line, `\n` (or `\r`) terminated, in both directions.

pub mod codec;
pub mod dispatch;
pub mod messages;
pub mod transport;

pub use codec::{LineAssembler, LINE_CAPACITY};
pub use dispatch::{dispatch, Dispatched};
pub use messages::{Command, Reply, Status, Telemetry};
pub use transport::Transport;
