//! viewlink-bridge — drives a capture backend into the hand-off pipeline.
//!
//! `driver` owns the production side: the long-lived capture loop pulling
//! frames, reading back changed regions and pushing commands. `sink` holds
//! the tokio-side consumer plumbing: the `Notify`-backed waker and a
//! diagnostic sink that logs and releases commands until a real protocol
//! server is attached.

pub mod driver;
pub mod sink;
