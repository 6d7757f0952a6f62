//! Entropy harvesting and conditioning over public webcam imagery.
//!
//! A small always-on pipeline: pull a fresh round of frames from a list of
//! public camera URLs, validate and deduplicate them, crop and hash them
//! together with a process-lifetime secret, and keep a buffer of
//! ready-to-serve random blocks topped up for callers to draw from.
//!
//! | Module | Description |
//! |---|---|
//! | [`config`] | Typed, file-or-default settings and the pipeline's tuning constants. |
//! | [`error`] | The operation-level error type; per-camera failures are not errors, see [`fetch::FetchOutcome`]. |
//! | [`logging`] | Rotating-file logging setup, layered under the `log` facade. |
//! | [`registry`] | The active camera URL list and per-URL failure counters. |
//! | [`frame`] | Frame decoding, fingerprinting, and duplicate-window tracking. |
//! | [`fetch`] | Per-URL concurrent fetch and content-type dispatch (snapshot/MJPEG/HTML). |
//! | [`collector`] | One collection round: fetch everything, stop at the success goal. |
//! | [`conditioner`] | Turns a round's frames into keyed BLAKE2b output blocks. |
//! | [`buffer`] | The in-memory/SQLite-backed FIFO of ready output blocks. |
//! | [`context`] | The process-owned context tying the above together (no global state). |
//! | [`pipeline`] | Refill scheduling: when to run a round, and single-flight enforcement. |

pub mod buffer;
pub mod collector;
pub mod conditioner;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod registry;

pub use context::PipelineContext;
pub use error::{Result, WebcamRngError};
