//! Power Flow Inference
//!
//! Given a device graph where only a few connections carry their own sensor,
//! infer a signed flow for every connection so that each device's connections
//! account for its measured net production or consumption wherever the
//! topology allows it.

pub mod calculator;
pub mod error;
pub mod graph;
pub mod summary;
pub mod tracker;

pub use calculator::FlowCalculator;
pub use error::FlowError;
pub use graph::{Edge, FlowGraph};
pub use summary::{ConnectionFlow, DeviceFlow, FlowSummary};
pub use tracker::NetFlowTracker;
