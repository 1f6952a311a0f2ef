use thiserror::Error;

/// Topology contract violations surfaced by the flow calculator.
///
/// Both are fatal for the calculation cycle; nothing is carried over to the
/// next cycle since every structure is rebuilt from scratch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Connection target \"{target}\" of device {from} doesn't exist")]
    DanglingTarget { from: String, target: String },

    #[error("Connection from {from} to {to} already has value assigned")]
    AlreadyAssigned { from: String, to: String },

    #[error("Duplicate device id: {0}")]
    DuplicateDevice(String),
}
