use thiserror::Error;

/// Top-level error type for shared hostwatch types.
#[derive(Error, Debug)]
pub enum HostwatchError {
    #[error("Invalid {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Invalid IP address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
}
