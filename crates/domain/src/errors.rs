use thiserror::Error;

/// Failure kinds reported for a single DNS query.
///
/// None of these are fatal to the process: each one terminates only the
/// query it belongs to and is handed back to that query's caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Format error")]
    Format,

    #[error("Server failure")]
    ServerFailure,

    #[error("Name error")]
    NameNotFound,

    #[error("Not implemented")]
    NotImplemented,

    #[error("Refused")]
    Refused,

    #[error("Timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("FD Limit reached")]
    FdLimit,

    #[error("Unknown error")]
    Other,

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),
}

impl DomainError {
    /// Maps the 4-bit RCODE of a response header onto an error kind.
    ///
    /// Returns `None` for `NOERROR`.
    pub fn from_rcode(rcode: u8) -> Option<Self> {
        match rcode & 0x0f {
            0 => None,
            1 => Some(Self::Format),
            2 => Some(Self::ServerFailure),
            3 => Some(Self::NameNotFound),
            4 => Some(Self::NotImplemented),
            5 => Some(Self::Refused),
            _ => Some(Self::Other),
        }
    }

    pub fn network(err: &std::io::Error) -> Self {
        Self::Network(err.to_string())
    }

    /// Authoritative answers that another attempt would not change.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::NameNotFound | Self::Format)
    }
}
