use crate::{DomainError, RecordType};
use compact_str::CompactString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Outcome of one query, handed to whoever submitted it.
///
/// `context` is the opaque value given at submission; queries submitted
/// without one never produce a delivered result from the poll cycle.
#[derive(Debug, Clone)]
pub struct DnsResult<C> {
    pub context: Option<C>,
    pub lookup: CompactString,
    pub record_type: RecordType,
    pub outcome: Result<Vec<u8>, DomainError>,
}

impl<C> DnsResult<C> {
    pub fn success(
        context: Option<C>,
        lookup: CompactString,
        record_type: RecordType,
        rdata: Vec<u8>,
    ) -> Self {
        Self {
            context,
            lookup,
            record_type,
            outcome: Ok(rdata),
        }
    }

    pub fn failure(
        context: Option<C>,
        lookup: CompactString,
        record_type: RecordType,
        error: DomainError,
    ) -> Self {
        Self {
            context,
            lookup,
            record_type,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&DomainError> {
        self.outcome.as_ref().err()
    }

    /// Raw answer data; empty for failed queries.
    pub fn rdata(&self) -> &[u8] {
        match &self.outcome {
            Ok(data) => data,
            Err(_) => &[],
        }
    }

    /// Interprets an A/AAAA answer as an address.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        rdata_to_ip(self.record_type, self.outcome.as_ref().ok()?)
    }
}

/// Converts fixed-size address RDATA into an `IpAddr`.
pub fn rdata_to_ip(record_type: RecordType, rdata: &[u8]) -> Option<IpAddr> {
    match record_type {
        RecordType::A => {
            let octets: [u8; 4] = rdata.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        RecordType::AAAA => {
            let octets: [u8; 16] = rdata.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}
