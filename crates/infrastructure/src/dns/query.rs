use super::response::ExpectedAnswer;
use super::transport::QuerySocket;
use super::wire;
use compact_str::CompactString;
use proxyscan_domain::{DnsResult, DomainError, RecordType, DNS_CLASS_IN};

/// Longest lookup string accepted for a query.
pub const MAX_LOOKUP_LEN: usize = 255;

/// A question the resolver is still waiting on.
///
/// The socket is `None` while the query sits in the deferred queue waiting
/// for descriptor budget. Dropping the query closes its socket.
#[derive(Debug)]
pub struct OutstandingQuery<C> {
    pub id: u16,
    pub class: u16,
    pub record_type: RecordType,
    pub lookup: CompactString,
    pub context: Option<C>,
    pub started_at: u64,
    pub(crate) packet: Vec<u8>,
    pub(crate) socket: Option<QuerySocket>,
}

impl<C> OutstandingQuery<C> {
    /// Allocates a query with a fresh transaction id and its request packet.
    pub fn new(
        record_type: RecordType,
        lookup: &str,
        context: Option<C>,
    ) -> Result<Self, DomainError> {
        if lookup.len() > MAX_LOOKUP_LEN {
            return Err(DomainError::Format);
        }

        let id = fastrand::u16(..);
        let packet = wire::build_query(id, lookup, record_type.to_u16(), DNS_CLASS_IN)?;

        Ok(Self {
            id,
            class: DNS_CLASS_IN,
            record_type,
            lookup: CompactString::new(lookup),
            context,
            started_at: 0,
            packet,
            socket: None,
        })
    }

    pub fn is_v6(&self) -> bool {
        self.socket.as_ref().is_some_and(QuerySocket::is_v6)
    }

    pub fn is_active(&self) -> bool {
        self.socket.is_some()
    }

    /// True once more than `timeout` seconds have passed since dispatch.
    pub fn is_expired(&self, now: u64, timeout: u64) -> bool {
        self.is_active() && now.saturating_sub(self.started_at) > timeout
    }

    pub(crate) fn expected(&self) -> ExpectedAnswer {
        ExpectedAnswer {
            id: self.id,
            qtype: self.record_type.to_u16(),
            qclass: self.class,
        }
    }

    /// Consumes the query, closing its socket, into a result for its caller.
    pub fn into_result(self, outcome: Result<Vec<u8>, DomainError>) -> DnsResult<C> {
        match outcome {
            Ok(rdata) => DnsResult::success(self.context, self.lookup, self.record_type, rdata),
            Err(error) => DnsResult::failure(self.context, self.lookup, self.record_type, error),
        }
    }
}
