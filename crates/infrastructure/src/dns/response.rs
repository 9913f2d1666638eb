use super::wire::{skip_name, skip_questions, DnsHeader, RrFixed, RR_FIXED_LEN};
use proxyscan_domain::DomainError;
use tracing::debug;

/// Largest RDATA the resolver hands back.
pub const MAX_RDATA_LEN: usize = 1023;

/// What a received datagram means for the query that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Not for this query (runt packet or foreign id); keep waiting.
    Ignore,
    /// RDATA of the first answer matching the requested type and class.
    Answer(Vec<u8>),
    /// The query is finished without an answer.
    Reject(DomainError),
}

/// Identity of the question a response is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedAnswer {
    pub id: u16,
    pub qtype: u16,
    pub qclass: u16,
}

/// Interprets one datagram received on a query's socket.
///
/// The datagram comes from an untrusted peer: every length it declares is
/// checked against what was actually received before it is used.
pub fn interpret(expected: ExpectedAnswer, datagram: &[u8]) -> ResponseOutcome {
    let Some((header, payload)) = DnsHeader::decode(datagram) else {
        return ResponseOutcome::Ignore;
    };

    if header.id != expected.id {
        debug!(
            expected = expected.id,
            received = header.id,
            "Ignoring response with foreign transaction id"
        );
        return ResponseOutcome::Ignore;
    }

    if !header.is_response() || header.opcode() != 0 {
        return ResponseOutcome::Reject(DomainError::Other);
    }

    if let Some(error) = DomainError::from_rcode(header.rcode()) {
        return ResponseOutcome::Reject(error);
    }

    if header.ancount == 0 {
        return ResponseOutcome::Reject(DomainError::NameNotFound);
    }

    let len = payload.len();
    let mut pos = skip_questions(payload, header.qdcount);

    for _ in 0..header.ancount {
        pos = skip_name(payload, pos);

        if pos > len || len - pos < RR_FIXED_LEN {
            debug!(offset = pos, len, "Answer section ends inside a record");
            return ResponseOutcome::Reject(DomainError::Other);
        }

        let Some(rr) = RrFixed::decode(&payload[pos..]) else {
            return ResponseOutcome::Reject(DomainError::Other);
        };
        pos += RR_FIXED_LEN;

        if rr.rtype != expected.qtype || rr.class != expected.qclass {
            pos += rr.rdlength as usize;
            continue;
        }

        let rdlength = rr.rdlength as usize;
        if pos + rdlength > len || rdlength > MAX_RDATA_LEN {
            debug!(rdlength, available = len - pos, "Discarding malformed answer");
            return ResponseOutcome::Reject(DomainError::Other);
        }

        return ResponseOutcome::Answer(payload[pos..pos + rdlength].to_vec());
    }

    ResponseOutcome::Reject(DomainError::Other)
}
