//! DNS wire codec (RFC 1035 §4.1)
//!
//! Every multi-byte field is read and written explicitly in network byte
//! order; received buffers are never reinterpreted as structs. Only the
//! subset the resolver needs is covered: building a single-question query
//! and walking a response far enough to find the first matching answer.

use compact_str::CompactString;
use proxyscan_domain::DomainError;
use smallvec::SmallVec;

pub const HEADER_LEN: usize = 12;

/// Payload budget of a plain (non-EDNS) UDP message.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// Largest datagram the resolver will look at.
pub const MAX_MESSAGE_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Fixed part of a resource record following its owner name.
pub const RR_FIXED_LEN: usize = 10;

pub const MAX_LABEL_LEN: usize = 63;

/// Encoded name, root terminator included, must end at or before this offset.
const MAX_NAME_END: usize = 507;

pub const FLAGS1_QR: u8 = 0x80;
pub const FLAGS1_OPCODE: u8 = 0x78;
pub const FLAGS1_AA: u8 = 0x04;
pub const FLAGS1_TC: u8 = 0x02;
pub const FLAGS1_RD: u8 = 0x01;

pub const FLAGS2_RA: u8 = 0x80;
pub const FLAGS2_RCODE: u8 = 0x0f;

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsHeader {
    pub id: u16,
    pub flags1: u8,
    pub flags2: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    /// Header of an outgoing recursive query carrying one question.
    pub fn query(id: u16) -> Self {
        Self {
            id,
            flags1: FLAGS1_RD,
            flags2: 0,
            qdcount: 1,
            ..Self::default()
        }
    }

    /// Splits a datagram into its header and the raw payload that follows.
    ///
    /// Returns `None` when fewer than 12 bytes are available.
    pub fn decode(bytes: &[u8]) -> Option<(Self, &[u8])> {
        if bytes.len() < HEADER_LEN {
            return None;
        }

        let header = Self {
            id: read_u16(bytes, 0),
            flags1: bytes[2],
            flags2: bytes[3],
            qdcount: read_u16(bytes, 4),
            ancount: read_u16(bytes, 6),
            nscount: read_u16(bytes, 8),
            arcount: read_u16(bytes, 10),
        };

        Some((header, &bytes[HEADER_LEN..]))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_be_bytes());
        out.push(self.flags1);
        out.push(self.flags2);
        out.extend_from_slice(&self.qdcount.to_be_bytes());
        out.extend_from_slice(&self.ancount.to_be_bytes());
        out.extend_from_slice(&self.nscount.to_be_bytes());
        out.extend_from_slice(&self.arcount.to_be_bytes());
    }

    pub fn is_response(&self) -> bool {
        self.flags1 & FLAGS1_QR != 0
    }

    pub fn opcode(&self) -> u8 {
        (self.flags1 & FLAGS1_OPCODE) >> 3
    }

    pub fn truncated(&self) -> bool {
        self.flags1 & FLAGS1_TC != 0
    }

    pub fn recursion_desired(&self) -> bool {
        self.flags1 & FLAGS1_RD != 0
    }

    pub fn rcode(&self) -> u8 {
        self.flags2 & FLAGS2_RCODE
    }
}

/// Type, class, TTL and RDLENGTH of a resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RrFixed {
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdlength: u16,
}

impl RrFixed {
    /// Reads the ten octets at the start of `bytes`.
    ///
    /// The next record begins `RR_FIXED_LEN + rdlength` bytes further on.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RR_FIXED_LEN {
            return None;
        }

        Some(Self {
            rtype: read_u16(bytes, 0),
            class: read_u16(bytes, 2),
            ttl: read_u32(bytes, 4),
            rdlength: read_u16(bytes, 8),
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.rtype.to_be_bytes());
        out.extend_from_slice(&self.class.to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        out.extend_from_slice(&self.rdlength.to_be_bytes());
    }
}

/// Encodes `name` as length-prefixed labels followed by QTYPE and QCLASS.
///
/// Names are never compressed. A single trailing dot is accepted; empty or
/// over-long labels and names that would not fit the 512-octet message fail
/// with `DomainError::Format`.
pub fn encode_question(name: &str, qtype: u16, qclass: u16) -> Result<Vec<u8>, DomainError> {
    let mut payload = Vec::with_capacity(name.len() + 6);
    let name = name.strip_suffix('.').unwrap_or(name);

    if !name.is_empty() {
        for label in name.split('.') {
            let len = label.len();
            if len == 0 || len > MAX_LABEL_LEN {
                return Err(DomainError::Format);
            }
            // length octet now, root terminator later
            if payload.len() + len + 2 > MAX_NAME_END {
                return Err(DomainError::Format);
            }
            payload.push(len as u8);
            payload.extend_from_slice(label.as_bytes());
        }
    }

    payload.push(0);
    payload.extend_from_slice(&qtype.to_be_bytes());
    payload.extend_from_slice(&qclass.to_be_bytes());

    Ok(payload)
}

/// Builds a complete query datagram: header followed by one question.
pub fn build_query(id: u16, name: &str, qtype: u16, qclass: u16) -> Result<Vec<u8>, DomainError> {
    let question = encode_question(name, qtype, qclass)?;

    let mut packet = Vec::with_capacity(HEADER_LEN + question.len());
    DnsHeader::query(id).encode(&mut packet);
    packet.extend_from_slice(&question);

    Ok(packet)
}

/// Advances past an owner name without following compression pointers.
///
/// A length octet above 63 is taken as a two-byte pointer, zero ends the
/// name, anything else is a label. The returned offset may lie beyond the
/// end of `payload` when the name is truncated.
pub fn skip_name(payload: &[u8], mut pos: usize) -> usize {
    while pos < payload.len() {
        let len = payload[pos] as usize;
        if len > MAX_LABEL_LEN {
            return pos + 2;
        }
        if len == 0 {
            return pos + 1;
        }
        pos += len + 1;
    }
    pos
}

/// Offset of the answer section: skips `qdcount` names plus their type/class.
pub fn skip_questions(payload: &[u8], qdcount: u16) -> usize {
    let mut pos = 0;
    let mut seen = 0;
    while seen < qdcount && pos < payload.len() {
        pos = skip_name(payload, pos) + 4;
        seen += 1;
    }
    pos
}

/// A question section decoded back into its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub labels: SmallVec<[CompactString; 8]>,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn name(&self) -> String {
        self.labels.join(".")
    }
}

/// Decodes an uncompressed question at the start of `payload`.
///
/// Returns the question and the offset just past it.
pub fn decode_question(payload: &[u8]) -> Option<(Question, usize)> {
    let mut labels = SmallVec::new();
    let mut pos = 0;

    loop {
        let len = *payload.get(pos)? as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        if len > MAX_LABEL_LEN {
            return None;
        }
        let label = payload.get(pos..pos + len)?;
        labels.push(CompactString::from_utf8_lossy(label));
        pos += len;
    }

    let fixed = payload.get(pos..pos + 4)?;
    let question = Question {
        labels,
        qtype: read_u16(fixed, 0),
        qclass: read_u16(fixed, 2),
    };

    Some((question, pos + 4))
}
