use super::clock::ManualClock;
use proxyscan_application::ports::ResolutionHandler;
use proxyscan_domain::{DnsResult, ResolverConfig};
use proxyscan_infrastructure::{NameserverRegistry, Resolver};
use std::sync::Arc;
use std::time::Duration;

pub fn resolver_config(port: u16, fd_limit: usize) -> ResolverConfig {
    ResolverConfig {
        fd_limit,
        timeout: 30,
        port,
        nameservers: vec!["127.0.0.1".to_string()],
        ..Default::default()
    }
}

/// A resolver whose only nameserver is `127.0.0.1:port`.
pub fn loopback_resolver<C>(port: u16, fd_limit: usize, clock: Arc<ManualClock>) -> Resolver<C> {
    let config = resolver_config(port, fd_limit);
    let registry = NameserverRegistry::from_addresses(["127.0.0.1"]);
    Resolver::new(&config, registry, clock)
}

/// Gathers every delivered result.
pub struct Collector<C> {
    pub results: Vec<DnsResult<C>>,
}

impl<C> Collector<C> {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

impl<C> ResolutionHandler<C> for Collector<C> {
    fn on_result(&mut self, result: DnsResult<C>) {
        self.results.push(result);
    }
}

/// Cycles until `expected` results have arrived or about three seconds pass.
pub async fn drive<C>(resolver: &mut Resolver<C>, collector: &mut Collector<C>, expected: usize) {
    for _ in 0..150 {
        resolver.cycle(collector);
        if collector.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// QTYPE of the first question in a query datagram.
pub fn query_type(query: &[u8]) -> u16 {
    let mut pos = 12;
    while let Some(&len) = query.get(pos) {
        pos += 1 + len as usize;
        if len == 0 {
            break;
        }
    }
    match query.get(pos..pos + 2) {
        Some(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]),
        None => 0,
    }
}

struct Answer {
    rtype: u16,
    class: u16,
    rdata: Vec<u8>,
    rdlength: u16,
}

/// Assembles response datagrams byte by byte.
pub struct ResponseBuilder {
    id: u16,
    flags1: u8,
    rcode: u8,
    qdcount: u16,
    question: Vec<u8>,
    answers: Vec<Answer>,
}

impl ResponseBuilder {
    /// A successful response echoing the id and question of `query`.
    pub fn reply_to(query: &[u8]) -> Self {
        let id = match query.get(0..2) {
            Some(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]),
            None => 0,
        };
        let question = query.get(12..).unwrap_or_default().to_vec();

        Self {
            id,
            flags1: 0x81,
            rcode: 0,
            qdcount: u16::from(!question.is_empty()),
            question,
            answers: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    pub fn rcode(mut self, rcode: u8) -> Self {
        self.rcode = rcode;
        self
    }

    /// Clears the QR bit.
    pub fn as_query(mut self) -> Self {
        self.flags1 &= !0x80;
        self
    }

    pub fn opcode(mut self, opcode: u8) -> Self {
        self.flags1 = (self.flags1 & !0x78) | ((opcode & 0x0f) << 3);
        self
    }

    pub fn answer(self, rtype: u16, rdata: &[u8]) -> Self {
        self.answer_in_class(rtype, 1, rdata)
    }

    pub fn answer_in_class(mut self, rtype: u16, class: u16, rdata: &[u8]) -> Self {
        self.answers.push(Answer {
            rtype,
            class,
            rdata: rdata.to_vec(),
            rdlength: rdata.len() as u16,
        });
        self
    }

    /// Overrides the RDLENGTH written for the last answer.
    pub fn declared_rdlength(mut self, rdlength: u16) -> Self {
        if let Some(last) = self.answers.last_mut() {
            last.rdlength = rdlength;
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(512);
        out.extend_from_slice(&self.id.to_be_bytes());
        out.push(self.flags1);
        out.push(0x80 | (self.rcode & 0x0f));
        out.extend_from_slice(&self.qdcount.to_be_bytes());
        out.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&self.question);

        for answer in &self.answers {
            out.extend_from_slice(&[0xc0, 0x0c]);
            out.extend_from_slice(&answer.rtype.to_be_bytes());
            out.extend_from_slice(&answer.class.to_be_bytes());
            out.extend_from_slice(&60u32.to_be_bytes());
            out.extend_from_slice(&answer.rdlength.to_be_bytes());
            out.extend_from_slice(&answer.rdata);
        }

        out
    }
}
