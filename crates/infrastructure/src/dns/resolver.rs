//! Asynchronous, poll-driven DNS resolver.
//!
//! Queries are submitted without blocking and the host calls [`Resolver::cycle`]
//! from its own event loop. Each cycle times out stale queries, checks every
//! query socket for a reply with a zero-wait poll, and dispatches queries that
//! were deferred because the descriptor budget was exhausted.
//!
//! Everything lives on the thread that owns the `Resolver`; nothing here locks.

use super::nameservers::NameserverRegistry;
use super::poll::poll_readable;
use super::query::OutstandingQuery;
use super::response::{self, ResponseOutcome};
use super::transport::QuerySocket;
use super::wire::MAX_MESSAGE_LEN;
use proxyscan_application::ports::{Clock, ResolutionHandler};
use proxyscan_domain::{DnsResult, DomainError, RecordType, ResolverConfig};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts made by the blocking helpers before giving up.
const BLOCKING_ATTEMPTS: usize = 3;

/// How long a blocking helper waits for each attempt.
const BLOCKING_WAIT: Duration = Duration::from_secs(5);

/// Identifies an active query by the socket it was sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryHandle(RawFd);

impl QueryHandle {
    pub fn fd(&self) -> RawFd {
        self.0
    }
}

/// Result of reading from a query's socket.
#[derive(Debug)]
pub enum Retrieval<C> {
    /// Nothing usable arrived; the query stays open.
    Pending,
    /// The query is closed and this is its outcome.
    Complete(DnsResult<C>),
}

pub struct Resolver<C> {
    nameservers: NameserverRegistry,
    fd_limit: usize,
    timeout: u64,
    port: u16,
    clock: Arc<dyn Clock>,
    active: FxHashMap<QueryHandle, OutstandingQuery<C>>,
    deferred: VecDeque<OutstandingQuery<C>>,
}

impl<C> Resolver<C> {
    pub fn new(
        config: &ResolverConfig,
        nameservers: NameserverRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            fd_limit = config.fd_limit,
            timeout_secs = config.timeout,
            nameservers = nameservers.len(),
            "Initializing resolver"
        );

        Self {
            nameservers,
            fd_limit: config.fd_limit,
            timeout: config.timeout,
            port: config.port,
            clock,
            active: FxHashMap::default(),
            deferred: VecDeque::new(),
        }
    }

    /// Creates a resolver with nameservers taken from the configured sources.
    pub fn from_config(config: &ResolverConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config, NameserverRegistry::load(config), clock)
    }

    pub fn nameservers(&self) -> &NameserverRegistry {
        &self.nameservers
    }

    /// Queries with an open socket.
    pub fn pending(&self) -> usize {
        self.active.len()
    }

    /// Queries waiting for descriptor budget.
    pub fn deferred(&self) -> usize {
        self.deferred.len()
    }

    pub fn sockets_in_use(&self) -> usize {
        self.active.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.deferred.is_empty()
    }

    /// Starts resolving `name` and returns the handle of its socket.
    ///
    /// When the descriptor budget is exhausted this fails with
    /// `DomainError::FdLimit`; a query that carries a context is still kept
    /// and sent by a later [`cycle`](Self::cycle), while a context-less one
    /// is dropped.
    pub fn submit(
        &mut self,
        record_type: RecordType,
        name: &str,
        context: Option<C>,
    ) -> Result<QueryHandle, DomainError> {
        let mut query = OutstandingQuery::new(record_type, name, context)?;

        if self.sockets_in_use() >= self.fd_limit {
            if query.context.is_some() {
                debug!(
                    lookup = %query.lookup,
                    deferred = self.deferred.len() + 1,
                    "Descriptor budget exhausted, deferring query"
                );
                self.deferred.push_back(query);
            }
            return Err(DomainError::FdLimit);
        }

        let handle = self.transmit(&mut query)?;
        self.active.insert(handle, query);
        Ok(handle)
    }

    /// Opens a socket for `query` and sends it to every nameserver.
    fn transmit(&self, query: &mut OutstandingQuery<C>) -> Result<QueryHandle, DomainError> {
        let socket = QuerySocket::open(&self.nameservers).map_err(|e| {
            warn!(error = %e, "Unable to open DNS query socket");
            DomainError::network(&e)
        })?;

        let sent = socket
            .send_to_all(&query.packet, &self.nameservers, self.port)
            .map_err(|e| {
                debug!(lookup = %query.lookup, error = %e, "DNS query not sent to any nameserver");
                DomainError::network(&e)
            })?;

        let handle = QueryHandle(socket.raw_fd());
        debug!(
            lookup = %query.lookup,
            record_type = %query.record_type,
            id = query.id,
            ipv6 = socket.is_v6(),
            servers = sent,
            "DNS query sent"
        );

        query.started_at = self.clock.now_secs();
        query.socket = Some(socket);
        Ok(handle)
    }

    /// Reads one datagram from the socket of `handle`.
    ///
    /// Returns `None` for an unknown handle. Datagrams that are too short or
    /// carry another transaction id leave the query open.
    pub fn retrieve(&mut self, handle: QueryHandle) -> Option<Retrieval<C>> {
        let query = self.active.get(&handle)?;
        let socket = query.socket.as_ref()?;

        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let outcome = match socket.recv(&mut buf) {
            Ok(len) => response::interpret(query.expected(), &buf[..len]),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                ResponseOutcome::Ignore
            }
            Err(e) => ResponseOutcome::Reject(DomainError::network(&e)),
        };

        let finished = match outcome {
            ResponseOutcome::Ignore => return Some(Retrieval::Pending),
            ResponseOutcome::Answer(rdata) => Ok(rdata),
            ResponseOutcome::Reject(error) => {
                debug!(lookup = %query.lookup, error = %error, "DNS query failed");
                Err(error)
            }
        };

        self.close(handle, finished).map(Retrieval::Complete)
    }

    fn close(
        &mut self,
        handle: QueryHandle,
        outcome: Result<Vec<u8>, DomainError>,
    ) -> Option<DnsResult<C>> {
        self.active
            .remove(&handle)
            .map(|query| query.into_result(outcome))
    }

    /// Abandons an active query without producing a result.
    ///
    /// Returns the query's context, or `None` if the handle is unknown.
    pub fn cancel(&mut self, handle: QueryHandle) -> Option<Option<C>> {
        self.active.remove(&handle).map(|query| query.context)
    }

    /// Runs one scheduling pass; never waits for the network.
    ///
    /// Results for queries that carry a context are passed to `handler`.
    pub fn cycle<H>(&mut self, handler: &mut H)
    where
        H: ResolutionHandler<C> + ?Sized,
    {
        if self.is_idle() {
            return;
        }

        let now = self.clock.now_secs();
        self.expire(now, handler);
        self.read_ready(handler);
        self.dispatch_deferred(handler);
    }

    fn expire<H>(&mut self, now: u64, handler: &mut H)
    where
        H: ResolutionHandler<C> + ?Sized,
    {
        let timeout = self.timeout;
        let expired: Vec<QueryHandle> = self
            .active
            .iter()
            .filter(|(_, query)| query.is_expired(now, timeout))
            .map(|(handle, _)| *handle)
            .collect();

        for handle in expired {
            if let Some(result) = self.close(handle, Err(DomainError::Timeout)) {
                debug!(lookup = %result.lookup, "DNS query timed out");
                deliver(handler, result);
            }
        }
    }

    fn read_ready<H>(&mut self, handler: &mut H)
    where
        H: ResolutionHandler<C> + ?Sized,
    {
        let watched: Vec<RawFd> = self
            .active
            .keys()
            .take(self.fd_limit)
            .map(QueryHandle::fd)
            .collect();

        let ready = match poll_readable(&watched, Duration::ZERO) {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "Polling DNS query sockets failed");
                return;
            }
        };

        for fd in ready {
            if let Some(Retrieval::Complete(result)) = self.retrieve(QueryHandle(fd)) {
                deliver(handler, result);
            }
        }
    }

    fn dispatch_deferred<H>(&mut self, handler: &mut H)
    where
        H: ResolutionHandler<C> + ?Sized,
    {
        while self.sockets_in_use() < self.fd_limit {
            let Some(mut query) = self.deferred.pop_front() else {
                break;
            };

            match self.transmit(&mut query) {
                Ok(handle) => {
                    debug!(lookup = %query.lookup, "Deferred DNS query dispatched");
                    self.active.insert(handle, query);
                }
                Err(error) => deliver(handler, query.into_result(Err(error))),
            }
        }
    }

    /// Resolves `name` synchronously, blocking the calling thread.
    ///
    /// Makes up to three attempts of five seconds each. A final answer such
    /// as `NameNotFound` is returned at once; other failures are retried.
    pub fn resolve_blocking(
        &mut self,
        record_type: RecordType,
        name: &str,
    ) -> Result<Vec<u8>, DomainError> {
        let mut last_error = DomainError::Timeout;

        for attempt in 1..=BLOCKING_ATTEMPTS {
            let handle = self.submit(record_type, name, None)?;

            if let Err(e) = poll_readable(&[handle.fd()], BLOCKING_WAIT) {
                self.cancel(handle);
                return Err(DomainError::network(&e));
            }

            match self.retrieve(handle) {
                Some(Retrieval::Complete(result)) => match result.outcome {
                    Ok(rdata) => return Ok(rdata),
                    Err(error) if error.is_final() => return Err(error),
                    Err(error) => last_error = error,
                },
                _ => {
                    self.cancel(handle);
                    last_error = DomainError::Timeout;
                }
            }

            debug!(lookup = %name, attempt, error = %last_error, "Blocking lookup attempt failed");
        }

        Err(last_error)
    }

    /// A record lookup; a literal IPv4 address is returned as-is.
    pub fn resolve_ipv4(&mut self, name: &str) -> Result<Ipv4Addr, DomainError> {
        if let Ok(addr) = name.parse::<Ipv4Addr>() {
            return Ok(addr);
        }

        let rdata = self.resolve_blocking(RecordType::A, name)?;
        <[u8; 4]>::try_from(rdata.as_slice())
            .map(Ipv4Addr::from)
            .map_err(|_| DomainError::Other)
    }

    /// AAAA record lookup; a literal IPv6 address is returned as-is.
    pub fn resolve_ipv6(&mut self, name: &str) -> Result<Ipv6Addr, DomainError> {
        if let Ok(addr) = name.parse::<Ipv6Addr>() {
            return Ok(addr);
        }

        let rdata = self.resolve_blocking(RecordType::AAAA, name)?;
        <[u8; 16]>::try_from(rdata.as_slice())
            .map(Ipv6Addr::from)
            .map_err(|_| DomainError::Other)
    }

    /// Closes every socket and forgets all queries, deferred ones included.
    ///
    /// Returns how many queries were abandoned.
    pub fn shutdown(&mut self) -> usize {
        let abandoned = self.active.len() + self.deferred.len();
        self.active.clear();
        self.deferred.clear();
        info!(abandoned, "Resolver shut down");
        abandoned
    }
}

fn deliver<C, H>(handler: &mut H, result: DnsResult<C>)
where
    H: ResolutionHandler<C> + ?Sized,
{
    if result.context.is_some() {
        handler.on_result(result);
    }
}
