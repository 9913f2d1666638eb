use super::builders::{query_type, ResponseBuilder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// Builds the datagrams sent back for one received query.
pub type Responder = Arc<dyn Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

pub struct MockDnsServer {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    /// Starts a nameserver on an ephemeral loopback port.
    pub async fn start(responder: Responder) -> Result<Self, std::io::Error> {
        Self::start_on(SocketAddr::from(([127, 0, 0, 1], 0)), responder).await
    }

    pub async fn start_on(addr: SocketAddr, responder: Responder) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = queries.clone();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            counter.fetch_add(1, Ordering::SeqCst);
                            for response in responder(&buf[..len]) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr: local_addr,
            queries,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn queries_received(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Answers every A query with `octets` and every AAAA query with `v6`.
    pub fn answering(octets: [u8; 4], v6: [u8; 16]) -> Responder {
        Arc::new(move |query| {
            let qtype = query_type(query);
            let rdata: &[u8] = if qtype == 28 { &v6 } else { &octets };
            vec![ResponseBuilder::reply_to(query).answer(qtype, rdata).build()]
        })
    }

    /// Never replies.
    pub fn silent() -> Responder {
        Arc::new(|_| Vec::new())
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
