//! Host side of the resolver: the cooperative loop and the scanning consumer.

use anyhow::{bail, Context};
use proxyscan_application::ports::{Clock, NegativeCachePort, ResolutionHandler};
use proxyscan_domain::{Config, DnsResult, DomainError, RecordType};
use proxyscan_infrastructure::{NegativeCache, Resolver, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CYCLE_INTERVAL: Duration = Duration::from_millis(50);

/// Receives resolved addresses and decides which still need scanning.
struct ScanConsumer<'a> {
    names: &'a [String],
    negcache: &'a mut NegativeCache,
    remaining: usize,
}

impl ResolutionHandler<usize> for ScanConsumer<'_> {
    fn on_result(&mut self, result: DnsResult<usize>) {
        self.remaining = self.remaining.saturating_sub(1);

        let names = self.names;
        let name = result
            .context
            .and_then(|index| names.get(index))
            .map(String::as_str)
            .unwrap_or(result.lookup.as_str());

        let Some(addr) = result.ip_addr() else {
            match &result.outcome {
                Ok(rdata) => println!(
                    "{} {} {}",
                    name,
                    result.record_type,
                    String::from_utf8_lossy(rdata)
                ),
                Err(e) => println!("{} {} error: {}", name, result.record_type, e),
            }
            return;
        };

        let key = addr.to_string();
        match self.negcache.check(&key) {
            Some(entry) => println!(
                "{} {} {} (cleared at {})",
                name, result.record_type, addr, entry.seen
            ),
            None => {
                println!("{} {} {}", name, result.record_type, addr);
                self.negcache.insert(&key);
            }
        }
    }
}

/// Submits every name and cycles the resolver until all results are in.
pub async fn run_resolve(
    config: &Config,
    record_type: RecordType,
    names: &[String],
) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut resolver: Resolver<usize> = Resolver::from_config(&config.resolver, clock.clone());
    if resolver.nameservers().is_empty() {
        bail!("no nameservers configured");
    }

    let mut negcache = NegativeCache::new(&config.negcache, clock);
    let mut expected = 0;

    for (index, name) in names.iter().enumerate() {
        match resolver.submit(record_type, name, Some(index)) {
            // deferred queries still report back
            Ok(_) | Err(DomainError::FdLimit) => expected += 1,
            Err(e) => println!("{} {} error: {}", name, record_type, e),
        }
    }

    let mut consumer = ScanConsumer {
        names,
        negcache: &mut negcache,
        remaining: expected,
    };

    let mut ticker = tokio::time::interval(CYCLE_INTERVAL);
    let mut sweeper =
        tokio::time::interval(Duration::from_secs(config.negcache.rebuild_interval.max(1)));
    sweeper.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while consumer.remaining > 0 {
        tokio::select! {
            _ = ticker.tick() => resolver.cycle(&mut consumer),
            _ = sweeper.tick() => {
                let removed = consumer.negcache.sweep();
                info!(removed, "Negative cache sweep");
            }
            _ = &mut ctrl_c => {
                warn!(remaining = consumer.remaining, "Interrupted");
                break;
            }
        }
    }

    resolver.shutdown();
    Ok(())
}

/// Resolves one name on a blocking thread and prints its address.
pub async fn run_lookup(
    config: &Config,
    record_type: RecordType,
    name: String,
) -> anyhow::Result<()> {
    let resolver_config = config.resolver.clone();

    let addr = tokio::task::spawn_blocking(move || {
        let mut resolver: Resolver<()> =
            Resolver::from_config(&resolver_config, Arc::new(SystemClock));
        match record_type {
            RecordType::A => resolver.resolve_ipv4(&name).map(|ip| ip.to_string()),
            RecordType::AAAA => resolver.resolve_ipv6(&name).map(|ip| ip.to_string()),
            other => resolver
                .resolve_blocking(other, &name)
                .map(|rdata| String::from_utf8_lossy(&rdata).into_owned()),
        }
    })
    .await
    .context("lookup task failed")??;

    println!("{}", addr);
    Ok(())
}
