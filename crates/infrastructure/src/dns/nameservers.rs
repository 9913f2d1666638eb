use proxyscan_domain::ResolverConfig;
use smallvec::SmallVec;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, info, warn};

/// Servers retained per address family.
pub const MAX_NAMESERVERS: usize = 8;

/// Resolver addresses every query is sent to, split by family.
///
/// Filled once at startup and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameserverRegistry {
    v4: SmallVec<[Ipv4Addr; MAX_NAMESERVERS]>,
    v6: SmallVec<[Ipv6Addr; MAX_NAMESERVERS]>,
}

impl NameserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the registry from configuration.
    ///
    /// An inline `nameservers` list wins; otherwise the dedicated servers
    /// file is read, falling back to the system resolver file.
    pub fn load(config: &ResolverConfig) -> Self {
        let registry = if !config.nameservers.is_empty() {
            Self::from_addresses(config.nameservers.iter().map(String::as_str))
        } else if let Ok(contents) = std::fs::read_to_string(&config.servers_file) {
            debug!(path = %config.servers_file, "Reading nameserver list");
            Self::parse_servers_file(&contents)
        } else {
            Self::from_resolv_conf(Path::new(&config.resolv_conf))
        };

        info!(
            ipv4 = registry.v4.len(),
            ipv6 = registry.v6.len(),
            "Nameservers loaded"
        );

        registry
    }

    fn from_resolv_conf(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_resolv_conf(&contents),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to open resolver file");
                Self::default()
            }
        }
    }

    /// One literal address per line; anything unparseable is skipped.
    pub fn parse_servers_file(contents: &str) -> Self {
        Self::from_addresses(contents.lines())
    }

    /// Picks up `nameserver <address>` lines and ignores everything else.
    pub fn parse_resolv_conf(contents: &str) -> Self {
        Self::from_addresses(contents.lines().filter_map(|line| {
            let rest = line.strip_prefix("nameserver")?;
            rest.starts_with([' ', '\t']).then_some(rest)
        }))
    }

    pub fn from_addresses<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut registry = Self::default();
        for line in lines {
            let line = line.trim();
            match line.parse::<IpAddr>() {
                Ok(addr) => {
                    registry.add(addr);
                }
                Err(_) if !line.is_empty() => {
                    debug!(line = %line, "Skipping unparseable nameserver entry");
                }
                Err(_) => {}
            }
        }
        registry
    }

    /// Adds a server unless its family is already full.
    pub fn add(&mut self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) if self.v4.len() < MAX_NAMESERVERS => self.v4.push(v4),
            IpAddr::V6(v6) if self.v6.len() < MAX_NAMESERVERS => self.v6.push(v6),
            _ => return false,
        }
        true
    }

    pub fn ipv4(&self) -> &[Ipv4Addr] {
        &self.v4
    }

    pub fn ipv6(&self) -> &[Ipv6Addr] {
        &self.v6
    }

    pub fn has_ipv6(&self) -> bool {
        !self.v6.is_empty()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolv_conf_keyword_needs_whitespace() {
        let registry = NameserverRegistry::parse_resolv_conf(
            "nameserver\t192.0.2.1\nnameservers 192.0.2.2\nnameserver192.0.2.3\n",
        );
        assert_eq!(registry.ipv4(), &["192.0.2.1".parse::<Ipv4Addr>().unwrap()]);
    }

    #[test]
    fn test_family_cap() {
        let mut registry = NameserverRegistry::new();
        for i in 0..MAX_NAMESERVERS as u8 {
            assert!(registry.add(IpAddr::from([10, 0, 0, i])));
        }
        assert!(!registry.add(IpAddr::from([10, 0, 0, 99])));
        assert!(registry.add("::1".parse().unwrap()));
        assert_eq!(registry.len(), MAX_NAMESERVERS + 1);
    }
}
