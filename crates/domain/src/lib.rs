//! Proxyscan Domain Layer
pub mod config;
pub mod dns_record;
pub mod dns_result;
pub mod errors;

pub use config::{CliOverrides, Config, LoggingConfig, NegCacheConfig, ResolverConfig};
pub use dns_record::{RecordType, DNS_CLASS_IN};
pub use dns_result::DnsResult;
pub use errors::DomainError;
