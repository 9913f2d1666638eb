#![allow(dead_code)]
pub mod builders;
pub mod clock;
pub mod dns_server_mock;

pub use builders::{
    drive, loopback_resolver, query_type, resolver_config, Collector, ResponseBuilder,
};
pub use clock::ManualClock;
pub use dns_server_mock::{MockDnsServer, Responder};
