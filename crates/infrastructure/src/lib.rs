//! Proxyscan Infrastructure Layer
pub mod clock;
pub mod dns;
pub mod negcache;

pub use clock::SystemClock;
pub use dns::{NameserverRegistry, QueryHandle, Resolver};
pub use negcache::NegativeCache;
