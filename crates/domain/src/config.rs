pub mod errors;
pub mod logging;
pub mod negcache;
pub mod resolver;
pub mod root;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use negcache::NegCacheConfig;
pub use resolver::ResolverConfig;
pub use root::{CliOverrides, Config};
