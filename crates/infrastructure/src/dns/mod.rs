pub mod nameservers;
pub mod poll;
pub mod query;
pub mod resolver;
pub mod response;
pub mod transport;
pub mod wire;

pub use nameservers::{NameserverRegistry, MAX_NAMESERVERS};
pub use query::{OutstandingQuery, MAX_LOOKUP_LEN};
pub use resolver::{QueryHandle, Resolver, Retrieval};
pub use response::{ExpectedAnswer, ResponseOutcome, MAX_RDATA_LEN};
pub use transport::{AddressFamily, QuerySocket};
