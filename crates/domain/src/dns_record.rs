mod record_type;

pub use record_type::RecordType;

/// The only query class this resolver ever asks for.
pub const DNS_CLASS_IN: u16 = 1;
