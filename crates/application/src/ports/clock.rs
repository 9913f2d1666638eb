/// Wall-clock source, in whole seconds.
///
/// Query ages and negative-cache freshness are both measured against this,
/// so tests can drive expiry without sleeping.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}
