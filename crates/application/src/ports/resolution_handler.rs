use proxyscan_domain::DnsResult;

/// Receives results produced while the resolver is being cycled.
///
/// Only queries submitted with a context reach the handler.
pub trait ResolutionHandler<C> {
    fn on_result(&mut self, result: DnsResult<C>);
}

impl<C, F> ResolutionHandler<C> for F
where
    F: FnMut(DnsResult<C>),
{
    fn on_result(&mut self, result: DnsResult<C>) {
        self(result)
    }
}
