//! Type-level proof that an error was reported.

/// Proof that at least one error diagnostic was recorded.
///
/// Only a [`DiagnosticBag`](crate::DiagnosticBag) that actually holds an
/// error can produce one, so `Result<T, ErrorGuaranteed>` means "failed, and
/// the reason is already in the diagnostics".
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// Some guarantee when `error_count > 0`.
    pub fn from_error_count(error_count: usize) -> Option<Self> {
        (error_count > 0).then(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_count() {
        assert!(ErrorGuaranteed::from_error_count(0).is_none());
        assert!(ErrorGuaranteed::from_error_count(3).is_some());
    }
}
