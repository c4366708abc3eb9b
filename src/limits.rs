//! Decode-side resource limits.

use crate::error::{Error, Result};

/// Limits the [`Reader`](crate::wire::Reader) enforces while decoding.
///
/// Every limit is checked *before* the corresponding allocation, so a
/// hostile length prefix fails without reserving memory for it. The depth
/// limit is enforced by the binder and the dynamic reader, which are the
/// layers that recurse; the low-level reader does not track depth across
/// calls.
#[derive(Debug, Clone)]
pub struct ReaderLimits {
    /// Maximum UTF-8 string payload in bytes. Default 10 MiB.
    pub max_string_length: usize,
    /// Maximum binary payload in bytes. Default 100 MiB.
    pub max_binary_length: usize,
    /// Maximum number of interned keys per stream. Default 10 000.
    pub max_key_table_size: usize,
    /// Maximum number of struct templates per stream. Default 1 000.
    pub max_struct_table_size: usize,
    /// Maximum container nesting depth. Default 100.
    pub max_depth: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_string_length: 10 * 1024 * 1024,
            max_binary_length: 100 * 1024 * 1024,
            max_key_table_size: 10_000,
            max_struct_table_size: 1_000,
            max_depth: 100,
        }
    }
}

impl ReaderLimits {
    pub(crate) fn check(what: &'static str, actual: usize, limit: usize) -> Result<()> {
        if actual > limit {
            Err(Error::LimitExceeded {
                what,
                actual,
                limit,
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_string(&self, len: usize) -> Result<()> {
        Self::check("string length", len, self.max_string_length)
    }

    pub(crate) fn check_binary(&self, len: usize) -> Result<()> {
        Self::check("binary length", len, self.max_binary_length)
    }

    pub(crate) fn check_key_table(&self, len: usize) -> Result<()> {
        Self::check("key table size", len, self.max_key_table_size)
    }

    pub(crate) fn check_struct_table(&self, len: usize) -> Result<()> {
        Self::check("struct table size", len, self.max_struct_table_size)
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<()> {
        Self::check("nesting depth", depth, self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = ReaderLimits::default();
        assert_eq!(limits.max_string_length, 10 * 1024 * 1024);
        assert_eq!(limits.max_binary_length, 100 * 1024 * 1024);
        assert_eq!(limits.max_key_table_size, 10_000);
        assert_eq!(limits.max_struct_table_size, 1_000);
        assert_eq!(limits.max_depth, 100);
    }

    #[test]
    fn check_rejects_over_limit_only() {
        let limits = ReaderLimits {
            max_string_length: 10,
            ..ReaderLimits::default()
        };
        assert!(limits.check_string(10).is_ok());
        assert!(matches!(
            limits.check_string(11),
            Err(Error::LimitExceeded { what: "string length", .. })
        ));
    }
}
