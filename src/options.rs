//! Encoder configuration.

/// Options the [`Writer`](crate::wire::Writer) and the object binder
/// consult while encoding.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Intern repeated map keys through the key table (`SET_KEY`/`USE_KEY`).
    /// When off, every key is emitted as an inline string. Default true.
    pub use_key_interning: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            use_key_interning: true,
        }
    }
}

impl SerializeOptions {
    /// Options with key interning disabled.
    pub fn plain_keys() -> Self {
        Self {
            use_key_interning: false,
        }
    }
}
