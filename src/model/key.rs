//! Join key: the geographic code both streams are grouped by.

use std::fmt;

/// Canonical, opaque join key.
///
/// Compared as a plain string, so `"01001" < "01003" < "48201"`.
/// Both streams must agree on the canonical form before entering the join;
/// see [`Key::padded`] for the one normalization the loader applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(String);

impl Key {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Build a key, left-padding all-digit codes with zeros to `width`.
    ///
    /// Codes that contain anything other than ASCII digits, or that are
    /// already at least `width` long, are kept as they are.
    pub fn padded(code: &str, width: Option<usize>) -> Self {
        match width {
            Some(width) if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) => {
                Self(format!("{code:0>width$}"))
            }
            _ => Self::new(code),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
