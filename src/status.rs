//! The 32-byte special-key status buffer.
//!
//! A `StatusBuffer` is either all zero (unknown / degraded) or a verbatim
//! copy of a validated firmware response.  The bytes are opaque: nothing in
//! this crate decodes individual key codes.

/// Length of the EVBU status buffer returned by the EV20 method.
pub const STATUS_LEN: usize = 32;

/// Fixed-size snapshot of the firmware event buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusBuffer([u8; STATUS_LEN]);

impl StatusBuffer {
    /// The all-zero "unknown / safe" buffer.
    pub const ZEROED: Self = Self([0; STATUS_LEN]);

    pub const fn new(bytes: [u8; STATUS_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a slice of exactly [`STATUS_LEN`] bytes.  Any other length
    /// yields `None`; there is no truncation or padding.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; STATUS_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub const fn as_bytes(&self) -> &[u8; STATUS_LEN] {
        &self.0
    }

    pub const fn into_bytes(self) -> [u8; STATUS_LEN] {
        self.0
    }

    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl Default for StatusBuffer {
    fn default() -> Self {
        Self::ZEROED
    }
}

impl From<[u8; STATUS_LEN]> for StatusBuffer {
    fn from(bytes: [u8; STATUS_LEN]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Debug for StatusBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StatusBuffer(")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        write!(f, ")")
    }
}
