//! Bitmask value types for aggregate household state.
//!
//! Each tracked device owns one [`Bit`]. Masks are plain values; the only
//! owner allowed to mutate the live masks is the state aggregator in the
//! application layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Width of every mask, in bits.
pub const MASK_WIDTH: u8 = 32;

/// Position of one device inside a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Bit(pub(crate) u8);

impl Bit {
    /// Build a bit index.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BitOutOfRange`] if `index >= MASK_WIDTH`.
    pub fn new(index: u8) -> Result<Self, ValidationError> {
        if index >= MASK_WIDTH {
            return Err(ValidationError::BitOutOfRange {
                bit: index,
                max: MASK_WIDTH - 1,
            });
        }
        Ok(Self(index))
    }

    /// Zero-based index of the bit.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    fn value(self) -> u32 {
        1 << self.0
    }
}

impl TryFrom<u8> for Bit {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Bit> for u8 {
    fn from(value: Bit) -> Self {
        value.0
    }
}

macro_rules! define_mask {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Mask with no bit set.
            pub const EMPTY: Self = Self(0);

            /// Wrap a raw value (e.g. one read back from storage).
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw value, for persistence and logging.
            #[must_use]
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Mask with exactly the given bits set.
            #[must_use]
            pub fn from_bits(bits: impl IntoIterator<Item = Bit>) -> Self {
                bits.into_iter().fold(Self::EMPTY, |mask, bit| mask.with(bit))
            }

            /// Copy of `self` with `bit` set.
            #[must_use]
            pub fn with(self, bit: Bit) -> Self {
                Self(self.0 | bit.value())
            }

            /// Copy of `self` with `bit` cleared.
            #[must_use]
            pub fn without(self, bit: Bit) -> Self {
                Self(self.0 & !bit.value())
            }

            /// Whether `bit` is set.
            #[must_use]
            pub fn contains(self, bit: Bit) -> bool {
                self.0 & bit.value() != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

define_mask!(
    /// One bit per tracked window; a set bit means closed.
    WindowMask
);

define_mask!(
    /// One bit per timer-controlled light; a set bit means on.
    LightMask
);

#[cfg(test)]
mod tests {
    use super::*;

    fn bit(i: u8) -> Bit {
        Bit::new(i).unwrap()
    }

    #[test]
    fn should_reject_bits_outside_mask_width() {
        assert!(Bit::new(31).is_ok());
        assert_eq!(
            Bit::new(32),
            Err(ValidationError::BitOutOfRange { bit: 32, max: 31 })
        );
    }

    #[test]
    fn should_set_and_clear_bits_idempotently() {
        let mask = WindowMask::EMPTY.with(bit(2)).with(bit(2));
        assert_eq!(mask.as_raw(), 0b100);
        assert!(mask.contains(bit(2)));
        assert_eq!(mask.without(bit(2)).without(bit(2)), WindowMask::EMPTY);
    }

    #[test]
    fn should_build_mask_from_bits() {
        let all = WindowMask::from_bits((0..5).map(bit));
        assert_eq!(all.as_raw(), 0b11111);
        assert_eq!(all.to_string(), "0x1f");
    }

    #[test]
    fn should_leave_other_bits_untouched() {
        let lights = LightMask::from_raw(0b1010).without(bit(1));
        assert_eq!(lights.as_raw(), 0b1000);
    }
}
