use num_enum::{IntoPrimitive, TryFromPrimitive, UnsafeFromPrimitive};
use static_assertions::const_assert;

use crate::nibble_ints::U4;

/// Data register of the CHIP-8 machine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    UnsafeFromPrimitive,
)]
#[repr(u8)]
pub enum Register {
    /// Used as the offset by the jump-with-offset quirk.
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    /// Overwritten as the flags register by arithmetic, shift and draw
    /// instructions (carry/borrow/shifted-out bit/collision).
    /// Not safe for general use by a ROM.
    VF,
}

const_assert!(Register::VF as usize == U4::MAX.into_u8() as usize);

impl Register {
    /// Iterate `V0..=last`, in register order.
    /// Used by the block transfer instructions.
    pub fn through(last: Register) -> impl Iterator<Item = Register> {
        // SAFETY: the range is bounded by a valid discriminant.
        (0..=last as u8).map(|i| unsafe { Register::from_unchecked(i) })
    }
}

impl From<Register> for U4 {
    fn from(reg: Register) -> Self {
        // SAFETY: Register has exactly U4::MAX + 1 variants, i.e. the discriminant fits in a nibble.
        unsafe { U4::from_u8_unchecked(reg as u8) }
    }
}

impl From<U4> for Register {
    fn from(val: U4) -> Self {
        // SAFETY: Register has exactly U4::MAX + 1 variants.
        unsafe { Register::from_unchecked(val.into_u8()) }
    }
}
