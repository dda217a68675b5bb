use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Creates a new `u4`, or `None` if the value does not fit in 4 bits.
    pub const fn try_new(value: u8) -> Option<Self> {
        if value <= 0x0F { Some(Self(value)) } else { None }
    }

    /// Creates a `u4` from the low nibble of `value`.
    pub const fn low(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl From<u4> for u16 {
    fn from(v: u4) -> u16 {
        v.0 as u16
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

/// A 12-bit address, the `nnn` operand of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub struct u12(u16);

impl u12 {
    /// Creates a new `u12`, keeping only the low 12 bits of `value`.
    pub const fn new(value: u16) -> Self {
        Self(value & 0x0FFF)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<u12> for u16 {
    fn from(v: u12) -> u16 {
        v.0
    }
}

impl From<u12> for usize {
    fn from(v: u12) -> usize {
        v.0 as usize
    }
}

/// Splits an instruction word into its four nibbles, most significant first.
pub const fn split(word: u16) -> [u4; 4] {
    [
        u4(((word & 0xF000) >> 12) as u8),
        u4(((word & 0x0F00) >> 8) as u8),
        u4(((word & 0x00F0) >> 4) as u8),
        u4((word & 0x000F) as u8),
    ]
}

/// Inverse of [`split`].
pub const fn join(nibbles: [u4; 4]) -> u16 {
    (nibbles[0].0 as u16) << 12
        | (nibbles[1].0 as u16) << 8
        | (nibbles[2].0 as u16) << 4
        | nibbles[3].0 as u16
}
