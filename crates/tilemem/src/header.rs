//! Inline block headers.
//!
//! Every block starts with a fixed 8-byte header stored in the arena itself:
//!
//! ```text
//! offset  0         4        6        7        8
//!         ┌─────────┬────────┬────────┬────────┐
//!         │ size    │ magic  │ status │ (zero) │  payload: `size` bytes ...
//!         │ u32 LE  │ 0xB10C │ 0 / 1  │        │
//!         └─────────┴────────┴────────┴────────┘
//! ```
//!
//! `size` counts payload bytes only. The byte after the payload is the next
//! block's header, or the end of the arena.

/// Size of a block header in bytes.
pub const HEADER_SIZE: usize = 8;

const HEADER_MAGIC: u16 = 0xB10C;
const STATUS_USED: u8 = 0;
const STATUS_FREE: u8 = 1;

/// Decoded form of an inline header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockHeader {
    pub(crate) size: u32,
    pub(crate) is_free: bool,
}

impl BlockHeader {
    pub(crate) fn free(size: u32) -> Self {
        Self {
            size,
            is_free: true,
        }
    }

    pub(crate) fn used(size: u32) -> Self {
        Self {
            size,
            is_free: false,
        }
    }

    /// Bytes covered by this block, header included.
    pub(crate) fn span(&self) -> usize {
        HEADER_SIZE + self.size as usize
    }

    /// Decode the header at `offset`.
    ///
    /// Returns `None` if the header does not fit in `buf` or the bytes are
    /// not a header written by this crate.
    pub(crate) fn read(buf: &[u8], offset: usize) -> Option<Self> {
        let bytes = buf.get(offset..offset.checked_add(HEADER_SIZE)?)?;
        if u16::from_le_bytes([bytes[4], bytes[5]]) != HEADER_MAGIC {
            return None;
        }
        let is_free = match bytes[6] {
            STATUS_FREE => true,
            STATUS_USED => false,
            _ => return None,
        };
        Some(Self {
            size: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            is_free,
        })
    }

    /// Encode this header at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + HEADER_SIZE` exceeds `buf.len()`.
    pub(crate) fn write(&self, buf: &mut [u8], offset: usize) {
        let bytes = &mut buf[offset..offset + HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.size.to_le_bytes());
        bytes[4..6].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
        bytes[6] = if self.is_free { STATUS_FREE } else { STATUS_USED };
        bytes[7] = 0;
    }
}

/// Narrow an in-arena length to the header's size field.
///
/// Arena capacity is validated against `u32::MAX`, so every length that
/// fits inside an arena fits here.
pub(crate) fn to_size(len: usize) -> u32 {
    debug_assert!(len <= u32::MAX as usize, "length {len} exceeds header range");
    len as u32
}
