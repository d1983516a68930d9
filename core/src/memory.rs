//! A reference-counted, immutable byte blob (spec §3, "Memory").
//!
//! Once a [`Memory`] is published it never changes; mutating a value means
//! building a new `Memory` and swapping it in. Cloning a `Memory` is a cheap
//! `Arc` bump, so the same backing bytes can be shared by many readers
//! (e.g. several `ReadingHandler`s over one `Buffer`).

use std::ops::Deref;
use std::sync::Arc;

/// An immutable, reference-counted byte buffer.
///
/// `Memory` is the leaf allocation of the object model: a [`Buffer`] in its
/// resident state holds an ordered rope of `Memory` blocks, and the deferred
/// loader materializes exactly one `Memory` per tag on first access.
///
/// [`Buffer`]: https://docs.rs/rsdcm-encoding
#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Arc<[u8]>,
}

impl Memory {
    /// Wraps an owned byte vector without copying it.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Memory { bytes: bytes.into() }
    }

    /// Copies a byte slice into a new `Memory`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Memory { bytes: bytes.into() }
    }

    /// An empty block, useful as the seed of an accumulating rope.
    pub fn empty() -> Self {
        Memory { bytes: Arc::from(&[][..]) }
    }

    /// The number of bytes held by this block.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether this block holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the underlying bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Concatenates a sequence of blocks into a single new `Memory`. Used by
    /// `Buffer::commit` to collapse a rope, and by the image codec bridge
    /// to assemble a multi-fragment pixel-data frame into one contiguous
    /// region before decoding.
    pub fn concat<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Memory>,
    {
        let blocks: Vec<&Memory> = blocks.into_iter().collect();
        if blocks.len() == 1 {
            return blocks[0].clone();
        }
        let total: usize = blocks.iter().map(|m| m.len()).sum();
        let mut out = Vec::with_capacity(total);
        for b in blocks {
            out.extend_from_slice(&b.bytes);
        }
        Memory::from_vec(out)
    }
}

impl Deref for Memory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Memory {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Memory {
    fn from(v: Vec<u8>) -> Self {
        Memory::from_vec(v)
    }
}

impl<'a> From<&'a [u8]> for Memory {
    fn from(v: &'a [u8]) -> Self {
        Memory::from_slice(v)
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_ref() == other.bytes.as_ref()
    }
}

impl Eq for Memory {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_preserves_order() {
        let a = Memory::from_slice(&[1, 2, 3]);
        let b = Memory::from_slice(&[4, 5]);
        let c = Memory::concat([&a, &b]);
        assert_eq!(c.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_block_concat_is_a_clone_not_a_copy() {
        let a = Memory::from_slice(&[9, 9]);
        let c = Memory::concat([&a]);
        assert_eq!(c.as_slice(), a.as_slice());
    }

    #[test]
    fn clone_shares_the_allocation() {
        let a = Memory::from_vec(vec![1, 2, 3, 4]);
        let b = a.clone();
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
