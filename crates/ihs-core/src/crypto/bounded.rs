//! A fixed-capacity byte buffer that wipes its contents on drop.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroize;

/// Returned when data would overflow a [`BoundedBuffer`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("buffer capacity {capacity} exceeded: {requested} bytes requested")]
pub struct CapacityError {
    pub capacity: usize,
    pub requested: usize,
}

/// Holds at most `N` bytes and zeroizes them when dropped.
///
/// Input longer than `N` is rejected and wiped.
pub struct BoundedBuffer<const N: usize> {
    bytes: Vec<u8>,
}

impl<const N: usize> BoundedBuffer<N> {
    /// Takes ownership of `bytes` if they fit; otherwise wipes them and fails.
    pub fn try_from_vec(mut bytes: Vec<u8>) -> Result<Self, CapacityError> {
        if bytes.len() > N {
            let requested = bytes.len();
            bytes.zeroize();
            return Err(CapacityError {
                capacity: N,
                requested,
            });
        }
        Ok(Self { bytes })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<const N: usize> Drop for BoundedBuffer<N> {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl<const N: usize> fmt::Debug for BoundedBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBuffer")
            .field("capacity", &N)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_vec_accepts_exact_capacity() {
        let buf = BoundedBuffer::<4>::try_from_vec(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_try_from_vec_rejects_oversized_input() {
        let err = BoundedBuffer::<2>::try_from_vec(vec![0; 3]).unwrap_err();
        assert_eq!(
            err,
            CapacityError {
                capacity: 2,
                requested: 3
            }
        );
    }

    #[test]
    fn test_debug_hides_contents() {
        let buf = BoundedBuffer::<8>::try_from_vec(vec![0xAB; 8]).unwrap();
        let text = format!("{buf:?}");
        assert!(!text.contains("171"));
        assert!(text.contains("len: 8"));
    }
}
