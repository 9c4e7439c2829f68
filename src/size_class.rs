//! Segregated size-class mapping.
//!
//! The free list is split into [`CLASSES`] buckets, each covering a
//! doubling range of block sizes. Bucket 0 covers everything up to and
//! including the minimum block size (32 bytes); bucket `i` above that
//! holds free blocks sized `(2^(i+4), 2^(i+5)]` bytes, with the last
//! bucket catching everything above that run.

/// Number of segregated size classes.
pub const CLASSES: usize = 20;

/// Maps a block size to the index of the free list it belongs in.
///
/// `size` is always a total block size (header + payload + footer), never
/// a raw request size. Classes are ordered by increasing size and the
/// mapping is monotonic: `size_a <= size_b` implies `class_of(size_a) <=
/// class_of(size_b)`.
#[inline]
pub fn class_of(size: usize) -> usize {
  let mut class = 0;
  let mut threshold: usize = 1 << 5;

  while class < CLASSES - 1 && size > threshold {
    threshold <<= 1;
    class += 1;
  }

  class
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::MIN_BLOCK_SIZE;

  #[test]
  fn smallest_block_maps_to_first_class() {
    assert_eq!(class_of(MIN_BLOCK_SIZE), 0);
  }

  #[test]
  fn mapping_is_monotonic_across_a_size_sweep() {
    let mut prev_class = class_of(MIN_BLOCK_SIZE);
    let mut size = MIN_BLOCK_SIZE;

    while size < (1 << 24) {
      let class = class_of(size);
      assert!(class >= prev_class, "class_of regressed at size {size}");
      assert!(class < CLASSES);
      prev_class = class;
      size += 16;
    }
  }

  #[test]
  fn huge_sizes_saturate_at_the_top_class() {
    assert_eq!(class_of(usize::MAX), CLASSES - 1);
  }
}
