//! Boundary-tag block layout and the free-block link overlay.
//!
//! A block is addressed by its *payload pointer* `bp`: the address
//! immediately following its header. Every function below takes or returns
//! a payload pointer. They are all `unsafe`: they trust that a well-formed
//! block (or, for the heap's prologue/epilogue sentinels, the degenerate
//! zero-payload block those use) actually sits at that address. This is the
//! crate's unsafe core; everything built on top of it works in terms of
//! these functions rather than raw offsets.
//!
//! Wire layout, header and footer each one word wide:
//!
//! ```text
//!   ┌──────────┬─────────────────────────────┬──────────┐
//!   │  header  │           payload           │  footer  │
//!   │ size|flag│                             │ size|flag│
//!   └──────────┴─────────────────────────────┴──────────┘
//!   ▲          ▲
//!   │          └── bp (the pointer everything else is expressed in terms of)
//!   └── hdr(bp)
//! ```
//!
//! A free block's payload is never read by the user; its first two words
//! are instead the predecessor and successor links of whichever size
//! class's list it belongs to (`free_list::FreeList`).

use std::mem;

/// Machine word size in bytes.
pub const WORD: usize = mem::size_of::<usize>();
/// Double-word size in bytes. Every block's total size is a multiple of
/// this, which is also the allocator's payload alignment.
pub const DWORD: usize = 2 * WORD;
/// Smallest legal block: header, two free-list link words, footer.
pub const MIN_BLOCK_SIZE: usize = 2 * DWORD;

/// Packs a size and an allocated flag into one boundary-tag word.
///
/// `size` must already be a multiple of [`DWORD`] so the flag can live in
/// the size's otherwise-unused low bit.
#[inline]
pub const fn pack(size: usize, alloc: bool) -> usize {
  size | (alloc as usize)
}

/// Size field of a boundary-tag word.
#[inline]
const fn size_of_tag(tag: usize) -> usize {
  tag & !(DWORD - 1)
}

/// Allocated flag of a boundary-tag word.
#[inline]
pub const fn alloc_of_tag(tag: usize) -> bool {
  tag & 1 != 0
}

/// Address of `bp`'s header word.
#[inline]
pub unsafe fn hdr(bp: *mut u8) -> *mut usize {
  unsafe { bp.sub(WORD) as *mut usize }
}

/// Address of `bp`'s footer word, derived from the size the header
/// currently holds.
#[inline]
pub unsafe fn ftr(bp: *mut u8) -> *mut usize {
  unsafe { bp.add(size(bp) - DWORD) as *mut usize }
}

/// Total block size (header + payload + footer), read from the header.
#[inline]
pub unsafe fn size(bp: *mut u8) -> usize {
  unsafe { size_of_tag(hdr(bp).read()) }
}

/// Allocated flag, read from the header.
#[inline]
pub unsafe fn is_alloc(bp: *mut u8) -> bool {
  unsafe { alloc_of_tag(hdr(bp).read()) }
}

/// Writes matching header and footer tags for a block of `size` bytes
/// starting at `bp`.
///
/// The footer address is computed from the `size` argument, not by
/// re-reading the header, so this is safe to call with a `size` smaller
/// than whatever the header currently says. The placer relies on exactly
/// that: it shrinks the header to the split-off size first and then calls
/// `stamp` again for the remainder, never the other way around.
#[inline]
pub unsafe fn stamp(bp: *mut u8, size: usize, alloc: bool) {
  unsafe {
    let tag = pack(size, alloc);
    hdr(bp).write(tag);
    (bp.add(size - DWORD) as *mut usize).write(tag);
  }
}

/// Payload pointer of the block physically following `bp` in the heap.
#[inline]
pub unsafe fn next_blk(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(size(bp)) }
}

/// Payload pointer of the block physically preceding `bp` in the heap.
///
/// Reads the previous block's footer at `bp - DWORD`. This only gives a
/// correct answer when that neighbor's header and footer agree (I1); every
/// path that stamps a block is responsible for keeping that true before any
/// other block's `prev_blk` can observe it.
#[inline]
pub unsafe fn prev_blk(bp: *mut u8) -> *mut u8 {
  unsafe {
    let prev_size = size_of_tag((bp.sub(DWORD) as *mut usize).read());
    bp.sub(prev_size)
  }
}

/// Predecessor link of a free block, overlaid on its first payload word.
#[inline]
pub unsafe fn pred(bp: *mut u8) -> *mut u8 {
  unsafe { (bp as *mut *mut u8).read() }
}

/// Successor link of a free block, overlaid on its second payload word.
#[inline]
pub unsafe fn succ(bp: *mut u8) -> *mut u8 {
  unsafe { (bp as *mut *mut u8).add(1).read() }
}

#[inline]
pub unsafe fn set_pred(bp: *mut u8, val: *mut u8) {
  unsafe { (bp as *mut *mut u8).write(val) }
}

#[inline]
pub unsafe fn set_succ(bp: *mut u8, val: *mut u8) {
  unsafe { (bp as *mut *mut u8).add(1).write(val) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pack_and_unpack_roundtrip() {
    for size in (32usize..=4096).step_by(16) {
      for alloc in [true, false] {
        let tag = pack(size, alloc);
        assert_eq!(size_of_tag(tag), size);
        assert_eq!(alloc_of_tag(tag), alloc);
      }
    }
  }

  #[test]
  fn constants_match_layout() {
    assert_eq!(WORD, 8);
    assert_eq!(DWORD, 16);
    assert_eq!(MIN_BLOCK_SIZE, 32);
  }

  #[test]
  fn stamp_then_traverse_neighbors() {
    // A flat buffer big enough for three adjacent blocks of 32 bytes each.
    let mut buf = [0u8; 96];
    let base = buf.as_mut_ptr();

    unsafe {
      let bp0 = base.add(WORD);
      let bp1 = bp0.add(32);
      let bp2 = bp1.add(32);

      stamp(bp0, 32, true);
      stamp(bp1, 32, false);
      stamp(bp2, 32, true);

      assert_eq!(size(bp0), 32);
      assert!(is_alloc(bp0));
      assert!(!is_alloc(bp1));

      assert_eq!(next_blk(bp0), bp1);
      assert_eq!(next_blk(bp1), bp2);
      assert_eq!(prev_blk(bp2), bp1);
      assert_eq!(prev_blk(bp1), bp0);
    }
  }

  #[test]
  fn free_list_links_roundtrip() {
    let mut buf = [0u8; 64];
    let base = buf.as_mut_ptr();

    unsafe {
      let bp = base.add(WORD);
      stamp(bp, MIN_BLOCK_SIZE, false);

      let a = base;
      let b = base.add(16);
      set_pred(bp, a);
      set_succ(bp, b);

      assert_eq!(pred(bp), a);
      assert_eq!(succ(bp), b);
    }
  }
}
