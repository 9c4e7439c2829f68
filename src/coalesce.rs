//! Merging a free block with its free physical neighbors.
//!
//! `coalesce` follows discipline A: by the time it's called, `bp` is
//! already linked into the free-list index (`free` inserts before calling
//! this; `Allocator::extend` inserts the freshly grown block before calling
//! this too). Coalesce's job is to remove `bp` and whichever neighbors turn
//! out to be free, then insert the merged result exactly once. On return,
//! the merged block is in the index — never zero times, never twice.

use crate::block::{is_alloc, next_blk, prev_blk, size, stamp};
use crate::free_list::FreeList;

/// Merges `bp` with any free physical neighbor, in place.
///
/// `bp` must already be the head of its own (possibly single-element) run
/// in the free-list index. Returns the payload pointer of the merged block,
/// which may or may not be `bp` itself depending on which neighbor (if any)
/// absorbed it.
///
/// # Safety
/// `bp` must be a currently-free, validly stamped block already present in
/// `free_list`, and its physical neighbors (as found via `next_blk`/
/// `prev_blk`) must themselves be validly stamped blocks or sentinels.
pub unsafe fn coalesce(bp: *mut u8, free_list: &mut FreeList) -> *mut u8 {
  unsafe {
    let prev = prev_blk(bp);
    let next = next_blk(bp);

    let prev_alloc = is_alloc(prev);
    let next_alloc = is_alloc(next);

    match (prev_alloc, next_alloc) {
      (true, true) => bp,
      (true, false) => {
        free_list.remove(bp);
        free_list.remove(next);
        let merged_size = size(bp) + size(next);
        stamp(bp, merged_size, false);
        free_list.insert(bp);
        bp
      }
      (false, true) => {
        free_list.remove(bp);
        free_list.remove(prev);
        let merged_size = size(prev) + size(bp);
        stamp(prev, merged_size, false);
        free_list.insert(prev);
        prev
      }
      (false, false) => {
        free_list.remove(bp);
        free_list.remove(prev);
        free_list.remove(next);
        let merged_size = size(prev) + size(bp) + size(next);
        stamp(prev, merged_size, false);
        free_list.insert(prev);
        prev
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::{size as block_size, MIN_BLOCK_SIZE, WORD};

  // Builds a flat in-memory chain: prologue-like sentinel, three blocks,
  // epilogue-like sentinel, all allocated except where `free_mask` says
  // otherwise. Returns payload pointers to the three middle blocks.
  unsafe fn build_chain(buf: &mut [u8], sizes: [usize; 3], free_mask: [bool; 3]) -> [*mut u8; 3] {
    unsafe {
      let mut addr = buf.as_mut_ptr().add(WORD);
      stamp(addr, WORD * 2, true); // left sentinel, allocated
      let mut bps = [std::ptr::null_mut(); 3];
      for i in 0..3 {
        addr = next_blk(addr);
        stamp(addr, sizes[i], !free_mask[i]);
        bps[i] = addr;
      }
      addr = next_blk(addr);
      stamp(addr, WORD * 2, true); // right sentinel, allocated
      bps
    }
  }

  #[test]
  fn both_neighbors_allocated_leaves_block_untouched() {
    let mut buf = [0u8; 512];
    let mut free_list = FreeList::new();

    unsafe {
      let bps = build_chain(&mut buf, [64, 64, 64], [false, true, false]);
      free_list.insert(bps[1]);

      let merged = coalesce(bps[1], &mut free_list);
      assert_eq!(merged, bps[1]);
      assert_eq!(block_size(merged), 64);
    }
  }

  #[test]
  fn free_next_neighbor_merges_rightward() {
    let mut buf = [0u8; 512];
    let mut free_list = FreeList::new();

    unsafe {
      let bps = build_chain(&mut buf, [MIN_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_BLOCK_SIZE], [false, true, false]);
      free_list.insert(bps[1]);
      free_list.insert(bps[2]);

      let merged = coalesce(bps[1], &mut free_list);
      assert_eq!(merged, bps[1]);
      assert_eq!(block_size(merged), MIN_BLOCK_SIZE * 2);
      assert!(free_list.pop_fit(MIN_BLOCK_SIZE * 2) == merged);
    }
  }

  #[test]
  fn free_prev_neighbor_merges_leftward() {
    let mut buf = [0u8; 512];
    let mut free_list = FreeList::new();

    unsafe {
      let bps = build_chain(&mut buf, [MIN_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_BLOCK_SIZE], [true, true, false]);
      free_list.insert(bps[0]);
      free_list.insert(bps[1]);

      let merged = coalesce(bps[1], &mut free_list);
      assert_eq!(merged, bps[0]);
      assert_eq!(block_size(merged), MIN_BLOCK_SIZE * 2);
    }
  }

  #[test]
  fn both_neighbors_free_merge_into_one_span() {
    let mut buf = [0u8; 512];
    let mut free_list = FreeList::new();

    unsafe {
      let bps = build_chain(&mut buf, [MIN_BLOCK_SIZE, MIN_BLOCK_SIZE, MIN_BLOCK_SIZE], [true, true, true]);
      free_list.insert(bps[0]);
      free_list.insert(bps[1]);
      free_list.insert(bps[2]);

      let merged = coalesce(bps[1], &mut free_list);
      assert_eq!(merged, bps[0]);
      assert_eq!(block_size(merged), MIN_BLOCK_SIZE * 3);
      assert!(free_list.pop_fit(MIN_BLOCK_SIZE * 3) == merged);
      assert!(free_list.pop_fit(MIN_BLOCK_SIZE).is_null());
    }
  }
}
