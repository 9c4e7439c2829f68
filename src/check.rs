//! Consistency checker.
//!
//! `check` walks the heap twice — once physically via `next_blk`, once
//! through the free-list index — and cross-validates what each walk finds.
//! It is a diagnostic, not something the allocator calls on its own hot
//! path; tests call it between operations to catch an invariant break as
//! close as possible to the operation that caused it.

use crate::allocator::Allocator;
use crate::block::{is_alloc, next_blk, pred, size, succ, DWORD};
use crate::size_class::{class_of, CLASSES};

/// Returns `true` iff every invariant the allocator is supposed to
/// maintain (boundary-tag agreement, alignment, no uncoalesced runs,
/// correct size-class placement, well-formed free lists, matching free
/// counts) currently holds.
///
/// # Safety
/// `allocator` must have been through `Allocator::init` and not be
/// concurrently mutated (true by construction: this crate has no
/// concurrency story).
pub unsafe fn check(allocator: &Allocator) -> bool {
  unsafe {
    let (walk_ok, free_count_walk, free_bytes_walk) = walk_heap(allocator);
    if !walk_ok {
      return false;
    }

    let (list_ok, free_count_list, free_bytes_list) = walk_free_lists(allocator);
    if !list_ok {
      return false;
    }

    free_count_walk == free_count_list && free_bytes_walk == free_bytes_list
  }
}

/// Walks every block between the prologue and the epilogue via `next_blk`,
/// checking I1 (header == footer), I2 (size well-formed), I3 (D-aligned
/// payload pointer), I4 (no two adjacent free blocks), and I8 (monotonic,
/// non-overlapping addresses). Returns whether everything held, plus the
/// free block count and total free bytes seen.
unsafe fn walk_heap(allocator: &Allocator) -> (bool, usize, usize) {
  unsafe {
    let epilogue = allocator.epilogue();
    // The prologue itself is a sentinel (size D, below MIN_BLOCK_SIZE by
    // design) and is exempt from I2; start the per-block checks at its
    // physical successor.
    let mut bp = next_blk(allocator.heap_start());

    let mut prev_addr = allocator.heap_start() as usize;
    let mut free_count = 0usize;
    let mut free_bytes = 0usize;

    while bp != epilogue {
      let hdr_tag = *crate::block::hdr(bp);
      let ftr_tag = *crate::block::ftr(bp);
      if hdr_tag != ftr_tag {
        return (false, 0, 0); // I1
      }

      let block_size = size(bp);
      if block_size % DWORD != 0 || block_size < crate::block::MIN_BLOCK_SIZE {
        return (false, 0, 0); // I2
      }

      if (bp as usize) % DWORD != 0 {
        return (false, 0, 0); // I3
      }

      if (bp as usize) <= prev_addr {
        return (false, 0, 0); // I8 (monotonic progress, no overlap)
      }
      prev_addr = bp as usize;

      if !is_alloc(bp) {
        if !is_alloc(next_blk(bp)) {
          return (false, 0, 0); // I4 — the epilogue is always allocated
        }
        free_count += 1;
        free_bytes += block_size;
      }

      bp = next_blk(bp);
    }

    (true, free_count, free_bytes)
  }
}

/// Walks every size class's list, checking I5 (only free blocks appear),
/// I6 (class placement), and I7 (pred/succ are inverses). Returns whether
/// everything held, plus the free block count and total free bytes seen.
unsafe fn walk_free_lists(allocator: &Allocator) -> (bool, usize, usize) {
  unsafe {
    let free_list = allocator.free_list();
    let mut free_count = 0usize;
    let mut free_bytes = 0usize;

    for class in 0..CLASSES {
      let mut bp = free_list.class_head(class);
      let mut prev: *mut u8 = std::ptr::null_mut();

      while !bp.is_null() {
        if is_alloc(bp) {
          return (false, 0, 0); // I5
        }
        if class_of(size(bp)) != class {
          return (false, 0, 0); // I6
        }
        if pred(bp) != prev {
          return (false, 0, 0); // I7
        }

        free_count += 1;
        free_bytes += size(bp);

        prev = bp;
        bp = succ(bp);
      }
    }

    (true, free_count, free_bytes)
  }
}
