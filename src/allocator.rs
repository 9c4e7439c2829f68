//! The allocator front end: `init`, `malloc`, `free`, `realloc`.
//!
//! `Allocator` groups the heap, the segregated free-list index, and the
//! heap-start pointer into one value whose lifetime the caller owns —
//! there is no process-global singleton here, unlike the design this
//! crate's algorithms are modeled on, which kept all of this in `static`s.

use std::ptr;

use crate::block::{pred, set_pred, set_succ, size, stamp, succ, DWORD, MIN_BLOCK_SIZE, WORD};
use crate::coalesce::coalesce;
use crate::error::AllocError;
use crate::free_list::FreeList;
use crate::heap::Heap;

/// Initial heap growth requested by `init`, in bytes.
pub const CHUNKSIZE: usize = 128;
/// Minimum growth requested by `malloc` on a miss, in bytes.
pub const PAGE: usize = 4096;

/// A segregated-fit, boundary-tag allocator over one sbrk-grown heap.
pub struct Allocator {
  heap: Heap,
  free_list: FreeList,
  /// Payload pointer of the prologue sentinel; the starting point for any
  /// full-heap walk (the consistency checker, heap-wide byte accounting).
  heap_start: *mut u8,
}

impl Allocator {
  /// Lays down the prologue/epilogue and performs the initial heap growth.
  ///
  /// Mirrors §6's `0 ok / −1 fail` table as `Ok`/`Err` rather than an
  /// integer return code, since this crate has no process-global allocator
  /// for a C-style `-1` to signal against.
  pub fn init() -> Result<Self, AllocError> {
    unsafe {
      let heap = Heap::init()?;
      let heap_start = {
        // The prologue's payload pointer is one word before the epilogue's
        // *header*, minus the epilogue/prologue gap at this point in
        // initialization: right after `Heap::init`, the epilogue sits
        // immediately after the prologue, so walking backward by the
        // prologue's own (degenerate) footer gives us its bp directly.
        crate::block::prev_blk(heap.epilogue())
      };

      let mut allocator = Self {
        heap,
        free_list: FreeList::new(),
        heap_start,
      };

      allocator.extend(CHUNKSIZE / WORD)?;
      Ok(allocator)
    }
  }

  /// Rounds a requested payload size up to a legal block size: room for
  /// header, footer, and payload, double-word aligned, at least
  /// `MIN_BLOCK_SIZE`.
  fn adjust_size(size: usize) -> usize {
    if size == 0 {
      return MIN_BLOCK_SIZE;
    }
    let needed = size + DWORD;
    let rounded = (needed + DWORD - 1) & !(DWORD - 1);
    rounded.max(MIN_BLOCK_SIZE)
  }

  /// Grows the heap by at least `words` words, folding in a trailing free
  /// block if one is present, and returns the (already-coalesced) payload
  /// pointer of the resulting free block.
  unsafe fn extend(&mut self, words: usize) -> Result<*mut u8, AllocError> {
    unsafe {
      let words = if words % 2 != 0 { words + 1 } else { words };
      let mut bytes = words * WORD;

      if let Some(trailing) = self.heap.trailing_free_block() {
        let trailing_size = size(trailing);
        if trailing_size >= bytes {
          return Ok(trailing);
        }
        bytes -= trailing_size;
      }

      let new_block = self.heap.grow(bytes)?;
      self.free_list.insert(new_block);
      Ok(coalesce(new_block, &mut self.free_list))
    }
  }

  /// Allocates `size` bytes, returning a double-word-aligned payload
  /// pointer, or null on failure or a zero-size request.
  pub fn malloc(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let asize = Self::adjust_size(size);

    unsafe {
      let fit = self.free_list.pop_fit(asize);
      if !fit.is_null() {
        crate::place::place(fit, asize, &mut self.free_list);
        return fit;
      }

      let extend_words = asize.max(PAGE) / WORD;
      let grown = match self.extend(extend_words) {
        Ok(bp) => bp,
        Err(_) => return ptr::null_mut(),
      };

      crate::place::place(grown, asize, &mut self.free_list);
      grown
    }
  }

  /// Releases a block previously returned by `malloc`/`realloc`, merging
  /// it with any free physical neighbor. A null `bp` is a no-op.
  ///
  /// # Safety
  /// `bp` must have been returned by this allocator and not already freed.
  pub unsafe fn free(&mut self, bp: *mut u8) {
    unsafe {
      if bp.is_null() {
        return;
      }
      let block_size = size(bp);
      stamp(bp, block_size, false);
      self.free_list.insert(bp);
      coalesce(bp, &mut self.free_list);
    }
  }

  /// Frees `bp` without attempting to coalesce it with either neighbor.
  ///
  /// Used only by `realloc`'s grow path, which needs `bp`'s bytes to stay
  /// put (and its identity to stay recoverable) for the duration of a
  /// `malloc` call that might otherwise absorb it into a merged block and
  /// scribble link pointers over payload the caller hasn't had a chance to
  /// copy out yet. This replaces a cross-call "don't coalesce" flag with a
  /// function that only ever does one thing.
  unsafe fn free_no_coalesce(&mut self, bp: *mut u8) {
    unsafe {
      let block_size = size(bp);
      stamp(bp, block_size, false);
      self.free_list.insert(bp);
    }
  }

  /// Resizes the allocation at `bp` to `new_size` bytes, preserving the
  /// lesser of the old and new payload's bytes.
  ///
  /// `size == 0` behaves like `free`. `bp == null` behaves like `malloc`.
  /// If the block is already big enough, it is returned unchanged.
  ///
  /// # Safety
  /// `bp` must be null or a pointer previously returned by this allocator.
  pub unsafe fn realloc(&mut self, bp: *mut u8, new_size: usize) -> *mut u8 {
    unsafe {
      if new_size == 0 {
        self.free(bp);
        return ptr::null_mut();
      }
      if bp.is_null() {
        return self.malloc(new_size);
      }

      let asize = Self::adjust_size(new_size);
      let old_size = size(bp);
      if asize <= old_size {
        return bp;
      }

      let old_capacity = old_size - DWORD;
      // Every block's payload capacity is at least 2W (MIN_BLOCK_SIZE
      // guarantees room for both free-list link words), so these two
      // reads are always in bounds. Save them before free_no_coalesce's
      // insert overwrites them with real free-list links.
      let saved_pred = pred(bp);
      let saved_succ = succ(bp);

      self.free_no_coalesce(bp);

      let new_bp = self.malloc(new_size * 2);
      if new_bp.is_null() {
        // bp is still sitting in the free list from free_no_coalesce;
        // pull it back out before handing it back to the caller as a
        // live, allocated block again.
        self.free_list.remove(bp);
        stamp(bp, old_size, true);
        set_pred(bp, saved_pred);
        set_succ(bp, saved_succ);
        return ptr::null_mut();
      }

      // bp's first two words currently hold free-list link garbage (or,
      // if malloc happened to reuse bp itself, whatever place() left
      // there). Either way the copy source for those two words is wrong;
      // only newptr's copy of them needs to be right, which we fix up
      // directly afterward rather than trying to un-corrupt bp first.
      let copy_len = new_size.min(old_capacity);
      if new_bp != bp {
        ptr::copy_nonoverlapping(bp, new_bp, copy_len);
      }
      set_pred(new_bp, saved_pred);
      set_succ(new_bp, saved_succ);

      new_bp
    }
  }

  /// Payload pointer of the prologue sentinel, the start of any full-heap
  /// walk. Used by the consistency checker.
  pub(crate) fn heap_start(&self) -> *mut u8 {
    self.heap_start
  }

  /// Current epilogue payload pointer. Used by the consistency checker.
  pub(crate) fn epilogue(&self) -> *mut u8 {
    self.heap.epilogue()
  }

  /// Borrow of the free-list index. Used by the consistency checker.
  pub(crate) fn free_list(&self) -> &FreeList {
    &self.free_list
  }

  /// Total bytes spanned by every block from the prologue through the
  /// epilogue, prologue included. Used by churn tests to reconcile
  /// heap-wide byte accounting against live allocations and free bytes.
  pub(crate) fn span_bytes(&self) -> usize {
    unsafe { self.heap.span_bytes(self.heap_start) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::next_blk;
  use crate::check::check;

  #[test]
  fn tiny_alloc_write_and_free() {
    let mut a = Allocator::init().unwrap();

    unsafe {
      let p = a.malloc(1) as *mut u8;
      assert!(!p.is_null());
      assert_eq!((p as usize) % DWORD, 0);

      p.write(0xAA);
      assert_eq!(p.read(), 0xAA);

      a.free(p);
      assert!(check(&a));
    }
  }

  #[test]
  fn freed_adjacent_blocks_coalesce_into_one() {
    let mut a = Allocator::init().unwrap();

    unsafe {
      let p = a.malloc(16);
      let q = a.malloc(16);
      assert!(!p.is_null() && !q.is_null());

      let p_size = size(p);
      let q_size = size(q);

      a.free(p);
      a.free(q);

      assert!(check(&a));

      // One of p, q is now the head of a merged block spanning both.
      let merged = if next_blk(p) == q { p } else { q };
      assert_eq!(size(merged), p_size + q_size);
    }
  }

  #[test]
  fn growth_path_splits_a_freshly_extended_block() {
    let mut a = Allocator::init().unwrap();

    unsafe {
      let p = a.malloc(1 << 20);
      assert!(!p.is_null());
      assert!(check(&a));
    }
  }

  #[test]
  fn trailing_free_block_is_folded_into_the_next_growth() {
    let mut a = Allocator::init().unwrap();

    unsafe {
      let p = a.malloc(100);
      a.free(p);

      let before = a.epilogue() as usize;
      let q = a.malloc(10_000_000);
      assert!(!q.is_null());
      let after = a.epilogue() as usize;

      assert!(after - before < 10_000_000 + 4096);
      assert!(check(&a));
    }
  }

  #[test]
  fn realloc_preserves_payload_bytes() {
    let mut a = Allocator::init().unwrap();

    unsafe {
      let p = a.malloc(32);
      assert!(!p.is_null());
      for i in 0..32u8 {
        p.add(i as usize).write(i + 1);
      }

      let q = a.realloc(p, 200);
      assert!(!q.is_null());
      for i in 0..32u8 {
        assert_eq!(q.add(i as usize).read(), i + 1);
      }
      assert!(check(&a));
    }
  }

  #[test]
  fn realloc_to_null_size_frees() {
    let mut a = Allocator::init().unwrap();
    unsafe {
      let p = a.malloc(64);
      let q = a.realloc(p, 0);
      assert!(q.is_null());
      assert!(check(&a));
    }
  }

  #[test]
  fn realloc_null_pointer_behaves_like_malloc() {
    let mut a = Allocator::init().unwrap();
    unsafe {
      let p = a.realloc(ptr::null_mut(), 48);
      assert!(!p.is_null());
      assert!(check(&a));
    }
  }

  #[test]
  fn churn_keeps_the_heap_consistent() {
    let mut a = Allocator::init().unwrap();
    let mut live: Vec<(*mut u8, usize)> = Vec::new();

    // xorshift32, seeded constant: deterministic without a rand dependency.
    let mut state: u32 = 0x9E3779B9;
    let mut next = || {
      state ^= state << 13;
      state ^= state >> 17;
      state ^= state << 5;
      state
    };

    unsafe {
      for _ in 0..2000 {
        let op = next() % 3;
        if op == 0 || live.is_empty() {
          let req = 1 + (next() as usize % 4096);
          let p = a.malloc(req);
          if !p.is_null() {
            live.push((p, req));
          }
        } else if op == 1 {
          let idx = next() as usize % live.len();
          let (p, _) = live.swap_remove(idx);
          a.free(p);
        } else {
          let idx = next() as usize % live.len();
          let (p, _) = live[idx];
          let new_size = 1 + (next() as usize % 4096);
          let q = a.realloc(p, new_size);
          if !q.is_null() {
            live[idx] = (q, new_size);
          }
        }
        assert!(check(&a));

        let allocated_bytes: usize = live.iter().map(|&(p, _)| size(p)).sum();
        let free_bytes: usize = (0..crate::size_class::CLASSES)
          .flat_map(|class| {
            let mut bp = a.free_list().class_head(class);
            std::iter::from_fn(move || {
              if bp.is_null() {
                None
              } else {
                let current = bp;
                bp = succ(bp);
                Some(current)
              }
            })
          })
          .map(|bp| size(bp))
          .sum();

        // spec.md §8 scenario 6: live + free bytes accounts for every byte
        // of the heap save the prologue's own (fixed) overhead.
        assert_eq!(a.span_bytes() - DWORD, allocated_bytes + free_bytes);
      }
    }
  }
}
