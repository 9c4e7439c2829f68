//! sbrk-backed heap growth and epilogue bookkeeping.
//!
//! `Heap` owns the two things that make the boundary-tag world well-formed
//! at its edges: the prologue (laid down once, at [`Heap::init`]) and the
//! epilogue, which moves every time the heap grows. Both are stored and
//! read through the same payload-pointer convention as every other block
//! (`block::hdr`/`block::next_blk`/`block::prev_blk` all apply to them
//! unmodified), which is what lets `Allocator::extend` fold a trailing free
//! block into a growth request without a single special case for "am I
//! touching the epilogue."
//!
//! This module does not touch the free-list index; it only knows how to
//! grow the raw byte range and keep the epilogue sentinel honest.

use libc::{c_void, intptr_t, sbrk};

use crate::block::{pack, prev_blk, size, stamp, is_alloc, DWORD, WORD};
use crate::error::AllocError;

/// Owns the sbrk-extended heap range and its epilogue pointer.
pub struct Heap {
  /// Payload-style pointer to the epilogue's (zero-size) header: one word
  /// past the header address, exactly like every other block's `bp`.
  epilogue: *mut u8,
}

/// Raw `sbrk` wrapper. Returns the previous program break, or
/// `AllocError::OutOfMemory` if the host refused to grow.
unsafe fn sbrk_raw(bytes: usize) -> Result<*mut u8, AllocError> {
  unsafe {
    let prev = sbrk(bytes as intptr_t);
    if prev == usize::MAX as *mut c_void {
      return Err(AllocError::OutOfMemory);
    }
    Ok(prev as *mut u8)
  }
}

impl Heap {
  /// Lays out the initial prologue and epilogue.
  ///
  /// Acquires 4 words from the host: one padding word (keeps the prologue
  /// double-word aligned), a D-sized allocated prologue block (header +
  /// footer, no payload), and a zero-size allocated epilogue header.
  ///
  /// # Safety
  /// Must be called at most once per process; it assumes the heap is
  /// currently empty of any allocator-owned metadata.
  pub unsafe fn init() -> Result<Self, AllocError> {
    unsafe {
      let raw = sbrk_raw(4 * WORD)?;
      let base = raw as *mut usize;

      base.write(0); // alignment padding
      base.add(1).write(pack(DWORD, true)); // prologue header
      base.add(2).write(pack(DWORD, true)); // prologue footer
      base.add(3).write(pack(0, true)); // epilogue header

      let epilogue = (base.add(3) as *mut u8).add(WORD);
      Ok(Self { epilogue })
    }
  }

  /// Current epilogue payload pointer.
  pub fn epilogue(&self) -> *mut u8 {
    self.epilogue
  }

  /// Returns the free block immediately preceding the epilogue, if the
  /// heap currently ends in one.
  ///
  /// # Safety
  /// The block physically before the epilogue must be a validly stamped
  /// block (true of any heap that has gone through `init`).
  pub unsafe fn trailing_free_block(&self) -> Option<*mut u8> {
    unsafe {
      let candidate = prev_blk(self.epilogue);
      if is_alloc(candidate) {
        None
      } else {
        Some(candidate)
      }
    }
  }

  /// Extends the heap by exactly `bytes` bytes, stamping the newly
  /// acquired range as one free block and relocating the epilogue past it.
  ///
  /// `bytes` must already be a multiple of `DWORD`. Returns the payload
  /// pointer of the new free block. The new block is not yet linked into
  /// any free list and has not been coalesced with a preceding trailing
  /// free block — both are the caller's job.
  ///
  /// # Safety
  /// Must only be called after `init`, and `bytes` must be large enough
  /// to hold at least a minimum-size block.
  pub unsafe fn grow(&mut self, bytes: usize) -> Result<*mut u8, AllocError> {
    unsafe {
      let header_addr = sbrk_raw(bytes)? as *mut usize;
      let bp = (header_addr as *mut u8).add(WORD);

      stamp(bp, bytes, false);

      let new_epilogue_header = header_addr as *mut u8;
      let new_epilogue_header = new_epilogue_header.add(bytes) as *mut usize;
      new_epilogue_header.write(pack(0, true));

      self.epilogue = (new_epilogue_header as *mut u8).add(WORD);
      Ok(bp)
    }
  }

  /// Total size, in bytes, of every block (free or allocated) between
  /// `start` and the epilogue, `start` included. Used by churn tests to
  /// reconcile heap-wide byte accounting (spec.md §8 scenario 6): the sum
  /// of free-block and allocated-block sizes must equal this total minus
  /// the prologue's own size.
  ///
  /// # Safety
  /// The entire chain from `start` to `self.epilogue` must be a well-formed
  /// run of stamped blocks.
  pub unsafe fn span_bytes(&self, start: *mut u8) -> usize {
    unsafe {
      let mut bp = start;
      let mut total = 0usize;
      while bp != self.epilogue {
        total += size(bp);
        bp = crate::block::next_blk(bp);
      }
      total
    }
  }
}
