//! # rallocator - A Segregated-Fit Memory Allocator Library
//!
//! This crate provides a **segregated free-list allocator** implementation
//! in Rust that manages memory using the `sbrk` system call. Unlike a bump
//! allocator, freed memory is tracked and reused: a released block is
//! merged with its free physical neighbors and filed into a size-indexed
//! table so a later allocation can find it again.
//!
//! ## Overview
//!
//! ```text
//!   Segregated Free-List Allocator:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │ ┌────┬──────┬────┬──────┬────┬──────────────┬────┬──────┬─────────┐ │
//!   │ │Prlg│ Alloc│free│ Alloc│free│     free      │Allc│ free │ Epilog  │ │
//!   │ └────┴──────┴────┴──────┴────┴──────────────┴────┴──────┴─────────┘ │
//!   │          ▲           ▲              ▲                 ▲             │
//!   │          └───────────┴──────────────┴─────────────────┘             │
//!   │                     linked into the size-class table                │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Each free block's size picks which class's doubly linked list it
//!   joins; malloc walks that list (and larger ones) first-fit.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align       - Alignment macros (align!, align_to!)
//!   ├── block       - Boundary-tag header/footer + free-block link accessors
//!   ├── size_class  - Maps a block size to a segregated-table index
//!   ├── free_list   - The segregated table of doubly linked free lists
//!   ├── heap        - sbrk-backed growth, prologue/epilogue bookkeeping
//!   ├── coalesce    - Merges a freed block with free physical neighbors
//!   ├── place       - Splits a free block into an allocated head and a free tail
//!   ├── check       - Consistency checker, used by the crate's own tests
//!   ├── error       - Internal error type for the heap extender
//!   └── allocator   - `Allocator`: init/malloc/free/realloc
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::Allocator;
//!
//! fn main() {
//!     let mut allocator = Allocator::init().unwrap();
//!
//!     unsafe {
//!         let ptr = allocator.malloc(8) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         allocator.free(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! The allocator uses `sbrk(2)` to extend the program's data segment, the
//! same primitive a bump allocator would, but every block now carries
//! boundary tags (a header and a footer, each encoding size and an
//! allocated flag) so that releasing a block in the middle of the heap is
//! a real operation instead of a no-op:
//!
//! ```text
//!   Block layout (one block):
//!
//!   ┌──────────┬─────────────────────────────┬──────────┐
//!   │  header  │           payload           │  footer  │
//!   │ size|flag│                             │ size|flag│
//!   └──────────┴─────────────────────────────┴──────────┘
//!
//!   Free-block payload overlay (first two words only):
//!
//!   ┌──────────┬───────────┬───────────┬ ─ ─ ─┬──────────┐
//!   │  header  │   pred    │   succ    │  ...  │  footer  │
//!   └──────────┴───────────┴───────────┴ ─ ─ ─ ┴──────────┘
//! ```
//!
//! `malloc` maps the request to a size class, searches that class's list
//! and every larger one (first-fit within a class, first-larger-class
//! first-fit across classes), and on a total miss extends the heap. `free`
//! clears the allocated bit, files the block into its class, and merges it
//! with whichever physical neighbor is also free. `realloc` grows in place
//! when there's room, otherwise frees (without merging, so the bytes and
//! the block's identity survive) and reallocates, restoring the two
//! link-overlaid payload words that freeing clobbered.
//!
//! ## Trade-offs
//!
//! ### Advantages
//! - **Freed memory is reused**: unlike a bump allocator, any freed block
//!   (not just the heap's tail) can satisfy a later request.
//! - **Bounded search**: a segregated table means `malloc` searches at most
//!   one size class before escalating, not the whole free-block population.
//! - **Fragmentation control**: coalescing on every `free`, plus splitting
//!   on every placement, keeps free space from accumulating as unusable
//!   slivers.
//!
//! ### Disadvantages
//! - **Single-threaded only**: no synchronization primitives.
//! - **No compaction**: pointers are stable for the life of the block, so
//!   external fragmentation across size classes is not eliminated, only
//!   bounded.
//! - **Unix-only**: requires `libc` and `sbrk` (POSIX systems).
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management
//! and an unsafe core of boundary-tag and free-list accessor functions. The
//! public `Allocator` methods that mutate heap state (`free`, `realloc`)
//! are themselves `unsafe`, since they trust the caller's pointer came from
//! this allocator; `malloc` and `init` are safe to call (they can only
//! ever hand back a pointer or report failure, never misinterpret one).

pub mod align;
mod allocator;
mod block;
mod check;
mod coalesce;
mod error;
mod free_list;
mod heap;
mod place;
mod size_class;

pub use allocator::{Allocator, CHUNKSIZE, PAGE};
pub use check::check;
pub use error::AllocError;
