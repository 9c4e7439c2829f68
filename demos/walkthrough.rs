use std::{io::Read, ptr};

use libc::sbrk;
use rallocator::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

/// Prints an allocation's requested size and returned address.
fn print_alloc(label: &str, size: usize, addr: *mut u8) {
  println!("[{}] requested {} bytes, address = {:?}", label, size, addr);
}

fn main() {
  // Segregated free-list allocator: a released block is merged with its
  // free neighbors and filed by size, so later requests can reuse it.
  let mut allocator = Allocator::init().expect("sbrk failed during init");

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 1) Allocate space for a u32.
    // ------------------------------------------------------------------
    let first_block = allocator.malloc(4);
    println!("\n[1] Allocate u32");
    print_alloc("1", 4, first_block);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 2) Allocate 12 bytes (u8[12]).
    // ------------------------------------------------------------------
    let second_block = allocator.malloc(12);
    println!("\n[2] Allocate [u8; 12]");
    print_alloc("2", 12, second_block);

    ptr::write_bytes(second_block, 0xAB, 12);
    println!("[2] Initialized second block with 0xAB");

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 3) Allocate a u64 to observe the double-word alignment contract.
    // ------------------------------------------------------------------
    let third_block = allocator.malloc(8);
    println!("\n[3] Allocate u64 (observe alignment)");
    print_alloc("3", 8, third_block);

    let third_ptr = third_block as *mut u64;
    third_ptr.write(0x1122334455667788);
    println!("[3] Value written = 0x{:X}", third_ptr.read());

    let addr_third = third_block as usize;
    println!("[3] Address = {:#X}, addr % 16 = {}", addr_third, addr_third % 16);

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 4) Allocate an array of 16 u16 values (32 bytes).
    // ------------------------------------------------------------------
    let fourth_block = allocator.malloc(32);
    println!("\n[4] Allocate [u16; 16]");
    print_alloc("4", 32, fourth_block);

    let fourth_ptr = fourth_block as *mut u16;
    for i in 0..16 {
      fourth_ptr.add(i).write(i as u16);
    }
    println!("[4] Wrote 0..15 into the u16 array");

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 5) Free the first block. Unlike a bump allocator, this is a real
    //    release: the block is coalesced with any free neighbor and
    //    filed into the free-list index for reuse.
    // ------------------------------------------------------------------
    allocator.free(first_block);
    println!("\n[5] Freed first_block at {:?}", first_block);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 6) Allocate a small block and check whether the freed block above
    //    gets reused instead of extending the heap.
    // ------------------------------------------------------------------
    let fifth_block = allocator.malloc(2);
    println!("\n[6] Allocate [u8; 2] (check reuse of freed block)");
    print_alloc("6", 2, fifth_block);

    println!(
      "[6] fifth_block == first_block? {}",
      if fifth_block == first_block {
        "Yes, the freed block was reused"
      } else {
        "No, a different free block or fresh heap space was used"
      }
    );

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 7) Grow the allocation in [4] well past its current size, and
    //    confirm the payload bytes it already held survive the resize.
    // ------------------------------------------------------------------
    let grown = allocator.realloc(fourth_block, 4096);
    println!("\n[7] realloc [u16; 16] up to 4096 bytes");
    print_alloc("7", 4096, grown);

    let grown_ptr = grown as *mut u16;
    let mut intact = true;
    for i in 0..16 {
      if grown_ptr.add(i).read() != i as u16 {
        intact = false;
      }
    }
    println!("[7] original 16 values preserved? {}", intact);

    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 8) Allocate a large block to observe heap growth.
    // ------------------------------------------------------------------
    print_program_break("before large alloc");

    let big_block = allocator.malloc(64 * 1024);
    println!("\n[8] Allocate large 64 KiB block");
    print_alloc("8", 64 * 1024, big_block);

    print_program_break("after large alloc");
    block_until_enter_pressed();

    println!("\n[9] End of example. Process will exit and the OS will reclaim all memory.");
  }
}
