//! Block-list allocator over a simulated address range.
//!
//! This crate simulates a heap allocator over a fixed-size range of integer
//! offsets `[0, capacity)`. The range is always covered by a single chain of
//! blocks, each tagged free or allocated, and allocation requests are placed
//! with one of three classic strategies.
//!
//! Nothing here backs real memory: offsets are plain integers and the
//! allocator only tracks which runs of the range are in use.
//!
//! # Placement Strategies
//!
//! | Strategy | Picks | Tie-break |
//! |----------|-------|-----------|
//! | [`Strategy::FirstFit`] | first fitting free block | address order |
//! | [`Strategy::BestFit`] | smallest fitting free block | lowest address |
//! | [`Strategy::WorstFit`] | largest fitting free block | lowest address |
//!
//! A selected block larger than the request is split into an allocated
//! prefix and a free remainder. Freed blocks are merged with free neighbours
//! immediately, so no two adjacent blocks are ever both free.
//!
//! # Usage Examples
//!
//! ```rust
//! use core::num::NonZeroUsize;
//!
//! use block_list::{BlockInfo, BlockListAllocator, Strategy};
//!
//! let capacity = NonZeroUsize::new(1024).unwrap();
//! let allocator = BlockListAllocator::new(capacity);
//!
//! let size = NonZeroUsize::new(100).unwrap();
//! let token = allocator.allocate(size, Strategy::FirstFit).unwrap();
//! assert_eq!(token.offset(), 0);
//!
//! assert_eq!(
//!     allocator.snapshot(),
//!     [
//!         BlockInfo { start: 0, size: 100, allocated: true },
//!         BlockInfo { start: 100, size: 924, allocated: false },
//!     ]
//! );
//!
//! allocator.deallocate(token).unwrap();
//! assert_eq!(allocator.usage().free, 1024);
//! ```
//!
//! # Thread Safety
//!
//! [`BlockListAllocator`] is `Send + Sync`. Every operation takes one spin
//! lock over the whole chain for its full duration, so concurrent callers
//! observe operations in a single total order and never see a half-split or
//! half-merged chain.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

pub use self::{
    allocator::{BlockListAllocator, Blocks, InvalidHandleError, OutOfMemoryError},
    chain::{BlockInfo, Token, Usage},
    strategy::{ParseStrategyError, Strategy},
};

mod allocator;
mod chain;
mod strategy;
