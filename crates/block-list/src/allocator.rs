//! Lock-guarded public surface of the block-list allocator.

use alloc::vec::Vec;
use core::{iter::FusedIterator, num::NonZeroUsize};

use snafu::Snafu;
use snafu_utils::Location;
use spin::{Mutex, MutexGuard};

use crate::{
    chain::{BlockInfo, Chain, Token, Usage},
    strategy::Strategy,
};

/// Error returned when no free block can hold an allocation request.
///
/// The chain is left exactly as it was; the caller may retry with a smaller
/// size or after freeing something.
#[derive(Debug, Snafu)]
#[snafu(display("out of memory: no free block can hold {size} units ({strategy})"))]
pub struct OutOfMemoryError {
    size: usize,
    strategy: Strategy,
    #[snafu(implicit)]
    location: Location,
}

impl OutOfMemoryError {
    /// Returns the size of the rejected request.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns where the failing [`allocate`](BlockListAllocator::allocate)
    /// was called from.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

/// Error returned when a token does not name a currently allocated block.
///
/// This covers unknown offsets, blocks that were already freed, and tokens
/// whose offset has since been handed out again to a newer allocation.
#[derive(Debug, Snafu)]
#[snafu(display("invalid handle {token}: no allocated block matches"))]
pub struct InvalidHandleError {
    token: Token,
    #[snafu(implicit)]
    location: Location,
}

impl InvalidHandleError {
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

/// Allocator simulating placement over a fixed range of integer offsets.
///
/// The range `[0, capacity)` is always covered by a chain of free and
/// allocated blocks. One spin lock guards the whole chain; every operation
/// holds it from start to finish.
///
/// # Examples
///
/// ```rust
/// use core::num::NonZeroUsize;
///
/// use block_list::{BlockListAllocator, Strategy};
///
/// let allocator = BlockListAllocator::new(NonZeroUsize::new(64).unwrap());
/// let size = NonZeroUsize::new(64).unwrap();
///
/// let token = allocator.allocate(size, Strategy::BestFit).unwrap();
/// assert!(allocator.allocate(size, Strategy::BestFit).is_err());
///
/// allocator.deallocate(token).unwrap();
/// assert!(allocator.deallocate(token).is_err());
/// ```
#[derive(Debug)]
pub struct BlockListAllocator {
    chain: Mutex<Chain>,
}

impl BlockListAllocator {
    /// Creates an allocator whose range is one free block of `capacity`
    /// units.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            chain: Mutex::new(Chain::new(capacity)),
        }
    }

    /// Returns the size of the simulated address range.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chain.lock().capacity()
    }

    /// Allocates `size` units using the given placement `strategy`.
    ///
    /// The chosen free block is split when it is larger than the request: the
    /// block keeps its start offset and shrinks to `size`, and a new free
    /// block covering the rest is linked right after it.
    ///
    /// Returns a token naming the allocated block. Its
    /// [`offset`](Token::offset) is the block's start.
    #[track_caller]
    pub fn allocate(
        &self,
        size: NonZeroUsize,
        strategy: Strategy,
    ) -> Result<Token, OutOfMemoryError> {
        let mut chain = self.chain.lock();
        match chain.claim(size, strategy) {
            Some(token) => Ok(token),
            None => OutOfMemorySnafu {
                size: size.get(),
                strategy,
            }
            .fail(),
        }
    }

    /// Frees the block named by `token` and merges adjacent free blocks.
    ///
    /// Fails without changing anything if the token does not match a block
    /// that is currently allocated, including a token that was already
    /// deallocated.
    #[track_caller]
    pub fn deallocate(&self, token: Token) -> Result<(), InvalidHandleError> {
        let mut chain = self.chain.lock();
        if chain.release(token) {
            Ok(())
        } else {
            InvalidHandleSnafu { token }.fail()
        }
    }

    /// Returns the blocks of the chain in address order.
    ///
    /// The iterator holds the allocator's lock until it is dropped, so it
    /// always walks one consistent chain. Calling any other method of this
    /// allocator from the same thread while it is alive deadlocks; use
    /// [`snapshot`](Self::snapshot) when the blocks must outlive the walk.
    pub fn list(&self) -> Blocks<'_> {
        let chain = self.chain.lock();
        let cursor = Some(chain.head());
        Blocks { chain, cursor }
    }

    /// Collects the blocks of the chain, in address order, into a vector.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BlockInfo> {
        self.list().collect()
    }

    /// Returns usage totals for the current chain.
    #[must_use]
    pub fn usage(&self) -> Usage {
        self.chain.lock().usage()
    }

    /// Destroys the allocator, releasing every block.
    ///
    /// Tokens issued by this allocator become meaningless.
    pub fn teardown(self) {
        drop(self);
    }
}

/// Iterator over the blocks of a [`BlockListAllocator`], returned by
/// [`BlockListAllocator::list`].
pub struct Blocks<'a> {
    chain: MutexGuard<'a, Chain>,
    cursor: Option<usize>,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let (block, next) = self.chain.block(self.cursor?);
        self.cursor = next;
        Some(block)
    }
}

impl FusedIterator for Blocks<'_> {}
