//! The chain of blocks covering the simulated address range.
//!
//! Blocks live in an arena (`Vec<Node>`) and are linked by index, in address
//! order, starting from `head`. Nodes removed by coalescing are put on a
//! vacant list and recycled by later splits, so the arena never grows beyond
//! the largest number of blocks the chain has held at once.
//!
//! ```text
//! head
//!  │
//!  ▼
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ 0..100      │──▶│ 100..175    │──▶│ 175..1024   │──▶ None
//! │ allocated#0 │   │ allocated#2 │   │ free        │
//! └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! The chain always satisfies:
//!
//! - the first block starts at 0 and the last one ends at `capacity`
//! - every block starts where its predecessor ends
//! - every block has a non-zero size
//! - no two consecutive blocks are both free

use alloc::{vec, vec::Vec};
use core::{iter, num::NonZeroUsize};

use derive_more::{Display, IsVariant};

use crate::strategy::Strategy;

/// Handle to an allocated block, returned by
/// [`allocate`](crate::BlockListAllocator::allocate).
///
/// A token is the block's start offset paired with the generation stamped on
/// the block when it was allocated. Once the block is freed the token is
/// dead: even if a later allocation starts at the same offset, the old token
/// will not match it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{offset}#{generation}")]
pub struct Token {
    offset: usize,
    generation: u64,
}

impl Token {
    #[cfg(test)]
    pub(crate) const fn new(offset: usize, generation: u64) -> Self {
        Self { offset, generation }
    }

    /// Returns the start offset of the allocated block.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Returns the allocation generation this token was issued for.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// Read-only view of one block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    pub start: usize,
    pub size: usize,
    pub allocated: bool,
}

impl BlockInfo {
    /// Returns the offset one past the end of the block.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }
}

/// Summary of how the address range is currently used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub capacity: usize,
    pub allocated: usize,
    pub free: usize,
    pub blocks: usize,
    pub free_blocks: usize,
    pub largest_free: usize,
}

impl Usage {
    /// Returns the external fragmentation of the free space.
    ///
    /// This is `1 - largest_free / free`: 0 when all free space is one block
    /// (or nothing is free), approaching 1 as free space is scattered over
    /// many small blocks.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn fragmentation(&self) -> f64 {
        if self.free == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free as f64
    }
}

/// Sums up a full list of blocks, such as one returned by
/// [`snapshot`](crate::BlockListAllocator::snapshot).
///
/// The capacity is taken to be the total size of the blocks.
impl FromIterator<BlockInfo> for Usage {
    fn from_iter<I: IntoIterator<Item = BlockInfo>>(blocks: I) -> Self {
        let mut usage = Self::default();
        for block in blocks {
            usage.capacity += block.size;
            usage.blocks += 1;
            if block.allocated {
                usage.allocated += block.size;
            } else {
                usage.free += block.size;
                usage.free_blocks += 1;
                usage.largest_free = usage.largest_free.max(block.size);
            }
        }
        usage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
enum State {
    Free,
    Allocated(u64),
}

#[derive(Debug)]
struct Node {
    start: usize,
    size: usize,
    state: State,
    next: Option<usize>,
}

impl Node {
    fn info(&self) -> BlockInfo {
        BlockInfo {
            start: self.start,
            size: self.size,
            allocated: self.state.is_allocated(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Chain {
    nodes: Vec<Node>,
    vacant: Vec<usize>,
    head: usize,
    capacity: usize,
    next_generation: u64,
}

impl Chain {
    /// Creates a chain holding one free block over `[0, capacity)`.
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            nodes: vec![Node {
                start: 0,
                size: capacity.get(),
                state: State::Free,
                next: None,
            }],
            vacant: Vec::new(),
            head: 0,
            capacity: capacity.get(),
            next_generation: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    /// Returns the block at `index` and the index of its successor.
    pub(crate) fn block(&self, index: usize) -> (BlockInfo, Option<usize>) {
        let node = &self.nodes[index];
        (node.info(), node.next)
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &Node)> + '_ {
        iter::successors(Some(self.head), |&index| self.nodes[index].next)
            .map(|index| (index, &self.nodes[index]))
    }

    /// Allocates `size` units from the block chosen by `strategy`.
    ///
    /// Returns `None` without touching the chain if no free block is large
    /// enough.
    pub(crate) fn claim(&mut self, size: NonZeroUsize, strategy: Strategy) -> Option<Token> {
        let size = size.get();
        let candidates = self
            .iter()
            .filter(|(_, node)| node.state.is_free() && node.size >= size)
            .map(|(index, node)| (index, node.size));
        let index = strategy.select(candidates)?;

        self.split(index, size);

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let node = &mut self.nodes[index];
        node.state = State::Allocated(generation);
        let token = Token {
            offset: node.start,
            generation,
        };

        #[cfg(debug_assertions)]
        self.assert_invariants();

        Some(token)
    }

    /// Frees the block `token` was issued for and merges free neighbours.
    ///
    /// Returns `false` without touching the chain if no block starts at the
    /// token's offset, or if that block is free or carries another
    /// generation.
    pub(crate) fn release(&mut self, token: Token) -> bool {
        let found = self
            .iter()
            .take_while(|(_, node)| node.start <= token.offset)
            .find(|(_, node)| {
                node.start == token.offset && node.state == State::Allocated(token.generation)
            })
            .map(|(index, _)| index);
        let Some(index) = found else {
            return false;
        };

        self.nodes[index].state = State::Free;
        self.coalesce();

        #[cfg(debug_assertions)]
        self.assert_invariants();

        true
    }

    pub(crate) fn usage(&self) -> Usage {
        self.iter().map(|(_, node)| node.info()).collect()
    }

    /// Shrinks the free block at `index` to `size`, moving the rest into a
    /// new free block right after it.
    fn split(&mut self, index: usize, size: usize) {
        let node = &mut self.nodes[index];
        assert!(node.state.is_free(), "only free blocks can be split");
        assert!(
            size > 0 && size <= node.size,
            "split size {size} out of range for block of {}",
            node.size
        );
        if node.size == size {
            return;
        }

        let remainder = Node {
            start: node.start + size,
            size: node.size - size,
            state: State::Free,
            next: node.next,
        };
        node.size = size;

        let remainder = self.insert_node(remainder);
        self.nodes[index].next = Some(remainder);
    }

    fn insert_node(&mut self, node: Node) -> usize {
        if let Some(index) = self.vacant.pop() {
            self.nodes[index] = node;
            index
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Merges every run of consecutive free blocks into its first block.
    ///
    /// After a merge the same position is examined again, since the grown
    /// block may now touch another free block.
    fn coalesce(&mut self) {
        let mut current = self.head;
        while let Some(next) = self.nodes[current].next {
            if self.nodes[current].state.is_free() && self.nodes[next].state.is_free() {
                let (next_size, next_next) = (self.nodes[next].size, self.nodes[next].next);
                let node = &mut self.nodes[current];
                node.size += next_size;
                node.next = next_next;
                self.vacant.push(next);
            } else {
                current = next;
            }
        }
    }

    #[cfg_attr(not(any(test, debug_assertions)), expect(dead_code))]
    fn assert_invariants(&self) {
        let mut end = 0;
        let mut prev_free = false;
        let mut linked = 0;
        for (_, node) in self.iter() {
            assert_eq!(node.start, end, "gap or overlap before block {}", node.start);
            assert!(node.size > 0, "empty block at {}", node.start);
            let free = node.state.is_free();
            assert!(
                !(prev_free && free),
                "uncoalesced free block at {}",
                node.start
            );
            prev_free = free;
            end += node.size;
            linked += 1;
        }
        assert_eq!(end, self.capacity, "chain does not cover the whole range");
        assert_eq!(linked + self.vacant.len(), self.nodes.len());
    }
}
