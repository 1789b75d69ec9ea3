//! Human-readable dump of an allocator's block chain.

use std::{fmt, io};

use ansi_term::{Color, WithFg};
use block_list::{BlockInfo, BlockListAllocator, Usage};

/// Writes one line per block followed by a usage summary.
///
/// Both are taken from the same snapshot of the chain.
pub fn write_blocks<W>(out: &mut W, allocator: &BlockListAllocator) -> io::Result<()>
where
    W: io::Write,
{
    let blocks = allocator.snapshot();
    let usage = blocks.iter().copied().collect::<Usage>();
    for block in &blocks {
        writeln!(out, "{}", BlockLine(block))?;
    }
    writeln!(out, "{}", UsageLine(&usage))
}

struct BlockLine<'a>(&'a BlockInfo);

impl fmt::Display for BlockLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let block = self.0;
        let state = if block.allocated {
            WithFg::new(Color::Red, "allocated")
        } else {
            WithFg::new(Color::Green, "free")
        };
        write!(
            f,
            "  {:>6}..{:<6} size {:>6}  {state}",
            block.start,
            block.end(),
            block.size
        )
    }
}

struct UsageLine<'a>(&'a Usage);

impl fmt::Display for UsageLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = self.0;
        write!(
            f,
            "  {} of {} free in {} block(s), largest {}, fragmentation {:.1}%",
            usage.free,
            usage.capacity,
            usage.free_blocks,
            usage.largest_free,
            usage.fragmentation() * 100.0
        )
    }
}
