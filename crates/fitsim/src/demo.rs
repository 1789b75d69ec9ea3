//! Scripted allocate/free sequence that fragments the address range.

use std::{
    io::{self, Write as _},
    num::NonZeroUsize,
};

use argh::FromArgs;
use block_list::{BlockListAllocator, Strategy, Token};
use snafu::ResultExt as _;
use snafu_utils::GenericError;

use crate::{DEFAULT_CAPACITY, dump, selected_strategies};

/// Replay a fixed allocate/free script and dump the fragmented blocks.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "demo")]
pub struct DemoArgs {
    /// size of the simulated address range
    #[argh(option, short = 'c', default = "DEFAULT_CAPACITY")]
    pub capacity: NonZeroUsize,

    /// placement strategy to run (repeatable); all of them when omitted
    #[argh(option, short = 's')]
    pub strategy: Vec<Strategy>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Allocate { slot: usize, size: NonZeroUsize },
    Free { slot: usize },
}

const SLOTS: usize = 5;

const fn alloc(slot: usize, size: usize) -> Step {
    let Some(size) = NonZeroUsize::new(size) else {
        panic!("script sizes must be non-zero");
    };
    Step::Allocate { slot, size }
}

const SCRIPT: [Step; 7] = [
    alloc(0, 100),
    alloc(1, 200),
    alloc(2, 50),
    Step::Free { slot: 1 },
    alloc(3, 75),
    Step::Free { slot: 0 },
    alloc(4, 125),
];

pub fn run(args: &DemoArgs) -> Result<(), GenericError> {
    let mut out = io::stdout().lock();
    for strategy in selected_strategies(&args.strategy) {
        let allocator = BlockListAllocator::new(args.capacity);
        debug!("{strategy}: running script over {} units", args.capacity);

        writeln!(out, "Initial blocks ({strategy}):")
            .and_then(|()| dump::write_blocks(&mut out, &allocator))
            .whatever_context("failed to write block dump")?;

        run_script(&allocator, strategy);

        writeln!(out, "Blocks after creating fragmentation with {strategy}:")
            .and_then(|()| dump::write_blocks(&mut out, &allocator))
            .and_then(|()| writeln!(out))
            .whatever_context("failed to write block dump")?;

        allocator.teardown();
    }
    Ok(())
}

/// Runs [`SCRIPT`] against `allocator` and returns the tokens still held.
///
/// A failed step is logged and skipped; freeing a slot whose allocation
/// failed is skipped too.
fn run_script(allocator: &BlockListAllocator, strategy: Strategy) -> [Option<Token>; SLOTS] {
    let mut slots = [None; SLOTS];
    for step in SCRIPT {
        match step {
            Step::Allocate { slot, size } => match allocator.allocate(size, strategy) {
                Ok(token) => {
                    trace!("{strategy}: a{slot} = allocate({size}) -> {token}");
                    slots[slot] = Some(token);
                }
                Err(err) => {
                    warn!("{strategy}: a{slot} = allocate({size}) failed: {err}");
                }
            },
            Step::Free { slot } => {
                let Some(token) = slots[slot].take() else {
                    warn!("{strategy}: free(a{slot}) skipped, slot holds no allocation");
                    continue;
                };
                match allocator.deallocate(token) {
                    Ok(()) => {
                        trace!("{strategy}: free(a{slot}) released {token}");
                    }
                    Err(err) => {
                        warn!("{strategy}: free(a{slot}) failed: {err}");
                    }
                }
            }
        }
    }
    slots
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use block_list::BlockInfo;

    use super::*;

    fn blocks(layout: &[(usize, usize, bool)]) -> Vec<BlockInfo> {
        layout
            .iter()
            .map(|&(start, size, allocated)| BlockInfo {
                start,
                size,
                allocated,
            })
            .collect()
    }

    fn run_with(
        capacity: usize,
        strategy: Strategy,
    ) -> (BlockListAllocator, [Option<Token>; SLOTS]) {
        let allocator = BlockListAllocator::new(NonZeroUsize::new(capacity).unwrap());
        let slots = run_script(&allocator, strategy);
        (allocator, slots)
    }

    #[test]
    fn test_script_first_and_best_fit() {
        let expected = blocks(&[
            (0, 100, false),
            (100, 75, true),
            (175, 125, true),
            (300, 50, true),
            (350, 674, false),
        ]);
        for strategy in [Strategy::FirstFit, Strategy::BestFit] {
            let (allocator, slots) = run_with(1024, strategy);
            assert_eq!(allocator.snapshot(), expected, "{strategy}");
            let offsets = slots.map(|slot| slot.map(Token::offset));
            assert_eq!(offsets, [None, None, Some(300), Some(100), Some(175)]);
            assert_eq!(allocator.usage().free, 774);
        }
    }

    #[test]
    fn test_script_worst_fit() {
        let (allocator, slots) = run_with(1024, Strategy::WorstFit);
        assert_eq!(
            allocator.snapshot(),
            blocks(&[
                (0, 300, false),
                (300, 50, true),
                (350, 75, true),
                (425, 125, true),
                (550, 474, false),
            ])
        );
        assert_eq!(slots[4].map(Token::offset), Some(425));
        assert_eq!(allocator.usage().free, 774);
    }

    #[test]
    fn test_script_continues_after_failures() {
        let (allocator, slots) = run_with(250, Strategy::FirstFit);
        assert_eq!(
            allocator.snapshot(),
            blocks(&[
                (0, 100, false),
                (100, 50, true),
                (150, 75, true),
                (225, 25, false),
            ])
        );
        let held = slots.iter().flatten().count();
        assert_eq!(held, 2);

        for token in slots.into_iter().flatten() {
            allocator.deallocate(token).unwrap();
        }
        assert_eq!(allocator.usage().free_blocks, 1);
    }
}
