//! Wall-clock timing of allocate/deallocate loops per strategy.

use std::{
    io,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use argh::FromArgs;
use block_list::{BlockListAllocator, Strategy};
use snafu::ResultExt as _;
use snafu_utils::GenericError;

use crate::{DEFAULT_CAPACITY, selected_strategies};

const DEFAULT_SIZES: [usize; 5] = [50, 100, 200, 75, 125];

/// Time allocate/deallocate loops for each placement strategy.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "bench")]
pub struct BenchArgs {
    /// size of the simulated address range
    #[argh(option, short = 'c', default = "DEFAULT_CAPACITY")]
    pub capacity: NonZeroUsize,

    /// placement strategy to time (repeatable); all of them when omitted
    #[argh(option, short = 's')]
    pub strategy: Vec<Strategy>,

    /// request size, cycled through in order (repeatable); 50, 100, 200, 75
    /// and 125 when omitted
    #[argh(option)]
    pub size: Vec<NonZeroUsize>,

    /// number of allocation requests per strategy
    #[argh(option, short = 'n', default = "100")]
    pub iterations: usize,

    /// keep every allocation live until the loop ends instead of freeing it
    /// immediately
    #[argh(switch)]
    pub retain: bool,
}

/// Outcome of one timed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub strategy: Strategy,
    pub completed: usize,
    pub exhausted: bool,
    pub elapsed: Duration,
}

pub fn run(args: &BenchArgs) -> Result<(), GenericError> {
    let sizes = if args.size.is_empty() {
        DEFAULT_SIZES
            .iter()
            .filter_map(|&size| NonZeroUsize::new(size))
            .collect()
    } else {
        args.size.clone()
    };

    let mut out = io::stdout().lock();
    for strategy in selected_strategies(&args.strategy) {
        info!(
            "{strategy}: timing {} requests over {} units",
            args.iterations, args.capacity
        );
        let allocator = BlockListAllocator::new(args.capacity);
        let m = measure(&allocator, strategy, &sizes, args.iterations, args.retain)
            .with_whatever_context(|_| format!("benchmark failed, strategy={strategy}"))?;
        allocator.teardown();

        write_measurement(&mut out, &m).whatever_context("failed to write benchmark result")?;
    }
    Ok(())
}

/// Writes the timing report of one loop as a single line.
pub fn write_measurement<W>(out: &mut W, m: &Measurement) -> io::Result<()>
where
    W: io::Write,
{
    let stop = if m.exhausted { ", stopped: out of memory" } else { "" };
    writeln!(
        out,
        "{} allocation time: {:.6} seconds ({} requests{stop})",
        m.strategy,
        m.elapsed.as_secs_f64(),
        m.completed
    )
}

/// Issues up to `iterations` requests, cycling through `sizes`.
///
/// Each allocation is freed right away unless `retain` is set, in which case
/// all of them are freed after the clock stops. The first out-of-memory
/// result ends the loop.
pub fn measure(
    allocator: &BlockListAllocator,
    strategy: Strategy,
    sizes: &[NonZeroUsize],
    iterations: usize,
    retain: bool,
) -> Result<Measurement, GenericError> {
    let mut held = Vec::new();
    let mut completed = 0;
    let mut exhausted = false;

    let start = Instant::now();
    for &size in sizes.iter().cycle().take(iterations) {
        let token = match allocator.allocate(size, strategy) {
            Ok(token) => token,
            Err(err) => {
                debug!("{strategy}: stopping after {completed} requests: {err}");
                exhausted = true;
                break;
            }
        };
        if retain {
            held.push(token);
        } else {
            allocator
                .deallocate(token)
                .whatever_context("failed to release allocation")?;
        }
        completed += 1;
    }
    let elapsed = start.elapsed();

    for token in held {
        allocator
            .deallocate(token)
            .whatever_context("failed to release retained allocation")?;
    }

    Ok(Measurement {
        strategy,
        completed,
        exhausted,
        elapsed,
    })
}
