//! Command-line driver for the block-list allocator simulation.
//!
//! `fitsim demo` replays a fixed allocate/free script that fragments the
//! range and dumps the resulting blocks for each placement strategy.
//! `fitsim bench` times allocate/deallocate loops per strategy.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::{num::NonZeroUsize, process};

use argh::FromArgs;
use block_list::Strategy;
use snafu_utils::{GenericError, Report};

use self::log::LogLevel;

#[macro_use]
mod log;

mod bench;
mod demo;
mod dump;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => panic!("default capacity must be non-zero"),
};

/// Simulate first-fit, best-fit and worst-fit placement over a fixed address
/// range.
#[derive(Debug, FromArgs)]
struct Args {
    /// minimum level of log messages: trace, debug, info, warn or error
    #[argh(option, default = "LogLevel::Info")]
    log_level: LogLevel,

    /// disable coloured output
    #[argh(switch)]
    no_color: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Demo(demo::DemoArgs),
    Bench(bench::BenchArgs),
}

fn main() {
    let args: Args = argh::from_env();
    ansi_term::set_enabled(!args.no_color);
    log::init(args.log_level);

    if let Err(err) = run(&args) {
        let report = Report::new(err);
        eprintln!("{report}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), GenericError> {
    match &args.command {
        Command::Demo(demo) => demo::run(demo),
        Command::Bench(bench) => bench::run(bench),
    }
}

/// Returns the strategies picked on the command line, or all of them.
fn selected_strategies(selected: &[Strategy]) -> Vec<Strategy> {
    if selected.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        selected.to_vec()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use argh::EarlyExit;

    use super::*;

    fn parse(args: &[&str]) -> Result<Args, EarlyExit> {
        <Args as FromArgs>::from_args(&["fitsim"], args)
    }

    #[test]
    fn test_parse_demo_args() {
        let args = parse(&["--no-color", "demo", "--capacity", "512", "-s", "best"]).unwrap();
        assert!(args.no_color);
        assert_eq!(args.log_level, LogLevel::Info);
        let Command::Demo(demo) = args.command else {
            panic!("expected demo subcommand");
        };
        assert_eq!(demo.capacity.get(), 512);
        assert_eq!(demo.strategy, [Strategy::BestFit]);
    }

    #[test]
    fn test_parse_bench_defaults() {
        let args = parse(&["--log-level", "debug", "bench"]).unwrap();
        assert_eq!(args.log_level, LogLevel::Debug);
        let Command::Bench(bench) = args.command else {
            panic!("expected bench subcommand");
        };
        assert_eq!(bench.capacity, DEFAULT_CAPACITY);
        assert_eq!(bench.iterations, 100);
        assert!(bench.size.is_empty());
        assert!(!bench.retain);
    }

    #[test]
    fn test_rejects_invalid_options() {
        let err = parse(&["demo", "--capacity", "0"]).unwrap_err();
        assert_eq!(err.status, Err(()));
        let err = parse(&["demo", "-s", "next-fit"]).unwrap_err();
        assert_eq!(err.status, Err(()));
        assert!(err.output.contains("next-fit"));
    }

    #[test]
    fn test_selected_strategies() {
        assert_eq!(selected_strategies(&[]), Strategy::ALL);
        assert_eq!(
            selected_strategies(&[Strategy::WorstFit, Strategy::FirstFit]),
            [Strategy::WorstFit, Strategy::FirstFit]
        );
    }
}
