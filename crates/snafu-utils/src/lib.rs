//! Error plumbing shared by the workspace crates.
//!
//! - [`Location`] records where an error was built, as an implicit `snafu`
//!   field.
//! - [`GenericError`] is the catch-all `whatever` error used by binaries.
//! - [`Report`] renders an error and its chain of sources for humans.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

use alloc::{boxed::Box, string::String};
use core::{error::Error, fmt};

use ansi_term::{Color, WithFg};
use snafu::{GenerateImplicitData, Snafu};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct GenericError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn Error>, Some)))]
    source: Option<Box<dyn Error>>,
}

impl GenericError {
    /// Returns where the error was raised.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

/// Human-readable rendering of an error and everything that caused it.
///
/// ```text
/// Error: failed to run demo
///   at crates/fitsim/src/demo.rs:63:18
///
/// Caused by:
///    0: out of memory: no free block can hold 2048 units (first-fit)
/// ```
///
/// Locations are shown for every [`GenericError`] in the chain.
pub struct Report<E> {
    error: E,
}

fn location_of(error: &(dyn Error + 'static)) -> Option<Location> {
    error
        .downcast_ref::<GenericError>()
        .map(GenericError::location)
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", WithFg::new(Color::Red, &self.error))?;
        if let Some(loc) = location_of(&self.error) {
            writeln!(f, "  at {}", WithFg::new(Color::DarkGray, loc))?;
        }
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {}", WithFg::new(Color::Red, s))?;
            if let Some(loc) = location_of(s) {
                writeln!(f, "      at {}", WithFg::new(Color::DarkGray, loc))?;
            }
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

impl<E> Report<E> {
    #[must_use]
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use alloc::{format, string::ToString};

    use snafu::{ResultExt as _, whatever};

    use super::*;

    #[derive(Debug, Snafu)]
    #[snafu(display("inner failure"))]
    struct InnerError;

    fn fails() -> Result<(), GenericError> {
        whatever!("top-level failure")
    }

    #[test]
    fn test_report_without_source() {
        ansi_term::set_enabled(false);
        let err = fails().unwrap_err();
        let location = err.location();
        let report = Report::new(err).to_string();
        assert_eq!(
            report,
            format!("Error: top-level failure\n  at {location}\n")
        );
    }

    #[test]
    fn test_report_lists_sources() {
        ansi_term::set_enabled(false);
        let err = Err::<(), _>(InnerError)
            .whatever_context::<_, GenericError>("outer failure")
            .unwrap_err();
        let location = err.location();
        let report = format!("{}", Report::new(err));
        assert_eq!(
            report,
            format!("Error: outer failure\n  at {location}\n\nCaused by:\n   0: inner failure\n")
        );
    }

    #[test]
    fn test_report_shows_nested_locations() {
        ansi_term::set_enabled(false);
        let inner = fails().unwrap_err();
        let inner_location = inner.location();
        let outer = Err::<(), _>(inner)
            .whatever_context::<_, GenericError>("outer failure")
            .unwrap_err();
        let outer_location = outer.location();
        assert_ne!(inner_location, outer_location);

        let report = Report::new(outer).to_string();
        let expected = format!(
            "Error: outer failure\n  at {outer_location}\n\nCaused by:\n   0: top-level \
             failure\n      at {inner_location}\n"
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_without_location() {
        ansi_term::set_enabled(false);
        let report = Report::new(InnerError).to_string();
        assert_eq!(report, "Error: inner failure\n");
    }

    #[test]
    fn test_location_points_at_caller() {
        let err = fails().unwrap_err();
        assert!(err.location().to_string().contains("lib.rs"));
    }
}
