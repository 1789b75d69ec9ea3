//! Placement strategies.

use alloc::string::String;
use core::str::FromStr;

use derive_more::Display;
use snafu::Snafu;
use snafu_utils::Location;

/// Rule used to choose among the free blocks that can hold a request.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The first fitting free block in address order.
    #[display("first-fit")]
    FirstFit,
    /// The smallest fitting free block.
    #[display("best-fit")]
    BestFit,
    /// The largest fitting free block.
    #[display("worst-fit")]
    WorstFit,
}

impl Strategy {
    /// All strategies, in the order they are usually compared.
    pub const ALL: [Self; 3] = [Self::FirstFit, Self::BestFit, Self::WorstFit];

    /// Picks one of `candidates` and returns its index.
    ///
    /// `candidates` yields `(index, size)` for every free block large enough
    /// for the request, in address order. Ties on size go to the candidate
    /// seen first, i.e. the lowest address.
    pub(crate) fn select<I>(self, candidates: I) -> Option<usize>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut candidates = candidates.into_iter();
        let selected = match self {
            Self::FirstFit => candidates.next(),
            Self::BestFit => {
                candidates.reduce(|best, cand| if cand.1 < best.1 { cand } else { best })
            }
            Self::WorstFit => {
                candidates.reduce(|best, cand| if cand.1 > best.1 { cand } else { best })
            }
        };
        selected.map(|(index, _size)| index)
    }
}

/// Error returned when a strategy name is not recognized.
#[derive(Debug, Snafu)]
#[snafu(display(
    "unknown placement strategy {name:?}, expected first-fit, best-fit or worst-fit"
))]
pub struct ParseStrategyError {
    name: String,
    #[snafu(implicit)]
    location: Location,
}

impl ParseStrategyError {
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    /// Parses `first-fit`, `FirstFit`, `first_fit` or just `first` (and the
    /// same forms of best/worst), ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_'))
            .map(|ch| ch.to_ascii_lowercase())
            .collect::<String>();
        let key = key.strip_suffix("fit").unwrap_or(&key);
        match key {
            "first" => Ok(Self::FirstFit),
            "best" => Ok(Self::BestFit),
            "worst" => Ok(Self::WorstFit),
            _ => ParseStrategySnafu { name: s }.fail(),
        }
    }
}
