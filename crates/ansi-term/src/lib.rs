//! Minimal ANSI colouring for terminal output.
//!
//! Colouring can be switched off process-wide with [`set_enabled`], after
//! which [`WithFg`] renders its value unchanged.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turns colouring on or off for every [`WithFg`] in the process.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    DarkGray,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    Default,
}

impl Color {
    fn fg(self) -> u8 {
        match self {
            Self::DarkGray => 90,
            Self::Red => 31,
            Self::Green => 32,
            Self::Yellow => 33,
            Self::Blue => 34,
            Self::Magenta => 35,
            Self::Cyan => 36,
            Self::Default => 39,
        }
    }
}

/// Displays a value in bold with the given foreground colour.
pub struct WithFg<T>(Color, T);

impl<T> fmt::Display for WithFg<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.1;
        if !is_enabled() {
            return fmt::Display::fmt(value, f);
        }
        let fg = self.0.fg();
        write!(f, "\x1B[{fg};1m")?;
        fmt::Display::fmt(value, f)?;
        write!(f, "\x1B[0m")
    }
}

impl<T> WithFg<T> {
    pub fn new(color: Color, value: T) -> Self {
        Self(color, value)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::format;

    use super::*;

    #[test]
    fn test_colour_toggle() {
        set_enabled(true);
        assert_eq!(
            format!("{}", WithFg::new(Color::Green, "free")),
            "\x1B[32;1mfree\x1B[0m"
        );
        // Width flags apply to the value, not the escape codes.
        assert_eq!(
            format!("{:>6}", WithFg::new(Color::DarkGray, 42)),
            "\x1B[90;1m    42\x1B[0m"
        );

        set_enabled(false);
        assert_eq!(format!("{:<6}|", WithFg::new(Color::Red, "used")), "used  |");
        set_enabled(true);
    }
}
