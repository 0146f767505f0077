//! Navigation through a result set
//!
//! A pure cursor over `total` matches. Stepping wraps at both ends and never
//! touches the document.

use std::fmt;
use std::str::FromStr;

/// Direction of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "next" | "down" => Ok(Direction::Next),
            "prev" | "previous" | "up" => Ok(Direction::Prev),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

/// Current position within a result set.
///
/// `current` is `Some` exactly when `total > 0`, and then always `< total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationState {
    pub current: Option<usize>,
    pub total: usize,
}

impl NavigationState {
    /// No matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fresh result set, positioned on its first match.
    pub fn new(total: usize) -> Self {
        Self {
            current: if total > 0 { Some(0) } else { None },
            total,
        }
    }

    /// A result set recomputed for a replaced document.
    ///
    /// Keeps the previous index if it still fits, otherwise falls back to
    /// the first match.
    pub fn preserve(previous: Option<usize>, total: usize) -> Self {
        let current = match previous {
            _ if total == 0 => None,
            Some(index) if index < total => Some(index),
            _ => Some(0),
        };
        Self { current, total }
    }

    /// Step in `direction`, wrapping at the ends.
    pub fn advance(&mut self, direction: Direction) {
        *self = advance(*self, direction);
    }

    /// "N of M", "No matches", or empty when there is nothing to show.
    pub fn counter_label(&self, has_query: bool) -> String {
        match self.current {
            Some(index) if self.total > 0 => format!("{} of {}", index + 1, self.total),
            _ if has_query => "No matches".to_string(),
            _ => String::new(),
        }
    }
}

/// The state after one step in `direction`.
///
/// With no matches the state is returned unchanged.
pub fn advance(state: NavigationState, direction: Direction) -> NavigationState {
    if state.total == 0 {
        return state;
    }
    let index = state.current.unwrap_or(0).min(state.total - 1);
    let next = match direction {
        Direction::Next => (index + 1) % state.total,
        Direction::Prev => (index + state.total - 1) % state.total,
    };
    NavigationState {
        current: Some(next),
        total: state.total,
    }
}
