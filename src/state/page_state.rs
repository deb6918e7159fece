/// Page state definitions for reporting crawl progress
///
/// This module defines the states a single catalog page ends up in.
use std::fmt;

/// Represents how processing of one page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Page was fetched and yielded at least one product
    Succeeded,

    /// Page was fetched but yielded no products; pagination ends here
    Empty,

    /// Fetch or extraction failed
    Failed,
}

impl PageState {
    /// Returns true if the page was fetched and parsed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Empty)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Empty => "empty",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
