/// Crawl state definitions for the coordinator loop
use std::fmt;

/// Represents the state of a crawl run
///
/// A run starts `Running` and ends in one of the terminal states. Every URL
/// skipped along the way is reported as `Failed(url)`; the loop keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Pending URLs remain and the page budget is not spent
    Running,

    /// The page budget was reached
    Saturated,

    /// The frontier ran dry before the budget was reached
    Exhausted,

    /// The deadline passed or a stop was requested
    Interrupted,

    /// One URL failed and was skipped; the loop continues
    Failed(String),
}

impl CrawlState {
    /// Returns true if the loop stops in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saturated | Self::Exhausted | Self::Interrupted)
    }

    /// Short lowercase name, also used for run status rows
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Saturated => "saturated",
            Self::Exhausted => "exhausted",
            Self::Interrupted => "interrupted",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(url) => write!(f, "failed({})", url),
            other => write!(f, "{}", other.label()),
        }
    }
}
