/// Prefix state definitions for tracking traversal progress
///
/// A prefix leaves `Unvisited` exactly once and never returns to it.
use std::fmt;

/// Represents where a prefix stands in the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixState {
    /// Not queried or filtered yet
    Unvisited,

    /// Queried; the result was complete, so no children are explored
    Terminal,

    /// Queried; the result filled a page, so every child is explored
    Branching,

    /// Filtered out by policy without a query
    Rejected,
}

impl PrefixState {
    /// Returns true once the prefix has been handled (queried or rejected)
    pub fn is_visited(&self) -> bool {
        !matches!(self, Self::Unvisited)
    }

    /// Returns true if the prefix has children to explore
    pub fn has_children(&self) -> bool {
        matches!(self, Self::Branching)
    }

    /// Short lowercase label for logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Terminal => "terminal",
            Self::Branching => "branching",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PrefixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a prefix is not worth querying, if it isn't
///
/// Two consecutive spaces are never queried. A leading or trailing space is
/// only allowed when the whole prefix is that single space.
pub fn rejection_reason(prefix: &str) -> Option<&'static str> {
    if prefix.contains("  ") {
        return Some("consecutive spaces");
    }
    let space_boundary = prefix.starts_with(' ') || prefix.ends_with(' ');
    if space_boundary && prefix.chars().count() > 1 {
        return Some("leading or trailing space");
    }
    None
}
