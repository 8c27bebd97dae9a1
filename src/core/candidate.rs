/// Per-query result entries

use crate::core::aggregator::{RawCandidate, SourceKind};
use crate::core::matcher::MatchHighlights;

/// Group label for commands with a usage counter
pub const RECENTLY_USED: &str = "recently used";

/// Group label for everything after the recently used block
pub const OTHER_COMMANDS: &str = "other commands";

/// One palette entry produced for a single query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub command_id: String,
    pub label: String,
    pub alias: Option<String>,
    pub source: SourceKind,
    /// Set by grouping only
    pub group_label: Option<String>,
    /// Set only when another entry shows the same label
    pub description: Option<String>,
    pub keybinding: Option<String>,
    pub highlights: MatchHighlights,
    /// First entry of a labelled group; the UI draws a divider above it
    pub separator: bool,
}

impl Candidate {
    pub fn new(command_id: impl Into<String>, label: impl Into<String>, source: SourceKind) -> Self {
        Self {
            command_id: command_id.into(),
            label: label.into(),
            alias: None,
            source,
            group_label: None,
            description: None,
            keybinding: None,
            highlights: MatchHighlights::default(),
            separator: false,
        }
    }

    pub fn from_raw(raw: RawCandidate, highlights: MatchHighlights) -> Self {
        Self {
            command_id: raw.command_id,
            label: raw.label,
            alias: raw.alias,
            source: raw.source,
            group_label: None,
            description: None,
            keybinding: None,
            highlights,
            separator: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Alias worth showing as a detail line: present and different from the label
    pub fn detail(&self) -> Option<&str> {
        self.alias
            .as_deref()
            .filter(|alias| *alias != self.label)
    }
}
