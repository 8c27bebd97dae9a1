/// Candidate aggregation
///
/// Collects commands from the active surface (editor, panel, ...) and from the
/// global registry into one list, local commands first.

use crate::config::Settings;
use crate::core::registry::{CommandDescriptor, CommandRegistry};
use crate::error::{PaletteError, Result};

/// Id of the palette's own "show all commands" action. Listing it inside the
/// palette would only reopen the palette.
pub const SHOW_COMMANDS_ID: &str = "workbench.action.showCommands";

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Local,
    Global,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Local => "local",
            SourceKind::Global => "global",
        };
        write!(f, "{}", s)
    }
}

/// A surface that offers actions relevant to its current state
pub trait LocalActionProvider {
    fn supported_actions(&self) -> Result<Vec<CommandDescriptor>>;
}

/// Descriptor flattened into the shape the pipeline filters on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub command_id: String,
    pub label: String,
    pub alias: Option<String>,
    pub source: SourceKind,
}

/// Merges local and global commands
pub struct CandidateAggregator {
    show_aliases: bool,
}

impl CandidateAggregator {
    /// # Arguments
    /// * `show_aliases` - Keep descriptor aliases. Only useful when the UI is
    ///   not in the language the commands were written in.
    pub fn new(show_aliases: bool) -> Self {
        Self { show_aliases }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(!settings.uses_default_locale())
    }

    /// Collect every candidate, local first
    ///
    /// Any failing source fails the whole collection; no partial lists.
    pub fn collect(
        &self,
        context: Option<&dyn LocalActionProvider>,
        registry: &CommandRegistry,
    ) -> Result<Vec<RawCandidate>> {
        let mut candidates = Vec::new();

        if let Some(provider) = context {
            let actions = provider.supported_actions().map_err(|err| {
                PaletteError::AggregationFailed(format!("local actions unavailable: {}", err))
            })?;

            candidates.extend(
                actions
                    .iter()
                    .filter(|action| action.id != SHOW_COMMANDS_ID)
                    .map(|action| self.to_candidate(action, SourceKind::Local)),
            );
        }

        // Snapshot is released at the end of this block
        {
            let snapshot = registry.snapshot()?;
            candidates.extend(
                snapshot
                    .descriptors()
                    .iter()
                    .map(|command| self.to_candidate(command, SourceKind::Global)),
            );
        }

        Ok(candidates)
    }

    fn to_candidate(&self, descriptor: &CommandDescriptor, source: SourceKind) -> RawCandidate {
        let alias = if self.show_aliases {
            descriptor
                .alias
                .as_deref()
                .map(str::trim)
                .filter(|alias| !alias.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        RawCandidate {
            command_id: descriptor.id.clone(),
            label: descriptor.label(),
            alias,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EditorActions(Vec<CommandDescriptor>);

    impl LocalActionProvider for EditorActions {
        fn supported_actions(&self) -> Result<Vec<CommandDescriptor>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSurface;

    impl LocalActionProvider for BrokenSurface {
        fn supported_actions(&self) -> Result<Vec<CommandDescriptor>> {
            Err(PaletteError::Generic("editor disposed".to_string()))
        }
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::with_commands(vec![
            CommandDescriptor::new("file.save", "Save").with_category("File"),
            CommandDescriptor::new("git.push", "Push")
                .with_category("Git")
                .with_alias("Git: Push"),
        ])
    }

    #[test]
    fn test_local_first_and_tagged() {
        let editor = EditorActions(vec![
            CommandDescriptor::new("editor.format", "Format Document"),
            CommandDescriptor::new(SHOW_COMMANDS_ID, "Show All Commands"),
        ]);
        let aggregator = CandidateAggregator::new(false);

        let candidates = aggregator.collect(Some(&editor), &registry()).unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.command_id.as_str()).collect();

        assert_eq!(ids, vec!["editor.format", "file.save", "git.push"]);
        assert_eq!(candidates[0].source, SourceKind::Local);
        assert_eq!(candidates[1].source, SourceKind::Global);
        assert_eq!(candidates[1].label, "File: Save");
    }

    #[test]
    fn test_no_surface_means_global_only() {
        let aggregator = CandidateAggregator::new(false);
        let candidates = aggregator.collect(None, &registry()).unwrap();

        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.source == SourceKind::Global));
    }

    #[test]
    fn test_aliases_only_outside_default_locale() {
        let english = CandidateAggregator::from_settings(&Settings::default());
        let candidates = english.collect(None, &registry()).unwrap();
        assert!(candidates.iter().all(|c| c.alias.is_none()));

        let german = CandidateAggregator::from_settings(&Settings {
            locale: "de".to_string(),
            ..Settings::default()
        });
        let candidates = german.collect(None, &registry()).unwrap();
        assert_eq!(candidates[1].alias.as_deref(), Some("Git: Push"));
    }

    #[test]
    fn test_failing_surface_fails_collection_and_releases_registry() {
        let registry = registry();
        let aggregator = CandidateAggregator::new(false);

        let result = aggregator.collect(Some(&BrokenSurface), &registry);
        match result {
            Err(PaletteError::AggregationFailed(reason)) => {
                assert!(reason.contains("editor disposed"))
            }
            _ => panic!("Expected AggregationFailed error"),
        }

        registry.register(CommandDescriptor::new("late", "Late"));
        assert_eq!(registry.len(), 3);
    }
}
