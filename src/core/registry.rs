/// Global command registry
///
/// Holds every globally registered command. Sources that register late
/// (plugins loading after startup) flip the readiness flag once they are done.

use crate::error::{PaletteError, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard};
use tokio::sync::watch;

/// Raw description of a command as a source reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Title in the language the command was authored in
    #[serde(default)]
    pub alias: Option<String>,
}

impl CommandDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: None,
            alias: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Text shown in the palette: `Category: Title`, the bare title, or the
    /// id when there is no title at all
    pub fn label(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            return self.id.clone();
        }

        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => format!("{}: {}", category, title),
            _ => title.to_string(),
        }
    }
}

/// Read access to the registry for the duration of one aggregation
///
/// Registration is blocked while a snapshot is alive, so keep it short and
/// let it drop as soon as the descriptors are copied out.
pub struct RegistrySnapshot<'a> {
    guard: RwLockReadGuard<'a, Vec<CommandDescriptor>>,
}

impl RegistrySnapshot<'_> {
    pub fn descriptors(&self) -> &[CommandDescriptor] {
        &self.guard
    }
}

/// Thread-safe registry of global commands
pub struct CommandRegistry {
    commands: RwLock<Vec<CommandDescriptor>>,
    ready: watch::Sender<bool>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Create an empty registry that is still loading
    pub fn new() -> Self {
        let (ready, _rx) = watch::channel(false);
        Self {
            commands: RwLock::new(Vec::new()),
            ready,
        }
    }

    /// Registry preloaded with `commands` and marked ready
    pub fn with_commands(commands: Vec<CommandDescriptor>) -> Self {
        let registry = Self::new();
        registry.register_all(commands);
        registry.mark_ready();
        registry
    }

    /// Parse a JSON array of descriptors
    pub fn from_json(raw: &str) -> Result<Self> {
        let commands: Vec<CommandDescriptor> = serde_json::from_str(raw)?;
        Ok(Self::with_commands(commands))
    }

    /// Small built-in catalog used when no catalog file is configured
    pub fn builtin() -> Self {
        Self::with_commands(vec![
            CommandDescriptor::new("workbench.action.files.save", "Save").with_category("File"),
            CommandDescriptor::new("workbench.action.files.saveAll", "Save All")
                .with_category("File"),
            CommandDescriptor::new("workbench.action.files.newUntitledFile", "New Untitled File")
                .with_category("File"),
            CommandDescriptor::new("workbench.action.closeActiveEditor", "Close Editor")
                .with_category("View"),
            CommandDescriptor::new("workbench.action.toggleSidebarVisibility", "Toggle Primary Side Bar Visibility")
                .with_category("View"),
            CommandDescriptor::new("workbench.action.openSettings", "Open Settings")
                .with_category("Preferences"),
            CommandDescriptor::new("workbench.action.selectTheme", "Color Theme")
                .with_category("Preferences"),
            CommandDescriptor::new("workbench.action.clearCommandHistory", "Clear Command History"),
            CommandDescriptor::new("workbench.action.reloadWindow", "Reload Window")
                .with_category("Developer"),
            CommandDescriptor::new("editor.action.formatDocument", "Format Document"),
            CommandDescriptor::new("git.commit", "Commit").with_category("Git"),
            CommandDescriptor::new("git.pull", "Pull").with_category("Git"),
            CommandDescriptor::new("git.push", "Push").with_category("Git"),
        ])
    }

    /// Add a command, replacing an earlier registration with the same id
    pub fn register(&self, descriptor: CommandDescriptor) {
        let mut commands = self.write_commands();
        match commands.iter_mut().find(|c| c.id == descriptor.id) {
            Some(existing) => *existing = descriptor,
            None => commands.push(descriptor),
        }
    }

    pub fn register_all(&self, descriptors: impl IntoIterator<Item = CommandDescriptor>) {
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    /// Remove a command. Returns false if it wasn't registered.
    pub fn unregister(&self, id: &str) -> bool {
        let mut commands = self.write_commands();
        let before = commands.len();
        commands.retain(|c| c.id != id);
        commands.len() != before
    }

    /// Signal that every source has finished registering
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once [`mark_ready`](Self::mark_ready) has been called
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this can't observe a closed channel
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Scoped read access for aggregation
    pub fn snapshot(&self) -> Result<RegistrySnapshot<'_>> {
        let guard = self
            .commands
            .read()
            .map_err(|_| PaletteError::AggregationFailed("command registry is poisoned".to_string()))?;
        Ok(RegistrySnapshot { guard })
    }

    pub fn find(&self, id: &str) -> Option<CommandDescriptor> {
        self.read_commands().iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_commands().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best fuzzy match for a mistyped id or label, for "did you mean" hints
    pub fn closest_match(&self, query: &str) -> Option<CommandDescriptor> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let matcher = SkimMatcherV2::default();
        self.read_commands()
            .iter()
            .filter_map(|command| {
                let by_id = matcher.fuzzy_match(&command.id, query);
                let by_label = matcher.fuzzy_match(&command.label(), query);
                by_id.max(by_label).map(|score| (score, command))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, command)| command.clone())
    }

    fn read_commands(&self) -> RwLockReadGuard<'_, Vec<CommandDescriptor>> {
        self.commands
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_commands(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CommandDescriptor>> {
        self.commands
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
