/// Palette settings
///
/// Settings live in the `preferences` table and are broadcast to running
/// components through a watch channel, so a change made at runtime (for
/// example a new history length) reaches the recency store without a restart.

use crate::db::Database;
use crate::error::{PaletteError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Number of commands remembered when nothing is configured
pub const DEFAULT_HISTORY_LENGTH: usize = 50;

/// Display language the command titles are authored in
pub const DEFAULT_LOCALE: &str = "en";

pub const HISTORY_KEY: &str = "palette.history";
pub const LOCALE_KEY: &str = "palette.locale";
pub const RUN_DELAY_KEY: &str = "palette.run_delay_ms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How many recently used commands to remember; 0 turns history off
    pub history_length: usize,
    /// Active display language
    pub locale: String,
    /// Delay between closing the palette and running the picked command
    pub run_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_length: DEFAULT_HISTORY_LENGTH,
            locale: DEFAULT_LOCALE.to_string(),
            run_delay_ms: 0,
        }
    }
}

impl Settings {
    /// Whether the palette runs in the language commands are authored in.
    /// Aliases are only shown outside of it.
    pub fn uses_default_locale(&self) -> bool {
        let locale = self.locale.trim().to_ascii_lowercase();
        locale.is_empty() || locale == DEFAULT_LOCALE || locale.starts_with("en-")
    }

    pub fn run_delay(&self) -> Duration {
        Duration::from_millis(self.run_delay_ms)
    }
}

/// Loads, persists and broadcasts [`Settings`]
pub struct SettingsStore {
    db: Arc<Database>,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Read settings from the database, falling back to defaults for
    /// anything missing or malformed
    pub async fn load(db: Arc<Database>) -> Result<Self> {
        let defaults = Settings::default();

        let history_length = match db.get_preference(HISTORY_KEY).await? {
            Some(raw) => parse_history_length(&raw).unwrap_or_else(|err| {
                tracing::warn!(value = %raw, "ignoring {HISTORY_KEY}: {err}");
                defaults.history_length
            }),
            None => defaults.history_length,
        };

        let locale = db
            .get_preference(LOCALE_KEY)
            .await?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.locale);

        let run_delay_ms = match db.get_preference(RUN_DELAY_KEY).await? {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ignoring {RUN_DELAY_KEY}: not a number");
                defaults.run_delay_ms
            }),
            None => defaults.run_delay_ms,
        };

        let (tx, _rx) = watch::channel(Settings {
            history_length,
            locale,
            run_delay_ms,
        });

        Ok(Self { db, tx })
    }

    /// Current settings
    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every later change
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Persist a new history length and notify subscribers
    pub async fn set_history_length(&self, length: usize) -> Result<()> {
        self.db
            .set_preference(HISTORY_KEY.to_string(), length.to_string())
            .await?;
        self.tx.send_modify(|settings| settings.history_length = length);
        Ok(())
    }

    /// Persist a new display locale and notify subscribers
    pub async fn set_locale(&self, locale: &str) -> Result<()> {
        let locale = locale.trim();
        if locale.is_empty() {
            return Err(PaletteError::Config("locale must not be empty".to_string()));
        }

        self.db
            .set_preference(LOCALE_KEY.to_string(), locale.to_string())
            .await?;
        self.tx
            .send_modify(|settings| settings.locale = locale.to_string());
        Ok(())
    }

    /// Persist a new run delay and notify subscribers
    pub async fn set_run_delay_ms(&self, delay_ms: u64) -> Result<()> {
        self.db
            .set_preference(RUN_DELAY_KEY.to_string(), delay_ms.to_string())
            .await?;
        self.tx.send_modify(|settings| settings.run_delay_ms = delay_ms);
        Ok(())
    }
}

/// Parse a history length preference. Negative numbers are treated as 0.
pub fn parse_history_length(raw: &str) -> Result<usize> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| PaletteError::Config(format!("'{}' is not a whole number", raw.trim())))?;

    Ok(usize::try_from(value.max(0)).unwrap_or(usize::MAX))
}
