// palette-recall - a command palette that remembers what you ran last
//
// This is the main entry point. Parses CLI args, wires the palette together
// and dispatches to handlers.

use anyhow::Context;
use palette_recall_lib::{
    config::parse_history_length,
    core::{
        matcher::Span, spawn_capacity_sync, CandidateAggregator, CommandExecutor,
        CommandRegistry, CommandRunner, ExecutionError, RecencyStore, ResultPipeline,
    },
    logging, Database, PaletteError, Result, SettingsStore,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DB_ENV: &str = "PALETTE_RECALL_DB";
const COMMANDS_ENV: &str = "PALETTE_RECALL_COMMANDS";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    // Grab whatever the user typed
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = args[1].as_str();
    match command {
        "search" | "run" | "recent" | "clear" | "history" | "status" => {}
        "version" | "-v" | "--version" => {
            println!("palette-recall v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        "help" | "-h" | "--help" => {
            print_usage();
            return Ok(());
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            return Ok(());
        }
    }

    let palette = Palette::open().await?;

    let result = match command {
        "search" => handle_search(&palette, &args[2..]).await,
        "run" => handle_run(&palette, &args[2..]).await,
        "recent" => handle_recent(&palette, &args[2..]),
        "clear" => handle_clear(&palette).await,
        "history" => handle_history(&palette, &args[2..]).await,
        _ => handle_status(&palette).await,
    };

    palette.shutdown().await;

    if let Err(err) = result {
        eprintln!("Error: {}", err.user_message());
        std::process::exit(1);
    }

    Ok(())
}

/// Everything a handler needs, built once per process
struct Palette {
    db: Arc<Database>,
    settings: SettingsStore,
    history: Arc<RecencyStore>,
    registry: Arc<CommandRegistry>,
    capacity_sync: JoinHandle<()>,
}

impl Palette {
    async fn open() -> anyhow::Result<Self> {
        let db_path = database_path()?;
        let db = Database::new(&db_path)
            .await
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let db = Arc::new(db);

        let settings = SettingsStore::load(Arc::clone(&db))
            .await
            .context("failed to load settings")?;

        let history = RecencyStore::load(Arc::clone(&db), settings.current().history_length)
            .await
            .context("failed to load command history")?;
        let history = Arc::new(history);

        let capacity_sync = spawn_capacity_sync(Arc::clone(&history), settings.subscribe());
        let registry = Arc::new(load_registry()?);

        Ok(Self {
            db,
            settings,
            history,
            registry,
            capacity_sync,
        })
    }

    /// Let pending settings changes reach the history, then close the pool
    async fn shutdown(self) {
        let Palette {
            db,
            settings,
            capacity_sync,
            ..
        } = self;

        drop(settings);
        if let Err(err) = capacity_sync.await {
            tracing::warn!("history resize task failed: {err}");
        }
        db.close().await;
    }
}

fn database_path() -> anyhow::Result<PathBuf> {
    if let Some(path) = env::var_os(DB_ENV) {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().context("could not find home directory")?;
    Ok(home.join(".palette-recall").join("state.db"))
}

fn load_registry() -> anyhow::Result<CommandRegistry> {
    let Some(path) = env::var_os(COMMANDS_ENV) else {
        return Ok(CommandRegistry::builtin());
    };

    let path = PathBuf::from(path);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read command catalog {}", path.display()))?;
    let registry = CommandRegistry::from_json(&raw)
        .with_context(|| format!("invalid command catalog {}", path.display()))?;

    tracing::info!(commands = registry.len(), "loaded command catalog");
    Ok(registry)
}

/// Stand-in for a host that runs commands; the CLI just reports the pick
struct EchoExecutor;

impl CommandExecutor for EchoExecutor {
    fn execute(&self, command_id: &str) -> std::result::Result<(), ExecutionError> {
        println!("Running {}", command_id);
        Ok(())
    }
}

async fn handle_search(palette: &Palette, args: &[String]) -> Result<()> {
    let query = args.join(" ");
    let settings = palette.settings.current();
    let pipeline = ResultPipeline::new(
        Arc::clone(&palette.registry),
        Arc::clone(&palette.history),
        CandidateAggregator::from_settings(&settings),
    );

    // Ctrl+C abandons the query instead of killing the process mid-write
    let cancel = CancellationToken::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let results = pipeline.search(&query, None, &cancel).await;
    on_interrupt.abort();
    let results = results?;

    if results.is_empty() {
        println!("No commands found matching '{}'", query);
        return Ok(());
    }

    println!();
    for candidate in &results {
        if candidate.separator {
            if let Some(group) = &candidate.group_label {
                println!("-- {} --", group);
            }
        }

        let mut line = format!(
            "  {}",
            render_highlights(&candidate.label, &candidate.highlights.label)
        );
        if let Some(alias) = candidate.detail() {
            line.push_str(&format!("  [{}]", render_highlights(alias, &candidate.highlights.alias)));
        }
        if let Some(description) = &candidate.description {
            line.push_str(&format!("  ({})", description));
        }
        if let Some(keys) = &candidate.keybinding {
            line.push_str(&format!("  {}", keys));
        }
        println!("{}", line);
    }
    println!("\n{} command(s)", results.len());

    Ok(())
}

async fn handle_run(palette: &Palette, args: &[String]) -> Result<()> {
    let Some(command_id) = args.first() else {
        eprintln!("Error: No command id provided");
        return Ok(());
    };

    let Some(command) = palette.registry.find(command_id) else {
        if let Some(hint) = palette.registry.closest_match(command_id) {
            eprintln!("Did you mean '{}' ({})?", hint.id, hint.label());
        }
        return Err(PaletteError::CommandNotFound(command_id.clone()));
    };

    let runner = CommandRunner::new(Arc::clone(&palette.history), Arc::new(EchoExecutor))
        .with_run_delay(palette.settings.current().run_delay());

    runner.run(&command.id, &command.label()).await
}

fn handle_recent(palette: &Palette, args: &[String]) -> Result<()> {
    let limit = args
        .first()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10);

    let entries = palette.history.entries();
    if entries.is_empty() {
        println!("No commands used yet.");
        return Ok(());
    }

    println!("\nRecently used:");
    println!("{}", "=".repeat(60));
    for (i, entry) in entries.iter().take(limit).enumerate() {
        let label = palette
            .registry
            .find(&entry.command_id)
            .map(|command| command.label())
            .unwrap_or_else(|| entry.command_id.clone());
        println!("{:3}. {} (#{})", i + 1, label, entry.counter);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_clear(palette: &Palette) -> Result<()> {
    let forgotten = palette.history.len();
    palette.history.clear().await?;
    println!("Cleared {} recently used command(s).", forgotten);
    Ok(())
}

async fn handle_history(palette: &Palette, args: &[String]) -> Result<()> {
    let Some(raw) = args.first() else {
        println!(
            "Remembering up to {} command(s).",
            palette.settings.current().history_length
        );
        return Ok(());
    };

    let length = parse_history_length(raw)?;
    palette.settings.set_history_length(length).await?;

    if length == 0 {
        println!("Command history disabled.");
    } else {
        println!("Remembering up to {} command(s).", length);
    }
    Ok(())
}

async fn handle_status(palette: &Palette) -> Result<()> {
    let stats = palette.db.stats().await?;
    let settings = palette.settings.current();

    println!("\npalette-recall Status");
    println!("{}", "=".repeat(60));

    println!("\nHistory:");
    println!(
        "  Remembered:  {} of {}",
        palette.history.len(),
        palette.history.capacity()
    );
    println!("  Locale:      {}", settings.locale);
    println!("  Run delay:   {} ms", settings.run_delay_ms);

    println!("\nCommands:");
    println!("  Registered:  {}", palette.registry.len());

    println!("\nDatabase:");
    println!("  Path:        {}", palette.db.path().display());
    println!("  State rows:  {}", stats.total_state_entries);
    println!("  Preferences: {}", stats.total_preferences);

    println!("{}", "=".repeat(60));

    Ok(())
}

// Wraps highlighted char ranges in brackets: "[Fo]rmat [Do]cument"
fn render_highlights(text: &str, spans: &[Span]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 2);
    let mut spans = spans.iter().peekable();

    for (index, c) in text.chars().enumerate() {
        if spans.peek().is_some_and(|(start, _)| *start == index) {
            out.push('[');
        }
        out.push(c);
        if spans.peek().is_some_and(|(_, end)| *end == index + 1) {
            out.push(']');
            spans.next();
        }
    }

    out
}

fn print_usage() {
    println!(
        r#"palette-recall v{} - A command palette that remembers what you ran

USAGE:
    palette-recall <COMMAND> [OPTIONS]

COMMANDS:
    search <query>         Search commands, recently used first
    run <command-id>       Run a command and remember it
    recent [limit]         Show recently used commands (default: 10)
    clear                  Forget all recently used commands
    history [length]       Show or set how many commands to remember (0 = off)
    status                 Show status and stats
    version                Show version
    help                   Show this help

EXAMPLES:
    palette-recall search format doc
    palette-recall run editor.action.formatDocument
    palette-recall recent 20
    palette-recall history 100

ENVIRONMENT:
    PALETTE_RECALL_DB          Database file (default: ~/.palette-recall/state.db)
    PALETTE_RECALL_COMMANDS    JSON list of commands to use instead of the built-in set
    RUST_LOG                   Log filter, e.g. debug (default: warn)
"#,
        env!("CARGO_PKG_VERSION")
    );
}
