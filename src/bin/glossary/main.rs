//! Glossary REPL
//!
//! Reads chat lines from stdin and prints replies, standing in for a chat
//! framework. Prefix a line with `!` to address the bot.

mod command;
mod reply;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use glossary::{
    InMemoryRecordStore, KnowledgeStore, KnowledgeStoreConfig, RecordStore, Requester,
    StaticAdmins, DEFAULT_SAMPLE_SIZE,
};

use command::CommandParser;
use reply::Names;

#[derive(Parser)]
#[command(name = "glossary")]
#[command(about = "Conversational glossary - teach it terms, ask them back", long_about = None)]
#[command(version)]
struct Cli {
    /// Keep the glossary on disk in this directory (in memory otherwise)
    #[arg(long, short = 'd')]
    data_dir: Option<PathBuf>,

    /// User allowed to overwrite and forget terms (repeatable)
    #[arg(long = "admin")]
    admins: Vec<String>,

    /// User id the lines are sent as
    #[arg(long, default_value = "user")]
    user: String,

    /// Display name for `--user` (defaults to the id)
    #[arg(long)]
    name: Option<String>,

    /// Treat the session as a private conversation
    #[arg(long)]
    private: bool,

    /// Largest glossary listed in full in shared channels
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    list_threshold: usize,

    /// Terms shown in a ranked listing
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Print outcomes as JSON instead of English
    #[arg(long)]
    json: bool,
}

fn open_store(data_dir: Option<&PathBuf>) -> Result<Arc<dyn RecordStore>> {
    let Some(dir) = data_dir else {
        return Ok(Arc::new(InMemoryRecordStore::new()));
    };

    #[cfg(feature = "persistent")]
    {
        let store = glossary::open_database(dir, None)
            .with_context(|| format!("opening glossary at {}", dir.display()))?;
        info!(dir = %dir.display(), records = store.len()?, "opened glossary");
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "persistent"))]
    {
        anyhow::bail!(
            "--data-dir {} needs the `persistent` feature",
            dir.display()
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store = KnowledgeStore::with_config(
        open_store(cli.data_dir.as_ref())?,
        Arc::new(StaticAdmins::new(cli.admins.iter().cloned())),
        KnowledgeStoreConfig {
            list_threshold: cli.list_threshold,
            sample_size: cli.sample_size,
        },
    )?;
    let parser = CommandParser::new().context("compiling command routes")?;

    let mut requester = Requester::new(cli.user.clone());
    if let Some(name) = &cli.name {
        requester = requester.display_name(name.clone());
    }
    if cli.private {
        requester = requester.in_private();
    }
    let names = Names::from([(requester.user_id.clone(), requester.display_name.clone())]);

    info!(user = %requester.user_id, private = requester.private_channel, "glossary ready");

    let stdout = io::stdout();
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let Some(command) = parser.parse(&line) else {
            continue;
        };

        let outcome = match store.execute(&command.intent, &requester) {
            Ok(outcome) => outcome,
            Err(err) if err.is_validation() => {
                if !command.quiet {
                    writeln!(stdout.lock(), "{err}")?;
                }
                continue;
            }
            Err(err) => {
                warn!(error = %err, intent = command.intent.name(), "command failed");
                if !command.quiet {
                    writeln!(stdout.lock(), "{}", reply::UNAVAILABLE)?;
                }
                continue;
            }
        };

        let text = if cli.json {
            if command.quiet && matches!(&outcome, glossary::Outcome::Lookup(l) if !l.found) {
                continue;
            }
            Some(serde_json::to_string(&outcome)?)
        } else {
            reply::render(&outcome, command.quiet, &names)
        };
        if let Some(text) = text {
            writeln!(stdout.lock(), "{text}")?;
        }
    }

    Ok(())
}
