use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use sm_core::{MemoryEntry, Phase, needs_completion, parse_iso8601, to_iso8601};
use sm_store::Library;

#[derive(Parser)]
#[command(name = "sm", about = "Scripture memorization scheduler")]
struct Cli {
    /// Treat this local date/time as "now" (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true, value_parser = parse_as_of)]
    as_of: Option<NaiveDateTime>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a passage, starting at day one of phase 1
    Add {
        /// Book/chapter/verse reference
        reference: String,

        /// Verse text as NUMBER=TEXT (repeatable)
        #[arg(long = "verse", value_parser = parse_verse)]
        verses: Vec<(u32, String)>,

        /// Plain flashcard outside the phase schedule
        #[arg(long)]
        flashcard: bool,
    },

    /// Add a passage you are already partway through memorizing
    Import {
        reference: String,

        /// Phase to start in (phase1, phase2, phase3)
        #[arg(long)]
        phase: Phase,

        /// Cadence units already completed in that phase
        #[arg(long, allow_negative_numbers = true)]
        count: i64,

        /// Already completed for the current day/month
        #[arg(long)]
        done_today: bool,

        /// Verse text as NUMBER=TEXT (repeatable)
        #[arg(long = "verse", value_parser = parse_verse)]
        verses: Vec<(u32, String)>,
    },

    /// List all entries
    List,

    /// Show entries that need completion now
    Due,

    /// Record a completion for an entry
    Complete {
        /// Entry id or unique id prefix
        id: String,
    },

    /// Show one entry in full
    Show {
        /// Entry id or unique id prefix
        id: String,
    },

    /// Delete an entry
    Remove {
        /// Entry id or unique id prefix
        id: String,
    },

    /// Show collection statistics and the current streak
    Stats,

    /// Export all entries to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Restore entries from a JSON export
    Restore {
        /// Input file path
        path: PathBuf,
    },
}

fn parse_as_of(s: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_iso8601(s).ok_or_else(|| format!("expected YYYY-MM-DD[THH:MM:SS], got '{s}'"))
}

fn parse_verse(s: &str) -> std::result::Result<(u32, String), String> {
    let (number, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NUMBER=TEXT, got '{s}'"))?;
    let number = number
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad verse number '{number}': {e}"))?;
    Ok((number, text.trim().to_string()))
}

fn open_library() -> Result<Library> {
    let base_dir = std::env::var("SM_DATA_DIR").ok().map(PathBuf::from);
    Library::open(base_dir.as_deref()).context("failed to open library")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let now = cli
        .as_of
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    let library = open_library()?;

    match &cli.command {
        Commands::Add {
            reference,
            verses,
            flashcard,
        } => cmd_add(&library, reference, verses, *flashcard, now),
        Commands::Import {
            reference,
            phase,
            count,
            done_today,
            verses,
        } => cmd_import(&library, reference, verses, *phase, *count, *done_today, now),
        Commands::List => cmd_list(&library, now),
        Commands::Due => cmd_due(&library, now),
        Commands::Complete { id } => cmd_complete(&library, id, now),
        Commands::Show { id } => cmd_show(&library, id, now),
        Commands::Remove { id } => cmd_remove(&library, id),
        Commands::Stats => cmd_stats(&library, now),
        Commands::Export { path } => cmd_export(&library, path, now),
        Commands::Restore { path } => cmd_restore(&library, path),
    }
}

fn short_id(entry: &MemoryEntry) -> String {
    entry.id.to_string()[..8].to_string()
}

/// `phase1 2/5`, `phase3 7`, or `flashcard`.
fn progress_label(entry: &MemoryEntry) -> String {
    if !entry.is_system_managed {
        return "flashcard".to_string();
    }
    let phase = entry.current_phase;
    let units = entry.current_progress().units_completed;
    match phase.threshold() {
        Some(threshold) => format!("{phase} {units}/{threshold}"),
        None => format!("{phase} {units}"),
    }
}

fn new_entry(
    reference: &str,
    verses: &[(u32, String)],
    managed: bool,
    now: NaiveDateTime,
) -> Result<MemoryEntry> {
    if reference.trim().is_empty() {
        bail!("reference must not be empty");
    }
    let mut entry = if managed {
        MemoryEntry::new(reference.trim(), now)
    } else {
        MemoryEntry::new_flashcard(reference.trim(), now)
    };
    for (number, text) in verses {
        entry = entry.with_verse(*number, text);
    }
    Ok(entry)
}

fn cmd_add(
    library: &Library,
    reference: &str,
    verses: &[(u32, String)],
    flashcard: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let managed = library.config().default_managed && !flashcard;
    let entry = new_entry(reference, verses, managed, now)?;
    library
        .store()
        .save_entry(&entry)
        .context("failed to save entry")?;
    println!(
        "added {} {} ({})",
        short_id(&entry),
        entry.reference,
        progress_label(&entry)
    );
    Ok(())
}

fn cmd_import(
    library: &Library,
    reference: &str,
    verses: &[(u32, String)],
    phase: Phase,
    count: i64,
    done_today: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let entry = new_entry(reference, verses, true, now)?;
    let entry = library
        .store()
        .import_entry(entry, phase, count, done_today, now)
        .context("failed to import entry")?;
    let due = if needs_completion(&entry, now) {
        "due now"
    } else {
        "done for now"
    };
    println!(
        "imported {} {} ({}, {due})",
        short_id(&entry),
        entry.reference,
        progress_label(&entry)
    );
    Ok(())
}

fn cmd_list(library: &Library, now: NaiveDateTime) -> Result<()> {
    let entries = library
        .store()
        .load_entries()
        .context("failed to load entries")?;
    if entries.is_empty() {
        println!("(no entries)");
        return Ok(());
    }
    for entry in &entries {
        let marker = if needs_completion(entry, now) { "*" } else { " " };
        println!(
            "{marker} {}  {:<24} {}",
            short_id(entry),
            entry.reference,
            progress_label(entry)
        );
    }
    Ok(())
}

fn cmd_due(library: &Library, now: NaiveDateTime) -> Result<()> {
    let due = library
        .store()
        .due_entries(now)
        .context("failed to load entries")?;
    if due.is_empty() {
        println!("nothing due");
        return Ok(());
    }
    for entry in &due {
        let reps = entry
            .todays_repetitions()
            .map(|r| format!("  x{r}"))
            .unwrap_or_default();
        println!(
            "{}  {:<24} {}{reps}",
            short_id(entry),
            entry.reference,
            progress_label(entry)
        );
        let text = entry.full_text();
        if !text.is_empty() {
            println!("    {text}");
        }
    }
    Ok(())
}

fn cmd_complete(library: &Library, id: &str, now: NaiveDateTime) -> Result<()> {
    let store = library.store();
    let entry = store.find_entry(id).context("failed to find entry")?;
    let before = entry.current_phase;

    match store.complete_entry(entry.id, now) {
        Ok(done) => {
            println!("completed {} ({})", done.reference, progress_label(&done));
            if done.is_system_managed && done.current_phase != before {
                println!("advanced to {}", done.current_phase);
            }
            Ok(())
        }
        Err(e) if e.is_already_completed() => {
            println!("{} already completed: {e}", entry.reference);
            Ok(())
        }
        Err(e) => Err(e).context("failed to record completion"),
    }
}

fn cmd_show(library: &Library, id: &str, now: NaiveDateTime) -> Result<()> {
    let entry = library
        .store()
        .find_entry(id)
        .context("failed to find entry")?;

    println!("id:         {}", entry.id);
    println!("reference:  {}", entry.reference);
    println!("progress:   {}", progress_label(&entry));
    if entry.is_system_managed {
        for phase in Phase::ALL {
            println!(
                "  {phase}:    {}",
                entry.progress(phase).units_completed
            );
        }
    }
    println!(
        "last done:  {}",
        entry
            .last_completion_date
            .map(to_iso8601)
            .unwrap_or_else(|| "never".to_string())
    );
    println!("added:      {}", to_iso8601(entry.date_added));
    println!("due:        {}", needs_completion(&entry, now));
    if let Some(reps) = entry.todays_repetitions() {
        println!("repeat:     {reps} times");
    }
    for (number, text) in entry.verses() {
        println!("  {number} {text}");
    }
    Ok(())
}

fn cmd_remove(library: &Library, id: &str) -> Result<()> {
    let store = library.store();
    let entry = store.find_entry(id).context("failed to find entry")?;
    store
        .delete_entry(entry.id)
        .context("failed to delete entry")?;
    println!("removed {} {}", short_id(&entry), entry.reference);
    Ok(())
}

fn cmd_stats(library: &Library, now: NaiveDateTime) -> Result<()> {
    let store = library.store();
    let entries = store.load_entries().context("failed to load entries")?;
    let stats = sm_core::statistics(&entries, now);
    let streak = sm_core::completion_streak(&entries, now);

    println!("total:      {}", stats.total);
    println!("phase1:     {}", stats.phase1_count);
    println!("phase2:     {}", stats.phase2_count);
    println!("phase3:     {}", stats.phase3_count);
    println!("flashcards: {}", stats.unmanaged_count);
    println!("due:        {}", stats.due_today_count);
    println!("streak:     {streak}");
    println!("database:   {}", library.db_path().display());
    Ok(())
}

fn cmd_export(library: &Library, path: &Path, now: NaiveDateTime) -> Result<()> {
    let count = library
        .store()
        .export_json_file(path, now)
        .context("failed to export entries")?;
    println!("exported {count} entries to {}", path.display());
    Ok(())
}

fn cmd_restore(library: &Library, path: &Path) -> Result<()> {
    let count = library
        .store()
        .import_json_file(path)
        .context("failed to restore entries")?;
    println!("restored {count} entries from {}", path.display());
    Ok(())
}
