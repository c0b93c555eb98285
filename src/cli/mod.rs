pub mod history;
pub mod output;
pub mod watch;

use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use history::{process_history_command, HistoryAction, HistoryCommand};
use output::{render_tiles, short_id};
use tracing::{level_filters::LevelFilter, warn};
use uuid::Uuid;

use crate::{
    persistence::{file_storage::FileStateStorage, StateStorage},
    store::{entities::ActivityPatch, ActivityStore, DEFAULT_COLOR, DEFAULT_DURATION},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Crono", version, long_about = None)]
#[command(about = "Countdown timers for named activities", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "State directory. By default $XDG_STATE_HOME/crono or $HOME/.local/state/crono"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create an activity")]
    Add {
        name: String,
        #[arg(long, short, default_value = DEFAULT_COLOR, help = "Colour tag, for example bg-green-500")]
        color: String,
        #[arg(long, short, help = "Countdown length in minutes. Defaults to 30")]
        duration: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    #[command(about = "Delete an activity. Its history is kept")]
    Remove { activity: String },
    #[command(about = "Start the countdown of an activity. Restarts it if it is already running")]
    Start { activity: String },
    #[command(about = "Stop a running activity")]
    Stop { activity: String },
    #[command(about = "Start a stopped activity or stop a running one")]
    Toggle { activity: String },
    #[command(about = "Stop every running activity")]
    StopAll {},
    #[command(about = "Change fields of an activity")]
    Update {
        activity: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, short, help = "Set the time left in minutes")]
        duration: Option<u32>,
    },
    #[command(alias = "list", about = "Show all activities and their countdowns")]
    Status {
        #[arg(long, short, help = "Keep redrawing every second until Ctrl-C")]
        watch: bool,
    },
    #[command(about = "Show finished sessions", args_conflicts_with_subcommands = true)]
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Delete all activities and history")]
    Reset {
        #[arg(long, help = "Confirm that everything should be deleted")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let state_dir = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create state directory {}", dir.display()))?;
            dir
        }
        None => create_application_default_path()?,
    };

    enable_logging(CLI_PREFIX, &state_dir, args.log.then_some(LevelFilter::TRACE))?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let storage = FileStateStorage::new(state_dir, clock.clone())?;
    execute(args.commands, &storage, clock, std::io::stdout().is_terminal()).await
}

/// Loads the store, runs one command against it and saves it back if anything changed.
async fn execute(
    command: Commands,
    storage: &impl StateStorage,
    clock: Arc<dyn Clock>,
    coloured: bool,
) -> Result<()> {
    if let Commands::Status { watch: true } = command {
        return watch::watch(storage, clock, coloured).await;
    }

    let mut store = ActivityStore::new(storage.load().await?, clock);
    if apply(command, &mut store, coloured)? {
        storage.save(store.state()).await?;
    }
    Ok(())
}

/// Returns whether the store was changed.
fn apply(command: Commands, store: &mut ActivityStore, coloured: bool) -> Result<bool> {
    let changed = match command {
        Commands::Add {
            name,
            color,
            duration,
            description,
        } => {
            let name = name.trim();
            if name.is_empty() {
                println!("Activity name can't be empty");
                return Ok(false);
            }
            let duration = duration.map_or(DEFAULT_DURATION, minutes);
            let id = store.add_activity(name, color, duration, description);
            println!("Created {name} ({})", short_id(id));
            true
        }
        Commands::Remove { activity } => {
            let Some(id) = resolve_activity(store, &activity)? else {
                return Ok(false);
            };
            store.remove_activity(id)
        }
        Commands::Start { activity } => {
            let Some(id) = resolve_activity(store, &activity)? else {
                return Ok(false);
            };
            store.start_activity(id)
        }
        Commands::Stop { activity } => {
            let Some(id) = resolve_activity(store, &activity)? else {
                return Ok(false);
            };
            let stopped = store.stop_activity(id);
            if !stopped {
                println!("{activity} is not running");
            }
            stopped
        }
        Commands::Toggle { activity } => {
            let Some(id) = resolve_activity(store, &activity)? else {
                return Ok(false);
            };
            store.toggle_activity(id).is_some()
        }
        Commands::StopAll {} => {
            let stopped = store.clear_active_activities();
            if stopped == 0 {
                println!("Nothing is running");
            }
            stopped > 0
        }
        Commands::Update {
            activity,
            name,
            color,
            description,
            duration,
        } => {
            let Some(id) = resolve_activity(store, &activity)? else {
                return Ok(false);
            };
            let patch = ActivityPatch {
                name,
                color,
                description,
                time_left: duration.map(minutes),
                ..Default::default()
            };
            if patch.is_empty() {
                println!("Nothing to update");
                return Ok(false);
            }
            store.update_activity(id, &patch)
        }
        Commands::Status { .. } => false,
        Commands::History {
            action: None,
            command,
        } => {
            process_history_command(command, store)?;
            return Ok(false);
        }
        Commands::History {
            action: Some(HistoryAction::Delete { entry }),
            ..
        } => {
            let ids = store.history().iter().map(|v| v.id).collect::<Vec<_>>();
            let Some(id) = pick_single(&entry, matching_ids(&entry, ids))? else {
                return Ok(false);
            };
            let removed = store.remove_history_entry(id);
            println!("Deleted history entry {}", short_id(id));
            return Ok(removed);
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("This deletes every activity and all history. Run again with --yes");
                return Ok(false);
            }
            store.reset_store();
            println!("Everything was deleted");
            return Ok(true);
        }
    };

    print!("{}", render_tiles(store, coloured));
    Ok(changed)
}

fn minutes(value: u32) -> Duration {
    Duration::minutes(value.into())
}

/// Finds an activity by exact id, exact name or a unique id prefix. Nothing matching is not an
/// error, the command just does nothing.
fn resolve_activity(store: &ActivityStore, query: &str) -> Result<Option<Uuid>> {
    let by_name = store
        .activities()
        .iter()
        .filter(|v| v.name == query)
        .map(|v| v.id)
        .collect::<Vec<_>>();

    let candidates = if by_name.is_empty() {
        matching_ids(query, store.activities().iter().map(|v| v.id))
    } else {
        by_name
    };
    pick_single(query, candidates)
}

fn pick_single(query: &str, candidates: Vec<Uuid>) -> Result<Option<Uuid>> {
    match candidates.as_slice() {
        [] => {
            warn!("Nothing matches {query:?}");
            println!("Nothing matches {query:?}");
            Ok(None)
        }
        [id] => Ok(Some(*id)),
        _ => bail!(
            "{query:?} matches {} entries, use a longer id",
            candidates.len()
        ),
    }
}

/// Ids equal to `query` or starting with it, with or without hyphens.
fn matching_ids(query: &str, ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let query = query.trim().to_ascii_lowercase();
    if query.is_empty() {
        return vec![];
    }
    if let Ok(exact) = Uuid::parse_str(&query) {
        return ids.into_iter().filter(|v| *v == exact).collect();
    }
    ids.into_iter()
        .filter(|id| {
            id.hyphenated().to_string().starts_with(&query)
                || id.simple().to_string().starts_with(&query)
        })
        .collect()
}
