use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use progress_ledger::api;
use progress_ledger::config::Config;
use progress_ledger::db::SqliteStore;
use progress_ledger::models::*;
use progress_ledger::stats::{format_minutes, parse_minutes};
use progress_ledger::tracker::Tracker;

#[derive(Parser)]
#[command(name = "pledger")]
#[command(about = "Log work sessions and keep at most three projects alive")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Log a work session
    Log {
        /// Project label
        #[arg(short, long)]
        project: String,
        /// Time worked, e.g. "45 min"
        #[arg(short, long)]
        time: String,
        /// Concrete result of the session
        #[arg(short, long)]
        achievement: String,
        /// Pointer to proof of work
        #[arg(short, long, default_value = "")]
        evidence: String,
        /// Display date; defaults to now
        #[arg(short, long)]
        date: Option<String>,
    },
    /// List logged sessions
    List {
        /// Case-insensitive search over project, achievement and evidence
        #[arg(short, long)]
        search: Option<String>,
        /// Only this exact project label
        #[arg(short, long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Date)]
        sort: SortArg,
    },
    /// Edit fields of a logged session
    Edit {
        id: Uuid,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        achievement: Option<String>,
        #[arg(long)]
        evidence: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a logged session
    Delete { id: Uuid },
    /// Delete every logged session
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Show aggregate statistics
    Stats,
    /// Show projects, countdowns, graveyard and idea bank
    Status,
    /// Export the ledger to stdout
    Export {
        #[arg(value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
    /// Manage active projects
    #[command(subcommand)]
    Project(ProjectCommands),
    /// Manage the idea bank
    #[command(subcommand)]
    Idea(IdeaCommands),
    /// Show or change presentation settings
    Settings {
        #[arg(long)]
        power_zone_start: Option<String>,
        #[arg(long)]
        power_zone_end: Option<String>,
        #[arg(long)]
        dark_mode: Option<bool>,
    },
    /// Write the config file
    Config {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        data_dir: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Start a 7-day countdown on a new project
    Add { name: String },
    /// Give up on a project, moving it to the graveyard
    Remove { id: Uuid },
    /// List active projects
    List,
}

#[derive(Subcommand)]
enum IdeaCommands {
    /// Bank an idea for later
    Add { text: String },
    /// Turn an idea into an active project
    Promote { id: Uuid },
    /// Delete an idea
    Delete { id: Uuid },
    /// List banked ideas
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Date,
    Project,
    Time,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortBy::Date,
            SortArg::Project => SortBy::Project,
            SortArg::Time => SortBy::Time,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

/// Initialize tracing with output to stderr (CLI commands) or stdout (server)
fn init_tracing(filter: &str, use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(filter);

    if use_stderr {
        // Keep stdout clean for exports and listings
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let store = SqliteStore::open(config.db_path()?)?;
    store.migrate()?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    let is_server = matches!(cli.command, Some(Commands::Serve { .. }) | None);
    init_tracing(config.log_filter(), !is_server);

    match cli.command {
        Some(Commands::Serve { port }) => serve(&config, port.unwrap_or(config.port)).await?,
        None => serve(&config, config.port).await?,
        Some(Commands::Config { port, data_dir }) => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            if data_dir.is_some() {
                config.data_dir = data_dir;
            }
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Some(command) => {
            let tracker = Tracker::new(open_store(&config)?);
            run(&tracker, command)?;
        }
    }

    Ok(())
}

async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting progress ledger server on port {}", port);

    let app = api::create_router(open_store(config)?);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Progress ledger listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn run(tracker: &Tracker<SqliteStore>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Log {
            project,
            time,
            achievement,
            evidence,
            date,
        } => {
            let entry = tracker.log(CreateEntryInput {
                date,
                project,
                time_worked: time,
                achievement,
                evidence,
            })?;
            println!("Saved {} ({})", entry.id, entry.date);
            print_active(&tracker.dashboard().active);
        }
        Commands::List {
            search,
            project,
            sort,
        } => {
            let entries = tracker.ledger().query(&EntryQuery {
                search,
                project,
                sort: sort.into(),
            });
            if entries.is_empty() {
                println!("No sessions logged.");
            }
            for entry in entries {
                print_entry(&entry);
            }
        }
        Commands::Edit {
            id,
            project,
            time,
            achievement,
            evidence,
            date,
        } => {
            let input = UpdateEntryInput {
                date,
                project,
                time_worked: time,
                achievement,
                evidence,
            };
            if input.is_empty() {
                anyhow::bail!("Nothing to change");
            }
            match tracker.update_entry(id, input)? {
                Some(entry) => print_entry(&entry),
                None => println!("No session with id {}", id),
            }
        }
        Commands::Delete { id } => {
            tracker.remove_entry(id)?;
            println!("Deleted {}", id);
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete every session without --yes");
            }
            tracker.clear_entries()?;
            println!("Ledger cleared");
        }
        Commands::Stats => {
            let stats = tracker.dashboard().stats;
            println!("Sessions:      {}", stats.total_sessions);
            println!("Time:          {}", format_minutes(stats.total_minutes));
            println!("Projects:      {}", stats.total_projects);
            println!("Average:       {}", format_minutes(stats.average_time));
            println!("Evidence rate: {}%", stats.evidence_rate);
            println!("Last 7 days:   {} / 7", stats.last_7_days);
            if let Some(last) = stats.last_session {
                println!("Last session:  {} - {}", last.project, last.achievement);
            }
        }
        Commands::Status => {
            let dashboard = tracker.dashboard();
            print_active(&dashboard.active);
            println!();
            println!("Graveyard ({}):", dashboard.dead.len());
            for dead in &dashboard.dead {
                if dead.expired() {
                    println!("  {} - ran out of time", dead.name);
                } else {
                    println!("  {} - dropped on day {}", dead.name, dead.died_on_day);
                }
            }
            println!();
            print_ideas(&dashboard.ideas);
        }
        Commands::Export { format } => match format {
            ExportFormat::Json => println!("{}", tracker.ledger().export_json()?),
            ExportFormat::Csv => println!("{}", tracker.ledger().export_csv()),
        },
        Commands::Project(ProjectCommands::Add { name }) => {
            let project = tracker.add_project(&name)?;
            println!("Activated {} ({}), 7 days on the clock", project.name, project.id);
        }
        Commands::Project(ProjectCommands::Remove { id }) => match tracker.remove_project(id)? {
            Some(dead) => println!("Moved {} to the graveyard on day {}", dead.name, dead.died_on_day),
            None => println!("No active project with id {}", id),
        },
        Commands::Project(ProjectCommands::List) => print_active(&tracker.dashboard().active),
        Commands::Idea(IdeaCommands::Add { text }) => {
            let idea = tracker.add_idea(&text)?;
            println!("Banked idea {}", idea.id);
        }
        Commands::Idea(IdeaCommands::Promote { id }) => match tracker.promote_idea(id)? {
            Some(project) => println!("Promoted {} ({})", project.name, project.id),
            None => println!("No idea with id {}", id),
        },
        Commands::Idea(IdeaCommands::Delete { id }) => {
            tracker.delete_idea(id)?;
            println!("Deleted idea {}", id);
        }
        Commands::Idea(IdeaCommands::List) => print_ideas(&tracker.lifecycle().state().ideas),
        Commands::Settings {
            power_zone_start,
            power_zone_end,
            dark_mode,
        } => {
            let current = tracker.settings().get();
            let power_zone = if power_zone_start.is_some() || power_zone_end.is_some() {
                Some(PowerZone {
                    start: power_zone_start.unwrap_or(current.power_zone.start),
                    end: power_zone_end.unwrap_or(current.power_zone.end),
                })
            } else {
                None
            };
            let settings = tracker.settings().update(UpdateSettingsInput {
                power_zone,
                dark_mode,
            })?;
            println!(
                "Power zone: {} - {}",
                settings.power_zone.start, settings.power_zone.end
            );
            println!("Dark mode:  {}", settings.dark_mode);
        }
        Commands::Serve { .. } | Commands::Config { .. } => unreachable!("handled in main"),
    }
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    println!(
        "{}  {}  {} [{}]",
        entry.id,
        entry.date,
        entry.project,
        format_minutes(parse_minutes(&entry.time_worked))
    );
    println!("    {}", entry.achievement);
    if entry.has_evidence() {
        println!("    evidence: {}", entry.evidence);
    }
}

fn print_active(active: &[ActiveProject]) {
    println!("Active projects ({}/{}):", active.len(), MAX_ACTIVE_PROJECTS);
    for project in active {
        let unit = if project.days_left == 1 { "day" } else { "days" };
        println!(
            "  {}  {} - {} {} left - {}",
            project.id, project.name, project.days_left, unit, project.last_progress
        );
    }
}

fn print_ideas(ideas: &[Idea]) {
    println!("Idea bank ({}):", ideas.len());
    for idea in ideas {
        println!("  {}  {}", idea.id, idea.text);
    }
}
