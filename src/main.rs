use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use taskforge::export;
use taskforge::{
    AutoConfirm, Backend, Command, Config, Confirm, EXPORT_FILE_NAME, Filter, Outcome, SortOrder, Submitted, Task,
    TaskError, TaskStore,
};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "taskforge")]
#[command(about = "TaskForge - track, complete, search and export your tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the config file (default: ~/.config/taskforge/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the task data (overrides storage.path)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend (overrides storage.backend)
    #[arg(short, long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Replace the text of a task
    Edit {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Mark a task completed, or not completed again
    Toggle { id: String },

    /// Permanently delete a task
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove every task
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show tasks
    List {
        /// all, active or completed
        #[arg(short, long)]
        filter: Option<Filter>,
        /// Case-insensitive text search
        #[arg(short, long)]
        query: Option<String>,
        /// newest, oldest or completedAt
        #[arg(short, long)]
        sort: Option<SortOrder>,
    },

    /// Show task counters
    Stats,

    /// Export all tasks as CSV
    Export {
        /// Output file, or - for stdout
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,
    },

    /// Interactive session
    Shell,
}

/// Asks on stderr and reads the answer from stdin
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt.yellow());
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::source_path(cli.config.as_deref());
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.path = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    // Setup tracing
    init_tracing(cli.verbose, &config.log_level)?;
    info!(
        file = ?config_path,
        backend = ?config.storage.backend,
        data_dir = ?config.data_dir().ok(),
        "Configuration resolved"
    );

    let mut store = config.open_store()?;

    match cli.command {
        Commands::Add { text } => {
            let id = store.create(&text.join(" "))?;
            println!("Added task {}", id.dimmed());
        }
        Commands::Edit { id, text } => {
            if store.begin_edit(&id).is_none() {
                warn_missing(&id);
                return Ok(());
            }
            store.submit(&text.join(" "))?;
            println!("Updated task {}", id.dimmed());
        }
        Commands::Toggle { id } => {
            if store.toggle_complete(&id)? {
                let done = store.get(&id).is_some_and(|task| task.completed);
                println!("Marked {} as {}", id.dimmed(), if done { "completed" } else { "not completed" });
            } else {
                warn_missing(&id);
            }
        }
        Commands::Delete { id, yes } => {
            if store.get(&id).is_none() {
                warn_missing(&id);
            } else if store.delete(&id, confirmer(yes).as_mut())? {
                println!("Deleted task {}", id.dimmed());
            } else {
                println!("Cancelled");
            }
        }
        Commands::Clear { yes } => {
            if store.clear_all(confirmer(yes).as_mut())? {
                println!("All tasks cleared");
            } else {
                println!("Cancelled");
            }
        }
        Commands::List { filter, query, sort } => {
            if let Some(filter) = filter {
                store.set_filter(filter);
            }
            if let Some(query) = query {
                store.set_query(query);
            }
            if let Some(sort) = sort {
                store.set_sort(sort);
            }
            print_tasks(&store.view());
        }
        Commands::Stats => print_stats(&store),
        Commands::Export { output } => {
            if output.as_os_str() == "-" {
                println!("{}", store.export_csv());
            } else {
                export::write_csv(&output, store.tasks())?;
                println!("Exported {} tasks to {}", store.tasks().len(), output.display());
            }
        }
        Commands::Shell => run_shell(&mut store)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8, configured: &str) -> Result<()> {
    let level = match verbose {
        0 => configured
            .parse::<Level>()
            .map_err(|e| eyre!("Invalid log_level '{}': {}", configured, e))?,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes { Box::new(AutoConfirm(true)) } else { Box::new(StdinConfirm) }
}

fn warn_missing(id: &str) {
    eprintln!("{} no task with id {}", "warning:".yellow().bold(), id);
}

fn run_shell(store: &mut TaskStore) -> Result<()> {
    println!("{}", "TaskForge interactive session".bold());
    println!("Commands: add <text>, edit <id>, reset, toggle <id>, delete <id>, clear,");
    println!("          filter <all|active|completed>, search [text], sort <newest|oldest|completedAt>,");
    println!("          export, quit");
    println!();
    print_view(store);

    loop {
        let prompt = if store.editing().is_some() { "edit> " } else { "> " };
        print!("{}", prompt.cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let command: Command = match line.parse() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                continue;
            }
        };

        match store.dispatch(command, &mut StdinConfirm) {
            Ok(Outcome::Submitted(Submitted::Created(id))) => println!("Added task {}", id.dimmed()),
            Ok(Outcome::Submitted(Submitted::Updated(id))) => println!("Updated task {}", id.dimmed()),
            Ok(Outcome::Editing { id, text }) => {
                println!("Editing {}: {}", id.dimmed(), text);
                println!("Use `submit <text>` to save or `reset` to cancel");
                continue;
            }
            Ok(Outcome::Applied(false)) => println!("Nothing changed"),
            Ok(Outcome::Exported(csv)) => {
                fs::write(EXPORT_FILE_NAME, &csv).context("Failed to write CSV export")?;
                println!("Exported {} tasks to {}", store.tasks().len(), EXPORT_FILE_NAME);
                continue;
            }
            Ok(_) => {}
            Err(e) => match e.downcast_ref::<TaskError>() {
                Some(err) if err.is_validation() => {
                    eprintln!("{} {}", "error:".red().bold(), err);
                    continue;
                }
                _ => return Err(e),
            },
        }

        print_view(store);
    }

    Ok(())
}

fn print_view(store: &TaskStore) {
    let options = store.view_options();
    let query = options.query.trim();
    let header = if query.is_empty() {
        format!("[{} | {}]", options.filter, options.sort)
    } else {
        format!("[{} | {} | \"{}\"]", options.filter, options.sort, query)
    };
    println!("{}", header.dimmed());
    print_tasks(&store.view());
    print_stats(store);
}

fn print_tasks(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks match your filter.".dimmed());
        return;
    }

    for task in tasks {
        let (mark, text) = if task.completed {
            ("✓".green(), task.text.as_str().strikethrough().dimmed())
        } else {
            ("○".blue(), task.text.as_str().normal())
        };
        println!("{} {}  {}", mark, text, task.id.dimmed());

        let mut meta = format!("Created: {}", local_time(task.created_at));
        if let Some(updated_at) = task.updated_at {
            meta.push_str(&format!(" • Updated: {}", local_time(updated_at)));
        }
        if let Some(completed_at) = task.completed_at {
            meta.push_str(&format!(" • Done: {}", local_time(completed_at)));
        }
        println!("  {}", meta.dimmed());
    }
}

fn print_stats(store: &TaskStore) {
    let stats = store.stats();
    println!(
        "Total {} · Pending {} · Completed {}",
        stats.total.to_string().bold(),
        stats.pending.to_string().yellow(),
        stats.completed.to_string().green()
    );
}

fn local_time(ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
