//! RD Dashboard CLI - import, export, back up and summarize dashboard data
//!
//! # Main Commands
//!
//! ```bash
//! rd-dashboard import-tasks planner.csv      # Replace tasks from a planner export
//! rd-dashboard import-projects projects.csv  # Replace projects from CSV/JSON
//! rd-dashboard export-projects -o out.csv    # Export stored projects
//! rd-dashboard backup projects -o bak.json   # Write a backup envelope
//! rd-dashboard restore projects bak.json     # Restore from a backup envelope
//! rd-dashboard stats                         # Project statistics
//! rd-dashboard report                        # Task report and KPIs
//! ```
//!
//! # Maintenance / Debug Commands
//!
//! ```bash
//! rd-dashboard validate projects.json        # Check project records
//! rd-dashboard cleanup                       # Drop invalid stored projects
//! rd-dashboard reset tasks                   # Empty a collection
//! rd-dashboard tokenize 'a,"b,c",d'          # Show how a CSV line splits
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use rd_dashboard::backup::backup_store;
use rd_dashboard::stats::{checklist_status, recent_activity, task_kpis, task_report};
use rd_dashboard::{
    cleanup_invalid_projects, export_projects_csv, export_tasks_csv, import_file, open_store,
    project_stats, reset, restore_backup, split_fields, validate_project, CalamineReader, Config,
    JsonFileStore, Project, ProjectDraft, RecordKind, RecordStore, Task,
};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Activity feed length in the task report
const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "rd-dashboard")]
#[command(about = "Import, validate, summarize and back up R&D dashboard data", long_about = None)]
struct Cli {
    /// Store directory (default: $DASHBOARD_DATA_DIR or .rd-dashboard)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Source read timeout in seconds (default: $DASHBOARD_FETCH_TIMEOUT_SECS or 30)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Collection {
    Projects,
    Tasks,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace stored projects from a CSV, XLSX or JSON file (path or URL)
    ImportProjects {
        input: String,
    },

    /// Replace stored tasks from a planner CSV or XLSX export (path or URL)
    ImportTasks {
        input: String,
    },

    /// Export stored projects as CSV
    ExportProjects {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export stored tasks as planner CSV
    ExportTasks {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a backup envelope of one collection
    Backup {
        #[arg(value_enum)]
        collection: Collection,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore one collection from a backup envelope (path or URL)
    Restore {
        #[arg(value_enum)]
        collection: Collection,

        input: String,
    },

    /// Show project statistics
    Stats {
        /// Include the delivery checklist of every project
        #[arg(long)]
        checklist: bool,
    },

    /// Show the task report, KPIs and recent activity
    Report,

    /// Validate project records from a JSON file (array or envelope)
    Validate {
        input: PathBuf,
    },

    /// Remove stored projects that fail validation
    Cleanup,

    /// Empty one stored collection
    Reset {
        #[arg(value_enum)]
        collection: Collection,
    },

    /// Split one CSV line into fields
    Tokenize {
        line: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };
    let mut store = open_store(&config.data_dir);

    let result = match cli.command {
        Commands::ImportProjects { input } => {
            cmd_import(&mut store, RecordKind::Projects, &input, &config).await
        }

        Commands::ImportTasks { input } => {
            cmd_import(&mut store, RecordKind::Tasks, &input, &config).await
        }

        Commands::ExportProjects { output } => export_projects_csv(&store)
            .map_err(Into::into)
            .and_then(|csv| write_output(&csv, output.as_deref())),

        Commands::ExportTasks { output } => export_tasks_csv(&store)
            .map_err(Into::into)
            .and_then(|csv| write_output(&csv, output.as_deref())),

        Commands::Backup { collection, output } => cmd_backup(&store, collection, output.as_deref()),

        Commands::Restore { collection, input } => {
            cmd_restore(&mut store, collection, &input, &config).await
        }

        Commands::Stats { checklist } => cmd_stats(&store, checklist),

        Commands::Report => cmd_report(&store),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Cleanup => cmd_cleanup(&mut store),

        Commands::Reset { collection } => match collection {
            Collection::Projects => reset::<Project, _>(&mut store).map_err(Into::into),
            Collection::Tasks => reset::<Task, _>(&mut store).map_err(Into::into),
        },

        Commands::Tokenize { line } => cmd_tokenize(&line),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_fetch_timeout(secs);
    }
    Ok(config)
}

async fn cmd_import(
    store: &mut JsonFileStore,
    kind: RecordKind,
    input: &str,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input);

    let report = import_file(store, kind, input, config.fetch_timeout, &CalamineReader).await?;

    if let Some(encoding) = &report.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    for skip in report.skipped_rows.iter().take(5) {
        eprintln!("   ⚠️  Row {}: {}", skip.line, skip.reason);
    }
    eprintln!("✅ {}", report.summary());
    Ok(())
}

fn cmd_backup(
    store: &JsonFileStore,
    collection: Collection,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = match collection {
        Collection::Projects => backup_store::<Project, _>(store)?.to_json()?,
        Collection::Tasks => backup_store::<Task, _>(store)?.to_json()?,
    };
    write_output(&json, output)
}

async fn cmd_restore(
    store: &mut JsonFileStore,
    collection: Collection,
    input: &str,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Restoring: {}", input);

    let bytes = rd_dashboard::source::read_source(input, config.fetch_timeout).await?;
    let text = rd_dashboard::decode_bytes(&bytes).text;

    let report = match collection {
        Collection::Projects => restore_backup::<Project, _>(store, text)?,
        Collection::Tasks => restore_backup::<Task, _>(store, text)?,
    };

    for rejected in report.rejected.iter().take(5) {
        eprintln!("   ⚠️  Record {}: {}", rejected.index, rejected.errors.join("; "));
    }
    eprintln!("✅ {}", report.summary());
    Ok(())
}

fn cmd_stats(store: &JsonFileStore, checklist: bool) -> Result<(), Box<dyn std::error::Error>> {
    let projects: Vec<Project> = store.load()?;
    let mut output = json!({ "stats": project_stats(&projects) });

    if checklist {
        let gates: Vec<Value> = projects
            .iter()
            .map(|p| {
                let status: serde_json::Map<String, Value> = checklist_status(p)
                    .into_iter()
                    .map(|(gate, reached)| (gate.as_str().to_string(), Value::Bool(reached)))
                    .collect();
                json!({ "id": p.id, "name": p.name, "checklist": status })
            })
            .collect();
        output["checklist"] = Value::Array(gates);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_report(store: &JsonFileStore) -> Result<(), Box<dyn std::error::Error>> {
    let tasks: Vec<Task> = store.load()?;
    if tasks.is_empty() {
        eprintln!("📋 No tasks stored yet.");
        eprintln!("   Use 'rd-dashboard import-tasks <file>' to add some.");
        return Ok(());
    }

    let recent: Vec<Value> = recent_activity(&tasks, RECENT_ACTIVITY_LIMIT)
        .into_iter()
        .map(|t| json!({ "taskName": t.task_name, "progress": t.progress, "createdDate": t.created_date }))
        .collect();

    let output = json!({
        "kpis": task_kpis(&tasks),
        "report": task_report(&tasks),
        "recentActivity": recent,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("projects")) {
            Some(Value::Array(records)) => records,
            _ => return Err("expected an array of projects or a records envelope".into()),
        },
        _ => return Err("expected an array of projects or a records envelope".into()),
    };

    let mut valid = 0;
    let mut invalid = 0;

    for (i, record) in records.into_iter().enumerate() {
        let errors = match serde_json::from_value::<ProjectDraft>(record) {
            Ok(draft) => validate_project(&draft),
            Err(e) => vec![format!("Unreadable project: {}", e)],
        };

        if errors.is_empty() {
            valid += 1;
        } else {
            invalid += 1;
            if invalid <= 5 {
                eprintln!("\n❌ Record {} invalid:", i);
                for err in &errors {
                    eprintln!("   - {}", err);
                }
            }
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_cleanup(store: &mut JsonFileStore) -> Result<(), Box<dyn std::error::Error>> {
    let remaining = cleanup_invalid_projects(store)?;
    eprintln!("✅ {} valid projects remain", remaining);
    Ok(())
}

fn cmd_tokenize(line: &str) -> Result<(), Box<dyn std::error::Error>> {
    let fields = split_fields(line);
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
