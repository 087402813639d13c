use anyhow::Context;
use clap::{Parser, Subcommand};
use migrate::{MigrateOptions, AUTH_SCHEMA, AUTH_TABLES};
use recipes::{Pipeline, Recipe, RecipeReport};
use scribe::Scribe;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Idempotent patches for web front-end artifacts", long_about = None)]
struct Cli {
    /// Artifact root; recipe paths resolve against it.
    #[arg(long, global = true, env = "RETOUCH_ROOT", default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in recipes in run order.
    List,
    /// Apply recipes (all of them when none are named) plus their dependencies.
    Apply {
        /// Recipe names.
        recipes: Vec<String>,
    },
    /// Apply recipes loaded from a JSON manifest file or directory.
    Plan {
        /// Manifest file, or a directory of `*.json` manifests.
        path: PathBuf,
    },
    /// Run the auth/purchase schema script against the SQLite database.
    Migrate {
        /// Database file, relative to the root.
        #[arg(long, default_value = "data/search.db")]
        db: PathBuf,
        /// Schema script, relative to the root.
        #[arg(long, default_value = "db/schema-auth.sql")]
        schema: PathBuf,
        /// Use the schema compiled into the binary instead of `--schema`.
        #[arg(long, conflicts_with = "schema")]
        bundled: bool,
        /// Create the database when it does not exist.
        #[arg(long)]
        create: bool,
    },
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::List => cmd_list()?,
        Commands::Apply { recipes } => cmd_apply(&cli.root, recipes)?,
        Commands::Plan { path } => cmd_plan(&cli.root, path)?,
        Commands::Migrate {
            db,
            schema,
            bundled,
            create,
        } => cmd_migrate(&cli.root, db, schema, *bundled, *create)?,
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn cmd_list() -> anyhow::Result<()> {
    let pipeline = Pipeline::builtin()?;

    println!("+------------------------------------------+");
    println!("| RETOUCH RECIPES                          |");
    println!("+------------------------------------------+");
    println!("| Count          : {:>22} |", pipeline.recipes().len());
    println!("+------------------------------------------+");

    for (i, recipe) in pipeline.order().iter().enumerate() {
        println!(
            "  {:>2}. {:<24} {}",
            i + 1,
            recipe.name,
            recipe.artifact.display()
        );
        if !recipe.requires.is_empty() {
            println!("      requires: {}", recipe.requires.join(", "));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// apply / plan
// ---------------------------------------------------------------------------

fn cmd_apply(root: &Path, names: &[String]) -> anyhow::Result<()> {
    let pipeline = Pipeline::builtin()?;
    let selected = if names.is_empty() {
        pipeline.order()
    } else {
        pipeline.select(names)?
    };
    execute(root, selected)
}

fn cmd_plan(root: &Path, manifest: &Path) -> anyhow::Result<()> {
    let plan = recipes::plan(manifest)
        .with_context(|| format!("Failed to load plan {}", manifest.display()))?;
    execute(root, plan.recipes()?)
}

fn execute(root: &Path, selected: Vec<&Recipe>) -> anyhow::Result<()> {
    let scribe = Scribe::open(root)
        .with_context(|| format!("Failed to open artifact root {}", root.display()))?;
    tracing::debug!(root = %scribe.root().display(), recipes = selected.len(), "running recipes");
    let reports = recipes::run(&scribe, selected)?;
    print_reports(scribe.root(), &reports);
    Ok(())
}

fn print_reports(root: &Path, reports: &[RecipeReport]) {
    let changed = reports.iter().filter(|r| r.changed()).count();

    println!("+------------------------------------------+");
    println!("| RETOUCH APPLY                            |");
    println!("+------------------------------------------+");
    println!("| Recipes        : {:>22} |", reports.len());
    println!("| Changed        : {:>22} |", changed);
    println!("| Up to date     : {:>22} |", reports.len() - changed);
    println!("+------------------------------------------+");
    println!("  root: {}", root.display());

    for report in reports {
        let status = if report.changed() { "patched" } else { "unchanged" };
        println!(
            "\n  {} -> {} [{}]",
            report.recipe,
            report.artifact.rel.display(),
            status
        );
        for edit in &report.artifact.edits {
            let mark = if edit.changed { "+" } else { "=" };
            println!("    {} {}", mark, edit.patch);
        }
    }
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

fn cmd_migrate(
    root: &Path,
    db: &Path,
    schema: &Path,
    bundled: bool,
    create: bool,
) -> anyhow::Result<()> {
    let db_path = root.join(db);
    let script = if bundled {
        AUTH_SCHEMA.to_string()
    } else {
        let schema_path = root.join(schema);
        migrate::load_script(&schema_path).context("pass --bundled to use the built-in schema")?
    };

    let report = migrate::migrate(
        &db_path,
        &script,
        AUTH_TABLES,
        MigrateOptions {
            create_missing: create,
        },
    )
    .with_context(|| format!("Migration of {} failed", db_path.display()))?;

    println!("+------------------------------------------+");
    println!("| RETOUCH MIGRATE                          |");
    println!("+------------------------------------------+");
    println!("| Tables present : {:>22} |", report.present.len());
    println!("| Tables missing : {:>22} |", report.missing.len());
    println!("+------------------------------------------+");
    for table in &report.present {
        println!("  ok      {table}");
    }
    for table in &report.missing {
        println!("  MISSING {table}");
    }

    if !report.is_complete() {
        anyhow::bail!("{} expected table(s) missing", report.missing.len());
    }
    Ok(())
}
