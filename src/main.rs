//! Anchorpost CLI - manage values and quotes, render quote cards, run the admin server

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use anchorpost::config::{self, AnchorConfig, Backend, StorageConfig};
use anchorpost::importer::{self, ImportSummary};
use anchorpost::model::NewQuotePost;
use anchorpost::render::{Renderer, RenderedImage, sanitize, validate};
use anchorpost::storage::{self, SeedOutcome, Store};
use anchorpost::{quality, server, ui};

#[derive(Parser)]
#[command(name = "anchorpost")]
#[command(version)]
#[command(about = "Core values, quotes and branded quote-card images")]
#[command(long_about = r#"
Anchorpost keeps a small relational store of core values, supporting values,
authors and quotes, and renders them into 1080x1350 quote cards.

Example usage:
  anchorpost init
  anchorpost import "Core Values.csv"
  anchorpost serve --port 3000
  anchorpost render --core-value Growth --supporting-value Curiosity \
      --quote "Stay hungry, stay foolish." --out card.png
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config and ANCHORPOST_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Storage backend (overrides config and ANCHORPOST_BACKEND)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and admin pages
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,
    },

    /// Import a Notion CSV export
    Import {
        /// Path to the CSV export
        csv: PathBuf,

        /// Replace existing data instead of refusing to import
        #[arg(long)]
        replace: bool,
    },

    /// Seed an empty store from the configured CSV or sample data
    Seed,

    /// Show counts of active rows
    Stats,

    /// Rate the quotes of a Notion CSV export
    Analyze {
        /// Path to the CSV export
        csv: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a post from a random, thematically linked selection
    RandomPost,

    /// Render a quote card to a PNG file
    Render {
        #[arg(long)]
        core_value: String,

        #[arg(long)]
        supporting_value: String,

        #[arg(long)]
        quote: String,

        #[arg(long)]
        author: Option<String>,

        /// Style id (style1 or an active preset)
        #[arg(long, default_value = "style1")]
        style: String,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Render a stored post to a PNG file
    RenderPost {
        post_id: String,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Copy all data between a JSON database and a SQLite database
    #[command(group(ArgGroup::new("source").required(true).args(["from_json", "from_sqlite"])))]
    #[command(group(ArgGroup::new("target").required(true).args(["to_json", "to_sqlite"])))]
    Migrate {
        #[arg(long)]
        from_json: Option<PathBuf>,

        #[arg(long)]
        from_sqlite: Option<PathBuf>,

        #[arg(long)]
        to_json: Option<PathBuf>,

        #[arg(long)]
        to_sqlite: Option<PathBuf>,

        /// Overwrite a target that already has data
        #[arg(long)]
        replace: bool,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // init writes the config file, so it must not fail on a broken one
    let mut config = if matches!(cli.command, Commands::Init { .. }) {
        AnchorConfig::default()
    } else {
        config::load_config(cli.config.as_deref())?
    };
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
        if cli.database.is_none() {
            config.storage.path = config::default_database_path(backend);
        }
    }
    if let Some(database) = cli.database {
        config.storage.path = database;
    }

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            config::ensure_db_dir(&config.storage.path)?;
            server::start_server(config).await
        }
        Commands::Import { csv, replace } => run_import(&config, &csv, replace),
        Commands::Seed => run_seed(&config),
        Commands::Stats => {
            let store = open_store(&config.storage)?;
            let stats = store.stats()?;
            ui::header(&format!("Store statistics ({})", store.backend().as_str()));
            println!("{}", ui::stats_table(&stats));
            Ok(())
        }
        Commands::Analyze { csv, format } => run_analyze(&csv, format),
        Commands::RandomPost => run_random_post(&config),
        Commands::Render {
            core_value,
            supporting_value,
            quote,
            author,
            style,
            out,
        } => {
            let body = serde_json::json!({
                "coreValue": core_value,
                "supportingValue": supporting_value,
                "quote": quote,
                "author": author,
                "style": style,
            });
            let input = match validate::validate_quote(&body) {
                Ok(input) => sanitize::sanitize_quote(&input),
                Err(fields) => {
                    for (field, message) in &fields {
                        ui::error(&format!("{}: {}", field, message));
                    }
                    bail!("invalid quote card input");
                }
            };

            let renderer = Renderer::from_config(&config.render);
            let spinner = ui::Spinner::new("Rendering quote card...");
            let image = renderer.render_quote(&input).await;
            write_image(&spinner, image, &out)
        }
        Commands::RenderPost { post_id, out } => {
            let post = {
                let store = open_store(&config.storage)?;
                store
                    .get_quote_post(&post_id)?
                    .with_context(|| format!("quote post {} not found", post_id))?
            };

            let renderer = Renderer::from_config(&config.render);
            let spinner = ui::Spinner::new("Rendering post...");
            let image = renderer.render_post(&post).await;
            write_image(&spinner, image, &out)
        }
        Commands::Migrate {
            from_json,
            from_sqlite,
            to_json,
            to_sqlite,
            replace,
        } => {
            let source = match (from_json, from_sqlite) {
                (Some(path), _) => storage_config(Backend::Json, path),
                (None, Some(path)) => storage_config(Backend::Sqlite, path),
                (None, None) => bail!("a source database is required"),
            };
            let target = match (to_json, to_sqlite) {
                (Some(path), _) => storage_config(Backend::Json, path),
                (None, Some(path)) => storage_config(Backend::Sqlite, path),
                (None, None) => bail!("a target database is required"),
            };
            run_migrate(&source, &target, replace)
        }
        Commands::Init { force } => run_init(cli.config.as_deref(), force),
    }
}

fn storage_config(backend: Backend, path: PathBuf) -> StorageConfig {
    StorageConfig { backend, path }
}

fn open_store(storage: &StorageConfig) -> anyhow::Result<Box<dyn Store>> {
    config::ensure_db_dir(&storage.path)?;
    storage::open_store(storage).with_context(|| format!("failed to open {}", storage.path.display()))
}

fn write_image(spinner: &ui::Spinner, image: anchorpost::Result<RenderedImage>, out: &Path) -> anyhow::Result<()> {
    let image = match image {
        Ok(image) => image,
        Err(e) => {
            spinner.fail("Rendering failed");
            return Err(e.into());
        }
    };
    std::fs::write(out, &image.png).with_context(|| format!("failed to write {}", out.display()))?;
    spinner.finish(&format!("Wrote {} ({} bytes)", out.display(), image.png.len()));
    ui::summary_row("ETag", &image.etag);
    Ok(())
}

fn run_init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let config = AnchorConfig::default();
    config::write_config(&path, &config, force)?;
    config::ensure_db_dir(&config.storage.path)?;
    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    config::ensure_gitignore(root)?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::info("Database", &config.storage.path.display().to_string());
    Ok(())
}

fn run_import(config: &AnchorConfig, csv: &Path, replace: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(csv).with_context(|| format!("failed to read {}", csv.display()))?;
    let mut store = open_store(&config.storage)?;
    if !replace && !store.is_empty()? {
        bail!("the store already has data; pass --replace to overwrite it");
    }

    let spinner = ui::Spinner::new("Parsing Notion export...");
    let dataset = importer::parse_notion_csv(&content);
    spinner.set_message("Writing to the store...");
    store.replace_dataset(&dataset)?;
    spinner.finish("Import complete");

    println!("{}", ui::summary_table(&ImportSummary::from(&dataset)));
    Ok(())
}

fn run_seed(config: &AnchorConfig) -> anyhow::Result<()> {
    let mut store = open_store(&config.storage)?;
    match storage::seed_sample_data(&mut *store, config.import.csv_path.as_deref())? {
        SeedOutcome::AlreadySeeded => ui::warn("Store already has data; nothing seeded"),
        SeedOutcome::Imported(summary) => {
            ui::success("Seeded from the Notion export");
            println!("{}", ui::summary_table(&summary));
        }
        SeedOutcome::Samples(summary) => {
            ui::success("Seeded with sample data");
            println!("{}", ui::summary_table(&summary));
        }
    }
    Ok(())
}

fn run_analyze(csv: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(csv).with_context(|| format!("failed to read {}", csv.display()))?;
    let report = quality::analyze(&importer::parse_notion_csv(&content));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            ui::header("Data quality report");
            println!("{}", ui::quality_table(&report));

            let recs = &report.recommendations;
            if !recs.archive.is_empty() {
                ui::section(&format!(" Archive ({}) ", recs.archive.len()));
                for line in &recs.archive {
                    println!("  {}", line);
                }
            }
            if !recs.needs_review.is_empty() {
                ui::section(&format!(" Needs review ({}) ", recs.needs_review.len()));
                for line in &recs.needs_review {
                    println!("  {}", ui::dim(line));
                }
            }
            if !recs.duplicates.is_empty() {
                ui::section(&format!(" Linked to several core values ({}) ", recs.duplicates.len()));
                for line in &recs.duplicates {
                    println!("  {}", ui::muted(line));
                }
            }
        }
    }
    Ok(())
}

fn run_random_post(config: &AnchorConfig) -> anyhow::Result<()> {
    let mut store = open_store(&config.storage)?;
    let Some(data) = store.random_post_data(&mut rand::thread_rng())? else {
        bail!("not enough thematically related data; link supporting values and quotes to a core value first");
    };

    let post = store.create_quote_post(NewQuotePost {
        core_value_id: data.core_value.id.clone(),
        supporting_value_id: data.supporting_value.id.clone(),
        quote_id: data.quote.quote.id.clone(),
        ..Default::default()
    })?;

    ui::success(&format!("Created post {}", post.id));
    ui::status(ui::Icons::ANCHOR, "Core value", &data.core_value.value);
    ui::status(ui::Icons::LINK, "Supporting value", &data.supporting_value.value);
    ui::quote(&data.quote.quote.text, data.quote.author_name());
    Ok(())
}

fn run_migrate(source: &StorageConfig, target: &StorageConfig, replace: bool) -> anyhow::Result<()> {
    let from = open_store(source)?;
    let mut to = open_store(target)?;
    if !replace && !to.is_empty()? {
        bail!("{} already has data; pass --replace to overwrite it", target.path.display());
    }

    let spinner = ui::Spinner::new("Copying data...");
    let dataset = from.export_dataset()?;
    to.replace_dataset(&dataset)?;
    spinner.finish(&format!(
        "Copied {} ({}) to {} ({})",
        source.path.display(),
        source.backend.as_str(),
        target.path.display(),
        target.backend.as_str()
    ));
    println!("{}", ui::summary_table(&ImportSummary::from(&dataset)));
    Ok(())
}
