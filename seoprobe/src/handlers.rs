use crate::commands::{DATABASE_FILE, DEFAULT_CONFIG_DIR};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use seoprobe_core::crawl::{CrawlOptions, CrawlOutcome, CrawlProgressCallback, execute_crawl};
use seoprobe_core::data::Database;
use seoprobe_core::job::{
    CrawlJob, CrawlScope, DEFAULT_PAGE_BUDGET, JobRequest, JobState, SiteTechnology,
};
use seoprobe_core::recommend::GeminiProvider;
use seoprobe_core::report::{
    ReportFormat, gather_report_data, generate_json_report, generate_text_report, save_report,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

// Helper functions for the handlers

/// Expand `~` in a config directory and return it with the database path inside it.
pub fn config_paths(config_dir: &str) -> (PathBuf, PathBuf) {
    let expanded = shellexpand::tilde(config_dir);
    let dir = PathBuf::from(expanded.as_ref());
    let db = dir.join(DATABASE_FILE);
    (dir, db)
}

/// `--db` if given, otherwise the database under the default config directory.
pub fn resolve_db_path(db: Option<&PathBuf>) -> PathBuf {
    match db {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => config_paths(DEFAULT_CONFIG_DIR).1,
    }
}

/// Open (creating if needed) the database at `path`.
pub fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Turn command line values into a validated job.
///
/// `--scope multi` without `-n` falls back to the default page budget.
pub fn build_crawl_job(
    url: &str,
    scope: &str,
    pages: Option<u32>,
    technology: Option<&str>,
) -> Result<CrawlJob> {
    let scope = CrawlScope::from_str(scope)?;
    let technology = technology.map(SiteTechnology::from_str).transpose()?;
    let num_pages = match scope {
        CrawlScope::MultiplePages => Some(pages.unwrap_or(DEFAULT_PAGE_BUDGET)),
        CrawlScope::SingleUrl => pages,
    };

    let job = JobRequest {
        url: url.to_string(),
        scope,
        num_pages,
        technology,
    }
    .into_job()?;
    Ok(job)
}

pub fn parse_format(format: Option<&String>) -> Result<ReportFormat> {
    let format = format.map(String::as_str).unwrap_or("text");
    ReportFormat::from_str(format).ok_or_else(|| anyhow!("Unsupported report format '{}'", format))
}

/// Render a stored job in the requested format.
pub fn render_report(db: &Database, job_id: &str, format: ReportFormat) -> Result<String> {
    let data = gather_report_data(db, job_id)?;
    let rendered = match format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => generate_json_report(&data)?,
    };
    Ok(rendered)
}

/// Write to `output` when given, otherwise print.
pub fn emit_report(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            save_report(content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub struct InitSummary {
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
    pub replaced_existing: bool,
    pub kept_existing: bool,
}

/// Create the config directory and database. An existing database is
/// only replaced with `force`.
pub fn init_config(config_dir: &str, force: bool) -> Result<InitSummary> {
    let (config_dir, db_path) = config_paths(config_dir);

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory {}", config_dir.display()))?;

    let existed = Database::exists(&db_path);
    if existed && !force {
        return Ok(InitSummary {
            config_dir,
            db_path,
            replaced_existing: false,
            kept_existing: true,
        });
    }

    if existed {
        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
    }
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    Ok(InitSummary {
        config_dir,
        db_path,
        replaced_existing: existed,
        kept_existing: false,
    })
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  SEOPROBE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");

    let summary = init_config(config_dir, force)?;

    if summary.kept_existing {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            summary.db_path.display().to_string().bright_white()
        );
        println!("Re-run with {} to replace it.", "--force".bright_cyan());
        println!();
    } else if summary.replaced_existing {
        println!("{} Existing database replaced (force mode)", "✓".green().bold());
    }

    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!(
        "{} Config directory: {}",
        "✓".green().bold(),
        summary.config_dir.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        summary.db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

fn print_outcome(outcome: &CrawlOutcome) {
    for message in &outcome.messages {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }

    let status = match outcome.state {
        JobState::Completed => "✓ Crawl complete!".green().bold(),
        _ => "✗ Crawl failed".red().bold(),
    };
    println!("\n{}", status);
    println!("Job ID:   {}", outcome.job_id.bright_white());
    println!(
        "Pages:    {} analysed, {} skipped",
        outcome.pages.len(),
        outcome.skipped
    );
    if let Some(avg) = outcome.average_score() {
        println!("Score:    {:.1}/100 average", avg);
    }
    println!();
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let url = sub_matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let scope = sub_matches
        .get_one::<String>("scope")
        .map(String::as_str)
        .unwrap_or("single");
    let pages = sub_matches.get_one::<u32>("pages").copied();
    let technology = sub_matches.get_one::<String>("tech").map(String::as_str);
    let format = parse_format(sub_matches.get_one::<String>("format"))?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let job = build_crawl_job(url, scope, pages, technology)?;

    let db_path = resolve_db_path(sub_matches.get_one::<PathBuf>("db"));
    let db = open_database(&db_path)?;

    let mut recommender = GeminiProvider::from_env();
    if let Some(model) = sub_matches.get_one::<String>("model") {
        recommender = recommender.with_model(model.as_str());
    }

    if !quiet {
        println!("\n{} {}", "Auditing".bright_cyan().bold(), job.seed_url.bright_white());
        println!(
            "Scope:    {} (up to {} page(s))",
            job.scope.as_str().replace('_', " "),
            job.page_budget
        );
        if let Some(technology) = job.technology {
            println!("Tech:     {}", technology);
        }
        if !recommender.has_credentials() {
            println!(
                "{} GEMINI_API_KEY not set, recommendations will be placeholders",
                "ℹ".blue()
            );
        }
        println!();
    }
    info!("Using database {}", db_path.display());

    let options = CrawlOptions {
        job,
        show_progress_bars: !quiet,
    };
    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| tracing::debug!("{}", msg)))
    };

    let outcome = execute_crawl(options, &db, &recommender, progress_callback).await?;
    if !quiet {
        print_outcome(&outcome);
    }

    let report = render_report(&db, &outcome.job_id, format)?;
    emit_report(&report, output)?;

    if outcome.state == JobState::Failed {
        return Err(anyhow!(
            "{}",
            outcome
                .messages
                .last()
                .cloned()
                .unwrap_or_else(|| "Crawl failed".to_string())
        ));
    }
    Ok(())
}

pub fn handle_report(sub_matches: &ArgMatches) -> Result<()> {
    let job_id = sub_matches
        .get_one::<String>("JOB_ID")
        .ok_or_else(|| anyhow!("a job id is required"))?;
    let format = parse_format(sub_matches.get_one::<String>("format"))?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let db_path = resolve_db_path(sub_matches.get_one::<PathBuf>("db"));
    if !Database::exists(&db_path) {
        return Err(anyhow!(
            "No database at {} (run `seoprobe init` or pass --db)",
            db_path.display()
        ));
    }
    let db = open_database(&db_path)?;

    let report = render_report(&db, job_id, format)?;
    emit_report(&report, output)
}
