use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wikimap_core::data::Database;
use wikimap_core::export::{ExportFormat, FileSaver, render_graph, render_tree};
use wikimap_core::{LinkSource, ProgressCallback, WikiService};
use wikimap_scanner::client::DEFAULT_LANGUAGE;
use wikimap_scanner::{BlockingWikiClient, ClientConfig, LinkType};

pub const DB_FILE_NAME: &str = "wikimap.db";

// Helper functions for the map handler

/// Load root titles from either a file or a single title argument
pub fn load_titles_from_source(
    title: Option<&String>,
    titles_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(titles_file_path) = titles_file {
        load_titles_from_file(titles_file_path)
    } else if let Some(title) = title {
        parse_title_line(title)
            .map(|t| vec![t])
            .ok_or_else(|| "Title cannot be empty".to_string())
    } else {
        Err("Either --title or --titles-file must be provided".to_string())
    }
}

/// Load root titles from a file, one per line
pub fn load_titles_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read titles file {}: {}", path.display(), e))?;

    let titles: Vec<String> = content.lines().filter_map(parse_title_line).collect();

    if titles.is_empty() {
        return Err(format!("No titles found in {}", path.display()));
    }

    Ok(titles)
}

/// Trims a line; blank lines and `#` comments yield `None`
pub fn parse_title_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Expands `~` in a user supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Client settings from the global `--lang` and `--timeout` options
pub fn client_config_from_args(args: &ArgMatches) -> ClientConfig {
    let language = args
        .get_one::<String>("lang")
        .map(String::as_str)
        .unwrap_or(DEFAULT_LANGUAGE);
    let mut config = ClientConfig::default().with_language(language);
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(*timeout);
    }
    config
}

fn export_format(args: &ArgMatches) -> Result<ExportFormat> {
    let raw = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    ExportFormat::from_str(raw).ok_or_else(|| anyhow!("Unknown format '{}'", raw))
}

fn open_database(args: &ArgMatches) -> Result<Database> {
    let raw = args
        .get_one::<String>("db")
        .ok_or_else(|| anyhow!("No database path given"))?;
    let path = expand_path(raw);
    if !Database::exists(&path) {
        bail!(
            "No database at {} (run `wikimap init` first)",
            path.display()
        );
    }
    Database::new(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn new_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    print_divider();
    println!("{}", "  WIKIMAP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(|p| expand_path(p))
        .ok_or_else(|| anyhow!("No configuration path given"))?;
    let force = args.get_flag("force");
    let db_loc = config_dir.join(DB_FILE_NAME);
    let db_path = db_loc.as_path();

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory {}", config_dir.display()))?;

    if Database::exists(db_path) {
        let overwrite = if force {
            println!(
                "{} Deleting existing database (force mode)",
                "→".yellow().bold()
            );
            true
        } else {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();
            let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
            println!();
            response == "y" || response == "yes"
        };

        if !overwrite {
            println!("{} Keeping existing database", "→".blue());
            return Ok(());
        }
        Database::drop(db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
        println!();
    }

    println!("{} Creating database...", "→".blue());
    Database::new(db_path).with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub fn handle_map(args: &ArgMatches) -> Result<()> {
    let titles = load_titles_from_source(
        args.get_one::<String>("title"),
        args.get_one::<PathBuf>("titles-file"),
    )
    .map_err(|e| anyhow!(e))?;
    let depth = *args.get_one::<usize>("depth").unwrap_or(&2);
    let include_errors = args.get_flag("include-errors");
    let as_tree = args.get_flag("tree");
    let save = args.get_flag("save");
    let format = export_format(args)?;

    let saver = args
        .get_one::<PathBuf>("output")
        .map(|dir| FileSaver::new(expand_path(&dir.to_string_lossy())))
        .transpose()?;
    let database = if save { Some(open_database(args)?) } else { None };

    println!("\n🔗 Mapping {} article(s)", titles.len());
    println!("Max depth: {}", depth);
    println!("Include errors: {}\n", include_errors);

    let spinner = new_spinner()?;
    let progress_bar = spinner.clone();
    let progress: ProgressCallback = Arc::new(move |depth: usize, title: String| {
        progress_bar.set_message(format!("[depth {}] {}", depth, title));
    });

    let client = BlockingWikiClient::new(client_config_from_args(args))?;
    let service = WikiService::new(client).with_progress_callback(progress);

    let options = MapOptions {
        depth,
        include_errors,
        as_tree,
        format,
    };
    let failures = map_titles(&service, &titles, &options, saver.as_ref(), database.as_ref(), &spinner);

    spinner.finish_and_clear();
    if failures > 0 {
        bail!("{} of {} mapping(s) failed", failures, titles.len());
    }
    println!("\n✓ Mapping complete!\n");
    Ok(())
}

/// Settings shared by every root of one `map` run
pub struct MapOptions {
    pub depth: usize,
    pub include_errors: bool,
    pub as_tree: bool,
    pub format: ExportFormat,
}

/// Maps each title independently and returns how many of them failed.
///
/// A failure while mapping, storing or writing one title is reported and the
/// remaining titles are still processed.
pub fn map_titles<S: LinkSource>(
    service: &WikiService<S>,
    titles: &[String],
    options: &MapOptions,
    saver: Option<&FileSaver>,
    database: Option<&Database>,
    spinner: &ProgressBar,
) -> usize {
    let mut failures = 0;
    for title in titles {
        info!("Mapping '{}'", title);
        if let Err(e) = map_title(service, title, options, saver, database, spinner) {
            failures += 1;
            warn!("Mapping '{}' failed: {:#}", title, e);
            spinner.println(format!("{} {}: {:#}", "✗".red().bold(), title, e));
        }
    }
    failures
}

fn map_title<S: LinkSource>(
    service: &WikiService<S>,
    title: &str,
    options: &MapOptions,
    saver: Option<&FileSaver>,
    database: Option<&Database>,
    spinner: &ProgressBar,
) -> Result<()> {
    let (content, format) = if options.as_tree {
        let tree = service.map_page_tree(title, options.depth, options.include_errors)?;
        let format = options.format.for_tree();
        (render_tree(&tree, format)?, format)
    } else {
        let graph = service.map_page_graph(title, options.depth, options.include_errors)?;
        if let Some(db) = database {
            let session_id = db.save_graph(&graph, options.depth, options.include_errors)?;
            spinner.println(format!(
                "{} Saved '{}' as session {}",
                "✓".green().bold(),
                title,
                session_id.bright_white()
            ));
        }
        (render_graph(&graph, options.format)?, options.format)
    };

    match saver {
        Some(saver) => {
            let path = saver.save(&content, Some(title), format.extension())?;
            spinner.println(format!(
                "{} {} → {}",
                "✓".green().bold(),
                title,
                path.display()
            ));
        }
        None => spinner.suspend(|| print!("{}", content)),
    }
    Ok(())
}

pub fn handle_search(args: &ArgMatches) -> Result<()> {
    let query = args
        .get_one::<String>("QUERY")
        .ok_or_else(|| anyhow!("No query given"))?;
    let limit = *args.get_one::<u32>("limit").unwrap_or(&5);

    let service = WikiService::new(BlockingWikiClient::new(client_config_from_args(args))?);
    let results = service.search_articles(query, limit)?;

    if results.is_empty() {
        println!("{} No articles found for '{}'", "→".yellow(), query);
        return Ok(());
    }
    for (idx, result) in results.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, result.to_string().bright_white());
    }
    Ok(())
}

pub fn handle_content(args: &ArgMatches) -> Result<()> {
    let query = args
        .get_one::<String>("QUERY")
        .ok_or_else(|| anyhow!("No query given"))?;

    let service = WikiService::new(BlockingWikiClient::new(client_config_from_args(args))?);
    let article = service.get_article_raw_content(query)?;

    if article.title.is_empty() {
        println!("{} No articles found for '{}'", "→".yellow(), query);
        return Ok(());
    }
    if article.is_empty() {
        println!("{} '{}' has no plain text", "→".yellow(), article.title);
        return Ok(());
    }

    match args.get_one::<PathBuf>("output") {
        Some(dir) => {
            let saver = FileSaver::new(expand_path(&dir.to_string_lossy()))?;
            let path = saver.save(&article.content, Some(&article.title), "txt")?;
            println!(
                "{} Saved '{}' to {}",
                "✓".green().bold(),
                article.title,
                path.display().to_string().bright_white()
            );
        }
        None => {
            println!("{}\n", article.title.bold());
            println!("{}", article.content);
        }
    }
    Ok(())
}

pub fn handle_links(args: &ArgMatches) -> Result<()> {
    let title = args
        .get_one::<String>("TITLE")
        .ok_or_else(|| anyhow!("No title given"))?;
    let raw_type = args
        .get_one::<String>("type")
        .map(String::as_str)
        .unwrap_or("internal");
    let link_type =
        LinkType::from_str(raw_type).ok_or_else(|| anyhow!("Unknown link type '{}'", raw_type))?;
    let limit = *args.get_one::<u32>("limit").unwrap_or(&500);

    let client = BlockingWikiClient::new(client_config_from_args(args))?;
    let links = client.get_page_links(title, link_type, limit, None)?;

    println!(
        "{} {} {} link(s) on '{}'\n",
        "✓".green().bold(),
        links.len(),
        link_type.as_str(),
        title
    );
    for link in &links {
        println!("  {}", link);
    }
    Ok(())
}

pub fn handle_categories(args: &ArgMatches) -> Result<()> {
    let title = args
        .get_one::<String>("TITLE")
        .ok_or_else(|| anyhow!("No title given"))?;

    let client = BlockingWikiClient::new(client_config_from_args(args))?;
    let categories = client.get_page_categories(title)?;

    println!(
        "{} {} categories for '{}'\n",
        "✓".green().bold(),
        categories.len(),
        title
    );
    for category in &categories {
        println!("  {}", category);
    }
    Ok(())
}

pub fn handle_sessions(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let sessions = db.list_sessions()?;

    if sessions.is_empty() {
        println!("{} No stored sessions", "→".blue());
        return Ok(());
    }

    for session in &sessions {
        let created = chrono::DateTime::from_timestamp(session.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| session.created_at.to_string());
        println!(
            "{}  {}  {}",
            session.id.bright_white(),
            created.dimmed(),
            session.root_title.bold()
        );
        println!(
            "    depth {}/{}  nodes {}  edges {}  errors {}",
            session.max_depth_explored,
            session.max_depth,
            session.total_nodes,
            session.edge_count,
            session.error_count
        );
    }
    Ok(())
}

pub fn handle_show(args: &ArgMatches) -> Result<()> {
    let session_id = args
        .get_one::<String>("SESSION_ID")
        .ok_or_else(|| anyhow!("No session id given"))?;
    let format = export_format(args)?;

    let db = open_database(args)?;
    let graph = db.load_graph(session_id)?;
    print!("{}", render_graph(&graph, format)?);
    Ok(())
}
