use indicatif::ProgressBar;
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use wikimap::command_argument_builder;
use wikimap::handlers::*;
use wikimap_core::data::Database;
use wikimap_core::export::{ExportFormat, FileSaver};
use wikimap_core::graph::WikiGraph;
use wikimap_core::{LinkSource, WikiService};

#[test]
fn test_parse_title_line_trims() {
    assert_eq!(parse_title_line("  Rust  "), Some("Rust".to_string()));
}

#[test]
fn test_parse_title_line_skips_blank_and_comments() {
    assert_eq!(parse_title_line(""), None);
    assert_eq!(parse_title_line("   "), None);
    assert_eq!(parse_title_line("# a comment"), None);
    assert_eq!(parse_title_line("   # indented comment"), None);
}

#[test]
fn test_parse_title_line_keeps_inner_hash() {
    assert_eq!(parse_title_line("C#"), Some("C#".to_string()));
}

#[test]
fn test_load_titles_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "# roots")?;
    writeln!(temp_file, "Rust (programming language)")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "  Cargo  ")?;

    let titles = load_titles_from_file(temp_file.path())?;

    assert_eq!(titles, vec!["Rust (programming language)", "Cargo"]);
    Ok(())
}

#[test]
fn test_load_titles_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();
    writeln!(temp_file, "# only a comment").unwrap();

    let result = load_titles_from_file(temp_file.path());

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No titles found"));
}

#[test]
fn test_load_titles_from_file_missing() {
    let result = load_titles_from_file(&PathBuf::from("/nonexistent/titles.txt"));
    assert!(result.unwrap_err().contains("Failed to read titles file"));
}

#[test]
fn test_load_titles_from_source_single_title() {
    let title = "Rust".to_string();
    let result = load_titles_from_source(Some(&title), None).unwrap();
    assert_eq!(result, vec!["Rust"]);
}

#[test]
fn test_load_titles_from_source_blank_title() {
    let title = "   ".to_string();
    assert!(load_titles_from_source(Some(&title), None).is_err());
}

#[test]
fn test_load_titles_from_source_no_input() {
    let result = load_titles_from_source(None, None);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Either --title or --titles-file"));
}

#[test]
fn test_load_titles_from_source_file_takes_precedence() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "From file").unwrap();

    let title = "Ignored".to_string();
    let path = PathBuf::from(temp_file.path());
    let result = load_titles_from_source(Some(&title), Some(&path)).unwrap();
    assert_eq!(result, vec!["From file"]);
}

#[test]
fn test_expand_path_without_tilde_is_unchanged() {
    assert_eq!(expand_path("/tmp/wikimap.db"), PathBuf::from("/tmp/wikimap.db"));
}

#[test]
fn test_client_config_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "search", "rust"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    let config = client_config_from_args(sub);
    assert_eq!(config.language, "es");
    assert_eq!(config.timeout_secs, 15);
}

#[test]
fn test_client_config_from_global_options() {
    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "search", "rust", "--lang", "en", "--timeout", "30"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    let config = client_config_from_args(sub);
    assert_eq!(config.language, "en");
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn test_rejects_unknown_language() {
    let result =
        command_argument_builder().try_get_matches_from(["wikimap", "--lang", "xx", "search", "q"]);
    assert!(result.is_err());
}

#[test]
fn test_rejects_out_of_range_timeout() {
    let result = command_argument_builder()
        .try_get_matches_from(["wikimap", "--timeout", "0", "search", "q"]);
    assert!(result.is_err());
}

#[test]
fn test_map_title_conflicts_with_titles_file() {
    let result = command_argument_builder().try_get_matches_from([
        "wikimap", "map", "-t", "Rust", "-T", "titles.txt",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_map_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "map", "-t", "Rust"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    assert_eq!(sub.get_one::<usize>("depth"), Some(&2));
    assert_eq!(sub.get_one::<String>("format").map(String::as_str), Some("text"));
    assert!(!sub.get_flag("include-errors"));
    assert!(!sub.get_flag("tree"));
}

#[test]
fn test_init_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("wikimap");
    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "init", config_dir.to_str().unwrap(), "--force"])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();

    handle_init(sub).unwrap();
    assert!(Database::exists(&config_dir.join(DB_FILE_NAME)));
}

#[test]
fn test_show_and_sessions_read_saved_graph() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("wikimap.db");
    let db = Database::new(&db_path).unwrap();

    let mut graph = WikiGraph::new("Rust").unwrap();
    graph.add_link("Rust", "Cargo").unwrap();
    let session_id = db.save_graph(&graph, 1, false).unwrap();

    let db_arg = db_path.to_str().unwrap();
    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "show", session_id.as_str(), "-f", "csv", "--db", db_arg])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    assert!(handle_show(sub).is_ok());

    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "sessions", "--db", db_arg])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    assert!(handle_sessions(sub).is_ok());
}

#[test]
fn test_show_unknown_session_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("wikimap.db");
    Database::new(&db_path).unwrap();

    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "show", "missing", "--db", db_path.to_str().unwrap()])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    assert!(handle_show(sub).is_err());
}

#[test]
fn test_sessions_without_database_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("absent.db");

    let matches = command_argument_builder()
        .try_get_matches_from(["wikimap", "sessions", "--db", db_path.to_str().unwrap()])
        .unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    let err = handle_sessions(sub).unwrap_err();
    assert!(err.to_string().contains("wikimap init"));
}

// ============================================================================
// Mapping several roots
// ============================================================================

#[derive(Debug)]
struct NoSuchPage;

impl fmt::Display for NoSuchPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no such page")
    }
}

impl std::error::Error for NoSuchPage {}

/// Every page links to `Leaf`; `Leaf` has no links.
#[derive(Default)]
struct StarWiki {
    fetched: RefCell<Vec<String>>,
}

impl LinkSource for StarWiki {
    type Error = NoSuchPage;

    fn fetch_links(&self, title: &str) -> Result<Vec<String>, NoSuchPage> {
        self.fetched.borrow_mut().push(title.to_string());
        match title {
            "Leaf" => Ok(Vec::new()),
            _ => Ok(vec!["Leaf".to_string()]),
        }
    }
}

fn options(as_tree: bool, format: ExportFormat) -> MapOptions {
    MapOptions {
        depth: 1,
        include_errors: false,
        as_tree,
        format,
    }
}

#[test]
fn test_map_titles_continues_after_write_failure() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    let saver = FileSaver::new(&out_dir).unwrap();
    fs::remove_dir_all(&out_dir).unwrap();

    let service = WikiService::new(StarWiki::default());
    let titles = vec!["First".to_string(), "Second".to_string()];
    let failures = map_titles(
        &service,
        &titles,
        &options(false, ExportFormat::Text),
        Some(&saver),
        None,
        &ProgressBar::hidden(),
    );

    assert_eq!(failures, 2);
    assert_eq!(*service.source().fetched.borrow(), vec!["First", "Second"]);
}

#[test]
fn test_map_titles_saves_every_root() {
    let temp_dir = TempDir::new().unwrap();
    let saver = FileSaver::new(temp_dir.path()).unwrap();

    let service = WikiService::new(StarWiki::default());
    let titles = vec!["First".to_string(), "Second".to_string()];
    let failures = map_titles(
        &service,
        &titles,
        &options(false, ExportFormat::Csv),
        Some(&saver),
        None,
        &ProgressBar::hidden(),
    );

    assert_eq!(failures, 0);
    let mut names: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("_First.csv"));
    assert!(names[1].ends_with("_Second.csv"));
}

#[test]
fn test_map_titles_tree_saved_as_text_when_format_has_no_tree_form() {
    let temp_dir = TempDir::new().unwrap();
    let saver = FileSaver::new(temp_dir.path()).unwrap();

    let service = WikiService::new(StarWiki::default());
    let titles = vec!["Root".to_string()];
    let failures = map_titles(
        &service,
        &titles,
        &options(true, ExportFormat::Csv),
        Some(&saver),
        None,
        &ProgressBar::hidden(),
    );
    assert_eq!(failures, 0);

    let entry = fs::read_dir(temp_dir.path()).unwrap().next().unwrap().unwrap();
    let name = entry.file_name().to_string_lossy().into_owned();
    assert!(name.ends_with("_Root.txt"), "{}", name);

    let content = fs::read_to_string(entry.path()).unwrap();
    assert!(content.starts_with("Root\n└── Leaf"));
}

#[test]
fn test_map_titles_stores_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("wikimap.db")).unwrap();
    let saver = FileSaver::new(temp_dir.path().join("out")).unwrap();

    let service = WikiService::new(StarWiki::default());
    let titles = vec!["First".to_string()];
    let failures = map_titles(
        &service,
        &titles,
        &options(false, ExportFormat::Json),
        Some(&saver),
        Some(&db),
        &ProgressBar::hidden(),
    );

    assert_eq!(failures, 0);
    let sessions = db.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].root_title, "First");
    assert_eq!(sessions[0].edge_count, 1);
}
