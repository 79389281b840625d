use clap::builder::PossibleValuesParser;
use clap::{arg, command};
use std::path::PathBuf;
use wikimap_scanner::client::{DEFAULT_LANGUAGE, VALID_LANGUAGES};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/wikimap/";
pub const DEFAULT_DB_PATH: &str = "~/.config/wikimap/wikimap.db";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("wikimap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("wikimap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-l --"lang" <LANG>)
                .required(false)
                .global(true)
                .help("Wikipedia language edition to query")
                .value_parser(PossibleValuesParser::new(VALID_LANGUAGES.iter().copied()))
                .default_value(DEFAULT_LANGUAGE),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .global(true)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..=300))
                .default_value("15"),
        )
        .arg(
            arg!(--"log-level" <LEVEL>)
                .required(false)
                .global(true)
                .help("Diagnostic log level written to stderr")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("warn"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the wikimap database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the wikimap database")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f --"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("map")
                .about(
                    "Maps the internal links reachable from one or more articles, up to a \
                maximum depth.",
                )
                .arg(
                    arg!(-t --"title" <TITLE>)
                        .required(false)
                        .help("Title of the root article")
                        .conflicts_with("titles-file"),
                )
                .arg(
                    arg!(-T --"titles-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of root titles")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("title"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum depth to explore (root is depth 1)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"include-errors")
                        .required(false)
                        .help("Record an [ERROR] node for pages whose links could not be fetched")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"tree")
                        .required(false)
                        .help("Produce a tree of first discoveries instead of the full graph")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("save"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json, csv, dot, markdown")
                        .value_parser(["text", "json", "csv", "dot", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Save each rendering into this directory (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"save")
                        .required(false)
                        .help("Store each mapped graph as a session in the database")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(db_arg()),
        )
        .subcommand(
            command!("search")
                .about("Searches for articles matching a query")
                .arg(arg!(<QUERY>).help("Search terms"))
                .arg(
                    arg!(-n --"limit" <LIMIT>)
                        .required(false)
                        .help("Maximum number of results")
                        .value_parser(clap::value_parser!(u32).range(1..=500))
                        .default_value("5"),
                ),
        )
        .subcommand(
            command!("content")
                .about("Prints the plain text of the best matching article")
                .arg(arg!(<QUERY>).help("Search terms"))
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Save the text into this directory instead of printing it")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("links")
                .about("Lists the links of a single article")
                .arg(arg!(<TITLE>).help("Article title"))
                .arg(
                    arg!(--"type" <TYPE>)
                        .required(false)
                        .help("Kind of links to list")
                        .value_parser(["internal", "external", "linkshere", "interwiki"])
                        .default_value("internal"),
                )
                .arg(
                    arg!(-n --"limit" <LIMIT>)
                        .required(false)
                        .help("Page size used when querying the API")
                        .value_parser(clap::value_parser!(u32).range(1..=500))
                        .default_value("500"),
                ),
        )
        .subcommand(
            command!("categories")
                .about("Lists the visible categories of an article")
                .arg(arg!(<TITLE>).help("Article title")),
        )
        .subcommand(
            command!("sessions")
                .about("Lists the mapping sessions stored in the database")
                .arg(db_arg()),
        )
        .subcommand(
            command!("show")
                .about("Renders a stored mapping session")
                .arg(arg!(<SESSION_ID>).help("Session id printed by `map --save`"))
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json, csv, dot, markdown")
                        .value_parser(["text", "json", "csv", "dot", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(db_arg()),
        )
}

fn db_arg() -> clap::Arg {
    arg!(--"db" <PATH>)
        .required(false)
        .help("Path to the wikimap database")
        .default_value(DEFAULT_DB_PATH)
}
