use clap::ArgMatches;
use colored::Colorize;
use tracing::Level;
use wikimap::command_argument_builder;
use wikimap::handlers::{
    handle_categories, handle_content, handle_init, handle_links, handle_map, handle_search,
    handle_sessions, handle_show,
};
use wikimap_core::print_banner;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Global options may follow the subcommand, so read them from the deepest matches
    let globals = chosen_command
        .subcommand()
        .map(|(_, sub)| sub)
        .unwrap_or(&chosen_command);
    init_tracing(globals);

    if !quiet {
        print_banner();
    }

    let outcome = match chosen_command.subcommand() {
        None => return,
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("map", primary_command)) => handle_map(primary_command),
        Some(("search", primary_command)) => handle_search(primary_command),
        Some(("content", primary_command)) => handle_content(primary_command),
        Some(("links", primary_command)) => handle_links(primary_command),
        Some(("categories", primary_command)) => handle_categories(primary_command),
        Some(("sessions", primary_command)) => handle_sessions(primary_command),
        Some(("show", primary_command)) => handle_show(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(args: &ArgMatches) {
    let level = match args.get_one::<String>("log-level").map(String::as_str) {
        Some("error") => Level::ERROR,
        Some("info") => Level::INFO,
        Some("debug") => Level::DEBUG,
        Some("trace") => Level::TRACE,
        _ => Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
