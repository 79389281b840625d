pub mod commands;
pub mod handlers;

// Re-export commonly used helpers for convenience
pub use commands::command_argument_builder;
pub use handlers::{
    client_config_from_args, expand_path, load_titles_from_file, load_titles_from_source,
    parse_title_line,
};
