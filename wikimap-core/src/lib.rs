pub mod data;
pub mod error;
pub mod export;
pub mod graph;
pub mod mapper;
pub mod service;
pub mod source;
pub mod tree;

use colored::Colorize;

pub use error::{GraphError, ServiceError, StorageError};
pub use graph::{RelationType, WikiEdge, WikiGraph, WikiNode};
pub use mapper::{PageMapper, ProgressCallback};
pub use service::{RawContent, SearchResult, SearchResults, WikiService};
pub use source::{ArticleSource, LinkSource};
pub use tree::{PageTree, TreeNode};

pub fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════════════════════════════╗
    ║  ██╗    ██╗██╗██╗  ██╗██╗███╗   ███╗ █████╗ ██████╗           ║
    ║  ██║    ██║██║██║ ██╔╝██║████╗ ████║██╔══██╗██╔══██╗          ║
    ║  ██║ █╗ ██║██║█████╔╝ ██║██╔████╔██║███████║██████╔╝          ║
    ║  ██║███╗██║██║██╔═██╗ ██║██║╚██╔╝██║██╔══██║██╔═══╝           ║
    ║  ╚███╔███╔╝██║██║  ██╗██║██║ ╚═╝ ██║██║  ██║██║               ║
    ║   ╚══╝╚══╝ ╚═╝╚═╝  ╚═╝╚═╝╚═╝     ╚═╝╚═╝  ╚═╝╚═╝               ║
    ╚═══════════════════════════════════════════════════════════════╝"#;

    println!("{}", banner.bright_cyan());
    println!(
        "    {} {}\n",
        "Wikipedia link mapper".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
