pub mod blocking;
pub mod client;
pub mod error;
pub mod response;

pub use blocking::BlockingWikiClient;
pub use client::{ClientConfig, LinkType, WikiClient};
pub use error::ScanError;
