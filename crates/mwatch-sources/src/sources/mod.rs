//! Source adapters, one module per upstream.

pub mod local_news;
pub mod meta;
pub mod reddit;
pub mod unsupported;
pub mod x;
pub mod youtube;

pub use local_news::{parse_feed, LocalNewsConnector};
pub use meta::MetaConnector;
pub use reddit::RedditConnector;
pub use unsupported::UnsupportedConnector;
pub use x::XConnector;
pub use youtube::YoutubeConnector;
