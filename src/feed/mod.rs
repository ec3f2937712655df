//! Podcast feed retrieval and parsing.
//!
//! - **Parsing**: turn an RSS podcast document into a [`Podcast`](crate::model::Podcast)
//! - **Temporal fields**: tolerant date and duration decoding with a `0` sentinel
//! - **HTTP**: the [`HttpClient`] collaborator and its `reqwest` implementation
//! - **Directory**: forward search queries to an external podcast directory
//!
//! # Example
//!
//! ```ignore
//! use podsync::feed::{parse_podcast, parse_duration};
//!
//! let podcast = parse_podcast("https://example.com/feed.xml", &xml)?;
//! assert_eq!(parse_duration("1:02:03"), 3723);
//! ```

mod directory;
mod http;
mod parser;
mod temporal;
mod xml;

pub use directory::{DirectoryClient, DirectoryEntry, DirectoryError};
pub use http::{HttpClient, HttpResponse, ReqwestClient, TransportError};
pub use parser::{parse_podcast, MalformedDocumentError};
pub use temporal::{
    format_display_date, format_duration, parse_date, parse_duration, parse_timestamp,
};
