//! Utility functions shared by the parser and the command-line front end.
//!
//! - **Text normalization**: strip markup and entities from free-text feed fields
//! - **URL validation**: accept only http(s) feed URLs for subscriptions

mod text;
mod url_validator;

pub use text::clean_text;
pub use url_validator::{validate_feed_url, UrlValidationError};
