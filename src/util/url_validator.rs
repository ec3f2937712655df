use thiserror::Error;
use url::Url;

/// Errors returned by [`validate_feed_url`].
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Checks that a string is usable as a feed subscription URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted. Surrounding
/// whitespace is ignored.
///
/// # Examples
///
/// ```
/// use podsync::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://feeds.example.com/show.xml").is_ok());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// assert!(validate_feed_url("not a url").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}
