/// Named entities decoded by [`clean_text`], in replacement order.
///
/// `&amp;` is decoded before `&lt;`/`&gt;`, so doubly escaped markup such as
/// `&amp;lt;` ends up as `<`. Feeds in the wild rely on this.
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Converts a free-text feed field into plain text.
///
/// Removes markup tags, decodes a fixed set of named entities, collapses runs of
/// whitespace into a single space and trims both ends. Unknown entities pass
/// through unchanged. Never fails.
///
/// # Examples
///
/// ```
/// use podsync::util::clean_text;
///
/// assert_eq!(clean_text("<p>Hello&nbsp;<b>world</b></p>"), "Hello world");
/// assert_eq!(clean_text("Fish &amp; Chips &copy;"), "Fish & Chips &copy;");
/// ```
pub fn clean_text(raw: &str) -> String {
    let mut text = strip_tags(raw);
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops every `<...>` span. A `<` with no closing `>` is kept as text.
fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
