// Text clean-up applied to scraped field values

const NBSP: char = '\u{a0}';

/// Replaces non-breaking spaces with plain ones, drops line breaks and trims.
pub fn normalize_field(raw: &str) -> String {
    raw.replace(NBSP, " ")
        .replace(['\n', '\r'], "")
        .trim()
        .to_string()
}

/// Joins title fragments taken from several text nodes.
/// Each fragment is stripped; empty fragments are dropped.
pub fn compose_title<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| collapse_whitespace(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Squeezes every run of whitespace (including NBSP and newlines) into a single space.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
