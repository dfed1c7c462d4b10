//! Path and text helpers shared across the pipeline.
//!
//! Rendered paths are `/`-separated strings relative to the site root; the
//! helpers here convert them to canonical URLs and build the synthesized
//! titles and descriptions for taxonomy term pages.

/// Wrap a rendered path in leading and trailing slashes.
///
/// The empty path (the site root) collapses to a single `/`.
///
/// | rendered path | canonical |
/// |---------------|-----------|
/// | `""`          | `/`       |
/// | `"blog"`      | `/blog/`  |
/// | `"blog/a"`    | `/blog/a/`|
pub fn root_path(path: &str) -> String {
    let wrapped = format!("/{path}/");
    if wrapped == "//" {
        "/".to_owned()
    } else {
        wrapped
    }
}

/// Join rendered path segments with `/`, skipping empty segments.
///
/// Unlike `PathBuf::join` this never produces platform separators or a
/// leading slash, so the result stays a valid rendered path.
pub fn join_path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Replace spaces with hyphens for use as a URL path segment.
///
/// Applies only to the path form of a taxonomy term; the display form keeps
/// its spaces.
pub fn dash_spaces(term: &str) -> String {
    term.replace(' ', "-")
}

/// Upper-case the first letter of every whitespace-separated word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Naive English singularization for taxonomy names.
///
/// Handles the common plural shapes taxonomy names take ("tags", "series",
/// "categories"); anything irregular passes through unchanged.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with("series") || lower.ends_with("ss") {
        word.to_owned()
    } else if let Some(stem) = strip_suffix_ci(word, "ies") {
        format!("{stem}y")
    } else if let Some(stem) = strip_suffix_ci(word, "es")
        && (lower.ends_with("ses") || lower.ends_with("xes") || lower.ends_with("zes"))
    {
        stem.to_owned()
    } else if let Some(stem) = strip_suffix_ci(word, "s") {
        stem.to_owned()
    } else {
        word.to_owned()
    }
}

/// Case-insensitive suffix strip, preserving the original casing of the stem.
fn strip_suffix_ci<'a>(word: &'a str, suffix: &str) -> Option<&'a str> {
    if word.len() >= suffix.len() && word[word.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        Some(&word[..word.len() - suffix.len()])
    } else {
        None
    }
}
