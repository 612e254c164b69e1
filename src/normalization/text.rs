use std::sync::OnceLock;

use regex::Regex;

fn markup_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<\S+>").expect("static tag regex"))
}

/// Split Steam's `supported_languages` blurb into language names.
///
/// Everything after the first `<br>` is a footnote ("*languages with full audio
/// support"); inline tags and the `*` audio markers are dropped.
pub fn split_languages(raw: &str) -> Vec<String> {
    let head = raw.split_once("<br>").map_or(raw, |(head, _)| head);
    let cleaned = markup_tag().replace_all(head, "").replace('*', "");
    cleaned
        .split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts yes/true/t/1 (case-insensitive, leading whitespace ignored).
pub fn str_to_bool(raw: &str) -> bool {
    matches!(
        raw.trim_start().to_ascii_lowercase().as_str(),
        "yes" | "true" | "t" | "1"
    )
}
