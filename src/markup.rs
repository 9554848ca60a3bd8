use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\s[^>]*href\s*=\s*['"]([^'"]*)['"][^>]*>(.*?)</a>"#).expect("link pattern")
});

/// Remove any inline tags, keeping the enclosed text.
///
/// Used for history lines, the exported log and announcements, which are
/// always plain text.
pub fn plain_text(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

/// Render node text for a terminal: links become `label (url)`, any other
/// tag is dropped.
pub fn terminal_text(text: &str) -> String {
    let linked = LINK.replace_all(text, "$2 ($1)");
    plain_text(&linked)
}
