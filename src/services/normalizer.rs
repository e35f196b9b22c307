//! Body text normalization for stored snippets.

use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    // Non-greedy and single-line: a tag never spans a newline.
    TAG.get_or_init(|| Regex::new(r"<.*?>").expect("tag pattern is valid"))
}

/// Returns true for printable ASCII plus the ASCII whitespace set
/// (space, tab, newline, carriage return, vertical tab, form feed).
fn is_printable(c: char) -> bool {
    c.is_ascii_graphic() || matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Cleans provider snippet text for storage.
///
/// Decodes HTML entities, then removes anything that looks like a tag, then
/// drops every character outside printable ASCII. Decoding happens first, so
/// an escaped `&lt;b&gt;` is stripped as a tag too.
pub fn clean_email_content(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    let stripped = tag_pattern().replace_all(&decoded, "");
    stripped.chars().filter(|&c| is_printable(c)).collect()
}
