//! Backend body-format transforms.
//!
//! The internal message representation uses a single `*emphasis*` convention
//! for bold. Every transform here is a pure function of its input.

/// Wire dialect a backend expects for the message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Emphasis markers stripped.
    Text,
    /// Single delimiters doubled (`*x*` → `**x**`).
    Markdown,
    /// Odd-indexed `*` segments wrapped in `<b>`, newlines become `<br>`.
    Html,
    /// Internal representation passed through untouched.
    #[default]
    Asterisk,
}

/// Render `text` into the given dialect.
pub fn render(text: &str, format: MessageFormat) -> String {
    match format {
        MessageFormat::Text => strip_emphasis(text),
        MessageFormat::Markdown => text.replace('*', "**"),
        MessageFormat::Html => to_html(text),
        MessageFormat::Asterisk => text.to_string(),
    }
}

/// Remove all emphasis delimiters.
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}

fn to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (index, part) in text.split('*').enumerate() {
        if index % 2 == 1 {
            out.push_str("<b>");
            out.push_str(part);
            out.push_str("</b>");
        } else {
            out.push_str(part);
        }
    }
    out.replace('\n', "<br>")
}
