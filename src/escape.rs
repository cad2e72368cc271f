//! Ready-made sanitizers for [`EscapeFunctions`](crate::EscapeFunctions).

/// Characters that must be backslash-escaped in chat MarkdownV2 text.
const MARKDOWN_SPECIALS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

pub fn html(text: Option<&str>) -> Option<String> {
    let text = text?;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Some(out)
}

pub fn markdown(text: Option<&str>) -> Option<String> {
    let text = text?;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    Some(out)
}

/// Escape for embedding inside a JSON string literal (without the quotes).
pub fn json(text: Option<&str>) -> Option<String> {
    let quoted = serde_json::to_string(text?).ok()?;
    Some(quoted[1..quoted.len() - 1].to_string())
}

pub type Sanitizer = fn(Option<&str>) -> Option<String>;

/// Look up a sanitizer by name, as used on the command line.
pub fn by_name(name: &str) -> Option<Sanitizer> {
    let f: Sanitizer = match name.to_ascii_lowercase().as_str() {
        "html" => html,
        "markdown" | "md" => markdown,
        "json" => json,
        _ => return None,
    };
    Some(f)
}
