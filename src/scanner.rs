use once_cell::sync::Lazy;
use regex::Regex;

/// `{{ ... }}` with no brace characters inside, so spans never nest.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("invalid placeholder pattern"));

/// One `{{expr}}` span of the string it was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Byte length including both delimiters.
    pub len: usize,
    /// Inner text with surrounding whitespace removed.
    pub expr: String,
}

impl Placeholder {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// All placeholder spans of `text`, in textual order.
pub fn scan(text: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Placeholder {
                start: whole.start(),
                len: whole.len(),
                expr: caps[1].trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_spans_in_order() {
        let found = scan("Hi {{ name }}, {{UPPER(x)}}!");
        assert_eq!(
            found,
            vec![
                Placeholder { start: 3, len: 10, expr: "name".into() },
                Placeholder { start: 15, len: 12, expr: "UPPER(x)".into() },
            ]
        );
    }

    #[test]
    fn braces_inside_do_not_match() {
        assert!(scan("{{a{b}}").is_empty());
        assert!(scan("{{}}").is_empty());
        let inner = scan("{{{x}}}");
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].expr, "x");
        assert_eq!(inner[0].start, 1);
    }

    #[test]
    fn no_placeholders() {
        assert!(scan("plain text { } }}").is_empty());
    }
}
