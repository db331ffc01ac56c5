//! Query formatting.
//!
//! Turns a user-typed search string into Zoekt query syntax. Formatting never
//! fails: a query the backend cannot parse comes back as an error reply.

use crate::types::{SearchMode, SearchSource};

/// Filter prefixes that are passed to the backend verbatim.
const FILTER_PREFIXES: &[&str] = &[
    "lang:", "-lang:", "file:", "-file:", "f:", "-f:", "sym:", "case:", "repo:", "-repo:",
    "branch:", "b:", "content:", "c:",
];

/// Render `text` in the backend query language.
///
/// `Regex` mode keeps the text as typed. `Exact` mode escapes regex
/// metacharacters in every term that is not a filter. API callers may use
/// the `f:` shorthand for `file:` in either mode.
pub fn format(text: &str, source: Option<SearchSource>, mode: SearchMode) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let api = source == Some(SearchSource::Api);
    if mode == SearchMode::Regex && !api {
        return text.to_string();
    }

    tokenize(text)
        .into_iter()
        .map(|token| render_token(token, api, mode))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_token(token: &str, api: bool, mode: SearchMode) -> String {
    if let Some(prefix) = filter_prefix(token) {
        let value = &token[prefix.len()..];
        let prefix = if api { expand_shorthand(prefix) } else { prefix };
        return format!("{}{}", prefix, value);
    }

    if mode == SearchMode::Regex {
        return token.to_string();
    }

    if let Some(phrase) = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
    {
        // Quoted strings are unquoted by the backend before regex parsing,
        // so backslashes need a second level of escaping.
        return format!("\"{}\"", regex::escape(phrase).replace('\\', "\\\\"));
    }

    match token.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => format!("-{}", regex::escape(rest)),
        _ => regex::escape(token),
    }
}

fn filter_prefix(token: &str) -> Option<&'static str> {
    FILTER_PREFIXES
        .iter()
        .copied()
        .find(|prefix| token.len() > prefix.len() && token.starts_with(prefix))
}

fn expand_shorthand(prefix: &'static str) -> &'static str {
    match prefix {
        "f:" => "file:",
        "-f:" => "-file:",
        other => other,
    }
}

/// Split on whitespace, keeping double-quoted phrases together.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut in_quotes = false;

    for (i, c) in text.char_indices() {
        match c {
            '"' => {
                if start.is_none() {
                    start = Some(i);
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }

    if let Some(s) = start {
        tokens.push(&text[s..]);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_regex_mode_is_untouched() {
        assert_eq!(
            format("use.*egex", Some(SearchSource::Web), SearchMode::Regex),
            "use.*egex"
        );
        assert_eq!(format("  a   b  ", None, SearchMode::Regex), "a   b");
    }

    #[test]
    fn test_exact_mode_escapes_terms() {
        assert_eq!(format("bar(x)", None, SearchMode::Exact), r"bar\(x\)");
        assert_eq!(
            format("$obj->call", None, SearchMode::Exact),
            r"\$obj\->call"
        );
        assert_eq!(format("plain words", None, SearchMode::Exact), "plain words");
    }

    #[test]
    fn test_exact_mode_keeps_filters() {
        assert_eq!(
            format("lang:ruby foo.bar -file:spec/", None, SearchMode::Exact),
            r"lang:ruby foo\.bar -file:spec/"
        );
    }

    #[test]
    fn test_exact_mode_negated_term() {
        assert_eq!(format("-foo.bar", None, SearchMode::Exact), r"-foo\.bar");
        assert_eq!(format("-", None, SearchMode::Exact), r"\-");
    }

    #[test]
    fn test_quoted_phrase() {
        assert_eq!(
            format(r#""hello world" x"#, None, SearchMode::Exact),
            r#""hello world" x"#
        );
        assert_eq!(
            format(r#""a.b c""#, None, SearchMode::Exact),
            r#""a\\.b c""#
        );
    }

    #[test]
    fn test_unterminated_quote_does_not_panic() {
        assert_eq!(format(r#""abc def"#, None, SearchMode::Exact), r#""abc def"#);
    }

    #[test]
    fn test_api_shorthand_expansion() {
        assert_eq!(
            format("f:app/models -f:spec foo", Some(SearchSource::Api), SearchMode::Regex),
            "file:app/models -file:spec foo"
        );
        assert_eq!(
            format("f:app/models", Some(SearchSource::Web), SearchMode::Exact),
            "f:app/models"
        );
    }

    #[test]
    fn test_bare_prefix_is_a_term() {
        assert_eq!(format("file:", None, SearchMode::Exact), "file:");
    }

    #[test]
    fn test_blank_query() {
        assert_eq!(format("   ", None, SearchMode::Exact), "");
    }
}
