use crate::lang::lookup_language;
use log::warn;
use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::SyntaxSet;
use thiserror::Error;

/// External syntax highlighter capability. `lang = None` means autodetect.
/// The output must keep the line count of `code` intact.
pub trait Highlighter {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<String, HighlightError>;
}

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("highlighter backend failed: {0}")]
    Backend(String),
    #[error("unbalanced highlight markup: {open} open tags, {close} close tags")]
    Unbalanced { open: usize, close: usize },
}

static DEFAULT_BACKEND: Lazy<SyntectHighlighter> = Lazy::new(SyntectHighlighter::new);

pub(crate) fn default_backend() -> &'static SyntectHighlighter {
    &DEFAULT_BACKEND
}

// Adapter between the scanner and the backend: normalizes the raw code text,
// resolves the language tag, and degrades to escaped plain text when the
// backend fails or emits unbalanced markup. Failures never reach the caller.
pub(crate) fn render(code: &str, lang_tag: &str, backend: &dyn Highlighter) -> String {
    let normalized = normalize_code(code);
    let code = normalized.trim();
    let lang = if lang_tag.is_empty() {
        None
    } else {
        lookup_language(lang_tag)
    };

    match balanced_highlight(code, lang, backend) {
        Ok(html) => html,
        Err(err) => {
            warn!("syntax highlight failed: {}", err);
            escape_code(code)
        }
    }
}

fn balanced_highlight(
    code: &str,
    lang: Option<&str>,
    backend: &dyn Highlighter,
) -> Result<String, HighlightError> {
    let html = backend.highlight(code, lang)?;
    let open = html.matches("<span").count();
    let close = html.matches("</span").count();
    if open != close {
        return Err(HighlightError::Unbalanced { open, close });
    }
    Ok(html)
}

// Code text arrives HTML-escaped and may carry literal tags and full-width
// characters typed around it. Tags are dropped entirely; `&lt; &gt; &amp;`
// are decoded so the backend sees the real source text.
fn normalize_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(at) = rest.find(['　', '＠', '＃', '\t', '&', '<']) {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        rest = if let Some(after) = tail.strip_prefix('　') {
            out.push(' ');
            after
        } else if let Some(after) = tail.strip_prefix('＠') {
            out.push('@');
            after
        } else if let Some(after) = tail.strip_prefix('＃') {
            out.push('#');
            after
        } else if let Some(after) = tail.strip_prefix('\t') {
            out.push_str("    ");
            after
        } else if let Some(after) = tail.strip_prefix("&lt;") {
            out.push('<');
            after
        } else if let Some(after) = tail.strip_prefix("&gt;") {
            out.push('>');
            after
        } else if let Some(after) = tail.strip_prefix("&amp;") {
            out.push('&');
            after
        } else if tail.starts_with('<') {
            // A tag needs at least one character between the brackets;
            // a bare `<` or `<>` stays as-is.
            match tail.find('>') {
                Some(gt) if gt >= 2 => &tail[gt + 1..],
                _ => {
                    out.push('<');
                    &tail[1..]
                }
            }
        } else {
            out.push('&');
            &tail[1..]
        };
    }
    out.push_str(rest);
    out
}

fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Syntect-backed default backend. The syntax set and theme are loaded once
/// and immutable afterwards; highlight state is scoped per call.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = pick_theme(&theme_set);
        Self { syntax_set, theme }
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<String, HighlightError> {
        let syntax = match lang {
            Some(token) => self.syntax_set.find_syntax_by_token(token),
            None => self.syntax_set.find_syntax_by_first_line(code),
        }
        .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        // Line by line so the highlighted output keeps the line count.
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();
        for line in code.split('\n') {
            let ranges = highlighter
                .highlight_line(line, &self.syntax_set)
                .map_err(|err| HighlightError::Backend(err.to_string()))?;
            let html = styled_line_to_highlighted_html(&ranges, IncludeBackground::No)
                .map_err(|err| HighlightError::Backend(err.to_string()))?;
            lines.push(html);
        }
        Ok(lines.join("\n"))
    }
}

fn pick_theme(theme_set: &ThemeSet) -> Theme {
    let candidates = ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"];
    for name in candidates {
        if let Some(found) = theme_set.themes.get(name) {
            return found.clone();
        }
    }
    theme_set
        .themes
        .values()
        .next()
        .expect("theme set has at least one theme")
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{HighlightError, Highlighter, escape_code, normalize_code, render};

    struct Echo;

    impl Highlighter for Echo {
        fn highlight(&self, code: &str, _lang: Option<&str>) -> Result<String, HighlightError> {
            Ok(code.to_string())
        }
    }

    struct Failing;

    impl Highlighter for Failing {
        fn highlight(&self, _code: &str, _lang: Option<&str>) -> Result<String, HighlightError> {
            Err(HighlightError::Backend("backend down".to_string()))
        }
    }

    struct Unbalanced;

    impl Highlighter for Unbalanced {
        fn highlight(&self, code: &str, _lang: Option<&str>) -> Result<String, HighlightError> {
            Ok(format!("<span>{}", code))
        }
    }

    #[test]
    fn normalize_drops_tags_and_decodes_entities() {
        assert_eq!(normalize_code("a<b>c</b>d"), "acd");
        assert_eq!(normalize_code("x &lt;= y &amp;&amp; y &gt;= z"), "x <= y && y >= z");
        assert_eq!(normalize_code("　＠＃\t"), " @#    ");
    }

    #[test]
    fn normalize_keeps_malformed_tags_and_entities() {
        assert_eq!(normalize_code("a < b"), "a < b");
        assert_eq!(normalize_code("a<>b"), "a<>b");
        assert_eq!(normalize_code("salt &pepper;"), "salt &pepper;");
        assert_eq!(normalize_code("<unclosed"), "<unclosed");
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_code("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn render_trims_and_passes_through() {
        assert_eq!(render("  code  ", "", &Echo), "code");
    }

    #[test]
    fn render_escapes_on_backend_failure() {
        assert_eq!(render("a &lt; b", "", &Failing), "a &lt; b");
    }

    #[test]
    fn render_escapes_on_unbalanced_markup() {
        assert_eq!(render("code", "", &Unbalanced), "code");
    }
}
