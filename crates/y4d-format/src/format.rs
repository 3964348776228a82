use crate::highlight::{self, Highlighter};

const BR: &str = "<br>";
const FENCE_CLOSE: &str = "\n```\n";

// Nested styled spans recurse through the scanner; past this depth the inline
// processor stops producing spans and keeps the opening token literal.
const MAX_DEPTH: usize = 32;

// Trailer fragments that must survive a pass byte-for-byte. The collapse link
// is held aside for the whole document; the expand link per span.
const EXPAND_LINK: &str = "<a class=\"expand-body yj-small\" href=\"javascript://\">expand&nbsp;»</a><span class=\"remaining-body\" style=\"display:none;\">";
const COLLAPSE_LINK: &str = "</span>&nbsp;<a class=\"collapse-body yj-small\" href=\"javascript://\" style=\"display:none;\">«&nbsp;collapse</a>";

/// Rewrites recognized markup spans in already-HTML-escaped text into styled
/// `y4d-*` markup, leaving everything else (including literal tags) untouched.
pub fn format(content: &str) -> String {
    format_with(content, highlight::default_backend())
}

/// Same as [`format`] with a caller-chosen highlighter backend.
pub fn format_with(content: &str, backend: &dyn Highlighter) -> String {
    Scanner { backend, depth: 0 }.reformat(content)
}

struct Scanner<'a> {
    backend: &'a dyn Highlighter,
    depth: usize,
}

// Replacement text plus the cursor to resume scanning from. The resume cursor
// never moves backward past the position processing began at.
struct Found {
    resume: usize,
    text: String,
}

enum OpenSign<'a> {
    Tag { at: usize },
    Fence { at: usize, lang: &'a str, resume: usize },
    Inline { at: usize, context: char, decorator: char, resume: usize },
}

enum CloseSign {
    Newline(usize),
    Tag(usize),
    Closer(usize),
}

impl Scanner<'_> {
    fn reformat(&self, content: &str) -> String {
        let (content, collapse_link) = split_off_fragment(content, COLLAPSE_LINK);

        // Pad with newlines so the start and end of the document behave as
        // line breaks for the open/close sign matching.
        let mut canonical = String::with_capacity(content.len() + 2);
        canonical.push('\n');
        breaks_to_newlines(&mut canonical, &content);
        canonical.push('\n');

        let scanned = self.scan(&canonical);

        let mut out = scanned
            .trim()
            .replace("</div>\n", "</div>")
            .replace('\n', BR);
        out.push_str(collapse_link);
        out
    }

    fn scan(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut head = 0;
        let mut cursor = 0;

        while cursor < content.len() {
            let Some(sign) = find_open_sign(content, cursor) else {
                break;
            };
            match sign {
                OpenSign::Tag { at } => {
                    cursor = skip_tag(content, at + 1);
                }
                OpenSign::Inline {
                    at,
                    context,
                    decorator,
                    resume,
                } => {
                    let found = self.process_inline(content, resume, context, decorator);
                    out.push_str(&content[head..at]);
                    out.push_str(&found.text);
                    head = found.resume;
                    cursor = found.resume;
                }
                OpenSign::Fence { at, lang, resume } => {
                    let found = self.process_fence(content, resume, lang);
                    out.push_str(&content[head..at]);
                    out.push_str(&found.text);
                    head = found.resume;
                    cursor = found.resume;
                }
            }
        }

        out.push_str(&content[head..]);
        out
    }

    // `open` sits just past the opening decorator; `context` is the character
    // that qualified it and is re-emitted verbatim.
    fn process_inline(&self, content: &str, open: usize, context: char, decorator: char) -> Found {
        if self.depth >= MAX_DEPTH {
            let mut text = String::new();
            text.push(context);
            text.push(decorator);
            return Found { resume: open, text };
        }

        let mut cursor = open;
        let mut end = content.len();
        while cursor < end {
            match find_inline_close(content, cursor, decorator) {
                None => cursor = end,
                Some(CloseSign::Newline(at)) => {
                    end = at;
                    cursor = at;
                }
                Some(CloseSign::Tag(at)) => {
                    cursor = skip_tag(content, at);
                }
                Some(CloseSign::Closer(at)) => {
                    let mut text = String::new();
                    text.push(context);
                    text.push_str(&self.decorate(decorator, &content[open..at]));
                    return Found {
                        resume: at + 1,
                        text,
                    };
                }
            }
        }

        // No closer before the line break: the raw text passes through, and
        // the unconsumed newline stays available to the driver.
        let mut text = String::new();
        text.push(context);
        text.push(decorator);
        text.push_str(&content[open..end]);
        Found { resume: end, text }
    }

    fn decorate(&self, decorator: char, interior: &str) -> String {
        let (interior, expand_link) = split_off_fragment(interior, EXPAND_LINK);
        let body = if decorator == '`' {
            highlight::render(&interior, "", self.backend)
        } else {
            let nested = Scanner {
                backend: self.backend,
                depth: self.depth + 1,
            };
            nested.reformat(&interior)
        };
        format!(
            "<span class=\"y4d-{}\">{}</span>{}",
            role_class(decorator),
            body,
            expand_link
        )
    }

    // `open` sits just past the opening fence line including its newline.
    fn process_fence(&self, content: &str, open: usize, lang: &str) -> Found {
        let Some(at) = content[open..].find(FENCE_CLOSE) else {
            // No closing fence: the opening line stays raw.
            return Found {
                resume: open,
                text: format!("\n```{}\n", lang),
            };
        };
        let close = open + at;

        let (raw, expand_link) = split_off_fragment(&content[open..close], EXPAND_LINK);
        let code = highlight::render(&raw, lang, self.backend);
        let numbers = line_numbers(&code);
        let text = format!(
            "<div class=\"y4d-codeblock\"><table><tr><td>{}</td><td>{}</td></tr></table></div>{}",
            numbers, code, expand_link
        );

        // The closing fence's trailing newline is left unconsumed so it can
        // qualify a following open sign.
        Found {
            resume: close + FENCE_CLOSE.len() - 1,
            text,
        }
    }
}

fn find_open_sign(content: &str, from: usize) -> Option<OpenSign<'_>> {
    for (offset, ch) in content[from..].char_indices() {
        let at = from + offset;
        if ch == '<' {
            return Some(OpenSign::Tag { at });
        }
        if ch == '\n'
            && let Some(rest) = content[at + 1..].strip_prefix("```")
            && let Some(line_end) = rest.find('\n')
        {
            return Some(OpenSign::Fence {
                at,
                lang: &rest[..line_end],
                resume: at + 4 + line_end + 1,
            });
        }
        if is_open_context(ch) {
            let next = at + ch.len_utf8();
            if let Some(decorator) = content[next..].chars().next()
                && is_decorator(decorator)
            {
                return Some(OpenSign::Inline {
                    at,
                    context: ch,
                    decorator,
                    resume: next + 1,
                });
            }
        }
    }
    None
}

fn find_inline_close(content: &str, from: usize, decorator: char) -> Option<CloseSign> {
    let mut chars = content[from..].char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        let at = from + offset;
        if ch == '\n' {
            return Some(CloseSign::Newline(at));
        }
        if ch == '<' {
            return Some(CloseSign::Tag(at));
        }
        if ch == decorator
            && let Some(&(_, follow)) = chars.peek()
            && closes(decorator, follow)
        {
            return Some(CloseSign::Closer(at));
        }
    }
    None
}

// A literal tag never nests; truncated input skips to the end.
fn skip_tag(content: &str, from: usize) -> usize {
    match content[from..].find('>') {
        Some(at) => from + at + 1,
        None => content.len(),
    }
}

fn is_decorator(ch: char) -> bool {
    matches!(ch, '`' | '*' | '/' | '_' | '-')
}

fn is_open_context(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '(' | '{' | '[' | '<' | '〈' | '《' | '［' | '｛' | '＜' | '（' | '、' | '。'
        )
}

fn closes(decorator: char, follow: char) -> bool {
    follow.is_whitespace()
        || (decorator == '`'
            && matches!(
                follow,
                ')' | '}' | ']' | '>' | '）' | '＞' | '｝' | '］' | '》' | '〉' | '、' | '。'
            ))
}

fn role_class(decorator: char) -> &'static str {
    match decorator {
        '`' => "code",
        '*' => "bold",
        '/' => "italic",
        '_' => "underline",
        _ => "delete",
    }
}

// Removes the first occurrence of `fragment`, returning the remaining text
// and the removed fragment (empty when absent).
fn split_off_fragment<'a>(content: &str, fragment: &'a str) -> (String, &'a str) {
    match content.find(fragment) {
        Some(at) => {
            let mut rest = String::with_capacity(content.len() - fragment.len());
            rest.push_str(&content[..at]);
            rest.push_str(&content[at + fragment.len()..]);
            (rest, fragment)
        }
        None => (content.to_string(), ""),
    }
}

// `<br>` plus one optional trailing space becomes a newline.
fn breaks_to_newlines(out: &mut String, content: &str) {
    let mut rest = content;
    while let Some(at) = rest.find(BR) {
        out.push_str(&rest[..at]);
        out.push('\n');
        rest = &rest[at + BR.len()..];
        if let Some(stripped) = rest.strip_prefix(' ') {
            rest = stripped;
        }
    }
    out.push_str(rest);
}

// Ascending line numbers for the left column, one per line of the
// already-highlighted code.
fn line_numbers(code: &str) -> String {
    let lines = code.matches('\n').count() + 1;
    let mut out = String::from("1");
    for number in 2..=lines {
        out.push('\n');
        out.push_str(&number.to_string());
    }
    out
}
