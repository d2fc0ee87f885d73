//! Model markdown → Telegram HTML, and message splitting.

use std::sync::OnceLock;

use regex::Regex;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]\n]+)\]\((https?://[^)\s]+)\)").expect("valid regex"))
}

/// Convert the markdown subset Gemini commonly emits to Telegram HTML.
///
/// Handles fenced and inline code, `**bold**`, `__bold__`, `*italic*`, `_italic_`,
/// `#` headers, `-`/`*` bullets and `[text](url)` links. Anything else is escaped text.
/// The output is best-effort: Telegram may still reject it, which callers handle by
/// resending the raw text.
pub fn convert_markdown_to_html(input: &str) -> String {
    let mut out = Vec::new();
    let mut fence: Option<Vec<&str>> = None;

    for line in input.split('\n') {
        if line.trim_start().starts_with("```") {
            match fence.take() {
                Some(body) => out.push(format!("<pre>{}</pre>", escape_html(&body.join("\n")))),
                None => fence = Some(Vec::new()),
            }
            continue;
        }
        if let Some(body) = fence.as_mut() {
            body.push(line);
            continue;
        }
        out.push(convert_line(line));
    }

    // Unclosed fence: keep the content as code.
    if let Some(body) = fence {
        out.push(format!("<pre>{}</pre>", escape_html(&body.join("\n"))));
    }

    out.join("\n")
}

fn convert_line(line: &str) -> String {
    if let Some(rest) = header_text(line) {
        return format!("<b>{}</b>", convert_inline(rest));
    }
    if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return format!("• {}", convert_inline(rest));
    }
    convert_inline(line)
}

fn header_text(line: &str) -> Option<&str> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    line[hashes..].strip_prefix(' ')
}

/// Inline code spans are cut out first so emphasis markers inside them stay literal.
fn convert_inline(line: &str) -> String {
    let mut out = String::new();
    let mut rest = line;
    loop {
        let Some(open) = rest.find('`') else {
            out.push_str(&convert_emphasis(&escape_html(rest)));
            return out;
        };
        let Some(close) = rest[open + 1..].find('`') else {
            out.push_str(&convert_emphasis(&escape_html(rest)));
            return out;
        };
        out.push_str(&convert_emphasis(&escape_html(&rest[..open])));
        let code = &rest[open + 1..open + 1 + close];
        out.push_str(&format!("<code>{}</code>", escape_html(code)));
        rest = &rest[open + close + 2..];
    }
}

fn convert_emphasis(text: &str) -> String {
    let text = wrap_pairs(text, "**", "b");
    let text = wrap_pairs(&text, "__", "b");
    let text = wrap_pairs(&text, "*", "i");
    let text = wrap_pairs(&text, "_", "i");
    link_re()
        .replace_all(&text, r#"<a href="$2">$1</a>"#)
        .into_owned()
}

/// Replace `delim…delim` pairs with `<tag>…</tag>`; an unmatched delimiter is kept.
fn wrap_pairs(text: &str, delim: &str, tag: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find(delim) {
        let after = &rest[start + delim.len()..];
        let Some(len) = after.find(delim).filter(|n| *n > 0) else {
            break;
        };
        let inner = &after[..len];
        // `snake_case_names` and `2 * 3 * 4` are not emphasis.
        if inner.starts_with(' ') || inner.ends_with(' ') || is_word_joined(rest, start, delim) {
            out.push_str(&rest[..start + delim.len()]);
            rest = after;
            continue;
        }
        out.push_str(&rest[..start]);
        out.push_str(&format!("<{tag}>{inner}</{tag}>"));
        rest = &after[len + delim.len()..];
    }
    out.push_str(rest);
    out
}

fn is_word_joined(text: &str, start: usize, delim: &str) -> bool {
    delim == "_"
        && text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric())
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Prefers breaking at newlines, then at spaces; falls back to a hard cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.chars().count() > limit {
        let hard = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard];
        let cut = if rest[hard..].starts_with(['\n', ' ']) {
            hard
        } else {
            window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .filter(|i| *i > 0)
                .unwrap_or(hard)
        };

        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches(['\n', ' ']);
    }
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
