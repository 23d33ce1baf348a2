//! Reply sanitization before synthesis
//!
//! Generated replies may carry markdown markup and emoji, neither of which
//! should be spoken aloud. [`sanitize`] strips markdown down to plain text
//! and removes characters in the emoji/pictograph/dingbat ranges.

use std::sync::LazyLock;

use regex::Regex;

/// Emoji, pictograph, dingbat, and joiner ranges removed before synthesis
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F1E6}-\u{1F1FF}", // regional indicators
        "\u{1F300}-\u{1FAFF}", // pictographs, emoticons, transport, supplemental
        "\u{2190}-\u{21FF}",   // arrows
        "\u{2300}-\u{23FF}",   // misc technical (watch, media controls)
        "\u{24C2}",            // circled M
        "\u{2500}-\u{2BEF}",   // box drawing through misc symbols
        "\u{FE0F}",            // variation selector
        "\u{200D}",            // zero-width joiner
        "\u{3030}",            // wavy dash
        "]+",
    ))
    .expect("valid regex")
});

/// Strip markdown markup and emoji from a generated reply
#[must_use]
pub fn sanitize(text: &str) -> String {
    let plain = strip_markdown(text);
    EMOJI.replace_all(&plain, "").into_owned()
}

/// Reduce markdown to its plain-text content.
///
/// Handled constructs:
/// - fenced code blocks (fences removed, contents kept)
/// - `# heading` markers, `> blockquote` markers, `-`/`*` list bullets
/// - `**bold**` / `__bold__`, `*italic*` / `_italic_`, `~~strike~~`
/// - `` `code` `` spans
/// - `[text](url)` links and `![alt](url)` images (kept as their text)
///
/// Unmatched delimiters are left in place rather than silently eaten.
#[must_use]
pub fn strip_markdown(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let lines: Vec<&str> = input.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        // Fenced code block: drop the fences, keep the contents verbatim
        if line.trim_start().starts_with("```") {
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                output.push_str(lines[i]);
                output.push('\n');
                i += 1;
            }
            // Skip closing fence
            if i < lines.len() {
                i += 1;
            }
            continue;
        }

        output.push_str(&strip_line(line));
        output.push('\n');
        i += 1;
    }

    // input without a trailing newline should not gain one
    if output.ends_with('\n') && !input.ends_with('\n') {
        output.pop();
    }

    output
}

/// Strip block-level markers then inline formatting from one line
fn strip_line(line: &str) -> String {
    let line = strip_block_marker(line);
    let line = strip_inline_code(&line);
    let line = strip_links(&line);
    let line = strip_delimited(&line, "**");
    let line = strip_delimited(&line, "__");
    let line = strip_delimited(&line, "~~");
    let line = strip_single_delimited(&line, '*');
    strip_single_delimited(&line, '_')
}

/// Remove a leading heading, blockquote, or list marker
fn strip_block_marker(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    if let Some(rest) = trimmed.strip_prefix("> ") {
        return format!("{indent}{rest}");
    }
    if trimmed.starts_with('#') {
        let after = trimmed.trim_start_matches('#');
        if let Some(rest) = after.strip_prefix(' ') {
            return format!("{indent}{rest}");
        }
    }
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return format!("{indent}{rest}");
        }
    }

    line.to_string()
}

/// Remove `` ` `` fences around inline code spans, keeping the contents
fn strip_inline_code(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '`' {
            let mut code = String::new();
            let mut found_close = false;
            for next in chars.by_ref() {
                if next == '`' {
                    found_close = true;
                    break;
                }
                code.push(next);
            }
            if found_close {
                result.push_str(&code);
            } else {
                // Unmatched backtick, output as-is
                result.push('`');
                result.push_str(&code);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Reduce `[text](url)` and `![alt](url)` to their text
fn strip_links(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;

    while let Some(bracket_start) = remaining.find('[') {
        let is_image = remaining[..bracket_start].ends_with('!');
        let before_end = if is_image {
            bracket_start - 1
        } else {
            bracket_start
        };
        result.push_str(&remaining[..before_end]);

        let after_bracket = &remaining[bracket_start + 1..];
        if let Some(bracket_end) = after_bracket.find("](") {
            let link_text = &after_bracket[..bracket_end];
            let after_paren = &after_bracket[bracket_end + 2..];

            if let Some(paren_end) = after_paren.find(')') {
                result.push_str(link_text);
                remaining = &after_paren[paren_end + 1..];
                continue;
            }
        }

        // Not a valid link, output what was skipped
        if is_image {
            result.push('!');
        }
        result.push('[');
        remaining = after_bracket;
    }

    result.push_str(remaining);
    result
}

/// Remove paired two-char delimiters (`**`, `__`, `~~`), keeping the contents
fn strip_delimited(text: &str, delimiter: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;
    let mut open_at: Option<usize> = None;

    while let Some(pos) = remaining.find(delimiter) {
        result.push_str(&remaining[..pos]);
        open_at = match open_at {
            Some(_) => None,
            None => Some(result.len()),
        };
        remaining = &remaining[pos + delimiter.len()..];
    }

    result.push_str(remaining);

    // If unmatched, put the delimiter back where it was removed
    if let Some(at) = open_at {
        result.insert_str(at, delimiter);
    }

    result
}

/// Remove paired single-char emphasis delimiters.
///
/// A delimiter only opens when followed by a non-space, so list markers and
/// arithmetic survive (mirrors how clients render emphasis).
fn strip_single_delimited(text: &str, delimiter: char) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut open_at: Option<usize> = None;

    while let Some(ch) = chars.next() {
        if ch == delimiter {
            match open_at {
                None => {
                    if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                        open_at = Some(result.len());
                    } else {
                        result.push(ch);
                    }
                }
                Some(at) if result.len() == at => {
                    // Empty span (e.g. a restored `**`): keep both literally
                    result.push(ch);
                    result.push(ch);
                    open_at = None;
                }
                Some(_) => open_at = None,
            }
        } else {
            result.push(ch);
        }
    }

    if let Some(at) = open_at {
        result.insert(at, delimiter);
    }

    result
}
