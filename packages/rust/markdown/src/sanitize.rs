//! Ordered Markdown stripping passes.
//!
//! Each pass is a function `&str -> String` applied in sequence. Order
//! matters: strong markers are removed before emphasis markers, otherwise the
//! single-marker rule would split a `**double**` span. The whole sequence is
//! repeated until the text stops changing. Every pass that changes the text
//! makes it strictly shorter, so the loop terminates and the result is a
//! fixed point, which is what makes [`strip_markdown`] idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Strip Markdown syntax from `text`, keeping the human-readable content.
pub fn strip_markdown(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = run_pipeline(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// One pass over every rule, in order.
fn run_pipeline(text: &str) -> String {
    let mut result = strip_headings(text);

    result = strip_thematic_breaks(&result);
    result = strip_strong(&result);
    result = strip_emphasis(&result);
    result = strip_list_markers(&result);
    result = collapse_links(&result);
    result = strip_code(&result);
    result = strip_orphan_markers(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Headings
// ---------------------------------------------------------------------------

/// Drop `#`..`######` prefixes (and bare `#` lines), then blank setext
/// `===` underlines.
fn strip_headings(text: &str) -> String {
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}(?:[ \t]+|$)").expect("valid regex"));

    strip_setext_underlines(&HEADING_RE.replace_all(text, ""))
}

/// A `===` line only underlines a heading when the line above has text.
fn strip_setext_underlines(text: &str) -> String {
    static SETEXT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[ \t]*=+[ \t]*$").expect("valid regex"));

    let mut out = String::with_capacity(text.len());
    let mut prev_blank = true;
    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if !prev_blank && SETEXT_RE.is_match(body) {
            out.push_str(&line[body.len()..]);
            prev_blank = true;
            continue;
        }
        prev_blank = body.trim().is_empty();
        out.push_str(line);
    }
    out
}

// ---------------------------------------------------------------------------
// Pass 2: Thematic breaks
// ---------------------------------------------------------------------------

/// Blank out `---`, `***` and `___` rule lines.
fn strip_thematic_breaks(text: &str) -> String {
    static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
            .expect("valid regex")
    });

    BREAK_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Strong (**x**, __x__)
// ---------------------------------------------------------------------------

fn strip_strong(text: &str) -> String {
    static STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\*\*([^\s*](?:[^*\n]*[^\s*])?)\*\*").expect("valid regex")
    });
    // Underscore spans must sit on word boundaries so `__init__`-style
    // identifiers inside a word are left alone.
    static UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(^|\W)__([^\s_](?:[^_\n]*[^\s_])?)__(\W|$)").expect("valid regex")
    });

    let result = STAR_RE.replace_all(text, "$1");
    UNDERSCORE_RE
        .replace_all(&result, "${1}${2}${3}")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Emphasis (*x*, _x_)
// ---------------------------------------------------------------------------

/// Spaced asterisks (`2 * 3 * 4`) and intra-word underscores (`snake_case`)
/// are not emphasis and survive this pass.
fn strip_emphasis(text: &str) -> String {
    static STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\*([^\s*](?:[^*\n]*[^\s*])?)\*").expect("valid regex")
    });
    static UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(^|\W)_([^\s_](?:[^_\n]*[^\s_])?)_(\W|$)").expect("valid regex")
    });

    let result = STAR_RE.replace_all(text, "$1");
    UNDERSCORE_RE
        .replace_all(&result, "${1}${2}${3}")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: List markers
// ---------------------------------------------------------------------------

/// Remove `-`, `*`, `+`, `1.` and `1)` prefixes at line start.
fn strip_list_markers(text: &str) -> String {
    static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:[*+-]|\d{1,3}[.)])[ \t]+").expect("valid regex")
    });

    LIST_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 6: Links and images
// ---------------------------------------------------------------------------

/// `[label](url)` and `![alt](url)` collapse to their visible text. The url
/// may hold one level of balanced parentheses.
fn collapse_links(text: &str) -> String {
    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"!?\[([^\]\n]*)\]\((?:[^()\n]|\([^()\n]*\))*\)").expect("valid regex")
    });

    LINK_RE.replace_all(text, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 7: Code
// ---------------------------------------------------------------------------

/// Unwrap fenced blocks (dropping the language tag) and inline code spans.
fn strip_code(text: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]*\n)?(.*?)```").expect("valid regex")
    });
    static INLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));

    let result = FENCE_RE.replace_all(text, "$1");
    INLINE_RE.replace_all(&result, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 8: Orphan markers
// ---------------------------------------------------------------------------

/// Unpaired backticks and doubled strong markers never belong in plain text.
fn strip_orphan_markers(text: &str) -> String {
    static ORPHAN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"`+|\*{2,}|_{2,}").expect("valid regex"));

    ORPHAN_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 9: Whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace per line and surrounding whitespace overall.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
