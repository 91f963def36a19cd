//! Note text cleaner
//!
//! Strips the UI debris that web clippers leave in the answer field of
//! scraped notes. Three stages run in order:
//!
//! 1. Whole-text block removal (header, counter badge, favorite button,
//!    navigation buttons, attribution sentences, image icon, "Images"
//!    heading and its badges).
//! 2. Line filtering: the text is split on `<br>` and a line is dropped when
//!    either its raw or its tag-stripped form matches an exclusion pattern.
//! 3. Rejoin with `<br>` and collapse runs of three or more breaks to two.
//!
//! The stages repeat until the text stops changing, which makes
//! [`clean_field`] idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

const LINE_BREAK: &str = "<br>";

/// Whole-text blocks, removed in this order
static BLOCK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        // Header: title, stats and the "Play Map" link
        r"(?s)(?:<div>)+<div><h1>[^<]+</h1>.*?Play Map.*?</a><!--\]--><!--[^>]*--></div></div>",
        // "4 of 102 metas"
        r"<!--\[--><div>\d+\s+of\s+\d+\s+metas?</div><!--\]-->",
        // Favorite button with heart icon and count
        r#"(?s)<button[^>]*data-tooltip-trigger[^>]*>.*?<path[^>]*d="M12 12q\.825.*?</button><!--\]-->"#,
        // Previous / next buttons
        r#"(?s)<button data-slot="button"[^>]*>.*?</button>"#,
        r"(?s)Check out\s+<a[^>]*>.*?</a>\s+for more clues\.",
        r"(?si)Description and images taken from:\s+<a[^>]*>.*?</a>\.?",
        r"(?si)<div>(?:<!--[^>]*-->)*<p>Source:\s*<a[^>]*>[^<]*</a></p>(?:<!--[^>]*-->)*</div>",
        // Image icon next to the gallery caption
        r#"(?s)<svg[^>]*>.*?<path d="M5 21q-.825 0-1\.412-.587T3 19V5.*?</svg><!--\]--><!-- -->"#,
        r"<h3[^>]*>Images</h3>|<!--\[--><span>\(\d+\)</span><!--\]-->",
    ])
});

/// Line exclusion table, matched case-insensitively against whole lines
static LINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(?i)^\d+\s+of\s+\d+\s+metas?\s*$",
        r"(?i)^♥\s*\d+\s*$",
        r"(?i)^[<>\s]+$",
        r"(?i)^Check out\s+.*?for more clues\.\s*$",
        r"(?i)^Description and images taken from:.*$",
        r"(?i)^Images\s*$",
        r"(?i)^\(\d+\)\s*$",
        r"(?i)^Source\s*:\s*.*$",
    ])
});

static HTML_TAG: Lazy<Regex> = Lazy::new(|| compile(r"<[^>]+>"));

static BREAK_RUN: Lazy<Regex> = Lazy::new(|| compile(r"(<br>\s*){3,}"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Remove HTML tags, keeping the text between them
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// Clean one note field
///
/// Text without any targeted debris comes back unchanged.
pub fn clean_field(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One run of the three stages
fn clean_pass(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in BLOCK_PATTERNS.iter() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, "").into_owned();
        }
    }

    let kept: Vec<&str> = text
        .split(LINE_BREAK)
        .filter(|line| !is_debris_line(line))
        .collect();
    let joined = kept.join(LINE_BREAK);

    BREAK_RUN.replace_all(&joined, "<br><br>").into_owned()
}

fn is_debris_line(line: &str) -> bool {
    let stripped = strip_html(line);
    let variants = [stripped.trim(), line.trim()];

    variants
        .iter()
        .filter(|v| !v.is_empty())
        .any(|v| LINE_PATTERNS.iter().any(|p| p.is_match(v)))
}
