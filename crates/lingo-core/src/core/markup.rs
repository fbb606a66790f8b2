// crates/lingo-core/src/core/markup.rs
// ============================================================================
// Module: Markup Normalization
// Description: Color and formatting code normalization for catalog text.
// Purpose: Produce render-ready text once per resolved translation.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! Catalog documents carry color markup in several hex spellings
//! (`&{#RRGGBB}`, `<#RRGGBB>`, `{#RRGGBB}`, `&#RRGGBB`, `#RRGGBB`) alongside
//! legacy `&`-prefixed formatting codes. [`normalize`] rewrites both into the
//! section-sign wire form the session clients render. Normalization runs once
//! per tier-1 cache fill, never per request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Section-sign escape understood by session clients.
const SECTION: char = '\u{a7}';

/// Characters valid after a `&` formatting escape.
const FORMAT_CODES: &str = "0123456789abcdefklmnorx";

/// Hex color token in any of the accepted spellings.
#[allow(clippy::unwrap_used, reason = "Pattern is a compile-time constant.")]
static HEX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:&\{#|<#|\{#|&#|#)([A-Fa-f0-9]{6})(?:\}|>)?").unwrap());

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes hex color tokens and legacy `&` codes into wire form.
///
/// Hex tokens become `§x§R§R§G§G§B§B`; `&` followed by a valid format code
/// becomes `§` with the code lowercased. All other text passes through
/// untouched.
#[must_use]
pub fn normalize(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    let expanded = HEX_PATTERN.replace_all(message, |captures: &regex::Captures<'_>| {
        let mut replacement = String::with_capacity(14);
        replacement.push(SECTION);
        replacement.push('x');
        for c in captures[1].chars() {
            replacement.push(SECTION);
            replacement.push(c.to_ascii_lowercase());
        }
        replacement
    });
    translate_ampersand_codes(&expanded)
}

/// Rewrites `&`-prefixed formatting codes to the section-sign form.
fn translate_ampersand_codes(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&'
            && let Some(&next) = chars.peek()
            && FORMAT_CODES.contains(next.to_ascii_lowercase())
        {
            out.push(SECTION);
            out.push(next.to_ascii_lowercase());
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(normalize("hello world"), "hello world");
    }

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn ampersand_codes_become_section_codes() {
        assert_eq!(normalize("&aGreen &lBold"), "\u{a7}aGreen \u{a7}lBold");
    }

    #[test]
    fn ampersand_without_code_is_preserved() {
        assert_eq!(normalize("fish & chips"), "fish & chips");
    }

    #[test]
    fn hex_token_expands_to_section_x_form() {
        assert_eq!(
            normalize("<#FF0000>red"),
            "\u{a7}x\u{a7}f\u{a7}f\u{a7}0\u{a7}0\u{a7}0\u{a7}0red"
        );
    }

    #[test]
    fn all_hex_spellings_are_accepted() {
        let expected = "\u{a7}x\u{a7}0\u{a7}0\u{a7}f\u{a7}f\u{a7}0\u{a7}0";
        for spelling in ["&{#00FF00}", "<#00FF00>", "{#00FF00}", "&#00FF00", "#00FF00"] {
            assert_eq!(normalize(spelling), expected, "spelling {spelling}");
        }
    }

    #[test]
    fn uppercase_code_is_lowercased() {
        assert_eq!(normalize("&AGreen"), "\u{a7}aGreen");
    }
}
