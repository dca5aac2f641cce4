// SPDX-License-Identifier: MIT

//! Textual rewrites applied before a concept expression is parsed

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

const OPEN_DELIMITER: &str = "[%";
const CLOSE_DELIMITER: &str = "%]";

static WORD_OPERATORS: Lazy<Vec<(&'static str, &'static str, Regex)>> = Lazy::new(|| {
    [("AND", "&&"), ("OR", "||"), ("NOT", "!")]
        .into_iter()
        .map(|(word, symbol)| {
            let pattern = Regex::new(&format!(r"\b{}\b", word)).expect("operator pattern");
            (word, symbol, pattern)
        })
        .collect()
});

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)(?:\.(\w+))?\}").expect("reference pattern"));

/// A `{Name}` or `{Name.Property}` occurrence in expression text
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMatch<'a> {
    pub matched: &'a str,
    pub name: &'a str,
    pub property: Option<&'a str>,
    pub span: Range<usize>,
}

/// Strip one pair of outer `[% ... %]` delimiters
///
/// Returns `None` when the trimmed expression is not wrapped in them.
pub fn strip_delimiters(expression: &str) -> Option<String> {
    let trimmed = expression.trim();
    if trimmed.len() >= OPEN_DELIMITER.len() + CLOSE_DELIMITER.len()
        && trimmed.starts_with(OPEN_DELIMITER)
        && trimmed.ends_with(CLOSE_DELIMITER)
    {
        let inner = &trimmed[OPEN_DELIMITER.len()..trimmed.len() - CLOSE_DELIMITER.len()];
        return Some(inner.trim().to_string());
    }
    None
}

/// Replace whole-word `AND`, `OR` and `NOT` with their symbolic operators
///
/// Returns the rewritten text and a description of each replacement that
/// fired, in `AND`, `OR`, `NOT` order.
pub fn replace_word_operators(expression: &str) -> (String, Vec<String>) {
    let mut text = expression.to_string();
    let mut fired = Vec::new();

    for (word, symbol, pattern) in WORD_OPERATORS.iter() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, *symbol).into_owned();
            fired.push(format!("{} with {}", word, symbol));
        }
    }

    (text, fired)
}

/// Every concept reference in the text, left to right
pub fn find_references(text: &str) -> Vec<ReferenceMatch<'_>> {
    REFERENCE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(ReferenceMatch {
                matched: whole.as_str(),
                name: name.as_str(),
                property: caps.get(2).map(|m| m.as_str()),
                span: whole.range(),
            })
        })
        .collect()
}

/// Turn a bare `=` into `==`, leaving `==`, `!=`, `<=` and `>=` alone
pub fn normalize_assignment(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c != '=' {
            continue;
        }
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(i + 1).copied();
        let part_of_operator = matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
        if !part_of_operator {
            out.push('=');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_delimiters() {
        assert_eq!(strip_delimiters("[%{A}%]"), Some("{A}".to_string()));
        assert_eq!(
            strip_delimiters("  [% {A} AND {B} %]  "),
            Some("{A} AND {B}".to_string())
        );
        assert_eq!(strip_delimiters("{A}"), None);
        assert_eq!(strip_delimiters("[%{A}"), None);
        assert_eq!(strip_delimiters("[%]"), None);
    }

    #[test]
    fn test_replace_word_operators() {
        let (text, fired) = replace_word_operators("{A} AND NOT {B} OR {C}");
        assert_eq!(text, "{A} && ! {B} || {C}");
        assert_eq!(fired, vec!["AND with &&", "OR with ||", "NOT with !"]);
    }

    #[test]
    fn test_word_operators_are_case_sensitive_and_whole_word() {
        let (text, fired) = replace_word_operators("{ANDREW} and {K_OR_MG} {NOTE}");
        assert_eq!(text, "{ANDREW} and {K_OR_MG} {NOTE}");
        assert!(fired.is_empty());
    }

    #[test]
    fn test_find_references() {
        let refs = find_references("{K_LOW} && {MG_LOW.COUNT} > 0");
        assert_eq!(refs.len(), 2);

        assert_eq!(refs[0].matched, "{K_LOW}");
        assert_eq!(refs[0].name, "K_LOW");
        assert_eq!(refs[0].property, None);
        assert_eq!(refs[0].span, 0..7);

        assert_eq!(refs[1].matched, "{MG_LOW.COUNT}");
        assert_eq!(refs[1].name, "MG_LOW");
        assert_eq!(refs[1].property, Some("COUNT"));
    }

    #[test]
    fn test_find_references_ignores_non_word_names() {
        assert!(find_references("{not a concept} {A-B}").is_empty());
    }

    #[test]
    fn test_normalize_assignment() {
        assert_eq!(normalize_assignment("1 = 1"), "1 == 1");
        assert_eq!(normalize_assignment("1 == 1"), "1 == 1");
        assert_eq!(normalize_assignment("1 != 2"), "1 != 2");
        assert_eq!(normalize_assignment("1 <= 2 && 2 >= 1"), "1 <= 2 && 2 >= 1");
        assert_eq!(normalize_assignment("a=b=c"), "a==b==c");
        assert_eq!(normalize_assignment("true"), "true");
    }
}
