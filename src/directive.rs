//! Directive file parsing.
//!
//! Manifests and listicles share one line-oriented format:
//!
//! ```text
//! // comment lines are dropped
//! ww /projects
//! tt Projects
//! cf projects
//!
//! tt Another element
//! ```
//!
//! Each non-blank line is a [`Pair`]: the first whitespace-delimited token is
//! the code, the rest of the line (left-trimmed) is the content. Pairs are
//! grouped into [`Element`]s separated by blank lines. Runs of blank lines
//! never produce empty elements, and the last element is kept even when the
//! file does not end with a blank line.

use crate::symbols::{CommandKind, SymbolTable};
use std::fmt;
use std::fs;
use std::path::Path;

/// One directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub code: String,
    pub content: String,
}

/// A blank-line delimited group of pairs. Never empty once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub pairs: Vec<Pair>,
}

impl Element {
    /// Pairs together with their resolved command kind.
    pub fn commands<'a>(
        &'a self,
        symbols: &'a SymbolTable,
    ) -> impl Iterator<Item = (CommandKind, &'a str)> + 'a {
        self.pairs
            .iter()
            .map(|p| (symbols.kind(&p.code), p.content.as_str()))
    }
}

impl fmt::Display for Element {
    /// Renders the element back in directive syntax, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .pairs
            .iter()
            .map(|p| format!("{} {}", p.code, p.content))
            .collect();
        write!(f, "[{}]", lines.join("; "))
    }
}

/// Split `text` into elements.
pub fn parse(text: &str, symbols: &SymbolTable) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut current = Element::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.pairs.is_empty() {
                elements.push(std::mem::take(&mut current));
            }
            continue;
        }
        if symbols.resolve(line) == CommandKind::Skip {
            continue;
        }
        let (code, content) = match line.split_once(char::is_whitespace) {
            Some((code, rest)) => (code, rest.trim_start()),
            None => (line, ""),
        };
        current.pairs.push(Pair {
            code: code.to_string(),
            content: content.to_string(),
        });
    }

    if !current.pairs.is_empty() {
        elements.push(current);
    }
    elements
}

/// Read and parse a directive file.
pub fn read_file(path: &Path, symbols: &SymbolTable) -> std::io::Result<Vec<Element>> {
    let text = fs::read_to_string(path)?;
    Ok(parse(&text, symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pair(code: &str, content: &str) -> Pair {
        Pair {
            code: code.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn groups_pairs_by_blank_lines() {
        let symbols = SymbolTable::default();
        let elements = parse("tt One\nbb first\n\ntt Two\n\n", &symbols);
        assert_eq!(elements.len(), 2);
        assert_eq!(
            elements[0].pairs,
            vec![pair("tt", "One"), pair("bb", "first")]
        );
        assert_eq!(elements[1].pairs, vec![pair("tt", "Two")]);
    }

    #[test]
    fn consecutive_and_leading_blank_lines_are_absorbed() {
        let symbols = SymbolTable::default();
        let elements = parse("\n\n   \ntt One\n\n\n\n\ntt Two\n", &symbols);
        assert_eq!(elements.len(), 2);
        assert!(elements.iter().all(|e| !e.pairs.is_empty()));
    }

    #[test]
    fn final_element_without_trailing_blank_is_kept() {
        let symbols = SymbolTable::default();
        let elements = parse("tt One\n\ntt Two\nbb last", &symbols);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].pairs[1], pair("bb", "last"));
    }

    #[test]
    fn comments_are_dropped_without_splitting() {
        let symbols = SymbolTable::default();
        let elements = parse("tt One\n// not a pair\nbb brief\n", &symbols);
        assert_eq!(elements.len(), 1);
        assert_eq!(
            elements[0].pairs,
            vec![pair("tt", "One"), pair("bb", "brief")]
        );
    }

    #[test]
    fn content_is_left_trimmed_and_inner_spacing_kept() {
        let symbols = SymbolTable::default();
        let elements = parse("  bb    some   spaced  text  \n", &symbols);
        assert_eq!(elements[0].pairs, vec![pair("bb", "some   spaced  text")]);
    }

    #[test]
    fn code_without_content_has_empty_content() {
        let symbols = SymbolTable::default();
        let elements = parse("un\n", &symbols);
        assert_eq!(elements[0].pairs, vec![pair("un", "")]);
    }

    #[test]
    fn unknown_codes_are_kept_as_pairs() {
        let symbols = SymbolTable::default();
        let elements = parse("zz mystery\n", &symbols);
        assert_eq!(elements[0].pairs, vec![pair("zz", "mystery")]);
        let kinds: Vec<_> = elements[0].commands(&symbols).collect();
        assert_eq!(kinds, vec![(CommandKind::Unknown, "mystery")]);
    }

    #[test]
    fn crlf_input_parses_like_lf() {
        let symbols = SymbolTable::default();
        let elements = parse("tt One\r\n\r\ntt Two\r\n", &symbols);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].pairs, vec![pair("tt", "One")]);
    }

    #[test]
    fn display_lists_pairs() {
        let element = Element {
            pairs: vec![pair("ww", "/a"), pair("cf", "list")],
        };
        assert_eq!(element.to_string(), "[ww /a; cf list]");
    }

    fn line_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            Just("// comment".to_string()),
            "(tt|bb|md|ww|zz) [a-z ]{0,12}",
        ]
    }

    proptest! {
        #[test]
        fn pair_count_matches_content_lines(lines in prop::collection::vec(line_strategy(), 0..40)) {
            let symbols = SymbolTable::default();
            let text = lines.join("\n");
            let elements = parse(&text, &symbols);

            let expected = lines
                .iter()
                .filter(|l| symbols.resolve(l) != CommandKind::Skip)
                .count();
            let actual: usize = elements.iter().map(|e| e.pairs.len()).sum();
            prop_assert_eq!(actual, expected);
            prop_assert!(elements.iter().all(|e| !e.pairs.is_empty()));
        }
    }
}
