//! Citation marker extraction.
//!
//! Scans a generated answer for bracketed numeric markers (`[1]`, `[12]`)
//! and maps them back to the 1-based source numbering used in the prompt.
//! The answer text itself is never rewritten.

use std::collections::BTreeSet;

/// Markers found in an answer, split into those that resolve to a source
/// and those outside the prompt's numbering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationMap {
    /// 1-based source numbers the answer cites, deduplicated and ordered
    pub used: BTreeSet<usize>,

    /// Markers with no matching source, in order of first appearance
    pub out_of_range: Vec<usize>,
}

impl CitationMap {
    pub fn cites(&self, source_number: usize) -> bool {
        self.used.contains(&source_number)
    }
}

/// Extract bracketed numeric markers from `answer` and classify them
/// against `source_count` prompt sources.
///
/// Only plain `[digits]` sequences count; brackets around non-numeric text
/// and stray digits outside brackets are ignored. `[0]` never matches a
/// source since numbering starts at 1.
pub fn map_citations(answer: &str, source_count: usize) -> CitationMap {
    let mut map = CitationMap::default();
    let mut seen_invalid: BTreeSet<usize> = BTreeSet::new();

    let bytes = answer.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }

        if end > start && end < bytes.len() && bytes[end] == b']' {
            // Digits fit in usize for any plausible marker; saturate otherwise
            let number = answer[start..end].parse::<usize>().unwrap_or(usize::MAX);
            if number >= 1 && number <= source_count {
                map.used.insert(number);
            } else if seen_invalid.insert(number) {
                map.out_of_range.push(number);
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_and_dedupes_markers() {
        let map = map_citations("X is true [1], see also [3] and again [1].", 3);
        assert_eq!(map.used.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert!(map.out_of_range.is_empty());
        assert!(map.cites(1));
        assert!(!map.cites(2));
    }

    #[test]
    fn test_out_of_range_markers() {
        let map = map_citations("Claim [2] and bogus [7] and [0].", 2);
        assert_eq!(map.used.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(map.out_of_range, vec![7, 0]);
    }

    #[test]
    fn test_ignores_non_numeric_brackets() {
        let map = map_citations("Array[i] access, [n/a], [], [1a], and [2].", 5);
        assert_eq!(map.used.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(map.out_of_range.is_empty());
    }

    #[test]
    fn test_multi_digit_markers() {
        let map = map_citations("See [10] and [12].", 12);
        assert_eq!(map.used.iter().copied().collect::<Vec<_>>(), vec![10, 12]);
    }

    #[test]
    fn test_no_markers() {
        let map = map_citations("Plain answer without citations.", 4);
        assert!(map.used.is_empty());
        assert!(map.out_of_range.is_empty());
    }

    #[test]
    fn test_unterminated_bracket_at_end() {
        let map = map_citations("Truncated [2", 3);
        assert!(map.used.is_empty());
    }
}
