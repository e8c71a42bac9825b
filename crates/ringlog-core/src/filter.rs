//! The substring highlighter: the one Filter implementation the core ships.
//!
//! Acceptance and mark placement are specified bit-exact; tests in this
//! module and in `buffer_window` depend on the exact semantics below, not
//! just "some reasonable substring match".

use crate::line::{Line, Mark};

/// `fn(&mut dyn Line) -> bool`, evaluated with the BufferWindow mutex held.
///
/// Must be cheap: it runs once per candidate line on every reconciliation.
pub trait Filter: Send + Sync {
    /// Evaluate the filter against `line`, attaching marks as a side
    /// effect, and report whether the line should be visible.
    fn apply(&self, line: &mut dyn Line) -> bool;
}

/// Splits the filter input on spaces into terms and accepts a line if any
/// non-empty term occurs as a substring of its text (OR semantics). An
/// input with zero non-empty terms accepts everything and clears marks.
#[derive(Debug, Clone, Default)]
pub struct SubstringFilter {
    terms: Vec<String>,
}

impl SubstringFilter {
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self {
            terms: input.split(' ').map(str::to_string).collect(),
        }
    }

    /// True when every split term is empty (the filter accepts everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.iter().all(String::is_empty)
    }

    #[must_use]
    pub fn input(&self) -> String {
        self.terms.join(" ")
    }
}

impl Filter for SubstringFilter {
    fn apply(&self, line: &mut dyn Line) -> bool {
        if self.is_empty() {
            line.set_marks(Vec::new());
            return true;
        }

        let text = line.text().to_string();
        let mut marks = Vec::new();
        let mut accept = false;

        for (group, term) in self.terms.iter().enumerate() {
            if term.is_empty() {
                continue;
            }
            let mut start = 0usize;
            while start <= text.len() {
                match text[start..].find(term.as_str()) {
                    Some(pos) => {
                        let offset = start + pos;
                        marks.push(Mark {
                            group: group as u32,
                            offset: offset as u32,
                            length: term.len() as u32,
                        });
                        accept = true;
                        start = offset + term.len();
                    }
                    None => break,
                }
            }
        }

        line.set_marks(marks);
        accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{SourceId, TextLine};

    #[test]
    fn no_terms_accepts_all_and_clears_marks() {
        let f = SubstringFilter::new("");
        let mut line = TextLine::new(SourceId(0), "anything at all".to_string());
        line.set_marks(vec![Mark {
            group: 0,
            offset: 0,
            length: 1,
        }]);
        assert!(f.apply(&mut line));
        assert!(line.marks().is_empty());
    }

    #[test]
    fn single_term_rejects_non_matching_line() {
        let f = SubstringFilter::new("needle");
        let mut line = TextLine::new(SourceId(0), "no match here".to_string());
        assert!(!f.apply(&mut line));
        assert!(line.marks().is_empty());
    }

    #[test]
    fn single_term_records_every_occurrence() {
        let f = SubstringFilter::new("ab");
        let mut line = TextLine::new(SourceId(0), "ab cab abab".to_string());
        assert!(f.apply(&mut line));
        // occurrences at byte offsets 0, 4, 7, 9
        let offsets: Vec<u32> = line.marks().iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 4, 7, 9]);
        assert!(line.marks().iter().all(|m| m.length == 2 && m.group == 0));
    }

    #[test]
    fn multi_term_or_semantics_and_group_indices() {
        let f = SubstringFilter::new("foo bar");
        let mut line = TextLine::new(SourceId(0), "a bar b foo c".to_string());
        assert!(f.apply(&mut line));
        let groups: Vec<u32> = line.marks().iter().map(|m| m.group).collect();
        assert!(groups.contains(&0)); // "foo"
        assert!(groups.contains(&1)); // "bar"
    }

    #[test]
    fn empty_terms_between_spaces_are_skipped() {
        let f = SubstringFilter::new("foo  bar");
        assert!(!f.is_empty());
        let mut accepted = TextLine::new(SourceId(0), "foo".to_string());
        assert!(f.apply(&mut accepted));
        let mut rejected = TextLine::new(SourceId(0), "nothing".to_string());
        assert!(!f.apply(&mut rejected));
    }

    #[test]
    fn input_round_trips_through_join() {
        let f = SubstringFilter::new("a b c");
        assert_eq!(f.input(), "a b c");
    }
}
