use std::fmt;

/// Exemption predicate over document paths. All configured patterns are
/// joined with `,` inside one brace group carrying a trailing empty
/// alternative, so an empty pattern list compiles to a matcher that matches
/// nothing rather than everything.
pub struct ExcludeMatcher {
    matcher: globset::GlobMatcher,
    pattern: String,
}

#[derive(Debug)]
pub struct PatternError {
    pub pattern: String,
    pub error: globset::Error,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid exclusion pattern {}: {}", self.pattern, self.error)
    }
}

impl std::error::Error for PatternError {}

impl ExcludeMatcher {
    pub fn build(patterns: &[String]) -> Result<ExcludeMatcher, PatternError> {
        let pattern = format!("{{{},}}", patterns.join(","));

        /* globset rejects the trailing empty alternative unless asked not
         * to; it also has no comment syntax, so `#`-leading entries stay
         * literal. */
        let glob = globset::GlobBuilder::new(&pattern)
            .empty_alternates(true)
            .build()
            .map_err(|error| PatternError {
                pattern: pattern.clone(),
                error,
            })?;

        Ok(ExcludeMatcher {
            matcher: glob.compile_matcher(),
            pattern,
        })
    }

    pub fn empty() -> ExcludeMatcher {
        /* "{,}" always compiles; see tests::empty_list_matches_nothing */
        ExcludeMatcher::build(&[]).expect("empty exclusion pattern compiles")
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for ExcludeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeMatcher")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn build(patterns: &[&str]) -> ExcludeMatcher {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ExcludeMatcher::build(&owned).unwrap()
    }

    #[test]
    fn empty_list_matches_nothing() {
        let matcher = ExcludeMatcher::empty();

        assert!(!matcher.matches("notebook.ipynb"));
        assert!(!matcher.matches("deeply/nested/path.txt"));
        assert!(!matcher.matches("*"));
    }

    #[test]
    fn literal_entries_match_exactly() {
        let matcher = build(&["notes.txt", "scratch.ipynb"]);

        assert!(matcher.matches("notes.txt"));
        assert!(matcher.matches("scratch.ipynb"));
        assert!(!matcher.matches("notes.txt.bak"));
    }

    #[test]
    fn hash_prefixed_entry_is_literal_not_comment() {
        let matcher = build(&["#note.txt"]);

        assert!(matcher.matches("#note.txt"));
        assert!(!matcher.matches("note.txt"));
    }

    #[test]
    fn alternation_covers_every_entry() {
        let matcher = build(&["*.bak", "tmp/*"]);

        assert!(matcher.matches("draft.bak"));
        assert!(matcher.matches("tmp/scratch"));
        assert!(!matcher.matches("draft.ipynb"));
    }

    #[test]
    fn malformed_pattern_fails_at_build_time() {
        let error = ExcludeMatcher::build(&["data[".to_string()]);

        assert_matches!(error, Err(PatternError { .. }));
    }
}
