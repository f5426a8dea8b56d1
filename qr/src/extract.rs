//! Next-quiz URL extraction from free-text responses

use regex::Regex;
use tracing::debug;

/// Finds `https://<host>/quiz-<digits>` URLs in text
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    pattern: Regex,
    lowercase: bool,
}

impl UrlExtractor {
    /// Build an extractor for the given quiz host
    ///
    /// The host is matched literally. With `lowercase` set the text is
    /// lowercased before matching, so a mixed-case path is reported in lower case.
    pub fn new(host: &str, lowercase: bool) -> Result<Self, regex::Error> {
        debug!(%host, %lowercase, "UrlExtractor::new: called");
        let pattern = Regex::new(&format!(r"https://{}/quiz-\d+", regex::escape(host)))?;
        Ok(Self { pattern, lowercase })
    }

    /// First quiz URL in `text`, if any
    pub fn extract(&self, text: &str) -> Option<String> {
        let found = if self.lowercase {
            self.pattern.find(&text.to_lowercase()).map(|m| m.as_str().to_string())
        } else {
            self.pattern.find(text).map(|m| m.as_str().to_string())
        };
        debug!(?found, text_len = %text.len(), "UrlExtractor::extract: scanned");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HOST: &str = "tds-llm-analysis.s-anand.net";

    fn extractor() -> UrlExtractor {
        UrlExtractor::new(HOST, false).unwrap()
    }

    #[test]
    fn test_extracts_url_from_json_body() {
        let text = r#"{"correct": true, "url": "https://tds-llm-analysis.s-anand.net/quiz-7", "reason": null}"#;
        assert_eq!(
            extractor().extract(text),
            Some("https://tds-llm-analysis.s-anand.net/quiz-7".to_string())
        );
    }

    #[test]
    fn test_returns_first_match() {
        let text = "see https://tds-llm-analysis.s-anand.net/quiz-3 then https://tds-llm-analysis.s-anand.net/quiz-4";
        assert_eq!(
            extractor().extract(text).as_deref(),
            Some("https://tds-llm-analysis.s-anand.net/quiz-3")
        );
    }

    #[test]
    fn test_no_match_for_other_hosts_or_paths() {
        let e = extractor();
        assert_eq!(e.extract(r#"{"correct": true}"#), None);
        assert_eq!(e.extract("https://evil.example.com/quiz-1"), None);
        assert_eq!(e.extract("https://tds-llm-analysis.s-anand.net/submit"), None);
        assert_eq!(e.extract("http://tds-llm-analysis.s-anand.net/quiz-1"), None);
        assert_eq!(e.extract("https://tds-llm-analysis.s-anand.net/quiz-"), None);
    }

    #[test]
    fn test_host_dots_are_literal() {
        assert_eq!(extractor().extract("https://tds-llm-analysisXs-anand.net/quiz-1"), None);
    }

    #[test]
    fn test_path_is_case_sensitive_by_default() {
        assert_eq!(extractor().extract("https://tds-llm-analysis.s-anand.net/QUIZ-1"), None);
    }

    #[test]
    fn test_lowercase_mode_matches_mixed_case() {
        let e = UrlExtractor::new(HOST, true).unwrap();
        assert_eq!(
            e.extract("Next: HTTPS://TDS-LLM-ANALYSIS.S-ANAND.NET/Quiz-12").as_deref(),
            Some("https://tds-llm-analysis.s-anand.net/quiz-12")
        );
    }

    proptest! {
        #[test]
        fn prop_embedded_url_is_found(prefix in "[a-z {}:\",]{0,40}", n in 0u32..100_000, suffix in "[ }\"]{0,10}") {
            let url = format!("https://{}/quiz-{}", HOST, n);
            let text = format!("{}{}{}", prefix, url, suffix);
            prop_assert_eq!(extractor().extract(&text), Some(url));
        }

        #[test]
        fn prop_result_is_substring_of_input(text in ".{0,200}") {
            if let Some(found) = extractor().extract(&text) {
                prop_assert!(text.contains(&found));
            }
        }

        #[test]
        fn prop_text_without_host_never_matches(text in "[a-z0-9 /:.-]{0,200}") {
            prop_assume!(!text.contains(HOST));
            prop_assert_eq!(extractor().extract(&text), None);
        }
    }
}
