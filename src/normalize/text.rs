//! Volatile-token erasure
//!
//! Strips tokens that change between renders of the same page (addresses,
//! identifiers, prices, timestamps) so they cannot perturb fingerprints.

use regex::Regex;

use super::NormalizeError;

/// Default regex patterns erased by [`TextNormalizer`]
pub const DEFAULT_TEXT_PATTERNS: &[&str] = &[
    // email addresses
    r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
    // dotted IPv4 with strict 0-255 octets
    r"\b(?:25[0-5]|2[0-4]\d|1?\d?\d)(?:\.(?:25[0-5]|2[0-4]\d|1?\d?\d)){3}\b",
    // UUIDs
    r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
    // relative dates
    r"\b(?:[0-9]{1,2}\s(?:days?|weeks?|months?|years?)\s(?:ago|from\s+now))\b",
    // currency-prefixed prices (no leading \b, currency symbols are not word chars)
    r"[\$€£¥]\s*\d+(?:\.\d{1,2})?\b",
    // phone numbers
    r"\b\+?\d{7,15}\b",
    // SSNs
    r"\b\d{3}-\d{2}-\d{4}\b",
    // ISO / US timestamps with a time component
    r"\b(?:(?:[0-9]{4}-[0-9]{2}-[0-9]{2})|(?:(?:[0-9]{2}/){2}[0-9]{4}))\s(?:[0-9]{2}:[0-9]{2}:[0-9]{2})\b",
];

/// Supplemental date/time shapes appended to the default catalog
pub const DATE_TIME_PATTERNS: &[&str] = &[
    // RFC3339-style timestamps with a T separator and optional zone offset
    r"(?i)\b[0-9]{4}-[0-9]{2}-[0-9]{2}t[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?(?:z|[+-][0-9]{2}:[0-9]{2})?\b",
    // long-form dates such as "january 2, 2024"
    r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+[0-9]{1,2},\s+[0-9]{4}\b",
];

/// Applies an ordered list of erasure patterns to text
pub struct TextNormalizer {
    patterns: Vec<Regex>,
}

impl TextNormalizer {
    /// Build the normalizer over [`DEFAULT_TEXT_PATTERNS`] plus
    /// [`DATE_TIME_PATTERNS`].
    pub fn new() -> Result<Self, NormalizeError> {
        Self::with_patterns(
            DEFAULT_TEXT_PATTERNS
                .iter()
                .chain(DATE_TIME_PATTERNS.iter())
                .copied(),
        )
    }

    /// Build the normalizer over an explicit pattern list. Any pattern that
    /// fails to compile is a construction-time error.
    pub fn with_patterns<'a>(
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, NormalizeError> {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let regex = Regex::new(pattern).map_err(|source| NormalizeError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    /// Erase every match of every pattern, in catalog order.
    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();
        for pattern in &self.patterns {
            text = pattern.replace_all(&text, "").into_owned();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns() {
        let normalizer = TextNormalizer::new().unwrap();

        let text = "
            Contact us at test@example.com or admin@SITE.ORG for support.
            Server IP: 192.168.1.1 and public IP: 8.8.8.8
            Invalid IPs should not match: 999.999.999.999 or 300.400.500.600
            UUID: 550e8400-e29b-41d4-a716-446655440000
            Relative dates: 5 days ago, 2 weeks from now, 10 months ago
            Prices: $19.99, €50.00, £25.50, ¥1000
            Phone numbers: +1234567890, +447911123456, +33123456789
            SSN: 123-45-6789, 987-65-4321
            Timestamps: 2023-12-25 14:30:00, 12/25/2023 09:15:30
        ";

        let result = normalizer.apply(text);

        let removed = [
            "test@example.com",
            "admin@SITE.ORG",
            "192.168.1.1",
            "8.8.8.8",
            "550e8400-e29b-41d4-a716-446655440000",
            "5 days ago",
            "2 weeks from now",
            "10 months ago",
            "$19.99",
            "€50.00",
            "£25.50",
            "¥1000",
            "1234567890",
            "447911123456",
            "33123456789",
            "123-45-6789",
            "987-65-4321",
            "2023-12-25 14:30:00",
            "12/25/2023 09:15:30",
        ];
        for token in removed {
            assert!(
                !result.contains(token),
                "{:?} should have been removed, result: {}",
                token,
                result
            );
        }

        let kept = ["999.999.999.999", "300.400.500.600"];
        for token in kept {
            assert!(
                result.contains(token),
                "{:?} should not have been removed, result: {}",
                token,
                result
            );
        }
    }

    #[test]
    fn test_supplemental_date_patterns() {
        let normalizer = TextNormalizer::new().unwrap();

        let result = normalizer.apply("built 2023-12-25T14:30:00Z, shipped January 2, 2024");
        assert!(!result.contains("2023-12-25T14:30:00Z"));
        assert!(!result.contains("January 2, 2024"));
        assert!(result.contains("built"));
        assert!(result.contains("shipped"));
    }

    #[test]
    fn test_token_only_input_erases_to_empty() {
        let normalizer = TextNormalizer::new().unwrap();

        for token in [
            "test@example.com",
            "10.0.0.1",
            "550e8400-e29b-41d4-a716-446655440000",
            "3 days ago",
            "$19.99",
            "123-45-6789",
            "2023-12-25 14:30:00",
        ] {
            assert_eq!(normalizer.apply(token).trim(), "", "token {:?}", token);
        }
    }

    #[test]
    fn test_invalid_pattern_is_construction_error() {
        assert!(TextNormalizer::with_patterns(["("]).is_err());
    }
}
