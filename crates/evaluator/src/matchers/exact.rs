use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExactScore {
    pub is_exact: bool,
}

/// Strict equality of two normalized values. No partial credit.
pub fn match_exact(predicted: &str, truth: &str) -> ExactScore {
    ExactScore {
        is_exact: predicted == truth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_identifier, normalize_link};

    #[test]
    fn address_segment_is_case_sensitive() {
        let truth = normalize_identifier("eip155:1:0xABC");
        let predicted = normalize_identifier("EIP155:1:0xabc");
        assert!(!match_exact(&predicted, &truth).is_exact);

        let predicted = normalize_identifier("EIP155:1:0xABC ");
        assert!(match_exact(&predicted, &truth).is_exact);
    }

    #[test]
    fn links_compare_after_normalization() {
        let truth = normalize_link("https://app.uniswap.org");
        let predicted = normalize_link("https://www.app.uniswap.org/");
        assert!(match_exact(&predicted, &truth).is_exact);
        assert!(!match_exact("https://uniswap.org", "https://app.uniswap.org").is_exact);
    }

    #[test]
    fn empty_values_match_each_other_only() {
        assert!(match_exact("", "").is_exact);
        assert!(!match_exact("", "x").is_exact);
    }
}
