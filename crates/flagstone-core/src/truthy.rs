//! # Truthiness
//!
//! The token grammar shared by every tier that stores a toggle as text.

/// Tokens that read as `true`, compared ASCII case-insensitively.
pub const TRUTHY_TOKENS: [&str; 5] = ["true", "t", "yes", "y", "1"];

/// Interpret a raw value.
///
/// Total over `Option<&str>`: `None`, the empty string and anything outside
/// [`TRUTHY_TOKENS`] read as `false`. No trimming is applied, `" true"` is
/// not a token.
#[must_use]
pub fn is_truthy(raw: Option<&str>) -> bool {
    raw.is_some_and(|value| {
        TRUTHY_TOKENS
            .iter()
            .any(|token| value.eq_ignore_ascii_case(token))
    })
}

/// Canonical text written to the store for a boolean.
#[must_use]
pub fn as_token(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn truthy_tokens_in_any_case() {
        for raw in ["TRUE", "True", "t", "T", "Yes", "YES", "y", "Y", "1"] {
            assert!(is_truthy(Some(raw)), "{raw} should be truthy");
        }
    }

    #[test]
    fn everything_else_is_false() {
        for raw in ["0", "false", "FALSE", "", "no", "n", "on", "2", "truee", " true"] {
            assert!(!is_truthy(Some(raw)), "{raw:?} should be falsy");
        }
        assert!(!is_truthy(None));
    }

    #[test]
    fn canonical_tokens_parse_back() {
        assert!(is_truthy(Some(as_token(true))));
        assert!(!is_truthy(Some(as_token(false))));
    }

    proptest! {
        #[test]
        fn longer_strings_never_truthy(raw in "[a-zA-Z0-9]{5,16}") {
            prop_assert!(!is_truthy(Some(&raw)));
        }

        #[test]
        fn case_does_not_matter(idx in 0usize..TRUTHY_TOKENS.len()) {
            let token = TRUTHY_TOKENS[idx];
            prop_assert!(is_truthy(Some(&token.to_ascii_uppercase())));
        }
    }
}
