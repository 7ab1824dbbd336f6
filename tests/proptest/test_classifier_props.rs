//! Property-based tests for prompt classification

use promptbridge::prompt::{PromptClassifier, PromptKind};
use proptest::prelude::*;

/// `[y/n]` or `(yes/no)` with random letter casing
fn binary_marker() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("[y/n]"), Just("(yes/no)")],
        prop::collection::vec(any::<bool>(), 8),
    )
        .prop_map(|(marker, upper)| {
            marker
                .chars()
                .zip(upper.into_iter().cycle())
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect()
        })
}

proptest! {
    #[test]
    fn test_classify_doesnt_panic(s in "\\PC*") {
        let _ = PromptClassifier::new().classify(&s);
    }

    #[test]
    fn test_marker_anywhere_is_binary(
        before in "[a-zA-Z ,.\n]{0,40}",
        marker in binary_marker(),
        after in "[a-zA-Z :?\n]{0,10}",
    ) {
        let text = format!("{}{}{}", before, marker, after);
        prop_assert_eq!(PromptClassifier::new().classify(&text).kind, PromptKind::Binary);
    }

    #[test]
    fn test_binary_wins_even_when_ending_in_question_mark(
        question in "[a-zA-Z ]{1,30}",
        marker in binary_marker(),
    ) {
        let text = format!("{} {} ?", question, marker);
        prop_assert_eq!(PromptClassifier::new().classify(&text).kind, PromptKind::Binary);
    }

    #[test]
    fn test_trailing_question_mark_is_free_text(
        body in "[a-zA-Z ,.\n]{0,60}",
        trailing in "[ \t\n]{0,3}",
    ) {
        let text = format!("{}?{}", body, trailing);
        prop_assert_eq!(PromptClassifier::new().classify(&text).kind, PromptKind::FreeText);
    }

    #[test]
    fn test_cleaned_binary_question_has_no_marker(
        question in "[a-zA-Z][a-zA-Z ]{0,30}",
        marker in binary_marker(),
        colon in prop_oneof![Just(""), Just(":"), Just(": ")],
    ) {
        let text = format!("{}? {}{}", question, marker, colon);
        let candidate = PromptClassifier::new().classify(&text);
        prop_assert_eq!(candidate.kind, PromptKind::Binary);
        let lower = candidate.question.to_lowercase();
        prop_assert!(!lower.ends_with("[y/n]") && !lower.ends_with("(yes/no)"));
        prop_assert_eq!(candidate.question, question.trim().to_string());
    }

    #[test]
    fn test_default_value_extracted(
        question in "[a-zA-Z ]{1,30}",
        default in "[a-zA-Z0-9_/.-]{1,20}",
    ) {
        let text = format!("{}?\nDefault: {}", question, default);
        let candidate = PromptClassifier::new().classify(&text);
        prop_assert_eq!(candidate.kind, PromptKind::FreeText);
        prop_assert_eq!(candidate.default_value, Some(default));
    }
}
