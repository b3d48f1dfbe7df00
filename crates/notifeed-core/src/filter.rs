//! Topic filter deciding feed membership.

use crate::types::RawPayload;

/// Substring a topic must contain (after lowercasing) to enter the feed.
pub const FEED_TOPIC: &str = "referral";

/// Returns `true` when the payload's topic mentions [`FEED_TOPIC`],
/// case-insensitively, anywhere in the value.
#[must_use]
pub fn matches(raw: &RawPayload) -> bool {
    raw.topic()
        .is_some_and(|topic| topic.to_lowercase().contains(FEED_TOPIC))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        /// matches() agrees with a lowercase substring check on the topic.
        #[test]
        fn matches_iff_lowercase_topic_contains(topic in "[a-zA-Z._]{0,24}") {
            let raw = RawPayload::from_value(json!({"event_type": topic.clone()})).unwrap();
            let expected = topic.to_lowercase().contains("referral");
            prop_assert_eq!(matches(&raw), expected);
        }

        /// Any casing of the domain term embedded in noise is accepted.
        #[test]
        fn embedded_term_in_any_case_matches(
            prefix in "[a-z.]{0,8}",
            suffix in "[a-z.]{0,8}",
            upper in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let term: String = "referral"
                .chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect();
            let raw = RawPayload::from_value(json!({"type": format!("{prefix}{term}{suffix}")})).unwrap();
            prop_assert!(matches(&raw));
        }
    }
}
