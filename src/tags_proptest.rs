//! Property-based tests for tag normalization.

#[cfg(test)]
mod proptest_tests {
    use crate::tags::{most_recent_svn_tag, normalize_svn_tag};
    use proptest::prelude::*;

    /// Tag names in the conventions seen in SVN tag directories.
    fn svn_style_tag() -> impl Strategy<Value = String> {
        (
            prop::bool::ANY,
            0u32..100,
            prop::option::of(0u32..100),
            prop::option::of(0u32..100),
            prop::option::of((prop_oneof![Just("a"), Just("b")], prop::option::of(0u32..10))),
            prop_oneof![Just("."), Just("_")],
        )
            .prop_map(|(v, major, minor, patch, suffix, sep)| {
                let mut tag = String::new();
                if v {
                    tag.push('v');
                }
                tag.push_str(&major.to_string());
                if let Some(minor) = minor {
                    tag.push_str(sep);
                    tag.push_str(&minor.to_string());
                    if let Some(patch) = patch {
                        tag.push_str(sep);
                        tag.push_str(&patch.to_string());
                    }
                }
                if let Some((stage, build)) = suffix {
                    tag.push_str(stage);
                    if let Some(build) = build {
                        tag.push_str(&build.to_string());
                    }
                }
                tag
            })
    }

    proptest! {
        /// Property: every conventional tag name normalizes
        #[test]
        fn conventional_tags_normalize(tag in svn_style_tag()) {
            prop_assert!(normalize_svn_tag(&tag).is_some(), "failed to normalize {}", tag);
        }

        /// Property: normalizing a normalized tag returns it unchanged
        #[test]
        fn normalization_is_idempotent(tag in svn_style_tag()) {
            let once = normalize_svn_tag(&tag).unwrap();
            let twice = normalize_svn_tag(&once);
            prop_assert_eq!(twice.as_deref(), Some(once.as_str()));
        }

        /// Property: normalized tags are valid semantic versions
        #[test]
        fn normalized_tags_parse_as_semver(tag in svn_style_tag()) {
            let normalized = normalize_svn_tag(&tag).unwrap();
            prop_assert!(semver::Version::parse(&normalized).is_ok(), "{} -> {}", tag, normalized);
        }

        /// Property: normalize_svn_tag never panics on arbitrary input
        #[test]
        fn normalize_never_panics(input in ".*") {
            let _ = normalize_svn_tag(&input);
        }

        /// Property: the most recent tag of a listing is one of its normalized entries
        #[test]
        fn most_recent_is_a_member(tags in prop::collection::vec(svn_style_tag(), 1..10)) {
            let latest = most_recent_svn_tag(tags.iter().map(String::as_str));
            let normalized: Vec<String> = tags.iter().filter_map(|t| normalize_svn_tag(t)).collect();
            prop_assert!(normalized.contains(&latest));
        }
    }
}
