//! # Most Recent Tag
//!
//! Two ways of picking "the latest release" of a product:
//!
//! - GitHub tags carry a date. [`most_recent_by_date`] keeps the first 19
//!   characters (`YYYY-MM-DDTHH:MM:SS`) of each date, so timezone and `Z`
//!   suffixes are ignored, and picks the tag with the latest timestamp.
//! - SVN tag directories carry only a name. [`normalize_svn_tag`] rewrites
//!   the historical naming styles (`v5_0_2`, `v3a`, `2.1`) into
//!   `MAJOR.MINOR.PATCH`, and [`most_recent_svn_tag`] picks the highest.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use log::warn;
use regex::Regex;
use semver::Version;

use crate::pagination::TagRecord;

/// Version reported when no SVN tag can be normalized.
pub const NO_TAG_VERSION: &str = "0.0.0";

const DATE_PREFIX_LEN: usize = 19;
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn tag_timestamp(date: &str) -> Option<NaiveDateTime> {
    let prefix = date.get(..DATE_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(prefix, DATE_FORMAT).ok()
}

/// The tag with the latest date, if any tag has a readable date.
///
/// Tags sharing the latest timestamp are resolved in favour of the
/// lexicographically greatest name, with a warning.
pub fn most_recent_by_date(tags: &[TagRecord]) -> Option<&TagRecord> {
    let mut dated: Vec<(NaiveDateTime, &TagRecord)> = Vec::with_capacity(tags.len());
    for tag in tags {
        match tag_timestamp(&tag.tagged_date) {
            Some(timestamp) => dated.push((timestamp, tag)),
            None => warn!(
                "Ignoring tag {} with unreadable date {:?}",
                tag.name, tag.tagged_date
            ),
        }
    }

    let latest = dated.iter().map(|(timestamp, _)| *timestamp).max()?;
    let mut tied: Vec<&TagRecord> = dated
        .into_iter()
        .filter(|(timestamp, _)| *timestamp == latest)
        .map(|(_, tag)| tag)
        .collect();
    tied.sort_by(|a, b| a.name.cmp(&b.name));

    if tied.len() > 1 {
        let names: Vec<&str> = tied.iter().map(|t| t.name.as_str()).collect();
        warn!(
            "Tags {} share the most recent date {}; choosing {}",
            names.join(", "),
            latest,
            names[names.len() - 1]
        );
    }
    tied.pop()
}

fn svn_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-?([ab])(\d*))?$")
            .expect("SVN tag pattern is valid")
    })
}

/// Rewrite an SVN tag directory name as `MAJOR.MINOR.PATCH`, optionally
/// followed by `-a<N>` or `-b<N>`.
///
/// Returns `None` for names that follow none of the known conventions.
///
/// ```
/// use sdss_install::tags::normalize_svn_tag;
///
/// assert_eq!(normalize_svn_tag("v5_0_2").as_deref(), Some("5.0.2"));
/// assert_eq!(normalize_svn_tag("v3a").as_deref(), Some("3.0.0-a0"));
/// assert_eq!(normalize_svn_tag("trunk"), None);
/// ```
pub fn normalize_svn_tag(tag: &str) -> Option<String> {
    let cleaned = tag.trim().trim_end_matches('/').replace('_', ".");
    let captures = svn_tag_pattern().captures(&cleaned)?;

    let part = |i: usize| -> Option<u64> {
        match captures.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let (major, minor, patch) = (part(1)?, part(2)?, part(3)?);

    let mut normalized = format!("{}.{}.{}", major, minor, patch);
    if let Some(stage) = captures.get(4) {
        let build = match captures.get(5).map(|m| m.as_str()) {
            Some(digits) if !digits.is_empty() => digits.parse::<u64>().ok()?,
            _ => 0,
        };
        normalized.push_str(&format!("-{}{}", stage.as_str(), build));
    }
    Some(normalized)
}

/// An SVN tag entry together with its normalized version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvnTag {
    /// Directory name as listed, without the trailing `/`.
    pub entry: String,
    pub version: Version,
}

/// Highest-versioned entry of an `svn ls` listing of a tags directory.
pub fn latest_svn_tag<'a, I>(entries: I) -> Option<SvnTag>
where
    I: IntoIterator<Item = &'a str>,
{
    entries
        .into_iter()
        .map(|entry| entry.trim().trim_end_matches('/'))
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let normalized = normalize_svn_tag(entry)?;
            let version = Version::parse(&normalized).ok()?;
            Some(SvnTag {
                entry: entry.to_string(),
                version,
            })
        })
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// The normalized most recent tag of a listing, or `"0.0.0"`.
pub fn most_recent_svn_tag<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    latest_svn_tag(entries)
        .map(|tag| tag.version.to_string())
        .unwrap_or_else(|| NO_TAG_VERSION.to_string())
}
