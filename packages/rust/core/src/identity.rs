//! Canonical path derivation — the join key between content items and
//! annotations.
//!
//! `/{UTCyear}/{UTCmonth:02}/{UTCday:02}/{encodedSlug}/`, computed from the
//! publish date and slug. Pure and deterministic: the same inputs must yield
//! the same path on every run, or previously stored annotations become
//! orphans and duplicates appear.

use chrono::{DateTime, Datelike, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::warn;
use url::Url;

use commentkeeper_shared::{CanonicalPath, CommentKeeperError, ContentItem, Result};

/// The set `encodeURIComponent` escapes: everything but alphanumerics and
/// `- _ . ! ~ * ' ( )`. Stored paths were produced by that function, so the
/// join only holds if we escape the exact same bytes.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Derive the canonical path for a publish date and slug.
pub fn canonical_path(publish_date: DateTime<Utc>, slug: &str) -> CanonicalPath {
    let encoded: Vec<String> = slug.split('/').map(encode_segment).collect();
    CanonicalPath(format!(
        "/{:04}/{:02}/{:02}/{}/",
        publish_date.year(),
        publish_date.month(),
        publish_date.day(),
        encoded.join("/")
    ))
}

/// Percent-encode a path segment containing non-ASCII characters; pure-ASCII
/// segments pass through byte-identical.
fn encode_segment(segment: &str) -> String {
    if segment.is_ascii() {
        segment.to_string()
    } else {
        utf8_percent_encode(segment, COMPONENT).to_string()
    }
}

/// Resolve the slug for an item: explicit front-matter slug, else the source
/// file name minus extension.
///
/// The fallback must match whatever the publishing pipeline used when the
/// post went live; a divergence silently orphans the stored annotation, so
/// falling back is logged per item rather than applied quietly.
pub fn resolve_slug(item: &ContentItem) -> Result<String> {
    if let Some(slug) = &item.slug {
        return Ok(slug.clone());
    }

    let stem = item
        .source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CommentKeeperError::missing_metadata(
                &item.id,
                "no slug and no usable source file name",
            )
        })?;

    warn!(
        item = %item.title,
        slug = stem,
        "no explicit slug, falling back to source file name; \
         verify this matches the published URL"
    );
    Ok(stem.to_string())
}

/// The canonical path of a content item.
pub fn item_path(item: &ContentItem) -> Result<CanonicalPath> {
    let slug = resolve_slug(item)?;
    Ok(canonical_path(item.publish_date, &slug))
}

/// Absolute URL of the item on the published site.
pub fn href_for(base_url: &Url, path: &CanonicalPath) -> String {
    format!(
        "{}{}",
        base_url.as_str().trim_end_matches('/'),
        path.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn item(slug: Option<&str>, source: &str) -> ContentItem {
        ContentItem {
            id: "post".into(),
            title: "Post".into(),
            slug: slug.map(String::from),
            publish_date: date(2024, 3, 5),
            updated_at: date(2024, 3, 5),
            raw_text: String::new(),
            is_draft: false,
            source_path: PathBuf::from(source),
        }
    }

    #[test]
    fn ascii_slug_passes_through_byte_identical() {
        let path = canonical_path(date(2024, 3, 5), "hello-world");
        assert_eq!(path.as_str(), "/2024/03/05/hello-world/");
    }

    #[test]
    fn single_digit_month_and_day_are_zero_padded() {
        let path = canonical_path(date(2023, 1, 9), "pad");
        assert_eq!(path.as_str(), "/2023/01/09/pad/");
    }

    #[test]
    fn cjk_slug_is_percent_encoded() {
        let path = canonical_path(date(2024, 3, 5), "hello-世界");
        assert_eq!(path.as_str(), "/2024/03/05/hello-%E4%B8%96%E7%95%8C/");
    }

    #[test]
    fn multi_segment_slug_encodes_per_segment() {
        let path = canonical_path(date(2024, 3, 5), "notes/中文");
        assert_eq!(path.as_str(), "/2024/03/05/notes/%E4%B8%AD%E6%96%87/");
    }

    #[test]
    fn encoding_is_deterministic_and_idempotent_across_calls() {
        let a = canonical_path(date(2024, 3, 5), "hello-世界");
        let b = canonical_path(date(2024, 3, 5), "hello-世界");
        assert_eq!(a, b);
    }

    #[test]
    fn utc_date_not_local_date_feeds_the_path() {
        // 2024-03-05 23:30 UTC stays March 5th regardless of host timezone.
        let d = Utc.with_ymd_and_hms(2024, 3, 5, 23, 30, 0).unwrap();
        assert_eq!(canonical_path(d, "late").as_str(), "/2024/03/05/late/");
    }

    #[test]
    fn explicit_slug_wins_over_file_name() {
        let i = item(Some("explicit"), "/posts/file-name.md");
        assert_eq!(resolve_slug(&i).unwrap(), "explicit");
    }

    #[test]
    fn file_stem_fallback_drops_extension() {
        let i = item(None, "/posts/my-fallback.md");
        assert_eq!(resolve_slug(&i).unwrap(), "my-fallback");
    }

    #[test]
    fn no_slug_and_no_file_name_is_an_error() {
        let i = item(None, "");
        assert!(resolve_slug(&i).is_err());
    }

    #[test]
    fn href_joins_base_and_path_without_double_slash() {
        let base = Url::parse("https://example.com/").unwrap();
        let path = canonical_path(date(2024, 3, 5), "hello");
        assert_eq!(
            href_for(&base, &path),
            "https://example.com/2024/03/05/hello/"
        );
    }
}
