//! Front-matter parsing and single-field rewriting.
//!
//! Post documents carry a YAML front-matter block delimited by `---` lines.
//! Parsing uses a hand-written YAML subset (key-value pairs, quoted strings,
//! booleans) — the fields reconciliation needs are flat scalars, and a full
//! YAML round-trip would reformat the document. The rewrite path edits the
//! `excerpt` line in place so every other byte of the file survives.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use commentkeeper_shared::{CommentKeeperError, Result};

/// Parsed front-matter fields relevant to reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub draft: bool,
    pub excerpt: Option<String>,
}

/// A document split into its front-matter block and body.
#[derive(Debug, Clone)]
pub struct Document {
    /// Parsed front-matter fields.
    pub front: FrontMatter,
    /// Markdown body after the closing delimiter.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Split raw content into `(front_matter_lines, body)`.
///
/// Returns `None` when the document has no front-matter block.
fn split(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let body = &rest[end + 4..];
    let body = body.strip_prefix('\n').unwrap_or(body);
    Some((yaml, body))
}

/// Parse a document's raw content into front matter and body.
///
/// A document without a front-matter block yields empty defaults and the
/// full content as body.
pub fn parse(content: &str) -> Result<Document> {
    let Some((yaml, body)) = split(content) else {
        return Ok(Document {
            front: FrontMatter::default(),
            body: content.to_string(),
        });
    };

    let mut front = FrontMatter::default();
    for line in yaml.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = unquote(value.trim());
        match key {
            "title" => front.title = Some(value),
            "slug" => front.slug = non_empty(value),
            "date" => front.date = Some(parse_date(&value)?),
            "updated" => front.updated = Some(parse_date(&value)?),
            "draft" => front.draft = value.eq_ignore_ascii_case("true"),
            "excerpt" => front.excerpt = non_empty(value),
            _ => {}
        }
    }

    Ok(Document {
        front,
        body: body.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Strip a matching pair of single or double quotes.
fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            let inner = &value[1..value.len() - 1];
            if first == b'"' {
                return inner.replace("\\\"", "\"").replace("\\\\", "\\");
            }
            return inner.to_string();
        }
    }
    value.to_string()
}

/// Parse the date formats Hexo front matter uses in practice.
///
/// Naive timestamps are taken as UTC; the canonical path derivation depends
/// on the UTC calendar date being stable across runs.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(CommentKeeperError::validation(format!(
        "unrecognized date '{value}'"
    )))
}

// ---------------------------------------------------------------------------
// Excerpt rewrite
// ---------------------------------------------------------------------------

/// Return `content` with its front-matter `excerpt` field set to `summary`.
///
/// Replaces the existing `excerpt:` line in place, or inserts one just
/// before the closing delimiter. Every other byte of the document is
/// preserved. Fails if the document has no front-matter block to write into.
pub fn with_excerpt(content: &str, summary: &str) -> Result<String> {
    if split(content).is_none() {
        return Err(CommentKeeperError::validation(
            "document has no front-matter block",
        ));
    }

    let quoted = format!("excerpt: \"{}\"", escape(summary));

    // Walk lines inside the block, tracking the closing delimiter.
    let mut out = String::with_capacity(content.len() + quoted.len());
    let mut in_front = false;
    let mut seen_open = false;
    let mut replaced = false;

    for (i, line) in content.split_inclusive('\n').enumerate() {
        let stripped = line.trim_end_matches(['\n', '\r']);
        if i == 0 && stripped == "---" {
            seen_open = true;
            in_front = true;
            out.push_str(line);
            continue;
        }
        if in_front && stripped == "---" {
            if !replaced {
                out.push_str(&quoted);
                out.push('\n');
                replaced = true;
            }
            in_front = false;
            out.push_str(line);
            continue;
        }
        if in_front && stripped.trim_start().starts_with("excerpt:") && !replaced {
            // Keep the original line ending
            let ending = &line[stripped.len()..];
            out.push_str(&quoted);
            out.push_str(ending);
            replaced = true;
            continue;
        }
        out.push_str(line);
    }

    if !seen_open || !replaced {
        return Err(CommentKeeperError::validation(
            "document has no front-matter block",
        ));
    }
    Ok(out)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
