//! Alias record codec
//!
//! Converts between the TXT record content and an ordered list of
//! [`AliasRecord`]s. The content is a run of double-quoted segments:
//!
//! ```text
//! "forward-email=catchall@home.example""forward-email=sales:sales@corp.example"
//! ```
//!
//! The first segment is the default (catch-all) sentinel. It is dropped on
//! decode and always re-emitted first on encode. The format has no escaping,
//! so aliases and emails must never contain `"` or `:`; see
//! [`validate_alias`] and [`validate_email`].
//!
//! This module is pure: no I/O, no catalog lookups.

use thiserror::Error;

/// Key every segment carries before the `=`
pub const SEGMENT_KEY: &str = "forward-email";

/// Characters the format uses as field delimiters
pub const DELIMITERS: [char; 2] = ['"', ':'];

/// One alias entry as stored in the record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasRecord {
    /// Local part of the forwarding address
    pub alias: String,
    /// Destination email
    pub email: String,
}

impl AliasRecord {
    /// Create a new record
    pub fn new(alias: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            email: email.into(),
        }
    }

    /// The quoted segment for this record
    pub fn segment(&self) -> String {
        segment(&self.alias, &self.email)
    }

    /// Same alias and destination, ignoring ASCII case
    pub fn same_forward(&self, other: &AliasRecord) -> bool {
        self.alias.eq_ignore_ascii_case(&other.alias) && self.email.eq_ignore_ascii_case(&other.email)
    }
}

/// Result of decoding a record's content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedBlob {
    /// Alias records in content order, sentinel excluded
    pub records: Vec<AliasRecord>,
    /// Each record's segment exactly as stored, quotes included
    ///
    /// Parallel to `records`. Re-emitting these keeps untouched entries
    /// byte-identical even when the stored segment carries padding.
    pub segments: Vec<String>,
    /// Whether a sentinel segment was found
    pub sentinel_present: bool,
}

/// Decode failures
///
/// Offsets are byte offsets into the content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A quote was opened and never closed
    #[error("unterminated quote starting at offset {offset}")]
    UnterminatedQuote {
        /// Offset of the opening quote
        offset: usize,
    },

    /// Something other than whitespace between segments
    #[error("unexpected character {found:?} outside quotes at offset {offset}")]
    TrailingGarbage {
        /// Offset of the character
        offset: usize,
        /// The character
        found: char,
    },

    /// Segment without the `forward-email=` key
    #[error("segment {index} has an unknown key: {segment:?}")]
    UnknownKey {
        /// Segment position, counting the sentinel
        index: usize,
        /// Segment body
        segment: String,
    },

    /// Segment value that is neither the sentinel nor `alias:email`
    #[error("segment {index} is not of the form alias:email: {segment:?}")]
    MalformedSegment {
        /// Segment position, counting the sentinel
        index: usize,
        /// Segment body
        segment: String,
    },
}

/// Decode record content into alias records
///
/// Whitespace between segments is skipped; providers render multi-string
/// TXT content as `"a" "b"`. Whitespace inside a segment is trimmed from the
/// decoded record but kept in [`DecodedBlob::segments`]. Empty content
/// decodes to an empty list with no sentinel.
pub fn decode(content: &str, default_email: &str) -> Result<DecodedBlob, CodecError> {
    let mut decoded = DecodedBlob::default();

    for (index, body) in tokenize(content)?.into_iter().enumerate() {
        match parse_segment(index, body, default_email)? {
            Some(record) => {
                decoded.records.push(record);
                decoded.segments.push(format!("\"{body}\""));
            }
            None => decoded.sentinel_present = true,
        }
    }

    Ok(decoded)
}

/// Encode alias records, sentinel first
pub fn encode<'a, I>(records: I, default_email: &str) -> String
where
    I: IntoIterator<Item = &'a AliasRecord>,
{
    let mut content = sentinel_segment(default_email);
    for record in records {
        content.push_str(&record.segment());
    }
    content
}

/// One quoted `alias:email` segment
pub fn segment(alias: &str, email: &str) -> String {
    format!("\"{SEGMENT_KEY}={alias}:{email}\"")
}

/// The quoted sentinel segment
pub fn sentinel_segment(default_email: &str) -> String {
    format!("\"{SEGMENT_KEY}={default_email}\"")
}

/// Check that an alias can be stored without corrupting the record
pub fn validate_alias(alias: &str) -> crate::Result<()> {
    if alias.is_empty() {
        return Err(crate::Error::invalid_alias("alias cannot be empty"));
    }
    if let Some(c) = alias
        .chars()
        .find(|c| DELIMITERS.contains(c) || *c == '=' || c.is_whitespace())
    {
        return Err(crate::Error::invalid_alias(format!(
            "alias {alias:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Check that a destination email can be stored without corrupting the record
pub fn validate_email(email: &str) -> crate::Result<()> {
    if email.is_empty() {
        return Err(crate::Error::invalid_alias("destination email cannot be empty"));
    }
    if let Some(c) = email
        .chars()
        .find(|c| DELIMITERS.contains(c) || c.is_whitespace())
    {
        return Err(crate::Error::invalid_alias(format!(
            "destination {email:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

/// Split content into segment bodies
fn tokenize(content: &str) -> Result<Vec<&str>, CodecError> {
    let mut bodies = Vec::new();
    let mut open: Option<usize> = None;

    for (offset, ch) in content.char_indices() {
        match (open, ch) {
            (None, '"') => open = Some(offset),
            (Some(start), '"') => {
                bodies.push(&content[start + 1..offset]);
                open = None;
            }
            (Some(_), _) => {}
            (None, c) if c.is_ascii_whitespace() => {}
            (None, found) => return Err(CodecError::TrailingGarbage { offset, found }),
        }
    }

    match open {
        Some(offset) => Err(CodecError::UnterminatedQuote { offset }),
        None => Ok(bodies),
    }
}

/// Parse one segment body; `None` is the sentinel
fn parse_segment(
    index: usize,
    body: &str,
    default_email: &str,
) -> Result<Option<AliasRecord>, CodecError> {
    let body = body.trim();

    let value = match body.split_once('=') {
        Some((key, value)) if key.trim() == SEGMENT_KEY => value.trim(),
        _ => {
            return Err(CodecError::UnknownKey {
                index,
                segment: body.to_string(),
            });
        }
    };

    if value == default_email {
        return Ok(None);
    }

    match value.split_once(':') {
        Some((alias, email)) if !alias.trim().is_empty() && !email.trim().is_empty() => {
            Ok(Some(AliasRecord::new(alias.trim(), email.trim())))
        }
        _ => Err(CodecError::MalformedSegment {
            index,
            segment: body.to_string(),
        }),
    }
}
