//! Response header handling.
//!
//! A response carries a status line plus an open-ended map of named fields. The
//! protocol logic only relies on [`CONTENT_LENGTH`], [`CONTENT_TYPE`] and
//! [`NUM_OF_INLINE_OBJECTS`], everything else is carried through untouched.
//!
//! Fields are kept in a [`BTreeMap`] so serialization always walks them in name
//! order, which is the same order `serialized_size` counts them in.

use std::collections::BTreeMap;
use std::fmt;

use http::{Method, StatusCode};
use tracing::warn;

use crate::ensure;
use crate::protocol::{HTTP_11, ObjectKind, ParseError, validate_text, validate_token};

/// Declared payload size in bytes, excluding the header.
pub const CONTENT_LENGTH: &str = "ContentLength";

/// Either `main/object` or `inline/object`.
pub const CONTENT_TYPE: &str = "ContentType";

/// Number of inline objects referenced by a main object.
pub const NUM_OF_INLINE_OBJECTS: &str = "NumOfInlineObjects";

/// The status line and header fields of a traffic response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: String,
    status_code: String,
    phrase: String,
    fields: BTreeMap<String, String>,
}

impl ResponseHead {
    /// Builds a status line without fields.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidHeader` if the version or status code is empty or
    /// holds a space, line break or NUL, if the phrase holds a line break or NUL, or
    /// if the version is `GET`, which the decoder would read back as a request.
    pub fn new<V, S, P>(version: V, status_code: S, phrase: P) -> Result<Self, ParseError>
    where
        V: Into<String>,
        S: Into<String>,
        P: Into<String>,
    {
        let (version, status_code, phrase) = (version.into(), status_code.into(), phrase.into());
        validate_token("version", &version)?;
        ensure!(version != Method::GET.as_str(), ParseError::invalid_header("response version must not be GET"));
        validate_token("status code", &status_code)?;
        validate_text("reason phrase", &phrase)?;
        Ok(Self { version, status_code, phrase, fields: BTreeMap::new() })
    }

    /// Builds an empty `HTTP/1.1 200 OK` response.
    pub fn ok() -> Self {
        let status = StatusCode::OK;
        Self {
            version: HTTP_11.to_owned(),
            status_code: status.as_str().to_owned(),
            phrase: status.canonical_reason().unwrap_or("OK").to_owned(),
            fields: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::OK.as_str()
    }

    /// Returns the field value if the remote side has set it.
    ///
    /// A missing field is recoverable: it is logged and `None` is returned so the
    /// caller can fall back to a default.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = self.fields.get(name).map(String::as_str);
        if value.is_none() {
            warn!(field = name, "header field does not exist, it has not been set by the remote side");
        }
        value
    }

    /// Reads a decimal field, a missing field reads as `0`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidField` if the value is present but not a decimal integer.
    pub fn field_u64(&self, name: &str) -> Result<u64, ParseError> {
        match self.field(name) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ParseError::invalid_field(format!("{name}: {value} is not u64"))),
            None => Ok(0),
        }
    }

    /// Inserts or overwrites a field. Integers are rendered as base-10 text.
    ///
    /// # Errors
    ///
    /// The wire format splits a field line on its first `": "` and cannot escape
    /// anything, so names containing `": "` and values containing `:` are rejected,
    /// as is any CR, LF or NUL byte.
    pub fn set_field<V: fmt::Display>(&mut self, name: &str, value: V) -> Result<(), ParseError> {
        let value = value.to_string();
        validate_field(name, &value)?;
        self.fields.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn content_length(&self) -> Result<u64, ParseError> {
        self.field_u64(CONTENT_LENGTH).map_err(|e| ParseError::invalid_content_length(e.to_string()))
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.fields.insert(CONTENT_LENGTH.to_owned(), length.to_string());
    }

    /// The object kind this response carries, an absent or unknown type counts as inline.
    pub fn content_type(&self) -> ObjectKind {
        self.field(CONTENT_TYPE).map_or(ObjectKind::Inline, ObjectKind::classify)
    }

    pub fn num_of_inline_objects(&self) -> Result<u64, ParseError> {
        self.field_u64(NUM_OF_INLINE_OBJECTS)
    }

    /// Inserts a field that the decoder already split from a wire line.
    pub(crate) fn insert_raw(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_owned(), value.to_owned());
    }
}

fn validate_field(name: &str, value: &str) -> Result<(), ParseError> {
    const FORBIDDEN: [char; 3] = ['\r', '\n', '\0'];

    ensure!(!name.is_empty(), ParseError::invalid_field("empty field name"));
    ensure!(!name.contains(": "), ParseError::invalid_field(format!("field name {name:?} contains \": \"")));
    ensure!(!value.contains(':'), ParseError::invalid_field(format!("value of {name} contains ':'")));
    ensure!(
        !name.contains(FORBIDDEN) && !value.contains(FORBIDDEN),
        ParseError::invalid_field(format!("field {name} contains a line break or NUL"))
    );
    Ok(())
}

impl fmt::Display for ResponseHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version:{} Status Code:{} Phrase:{}", self.version, self.status_code, self.phrase)?;
        for (name, value) in &self.fields {
            write!(f, "\n{name}: {value}")?;
        }
        Ok(())
    }
}
