//! Core traffic protocol types.
//!
//! This module holds the in-memory shape of the messages exchanged by the simulated
//! client and server, plus the error taxonomy shared by the codec and the state
//! machines.
//!
//! # Components
//!
//! - **Messages** ([`message`]): [`HttpMessage`] is the closed `Request | Response`
//!   variant, [`Message`] and [`PayloadItem`] are the items a streaming decoder emits
//! - **Requests** ([`request`]): [`RequestHead`], a bare request line
//! - **Responses** ([`response`]): [`ResponseHead`], a status line plus named fields,
//!   and the well-known field names [`CONTENT_LENGTH`], [`CONTENT_TYPE`] and
//!   [`NUM_OF_INLINE_OBJECTS`]
//! - **Errors** ([`error`]): [`ParseError`], [`SendError`], [`SessionError`] and the
//!   adapter-level [`HttpError`]

use crate::ensure;

mod message;
pub use message::HttpMessage;
pub use message::Message;
pub use message::PayloadItem;

mod request;
pub use request::RequestHead;

mod response;
pub use response::CONTENT_LENGTH;
pub use response::CONTENT_TYPE;
pub use response::NUM_OF_INLINE_OBJECTS;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
pub use error::SessionError;

/// The only protocol version the traffic generator speaks.
pub const HTTP_11: &str = "HTTP/1.1";

const LINE_BREAKS: [char; 3] = ['\r', '\n', '\0'];

/// A start-line token is split on single spaces, so it must be non-empty and free
/// of spaces, line breaks and NUL.
pub(crate) fn validate_token(what: &'static str, token: &str) -> Result<(), ParseError> {
    ensure!(!token.is_empty(), ParseError::invalid_header(format!("empty {what}")));
    ensure!(
        !token.contains(' ') && !token.contains(LINE_BREAKS),
        ParseError::invalid_header(format!("{what} {token:?} contains a space, line break or NUL"))
    );
    Ok(())
}

/// Free text such as the reason phrase runs to the end of its line and may hold spaces.
pub(crate) fn validate_text(what: &'static str, text: &str) -> Result<(), ParseError> {
    ensure!(!text.contains(LINE_BREAKS), ParseError::invalid_header(format!("{what} {text:?} contains a line break or NUL")));
    Ok(())
}

/// The two kinds of objects a simulated page is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// The page itself, requested as `main/object`.
    Main,
    /// An embedded resource, requested as `inline/object`.
    Inline,
}

impl ObjectKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Main => "main/object",
            ObjectKind::Inline => "inline/object",
        }
    }

    /// Classifies a url or content type. Only `main/object` is the main object, any
    /// other value is served and counted as an inline object.
    pub fn classify(value: &str) -> Self {
        if value == ObjectKind::Main.as_str() { ObjectKind::Main } else { ObjectKind::Inline }
    }
}
