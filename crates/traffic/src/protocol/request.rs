//! Request line handling.
//!
//! A request is a single line `"{method} {url} {version}"`. It never carries header
//! fields; the server decides everything from the url alone.

use std::fmt;

use http::Method;

use crate::ensure;
use crate::protocol::{HTTP_11, ObjectKind, ParseError, validate_token};

/// The request line of a traffic request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: String,
    url: String,
    version: String,
}

impl RequestHead {
    /// Builds a request line from its three tokens.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidHeader` if the method is not `GET`, the only method
    /// the decoder recognizes as a request, or if the url or version is empty or holds
    /// a space, line break or NUL.
    pub fn new<M, U, V>(method: M, url: U, version: V) -> Result<Self, ParseError>
    where
        M: Into<String>,
        U: Into<String>,
        V: Into<String>,
    {
        let (method, url, version) = (method.into(), url.into(), version.into());
        ensure!(method == Method::GET.as_str(), ParseError::invalid_header(format!("unsupported request method {method:?}")));
        validate_token("url", &url)?;
        validate_token("version", &version)?;
        Ok(Self { method, url, version })
    }

    /// Builds a `GET {url} HTTP/1.1` request.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidHeader` if `url` is not a single token.
    pub fn get<U: Into<String>>(url: U) -> Result<Self, ParseError> {
        Self::new(Method::GET.as_str(), url, HTTP_11)
    }

    /// Builds the request for the given object kind.
    pub fn for_object(kind: ObjectKind) -> Self {
        Self { method: Method::GET.as_str().to_owned(), url: kind.as_str().to_owned(), version: HTTP_11.to_owned() }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Classifies the requested object, anything but the main object url is an inline object.
    pub fn object_kind(&self) -> ObjectKind {
        ObjectKind::classify(&self.url)
    }
}

impl fmt::Display for RequestHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method:{} URL:{} Version:{}", self.method, self.url, self.version)
    }
}
