//! Routing of metrics endpoint requests
//!
//! The binaries' HTTP servers turn each inbound request into a [`Request`]
//! (method, decoded path and decoded query arguments) and hand it to the node;
//! [`route`] decides between the metrics document and the 404 diagnostic.
//! Framing and header handling stay with the server crates.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use percent_encoding::percent_decode_str;

pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// Paths that serve the metrics document
pub const METRICS_PATHS: [&str; 2] = ["/", "/metrics"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    /// Any other token, kept verbatim
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Other(token) => token,
        }
    }
}

impl From<&str> for Method {
    fn from(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound request, reduced to what routing needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Decoded path without the query string
    pub path: String,
    /// Decoded query arguments in the order they appeared
    pub args: Vec<(String, String)>,
}

impl Request {
    /// Request for a still percent-encoded `path`.
    ///
    /// Decoding never fails: invalid escapes are kept literally and invalid
    /// UTF-8 is replaced.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: percent_decode_str(path).decode_utf8_lossy().into_owned(),
            args: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    /// Append the arguments of a raw `application/x-www-form-urlencoded`
    /// query string, leniently decoded like the path
    pub fn with_query(mut self, query: &str) -> Self {
        self.args.extend(
            form_urlencoded::parse(query.as_bytes())
                .map(|(name, value)| (name.into_owned(), value.into_owned())),
        );
        self
    }

    pub fn with_arg(mut self, name: &str, value: &str) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn ok_text(body: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_TEXT,
            body,
        }
    }

    /// Diagnostic page listing what was asked for
    pub fn not_found(request: &Request) -> Self {
        let mut body = String::from("File Not Found\n\n");
        // Writing into a String cannot fail
        let _ = write!(
            body,
            "URI: {}\nMethod: {}\nArguments: {}\n",
            request.path,
            request.method,
            request.args.len()
        );
        for (name, value) in &request.args {
            let _ = writeln!(body, " {name}: {value}");
        }

        Self {
            status: 404,
            content_type: CONTENT_TYPE_HTML,
            body,
        }
    }

    /// Returned by the binaries when the node did not answer
    pub fn unavailable() -> Self {
        Self {
            status: 503,
            content_type: CONTENT_TYPE_TEXT,
            body: String::from("Node unavailable\n"),
        }
    }
}

/// Route a request: metrics paths get the document produced by `metrics`,
/// everything else the 404 diagnostic.
///
/// Metrics paths answer any method, as the node always has.
pub fn route(request: &Request, metrics: impl FnOnce() -> String) -> Response {
    if METRICS_PATHS.contains(&request.path.as_str()) {
        Response::ok_text(metrics())
    } else {
        Response::not_found(request)
    }
}
