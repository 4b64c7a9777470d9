use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    /// The server rejected the current access token (HTTP 401). Absorbed by the
    /// refresh flow on first occurrence; callers only see it reclassified as
    /// `RefreshFailed` once retry is exhausted.
    AuthExpired(StatusCode, String),
    /// Terminal: the refresh call failed, or a freshly refreshed token was
    /// rejected again. Always accompanied by session teardown.
    RefreshFailed(String),
    /// Any other non-success HTTP response, passed through untouched.
    Api(StatusCode, String),
    Http(reqwest::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AuthExpired(status, body) => {
                write!(f, "access token rejected: {status} {body}")
            }
            Error::RefreshFailed(reason) => write!(f, "session refresh failed: {reason}"),
            Error::Api(status, body) => write!(f, "request failed: {status} {body}"),
            Error::Http(err) => write!(f, "http transport error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
