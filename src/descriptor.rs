use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::errors::Error;

/// Immutable description of one pending HTTP call.
///
/// The two flags make the refresh state machine's transition table total: a
/// descriptor knows whether it is the dedicated refresh call and whether it has
/// already been retried once, so the retry-once rule is carried by the value
/// itself rather than by bookkeeping elsewhere.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: HeaderMap,
    is_refresh: bool,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            is_refresh: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attaches a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The dedicated refresh call. Never retried, never re-enters the refresh
    /// flow.
    pub(crate) fn refresh(path: impl Into<String>) -> Self {
        let mut descriptor = Self::new(Method::POST, path);
        descriptor.is_refresh = true;
        descriptor
    }

    /// Consumes the descriptor, marking its one retry as spent.
    pub(crate) fn into_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_refresh(&self) -> bool {
        self.is_refresh
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_descriptor_carries_neither_flag() {
        let descriptor = RequestDescriptor::get("/api/me");
        assert!(!descriptor.is_refresh());
        assert!(!descriptor.is_retried());
        assert_eq!(descriptor.method(), &Method::GET);
        assert_eq!(descriptor.path(), "/api/me");
    }

    #[test]
    fn into_retried_spends_the_single_retry() {
        let descriptor = RequestDescriptor::get("/api/me").into_retried();
        assert!(descriptor.is_retried());
    }

    #[test]
    fn refresh_descriptor_is_marked_and_unretried() {
        let descriptor = RequestDescriptor::refresh("/api/refresh");
        assert!(descriptor.is_refresh());
        assert!(!descriptor.is_retried());
        assert_eq!(descriptor.method(), &Method::POST);
    }

    #[test]
    fn json_body_is_serialized_once() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
        }
        let descriptor = RequestDescriptor::post("/api/login")
            .json(&Payload { name: "kit" })
            .unwrap();
        assert_eq!(descriptor.body().unwrap()["name"], "kit");
    }
}
