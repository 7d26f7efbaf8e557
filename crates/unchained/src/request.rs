//! Per-request state shared by authentication, permissions and views.

use std::{fmt, sync::Arc};

use axum::http::{header, request::Parts, HeaderMap, Method, Uri};

/// An account that can be attached to a request.
pub trait User: fmt::Debug + Send + Sync {
    fn id(&self) -> u64;

    fn username(&self) -> &str;

    fn verify_password(&self, password: &str) -> bool;

    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_admin(&self) -> bool {
        false
    }
}

/// Methods that never modify state.
pub const SAFE_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];

#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    user: Option<Arc<dyn User>>,
}

impl RequestContext {
    pub const fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            params: Vec::new(),
            user: None,
        }
    }

    /// Attach captured path parameters, in route order.
    #[must_use]
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A captured path parameter, e.g. `id` for `/accounts/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// A header value, if present and visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The value of cookie `name` from the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"'))
    }

    pub fn is_safe_method(&self) -> bool {
        SAFE_METHODS.contains(&self.method)
    }

    pub fn user(&self) -> Option<&Arc<dyn User>> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Arc<dyn User>) {
        self.user = Some(user);
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_authenticated())
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[derive(Debug)]
    struct Staff;

    impl User for Staff {
        fn id(&self) -> u64 {
            1
        }

        fn username(&self) -> &str {
            "staff"
        }

        fn verify_password(&self, _password: &str) -> bool {
            true
        }

        fn is_admin(&self) -> bool {
            true
        }
    }

    fn request(method: Method, headers: HeaderMap) -> RequestContext {
        RequestContext::new(method, Uri::from_static("/"), headers)
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=\"abc123\""),
        );
        let req = request(Method::GET, headers);
        assert_eq!(req.cookie("sessionid"), Some("abc123"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn test_path_params() {
        let req = request(Method::GET, HeaderMap::new()).with_params([("id", "7")]);
        assert_eq!(req.param("id"), Some("7"));
        assert_eq!(req.param("slug"), None);
    }

    #[test]
    fn test_safe_methods() {
        assert!(request(Method::HEAD, HeaderMap::new()).is_safe_method());
        assert!(!request(Method::POST, HeaderMap::new()).is_safe_method());
    }

    #[test]
    fn test_user_flags() {
        let mut req = request(Method::GET, HeaderMap::new());
        assert!(!req.is_authenticated());
        req.set_user(Arc::new(Staff));
        assert!(req.is_authenticated());
        assert!(req.is_admin());
        assert_eq!(req.user().map(|u| u.username()), Some("staff"));
    }
}
