use http::{HeaderValue, Method, header, request::Parts};

/// The parts of an incoming request that rule evaluation looks at.
///
/// Built once per request; the path is percent-decoded so patterns are written
/// against readable paths.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    raw_query: Option<String>,
    query: Vec<(String, String)>,
    authorization: Option<HeaderValue>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            raw_query: None,
            query: Vec::new(),
            authorization: None,
        }
    }

    /// Attach a raw (still encoded) query string.
    pub fn with_query(mut self, raw_query: &str) -> Self {
        self.query = url::form_urlencoded::parse(raw_query.as_bytes())
            .into_owned()
            .collect();
        self.raw_query = Some(raw_query.to_string());
        self
    }

    pub fn with_authorization(mut self, value: HeaderValue) -> Self {
        self.authorization = Some(value);
        self
    }

    /// Build the context from the head of an HTTP request.
    pub fn from_parts(parts: &Parts) -> Self {
        let raw_path = parts.uri.path();
        let path = match urlencoding::decode(raw_path) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => {
                tracing::debug!("Request path {} is not valid UTF-8 once decoded", raw_path);
                raw_path.to_string()
            }
        };

        let mut context = Self::new(parts.method.clone(), path);
        if let Some(query) = parts.uri.query() {
            context = context.with_query(query);
        }
        if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
            context = context.with_authorization(value.clone());
        }
        context
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    /// First value of a query parameter; empty values count as absent.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.authorization.as_ref()
    }
}
