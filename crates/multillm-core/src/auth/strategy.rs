use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;

use crate::error::LlmError;

/// Attaches credentials to an outgoing request's headers
///
/// Every strategy replaces any value already present under its header name.
pub trait AuthStrategy: Send + Sync {
    fn apply(&self, headers: &mut HeaderMap);
}

/// Leaves headers untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthStrategy for NoAuth {
    fn apply(&self, _headers: &mut HeaderMap) {}
}

/// Static API key sent in a single header
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    name: HeaderName,
    value: HeaderValue,
}

impl ApiKeyAuth {
    /// Header used when none is given
    pub const DEFAULT_HEADER: &'static str = "X-Api-Key";

    pub fn new(api_key: &str) -> Result<Self, LlmError> {
        Self::with_header(api_key, Self::DEFAULT_HEADER)
    }

    pub fn with_header(api_key: &str, header_name: &str) -> Result<Self, LlmError> {
        Ok(Self {
            name: header_name_from(header_name)?,
            value: secret_value(api_key, "API key")?,
        })
    }
}

impl AuthStrategy for ApiKeyAuth {
    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(self.name.clone(), self.value.clone());
    }
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct BearerAuth {
    value: HeaderValue,
}

impl BearerAuth {
    pub fn new(token: &str) -> Result<Self, LlmError> {
        if token.trim().is_empty() {
            return Err(LlmError::Configuration("bearer token must not be blank".to_owned()));
        }

        Ok(Self {
            value: secret_value(&format!("Bearer {token}"), "bearer token")?,
        })
    }
}

impl AuthStrategy for BearerAuth {
    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(AUTHORIZATION, self.value.clone());
    }
}

/// Arbitrary set of headers, matched case-insensitively
#[derive(Debug, Clone)]
pub struct CustomHeadersAuth {
    headers: IndexMap<HeaderName, HeaderValue>,
}

impl CustomHeadersAuth {
    pub fn new<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, LlmError> {
        let mut normalized = IndexMap::new();

        for (name, value) in headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| LlmError::Configuration(format!("invalid value for header '{name}': {e}")))?;
            // Later entries win over earlier ones differing only by case
            normalized.insert(header_name_from(name)?, value);
        }

        if normalized.is_empty() {
            return Err(LlmError::Configuration(
                "custom headers must contain at least one entry".to_owned(),
            ));
        }

        Ok(Self { headers: normalized })
    }
}

impl AuthStrategy for CustomHeadersAuth {
    fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn header_name_from(name: &str) -> Result<HeaderName, LlmError> {
    if name.trim().is_empty() {
        return Err(LlmError::Configuration("header name must not be blank".to_owned()));
    }

    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| LlmError::Configuration(format!("invalid header name '{name}': {e}")))
}

fn secret_value(value: &str, what: &str) -> Result<HeaderValue, LlmError> {
    if value.trim().is_empty() {
        return Err(LlmError::Configuration(format!("{what} must not be blank")));
    }

    let mut header =
        HeaderValue::from_str(value).map_err(|_| LlmError::Configuration(format!("{what} is not a valid header value")))?;
    header.set_sensitive(true);
    Ok(header)
}
