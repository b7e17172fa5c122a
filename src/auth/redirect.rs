//! Redirect-URI construction and parsing of the authorization redirect.

use std::fmt;

use url::Url;

use super::error::AuthError;

/// Path the web and loopback redirect targets return to.
pub const CALLBACK_PATH: &str = "/auth/callback";
pub const DEFAULT_APP_SCHEME: &str = "akademi-crypto";
pub const DEFAULT_LOOPBACK_PORT: u16 = 53682;

/// Where the authorization server sends the user back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Native-app deep link, `scheme://` or `scheme://path`.
    AppScheme { scheme: String, path: Option<String> },
    /// Web origin; the callback lives at `{origin}/auth/callback`.
    Web { origin: String },
    /// Local listener for command-line logins.
    Loopback { port: u16, path: String },
}

impl RedirectTarget {
    pub fn app(scheme: impl Into<String>) -> Self {
        Self::AppScheme {
            scheme: scheme.into(),
            path: None,
        }
    }

    pub fn web(origin: impl Into<String>) -> Self {
        Self::Web {
            origin: origin.into(),
        }
    }

    pub fn loopback(port: u16) -> Self {
        Self::Loopback {
            port,
            path: CALLBACK_PATH.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            Self::AppScheme { scheme, path } => match path.as_deref() {
                Some(path) => format!("{scheme}://{}", path.trim_start_matches('/')),
                None => format!("{scheme}://"),
            },
            Self::Web { origin } => format!("{}{CALLBACK_PATH}", origin.trim_end_matches('/')),
            Self::Loopback { port, path } => {
                let path = if path.starts_with('/') {
                    path.clone()
                } else {
                    format!("/{path}")
                };
                format!("http://127.0.0.1:{port}{path}")
            }
        }
    }
}

impl Default for RedirectTarget {
    fn default() -> Self {
        Self::loopback(DEFAULT_LOOPBACK_PORT)
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Query parameters carried by the authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a redirect URL, a bare query string, or a pasted `code[#state]`.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::default();
        }
        if input.contains("://") {
            if let Ok(url) = Url::parse(input) {
                let mut params = Self::from_pairs(url.query_pairs());
                if params.is_empty() {
                    if let Some(fragment) = url.fragment() {
                        params = Self::from_pairs(url::form_urlencoded::parse(fragment.as_bytes()));
                    }
                }
                return params;
            }
        }
        if let Some(query) = input.strip_prefix('?') {
            return Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()));
        }
        if input.contains('=') {
            return Self::from_pairs(url::form_urlencoded::parse(input.as_bytes()));
        }
        match input.split_once('#') {
            Some((code, state)) => Self {
                code: Some(code.to_string()),
                state: Some(state.to_string()),
                ..Self::default()
            },
            None => Self {
                code: Some(input.to_string()),
                ..Self::default()
            },
        }
    }

    /// Validate the redirect and return the authorization code.
    ///
    /// An `error` parameter always wins. The state is only compared when both
    /// sides have one, because backend-issued authorize URLs keep their state
    /// server-side.
    pub fn into_code(self, expected_state: Option<&str>) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Provider {
                error,
                description: self.error_description,
            });
        }
        if let (Some(expected), Some(received)) = (expected_state, self.state.as_deref()) {
            if expected != received {
                return Err(AuthError::StateMismatch {
                    expected: expected.to_string(),
                    received: received.to_string(),
                });
            }
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)
    }

    fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }

    fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }
}

/// First characters of an authorization code, safe to log.
pub(crate) fn code_preview(code: &str) -> String {
    let end = code
        .char_indices()
        .nth(10)
        .map(|(idx, _)| idx)
        .unwrap_or(code.len());
    format!("{}...", &code[..end])
}
