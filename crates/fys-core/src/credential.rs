use serde::{Deserialize, Serialize};

/// Opaque bearer credential issued by the directory's login endpoint.
///
/// All-`None` means "not authenticated".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl Credential {
    /// The access token, if one is present and non-empty. Expiry is not
    /// checked here; the server is the authority on that.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.bearer_token().is_some()
    }
}

/// Link from a transport adapter back to whoever owns the session.
///
/// The HTTP client asks it for the current bearer token before each request
/// and reports authorization failures through [`AuthHook::on_unauthorized`].
pub trait AuthHook: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    fn on_unauthorized(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_not_present() {
        let c = Credential {
            access_token: Some(String::new()),
            ..Credential::default()
        };
        assert!(!c.is_present());
        assert!(!Credential::default().is_present());
    }

    #[test]
    fn deserializes_login_payload_with_nulls() {
        let c: Credential = serde_json::from_str(
            r#"{"access_token": "abc", "expires_at": null, "token_type": "bearer"}"#,
        )
        .unwrap();
        assert_eq!(c.bearer_token(), Some("abc"));
        assert!(c.expires_at.is_none());
        assert_eq!(c.token_type.as_deref(), Some("bearer"));
    }
}
