use std::fmt;

/// An authenticated browser session.
///
/// The access token is the end user's credential and is only ever sent to the
/// identity platform on calls that read the user's own data. Its expiry is
/// judged by the identity platform, which rejects the token once it lapses.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// A session is active while it carries a token
    pub fn is_active(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_activity() {
        assert!(Session::new("token").is_active());
        assert!(!Session::new("").is_active());
        assert!(!Session::new("  ").is_active());
    }

    #[test]
    fn test_debug_redacts_token() {
        let output = format!("{:?}", Session::new("secret-token"));
        assert!(!output.contains("secret-token"));
    }
}
