// GitHub access token, read once from the environment before any request.

use std::fmt;

use direct_commit_common::PublishError;

pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

const TOKEN_SETTINGS_URL: &str = "https://github.com/settings/tokens";

/// A non-empty personal access token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Build from the value of `GITHUB_TOKEN`, if any. Unset, empty and
    /// whitespace-only values are all treated as missing.
    ///
    /// Surrounding whitespace is stripped before the token is used.
    pub fn from_lookup(value: Option<String>) -> Result<Self, PublishError> {
        match value {
            Some(token) if !token.trim().is_empty() => Ok(Self(token.trim().to_string())),
            _ => Err(PublishError::MissingCredential),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Steps printed when the token is missing.
pub fn setup_guidance() -> Vec<String> {
    vec![
        format!("1. Open {TOKEN_SETTINGS_URL}"),
        "2. Click 'Generate new token (classic)'".to_string(),
        "3. Select the 'repo' scope".to_string(),
        "4. Copy the generated token".to_string(),
        format!("5. export {TOKEN_ENV_VAR}=your_token_here"),
    ]
}
