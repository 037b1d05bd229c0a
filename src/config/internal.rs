use std::env;

/// Shared secret for the collaborator-facing `/internal` routes.
/// Without it those routes are not mounted.
#[derive(Debug, Clone, Default)]
pub struct InternalApiConfig {
    pub token: Option<String>,
}

impl InternalApiConfig {
    pub fn from_env() -> Self {
        let token = env::var("INTERNAL_API_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { token }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }
}
