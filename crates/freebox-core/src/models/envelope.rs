use serde::Deserialize;

/// The `{success, result, error_code, msg}` wrapper around every response.
///
/// `result` is optional because failed calls (and some successful ones, e.g.
/// an empty LAN) omit it entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The vendor error code, treating an empty string as absent.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref().filter(|c| !c.is_empty())
    }

    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or_default()
    }
}
