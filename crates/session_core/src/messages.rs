//! Display strings supplied by the localization layer. The controller only
//! formats them; it never branches on their content.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub thinking: String,
    pub loading_domain: String,
    pub domain_loaded: String,
    pub domain_load_error: String,
    pub connection_error: String,
    pub no_response: String,
    pub example_queries: String,
    pub system_commands: String,
    pub file_commands: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            thinking: "Thinking".into(),
            loading_domain: "Loading domain".into(),
            domain_loaded: "Domain loaded successfully. Ready for queries.".into(),
            domain_load_error: "Error loading domain".into(),
            connection_error: "❌ Connection error".into(),
            no_response: "No response from server".into(),
            example_queries: "📚 Example Queries:".into(),
            system_commands: "System commands".into(),
            file_commands: "File commands".into(),
        }
    }
}

impl Messages {
    pub fn loading(&self, domain: impl Display) -> String {
        format!("{} {domain}...", self.loading_domain)
    }

    pub fn loaded(&self, domain: impl Display) -> String {
        format!("✅ {domain}: {}", self.domain_loaded)
    }

    pub fn load_failed(&self, domain: impl Display, reason: impl Display) -> String {
        format!("❌ {} {domain}: {reason}", self.domain_load_error)
    }

    pub fn connection_failed(&self, reason: impl Display) -> String {
        format!("{}: {reason}", self.connection_error)
    }

    pub fn thinking_frame(&self, dots: usize) -> String {
        format!("{}{}", self.thinking, ".".repeat(dots))
    }
}
