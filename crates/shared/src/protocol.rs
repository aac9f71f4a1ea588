use serde::{Deserialize, Serialize};

use crate::domain::DomainId;

/// Body of `POST /prolog/select-domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectDomainRequest {
    pub domain: DomainId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectDomainResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SelectDomainResponse {
    pub fn message_text(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }
}

/// Body of `POST /prolog/command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    /// First usable field in `output`, `error`, `message` order. Empty strings are skipped.
    pub fn resolve_text(&self) -> Option<&str> {
        non_empty(self.output.as_deref())
            .or_else(|| non_empty(self.error.as_deref()))
            .or_else(|| non_empty(self.message.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// Built-in engine commands exposed as shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCommand {
    Help,
    LoadAll,
    ListFiles,
    ClearAllFacts,
    CurrentFile,
    ListPredicates,
    UnloadAll,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 7] = [
        SystemCommand::Help,
        SystemCommand::LoadAll,
        SystemCommand::ListFiles,
        SystemCommand::ClearAllFacts,
        SystemCommand::CurrentFile,
        SystemCommand::ListPredicates,
        SystemCommand::UnloadAll,
    ];

    pub fn query(self) -> &'static str {
        match self {
            SystemCommand::Help => "help",
            SystemCommand::LoadAll => "load_all",
            SystemCommand::ListFiles => "list_files",
            SystemCommand::ClearAllFacts => "clear_all_facts",
            SystemCommand::CurrentFile => "current_file",
            SystemCommand::ListPredicates => "list_predicates",
            SystemCommand::UnloadAll => "unload_all",
        }
    }

    pub fn tooltip(self) -> &'static str {
        match self {
            SystemCommand::Help => "Show help information",
            SystemCommand::LoadAll => "Load all Prolog files",
            SystemCommand::ListFiles => "List all loaded files",
            SystemCommand::ClearAllFacts => "Clear all loaded facts",
            SystemCommand::CurrentFile => "Show current active file",
            SystemCommand::ListPredicates => "List all available predicates",
            SystemCommand::UnloadAll => "Unload all Prolog files",
        }
    }

    pub fn from_query(query: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.query() == query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCommand {
    Consult,
    Reconsult,
}

impl FileCommand {
    pub fn predicate(self) -> &'static str {
        match self {
            FileCommand::Consult => "consult_file",
            FileCommand::Reconsult => "reconsult_file",
        }
    }

    /// Builds the engine query for `file_name`, or `None` when the name is blank.
    pub fn render(self, file_name: &str) -> Option<String> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return None;
        }
        Some(format!("{}('{}')", self.predicate(), file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_response_prefers_output_then_error_then_message() {
        let body: CommandResponse =
            serde_json::from_str(r#"{"output":"true.","error":"boom","message":"m"}"#)
                .expect("parse");
        assert_eq!(body.resolve_text(), Some("true."));

        let body: CommandResponse =
            serde_json::from_str(r#"{"error":"syntax error","message":"m"}"#).expect("parse");
        assert_eq!(body.resolve_text(), Some("syntax error"));

        let body: CommandResponse = serde_json::from_str(r#"{"message":"m"}"#).expect("parse");
        assert_eq!(body.resolve_text(), Some("m"));

        let body: CommandResponse = serde_json::from_str("{}").expect("parse");
        assert_eq!(body.resolve_text(), None);
    }

    #[test]
    fn empty_fields_fall_through() {
        let body = CommandResponse {
            output: Some(String::new()),
            error: None,
            message: Some("loaded".into()),
        };
        assert_eq!(body.resolve_text(), Some("loaded"));

        let select = SelectDomainResponse {
            message: Some(String::new()),
        };
        assert_eq!(select.message_text(), None);
    }

    #[test]
    fn select_domain_request_serializes_plain_string() {
        let body = serde_json::to_value(SelectDomainRequest {
            domain: DomainId::from("animals"),
        })
        .expect("serialize");
        assert_eq!(body, serde_json::json!({ "domain": "animals" }));
    }

    #[test]
    fn system_command_queries_round_trip_through_lookup() {
        for cmd in SystemCommand::ALL {
            assert_eq!(SystemCommand::from_query(cmd.query()), Some(cmd));
        }
        assert_eq!(SystemCommand::from_query("help."), None);
    }

    #[test]
    fn file_command_quotes_trimmed_name() {
        assert_eq!(
            FileCommand::Consult.render("  family.pl "),
            Some("consult_file('family.pl')".to_string())
        );
        assert_eq!(
            FileCommand::Reconsult.render("a.pl"),
            Some("reconsult_file('a.pl')".to_string())
        );
        assert_eq!(FileCommand::Consult.render("   "), None);
    }
}
