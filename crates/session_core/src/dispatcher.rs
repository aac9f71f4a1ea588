//! Classification of raw command strings and the locally synthesized replies.

use shared::{
    domain::{DomainCatalog, DomainDescriptor},
    protocol::{FileCommand, SystemCommand},
};

use crate::messages::Messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Empty,
    Clear,
    Examples,
    General,
}

/// First match wins; comparison is case-sensitive on the trimmed input.
pub fn classify(raw: &str) -> CommandKind {
    match raw.trim() {
        "" => CommandKind::Empty,
        "clear" | "clear." => CommandKind::Clear,
        "examples." => CommandKind::Examples,
        _ => CommandKind::General,
    }
}

pub(crate) fn examples_text(
    messages: &Messages,
    catalog: &DomainCatalog,
    active: Option<&DomainDescriptor>,
) -> String {
    let mut lines = vec![messages.example_queries.clone(), String::new()];

    let domain_line =
        |domain: &DomainDescriptor| format!("• {}: {}", domain.label, domain.examples.join(" "));
    match active {
        Some(domain) if !domain.examples.is_empty() => lines.push(domain_line(domain)),
        Some(_) => {}
        None => lines.extend(
            catalog
                .iter()
                .filter(|domain| !domain.examples.is_empty())
                .map(domain_line),
        ),
    }

    let system = [
        SystemCommand::Help,
        SystemCommand::ListFiles,
        SystemCommand::LoadAll,
        SystemCommand::ClearAllFacts,
    ]
    .iter()
    .map(|cmd| format!("{}.", cmd.query()))
    .collect::<Vec<_>>()
    .join(" ");
    lines.push(format!("• {}: {system}", messages.system_commands));

    let files = [FileCommand::Consult, FileCommand::Reconsult]
        .iter()
        .filter_map(|cmd| cmd.render("filename"))
        .map(|query| format!("{query}."))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!("• {}: {files}", messages.file_commands));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_local_commands_on_trimmed_input() {
        assert_eq!(classify("clear"), CommandKind::Clear);
        assert_eq!(classify("  clear.  "), CommandKind::Clear);
        assert_eq!(classify("examples."), CommandKind::Examples);
        assert_eq!(classify("   "), CommandKind::Empty);
        assert_eq!(classify(""), CommandKind::Empty);
    }

    #[test]
    fn classification_is_case_sensitive_and_exact() {
        assert_eq!(classify("Clear"), CommandKind::General);
        assert_eq!(classify("examples"), CommandKind::General);
        assert_eq!(classify("clear_all_facts."), CommandKind::General);
        assert_eq!(classify("parent(tom, bob)."), CommandKind::General);
    }

    #[test]
    fn examples_for_active_domain_list_only_that_domain() {
        let catalog = DomainCatalog::builtin();
        let animals = catalog.get("animals");
        let text = examples_text(&Messages::default(), &catalog, animals);

        assert!(text.starts_with("📚 Example Queries:"));
        assert!(text.contains("• Animals: animal(X). mammal(X). bird(X)."));
        assert!(!text.contains("History"));
        assert!(text.contains("help. list_files. load_all. clear_all_facts."));
        assert!(text.contains("consult_file('filename'). reconsult_file('filename')."));
    }

    #[test]
    fn examples_without_active_domain_cover_catalog() {
        let catalog = DomainCatalog::builtin();
        let text = examples_text(&Messages::default(), &catalog, None);
        assert!(text.contains("• Animals:"));
        assert!(text.contains("• History:"));
        assert!(text.contains("• Geography:"));
        assert!(!text.contains("Mineral Water"));
    }
}
