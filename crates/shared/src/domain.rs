use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id_newtype!(DomainId);

/// One entry of the finite domain catalog the engine can load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDescriptor {
    pub id: DomainId,
    pub label: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl DomainDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: DomainId(id.into()),
            label: label.into(),
            description: description.into(),
            examples: Vec::new(),
        }
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCatalog {
    domains: Vec<DomainDescriptor>,
}

impl DomainCatalog {
    pub fn new(domains: Vec<DomainDescriptor>) -> Result<Self, CatalogError> {
        for (idx, domain) in domains.iter().enumerate() {
            if domain.id.0.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if domains[..idx].iter().any(|other| other.id == domain.id) {
                return Err(CatalogError::DuplicateId(domain.id.0.clone()));
            }
        }
        Ok(Self { domains })
    }

    /// The knowledge domains served by the public engine deployment.
    pub fn builtin() -> Self {
        Self {
            domains: vec![
                DomainDescriptor::new("animals", "Animals", "Animal facts and relationships")
                    .with_examples(["animal(X).", "mammal(X).", "bird(X)."]),
                DomainDescriptor::new("history", "History", "Historical events and figures")
                    .with_examples(["event(X).", "person(X).", "year(Event, Year)."]),
                DomainDescriptor::new(
                    "geography",
                    "Geography",
                    "Geographical facts and locations",
                )
                .with_examples(["country(X).", "capital(Country, Capital).", "river(X)."]),
                DomainDescriptor::new(
                    "mineralwater",
                    "Mineral Water",
                    "Mineral water sources and properties",
                ),
                DomainDescriptor::new("balkan", "Central Balkan", "Balkan sources and properties"),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&DomainDescriptor> {
        self.domains.iter().find(|domain| domain.id.0 == id)
    }

    /// Resolves a caller-supplied id, rejecting blanks and ids outside the catalog.
    pub fn resolve(&self, id: &str) -> Result<&DomainDescriptor, CatalogError> {
        if id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }
        self.get(id)
            .ok_or_else(|| CatalogError::UnknownDomain(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainDescriptor> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Bullet list of the available domains, one `• label - description` line each.
    pub fn overview(&self) -> String {
        self.domains
            .iter()
            .map(|domain| format!("• {} - {}", domain.label, domain.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for DomainCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_resolves_known_ids() {
        let catalog = DomainCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        let animals = catalog.resolve("animals").expect("animals");
        assert_eq!(animals.label, "Animals");
        assert_eq!(animals.examples.len(), 3);
    }

    #[test]
    fn resolve_rejects_unknown_and_blank_ids() {
        let catalog = DomainCatalog::builtin();
        assert!(matches!(
            catalog.resolve("astronomy"),
            Err(CatalogError::UnknownDomain(id)) if id == "astronomy"
        ));
        assert!(matches!(catalog.resolve("  "), Err(CatalogError::EmptyId)));
        // Lookup is exact, not case-folded.
        assert!(catalog.resolve("Animals").is_err());
    }

    #[test]
    fn new_rejects_duplicate_ids() {
        let err = DomainCatalog::new(vec![
            DomainDescriptor::new("a", "A", "first"),
            DomainDescriptor::new("a", "A again", "second"),
        ])
        .expect_err("duplicate");
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn overview_lists_every_domain() {
        let catalog = DomainCatalog::new(vec![
            DomainDescriptor::new("animals", "Animals", "Animal facts"),
            DomainDescriptor::new("history", "History", "Events"),
        ])
        .expect("catalog");
        assert_eq!(
            catalog.overview(),
            "• Animals - Animal facts\n• History - Events"
        );
    }
}
