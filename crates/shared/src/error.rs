use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("domain id must not be empty")]
    EmptyId,
    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    #[error("duplicate domain id in catalog: {0}")]
    DuplicateId(String),
}
