use thiserror::Error;

/// Errors raised by host tree and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("\"{0}\" is not a valid custom element name")]
    InvalidName(String),
    #[error("the name \"{0}\" has already been used with this registry")]
    AlreadyDefined(String),
    #[error("the new child contains the parent or cannot be inserted here")]
    HierarchyRequest,
    #[error("the reference node is not a child of this node")]
    NotFound,
    #[error("<{0}> already hosts a shadow root")]
    ShadowRootExists(String),
}
