use elements_dom::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The walk ran out of nodes before every value found its marker.
    #[error("bad template: {supplied} values supplied but only {consumed} markers found")]
    Arity { supplied: usize, consumed: usize },
    #[error(transparent)]
    Host(#[from] DomError),
}
