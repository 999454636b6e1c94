use thiserror::Error;

use pangolin_ast::Span;
use pangolin_ir::IrError;

/// Structural analysis failures. Imprecision is never an error: the
/// analysis gives up through `Unknown` expression types, `AlwaysExclusive`
/// effects, and `Unsat` constraints instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unbound identifier `{name}`")]
    UnboundIdentifier { name: String, span: Option<Span> },

    #[error("`{name}` is not bound to a value")]
    NotAValue { name: String, span: Option<Span> },

    #[error("`{name}` is not a component")]
    NotAComponent { name: String, span: Option<Span> },

    #[error("`{name}` appears in function position but is bound to `{found}`")]
    NotAFunction {
        name: String,
        found: String,
        span: Option<Span>,
    },

    #[error("unknown field `{name}`")]
    UnknownField { name: String, span: Option<Span> },

    #[error("fixpoint expressions are not supported in contract code")]
    FixpointUnsupported { span: Option<Span> },

    #[error(transparent)]
    Ir(#[from] IrError),
}

impl AnalysisError {
    /// The source span the failure points at, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            AnalysisError::UnboundIdentifier { span, .. }
            | AnalysisError::NotAValue { span, .. }
            | AnalysisError::NotAComponent { span, .. }
            | AnalysisError::NotAFunction { span, .. }
            | AnalysisError::UnknownField { span, .. }
            | AnalysisError::FixpointUnsupported { span } => *span,
            AnalysisError::Ir(_) => None,
        }
    }
}
