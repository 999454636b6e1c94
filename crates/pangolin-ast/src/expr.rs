use std::fmt;

use crate::literal::Literal;
use crate::span::{Ident, Span};
use crate::types::SType;

/// A builtin operator.
///
/// The analysis interprets only `Add` specially (through the PCM registry);
/// every other builtin is an uninterpreted operator lifted over its
/// arguments' contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Eq,
    Concat,
    Substr,
    Strlen,
    ToUint,
    Sha256,
}

impl fmt::Display for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuiltinOp::Add => "add",
            BuiltinOp::Sub => "sub",
            BuiltinOp::Mul => "mul",
            BuiltinOp::Div => "div",
            BuiltinOp::Rem => "rem",
            BuiltinOp::Lt => "lt",
            BuiltinOp::Eq => "eq",
            BuiltinOp::Concat => "concat",
            BuiltinOp::Substr => "substr",
            BuiltinOp::Strlen => "strlen",
            BuiltinOp::ToUint => "to_uint",
            BuiltinOp::Sha256 => "sha256hash",
        };
        write!(f, "{s}")
    }
}

/// A spanned expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub expr: Expr,
    pub span: Span,
}

impl ExprNode {
    pub fn new(expr: Expr, span: Span) -> Self {
        Self { expr, span }
    }

    pub fn unspanned(expr: Expr) -> Self {
        Self::new(expr, Span::dummy())
    }
}

/// An expression in administrative normal form: applications, builtin
/// calls, constructor arguments, message payloads, and match scrutinees
/// are identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Literal),
    Var(Ident),
    Let {
        lhs: Ident,
        ty: Option<SType>,
        rhs: Box<ExprNode>,
        body: Box<ExprNode>,
    },
    /// A message or event value: named payload entries.
    Message(Vec<MsgEntry>),
    /// A single-parameter lambda; curried functions nest.
    Fun {
        param: Ident,
        param_ty: SType,
        body: Box<ExprNode>,
    },
    App {
        func: Ident,
        args: Vec<Ident>,
    },
    Constr {
        name: String,
        type_args: Vec<SType>,
        args: Vec<Ident>,
    },
    MatchExpr {
        scrutinee: Ident,
        scrutinee_ty: SType,
        clauses: Vec<(Pattern, ExprNode)>,
    },
    Builtin {
        op: BuiltinOp,
        args: Vec<Ident>,
    },
    /// Type abstraction; transparent to the analysis.
    TFun {
        tvar: String,
        body: Box<ExprNode>,
    },
    /// Type application; transparent to the analysis.
    TApp {
        func: Ident,
        type_args: Vec<SType>,
    },
    /// Recursion primitive. Only the host-provided fold built-ins use it;
    /// in user code it is a fatal analysis error.
    Fixpoint {
        name: Ident,
        ty: SType,
        body: Box<ExprNode>,
    },
}

/// One named entry of a message payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgEntry {
    pub label: String,
    pub payload: MsgPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MsgPayload {
    Lit(Literal),
    Var(Ident),
}

/// A match pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Wildcard,
    Binder(Ident),
    Constructor { name: String, args: Vec<Pattern> },
}

impl Pattern {
    /// All identifiers bound by this pattern, left to right.
    pub fn binders(&self) -> Vec<&Ident> {
        match self {
            Pattern::Wildcard => Vec::new(),
            Pattern::Binder(id) => vec![id],
            Pattern::Constructor { args, .. } => args.iter().flat_map(Pattern::binders).collect(),
        }
    }

    /// True if this is `Constructor(name)` with a single binder argument,
    /// returning the binder.
    pub fn single_binder_of(&self, ctor: &str) -> Option<&Ident> {
        match self {
            Pattern::Constructor { name, args } if name == ctor && args.len() == 1 => {
                match &args[0] {
                    Pattern::Binder(id) => Some(id),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// True if this is the nullary constructor `name`.
    pub fn is_nullary(&self, ctor: &str) -> bool {
        matches!(self, Pattern::Constructor { name, args } if name == ctor && args.is_empty())
    }
}
