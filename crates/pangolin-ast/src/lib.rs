#![doc = include_str!("../README.md")]

pub mod expr;
pub mod literal;
pub mod module;
pub mod span;
pub mod stmt;
pub mod types;

pub use expr::{BuiltinOp, Expr, ExprNode, MsgEntry, MsgPayload, Pattern};
pub use literal::{IntWidth, Literal};
pub use module::{
    Component, ComponentKind, ContractModule, CtorDef, Field, LibEntry, LibTree, LibTyp, LibVar,
    Library,
};
pub use span::{Ident, Span, Spanned};
pub use stmt::{MatchStmtClause, Stmt};
pub use types::{PrimType, SType};
