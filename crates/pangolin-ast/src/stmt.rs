use crate::expr::{ExprNode, Pattern};
use crate::span::{Ident, Spanned};
use crate::types::SType;

/// A component-body statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `x <- f`: load a whole field.
    Load { lhs: Ident, field: Ident },
    /// `f := x`: store a whole field.
    Store { field: Ident, rhs: Ident },
    /// `x = e`: bind a pure expression.
    Bind { lhs: Ident, rhs: ExprNode },
    /// `x <- m[k1]...[kn]`: in-place map read. `fetch_value` distinguishes
    /// a value fetch (`Option` result) from an existence probe (`Bool`).
    MapGet {
        lhs: Ident,
        map: Ident,
        keys: Vec<Ident>,
        fetch_value: bool,
    },
    /// `m[k1]...[kn] := x`: in-place map write; `rhs: None` deletes the key.
    MapUpdate {
        map: Ident,
        keys: Vec<Ident>,
        rhs: Option<Ident>,
    },
    MatchStmt {
        scrutinee: Ident,
        scrutinee_ty: SType,
        clauses: Vec<MatchStmtClause>,
    },
    /// `x <- & QUERY`: read blockchain state (block number etc.).
    ReadFromBC { lhs: Ident, query: String },
    AcceptPayment,
    SendMsgs(Ident),
    CreateEvnt(Ident),
    CallProc { name: Ident, args: Vec<Ident> },
    /// `forall l p`: apply procedure `p` to every element of list `l`.
    Iterate { list: Ident, proc: Ident },
    Throw(Option<Ident>),
}

/// One clause of a statement-level match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStmtClause {
    pub pattern: Pattern,
    pub body: Vec<Spanned<Stmt>>,
}
