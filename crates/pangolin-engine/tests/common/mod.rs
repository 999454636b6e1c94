#![allow(dead_code)]

//! Shared AST fixture builders for the engine integration tests. The
//! front end is external to this repository, so tests assemble typed
//! modules directly.

use pangolin_ast::{
    BuiltinOp, Component, ComponentKind, ContractModule, Expr, ExprNode, Field, Ident, IntWidth,
    LibEntry, LibVar, Library, Literal, MatchStmtClause, MsgEntry, MsgPayload, Pattern, PrimType,
    SType, Span, Spanned, Stmt,
};

pub fn id(s: &str) -> Ident {
    Ident::unspanned(s)
}

pub fn e(expr: Expr) -> ExprNode {
    ExprNode::unspanned(expr)
}

pub fn sp(stmt: Stmt) -> Spanned<Stmt> {
    Spanned::new(stmt, Span::dummy())
}

// ---------------------------------------------------------------
// Types
// ---------------------------------------------------------------

pub fn uint128() -> SType {
    SType::Prim(PrimType::Uint128)
}

pub fn int32() -> SType {
    SType::Prim(PrimType::Int32)
}

pub fn bystr20() -> SType {
    SType::Prim(PrimType::ByStr20)
}

pub fn bool_ty() -> SType {
    SType::Adt("Bool".into(), vec![])
}

pub fn option_of(t: SType) -> SType {
    SType::Adt("Option".into(), vec![t])
}

pub fn map_of(k: SType, v: SType) -> SType {
    SType::Map(Box::new(k), Box::new(v))
}

// ---------------------------------------------------------------
// Expressions and statements
// ---------------------------------------------------------------

pub fn lit_i32(v: i128) -> Expr {
    Expr::Lit(Literal::int(IntWidth::W32, v))
}

pub fn lit_u128(v: u128) -> Expr {
    Expr::Lit(Literal::uint(IntWidth::W128, v))
}

pub fn var(s: &str) -> Expr {
    Expr::Var(id(s))
}

pub fn builtin(op: BuiltinOp, args: &[&str]) -> Expr {
    Expr::Builtin {
        op,
        args: args.iter().map(|a| id(a)).collect(),
    }
}

pub fn msg_entry_var(label: &str, ident: &str) -> MsgEntry {
    MsgEntry {
        label: label.into(),
        payload: MsgPayload::Var(id(ident)),
    }
}

pub fn msg_entry_lit(label: &str, lit: Literal) -> MsgEntry {
    MsgEntry {
        label: label.into(),
        payload: MsgPayload::Lit(lit),
    }
}

pub fn bind(lhs: &str, rhs: Expr) -> Spanned<Stmt> {
    sp(Stmt::Bind {
        lhs: id(lhs),
        rhs: e(rhs),
    })
}

pub fn load(lhs: &str, field: &str) -> Spanned<Stmt> {
    sp(Stmt::Load {
        lhs: id(lhs),
        field: id(field),
    })
}

pub fn store(field: &str, rhs: &str) -> Spanned<Stmt> {
    sp(Stmt::Store {
        field: id(field),
        rhs: id(rhs),
    })
}

pub fn map_get(lhs: &str, map: &str, keys: &[&str]) -> Spanned<Stmt> {
    sp(Stmt::MapGet {
        lhs: id(lhs),
        map: id(map),
        keys: keys.iter().map(|k| id(k)).collect(),
        fetch_value: true,
    })
}

pub fn map_update(map: &str, keys: &[&str], rhs: &str) -> Spanned<Stmt> {
    sp(Stmt::MapUpdate {
        map: id(map),
        keys: keys.iter().map(|k| id(k)).collect(),
        rhs: Some(id(rhs)),
    })
}

pub fn send(msgs: &str) -> Spanned<Stmt> {
    sp(Stmt::SendMsgs(id(msgs)))
}

pub fn accept() -> Spanned<Stmt> {
    sp(Stmt::AcceptPayment)
}

pub fn call_proc(name: &str, args: &[&str]) -> Spanned<Stmt> {
    sp(Stmt::CallProc {
        name: id(name),
        args: args.iter().map(|a| id(a)).collect(),
    })
}

pub fn some_clause(binder: &str, body: Vec<Spanned<Stmt>>) -> MatchStmtClause {
    MatchStmtClause {
        pattern: Pattern::Constructor {
            name: "Some".into(),
            args: vec![Pattern::Binder(id(binder))],
        },
        body,
    }
}

pub fn none_clause(body: Vec<Spanned<Stmt>>) -> MatchStmtClause {
    MatchStmtClause {
        pattern: Pattern::Constructor {
            name: "None".into(),
            args: vec![],
        },
        body,
    }
}

pub fn nullary_clause(ctor: &str, body: Vec<Spanned<Stmt>>) -> MatchStmtClause {
    MatchStmtClause {
        pattern: Pattern::Constructor {
            name: ctor.into(),
            args: vec![],
        },
        body,
    }
}

pub fn match_stmt(
    scrutinee: &str,
    scrutinee_ty: SType,
    clauses: Vec<MatchStmtClause>,
) -> Spanned<Stmt> {
    sp(Stmt::MatchStmt {
        scrutinee: id(scrutinee),
        scrutinee_ty,
        clauses,
    })
}

// ---------------------------------------------------------------
// Modules
// ---------------------------------------------------------------

pub fn scalar_field(name: &str, ty: SType) -> Field {
    Field {
        name: id(name),
        ty,
        init: e(lit_u128(0)),
    }
}

pub fn map_field(name: &str, key: SType, value: SType) -> Field {
    Field {
        name: id(name),
        ty: map_of(key.clone(), value.clone()),
        init: e(Expr::Constr {
            name: "Emp".into(),
            type_args: vec![key, value],
            args: vec![],
        }),
    }
}

pub fn transition(name: &str, params: Vec<(&str, SType)>, body: Vec<Spanned<Stmt>>) -> Component {
    component(name, ComponentKind::Transition, params, body)
}

pub fn procedure(name: &str, params: Vec<(&str, SType)>, body: Vec<Spanned<Stmt>>) -> Component {
    component(name, ComponentKind::Procedure, params, body)
}

fn component(
    name: &str,
    kind: ComponentKind,
    params: Vec<(&str, SType)>,
    body: Vec<Spanned<Stmt>>,
) -> Component {
    Component {
        name: id(name),
        kind,
        params: params.into_iter().map(|(n, t)| (id(n), t)).collect(),
        body,
    }
}

pub fn lib_var(name: &str, ty: SType, init: Expr) -> LibEntry {
    LibEntry::Var(LibVar {
        name: id(name),
        ty: Some(ty),
        init: e(init),
    })
}

pub fn module_with_library(
    name: &str,
    library: Option<Library>,
    fields: Vec<Field>,
    components: Vec<Component>,
) -> ContractModule {
    ContractModule {
        name: id(name),
        params: vec![],
        fields,
        library,
        elibs: vec![],
        components,
    }
}

pub fn module(name: &str, fields: Vec<Field>, components: Vec<Component>) -> ContractModule {
    module_with_library(name, None, fields, components)
}

pub fn library(name: &str, entries: Vec<LibEntry>) -> Library {
    Library {
        name: id(name),
        entries,
    }
}
