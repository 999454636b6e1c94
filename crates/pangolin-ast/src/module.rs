use std::fmt;

use crate::expr::ExprNode;
use crate::span::{Ident, Spanned};
use crate::stmt::Stmt;
use crate::types::SType;

/// A library-level value definition.
#[derive(Debug, Clone, PartialEq)]
pub struct LibVar {
    pub name: Ident,
    pub ty: Option<SType>,
    pub init: ExprNode,
}

/// A library-level type definition. Opaque to the analysis; constructor
/// signatures are carried so hosts can round-trip modules.
#[derive(Debug, Clone, PartialEq)]
pub struct LibTyp {
    pub name: Ident,
    pub constructors: Vec<CtorDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtorDef {
    pub name: String,
    pub arg_types: Vec<SType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LibEntry {
    Var(LibVar),
    Typ(LibTyp),
}

/// A library block: an ordered list of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    pub name: Ident,
    pub entries: Vec<LibEntry>,
}

/// External libraries arranged as a dependency tree; dependencies are
/// processed before the libraries that import them.
#[derive(Debug, Clone, PartialEq)]
pub struct LibTree {
    pub lib: Library,
    pub deps: Vec<LibTree>,
}

/// A mutable contract field declaration. For map-typed fields the
/// analyzer derives the map depth from the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Ident,
    pub ty: SType,
    pub init: ExprNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Transition,
    Procedure,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Transition => write!(f, "transition"),
            ComponentKind::Procedure => write!(f, "procedure"),
        }
    }
}

/// A transition or procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: Ident,
    pub kind: ComponentKind,
    pub params: Vec<(Ident, SType)>,
    pub body: Vec<Spanned<Stmt>>,
}

/// A type-checked contract module: the input to the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractModule {
    pub name: Ident,
    /// Immutable contract-construction parameters.
    pub params: Vec<(Ident, SType)>,
    pub fields: Vec<Field>,
    pub library: Option<Library>,
    pub elibs: Vec<LibTree>,
    pub components: Vec<Component>,
}
