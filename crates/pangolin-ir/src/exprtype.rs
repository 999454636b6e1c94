use std::fmt;

use crate::contribution::{
    ContribOp, ContribSource, ContribSummary, Contributions, KnownContrib, Precision, Pseudofield,
};

/// Definition carried by a function descriptor: an inlined body, or an
/// opaque marker when the function value is itself a parameter of some
/// outer lambda or of the enclosing component.
#[derive(Debug, Clone, PartialEq)]
pub enum FunDef {
    Expr(Box<ExprType>),
    FormalParam(usize),
    ProcParam(usize),
}

/// A first-class function value: the de Bruijn levels of its parameters
/// (a singleton for known lambdas; curried functions nest) and its
/// definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDesc {
    pub levels: Vec<usize>,
    pub def: FunDef,
}

impl FunDesc {
    pub fn new(levels: Vec<usize>, def: FunDef) -> Self {
        Self { levels, def }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.def, FunDef::FormalParam(_) | FunDef::ProcParam(_))
    }
}

/// The symbolic type of an expression: which sources flow into its value
/// and how, or a pending composition thereof.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprType {
    /// Top of the lattice: the analysis gave up.
    Unknown,
    /// A primitive or data value.
    Val(KnownContrib),
    /// Two parallel views of the same value. Message values carry the full
    /// payload analysis alongside a restricted analysis of the reserved
    /// `_recipient`/`_amount` slots.
    CompositeVal(Box<ExprType>, Box<ExprType>),
    /// A pending lifting of an operator over an inner expression type.
    Op(ContribOp, Box<ExprType>),
    /// A pending sequential composition.
    ComposeSequence(Vec<ExprType>),
    /// A pending branching composition: a condition and one expression
    /// type per clause.
    ComposeParallel(Box<ExprType>, Vec<ExprType>),
    /// A first-class function value.
    Fun(FunDesc),
    /// A pending application.
    App(FunDesc, Vec<ExprType>),
}

impl ExprType {
    /// The designated *nothing* value: `Val` with exactly no sources.
    pub fn nothing() -> Self {
        ExprType::Val(KnownContrib::nothing())
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, ExprType::Val(kc) if kc.is_nothing())
    }

    /// The `sends-money` marker used by the special part of message
    /// values whose `_amount` could not be proven zero.
    pub fn money_marker() -> Self {
        ExprType::Val(KnownContrib::new(Precision::SubsetOf, Contributions::new()))
    }

    /// A `Val` with exactly one linear, operator-free source.
    pub fn single_source(source: ContribSource) -> Self {
        ExprType::Val(KnownContrib::new(
            Precision::Exactly,
            Contributions::single(source, ContribSummary::linear()),
        ))
    }

    /// Whether this expression type contains `Unknown` anywhere: the node
    /// itself, an unknown contribution source, or any subterm.
    pub fn is_unknown(&self) -> bool {
        match self {
            ExprType::Unknown => true,
            ExprType::Val(kc) => kc.contributions.contains(&ContribSource::Unknown),
            ExprType::CompositeVal(a, b) => a.is_unknown() || b.is_unknown(),
            ExprType::Op(_, inner) => inner.is_unknown(),
            ExprType::ComposeSequence(items) => items.iter().any(ExprType::is_unknown),
            ExprType::ComposeParallel(cond, clauses) => {
                cond.is_unknown() || clauses.iter().any(ExprType::is_unknown)
            }
            ExprType::Fun(desc) => desc_is_unknown(desc),
            ExprType::App(desc, args) => {
                desc_is_unknown(desc) || args.iter().any(ExprType::is_unknown)
            }
        }
    }

    /// All pseudofield sources mentioned anywhere in this expression type.
    pub fn pseudofield_sources(&self) -> Vec<&Pseudofield> {
        let mut out = Vec::new();
        self.collect_pseudofields(&mut out);
        out
    }

    fn collect_pseudofields<'a>(&'a self, out: &mut Vec<&'a Pseudofield>) {
        match self {
            ExprType::Unknown => {}
            ExprType::Val(kc) => {
                for src in kc.contributions.sources() {
                    if let ContribSource::Pseudofield(pf) = src {
                        out.push(pf);
                    }
                }
            }
            ExprType::CompositeVal(a, b) => {
                a.collect_pseudofields(out);
                b.collect_pseudofields(out);
            }
            ExprType::Op(_, inner) => inner.collect_pseudofields(out),
            ExprType::ComposeSequence(items) => {
                for item in items {
                    item.collect_pseudofields(out);
                }
            }
            ExprType::ComposeParallel(cond, clauses) => {
                cond.collect_pseudofields(out);
                for clause in clauses {
                    clause.collect_pseudofields(out);
                }
            }
            ExprType::Fun(desc) => {
                if let FunDef::Expr(body) = &desc.def {
                    body.collect_pseudofields(out);
                }
            }
            ExprType::App(desc, args) => {
                if let FunDef::Expr(body) = &desc.def {
                    body.collect_pseudofields(out);
                }
                for arg in args {
                    arg.collect_pseudofields(out);
                }
            }
        }
    }

}

fn desc_is_unknown(desc: &FunDesc) -> bool {
    match &desc.def {
        FunDef::Expr(body) => body.is_unknown(),
        FunDef::FormalParam(_) | FunDef::ProcParam(_) => false,
    }
}

impl fmt::Display for FunDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun[")?;
        for (i, l) in self.levels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{l}")?;
        }
        write!(f, "].")?;
        match &self.def {
            FunDef::Expr(body) => write!(f, "{body}"),
            FunDef::FormalParam(k) => write!(f, "$fp{k}"),
            FunDef::ProcParam(i) => write!(f, "$p{i}"),
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Unknown => write!(f, "unknown"),
            ExprType::Val(kc) => write!(f, "{kc}"),
            ExprType::CompositeVal(a, b) => write!(f, "<{a} | {b}>"),
            ExprType::Op(op, inner) => write!(f, "{op}({inner})"),
            ExprType::ComposeSequence(items) => {
                write!(f, "seq(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            ExprType::ComposeParallel(cond, clauses) => {
                write!(f, "par({cond} ?")?;
                for clause in clauses {
                    write!(f, " | {clause}")?;
                }
                write!(f, ")")
            }
            ExprType::Fun(desc) => write!(f, "{desc}"),
            ExprType::App(desc, args) => {
                write!(f, "app({desc}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
