use std::fmt;

use pangolin_ast::Span;

use crate::contribution::Pseudofield;
use crate::exprtype::ExprType;

/// One abstract effect of a component body.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentOp {
    Read(Pseudofield),
    Write(Pseudofield, ExprType),
    AcceptMoney,
    ConditionOn(ExprType),
    EmitEvent(ExprType),
    SendMessages(ExprType),
    /// Top of the effect lattice: the component must not be sharded.
    AlwaysExclusive {
        span: Option<Span>,
        reason: String,
    },
}

impl ComponentOp {
    pub fn always_exclusive(span: Option<Span>, reason: impl Into<String>) -> Self {
        ComponentOp::AlwaysExclusive {
            span,
            reason: reason.into(),
        }
    }

    /// The pseudofield this operation directly targets, if any.
    pub fn target(&self) -> Option<&Pseudofield> {
        match self {
            ComponentOp::Read(pf) | ComponentOp::Write(pf, _) => Some(pf),
            _ => None,
        }
    }

    /// The expression type embedded in this operation, if any.
    pub fn expr_type(&self) -> Option<&ExprType> {
        match self {
            ComponentOp::Write(_, et)
            | ComponentOp::ConditionOn(et)
            | ComponentOp::EmitEvent(et)
            | ComponentOp::SendMessages(et) => Some(et),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentOp::Read(pf) => write!(f, "read {pf}"),
            ComponentOp::Write(pf, et) => write!(f, "write {pf} := {et}"),
            ComponentOp::AcceptMoney => write!(f, "accept"),
            ComponentOp::ConditionOn(et) => write!(f, "condition on {et}"),
            ComponentOp::EmitEvent(et) => write!(f, "emit {et}"),
            ComponentOp::SendMessages(et) => write!(f, "send {et}"),
            ComponentOp::AlwaysExclusive { reason, .. } => {
                write!(f, "always-exclusive: {reason}")
            }
        }
    }
}

/// A component's effect summary: a set of operations with structural
/// equality, preserving insertion order for deterministic output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentSummary {
    ops: Vec<ComponentOp>,
}

impl ComponentSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn contains(&self, op: &ComponentOp) -> bool {
        self.ops.contains(op)
    }

    /// Insert an operation unless an equal one is already present. Returns
    /// whether the summary grew.
    pub fn insert(&mut self, op: ComponentOp) -> bool {
        if self.contains(&op) {
            false
        } else {
            self.ops.push(op);
            true
        }
    }

    pub fn union(&mut self, other: &ComponentSummary) {
        for op in &other.ops {
            self.insert(op.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentOp> {
        self.ops.iter()
    }

    pub fn ops(&self) -> &[ComponentOp] {
        &self.ops
    }

    pub fn has_always_exclusive(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, ComponentOp::AlwaysExclusive { .. }))
    }

    /// A prior write to exactly this pseudofield, if one was recorded.
    pub fn write_to(&self, pf: &Pseudofield) -> Option<&ComponentOp> {
        self.ops
            .iter()
            .find(|op| matches!(op, ComponentOp::Write(written, _) if written == pf))
    }
}

impl FromIterator<ComponentOp> for ComponentSummary {
    fn from_iter<T: IntoIterator<Item = ComponentOp>>(iter: T) -> Self {
        let mut s = Self::new();
        for op in iter {
            s.insert(op);
        }
        s
    }
}

impl fmt::Display for ComponentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "  {op}")?;
        }
        Ok(())
    }
}
