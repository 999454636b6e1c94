//! Partial-commutative-monoid recognition.
//!
//! A PCM module knows its applicable value types, its unit, its binary
//! operation over the contribution-operator space, and the option-match
//! idioms that are semantically equivalent to a single application of the
//! operation. The registry is a pluggable capability set: new monoids
//! register an implementation of [`Pcm`].

use std::collections::BTreeSet;

use pangolin_ast::{
    BuiltinOp, Expr, ExprNode, Ident, Literal, MatchStmtClause, Pattern, SType, Stmt,
};
use pangolin_ir::{Cardinality, ContribOp, ContribSource, ExprType, Pseudofield};

use crate::env::AnalysisEnv;

/// A recognized partial-commutative monoid.
pub trait Pcm {
    /// Stable identifier, used in `MustHavePcm` constraints.
    fn identifier(&self) -> &'static str;

    /// Whether the monoid applies to this type instantiation.
    fn is_applicable_type(&self, types: &[&SType]) -> bool;

    /// Whether a literal is the monoid's unit.
    fn is_unit_literal(&self, lit: &Literal) -> bool;

    /// Whether an identifier is known to equal the monoid's unit.
    fn is_unit(&self, env: &AnalysisEnv, ident: &Ident) -> bool {
        matches!(
            env.lookup(&ident.name),
            Some(crate::env::EnvEntry::Ident(sig)) if sig.pcm_units.contains(self.identifier())
        )
    }

    /// Whether a contribution operator is the monoid's binary operation.
    fn is_op(&self, op: &ContribOp) -> bool;

    /// Whether an expression is exactly the monoid operation applied once
    /// each to `a` and `b`.
    fn is_op_expr(&self, expr: &Expr, a: &Ident, b: &Ident) -> bool;

    /// Whether an expression-level option match is equivalent to the
    /// scrutinee (unit form) or to one monoid operation (op form).
    fn is_spurious_conditional_expr(
        &self,
        env: &AnalysisEnv,
        scrutinee_ty: &SType,
        clauses: &[(Pattern, ExprNode)],
    ) -> bool;

    /// Whether a statement-level option match is the read-modify-write
    /// idiom equivalent to one monoid operation on a single pseudofield.
    fn is_spurious_conditional_stmt(
        &self,
        scrutinee_et: &ExprType,
        scrutinee_ty: &SType,
        clauses: &[MatchStmtClause],
    ) -> bool;
}

/// Integer addition over signed and unsigned integer types; unit is the
/// zero literal, the operation is builtin `add`.
#[derive(Debug, Default)]
pub struct IntegerAddPcm;

impl IntegerAddPcm {
    /// Split a two-clause option match into its `Some`-binder clause and
    /// its `None` clause, in either order.
    fn split_option_clauses<'a, C>(
        clauses: &'a [C],
        pattern_of: impl Fn(&'a C) -> &'a Pattern,
    ) -> Option<(&'a Ident, &'a C, &'a C)> {
        if clauses.len() != 2 {
            return None;
        }
        let (some, none) = if pattern_of(&clauses[0]).single_binder_of("Some").is_some() {
            (&clauses[0], &clauses[1])
        } else {
            (&clauses[1], &clauses[0])
        };
        let binder = pattern_of(some).single_binder_of("Some")?;
        if !pattern_of(none).is_nullary("None") {
            return None;
        }
        Some((binder, some, none))
    }
}

impl Pcm for IntegerAddPcm {
    fn identifier(&self) -> &'static str {
        "integer_add"
    }

    fn is_applicable_type(&self, types: &[&SType]) -> bool {
        matches!(types, [SType::Prim(p)] if p.is_integer())
    }

    fn is_unit_literal(&self, lit: &Literal) -> bool {
        lit.is_integer_zero()
    }

    fn is_op(&self, op: &ContribOp) -> bool {
        *op == ContribOp::Builtin(BuiltinOp::Add)
    }

    fn is_op_expr(&self, expr: &Expr, a: &Ident, b: &Ident) -> bool {
        let Expr::Builtin {
            op: BuiltinOp::Add,
            args,
        } = expr
        else {
            return false;
        };
        // Exactly one occurrence of each operand.
        a != b
            && args.len() == 2
            && ((args[0] == *a && args[1] == *b) || (args[0] == *b && args[1] == *a))
    }

    fn is_spurious_conditional_expr(
        &self,
        env: &AnalysisEnv,
        scrutinee_ty: &SType,
        clauses: &[(Pattern, ExprNode)],
    ) -> bool {
        let Some(elem) = scrutinee_ty.option_elem() else {
            return false;
        };
        if !self.is_applicable_type(&[elem]) {
            return false;
        }
        let Some((binder, some, none)) =
            Self::split_option_clauses(clauses, |(pattern, _)| pattern)
        else {
            return false;
        };

        // Unit form: `Some x => x | None => unit` is the scrutinee itself.
        let unit_form = matches!(&some.1.expr, Expr::Var(v) if v == binder)
            && match &none.1.expr {
                Expr::Lit(l) => self.is_unit_literal(l),
                Expr::Var(v) => self.is_unit(env, v),
                _ => false,
            };
        if unit_form {
            return true;
        }

        // Op form: `Some x => op(x, y) | None => y`.
        if let Expr::Var(y) = &none.1.expr {
            if y != binder && self.is_op_expr(&some.1.expr, binder, y) {
                return true;
            }
        }
        false
    }

    fn is_spurious_conditional_stmt(
        &self,
        scrutinee_et: &ExprType,
        scrutinee_ty: &SType,
        clauses: &[MatchStmtClause],
    ) -> bool {
        let Some(elem) = scrutinee_ty.option_elem() else {
            return false;
        };
        if !self.is_applicable_type(&[elem]) {
            return false;
        }
        let Some((binder, some, none)) =
            Self::split_option_clauses(clauses, |clause| &clause.pattern)
        else {
            return false;
        };

        // The scrutinee must be exactly one linear, operator-free read of a
        // single pseudofield.
        let Some(pf) = single_linear_pseudofield(scrutinee_et) else {
            return false;
        };

        // `None => pf := d`
        let [none_stmt] = none.body.as_slice() else {
            return false;
        };
        let Some((none_pf, Some(default))) = write_of(&none_stmt.node) else {
            return false;
        };
        if none_pf != *pf {
            return false;
        }

        // `Some x => q = op(x, d); pf := q`
        let [bind_stmt, write_stmt] = some.body.as_slice() else {
            return false;
        };
        let Stmt::Bind { lhs, rhs } = &bind_stmt.node else {
            return false;
        };
        if !self.is_op_expr(&rhs.expr, binder, default) {
            return false;
        }
        match write_of(&write_stmt.node) {
            Some((some_pf, Some(stored))) => some_pf == *pf && stored == lhs,
            _ => false,
        }
    }
}

/// View a statement as a pseudofield write, unifying whole-field stores and
/// bottom-level map updates.
fn write_of(stmt: &Stmt) -> Option<(Pseudofield, Option<&Ident>)> {
    match stmt {
        Stmt::Store { field, rhs } => Some((Pseudofield::field(field.clone()), Some(rhs))),
        Stmt::MapUpdate { map, keys, rhs } => Some((
            Pseudofield::map(map.clone(), keys.clone()),
            rhs.as_ref(),
        )),
        _ => None,
    }
}

/// The single pseudofield of a `Val(Exactly, { pf -> (Linear, {}) })`
/// expression type, if it has that exact shape.
fn single_linear_pseudofield(et: &ExprType) -> Option<&Pseudofield> {
    let ExprType::Val(kc) = et else {
        return None;
    };
    if kc.precision != pangolin_ir::Precision::Exactly || kc.contributions.len() != 1 {
        return None;
    }
    let (src, sum) = kc.contributions.iter().next()?;
    if sum.cardinality != Cardinality::Linear || !sum.ops.is_empty() {
        return None;
    }
    match src {
        ContribSource::Pseudofield(pf) => Some(pf),
        _ => None,
    }
}

/// The pluggable set of PCM modules consulted by the analysis.
pub struct PcmRegistry {
    modules: Vec<Box<dyn Pcm>>,
}

impl Default for PcmRegistry {
    fn default() -> Self {
        Self {
            modules: vec![Box::new(IntegerAddPcm)],
        }
    }
}

impl PcmRegistry {
    pub fn new(modules: Vec<Box<dyn Pcm>>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn Pcm> {
        self.modules.iter().map(Box::as_ref)
    }

    /// The PCM whose binary operation this contribution operator is.
    pub fn pcm_for_op(&self, op: &ContribOp) -> Option<&dyn Pcm> {
        self.modules().find(|m| m.is_op(op))
    }

    /// Identifiers of every PCM whose unit this expression is: a unit
    /// literal, or a variable already known to be a unit.
    pub fn unit_memberships(&self, env: &AnalysisEnv, expr: &Expr) -> BTreeSet<String> {
        self.modules()
            .filter(|m| match expr {
                Expr::Lit(l) => m.is_unit_literal(l),
                Expr::Var(v) => m.is_unit(env, v),
                _ => false,
            })
            .map(|m| m.identifier().to_string())
            .collect()
    }

    pub fn is_spurious_expr(
        &self,
        env: &AnalysisEnv,
        scrutinee_ty: &SType,
        clauses: &[(Pattern, ExprNode)],
    ) -> bool {
        self.modules()
            .any(|m| m.is_spurious_conditional_expr(env, scrutinee_ty, clauses))
    }

    pub fn is_spurious_stmt(
        &self,
        scrutinee_et: &ExprType,
        scrutinee_ty: &SType,
        clauses: &[MatchStmtClause],
    ) -> bool {
        self.modules()
            .any(|m| m.is_spurious_conditional_stmt(scrutinee_et, scrutinee_ty, clauses))
    }
}
