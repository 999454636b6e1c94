//! Expression-type normalization: operator distribution into contributions,
//! collapse of fully-evaluated compositions, and beta-reduction of
//! applications via capture-avoiding substitution.

use thiserror::Error;

use crate::contribution::{
    Cardinality, ContribOp, ContribSource, ContribSummary, Contributions, KnownContrib, Precision,
};
use crate::exprtype::{ExprType, FunDef, FunDesc};

#[derive(Debug, Error)]
pub enum IrError {
    #[error("application of a non-function expression type `{0}`")]
    NonFunctionApplication(String),
    #[error("application with an empty argument list")]
    EmptyApplication,
    #[error("function descriptor with no parameter levels")]
    NoParameterLevels,
}

/// A parameter being substituted for: a lambda formal (by de Bruijn level)
/// or a component parameter (by position).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRef {
    Formal(usize),
    Proc(usize),
}

impl ParamRef {
    fn source(self) -> ContribSource {
        match self {
            ParamRef::Formal(k) => ContribSource::FormalParam(k),
            ParamRef::Proc(i) => ContribSource::ProcParam(i),
        }
    }

    fn matches_def(self, def: &FunDef) -> bool {
        match (self, def) {
            (ParamRef::Formal(k), FunDef::FormalParam(i)) => k == *i,
            (ParamRef::Proc(k), FunDef::ProcParam(i)) => k == *i,
            _ => false,
        }
    }
}

/// Mark `body`'s contributions with the `Conditional` operator, conditioned
/// on the sources of `cond`.
///
/// Sources appearing only in the condition join the body with cardinality
/// `None`; sources appearing in both get `Conditional` unioned into their
/// operator set. The precision floor is `SubsetOf` unless the condition is
/// the nothing value, in which case the conditional is spurious and the
/// body's precision is preserved.
pub fn add_conditional(cond: &KnownContrib, body: &KnownContrib) -> KnownContrib {
    let mut contributions = body.contributions.clone();
    for (src, _) in cond.contributions.iter() {
        match contributions.get(src) {
            Some(existing) => {
                contributions.insert(src.clone(), existing.with_op(ContribOp::Conditional));
            }
            None => {
                contributions.insert(
                    src.clone(),
                    ContribSummary::new(Cardinality::None, [ContribOp::Conditional]),
                );
            }
        }
    }
    let precision = if cond.is_nothing() {
        body.precision
    } else {
        Precision::SubsetOf
    };
    KnownContrib::new(precision, contributions)
}

/// Rewrite an expression type into canonical form.
///
/// Idempotent: normalizing a normalized expression type is a no-op.
pub fn normalize(et: &ExprType) -> Result<ExprType, IrError> {
    match et {
        ExprType::Unknown => Ok(ExprType::Unknown),
        ExprType::Val(kc) => Ok(ExprType::Val(kc.clone())),
        ExprType::CompositeVal(a, b) => Ok(ExprType::CompositeVal(
            Box::new(normalize(a)?),
            Box::new(normalize(b)?),
        )),
        ExprType::Op(op, inner) => {
            let inner = normalize(inner)?;
            Ok(apply_op(*op, inner))
        }
        ExprType::ComposeSequence(items) => {
            let items: Vec<ExprType> = items.iter().map(normalize).collect::<Result<_, _>>()?;
            match all_vals(&items) {
                Some(kcs) => {
                    let mut acc = KnownContrib::nothing();
                    for kc in kcs {
                        acc = acc.compose(kc, ContribSummary::combine_seq);
                    }
                    Ok(ExprType::Val(acc))
                }
                None => Ok(ExprType::ComposeSequence(items)),
            }
        }
        ExprType::ComposeParallel(cond, clauses) => {
            let cond = normalize(cond)?;
            let clauses: Vec<ExprType> = clauses.iter().map(normalize).collect::<Result<_, _>>()?;
            match (&cond, all_vals(&clauses)) {
                (ExprType::Val(cond_kc), Some(kcs)) => {
                    // Fold from the first clause, not the nothing identity,
                    // to avoid needless precision loss on singleton matches.
                    let folded = match kcs.split_first() {
                        None => KnownContrib::nothing(),
                        Some((first, rest)) => rest.iter().fold((*first).clone(), |acc, kc| {
                            acc.compose(kc, ContribSummary::combine_par)
                        }),
                    };
                    Ok(ExprType::Val(add_conditional(cond_kc, &folded)))
                }
                _ => Ok(ExprType::ComposeParallel(Box::new(cond), clauses)),
            }
        }
        ExprType::Fun(desc) => Ok(ExprType::Fun(normalize_desc(desc)?)),
        ExprType::App(desc, args) => normalize_app(desc, args),
    }
}

/// The contribution views of a slice of expression types, if every element
/// is a plain value.
fn all_vals(items: &[ExprType]) -> Option<Vec<&KnownContrib>> {
    items
        .iter()
        .map(|item| match item {
            ExprType::Val(kc) => Some(kc),
            _ => None,
        })
        .collect()
}

fn normalize_desc(desc: &FunDesc) -> Result<FunDesc, IrError> {
    match &desc.def {
        FunDef::Expr(body) => Ok(FunDesc::new(
            desc.levels.clone(),
            FunDef::Expr(Box::new(normalize(body)?)),
        )),
        FunDef::FormalParam(_) | FunDef::ProcParam(_) => Ok(desc.clone()),
    }
}

/// Distribute an operator into a normalized expression type.
fn apply_op(op: ContribOp, inner: ExprType) -> ExprType {
    match inner {
        ExprType::Val(kc) => ExprType::Val(KnownContrib::new(
            kc.precision,
            kc.contributions.map_summaries(|sum| sum.with_op(op)),
        )),
        ExprType::CompositeVal(a, b) => {
            ExprType::CompositeVal(Box::new(apply_op(op, *a)), Box::new(apply_op(op, *b)))
        }
        ExprType::Unknown => ExprType::Unknown,
        other => ExprType::Op(op, Box::new(other)),
    }
}

fn normalize_app(desc: &FunDesc, args: &[ExprType]) -> Result<ExprType, IrError> {
    if args.is_empty() {
        return Err(IrError::EmptyApplication);
    }
    let desc = normalize_desc(desc)?;
    let args: Vec<ExprType> = args.iter().map(normalize).collect::<Result<_, _>>()?;

    // Applications of opaque (parameter-valued) functions cannot reduce;
    // they stay pending until translation substitutes a concrete function.
    if desc.is_opaque() {
        return Ok(ExprType::App(desc, args));
    }
    if ExprType::Fun(desc.clone()).is_unknown() || args.iter().any(ExprType::is_unknown) {
        return Ok(ExprType::Unknown);
    }
    let value_like = |et: &ExprType| {
        matches!(
            et,
            ExprType::Val(_) | ExprType::CompositeVal(..) | ExprType::Fun(_)
        )
    };
    if !args.iter().all(value_like) {
        return Ok(ExprType::App(desc, args));
    }

    // Apply arguments one at a time; curried functions expose the next
    // parameter level after each substitution.
    let mut current = ExprType::Fun(desc);
    for (i, arg) in args.iter().enumerate() {
        current = normalize(&current)?;
        match current {
            ExprType::Fun(d) => {
                let level = *d.levels.first().ok_or(IrError::NoParameterLevels)?;
                match &d.def {
                    FunDef::Expr(_) => {
                        current = substitute(&ExprType::Fun(d), ParamRef::Formal(level), arg)?;
                    }
                    FunDef::FormalParam(_) | FunDef::ProcParam(_) => {
                        return Ok(ExprType::App(d, args[i..].to_vec()));
                    }
                }
            }
            ExprType::Unknown => return Ok(ExprType::Unknown),
            other => return Err(IrError::NonFunctionApplication(other.to_string())),
        }
    }
    normalize(&current)
}

/// Capture-avoiding substitution of a parameter marker by an argument
/// expression type.
pub fn substitute(et: &ExprType, target: ParamRef, arg: &ExprType) -> Result<ExprType, IrError> {
    match et {
        ExprType::Unknown => Ok(ExprType::Unknown),
        ExprType::Val(kc) => substitute_val(kc, target, arg),
        ExprType::CompositeVal(full, special) => {
            // A composite argument substitutes pointwise; a plain argument
            // substitutes into both views unchanged.
            let (arg_full, arg_special) = match arg {
                ExprType::CompositeVal(af, asp) => (&**af, &**asp),
                other => (other, other),
            };
            Ok(ExprType::CompositeVal(
                Box::new(substitute(full, target, arg_full)?),
                Box::new(substitute(special, target, arg_special)?),
            ))
        }
        ExprType::Op(op, inner) => Ok(ExprType::Op(*op, Box::new(substitute(inner, target, arg)?))),
        ExprType::ComposeSequence(items) => Ok(ExprType::ComposeSequence(
            items
                .iter()
                .map(|i| substitute(i, target, arg))
                .collect::<Result<_, _>>()?,
        )),
        ExprType::ComposeParallel(cond, clauses) => Ok(ExprType::ComposeParallel(
            Box::new(substitute(cond, target, arg)?),
            clauses
                .iter()
                .map(|c| substitute(c, target, arg))
                .collect::<Result<_, _>>()?,
        )),
        ExprType::Fun(desc) => match &desc.def {
            FunDef::Expr(body) => {
                if let ParamRef::Formal(k) = target {
                    if desc.levels.contains(&k) {
                        // This lambda binds the parameter being substituted:
                        // it is the one being applied, so the wrapper drops.
                        return substitute(body, target, arg);
                    }
                }
                Ok(ExprType::Fun(FunDesc::new(
                    desc.levels.clone(),
                    FunDef::Expr(Box::new(substitute(body, target, arg)?)),
                )))
            }
            def if target.matches_def(def) => match arg {
                // First-class-function substitution: the parameter was a
                // function value and the argument supplies it.
                ExprType::Fun(d) => Ok(ExprType::Fun(d.clone())),
                _ => Ok(ExprType::Unknown),
            },
            _ => Ok(et.clone()),
        },
        ExprType::App(desc, app_args) => {
            let new_args: Vec<ExprType> = app_args
                .iter()
                .map(|a| substitute(a, target, arg))
                .collect::<Result<_, _>>()?;
            let new_desc = match &desc.def {
                FunDef::Expr(body) => FunDesc::new(
                    desc.levels.clone(),
                    FunDef::Expr(Box::new(substitute(body, target, arg)?)),
                ),
                def if target.matches_def(def) => match arg {
                    ExprType::Fun(d) => d.clone(),
                    _ => return Ok(ExprType::Unknown),
                },
                _ => desc.clone(),
            };
            Ok(ExprType::App(new_desc, new_args))
        }
    }
}

/// Substitute a parameter source inside a plain value.
///
/// The remaining sources are product-combined with the parameter's summary
/// (the operators and cardinality applied to the parameter position apply
/// to whatever flows into it), and the argument's sources, scaled the same
/// way, are sequentially unioned in.
fn substitute_val(kc: &KnownContrib, target: ParamRef, arg: &ExprType) -> Result<ExprType, IrError> {
    let target_src = target.source();
    let Some(param_sum) = kc.contributions.get(&target_src).cloned() else {
        return Ok(ExprType::Val(kc.clone()));
    };
    let arg = match arg {
        ExprType::CompositeVal(full, _) => &**full,
        other => other,
    };
    let arg_kc = match arg {
        ExprType::Val(arg_kc) => arg_kc,
        ExprType::Unknown => return Ok(ExprType::Unknown),
        // A function value (or a pending composition) flowing into a
        // first-order position: give up.
        _ => return Ok(ExprType::Unknown),
    };

    let mut out = Contributions::new();
    for (src, sum) in kc.contributions.iter() {
        if *src == target_src {
            continue;
        }
        out.insert(src.clone(), sum.combine_product(&param_sum));
    }
    for (src, sum) in arg_kc.contributions.iter() {
        let scaled = sum.combine_product(&param_sum);
        match out.get(src) {
            Some(existing) => {
                let merged = existing.combine_seq(&scaled);
                out.insert(src.clone(), merged);
            }
            None => out.insert(src.clone(), scaled),
        }
    }
    Ok(ExprType::Val(KnownContrib::new(
        kc.precision.meet(arg_kc.precision),
        out,
    )))
}
