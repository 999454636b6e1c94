//! Inter-procedural summary translation: rewrite a procedure's summary
//! from callee-parameter coordinates into the caller's.

use indexmap::IndexMap;
use tracing::debug;

use pangolin_ast::{Ident, Span};
use pangolin_ir::{
    normalize, substitute, ComponentOp, ComponentSummary, ContribSource, Contributions, ExprType,
    FunDef, FunDesc, KnownContrib, ParamRef, Pseudofield,
};

use crate::env::AnalysisEnv;
use crate::errors::AnalysisError;
use crate::pipeline::implicit_component_params;

/// Translate a procedure call into caller coordinates.
///
/// The implicit component parameters are prepended to both parameter and
/// argument lists. Every identifier the callee uses as a map key must be a
/// callee parameter whose corresponding caller argument is itself a caller
/// component parameter; otherwise the whole call collapses into a single
/// `AlwaysExclusive` at the call site.
pub fn translate_call(
    env: &AnalysisEnv,
    callee: &Ident,
    args: &[Ident],
    call_span: Span,
) -> Result<ComponentSummary, AnalysisError> {
    let sig = env.component(callee)?;

    let implicit = implicit_component_params();
    let full_params: Vec<&Ident> = implicit
        .iter()
        .map(|(id, _)| id)
        .chain(sig.params.iter().map(|(id, _)| id))
        .collect();
    let full_args: Vec<&Ident> = implicit.iter().map(|(id, _)| id).chain(args.iter()).collect();

    // Identifiers the callee uses as map keys, in its own coordinates.
    let mut callee_keys: Vec<&Ident> = Vec::new();
    for op in sig.summary.iter() {
        if let Some(pf) = op.target() {
            collect_keys(pf, &mut callee_keys);
        }
        if let Some(et) = op.expr_type() {
            for pf in et.pseudofield_sources() {
                collect_keys(pf, &mut callee_keys);
            }
        }
    }

    // Keys must stay parameters on both sides of the call.
    let mut key_map: IndexMap<String, Ident> = IndexMap::new();
    for key in callee_keys {
        let Some(pos) = full_params.iter().position(|p| *p == key) else {
            debug!(callee = %callee, key = %key, "map key is not a callee parameter");
            return Ok(exclusive_call(call_span, format!(
                "map key `{key}` of `{callee}` is not one of its parameters"
            )));
        };
        let actual = full_args.get(pos).copied().ok_or_else(|| {
            AnalysisError::UnboundIdentifier {
                name: key.name.clone(),
                span: Some(call_span),
            }
        })?;
        if !env.is_component_param(actual) {
            debug!(callee = %callee, key = %key, actual = %actual,
                   "caller argument for map key is not a component parameter");
            return Ok(exclusive_call(call_span, format!(
                "argument `{actual}` bound to map key `{key}` of `{callee}` is not a component parameter"
            )));
        }
        key_map.insert(key.name.clone(), actual.clone());
    }

    // Caller-side expression types for every (implicit-prepended) argument.
    let arg_ets: Vec<ExprType> = full_args
        .iter()
        .map(|a| env.expr_type(a).cloned())
        .collect::<Result<_, _>>()?;

    let mut out = ComponentSummary::new();
    for op in sig.summary.iter() {
        let translated = match op {
            ComponentOp::Read(pf) => ComponentOp::Read(remap_pseudofield(pf, &key_map)),
            ComponentOp::Write(pf, et) => ComponentOp::Write(
                remap_pseudofield(pf, &key_map),
                translate_expr_type(et, &arg_ets, &key_map)?,
            ),
            ComponentOp::ConditionOn(et) => {
                ComponentOp::ConditionOn(translate_expr_type(et, &arg_ets, &key_map)?)
            }
            ComponentOp::EmitEvent(et) => {
                ComponentOp::EmitEvent(translate_expr_type(et, &arg_ets, &key_map)?)
            }
            ComponentOp::SendMessages(et) => {
                ComponentOp::SendMessages(translate_expr_type(et, &arg_ets, &key_map)?)
            }
            ComponentOp::AcceptMoney => ComponentOp::AcceptMoney,
            ComponentOp::AlwaysExclusive { span, reason } => ComponentOp::AlwaysExclusive {
                span: *span,
                reason: reason.clone(),
            },
        };
        out.insert(translated);
    }
    Ok(out)
}

fn exclusive_call(span: Span, reason: String) -> ComponentSummary {
    let mut s = ComponentSummary::new();
    s.insert(ComponentOp::always_exclusive(Some(span), reason));
    s
}

fn collect_keys<'a>(pf: &'a Pseudofield, out: &mut Vec<&'a Ident>) {
    if let Some(keys) = &pf.keys {
        for k in keys {
            if !out.contains(&k) {
                out.push(k);
            }
        }
    }
}

/// Substitute every callee parameter with the caller argument's expression
/// type, normalize, then remap residual map-key identifiers.
fn translate_expr_type(
    et: &ExprType,
    arg_ets: &[ExprType],
    key_map: &IndexMap<String, Ident>,
) -> Result<ExprType, AnalysisError> {
    let mut current = et.clone();
    for (i, arg_et) in arg_ets.iter().enumerate() {
        current = substitute(&current, ParamRef::Proc(i), arg_et)?;
    }
    let current = normalize(&current)?;
    Ok(remap_expr_type(&current, key_map))
}

fn remap_pseudofield(pf: &Pseudofield, key_map: &IndexMap<String, Ident>) -> Pseudofield {
    Pseudofield {
        field: pf.field.clone(),
        keys: pf.keys.as_ref().map(|keys| {
            keys.iter()
                .map(|k| key_map.get(&k.name).cloned().unwrap_or_else(|| k.clone()))
                .collect()
        }),
    }
}

fn remap_expr_type(et: &ExprType, key_map: &IndexMap<String, Ident>) -> ExprType {
    match et {
        ExprType::Unknown => ExprType::Unknown,
        ExprType::Val(kc) => {
            let mut out = Contributions::new();
            for (src, sum) in kc.contributions.iter() {
                let src = match src {
                    ContribSource::Pseudofield(pf) => {
                        ContribSource::Pseudofield(remap_pseudofield(pf, key_map))
                    }
                    other => other.clone(),
                };
                match out.get(&src) {
                    // Two callee locations can land on the same caller
                    // location; their contributions accumulate sequentially.
                    Some(existing) => {
                        let merged = existing.combine_seq(sum);
                        out.insert(src, merged);
                    }
                    None => out.insert(src, sum.clone()),
                }
            }
            ExprType::Val(KnownContrib::new(kc.precision, out))
        }
        ExprType::CompositeVal(a, b) => ExprType::CompositeVal(
            Box::new(remap_expr_type(a, key_map)),
            Box::new(remap_expr_type(b, key_map)),
        ),
        ExprType::Op(op, inner) => ExprType::Op(*op, Box::new(remap_expr_type(inner, key_map))),
        ExprType::ComposeSequence(items) => ExprType::ComposeSequence(
            items.iter().map(|i| remap_expr_type(i, key_map)).collect(),
        ),
        ExprType::ComposeParallel(cond, clauses) => ExprType::ComposeParallel(
            Box::new(remap_expr_type(cond, key_map)),
            clauses.iter().map(|c| remap_expr_type(c, key_map)).collect(),
        ),
        ExprType::Fun(desc) => ExprType::Fun(remap_desc(desc, key_map)),
        ExprType::App(desc, args) => ExprType::App(
            remap_desc(desc, key_map),
            args.iter().map(|a| remap_expr_type(a, key_map)).collect(),
        ),
    }
}

fn remap_desc(desc: &FunDesc, key_map: &IndexMap<String, Ident>) -> FunDesc {
    match &desc.def {
        FunDef::Expr(body) => FunDesc::new(
            desc.levels.clone(),
            FunDef::Expr(Box::new(remap_expr_type(body, key_map))),
        ),
        FunDef::FormalParam(_) | FunDef::ProcParam(_) => desc.clone(),
    }
}
