//! Statement analysis: folds a component body into an effect summary,
//! threading the environment through bindings.

use indexmap::IndexMap;

use pangolin_ast::{Ident, MatchStmtClause, Span, Spanned, Stmt};
use pangolin_ir::{
    normalize, ComponentOp, ComponentSummary, ContribOp, ContribSource, ExprType, Pseudofield,
};

use crate::env::{AnalysisEnv, IdentSig};
use crate::errors::AnalysisError;
use crate::eval::eval_expr;
use crate::pcm::PcmRegistry;
use crate::translate::translate_call;

/// Immutable per-component context for statement analysis.
pub struct StmtCtx<'a> {
    pub registry: &'a PcmRegistry,
    /// Map-nesting depth per declared field (zero for non-map fields).
    pub field_depths: &'a IndexMap<String, usize>,
}

/// Analyze a statement list, returning the extended environment and the
/// grown summary. The summary only ever grows.
pub fn analyze_stmts(
    ctx: &StmtCtx<'_>,
    mut env: AnalysisEnv,
    mut summary: ComponentSummary,
    stmts: &[Spanned<Stmt>],
) -> Result<(AnalysisEnv, ComponentSummary), AnalysisError> {
    for stmt in stmts {
        let (new_env, new_summary) = analyze_stmt(ctx, env, summary, &stmt.node, stmt.span)?;
        env = new_env;
        summary = new_summary;
    }
    Ok((env, summary))
}

fn analyze_stmt(
    ctx: &StmtCtx<'_>,
    env: AnalysisEnv,
    mut summary: ComponentSummary,
    stmt: &Stmt,
    span: Span,
) -> Result<(AnalysisEnv, ComponentSummary), AnalysisError> {
    match stmt {
        Stmt::Load { lhs, field } => {
            require_field(ctx, field)?;
            let pf = Pseudofield::field(field.clone());
            let env = if summary.write_to(&pf).is_some() {
                summary.insert(ComponentOp::always_exclusive(
                    Some(span),
                    format!("load of {pf} after a write to it"),
                ));
                bind(&env, lhs, ExprType::Unknown)
            } else {
                summary.insert(ComponentOp::Read(pf.clone()));
                bind(
                    &env,
                    lhs,
                    ExprType::single_source(ContribSource::Pseudofield(pf)),
                )
            };
            Ok((env, summary))
        }

        Stmt::Store { field, rhs } => {
            require_field(ctx, field)?;
            let et = env.expr_type(rhs)?.clone();
            summary.insert(ComponentOp::Write(Pseudofield::field(field.clone()), et));
            Ok((env, summary))
        }

        Stmt::MapGet {
            lhs,
            map,
            keys,
            fetch_value: _,
        } => {
            require_field(ctx, map)?;
            match map_access_obstacle(ctx, &env, map, keys) {
                Some(reason) => {
                    summary.insert(ComponentOp::always_exclusive(Some(span), reason));
                    Ok((bind(&env, lhs, ExprType::Unknown), summary))
                }
                None => {
                    let pf = Pseudofield::map(map.clone(), keys.clone());
                    let env = if summary.write_to(&pf).is_some() {
                        summary.insert(ComponentOp::always_exclusive(
                            Some(span),
                            format!("read of {pf} after a write to it"),
                        ));
                        bind(&env, lhs, ExprType::Unknown)
                    } else {
                        summary.insert(ComponentOp::Read(pf.clone()));
                        bind(
                            &env,
                            lhs,
                            ExprType::single_source(ContribSource::Pseudofield(pf)),
                        )
                    };
                    Ok((env, summary))
                }
            }
        }

        Stmt::MapUpdate { map, keys, rhs } => {
            require_field(ctx, map)?;
            match map_access_obstacle(ctx, &env, map, keys) {
                Some(reason) => {
                    summary.insert(ComponentOp::always_exclusive(Some(span), reason));
                }
                None => {
                    let et = match rhs {
                        Some(value) => env.expr_type(value)?.clone(),
                        // Key deletion writes no interesting value.
                        None => ExprType::nothing(),
                    };
                    summary.insert(ComponentOp::Write(
                        Pseudofield::map(map.clone(), keys.clone()),
                        et,
                    ));
                }
            }
            Ok((env, summary))
        }

        Stmt::Bind { lhs, rhs } => {
            let et = normalize(&eval_expr(&env, ctx.registry, 0, rhs)?)?;
            let units = ctx.registry.unit_memberships(&env, &rhs.expr);
            let sig = IdentSig::new(et)
                .with_shadow(env.shadow_status_for(lhs))
                .with_units(units);
            Ok((env.bind_ident(lhs, sig), summary))
        }

        Stmt::MatchStmt {
            scrutinee,
            scrutinee_ty,
            clauses,
        } => {
            let scrut_et = env.expr_type(scrutinee)?.clone();
            if ctx
                .registry
                .is_spurious_stmt(&scrut_et, scrutinee_ty, clauses)
            {
                // The match is equivalent to one PCM operation: only the
                // `Some` branch's effects are real.
                let some_clause = clauses
                    .iter()
                    .find(|c| c.pattern.single_binder_of("Some").is_some())
                    .expect("spurious match has a Some clause");
                let clause_env = bind_pattern(&env, some_clause, &scrut_et);
                let (_, new_summary) =
                    analyze_stmts(ctx, clause_env, summary, &some_clause.body)?;
                return Ok((env, new_summary));
            }

            let cond = normalize(&ExprType::Op(
                ContribOp::Conditional,
                Box::new(scrut_et.clone()),
            ))?;
            match &cond {
                ExprType::Val(_) => {
                    summary.insert(ComponentOp::ConditionOn(cond.clone()));
                }
                _ => {
                    summary.insert(ComponentOp::always_exclusive(
                        Some(span),
                        format!("match condition on `{scrutinee}` is not summarisable"),
                    ));
                }
            }
            for clause in clauses {
                let clause_env = bind_pattern(&env, clause, &scrut_et);
                let (_, new_summary) = analyze_stmts(ctx, clause_env, summary, &clause.body)?;
                summary = new_summary;
            }
            Ok((env, summary))
        }

        Stmt::ReadFromBC { lhs, query: _ } => Ok((bind(&env, lhs, ExprType::nothing()), summary)),

        Stmt::AcceptPayment => {
            summary.insert(ComponentOp::AcceptMoney);
            Ok((env, summary))
        }

        Stmt::SendMsgs(msgs) => {
            let et = env.expr_type(msgs)?.clone();
            summary.insert(ComponentOp::SendMessages(et));
            Ok((env, summary))
        }

        Stmt::CreateEvnt(event) => {
            let et = env.expr_type(event)?.clone();
            summary.insert(ComponentOp::EmitEvent(et));
            Ok((env, summary))
        }

        Stmt::CallProc { name, args } => {
            let translated = translate_call(&env, name, args, span)?;
            summary.union(&translated);
            Ok((env, summary))
        }

        Stmt::Iterate { list, proc } => {
            summary.insert(ComponentOp::always_exclusive(
                Some(span),
                format!("forall over `{list}` with `{proc}`"),
            ));
            Ok((env, summary))
        }

        // Throws cancel state changes at runtime, so keeping subsequent
        // effects in the summary is a safe over-approximation.
        Stmt::Throw(_) => Ok((env, summary)),
    }
}

fn bind(env: &AnalysisEnv, name: &Ident, et: ExprType) -> AnalysisEnv {
    let sig = IdentSig::new(et).with_shadow(env.shadow_status_for(name));
    env.bind_ident(name, sig)
}

fn bind_pattern(env: &AnalysisEnv, clause: &MatchStmtClause, scrut_et: &ExprType) -> AnalysisEnv {
    let mut out = env.clone();
    for binder in clause.pattern.binders() {
        out = bind(&out, binder, scrut_et.clone());
    }
    out
}

fn require_field(ctx: &StmtCtx<'_>, field: &Ident) -> Result<(), AnalysisError> {
    if ctx.field_depths.contains_key(&field.name) {
        Ok(())
    } else {
        Err(AnalysisError::UnknownField {
            name: field.name.clone(),
            span: Some(field.span),
        })
    }
}

/// Why a map access cannot be summarized, if it cannot be: the access must
/// reach the bottom level of the map, and every key must be an unshadowed
/// component parameter.
fn map_access_obstacle(
    ctx: &StmtCtx<'_>,
    env: &AnalysisEnv,
    map: &Ident,
    keys: &[Ident],
) -> Option<String> {
    let depth = ctx.field_depths.get(&map.name).copied().unwrap_or(0);
    if keys.len() != depth {
        return Some(format!(
            "access to `{map}` with {} keys is not bottom-level (map depth {depth})",
            keys.len()
        ));
    }
    for key in keys {
        if !env.is_component_param(key) {
            return Some(format!(
                "map key `{key}` of `{map}` is not a component parameter"
            ));
        }
    }
    None
}
