//! Symbolic expression evaluation into the contribution domain.

use pangolin_ir::{ContribOp, ContribSource, ExprType, FunDef, FunDesc};

use pangolin_ast::{Expr, ExprNode, Ident, MsgPayload};

use crate::env::{AnalysisEnv, IdentSig};
use crate::errors::AnalysisError;
use crate::pcm::PcmRegistry;
use crate::pipeline::{MSG_AMOUNT_LABEL, MSG_RECIPIENT_LABEL};

/// Evaluate an expression to its expression type.
///
/// `fp_count` is the de Bruijn level the next lambda parameter will
/// receive; statement-level evaluations start it at zero.
pub fn eval_expr(
    env: &AnalysisEnv,
    registry: &PcmRegistry,
    fp_count: usize,
    node: &ExprNode,
) -> Result<ExprType, AnalysisError> {
    match &node.expr {
        Expr::Lit(l) => Ok(ExprType::single_source(ContribSource::Literal(l.clone()))),

        Expr::Var(id) => Ok(env.expr_type(id)?.clone()),

        Expr::Let { lhs, ty: _, rhs, body } => {
            let rhs_et = pangolin_ir::normalize(&eval_expr(env, registry, fp_count, rhs)?)?;
            let units = registry.unit_memberships(env, &rhs.expr);
            let sig = IdentSig::new(rhs_et)
                .with_shadow(env.shadow_status_for(lhs))
                .with_units(units);
            let env = env.bind_ident(lhs, sig);
            eval_expr(&env, registry, fp_count, body)
        }

        Expr::Message(entries) => {
            let mut payloads = Vec::with_capacity(entries.len());
            let mut specials = Vec::new();
            for entry in entries {
                let pet = match &entry.payload {
                    MsgPayload::Lit(l) => {
                        ExprType::single_source(ContribSource::Literal(l.clone()))
                    }
                    MsgPayload::Var(id) => env.expr_type(id)?.clone(),
                };
                match entry.label.as_str() {
                    MSG_AMOUNT_LABEL => {
                        let provably_zero = match &entry.payload {
                            MsgPayload::Lit(l) => {
                                registry.modules().any(|m| m.is_unit_literal(l))
                            }
                            MsgPayload::Var(id) => {
                                registry.modules().any(|m| m.is_unit(env, id))
                            }
                        };
                        if provably_zero {
                            specials.push(ExprType::nothing());
                        } else {
                            specials.push(ExprType::money_marker());
                        }
                    }
                    MSG_RECIPIENT_LABEL => specials.push(pet.clone()),
                    _ => {}
                }
                payloads.push(pet);
            }
            let full = ExprType::ComposeParallel(Box::new(ExprType::nothing()), payloads);
            let special = if specials.is_empty() {
                ExprType::nothing()
            } else {
                ExprType::ComposeParallel(Box::new(ExprType::nothing()), specials)
            };
            Ok(ExprType::CompositeVal(Box::new(full), Box::new(special)))
        }

        Expr::Constr { args, .. } => Ok(ExprType::ComposeSequence(lookup_all(env, args)?)),

        Expr::Builtin { op, args } => Ok(ExprType::Op(
            ContribOp::Builtin(*op),
            Box::new(ExprType::ComposeSequence(lookup_all(env, args)?)),
        )),

        Expr::Fun {
            param,
            param_ty,
            body,
        } => {
            // A function-typed parameter is itself an opaque function
            // value; a first-order parameter contributes linearly.
            let param_et = if param_ty.is_fun() {
                ExprType::Fun(FunDesc::new(
                    (0..param_ty.fun_arity()).collect(),
                    FunDef::FormalParam(fp_count),
                ))
            } else {
                ExprType::single_source(ContribSource::FormalParam(fp_count))
            };
            let sig = IdentSig::new(param_et).with_shadow(env.shadow_status_for(param));
            let env = env.bind_ident(param, sig);
            let body_et = eval_expr(&env, registry, fp_count + 1, body)?;
            Ok(ExprType::Fun(FunDesc::new(
                vec![fp_count],
                FunDef::Expr(Box::new(body_et)),
            )))
        }

        Expr::App { func, args } => {
            let arg_ets = lookup_all(env, args)?;
            match env.expr_type(func)? {
                ExprType::Fun(desc) => Ok(ExprType::App(desc.clone(), arg_ets)),
                // An unknown callee is an unknown function of the right
                // arity: nested lambdas with an unknown innermost body.
                ExprType::Unknown => Ok(ExprType::App(unknown_fun(args.len()), arg_ets)),
                // A curried partial application of an opaque function may
                // itself be applied: extend the pending argument list.
                ExprType::App(desc, pending) => {
                    let mut all = pending.clone();
                    all.extend(arg_ets);
                    Ok(ExprType::App(desc.clone(), all))
                }
                other => Err(AnalysisError::NotAFunction {
                    name: func.name.clone(),
                    found: other.to_string(),
                    span: Some(func.span),
                }),
            }
        }

        Expr::MatchExpr {
            scrutinee,
            scrutinee_ty,
            clauses,
        } => {
            let scrut_et = env.expr_type(scrutinee)?.clone();
            let mut clause_ets = Vec::with_capacity(clauses.len());
            for (pattern, body) in clauses {
                let mut clause_env = env.clone();
                for binder in pattern.binders() {
                    let sig = IdentSig::new(scrut_et.clone())
                        .with_shadow(clause_env.shadow_status_for(binder));
                    clause_env = clause_env.bind_ident(binder, sig);
                }
                clause_ets.push(eval_expr(&clause_env, registry, fp_count, body)?);
            }
            let cond = if registry.is_spurious_expr(env, scrutinee_ty, clauses) {
                ExprType::nothing()
            } else {
                ExprType::Op(ContribOp::Conditional, Box::new(scrut_et))
            };
            Ok(ExprType::ComposeParallel(Box::new(cond), clause_ets))
        }

        Expr::TFun { body, .. } => eval_expr(env, registry, fp_count, body),

        Expr::TApp { func, .. } => Ok(env.expr_type(func)?.clone()),

        Expr::Fixpoint { .. } => Err(AnalysisError::FixpointUnsupported {
            span: Some(node.span),
        }),
    }
}

fn lookup_all(env: &AnalysisEnv, args: &[Ident]) -> Result<Vec<ExprType>, AnalysisError> {
    args.iter()
        .map(|a| env.expr_type(a).cloned())
        .collect()
}

/// An unknown function of the given arity: nested single-parameter lambdas
/// whose innermost body is `Unknown`.
fn unknown_fun(arity: usize) -> FunDesc {
    let mut body = ExprType::Unknown;
    for level in (1..arity).rev() {
        body = ExprType::Fun(FunDesc::new(vec![level], FunDef::Expr(Box::new(body))));
    }
    FunDesc::new(vec![0], FunDef::Expr(Box::new(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pangolin_ast::{BuiltinOp, IntWidth, Literal, MsgEntry, Pattern, PrimType, SType};
    use pangolin_ir::{normalize, Cardinality, Precision, Pseudofield};

    fn id(s: &str) -> Ident {
        Ident::unspanned(s)
    }

    fn registry() -> PcmRegistry {
        PcmRegistry::default()
    }

    fn env_with(bindings: &[(&str, ExprType)]) -> AnalysisEnv {
        let mut env = AnalysisEnv::new();
        for (name, et) in bindings {
            env = env.bind_ident(&id(name), IdentSig::new(et.clone()));
        }
        env
    }

    #[test]
    fn literal_contributes_itself_linearly() {
        let node = ExprNode::unspanned(Expr::Lit(Literal::int(IntWidth::W32, 7)));
        let et = eval_expr(&AnalysisEnv::new(), &registry(), 0, &node).unwrap();
        let expected =
            ExprType::single_source(ContribSource::Literal(Literal::int(IntWidth::W32, 7)));
        assert_eq!(et, expected);
    }

    #[test]
    fn unbound_variable_is_a_structural_error() {
        let node = ExprNode::unspanned(Expr::Var(id("nope")));
        let err = eval_expr(&AnalysisEnv::new(), &registry(), 0, &node).unwrap_err();
        assert!(matches!(err, AnalysisError::UnboundIdentifier { .. }));
    }

    #[test]
    fn lambda_over_first_order_parameter() {
        // fun (a : Uint128) => builtin add a a
        let node = ExprNode::unspanned(Expr::Fun {
            param: id("a"),
            param_ty: SType::Prim(PrimType::Uint128),
            body: Box::new(ExprNode::unspanned(Expr::Builtin {
                op: BuiltinOp::Add,
                args: vec![id("a"), id("a")],
            })),
        });
        let et = eval_expr(&AnalysisEnv::new(), &registry(), 0, &node).unwrap();
        let n = normalize(&et).unwrap();
        let ExprType::Fun(desc) = n else {
            panic!("expected Fun, got {n}");
        };
        assert_eq!(desc.levels, vec![0]);
        let FunDef::Expr(body) = desc.def else {
            panic!("expected known body");
        };
        let ExprType::Val(kc) = *body else {
            panic!("expected Val body");
        };
        let sum = kc
            .contributions
            .get(&ContribSource::FormalParam(0))
            .expect("parameter flows into body");
        assert_eq!(sum.cardinality, Cardinality::NonLinear);
    }

    #[test]
    fn function_typed_parameter_is_opaque() {
        // fun (f : Uint128 -> Uint128) => f
        let fun_ty = SType::Fun(
            Box::new(SType::Prim(PrimType::Uint128)),
            Box::new(SType::Prim(PrimType::Uint128)),
        );
        let node = ExprNode::unspanned(Expr::Fun {
            param: id("f"),
            param_ty: fun_ty,
            body: Box::new(ExprNode::unspanned(Expr::Var(id("f")))),
        });
        let et = eval_expr(&AnalysisEnv::new(), &registry(), 0, &node).unwrap();
        let ExprType::Fun(outer) = et else {
            panic!("expected Fun");
        };
        let FunDef::Expr(body) = outer.def else {
            panic!("expected known body");
        };
        assert_eq!(
            *body,
            ExprType::Fun(FunDesc::new(vec![0], FunDef::FormalParam(0)))
        );
    }

    #[test]
    fn application_of_unknown_callee_normalizes_to_unknown() {
        let env = env_with(&[
            ("g", ExprType::Unknown),
            ("x", ExprType::single_source(ContribSource::ProcParam(0))),
        ]);
        let node = ExprNode::unspanned(Expr::App {
            func: id("g"),
            args: vec![id("x")],
        });
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        assert!(matches!(et, ExprType::App(..)));
        assert_eq!(normalize(&et).unwrap(), ExprType::Unknown);
    }

    #[test]
    fn application_of_non_function_is_a_structural_error() {
        let env = env_with(&[("x", ExprType::nothing())]);
        let node = ExprNode::unspanned(Expr::App {
            func: id("x"),
            args: vec![id("x")],
        });
        let err = eval_expr(&env, &registry(), 0, &node).unwrap_err();
        assert!(matches!(err, AnalysisError::NotAFunction { .. }));
    }

    #[test]
    fn message_with_zero_amount_and_param_recipient() {
        let env = env_with(&[
            ("to", ExprType::single_source(ContribSource::ProcParam(3))),
            ("zero", ExprType::single_source(ContribSource::Literal(
                Literal::uint(IntWidth::W128, 0),
            ))),
        ]);
        // `zero` is bound to the unit literal in a real program; mark it.
        let env = {
            let sig = IdentSig::new(env.expr_type(&id("zero")).unwrap().clone())
                .with_units(["integer_add".to_string()].into_iter().collect());
            env.bind_ident(&id("zero"), sig)
        };
        let node = ExprNode::unspanned(Expr::Message(vec![
            MsgEntry {
                label: "_recipient".into(),
                payload: MsgPayload::Var(id("to")),
            },
            MsgEntry {
                label: "_amount".into(),
                payload: MsgPayload::Var(id("zero")),
            },
            MsgEntry {
                label: "_tag".into(),
                payload: MsgPayload::Lit(Literal::Str("notify".into())),
            },
        ]));
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        let n = normalize(&et).unwrap();
        let ExprType::CompositeVal(_, special) = n else {
            panic!("expected CompositeVal, got {n}");
        };
        let ExprType::Val(kc) = *special else {
            panic!("expected Val special part");
        };
        // Zero amount proven: precision stays exact, recipient is the
        // parameter.
        assert_eq!(kc.precision, Precision::Exactly);
        assert!(kc.contributions.contains(&ContribSource::ProcParam(3)));
    }

    #[test]
    fn message_with_unproven_amount_is_subset_precision() {
        let env = env_with(&[
            ("to", ExprType::single_source(ContribSource::ProcParam(3))),
            ("amt", ExprType::single_source(ContribSource::ProcParam(4))),
        ]);
        let node = ExprNode::unspanned(Expr::Message(vec![
            MsgEntry {
                label: "_recipient".into(),
                payload: MsgPayload::Var(id("to")),
            },
            MsgEntry {
                label: "_amount".into(),
                payload: MsgPayload::Var(id("amt")),
            },
        ]));
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        let n = normalize(&et).unwrap();
        let ExprType::CompositeVal(_, special) = n else {
            panic!("expected CompositeVal");
        };
        let ExprType::Val(kc) = *special else {
            panic!("expected Val special part");
        };
        assert_eq!(kc.precision, Precision::SubsetOf);
    }

    #[test]
    fn spurious_option_match_has_nothing_condition() {
        let pf = Pseudofield::map(id("counts"), vec![id("k")]);
        let scrut = ExprType::single_source(ContribSource::Pseudofield(pf));
        let env = env_with(&[("opt", scrut.clone()), ("y", ExprType::nothing())]);
        let clauses = vec![
            (
                Pattern::Constructor {
                    name: "Some".into(),
                    args: vec![Pattern::Binder(id("x"))],
                },
                ExprNode::unspanned(Expr::Builtin {
                    op: BuiltinOp::Add,
                    args: vec![id("x"), id("y")],
                }),
            ),
            (
                Pattern::Constructor {
                    name: "None".into(),
                    args: vec![],
                },
                ExprNode::unspanned(Expr::Var(id("y"))),
            ),
        ];
        let node = ExprNode::unspanned(Expr::MatchExpr {
            scrutinee: id("opt"),
            scrutinee_ty: SType::Adt("Option".into(), vec![SType::Prim(PrimType::Uint128)]),
            clauses,
        });
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        let ExprType::ComposeParallel(cond, _) = et else {
            panic!("expected ComposeParallel");
        };
        assert!(cond.is_nothing());
    }

    #[test]
    fn non_spurious_match_conditions_on_scrutinee() {
        let scrut = ExprType::single_source(ContribSource::ProcParam(0));
        let env = env_with(&[("b", scrut.clone())]);
        let clauses = vec![
            (
                Pattern::Constructor {
                    name: "True".into(),
                    args: vec![],
                },
                ExprNode::unspanned(Expr::Lit(Literal::int(IntWidth::W32, 1))),
            ),
            (
                Pattern::Constructor {
                    name: "False".into(),
                    args: vec![],
                },
                ExprNode::unspanned(Expr::Lit(Literal::int(IntWidth::W32, 2))),
            ),
        ];
        let node = ExprNode::unspanned(Expr::MatchExpr {
            scrutinee: id("b"),
            scrutinee_ty: SType::Adt("Bool".into(), vec![]),
            clauses,
        });
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        let n = normalize(&et).unwrap();
        let ExprType::Val(kc) = n else {
            panic!("expected Val");
        };
        assert_eq!(kc.precision, Precision::SubsetOf);
        let sum = kc.contributions.get(&ContribSource::ProcParam(0)).unwrap();
        assert!(sum.ops.contains(&pangolin_ir::ContribOp::Conditional));
    }

    #[test]
    fn fixpoint_is_fatal() {
        let node = ExprNode::unspanned(Expr::Fixpoint {
            name: id("rec"),
            ty: SType::Prim(PrimType::Uint128),
            body: Box::new(ExprNode::unspanned(Expr::Var(id("rec")))),
        });
        let err = eval_expr(&AnalysisEnv::new(), &registry(), 0, &node).unwrap_err();
        assert!(matches!(err, AnalysisError::FixpointUnsupported { .. }));
    }

    #[test]
    fn let_tracks_pcm_units() {
        // let zero = Uint128 0 in { _amount: zero; _recipient: to }
        let env = env_with(&[(
            "to",
            ExprType::single_source(ContribSource::ProcParam(3)),
        )]);
        let node = ExprNode::unspanned(Expr::Let {
            lhs: id("zero"),
            ty: None,
            rhs: Box::new(ExprNode::unspanned(Expr::Lit(Literal::uint(
                IntWidth::W128,
                0,
            )))),
            body: Box::new(ExprNode::unspanned(Expr::Message(vec![
                MsgEntry {
                    label: "_amount".into(),
                    payload: MsgPayload::Var(id("zero")),
                },
                MsgEntry {
                    label: "_recipient".into(),
                    payload: MsgPayload::Var(id("to")),
                },
            ]))),
        });
        let et = eval_expr(&env, &registry(), 0, &node).unwrap();
        let n = normalize(&et).unwrap();
        let ExprType::CompositeVal(_, special) = n else {
            panic!("expected CompositeVal");
        };
        let ExprType::Val(kc) = *special else {
            panic!("expected Val");
        };
        assert_eq!(kc.precision, Precision::Exactly, "zero amount is proven");
    }
}
