//! Constraint synthesis: reduce a transition's effect summary to a
//! deterministic set of sharding constraints.

use pangolin_ast::{Ident, SType};
use pangolin_ir::{
    canonicalize, Cardinality, ComponentOp, ComponentSummary, ContribSource, ExprType,
    KnownContrib, Precision, Pseudofield, ShardingConstraint,
};

use crate::pcm::PcmRegistry;
use crate::pipeline::BALANCE_FIELD;

/// Synthesize the sharding constraints of one transition.
///
/// `params` is the transition's full parameter list, implicit parameters
/// prepended, so map-key identifiers can be resolved to parameter indices.
pub fn synthesize_constraints(
    summary: &ComponentSummary,
    registry: &PcmRegistry,
    params: &[(Ident, SType)],
) -> Vec<ShardingConstraint> {
    if summary.has_always_exclusive() {
        return vec![ShardingConstraint::Unsat];
    }

    // Sends must have a fully known special part, and we only reason about
    // recipients that are component parameters.
    let mut send_specials: Vec<&KnownContrib> = Vec::new();
    for op in summary.iter() {
        if let ComponentOp::SendMessages(et) = op {
            let ExprType::CompositeVal(_, special) = et else {
                return vec![ShardingConstraint::Unsat];
            };
            let ExprType::Val(kc) = &**special else {
                return vec![ShardingConstraint::Unsat];
            };
            if special.is_unknown() {
                return vec![ShardingConstraint::Unsat];
            }
            for (src, _) in kc.contributions.iter() {
                if !matches!(src, ContribSource::ProcParam(_)) {
                    return vec![ShardingConstraint::Unsat];
                }
            }
            send_specials.push(kc);
        }
    }

    let mut out: Vec<ShardingConstraint> = Vec::new();

    if summary.iter().any(|op| matches!(op, ComponentOp::AcceptMoney)) {
        out.push(ShardingConstraint::SenderShard);
    }

    // A `SubsetOf` special part means the zero-amount proof failed: the
    // transition may move money and must own the balance.
    if send_specials
        .iter()
        .any(|kc| kc.precision == Precision::SubsetOf)
    {
        out.push(ShardingConstraint::must_own(Pseudofield::field(
            Ident::unspanned(BALANCE_FIELD),
        )));
    }
    for kc in &send_specials {
        for (src, _) in kc.contributions.iter() {
            if let ContribSource::ProcParam(i) = src {
                out.push(ShardingConstraint::AddrMustBeNonContract { param_index: *i });
            }
        }
    }

    // Commutative writes need a PCM, not ownership.
    let ops = summary.ops();
    let mut commutative = vec![false; ops.len()];
    for (idx, op) in ops.iter().enumerate() {
        let ComponentOp::Write(pf, et) = op else {
            continue;
        };
        if let Some(pcm_id) = commutative_write_pcm(pf, et, registry) {
            commutative[idx] = true;
            out.push(ShardingConstraint::MustHavePcm {
                pseudofield: pf.clone(),
                pcm: pcm_id.to_string(),
            });
        }
    }

    // Everything a non-commutative effect can still observe.
    let residual: Vec<&ComponentOp> = ops
        .iter()
        .enumerate()
        .filter(|(idx, op)| {
            matches!(
                op,
                ComponentOp::ConditionOn(_)
                    | ComponentOp::EmitEvent(_)
                    | ComponentOp::SendMessages(_)
            ) || (matches!(op, ComponentOp::Write(..)) && !commutative[*idx])
        })
        .map(|(_, op)| op)
        .collect();
    let residual_has_unknown = residual
        .iter()
        .filter_map(|op| op.expr_type())
        .any(ExprType::is_unknown);

    for (idx, op) in ops.iter().enumerate() {
        match op {
            ComponentOp::Read(pf) => {
                // A read is spurious when its value flows only into
                // commutative writes (or nowhere). Unknown downstream
                // expression types are conservatively assumed to use it.
                let used = residual_has_unknown
                    || residual.iter().any(|r| {
                        r.expr_type()
                            .map(|et| et.pseudofield_sources().contains(&pf))
                            .unwrap_or(false)
                    });
                if used {
                    out.push(ShardingConstraint::must_own(pf.clone()));
                }
            }
            ComponentOp::Write(pf, et) => {
                if !commutative[idx] {
                    out.push(ShardingConstraint::must_own(pf.clone()));
                    for src_pf in et.pseudofield_sources() {
                        out.push(ShardingConstraint::must_own(src_pf.clone()));
                    }
                }
            }
            ComponentOp::ConditionOn(et) => {
                for src_pf in et.pseudofield_sources() {
                    out.push(ShardingConstraint::must_own(src_pf.clone()));
                }
            }
            _ => {}
        }
    }

    // Distinct parameters used as map keys must not alias at runtime.
    let key_indices = map_key_param_indices(summary, params);
    if key_indices.len() >= 2 {
        out.push(ShardingConstraint::MustNotHaveDuplicates {
            param_indices: key_indices,
        });
    }

    canonicalize(out)
}

/// The PCM identifier under which this write commutes, if any: the write's
/// value must be exact, and its field-restricted contributions must be
/// exactly the written location itself, linearly, under a single operator
/// that some PCM recognizes as its operation.
fn commutative_write_pcm<'r>(
    pf: &Pseudofield,
    et: &ExprType,
    registry: &'r PcmRegistry,
) -> Option<&'r str> {
    let ExprType::Val(kc) = et else {
        return None;
    };
    if kc.precision != Precision::Exactly {
        return None;
    }
    let field_contribs: Vec<_> = kc
        .contributions
        .iter()
        .filter_map(|(src, sum)| match src {
            ContribSource::Pseudofield(src_pf) => Some((src_pf, sum)),
            _ => None,
        })
        .collect();
    let [(src_pf, sum)] = field_contribs.as_slice() else {
        return None;
    };
    if *src_pf != pf || sum.cardinality != Cardinality::Linear || sum.ops.len() != 1 {
        return None;
    }
    let op = sum.ops.iter().next()?;
    registry.pcm_for_op(op).map(|pcm| pcm.identifier())
}

/// Sorted, deduplicated indices of the component parameters used as map
/// keys anywhere in the summary.
fn map_key_param_indices(summary: &ComponentSummary, params: &[(Ident, SType)]) -> Vec<usize> {
    let mut indices: Vec<usize> = Vec::new();
    let mut add_keys = |pf: &Pseudofield| {
        if let Some(keys) = &pf.keys {
            for key in keys {
                if let Some(pos) = params.iter().position(|(p, _)| p == key) {
                    indices.push(pos);
                }
            }
        }
    };
    for op in summary.iter() {
        if let Some(pf) = op.target() {
            add_keys(pf);
        }
        if let Some(et) = op.expr_type() {
            for pf in et.pseudofield_sources() {
                add_keys(pf);
            }
        }
    }
    indices.sort_unstable();
    indices.dedup();
    indices
}
