//! Proptest strategies for generating contribution-domain values and
//! expression types for property testing.

use proptest::prelude::*;

use pangolin_ast::{BuiltinOp, Ident, IntWidth, Literal};

use crate::contribution::{
    Cardinality, ContribOp, ContribSource, ContribSummary, Contributions, KnownContrib, Precision,
    Pseudofield,
};
use crate::exprtype::{ExprType, FunDef, FunDesc};

pub fn arb_cardinality() -> impl Strategy<Value = Cardinality> {
    prop_oneof![
        Just(Cardinality::None),
        Just(Cardinality::Linear),
        Just(Cardinality::NonLinear),
    ]
}

pub fn arb_builtin_op() -> impl Strategy<Value = BuiltinOp> {
    prop_oneof![
        Just(BuiltinOp::Add),
        Just(BuiltinOp::Sub),
        Just(BuiltinOp::Mul),
        Just(BuiltinOp::Lt),
        Just(BuiltinOp::Eq),
        Just(BuiltinOp::Concat),
    ]
}

pub fn arb_contrib_op() -> impl Strategy<Value = ContribOp> {
    prop_oneof![
        arb_builtin_op().prop_map(ContribOp::Builtin),
        Just(ContribOp::Conditional),
    ]
}

/// A contribution source. Generates the occasional `Unknown` so that
/// unknown-propagation properties get exercised.
pub fn arb_contrib_source() -> impl Strategy<Value = ContribSource> {
    prop_oneof![
        1 => Just(ContribSource::Unknown),
        3 => (0i128..100).prop_map(|v| ContribSource::Literal(Literal::int(IntWidth::W32, v))),
        3 => "[a-d]{1,4}".prop_map(|n| ContribSource::ContractParam(Ident::unspanned(n))),
        4 => "[e-h]{1,4}".prop_map(|n| {
            ContribSource::Pseudofield(Pseudofield::field(Ident::unspanned(n)))
        }),
        3 => (0usize..4).prop_map(ContribSource::FormalParam),
        3 => (0usize..4).prop_map(ContribSource::ProcParam),
    ]
}

/// A contribution source that is never `Unknown` and never a parameter
/// marker, for properties over fully-evaluated values.
pub fn arb_ground_source() -> impl Strategy<Value = ContribSource> {
    prop_oneof![
        (0i128..100).prop_map(|v| ContribSource::Literal(Literal::int(IntWidth::W32, v))),
        "[a-d]{1,4}".prop_map(|n| ContribSource::ContractParam(Ident::unspanned(n))),
        "[e-h]{1,4}".prop_map(|n| {
            ContribSource::Pseudofield(Pseudofield::field(Ident::unspanned(n)))
        }),
    ]
}

pub fn arb_contrib_summary() -> impl Strategy<Value = ContribSummary> {
    (
        arb_cardinality(),
        proptest::collection::btree_set(arb_contrib_op(), 0..3),
    )
        .prop_map(|(cardinality, ops)| ContribSummary { cardinality, ops })
}

pub fn arb_contributions(
    source: impl Strategy<Value = ContribSource>,
) -> impl Strategy<Value = Contributions> {
    proptest::collection::vec((source, arb_contrib_summary()), 0..4)
        .prop_map(|pairs| pairs.into_iter().collect())
}

pub fn arb_precision() -> impl Strategy<Value = Precision> {
    prop_oneof![Just(Precision::Exactly), Just(Precision::SubsetOf)]
}

pub fn arb_known_contrib() -> impl Strategy<Value = KnownContrib> {
    (arb_precision(), arb_contributions(arb_contrib_source()))
        .prop_map(|(precision, contributions)| KnownContrib {
            precision,
            contributions,
        })
}

fn arb_val() -> impl Strategy<Value = ExprType> {
    arb_known_contrib().prop_map(ExprType::Val)
}

/// An arbitrary expression type of bounded depth.
///
/// Applications are built over known lambda bodies with small de Bruijn
/// levels, so beta-reduction paths get exercised alongside the pending
/// compositions.
pub fn arb_expr_type() -> impl Strategy<Value = ExprType> {
    let leaf = prop_oneof![
        1 => Just(ExprType::Unknown),
        6 => arb_val(),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (arb_contrib_op(), inner.clone())
                .prop_map(|(op, et)| ExprType::Op(op, Box::new(et))),
            proptest::collection::vec(inner.clone(), 0..3).prop_map(ExprType::ComposeSequence),
            (inner.clone(), proptest::collection::vec(inner.clone(), 1..3))
                .prop_map(|(cond, cls)| ExprType::ComposeParallel(Box::new(cond), cls)),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| ExprType::CompositeVal(Box::new(a), Box::new(b))),
            (0usize..3, inner.clone()).prop_map(|(level, body)| {
                ExprType::Fun(FunDesc::new(vec![level], FunDef::Expr(Box::new(body))))
            }),
            (0usize..3, inner.clone(), proptest::collection::vec(inner, 1..3)).prop_map(
                |(level, body, args)| {
                    ExprType::App(FunDesc::new(vec![level], FunDef::Expr(Box::new(body))), args)
                }
            ),
        ]
    })
}

/// Expression types without applications or parallel branches, over ground
/// sources: normalization of these only distributes operators and unions
/// operator sets, so operator-preservation properties hold exactly.
pub fn arb_additive_expr_type() -> impl Strategy<Value = ExprType> {
    let leaf = (arb_precision(), arb_contributions(arb_ground_source())).prop_map(|(p, c)| {
        ExprType::Val(KnownContrib {
            precision: p,
            contributions: c,
        })
    });
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (arb_contrib_op(), inner.clone())
                .prop_map(|(op, et)| ExprType::Op(op, Box::new(et))),
            proptest::collection::vec(inner, 1..3).prop_map(ExprType::ComposeSequence),
        ]
    })
}
