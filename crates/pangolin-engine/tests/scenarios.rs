//! End-to-end analysis scenarios over literal contract modules.

mod common;
use common::*;

use pangolin_ast::{BuiltinOp, Expr, Literal, Stmt};
use pangolin_ir::{ComponentOp, Pseudofield, ShardingConstraint};

use pangolin_engine::{analyze_module, PcmRegistry, BALANCE_FIELD};

fn counter_pf() -> Pseudofield {
    Pseudofield::field(id("counter"))
}

#[test]
fn plain_increment_is_commutative() {
    let m = module(
        "Counter",
        vec![scalar_field("counter", int32())],
        vec![transition(
            "Incr",
            vec![],
            vec![
                load("v", "counter"),
                bind("one", lit_i32(1)),
                bind("v2", builtin(BuiltinOp::Add, &["v", "one"])),
                store("counter", "v2"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Incr").expect("Incr is reported");

    assert!(t.summary.contains(&ComponentOp::Read(counter_pf())));
    assert!(t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::Write(pf, _) if *pf == counter_pf())));

    // The write is commutative under integer addition and the read feeds
    // only that write, so no ownership is required.
    assert_eq!(
        t.constraints,
        vec![ShardingConstraint::MustHavePcm {
            pseudofield: counter_pf(),
            pcm: "integer_add".into(),
        }]
    );
}

#[test]
fn conditional_write_requires_ownership() {
    let mut m = module(
        "Bank",
        vec![map_field("balance", bystr20(), uint128())],
        vec![transition(
            "Withdraw",
            vec![("new_val", uint128())],
            vec![
                map_get("x", "balance", &["_sender"]),
                bind("c", builtin(BuiltinOp::Lt, &["x", "threshold"])),
                match_stmt(
                    "c",
                    bool_ty(),
                    vec![
                        nullary_clause(
                            "True",
                            vec![map_update("balance", &["_sender"], "new_val")],
                        ),
                        nullary_clause("False", vec![]),
                    ],
                ),
            ],
        )],
    );
    m.params = vec![(id("threshold"), uint128())];

    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Withdraw").expect("Withdraw is reported");

    let sender_balance = Pseudofield::map(id("balance"), vec![id("_sender")]);
    assert!(t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::ConditionOn(_))));
    assert_eq!(
        t.constraints,
        vec![ShardingConstraint::must_own(sender_balance)]
    );
}

#[test]
fn accepting_money_pins_to_sender_shard() {
    let m = module(
        "Vault",
        vec![],
        vec![transition("Deposit", vec![], vec![accept()])],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Deposit").expect("Deposit is reported");
    assert_eq!(t.constraints, vec![ShardingConstraint::SenderShard]);
}

#[test]
fn send_to_parameter_address_with_zero_amount() {
    let m = module(
        "Notifier",
        vec![],
        vec![transition(
            "Transfer",
            vec![("to", bystr20())],
            vec![
                bind("zero", lit_u128(0)),
                bind(
                    "m",
                    Expr::Message(vec![
                        msg_entry_var("_recipient", "to"),
                        msg_entry_var("_amount", "zero"),
                        msg_entry_lit("_tag", Literal::Str("notify".into())),
                    ]),
                ),
                send("m"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Transfer").expect("Transfer is reported");

    // `to` sits after the three implicit parameters.
    assert_eq!(
        t.constraints,
        vec![ShardingConstraint::AddrMustBeNonContract { param_index: 3 }]
    );
}

#[test]
fn send_with_unproven_amount_requires_balance_ownership() {
    let m = module(
        "Payer",
        vec![],
        vec![transition(
            "Pay",
            vec![("to", bystr20()), ("amt", uint128())],
            vec![
                bind(
                    "m",
                    Expr::Message(vec![
                        msg_entry_var("_recipient", "to"),
                        msg_entry_var("_amount", "amt"),
                    ]),
                ),
                send("m"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Pay").expect("Pay is reported");
    assert_eq!(
        t.constraints,
        vec![
            ShardingConstraint::must_own(Pseudofield::field(id(BALANCE_FIELD))),
            ShardingConstraint::AddrMustBeNonContract { param_index: 3 },
        ]
    );
}

#[test]
fn send_to_library_constant_is_unsat() {
    let lib = library(
        "NotifierLib",
        vec![lib_var(
            "owner",
            bystr20(),
            Expr::Lit(Literal::Addr(
                "0x1234567890123456789012345678901234567890".into(),
            )),
        )],
    );
    let m = module_with_library(
        "Notifier",
        Some(lib),
        vec![],
        vec![transition(
            "Alert",
            vec![],
            vec![
                bind("zero", lit_u128(0)),
                bind(
                    "m",
                    Expr::Message(vec![
                        msg_entry_var("_recipient", "owner"),
                        msg_entry_var("_amount", "zero"),
                    ]),
                ),
                send("m"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Alert").expect("Alert is reported");
    assert_eq!(t.constraints, vec![ShardingConstraint::Unsat]);
    assert!(t.is_unsat());
}

#[test]
fn spurious_option_match_write_is_commutative() {
    let m = module(
        "Tally",
        vec![map_field("counts", bystr20(), uint128())],
        vec![transition(
            "Bump",
            vec![("k", bystr20()), ("d", uint128())],
            vec![
                map_get("opt", "counts", &["k"]),
                match_stmt(
                    "opt",
                    option_of(uint128()),
                    vec![
                        some_clause(
                            "x",
                            vec![
                                bind("y", builtin(BuiltinOp::Add, &["x", "d"])),
                                map_update("counts", &["k"], "y"),
                            ],
                        ),
                        none_clause(vec![map_update("counts", &["k"], "d")]),
                    ],
                ),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Bump").expect("Bump is reported");

    let counts_k = Pseudofield::map(id("counts"), vec![id("k")]);
    assert!(t.summary.contains(&ComponentOp::Read(counts_k.clone())));
    assert!(t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::Write(pf, _) if *pf == counts_k)));
    // The spurious match contributes no condition.
    assert!(!t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::ConditionOn(_))));

    assert_eq!(
        t.constraints,
        vec![ShardingConstraint::MustHavePcm {
            pseudofield: counts_k,
            pcm: "integer_add".into(),
        }]
    );
}

#[test]
fn spurious_option_match_expression_preserves_commutativity() {
    // The expression-level unit idiom: the match collapses to the
    // scrutinee, so the increment stays a single PCM operation.
    let m = module(
        "Tally",
        vec![map_field("counts", bystr20(), uint128())],
        vec![transition(
            "Bump",
            vec![("k", bystr20()), ("d", uint128())],
            vec![
                bind("zero", lit_u128(0)),
                map_get("opt", "counts", &["k"]),
                bind(
                    "v",
                    Expr::MatchExpr {
                        scrutinee: id("opt"),
                        scrutinee_ty: option_of(uint128()),
                        clauses: vec![
                            (
                                pangolin_ast::Pattern::Constructor {
                                    name: "Some".into(),
                                    args: vec![pangolin_ast::Pattern::Binder(id("x"))],
                                },
                                e(var("x")),
                            ),
                            (
                                pangolin_ast::Pattern::Constructor {
                                    name: "None".into(),
                                    args: vec![],
                                },
                                e(var("zero")),
                            ),
                        ],
                    },
                ),
                bind("y", builtin(BuiltinOp::Add, &["v", "d"])),
                map_update("counts", &["k"], "y"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Bump").expect("Bump is reported");
    let counts_k = Pseudofield::map(id("counts"), vec![id("k")]);
    assert_eq!(
        t.constraints,
        vec![ShardingConstraint::MustHavePcm {
            pseudofield: counts_k,
            pcm: "integer_add".into(),
        }]
    );
}

#[test]
fn read_after_write_is_always_exclusive() {
    let m = module(
        "Counter",
        vec![scalar_field("counter", int32())],
        vec![transition(
            "Reset",
            vec![],
            vec![
                bind("one", lit_i32(1)),
                store("counter", "one"),
                load("v", "counter"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Reset").expect("Reset is reported");
    assert!(t.summary.has_always_exclusive());
    assert_eq!(t.constraints, vec![ShardingConstraint::Unsat]);
}

#[test]
fn non_bottom_map_access_is_always_exclusive() {
    // Fetching a whole submap does not reach the bottom level.
    let m = module(
        "Nested",
        vec![map_field("allowances", bystr20(), map_of(bystr20(), uint128()))],
        vec![transition(
            "Inspect",
            vec![],
            vec![map_get("sub", "allowances", &["_sender"])],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Inspect").expect("Inspect is reported");
    assert_eq!(t.constraints, vec![ShardingConstraint::Unsat]);
}

#[test]
fn shadowed_key_parameter_is_always_exclusive() {
    let m = module(
        "Tally",
        vec![map_field("counts", bystr20(), uint128())],
        vec![transition(
            "Bump",
            vec![("k", bystr20()), ("d", uint128())],
            vec![
                // `k` no longer names the transition parameter.
                bind(
                    "k",
                    Expr::Lit(Literal::Addr(
                        "0x0000000000000000000000000000000000000000".into(),
                    )),
                ),
                map_update("counts", &["k"], "d"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Bump").expect("Bump is reported");
    assert_eq!(t.constraints, vec![ShardingConstraint::Unsat]);
}

#[test]
fn iteration_is_always_exclusive() {
    let list_of_uint128 = pangolin_ast::SType::Adt("List".into(), vec![uint128()]);
    let m = module(
        "Walker",
        vec![],
        vec![
            procedure("Visit", vec![("entry", uint128())], vec![]),
            transition(
                "WalkAll",
                vec![("entries", list_of_uint128)],
                vec![sp(Stmt::Iterate {
                    list: id("entries"),
                    proc: id("Visit"),
                })],
            ),
        ],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("WalkAll").expect("WalkAll is reported");
    assert_eq!(t.constraints, vec![ShardingConstraint::Unsat]);
}

#[test]
fn two_distinct_key_parameters_must_not_alias() {
    let m = module(
        "Ledger",
        vec![map_field("balance", bystr20(), uint128())],
        vec![transition(
            "Move",
            vec![("from", bystr20()), ("to", bystr20()), ("amt", uint128())],
            vec![
                map_update("balance", &["from"], "amt"),
                map_update("balance", &["to"], "amt"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Move").expect("Move is reported");
    assert!(t.constraints.contains(&ShardingConstraint::MustNotHaveDuplicates {
        param_indices: vec![3, 4]
    }));
    assert!(t
        .constraints
        .contains(&ShardingConstraint::must_own(Pseudofield::map(
            id("balance"),
            vec![id("from")]
        ))));
    assert!(t
        .constraints
        .contains(&ShardingConstraint::must_own(Pseudofield::map(
            id("balance"),
            vec![id("to")]
        ))));
}

#[test]
fn map_key_deletion_is_an_owning_write() {
    let m = module(
        "Tally",
        vec![map_field("counts", bystr20(), uint128())],
        vec![transition(
            "Forget",
            vec![("k", bystr20())],
            vec![sp(Stmt::MapUpdate {
                map: id("counts"),
                keys: vec![id("k")],
                rhs: None,
            })],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Forget").expect("Forget is reported");
    let counts_k = Pseudofield::map(id("counts"), vec![id("k")]);
    assert_eq!(t.constraints, vec![ShardingConstraint::must_own(counts_k)]);
}

#[test]
fn event_payload_keeps_the_read_owned() {
    let m = module(
        "Counter",
        vec![scalar_field("counter", int32())],
        vec![transition(
            "Announce",
            vec![],
            vec![
                sp(Stmt::ReadFromBC {
                    lhs: id("blk"),
                    query: "BLOCKNUMBER".into(),
                }),
                load("v", "counter"),
                bind(
                    "ev",
                    Expr::Message(vec![
                        msg_entry_lit("_eventname", Literal::Str("Count".into())),
                        msg_entry_var("value", "v"),
                        msg_entry_var("at_block", "blk"),
                    ]),
                ),
                sp(Stmt::CreateEvnt(id("ev"))),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Announce").expect("Announce is reported");
    assert!(t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::EmitEvent(_))));
    // The counter flows into the event payload, so the read is not
    // spurious.
    assert_eq!(t.constraints, vec![ShardingConstraint::must_own(counter_pf())]);
}

#[test]
fn throw_keeps_subsequent_effects() {
    let m = module(
        "Thrower",
        vec![scalar_field("counter", int32())],
        vec![transition(
            "Touch",
            vec![],
            vec![
                sp(Stmt::Throw(None)),
                bind("one", lit_i32(1)),
                store("counter", "one"),
            ],
        )],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let t = report.transition("Touch").expect("Touch is reported");
    assert!(t
        .summary
        .iter()
        .any(|op| matches!(op, ComponentOp::Write(pf, _) if *pf == counter_pf())));
    assert_eq!(t.constraints, vec![ShardingConstraint::must_own(counter_pf())]);
}

#[test]
fn reports_serialize_and_render() {
    let m = module(
        "Counter",
        vec![scalar_field("counter", int32())],
        vec![transition("Deposit", vec![], vec![accept()])],
    );
    let report = analyze_module(&m, &PcmRegistry::default()).expect("analysis succeeds");
    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["contract"], "Counter");
    assert_eq!(json["transitions"][0]["name"], "Deposit");
    assert_eq!(json["transitions"][0]["summary"][0], "accept");
    assert_eq!(
        json["transitions"][0]["constraints"][0]["kind"],
        "sender_shard"
    );
    let rendered = report.to_string();
    assert!(rendered.contains("transition Deposit"));
    assert!(rendered.contains("sender-shard"));
}
