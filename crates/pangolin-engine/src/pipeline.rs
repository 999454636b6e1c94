//! Module-level analysis pipeline: fold built-ins, external libraries in
//! dependency order, the contract library, contract parameters, then each
//! component in source order. Completed component signatures become
//! visible to later components, which is what resolves procedure calls.

use indexmap::IndexMap;
use tracing::{debug, info};

use pangolin_ast::{
    Component, ComponentKind, ContractModule, Ident, LibEntry, LibTree, Library, PrimType, SType,
};
use pangolin_ir::{normalize, ComponentSummary, ContribSource, ExprType, FunDef, FunDesc};

use crate::env::{AnalysisEnv, ComponentSig, IdentSig, ShadowStatus};
use crate::errors::AnalysisError;
use crate::eval::eval_expr;
use crate::pcm::PcmRegistry;
use crate::report::{ModuleReport, TransitionReport};
use crate::statements::{analyze_stmts, StmtCtx};
use crate::synthesize::synthesize_constraints;

/// Reserved payload label carrying the transferred amount.
pub const MSG_AMOUNT_LABEL: &str = "_amount";
/// Reserved payload label carrying the recipient address.
pub const MSG_RECIPIENT_LABEL: &str = "_recipient";
/// The implicit account-balance field every contract carries.
pub const BALANCE_FIELD: &str = "_balance";

/// Recursion principles provided by the host. They are bound to `Unknown`,
/// so every fold application is conservatively opaque.
pub const FOLD_BUILTINS: [&str; 3] = ["list_foldl", "list_foldr", "nat_fold"];

/// The implicit parameters prepended to every component's parameter list.
pub fn implicit_component_params() -> Vec<(Ident, SType)> {
    vec![
        (
            Ident::unspanned("_sender"),
            SType::Prim(PrimType::ByStr20),
        ),
        (
            Ident::unspanned("_origin"),
            SType::Prim(PrimType::ByStr20),
        ),
        (
            Ident::unspanned("_amount"),
            SType::Prim(PrimType::Uint128),
        ),
    ]
}

/// The implicit parameters prepended to every contract's parameter list.
pub fn implicit_contract_params() -> Vec<(Ident, SType)> {
    vec![
        (
            Ident::unspanned("_this_address"),
            SType::Prim(PrimType::ByStr20),
        ),
        (
            Ident::unspanned("_creation_block"),
            SType::Prim(PrimType::BNum),
        ),
    ]
}

/// Analyze a type-checked contract module, producing one report per
/// transition. Procedures contribute summaries to the environment only.
pub fn analyze_module(
    module: &ContractModule,
    registry: &PcmRegistry,
) -> Result<ModuleReport, AnalysisError> {
    info!(contract = %module.name, components = module.components.len(), "analyzing module");

    let mut env = AnalysisEnv::new();
    for fold in FOLD_BUILTINS {
        env = env.bind_ident(&Ident::unspanned(fold), IdentSig::new(ExprType::Unknown));
    }
    for elib in &module.elibs {
        env = analyze_lib_tree(env, registry, elib)?;
    }
    if let Some(lib) = &module.library {
        env = analyze_library(env, registry, lib)?;
    }
    for (id, _ty) in implicit_contract_params()
        .iter()
        .chain(module.params.iter())
    {
        env = env.bind_ident(
            id,
            IdentSig::new(ExprType::single_source(ContribSource::ContractParam(
                id.clone(),
            ))),
        );
    }

    let mut field_depths: IndexMap<String, usize> = IndexMap::new();
    field_depths.insert(BALANCE_FIELD.to_string(), 0);
    for field in &module.fields {
        field_depths.insert(field.name.name.clone(), field.ty.map_depth());
    }

    let mut transitions = Vec::new();
    for component in &module.components {
        let summary = analyze_component(&env, registry, &field_depths, component)?;
        debug!(component = %component.name, kind = %component.kind, ops = summary.len(),
               "component summarized");

        if component.kind == ComponentKind::Transition {
            let full_params = full_component_params(component);
            let constraints = synthesize_constraints(&summary, registry, &full_params);
            info!(transition = %component.name, constraints = constraints.len(),
                  "constraints synthesized");
            transitions.push(TransitionReport::new(&component.name, &summary, constraints));
        }

        env = env.bind_component(
            &component.name,
            ComponentSig {
                kind: component.kind,
                params: component.params.clone(),
                summary,
            },
        );
    }

    Ok(ModuleReport {
        contract: module.name.name.clone(),
        transitions,
    })
}

fn full_component_params(component: &Component) -> Vec<(Ident, SType)> {
    implicit_component_params()
        .into_iter()
        .chain(component.params.iter().cloned())
        .collect()
}

fn analyze_component(
    env: &AnalysisEnv,
    registry: &PcmRegistry,
    field_depths: &IndexMap<String, usize>,
    component: &Component,
) -> Result<ComponentSummary, AnalysisError> {
    let mut env = env.clone();
    for (index, (id, ty)) in full_component_params(component).iter().enumerate() {
        let et = if ty.is_fun() {
            ExprType::Fun(FunDesc::new(
                (0..ty.fun_arity()).collect(),
                FunDef::ProcParam(index),
            ))
        } else {
            ExprType::single_source(ContribSource::ProcParam(index))
        };
        env = env.bind_ident(
            id,
            IdentSig::new(et).with_shadow(ShadowStatus::ComponentParameter),
        );
    }
    let ctx = StmtCtx {
        registry,
        field_depths,
    };
    let (_, summary) = analyze_stmts(&ctx, env, ComponentSummary::new(), &component.body)?;
    Ok(summary)
}

/// Process an external-library tree, dependencies first.
fn analyze_lib_tree(
    mut env: AnalysisEnv,
    registry: &PcmRegistry,
    tree: &LibTree,
) -> Result<AnalysisEnv, AnalysisError> {
    for dep in &tree.deps {
        env = analyze_lib_tree(env, registry, dep)?;
    }
    analyze_library(env, registry, &tree.lib)
}

fn analyze_library(
    mut env: AnalysisEnv,
    registry: &PcmRegistry,
    lib: &Library,
) -> Result<AnalysisEnv, AnalysisError> {
    debug!(library = %lib.name, entries = lib.entries.len(), "processing library");
    for entry in &lib.entries {
        match entry {
            LibEntry::Var(var) => {
                let et = normalize(&eval_expr(&env, registry, 0, &var.init)?)?;
                let units = registry.unit_memberships(&env, &var.init.expr);
                env = env.bind_ident(&var.name, IdentSig::new(et).with_units(units));
            }
            // Type definitions carry no value-level information.
            LibEntry::Typ(_) => {}
        }
    }
    Ok(env)
}
