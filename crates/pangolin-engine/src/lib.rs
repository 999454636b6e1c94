#![doc = include_str!("../README.md")]

pub mod env;
pub mod errors;
pub mod eval;
pub mod pcm;
pub mod pipeline;
pub mod report;
pub mod statements;
pub mod synthesize;
pub mod translate;

pub use env::{AnalysisEnv, ComponentSig, EnvEntry, IdentSig, ShadowStatus};
pub use errors::AnalysisError;
pub use pcm::{IntegerAddPcm, Pcm, PcmRegistry};
pub use pipeline::{
    analyze_module, implicit_component_params, implicit_contract_params, BALANCE_FIELD,
    FOLD_BUILTINS, MSG_AMOUNT_LABEL, MSG_RECIPIENT_LABEL,
};
pub use report::{ModuleReport, TransitionReport};
