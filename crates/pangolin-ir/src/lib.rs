#![doc = include_str!("../README.md")]

pub mod constraints;
pub mod contribution;
pub mod exprtype;
pub mod normalize;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod summary;

pub use constraints::{canonicalize, ShardingConstraint};
pub use contribution::{
    Cardinality, ContribOp, ContribSource, ContribSummary, Contributions, KnownContrib, Precision,
    Pseudofield,
};
pub use exprtype::{ExprType, FunDef, FunDesc};
pub use normalize::{add_conditional, normalize, substitute, IrError, ParamRef};
pub use summary::{ComponentOp, ComponentSummary};
