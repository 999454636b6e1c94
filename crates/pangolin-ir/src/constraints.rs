use std::fmt;

use serde::Serialize;

use crate::contribution::Pseudofield;

/// A predicate on the shard placement of a transaction, consumed by the
/// runtime scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardingConstraint {
    /// The executing shard must be authoritative for this location.
    MustOwn { pseudofield: Pseudofield },
    /// Reads of this location may observe stale values.
    MustAcceptWeakRead { pseudofield: Pseudofield },
    /// Writes to this location participate in the named
    /// partial-commutative monoid.
    MustHavePcm { pseudofield: Pseudofield, pcm: String },
    /// The address passed at this component-parameter index must not be a
    /// contract.
    AddrMustBeNonContract { param_index: usize },
    /// The arguments at these component-parameter indices must be pairwise
    /// distinct, to prevent map-key aliasing.
    MustNotHaveDuplicates { param_indices: Vec<usize> },
    /// The transaction must execute in the sender's shard.
    SenderShard,
    /// No shard placement is admissible.
    Unsat,
}

impl ShardingConstraint {
    pub fn must_own(pseudofield: Pseudofield) -> Self {
        ShardingConstraint::MustOwn { pseudofield }
    }

    /// Stable sort key: constraint kind first, then the canonical form of
    /// its payload. Used to emit constraint sets deterministically.
    pub fn canonical_key(&self) -> String {
        match self {
            ShardingConstraint::Unsat => "0".into(),
            ShardingConstraint::SenderShard => "1".into(),
            ShardingConstraint::MustOwn { pseudofield } => format!("2:{pseudofield}"),
            ShardingConstraint::MustAcceptWeakRead { pseudofield } => format!("3:{pseudofield}"),
            ShardingConstraint::MustHavePcm { pseudofield, pcm } => {
                format!("4:{pseudofield}:{pcm}")
            }
            ShardingConstraint::AddrMustBeNonContract { param_index } => {
                format!("5:{param_index:06}")
            }
            ShardingConstraint::MustNotHaveDuplicates { param_indices } => {
                let mut s = "6:".to_string();
                for i in param_indices {
                    s.push_str(&format!("{i:06},"));
                }
                s
            }
        }
    }
}

impl fmt::Display for ShardingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingConstraint::MustOwn { pseudofield } => write!(f, "must-own {pseudofield}"),
            ShardingConstraint::MustAcceptWeakRead { pseudofield } => {
                write!(f, "must-accept-weak-read {pseudofield}")
            }
            ShardingConstraint::MustHavePcm { pseudofield, pcm } => {
                write!(f, "must-have-pcm {pseudofield} ({pcm})")
            }
            ShardingConstraint::AddrMustBeNonContract { param_index } => {
                write!(f, "addr-must-be-non-contract param#{param_index}")
            }
            ShardingConstraint::MustNotHaveDuplicates { param_indices } => {
                write!(f, "must-not-have-duplicates params")?;
                for i in param_indices {
                    write!(f, " #{i}")?;
                }
                Ok(())
            }
            ShardingConstraint::SenderShard => write!(f, "sender-shard"),
            ShardingConstraint::Unsat => write!(f, "unsat"),
        }
    }
}

/// Sort a constraint set by canonical key and drop structural duplicates.
pub fn canonicalize(mut constraints: Vec<ShardingConstraint>) -> Vec<ShardingConstraint> {
    constraints.sort_by_key(ShardingConstraint::canonical_key);
    constraints.dedup();
    constraints
}
