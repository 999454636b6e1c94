use std::fmt;

use serde::{Serialize, Serializer};

use pangolin_ast::Ident;
use pangolin_ir::{ComponentSummary, ShardingConstraint};

/// Per-transition analysis output: the effect summary (for diagnostics)
/// and the synthesized sharding constraints, canonically ordered.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReport {
    pub name: String,
    #[serde(serialize_with = "serialize_summary")]
    pub summary: ComponentSummary,
    pub constraints: Vec<ShardingConstraint>,
}

impl TransitionReport {
    pub fn new(
        name: &Ident,
        summary: &ComponentSummary,
        constraints: Vec<ShardingConstraint>,
    ) -> Self {
        Self {
            name: name.name.clone(),
            summary: summary.clone(),
            constraints,
        }
    }

    /// Whether no shard placement is admissible for this transition.
    pub fn is_unsat(&self) -> bool {
        self.constraints.contains(&ShardingConstraint::Unsat)
    }
}

impl fmt::Display for TransitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "transition {}", self.name)?;
        writeln!(f, "summary:")?;
        write!(f, "{}", self.summary)?;
        if self.constraints.is_empty() {
            writeln!(f, "constraints: (none)")
        } else {
            writeln!(f, "constraints:")?;
            for c in &self.constraints {
                writeln!(f, "  {c}")?;
            }
            Ok(())
        }
    }
}

/// Analysis output for a whole contract module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub contract: String,
    pub transitions: Vec<TransitionReport>,
}

impl ModuleReport {
    pub fn transition(&self, name: &str) -> Option<&TransitionReport> {
        self.transitions.iter().find(|t| t.name == name)
    }
}

impl fmt::Display for ModuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "contract {}", self.contract)?;
        for t in &self.transitions {
            writeln!(f)?;
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

/// Summaries serialize as their rendered operations: the structural form
/// is analysis-internal, the rendering is the diagnostic contract.
fn serialize_summary<S: Serializer>(
    summary: &ComponentSummary,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(summary.iter().map(|op| op.to_string()))
}
