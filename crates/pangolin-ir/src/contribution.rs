use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use pangolin_ast::{BuiltinOp, Ident, Literal};

/// How many times a source can flow into a value.
///
/// The lattice order is `None < Linear < NonLinear`; derived `Ord` follows
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    None,
    Linear,
    NonLinear,
}

impl Cardinality {
    /// Lattice join.
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }

    /// Multiplicative combination: `None` is absorbing, `NonLinear`
    /// dominates, otherwise `Linear`.
    pub fn product(self, other: Self) -> Self {
        match (self, other) {
            (Cardinality::None, _) | (_, Cardinality::None) => Cardinality::None,
            (Cardinality::NonLinear, _) | (_, Cardinality::NonLinear) => Cardinality::NonLinear,
            _ => Cardinality::Linear,
        }
    }

    /// Sequential accumulation: `None` is the identity; any two real
    /// contributions from unrelated program points are assumed non-linear.
    pub fn seq_sum(self, other: Self) -> Self {
        match (self, other) {
            (Cardinality::None, c) | (c, Cardinality::None) => c,
            _ => Cardinality::NonLinear,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::None => write!(f, "none"),
            Cardinality::Linear => write!(f, "linear"),
            Cardinality::NonLinear => write!(f, "nonlinear"),
        }
    }
}

/// An operator applied along a data-flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContribOp {
    Builtin(BuiltinOp),
    Conditional,
}

impl fmt::Display for ContribOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContribOp::Builtin(op) => write!(f, "{op}"),
            ContribOp::Conditional => write!(f, "cond"),
        }
    }
}

/// A storage location: a field, or a bottom-level key path into a map field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Pseudofield {
    pub field: Ident,
    /// `Some(keys)` describes a bottom-level map access: the number of keys
    /// equals the map-nesting depth of the field's type.
    pub keys: Option<Vec<Ident>>,
}

impl Pseudofield {
    pub fn field(field: Ident) -> Self {
        Self { field, keys: None }
    }

    pub fn map(field: Ident, keys: Vec<Ident>) -> Self {
        Self {
            field,
            keys: Some(keys),
        }
    }
}

impl fmt::Display for Pseudofield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field)?;
        if let Some(keys) = &self.keys {
            for k in keys {
                write!(f, "[{k}]")?;
            }
        }
        Ok(())
    }
}

/// Where a value ultimately comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContribSource {
    /// The analysis gave up on this source.
    Unknown,
    /// A literal embedded in code.
    Literal(Literal),
    /// An immutable contract-construction parameter.
    ContractParam(Ident),
    /// Mutable contract state.
    Pseudofield(Pseudofield),
    /// The k-th lambda parameter, as a de Bruijn level counted across
    /// nested lambdas.
    FormalParam(usize),
    /// The i-th parameter of the enclosing component (implicit parameters
    /// included).
    ProcParam(usize),
}

impl ContribSource {
    /// Stable sort key for deterministic rendering.
    pub fn canonical_key(&self) -> String {
        match self {
            ContribSource::Unknown => "0:?".into(),
            ContribSource::Literal(l) => format!("1:{l}"),
            ContribSource::ContractParam(id) => format!("2:{id}"),
            ContribSource::Pseudofield(pf) => format!("3:{pf}"),
            ContribSource::FormalParam(k) => format!("4:{k:06}"),
            ContribSource::ProcParam(i) => format!("5:{i:06}"),
        }
    }
}

impl fmt::Display for ContribSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContribSource::Unknown => write!(f, "?"),
            ContribSource::Literal(l) => write!(f, "{l}"),
            ContribSource::ContractParam(id) => write!(f, "cparam:{id}"),
            ContribSource::Pseudofield(pf) => write!(f, "{pf}"),
            ContribSource::FormalParam(k) => write!(f, "$fp{k}"),
            ContribSource::ProcParam(i) => write!(f, "$p{i}"),
        }
    }
}

/// Per-source summary: a cardinality and the set of operators applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContribSummary {
    pub cardinality: Cardinality,
    pub ops: BTreeSet<ContribOp>,
}

impl ContribSummary {
    pub fn new(cardinality: Cardinality, ops: impl IntoIterator<Item = ContribOp>) -> Self {
        Self {
            cardinality,
            ops: ops.into_iter().collect(),
        }
    }

    /// A single linear occurrence with no operators: the summary of a
    /// freshly observed source.
    pub fn linear() -> Self {
        Self::new(Cardinality::Linear, [])
    }

    pub fn with_op(&self, op: ContribOp) -> Self {
        let mut ops = self.ops.clone();
        ops.insert(op);
        Self {
            cardinality: self.cardinality,
            ops,
        }
    }

    /// Sequential composition: cardinalities add (saturating to
    /// `NonLinear`), operator sets union.
    pub fn combine_seq(&self, other: &Self) -> Self {
        Self {
            cardinality: self.cardinality.seq_sum(other.cardinality),
            ops: self.ops.union(&other.ops).copied().collect(),
        }
    }

    /// Parallel composition: cardinality join, operator-set union.
    pub fn combine_par(&self, other: &Self) -> Self {
        Self {
            cardinality: self.cardinality.join(other.cardinality),
            ops: self.ops.union(&other.ops).copied().collect(),
        }
    }

    /// Multiplicative composition. When the resulting cardinality is
    /// `None`, operators on a non-contribution carry no information and the
    /// set is restricted to at most `{Conditional}`.
    pub fn combine_product(&self, other: &Self) -> Self {
        let cardinality = self.cardinality.product(other.cardinality);
        let mut ops: BTreeSet<ContribOp> = self.ops.union(&other.ops).copied().collect();
        if cardinality == Cardinality::None {
            ops.retain(|op| *op == ContribOp::Conditional);
        }
        Self { cardinality, ops }
    }
}

impl fmt::Display for ContribSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {{", self.cardinality)?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "}})")
    }
}

/// Whether a contribution map is exact or an over-approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// These are exactly the sources that flow in.
    Exactly,
    /// A subset of these sources flows in.
    SubsetOf,
}

impl Precision {
    /// `Exactly` iff both operands are `Exactly`.
    pub fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Precision::Exactly, Precision::Exactly) => Precision::Exactly,
            _ => Precision::SubsetOf,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Exactly => write!(f, "="),
            Precision::SubsetOf => write!(f, "<="),
        }
    }
}

/// A mapping from contribution source to its summary. Keys are unique;
/// equality ignores insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contributions(IndexMap<ContribSource, ContribSummary>);

impl Contributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(source: ContribSource, summary: ContribSummary) -> Self {
        let mut m = IndexMap::new();
        m.insert(source, summary);
        Self(m)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, source: ContribSource, summary: ContribSummary) {
        self.0.insert(source, summary);
    }

    pub fn get(&self, source: &ContribSource) -> Option<&ContribSummary> {
        self.0.get(source)
    }

    pub fn contains(&self, source: &ContribSource) -> bool {
        self.0.contains_key(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContribSource, &ContribSummary)> {
        self.0.iter()
    }

    pub fn sources(&self) -> impl Iterator<Item = &ContribSource> {
        self.0.keys()
    }

    /// Pointwise union with a caller-supplied merge for sources present on
    /// both sides.
    pub fn union_with(
        &self,
        other: &Self,
        merge: impl Fn(&ContribSummary, &ContribSummary) -> ContribSummary,
    ) -> Self {
        let mut out = self.0.clone();
        for (src, sum) in &other.0 {
            match out.get_mut(src) {
                Some(existing) => *existing = merge(existing, sum),
                None => {
                    out.insert(src.clone(), sum.clone());
                }
            }
        }
        Self(out)
    }

    /// Apply `f` to every summary, keeping sources.
    pub fn map_summaries(&self, f: impl Fn(&ContribSummary) -> ContribSummary) -> Self {
        Self(
            self.0
                .iter()
                .map(|(src, sum)| (src.clone(), f(sum)))
                .collect(),
        )
    }

    /// Entries sorted by canonical source key, for deterministic rendering.
    pub fn sorted_entries(&self) -> Vec<(&ContribSource, &ContribSummary)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by_key(|(src, _)| src.canonical_key());
        entries
    }
}

impl FromIterator<(ContribSource, ContribSummary)> for Contributions {
    fn from_iter<T: IntoIterator<Item = (ContribSource, ContribSummary)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Contributions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (src, sum)) in self.sorted_entries().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{src} -> {sum}")?;
        }
        write!(f, "}}")
    }
}

/// A contribution map together with its precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownContrib {
    pub precision: Precision,
    pub contributions: Contributions,
}

impl KnownContrib {
    pub fn new(precision: Precision, contributions: Contributions) -> Self {
        Self {
            precision,
            contributions,
        }
    }

    /// The designated *nothing* value: exactly no sources flow in.
    pub fn nothing() -> Self {
        Self::new(Precision::Exactly, Contributions::new())
    }

    pub fn is_nothing(&self) -> bool {
        self.precision == Precision::Exactly && self.contributions.is_empty()
    }

    /// Pointwise composition with the given per-source merge; precision is
    /// the meet of the operands' precisions.
    pub fn compose(
        &self,
        other: &Self,
        merge: impl Fn(&ContribSummary, &ContribSummary) -> ContribSummary,
    ) -> Self {
        Self {
            precision: self.precision.meet(other.precision),
            contributions: self.contributions.union_with(&other.contributions, merge),
        }
    }
}

impl fmt::Display for KnownContrib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.precision, self.contributions)
    }
}
