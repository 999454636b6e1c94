use std::collections::BTreeSet;

use indexmap::IndexMap;

use pangolin_ast::{ComponentKind, Ident, SType};
use pangolin_ir::{ComponentSummary, ExprType};

use crate::errors::AnalysisError;

/// Whether a bound name interacts with the enclosing component's
/// parameters. Map keys are only summarisable while they resolve to an
/// unshadowed component parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowStatus {
    DoesNotShadow,
    ComponentParameter,
    ShadowsComponentParameter,
}

/// Signature of a value or function name.
#[derive(Debug, Clone)]
pub struct IdentSig {
    pub shadow: ShadowStatus,
    /// Identifiers of the PCMs whose unit this name is known to equal.
    pub pcm_units: BTreeSet<String>,
    pub et: ExprType,
}

impl IdentSig {
    pub fn new(et: ExprType) -> Self {
        Self {
            shadow: ShadowStatus::DoesNotShadow,
            pcm_units: BTreeSet::new(),
            et,
        }
    }

    pub fn with_shadow(mut self, shadow: ShadowStatus) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn with_units(mut self, units: BTreeSet<String>) -> Self {
        self.pcm_units = units;
        self
    }
}

/// Signature of a named transition or procedure.
#[derive(Debug, Clone)]
pub struct ComponentSig {
    pub kind: ComponentKind,
    /// Declared parameters; implicit parameters are prepended at call
    /// translation, not stored.
    pub params: Vec<(Ident, SType)>,
    pub summary: ComponentSummary,
}

#[derive(Debug, Clone)]
pub enum EnvEntry {
    Component(ComponentSig),
    Ident(IdentSig),
}

/// The analysis environment: a persistent name-to-signature map. Binding
/// returns a new environment; earlier snapshots are never mutated, so each
/// match branch evaluates against its own extension.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEnv {
    entries: IndexMap<String, EnvEntry>,
}

impl AnalysisEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_ident(&self, name: &Ident, sig: IdentSig) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(name.name.clone(), EnvEntry::Ident(sig));
        Self { entries }
    }

    pub fn bind_component(&self, name: &Ident, sig: ComponentSig) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(name.name.clone(), EnvEntry::Component(sig));
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&EnvEntry> {
        self.entries.get(name)
    }

    /// The shadow status a fresh binder of this name should get: binding a
    /// name that currently refers to a component parameter (or already
    /// shadows one) shadows it.
    pub fn shadow_status_for(&self, name: &Ident) -> ShadowStatus {
        match self.lookup(&name.name) {
            Some(EnvEntry::Ident(sig))
                if matches!(
                    sig.shadow,
                    ShadowStatus::ComponentParameter | ShadowStatus::ShadowsComponentParameter
                ) =>
            {
                ShadowStatus::ShadowsComponentParameter
            }
            _ => ShadowStatus::DoesNotShadow,
        }
    }

    /// True when the name resolves to an unshadowed component parameter.
    pub fn is_component_param(&self, name: &Ident) -> bool {
        matches!(
            self.lookup(&name.name),
            Some(EnvEntry::Ident(sig)) if sig.shadow == ShadowStatus::ComponentParameter
        )
    }

    pub fn ident_sig(&self, name: &Ident) -> Result<&IdentSig, AnalysisError> {
        match self.lookup(&name.name) {
            Some(EnvEntry::Ident(sig)) => Ok(sig),
            Some(EnvEntry::Component(_)) => Err(AnalysisError::NotAValue {
                name: name.name.clone(),
                span: Some(name.span),
            }),
            None => Err(AnalysisError::UnboundIdentifier {
                name: name.name.clone(),
                span: Some(name.span),
            }),
        }
    }

    pub fn expr_type(&self, name: &Ident) -> Result<&ExprType, AnalysisError> {
        Ok(&self.ident_sig(name)?.et)
    }

    pub fn component(&self, name: &Ident) -> Result<&ComponentSig, AnalysisError> {
        match self.lookup(&name.name) {
            Some(EnvEntry::Component(sig)) => Ok(sig),
            _ => Err(AnalysisError::NotAComponent {
                name: name.name.clone(),
                span: Some(name.span),
            }),
        }
    }
}
