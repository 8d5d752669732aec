//! Dependency graph between state inputs and derived views.
//!
//! # Responsibility
//! - Record which inputs every derivation reads.
//! - Order derivations topologically once, at construction.
//! - Answer which derivations must be recomputed for a set of changed inputs.
//!
//! # Invariants
//! - A graph with a cycle or an undeclared derived input is never built.
//! - `affected` returns derivations in topological order; ties follow
//!   declaration order of `Derivation`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutable piece of dashboard state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StateInput {
    Table,
    Filter,
    Sort,
    Page,
    Selection,
    EditTarget,
    Theme,
}

impl StateInput {
    pub const ALL: [StateInput; 7] = [
        Self::Table,
        Self::Filter,
        Self::Sort,
        Self::Page,
        Self::Selection,
        Self::EditTarget,
        Self::Theme,
    ];
}

/// Pure recomputation of one rendered surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    FilteredView,
    Stats,
    BreedChart,
    TypeChart,
    TablePage,
    MapMarker,
    BreedOptions,
    TypeOptions,
    EditForm,
    ThemeStyles,
}

impl Derivation {
    pub const ALL: [Derivation; 10] = [
        Self::FilteredView,
        Self::Stats,
        Self::BreedChart,
        Self::TypeChart,
        Self::TablePage,
        Self::MapMarker,
        Self::BreedOptions,
        Self::TypeOptions,
        Self::EditForm,
        Self::ThemeStyles,
    ];

    /// Inputs the dashboard derivation reads.
    pub fn inputs(self) -> &'static [Node] {
        use Node::{Derived, State};
        match self {
            Self::FilteredView => &[
                State(StateInput::Table),
                State(StateInput::Filter),
                State(StateInput::Sort),
            ],
            Self::Stats | Self::BreedChart | Self::TypeChart => {
                &[Derived(Derivation::FilteredView), State(StateInput::Theme)]
            }
            Self::TablePage => &[
                Derived(Derivation::FilteredView),
                State(StateInput::Page),
                State(StateInput::Selection),
                State(StateInput::Theme),
            ],
            Self::MapMarker => &[
                Derived(Derivation::FilteredView),
                State(StateInput::Selection),
            ],
            Self::BreedOptions => &[State(StateInput::Table), State(StateInput::Filter)],
            Self::TypeOptions => &[State(StateInput::Table)],
            Self::EditForm => &[State(StateInput::EditTarget), State(StateInput::Theme)],
            Self::ThemeStyles => &[State(StateInput::Theme)],
        }
    }
}

/// Graph vertex: raw state or another derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    State(StateInput),
    Derived(Derivation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Derivations left unordered because they depend on each other.
    Cycle(Vec<Derivation>),
    /// `derivation` reads a derived input that was never declared.
    UnknownInput {
        derivation: Derivation,
        input: Derivation,
    },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle(members) => write!(f, "dependency cycle among {members:?}"),
            Self::UnknownInput { derivation, input } => {
                write!(f, "{derivation:?} depends on undeclared {input:?}")
            }
        }
    }
}

impl Error for GraphError {}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    inputs: BTreeMap<Derivation, Vec<Node>>,
    order: Vec<Derivation>,
}

impl DependencyGraph {
    /// The graph of every dashboard derivation.
    pub fn dashboard() -> Result<Self, GraphError> {
        Self::from_declarations(
            Derivation::ALL
                .iter()
                .map(|derivation| (*derivation, derivation.inputs().to_vec())),
        )
    }

    /// Builds and orders a graph from `(derivation, inputs)` declarations.
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = (Derivation, Vec<Node>)>,
    ) -> Result<Self, GraphError> {
        let inputs: BTreeMap<Derivation, Vec<Node>> = declarations.into_iter().collect();

        let mut pending: BTreeMap<Derivation, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<Derivation, Vec<Derivation>> = BTreeMap::new();
        for (derivation, nodes) in &inputs {
            let upstream: BTreeSet<Derivation> = nodes
                .iter()
                .filter_map(|node| match node {
                    Node::Derived(input) => Some(*input),
                    Node::State(_) => None,
                })
                .collect();
            for input in &upstream {
                if !inputs.contains_key(input) {
                    return Err(GraphError::UnknownInput {
                        derivation: *derivation,
                        input: *input,
                    });
                }
                dependents.entry(*input).or_default().push(*derivation);
            }
            pending.insert(*derivation, upstream.len());
        }

        let mut ready: BTreeSet<Derivation> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(derivation, _)| *derivation)
            .collect();
        let mut order = Vec::with_capacity(inputs.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for dependent in dependents.get(&next).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() != inputs.len() {
            let ordered: BTreeSet<Derivation> = order.iter().copied().collect();
            let remaining = inputs
                .keys()
                .filter(|derivation| !ordered.contains(derivation))
                .copied()
                .collect();
            return Err(GraphError::Cycle(remaining));
        }

        Ok(Self { inputs, order })
    }

    pub fn order(&self) -> &[Derivation] {
        &self.order
    }

    pub fn inputs_of(&self, derivation: Derivation) -> &[Node] {
        self.inputs
            .get(&derivation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Derivations reachable from `changed`, in recomputation order.
    pub fn affected(&self, changed: &BTreeSet<StateInput>) -> Vec<Derivation> {
        let mut dirty: BTreeSet<Derivation> = BTreeSet::new();
        for derivation in &self.order {
            let stale = self.inputs_of(*derivation).iter().any(|node| match node {
                Node::State(input) => changed.contains(input),
                Node::Derived(input) => dirty.contains(input),
            });
            if stale {
                dirty.insert(*derivation);
            }
        }
        self.order
            .iter()
            .filter(|derivation| dirty.contains(derivation))
            .copied()
            .collect()
    }
}
