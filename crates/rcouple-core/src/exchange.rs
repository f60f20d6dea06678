//! Variable exchanges between components.
//!
//! Each binding copies a source variable into a destination variable after the source's
//! component has stepped. The owning component of the source is fixed when the table is
//! built. The destination is kept as a raw qualified name and resolved every time the binding
//! is applied, since it may point at any component.

use crate::errors::CouplerResult;
use crate::naming::{qualify, QualifiedName};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single `source -> destination` copy rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeBinding {
    pub source_component: String,
    pub source_variable: String,
    /// Qualified name of the destination variable
    pub destination: String,
}

impl ExchangeBinding {
    /// Build a binding from two qualified names
    pub fn parse(source: &str, destination: &str) -> CouplerResult<Self> {
        let parsed = QualifiedName::parse(source)?;
        QualifiedName::parse(destination)?;
        Ok(Self {
            source_component: parsed.component.to_string(),
            source_variable: parsed.variable.to_string(),
            destination: destination.to_string(),
        })
    }

    /// Qualified name of the source variable
    pub fn source(&self) -> String {
        qualify(&self.source_component, &self.source_variable)
    }

    /// Component id of the destination
    pub fn destination_component(&self) -> Option<&str> {
        QualifiedName::split(&self.destination).map(|name| name.component)
    }
}

/// The ordered set of exchange bindings of a composite
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExchangeTable {
    bindings: Vec<ExchangeBinding>,
}

impl ExchangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from `(source, destination)` pairs, keeping their order
    pub fn from_pairs(pairs: &[(String, String)]) -> CouplerResult<Self> {
        let bindings = pairs
            .iter()
            .map(|(source, destination)| ExchangeBinding::parse(source, destination))
            .collect::<CouplerResult<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    pub fn push(&mut self, binding: ExchangeBinding) {
        self.bindings.push(binding);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangeBinding> {
        self.bindings.iter()
    }

    /// Bindings whose source belongs to `component`, in table order
    pub fn sourced_from<'a>(
        &'a self,
        component: &'a str,
    ) -> impl Iterator<Item = &'a ExchangeBinding> + 'a {
        self.bindings
            .iter()
            .filter(move |binding| binding.source_component == component)
    }

    /// Qualified names used by the table whose component does not satisfy `is_registered`
    pub fn unresolved(&self, is_registered: impl Fn(&str) -> bool) -> Vec<String> {
        let mut names = Vec::new();
        for binding in &self.bindings {
            if !is_registered(&binding.source_component) {
                names.push(binding.source());
            }
            match binding.destination_component() {
                Some(component) if is_registered(component) => {}
                _ => names.push(binding.destination.clone()),
            }
        }
        names
    }

    /// Render the exchanges as a graph in the DOT language
    ///
    /// Nodes are the given component ids (followed by any other ids referenced by the table)
    /// and each edge is labelled with the variables it copies. Useful for debugging.
    pub fn as_dot(&self, component_ids: &[&str]) -> String {
        let mut graph: DiGraph<String, String> = DiGraph::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

        let mut node_for = |graph: &mut DiGraph<String, String>, id: &str| -> NodeIndex {
            *nodes
                .entry(id.to_string())
                .or_insert_with(|| graph.add_node(id.to_string()))
        };

        for id in component_ids {
            node_for(&mut graph, id);
        }
        for binding in &self.bindings {
            let (destination_component, destination_variable) =
                match QualifiedName::split(&binding.destination) {
                    Some(name) => (name.component, name.variable),
                    None => continue,
                };
            let from = node_for(&mut graph, &binding.source_component);
            let to = node_for(&mut graph, destination_component);
            graph.add_edge(
                from,
                to,
                format!("{} -> {}", binding.source_variable, destination_variable),
            );
        }

        format!("{}", Dot::new(&graph))
    }
}
