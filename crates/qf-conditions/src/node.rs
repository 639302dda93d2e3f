//! Expression Trees
//!
//! The normalized form of a condition stream. `And` and `Or` always have at
//! least two children, and never directly contain a node of their own kind.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::atom::ConditionAtom;
use crate::containers::ContainerSet;
use crate::operators::Connective;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionNode {
    Atom(ConditionAtom),
    And(Vec<ExpressionNode>),
    Or(Vec<ExpressionNode>),
}

impl ExpressionNode {
    /// Conjunction of `nodes`, flattening nested `And`s
    ///
    /// Returns the node itself for a single input and `None` for no input.
    pub fn all(nodes: Vec<ExpressionNode>) -> Option<ExpressionNode> {
        combine(nodes, Connective::And)
    }

    /// Disjunction of `nodes`, flattening nested `Or`s
    pub fn any(nodes: Vec<ExpressionNode>) -> Option<ExpressionNode> {
        combine(nodes, Connective::Or)
    }

    /// Connective of a compound node
    pub fn connective(&self) -> Option<Connective> {
        match self {
            ExpressionNode::Atom(_) => None,
            ExpressionNode::And(_) => Some(Connective::And),
            ExpressionNode::Or(_) => Some(Connective::Or),
        }
    }

    pub fn children(&self) -> &[ExpressionNode] {
        match self {
            ExpressionNode::Atom(_) => &[],
            ExpressionNode::And(children) | ExpressionNode::Or(children) => children,
        }
    }

    pub fn as_atom(&self) -> Option<&ConditionAtom> {
        match self {
            ExpressionNode::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// All atoms, left to right
    pub fn atoms(&self) -> Vec<&ConditionAtom> {
        let mut atoms = Vec::new();
        self.collect_atoms(&mut atoms);
        atoms
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a ConditionAtom>) {
        match self {
            ExpressionNode::Atom(atom) => out.push(atom),
            ExpressionNode::And(children) | ExpressionNode::Or(children) => {
                for child in children {
                    child.collect_atoms(out);
                }
            }
        }
    }

    /// Nesting depth; an atom has depth 1
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(ExpressionNode::depth).max().unwrap_or(0)
    }
}

fn combine(nodes: Vec<ExpressionNode>, connective: Connective) -> Option<ExpressionNode> {
    let mut children = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            ExpressionNode::And(inner) if connective == Connective::And => children.extend(inner),
            ExpressionNode::Or(inner) if connective == Connective::Or => children.extend(inner),
            other => children.push(other),
        }
    }

    if children.len() > 1 {
        Some(match connective {
            Connective::And => ExpressionNode::And(children),
            Connective::Or => ExpressionNode::Or(children),
        })
    } else {
        children.pop()
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connective = match self.connective() {
            None => return self.as_atom().map_or(Ok(()), |atom| write!(f, "{}", atom)),
            Some(connective) => connective,
        };

        for (i, child) in self.children().iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", connective)?;
            }
            if child.connective().is_some() {
                write!(f, "({})", child)?;
            } else {
                write!(f, "{}", child)?;
            }
        }
        Ok(())
    }
}

/// A sealed condition tree together with the containers it was resolved against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    containers: Arc<ContainerSet>,
    root: Option<Arc<ExpressionNode>>,
}

impl Filter {
    pub fn new(containers: Arc<ContainerSet>, root: Option<Arc<ExpressionNode>>) -> Self {
        Self { containers, root }
    }

    /// Root of the tree; `None` matches everything
    pub fn root(&self) -> Option<&Arc<ExpressionNode>> {
        self.root.as_ref()
    }

    pub fn containers(&self) -> &Arc<ContainerSet> {
        &self.containers
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Names of all parameters referenced by the tree, in first-use order
    pub fn parameters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        if let Some(root) = &self.root {
            for name in root.atoms().into_iter().filter_map(ConditionAtom::parameter) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{}", root),
            None => write!(f, "<all>"),
        }
    }
}
