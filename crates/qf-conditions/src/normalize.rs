//! Precedence Normalization
//!
//! Each scope (the top level or one `begin()`/`end()` group) collects
//! `(connective, term)` pairs. When the scope closes it is reduced to a single
//! node: terms are split into runs at every `OR`, each run becomes an `And`,
//! and the runs become an `Or`. Single-element runs and single-run scopes
//! produce no wrapper, and nested nodes of the same kind are spliced in.
//!
//! Nested groups reach the parent already reduced, so normalization never
//! looks past one scope.

use qf_core::{QfError, QfResult};
use tracing::{debug, trace};

use crate::atom::ConditionAtom;
use crate::node::ExpressionNode;
use crate::operators::Connective;
use crate::token::Token;

/// One term of a scope and the connective joining it to the previous term
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeTerm {
    /// `None` for the first term of a scope
    pub connective: Option<Connective>,
    pub node: ExpressionNode,
}

impl ScopeTerm {
    pub fn new(connective: Option<Connective>, node: ExpressionNode) -> Self {
        Self { connective, node }
    }
}

/// Reduce the terms of one scope to a single node
///
/// Returns `None` for an empty scope.
pub fn normalize_scope(terms: Vec<ScopeTerm>) -> Option<ExpressionNode> {
    let mut runs: Vec<Vec<ExpressionNode>> = Vec::new();

    for term in terms {
        match (term.connective, runs.last_mut()) {
            (Some(Connective::And) | None, Some(run)) => run.push(term.node),
            _ => runs.push(vec![term.node]),
        }
    }

    let runs = runs.into_iter().filter_map(ExpressionNode::all).collect();
    ExpressionNode::any(runs)
}

/// Replay a recorded token stream and return its normalized tree
///
/// Applies the same sequencing rules as the builder, so a stream the builder
/// rejected is rejected here with the same error.
pub fn normalize_tokens(tokens: &[Token]) -> QfResult<Option<ExpressionNode>> {
    let mut stack = ScopeStack::new();
    for token in tokens {
        match token {
            Token::Atom(atom) => stack.push_atom(atom.clone()),
            Token::GroupOpen => stack.open(),
            Token::GroupClose => stack.close()?,
            Token::Connective(connective) => stack.connect(*connective)?,
        }
    }
    stack.finish()
}

#[derive(Debug, Default)]
struct Scope {
    terms: Vec<ScopeTerm>,
    pending: Option<Connective>,
    saw_explicit_connective: bool,
    /// Connective joining this group to the previous term of its parent
    lead: Option<Connective>,
}

/// Open scopes of a builder together with the tokens recorded so far
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    root: Scope,
    open: Vec<Scope>,
    tokens: Vec<Token>,
}

impl ScopeStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of open groups
    pub(crate) fn depth(&self) -> usize {
        self.open.len()
    }

    pub(crate) fn push_atom(&mut self, atom: ConditionAtom) {
        let connective = self.lead();
        trace!(depth = self.depth(), atom = %atom, "Condition token");
        self.tokens.push(Token::Atom(atom.clone()));
        self.current().terms.push(ScopeTerm::new(connective, ExpressionNode::Atom(atom)));
    }

    pub(crate) fn connect(&mut self, connective: Connective) -> QfResult<()> {
        let scope = self.current();
        if scope.terms.is_empty() || scope.pending.is_some() {
            return Err(QfError::DanglingConnective {
                call: connective.call_name(),
            });
        }

        scope.pending = Some(connective);
        scope.saw_explicit_connective = true;
        self.tokens.push(Token::Connective(connective));
        Ok(())
    }

    pub(crate) fn open(&mut self) {
        let lead = self.lead();
        self.tokens.push(Token::GroupOpen);
        self.open.push(Scope {
            lead,
            ..Scope::default()
        });
        trace!(depth = self.depth(), "Group opened");
    }

    pub(crate) fn close(&mut self) -> QfResult<()> {
        let depth = self.open.len();
        let scope = self.open.last().ok_or(QfError::UnbalancedGroup { open: 0 })?;
        if scope.pending.is_some() {
            return Err(QfError::DanglingConnective { call: "end" });
        }
        if scope.terms.is_empty() {
            return Err(QfError::EmptyGroup { depth });
        }

        let scope = self.open.pop().ok_or(QfError::UnbalancedGroup { open: 0 })?;
        let terms = scope.terms.len();
        let node = normalize_scope(scope.terms).ok_or(QfError::EmptyGroup { depth })?;
        debug!(
            depth,
            terms,
            explicit = scope.saw_explicit_connective,
            node = %node,
            "Group normalized"
        );

        self.tokens.push(Token::GroupClose);
        self.current().terms.push(ScopeTerm::new(scope.lead, node));
        Ok(())
    }

    /// Check that the stream can be sealed
    pub(crate) fn check_complete(&self) -> QfResult<()> {
        if !self.open.is_empty() {
            return Err(QfError::UnbalancedGroup {
                open: self.open.len(),
            });
        }
        if self.root.pending.is_some() {
            return Err(QfError::DanglingConnective { call: "seal" });
        }
        Ok(())
    }

    /// Normalize the top-level scope
    pub(crate) fn finish(&mut self) -> QfResult<Option<ExpressionNode>> {
        self.check_complete()?;
        let terms = std::mem::take(&mut self.root.terms);
        let count = terms.len();
        let node = normalize_scope(terms);
        debug!(
            terms = count,
            explicit = self.root.saw_explicit_connective,
            "Top-level scope normalized"
        );
        Ok(node)
    }

    fn current(&mut self) -> &mut Scope {
        match self.open.last_mut() {
            Some(scope) => scope,
            None => &mut self.root,
        }
    }

    /// Connective for a new term of the current scope
    ///
    /// Takes the pending connective, or records an implicit `AND` when the
    /// scope already has a term.
    fn lead(&mut self) -> Option<Connective> {
        let scope = self.current();
        if scope.terms.is_empty() {
            return None;
        }
        match scope.pending.take() {
            Some(connective) => Some(connective),
            None => {
                self.tokens.push(Token::Connective(Connective::And));
                Some(Connective::And)
            }
        }
    }
}
