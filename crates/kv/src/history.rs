//! Linear undo/redo history.
//!
//! The history is an index-addressed arena of nodes linked through `prev`
//! and `next` indices. Node 0 is the root sentinel ("nothing done yet");
//! every other node wraps one recorded [`Transition`]. A cursor marks the
//! node whose transition is currently in effect.
//!
//! Nodes are always appended directly after the cursor, so the chain is
//! stored in arena order and everything past the cursor is the redo branch.
//! Recording a new transition truncates that branch before appending; there
//! is no branching and no cycle to break.

use tally_common::{Result, Value};

use crate::transition::{Outcome, Transition};

/// Index of a node in the history arena.
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// Payload of a history node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryState {
    /// The sentinel at the start of every history.
    Root,
    /// A recorded mutation.
    Applied(Transition),
}

#[derive(Debug, Clone)]
struct HistoryNode {
    state: HistoryState,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Undo/redo log with a movable cursor.
#[derive(Debug, Clone)]
pub struct History {
    nodes: Vec<HistoryNode>,
    current: NodeId,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// A history holding only the root sentinel.
    pub fn new() -> Self {
        Self {
            nodes: vec![HistoryNode {
                state: HistoryState::Root,
                prev: None,
                next: None,
            }],
            current: ROOT,
        }
    }

    /// Append `transition` after the cursor and advance onto it.
    ///
    /// Any redo branch beyond the cursor is discarded. Returns how many
    /// nodes were pruned.
    pub fn record(&mut self, transition: Transition) -> usize {
        let id = self.current + 1;
        let pruned = self.nodes.len() - id;
        self.nodes.truncate(id);

        self.nodes.push(HistoryNode {
            state: HistoryState::Applied(transition),
            prev: Some(self.current),
            next: None,
        });
        self.nodes[self.current].next = Some(id);
        self.current = id;

        if pruned > 0 {
            tracing::debug!(pruned, "discarded redo branch");
        }
        pruned
    }

    /// Step back over the transition at the cursor.
    ///
    /// `apply` is invoked with the name and the value to restore; the cursor
    /// only moves if it succeeds. At the root nothing is applied and
    /// [`Outcome::NoHistory`] is returned.
    pub fn undo<F>(&mut self, apply: F) -> Result<Outcome>
    where
        F: FnOnce(&str, Option<Value>) -> Result<Transition>,
    {
        let node = &self.nodes[self.current];
        let (target, prev) = match (&node.state, node.prev) {
            (HistoryState::Applied(t), Some(prev)) => (t, prev),
            _ => return Ok(Outcome::NoHistory),
        };

        let applied = apply(&target.name, target.old)?;
        self.current = prev;
        Ok(Outcome::Applied(applied))
    }

    /// Step forward over the transition after the cursor.
    ///
    /// `apply` is invoked with the name and the value to re-establish; the
    /// cursor only moves if it succeeds. With nothing ahead
    /// [`Outcome::NoHistory`] is returned.
    pub fn redo<F>(&mut self, apply: F) -> Result<Outcome>
    where
        F: FnOnce(&str, Option<Value>) -> Result<Transition>,
    {
        let Some(next) = self.nodes[self.current].next else {
            return Ok(Outcome::NoHistory);
        };
        let target = match &self.nodes[next].state {
            HistoryState::Applied(t) => t,
            HistoryState::Root => return Ok(Outcome::NoHistory),
        };

        let applied = apply(&target.name, target.new)?;
        self.current = next;
        Ok(Outcome::Applied(applied))
    }

    pub fn can_undo(&self) -> bool {
        self.current != ROOT
    }

    pub fn can_redo(&self) -> bool {
        self.nodes[self.current].next.is_some()
    }

    /// Number of recorded transitions, including the redo branch.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many transitions are currently in effect (cursor depth).
    pub fn position(&self) -> usize {
        self.current
    }

    /// State at the cursor.
    pub fn current(&self) -> &HistoryState {
        &self.nodes[self.current].state
    }
}
