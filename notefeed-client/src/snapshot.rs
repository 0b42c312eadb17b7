use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    api::{LinkedRecordSource, NoteId, NoteRecord},
    build, enrich, ExpansionPolicy, ThreadNode,
};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct RebuildTicket(pub u64);

/// Hands out increasing tickets to rebuilds, so that only the result of the
/// most recently started rebuild gets shown
#[derive(Debug, Default)]
pub struct RebuildSequence {
    latest: AtomicU64,
}

impl RebuildSequence {
    pub fn new() -> RebuildSequence {
        RebuildSequence::default()
    }

    pub fn issue(&self) -> RebuildTicket {
        RebuildTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RebuildTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// One complete rendering of a thread. Never modified once built: changing
/// anything produces a new snapshot.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct ThreadSnapshot {
    ticket: RebuildTicket,
    roots: Vec<ThreadNode>,
}

impl ThreadSnapshot {
    pub(crate) fn new(ticket: RebuildTicket, roots: Vec<ThreadNode>) -> ThreadSnapshot {
        ThreadSnapshot { ticket, roots }
    }

    pub fn ticket(&self) -> RebuildTicket {
        self.ticket
    }

    pub fn roots(&self) -> &[ThreadNode] {
        &self.roots
    }

    /// All nodes, each root followed by its replies
    pub fn nodes(&self) -> impl Iterator<Item = &ThreadNode> {
        self.roots
            .iter()
            .flat_map(|r| std::iter::once(r).chain(r.replies.iter()))
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn root(&self, id: &NoteId) -> Option<&ThreadNode> {
        self.roots.iter().find(|r| r.id == *id)
    }

    pub fn get(&self, id: &NoteId) -> Option<&ThreadNode> {
        self.nodes().find(|n| n.id == *id)
    }

    /// Expansion state of root `id`, if this snapshot has such a root
    pub fn expanded(&self, id: &NoteId) -> Option<bool> {
        self.root(id).map(|r| r.expanded)
    }

    pub(crate) fn expansion_state(&self) -> HashMap<&NoteId, bool> {
        self.roots.iter().map(|r| (&r.id, r.expanded)).collect()
    }

    /// Returns None if `id` is not a root of this snapshot
    pub fn with_expanded(&self, id: &NoteId, expanded: bool) -> Option<ThreadSnapshot> {
        let idx = self.roots.iter().position(|r| r.id == *id)?;
        let mut roots = self.roots.clone();
        let root = roots.remove(idx);
        roots.insert(idx, root.with_expanded(expanded));
        Some(ThreadSnapshot::new(self.ticket, roots))
    }

    /// Take over the expansion state of the roots `other` knows about
    pub(crate) fn with_expansion_of(self, other: &ThreadSnapshot) -> ThreadSnapshot {
        let state = other.expansion_state();
        let roots = self
            .roots
            .into_iter()
            .map(|r| match state.get(&r.id) {
                Some(&expanded) => r.with_expanded(expanded),
                None => r,
            })
            .collect();
        ThreadSnapshot::new(self.ticket, roots)
    }
}

/// Build the thread for `notes` and enrich all of its nodes.
///
/// The snapshot is only returned once every node's linked records settled.
pub async fn rebuild_thread<S>(
    notes: &[NoteRecord],
    prior: Option<&ThreadSnapshot>,
    policy: ExpansionPolicy,
    ticket: RebuildTicket,
    source: &S,
) -> ThreadSnapshot
where
    S: LinkedRecordSource + ?Sized,
{
    let roots = build(notes, prior, policy);
    tracing::debug!(
        ?ticket,
        num_notes = notes.len(),
        num_roots = roots.len(),
        "built thread, enriching"
    );
    ThreadSnapshot::new(ticket, enrich(roots, source).await)
}
