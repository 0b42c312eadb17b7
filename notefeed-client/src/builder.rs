use std::collections::{hash_map, HashMap, HashSet};

use crate::{
    api::{NoteId, NoteRecord},
    ExpansionPolicy, ThreadNode, ThreadSnapshot,
};

/// Group a flat list of notes into root notes carrying their replies.
///
/// Roots keep the order in which they first appear in `notes`, and replies are
/// appended to their root in input order. A reply whose parent is not a root
/// of `notes` is dropped. The expansion state of each root is carried over
/// from `prior` when it knows the root, and set according to `policy`
/// otherwise. Every returned node is still unenriched.
pub fn build(
    notes: &[NoteRecord],
    prior: Option<&ThreadSnapshot>,
    policy: ExpansionPolicy,
) -> Vec<ThreadNode> {
    let prior_state = prior.map(|p| p.expansion_state()).unwrap_or_default();
    let mut roots = Vec::new();
    let mut root_idx: HashMap<&NoteId, usize> = HashMap::new();
    for rec in notes.iter().filter(|n| !n.is_reply) {
        match root_idx.entry(&rec.id) {
            hash_map::Entry::Occupied(_) => {
                tracing::debug!(note = %rec.id, "dropping duplicate root note");
            }
            hash_map::Entry::Vacant(entry) => {
                let expanded = prior_state
                    .get(&rec.id)
                    .copied()
                    .unwrap_or_else(|| policy.default_expanded());
                entry.insert(roots.len());
                roots.push(ThreadNode::root(rec, expanded));
            }
        }
    }

    let mut reply_ids = HashSet::new();
    for rec in notes.iter().filter(|n| n.is_reply) {
        if root_idx.contains_key(&rec.id) || reply_ids.contains(&rec.id) {
            tracing::debug!(note = %rec.id, "dropping reply with an already used id");
            continue;
        }
        match rec.parent().and_then(|p| root_idx.get(p)) {
            Some(&idx) => {
                reply_ids.insert(&rec.id);
                roots[idx].replies.push(ThreadNode::reply(rec));
            }
            None => tracing::debug!(note = %rec.id, parent = ?rec.parent(), "dropping orphan reply"),
        }
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testutil::*, RebuildTicket};

    fn ids(nodes: &[ThreadNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn orphan_reply_dropped() {
        let notes = vec![root("A"), reply("B", "A"), reply("C", "X")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots), vec!["A"]);
        assert_eq!(ids(&roots[0].replies), vec!["B"]);
        assert!(roots[0].replies[0].is_reply);
        assert!(roots[0].replies[0].replies.is_empty());
    }

    #[test]
    fn dropped_orphan_frees_its_id() {
        let notes = vec![root("A"), reply("B", "X"), reply("B", "A")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots[0].replies), vec!["B"]);
    }

    #[test]
    fn order_is_preserved() {
        let notes = vec![
            reply("r1", "B"),
            root("B"),
            reply("r2", "A"),
            root("A"),
            reply("r3", "B"),
            reply("r4", "A"),
            root("C"),
        ];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots), vec!["B", "A", "C"]);
        assert_eq!(ids(&roots[0].replies), vec!["r1", "r3"]);
        assert_eq!(ids(&roots[1].replies), vec!["r2", "r4"]);
        assert!(roots[2].replies.is_empty());
        assert_eq!(roots[0].reply_count(), 2);
    }

    #[test]
    fn timestamps_do_not_reorder() {
        let mut late = reply("late", "A");
        late.created_date = String::from("2030-01-01T00:00:00Z");
        let mut early = reply("early", "A");
        early.created_date = String::from("2000-01-01T00:00:00Z");
        let mut broken = reply("broken", "A");
        broken.created_date = String::from("last tuesday");
        let roots = build(
            &[root("A"), late, broken, early],
            None,
            ExpansionPolicy::Collapsed,
        );
        assert_eq!(ids(&roots[0].replies), vec!["late", "broken", "early"]);
    }

    #[test]
    fn reply_to_reply_is_orphan() {
        let notes = vec![root("A"), reply("B", "A"), reply("C", "B")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots[0].replies), vec!["B"]);
    }

    #[test]
    fn reply_with_empty_parent_is_orphan() {
        let mut r = reply("B", "A");
        r.parent_id = Some(NoteId::new(""));
        let roots = build(&[root("A"), r], None, ExpansionPolicy::Collapsed);
        assert!(roots[0].replies.is_empty());
    }

    #[test]
    fn duplicate_ids_dropped() {
        let mut dup = root("A");
        dup.title = String::from("second A");
        let notes = vec![root("A"), dup, reply("A", "A"), reply("B", "A"), reply("B", "A")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots), vec!["A"]);
        assert_eq!(roots[0].title, "title of A");
        assert_eq!(ids(&roots[0].replies), vec!["B"]);
    }

    #[test]
    fn default_expansion() {
        let notes = vec![root("A"), reply("B", "A")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert!(!roots[0].expanded);
        let roots = build(&notes, None, ExpansionPolicy::Expanded);
        assert!(roots[0].expanded);
        assert!(!roots[0].replies[0].expanded);
    }

    #[test]
    fn expansion_carried_over() {
        let notes = vec![root("R1"), root("R2")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        let prior = ThreadSnapshot::new(RebuildTicket(1), roots)
            .with_expanded(&NoteId::new("R1"), true)
            .unwrap();

        let notes = vec![root("R0"), root("R1"), root("R2")];
        let roots = build(&notes, Some(&prior), ExpansionPolicy::Collapsed);
        assert_eq!(ids(&roots), vec!["R0", "R1", "R2"]);
        assert!(!roots[0].expanded, "new root gets the default");
        assert!(roots[1].expanded);
        assert!(!roots[2].expanded);

        // prior state wins over the policy in both directions
        let prior = prior.with_expanded(&NoteId::new("R2"), false).unwrap();
        let roots = build(&notes, Some(&prior), ExpansionPolicy::Expanded);
        assert!(roots[0].expanded);
        assert!(roots[1].expanded);
        assert!(!roots[2].expanded);
    }

    #[test]
    fn idempotent() {
        let notes = vec![root("A"), reply("B", "A"), root("C"), reply("D", "C")];
        assert_eq!(
            build(&notes, None, ExpansionPolicy::Collapsed),
            build(&notes, None, ExpansionPolicy::Collapsed),
        );
    }

    #[test]
    fn all_unresolved() {
        let notes = vec![root("A"), reply("B", "A")];
        let roots = build(&notes, None, ExpansionPolicy::Collapsed);
        assert!(!roots[0].enrichment.is_settled());
        assert!(!roots[0].replies[0].enrichment.is_settled());
    }
}
