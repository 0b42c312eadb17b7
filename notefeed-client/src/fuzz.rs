#![cfg(test)]

use std::panic::AssertUnwindSafe;

use crate::{
    api::{NoteId, NoteRecord},
    build, enrich,
    testutil::*,
    Enrichment, ExpansionPolicy, RebuildTicket, ThreadSnapshot,
};

// (is_reply, parent, linked records fail, expanded in prior snapshot)
type Shape = Vec<(bool, u8, bool, bool)>;

const NUM_PARENTS: u8 = 16;

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn records(shape: &Shape) -> Vec<NoteRecord> {
    shape
        .iter()
        .enumerate()
        .map(|(i, (is_reply, parent, _, _))| {
            let id = format!("n{i}");
            match is_reply {
                true => reply(&id, &format!("n{}", parent % NUM_PARENTS)),
                false => root(&id),
            }
        })
        .collect()
}

fn ids_where(shape: &Shape, f: impl Fn(&(bool, u8, bool, bool)) -> bool) -> Vec<NoteId> {
    shape
        .iter()
        .enumerate()
        .filter(|(_, s)| f(*s))
        .map(|(i, _)| NoteId(format!("n{i}")))
        .collect()
}

#[test]
fn build_groups_replies_in_order() {
    bolero::check!()
        .with_type::<Shape>()
        .cloned()
        .for_each(|shape| {
            let notes = records(&shape);
            let roots = build(&notes, None, ExpansionPolicy::Collapsed);

            let root_ids = notes
                .iter()
                .filter(|n| !n.is_reply)
                .map(|n| &n.id)
                .collect::<Vec<_>>();
            assert_eq!(roots.iter().map(|r| &r.id).collect::<Vec<_>>(), root_ids);

            for r in roots.iter() {
                let expected = notes
                    .iter()
                    .filter(|n| n.is_reply && n.parent() == Some(&r.id))
                    .map(|n| &n.id)
                    .collect::<Vec<_>>();
                assert_eq!(r.replies.iter().map(|c| &c.id).collect::<Vec<_>>(), expected);
            }

            // orphans appear nowhere
            let placed = roots.iter().map(|r| r.replies.len()).sum::<usize>();
            let adoptable = notes
                .iter()
                .filter(|n| n.is_reply && n.parent().map_or(false, |p| root_ids.contains(&p)))
                .count();
            assert_eq!(placed, adoptable);

            assert_eq!(build(&notes, None, ExpansionPolicy::Collapsed), roots);
        })
}

#[test]
fn build_carries_expansion() {
    bolero::check!()
        .with_type::<(Shape, Shape)>()
        .cloned()
        .for_each(|(before, after)| {
            let mut prior = ThreadSnapshot::new(
                RebuildTicket(1),
                build(&records(&before), None, ExpansionPolicy::Collapsed),
            );
            for id in ids_where(&before, |s| !s.0 && s.3) {
                prior = prior.with_expanded(&id, true).expect("expanding known root");
            }

            let roots = build(&records(&after), Some(&prior), ExpansionPolicy::Expanded);
            for r in roots.iter() {
                match prior.expanded(&r.id) {
                    Some(expanded) => assert_eq!(r.expanded, expanded),
                    None => assert!(r.expanded, "new roots follow the policy"),
                }
            }
        })
}

do_tokio_test!(enrich_settles_every_node, Shape, |shape: Shape| async move {
    let source = StubSource {
        failing: ids_where(&shape, |s| s.2).into_iter().collect(),
        ..StubSource::default()
    };
    let roots = build(&records(&shape), None, ExpansionPolicy::Collapsed);
    let num_nodes = roots.iter().map(|r| 1 + r.replies.len()).sum::<usize>();

    let snap = ThreadSnapshot::new(RebuildTicket(1), enrich(roots, &source).await);
    assert_eq!(snap.len(), num_nodes);
    assert_eq!(source.calls.lock().len(), num_nodes);
    for n in snap.nodes() {
        match source.failing.contains(&n.id) {
            true => assert!(matches!(n.enrichment, Enrichment::Failed { .. })),
            false => assert!(matches!(n.enrichment, Enrichment::Resolved { .. })),
        }
    }
});
