use futures::future::join_all;

use crate::{
    api::{LinkedRecordSource, NoteId},
    Enrichment, ThreadNode,
};

/// Fetch the linked records of every node, roots and replies alike.
///
/// All fetches are polled concurrently on the current task, and this only
/// returns once every one of them settled. A failed fetch only marks its own
/// node as failed.
pub async fn enrich<S>(roots: Vec<ThreadNode>, source: &S) -> Vec<ThreadNode>
where
    S: LinkedRecordSource + ?Sized,
{
    join_all(roots.into_iter().map(|root| enrich_root(root, source))).await
}

async fn enrich_root<S>(mut root: ThreadNode, source: &S) -> ThreadNode
where
    S: LinkedRecordSource + ?Sized,
{
    let replies = std::mem::take(&mut root.replies);
    let (enrichment, replies) = futures::join!(
        fetch_enrichment(&root.id, source),
        join_all(replies.into_iter().map(|reply| async move {
            let enrichment = fetch_enrichment(&reply.id, source).await;
            reply.with_enrichment(enrichment)
        })),
    );
    ThreadNode {
        replies,
        ..root.with_enrichment(enrichment)
    }
}

async fn fetch_enrichment<S>(note: &NoteId, source: &S) -> Enrichment
where
    S: LinkedRecordSource + ?Sized,
{
    match source.fetch_linked_records(note).await {
        Ok(records) => Enrichment::resolved(records),
        Err(err) => {
            tracing::warn!(%note, ?err, "failed fetching linked records");
            Enrichment::failed(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build, testutil::*, ExpansionPolicy};

    fn tree() -> Vec<ThreadNode> {
        let notes = vec![
            root("A"),
            reply("A1", "A"),
            reply("A2", "A"),
            root("B"),
            root("C"),
            reply("C1", "C"),
        ];
        build(&notes, None, ExpansionPolicy::Collapsed)
    }

    fn all_nodes(roots: &[ThreadNode]) -> Vec<&ThreadNode> {
        roots
            .iter()
            .flat_map(|r| std::iter::once(r).chain(r.replies.iter()))
            .collect()
    }

    #[tokio::test]
    async fn every_node_settled() {
        let source = StubSource::default();
        let roots = enrich(tree(), &source).await;
        let nodes = all_nodes(&roots);
        assert_eq!(nodes.len(), 6);
        assert_eq!(source.calls.lock().len(), 6);
        for n in nodes {
            assert_eq!(
                n.enrichment.display_text(),
                Some(&format!("Record {}", n.id) as &str),
            );
        }
    }

    #[tokio::test]
    async fn structure_kept() {
        let before = tree();
        let after = enrich(before.clone(), &StubSource::default()).await;
        assert_eq!(after.len(), before.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.id, a.id);
            assert_eq!(b.expanded, a.expanded);
            let b_replies = b.replies.iter().map(|r| &r.id).collect::<Vec<_>>();
            let a_replies = a.replies.iter().map(|r| &r.id).collect::<Vec<_>>();
            assert_eq!(b_replies, a_replies);
        }
    }

    #[tokio::test]
    async fn failure_is_isolated() {
        let source = StubSource::failing_on(&["A2"]);
        let roots = enrich(tree(), &source).await;
        for n in all_nodes(&roots) {
            match n.id.as_str() {
                "A2" => {
                    assert!(matches!(n.enrichment, Enrichment::Failed { .. }));
                    assert_eq!(
                        n.enrichment.display_text(),
                        Some("Error loading related records"),
                    );
                }
                _ => assert!(matches!(n.enrichment, Enrichment::Resolved { .. })),
            }
        }
    }

    #[tokio::test]
    async fn empty_result_is_current_record_only() {
        let source = StubSource::empty_on(&["A"]);
        let roots = enrich(tree(), &source).await;
        assert_eq!(
            roots[0].enrichment,
            Enrichment::Resolved {
                display_text: String::from("Current record only"),
                linked_records: Vec::new(),
            },
        );
    }

    #[tokio::test]
    async fn everything_fails() {
        let source = StubSource::failing_on(&["A", "A1", "A2", "B", "C", "C1"]);
        let roots = enrich(tree(), &source).await;
        assert!(all_nodes(&roots)
            .iter()
            .all(|n| matches!(n.enrichment, Enrichment::Failed { .. })));
    }

    #[tokio::test]
    async fn empty_tree() {
        let source = StubSource::default();
        assert!(enrich(Vec::new(), &source).await.is_empty());
        assert!(source.calls.lock().is_empty());
    }
}
