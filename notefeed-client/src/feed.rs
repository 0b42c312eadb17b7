use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;

use crate::{
    api::{Error, HostRecord, NoteDraft, NoteId, NoteService, SearchHit},
    rebuild_thread, ExpansionPolicy, RebuildSequence, ThreadSnapshot,
};

/// Search terms shorter than this never reach the service
pub const MIN_SEARCH_LEN: usize = 2;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Refresh {
    Published(Arc<ThreadSnapshot>),

    /// Another refresh was started in the meantime, this result was dropped
    Stale,
}

/// State of the note feed of one host record, as seen by a view.
///
/// Everything that changes the thread ends in a refresh, that refetches the
/// notes and rebuilds the whole snapshot.
pub struct NoteFeed<S> {
    service: S,
    host: HostRecord,
    policy: ExpansionPolicy,
    sequence: RebuildSequence,
    current: Mutex<Option<Arc<ThreadSnapshot>>>,
    categories: Mutex<Option<Arc<Vec<String>>>>,
}

impl<S: NoteService> NoteFeed<S> {
    pub fn new(service: S, host: HostRecord, policy: ExpansionPolicy) -> NoteFeed<S> {
        NoteFeed {
            service,
            host,
            policy,
            sequence: RebuildSequence::new(),
            current: Mutex::new(None),
            categories: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn host(&self) -> &HostRecord {
        &self.host
    }

    pub fn snapshot(&self) -> Option<Arc<ThreadSnapshot>> {
        self.current.lock().clone()
    }

    pub async fn refresh(&self) -> anyhow::Result<Refresh> {
        let ticket = self.sequence.issue();
        let notes = self.service.fetch_notes(&self.host).await.with_context(|| {
            format!(
                "fetching notes for {} {:?}",
                self.host.object_type, self.host.id
            )
        })?;
        let prior = self.snapshot();
        let snapshot =
            rebuild_thread(&notes, prior.as_deref(), self.policy, ticket, &self.service).await;
        Ok(self.publish(snapshot))
    }

    fn publish(&self, snapshot: ThreadSnapshot) -> Refresh {
        let mut current = self.current.lock();
        if !self.sequence.is_latest(snapshot.ticket()) {
            tracing::debug!(ticket = ?snapshot.ticket(), "discarding stale thread snapshot");
            return Refresh::Stale;
        }
        // expansion may have been toggled while the rebuild was running
        let snapshot = match current.as_deref() {
            Some(cur) => snapshot.with_expansion_of(cur),
            None => snapshot,
        };
        let snapshot = Arc::new(snapshot);
        *current = Some(snapshot.clone());
        Refresh::Published(snapshot)
    }

    pub fn set_expanded(&self, id: &NoteId, expanded: bool) -> Result<Arc<ThreadSnapshot>, Error> {
        self.replace_expanded(id, |_| expanded)
    }

    pub fn toggle_expanded(&self, id: &NoteId) -> Result<Arc<ThreadSnapshot>, Error> {
        self.replace_expanded(id, |was| !was)
    }

    fn replace_expanded(
        &self,
        id: &NoteId,
        f: impl FnOnce(bool) -> bool,
    ) -> Result<Arc<ThreadSnapshot>, Error> {
        let mut current = self.current.lock();
        let snapshot = current
            .as_deref()
            .and_then(|s| s.with_expanded(id, f(s.expanded(id)?)))
            .ok_or_else(|| Error::UnknownNote(id.0.clone()))?;
        let snapshot = Arc::new(snapshot);
        *current = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// The category picklist, fetched once then cached
    pub async fn categories(&self) -> anyhow::Result<Arc<Vec<String>>> {
        if let Some(categories) = self.categories.lock().clone() {
            return Ok(categories);
        }
        let categories = Arc::new(
            self.service
                .fetch_category_options()
                .await
                .context("fetching category options")?,
        );
        *self.categories.lock() = Some(categories.clone());
        Ok(categories)
    }

    async fn validate(&self, draft: &NoteDraft) -> anyhow::Result<()> {
        let categories = self.categories().await?;
        let known = Some(&categories[..]).filter(|c| !c.is_empty());
        draft.validate(known)?;
        Ok(())
    }

    fn ensure_known(&self, id: &NoteId, root_only: bool) -> Result<(), Error> {
        let known = self.snapshot().map_or(false, |s| match root_only {
            true => s.root(id).is_some(),
            false => s.get(id).is_some(),
        });
        match known {
            true => Ok(()),
            false => Err(Error::UnknownNote(id.0.clone())),
        }
    }

    /// Creates a root note, returning its id once the thread was refreshed
    pub async fn create_note(&self, draft: &NoteDraft) -> anyhow::Result<NoteId> {
        self.validate(draft).await?;
        let id = self
            .service
            .create_note(&self.host, draft, None)
            .await
            .context("creating note")?;
        tracing::info!(note = %id, "created note");
        self.refresh().await?;
        Ok(id)
    }

    pub async fn reply_to(&self, parent: &NoteId, draft: &NoteDraft) -> anyhow::Result<NoteId> {
        self.ensure_known(parent, true)?;
        self.validate(draft).await?;
        let id = self
            .service
            .create_note(&self.host, draft, Some(parent))
            .await
            .with_context(|| format!("replying to note {parent}"))?;
        tracing::info!(note = %id, %parent, "created reply");
        self.refresh().await?;
        Ok(id)
    }

    pub async fn update_note(&self, id: &NoteId, draft: &NoteDraft) -> anyhow::Result<()> {
        self.ensure_known(id, false)?;
        self.validate(draft).await?;
        self.service
            .update_note(id, draft)
            .await
            .with_context(|| format!("updating note {id}"))?;
        tracing::info!(note = %id, "updated note");
        self.refresh().await?;
        Ok(())
    }

    pub async fn delete_note(&self, id: &NoteId) -> anyhow::Result<()> {
        self.ensure_known(id, false)?;
        self.service
            .delete_note(id)
            .await
            .with_context(|| format!("deleting note {id}"))?;
        tracing::info!(note = %id, "deleted note");
        self.refresh().await?;
        Ok(())
    }

    pub async fn search_records(
        &self,
        term: &str,
        object_type: &str,
    ) -> anyhow::Result<Vec<SearchHit>> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }
        self.service
            .search_records(term, object_type)
            .await
            .with_context(|| format!("searching {object_type} records for {term:?}"))
    }
}
