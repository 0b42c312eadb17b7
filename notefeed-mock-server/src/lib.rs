use std::{
    collections::{HashMap, HashSet, VecDeque},
    time::Duration,
};

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use notefeed_api::{
    Error, HostRecord, LinkedRecord, LinkedRecordSource, NoteDraft, NoteId, NoteRecord,
    NoteService, RecordId, SearchHit,
};
use parking_lot::Mutex;
use uuid::Uuid;

pub const MOCK_USER: &str = "Mock User";

/// Contents a mock server can be loaded from
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dump {
    pub host: HostRecord,
    pub notes: Vec<NoteRecord>,
    #[serde(default)]
    pub links: HashMap<NoteId, Vec<LinkedRecord>>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub records: Vec<SearchableRecord>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableRecord {
    pub object_type: String,
    pub id: RecordId,
    pub name: String,
}

/// In-memory note service.
///
/// Notes are listed in creation order. Failures and latency can be injected
/// per call, to exercise the client's error paths.
pub struct MockServer(Mutex<State>);

#[derive(Default)]
struct State {
    notes: Vec<(RecordId, NoteRecord)>,
    links: HashMap<NoteId, Vec<LinkedRecord>>,
    categories: Vec<String>,
    records: Vec<(String, SearchHit)>,

    fail_notes: bool,
    failing_links: HashSet<NoteId>,
    notes_delays: VecDeque<Duration>,
    links_delays: HashMap<NoteId, Duration>,

    num_category_fetches: usize,
    num_search_calls: usize,
}

impl State {
    fn note_mut(&mut self, id: &NoteId) -> Result<&mut NoteRecord, Error> {
        self.notes
            .iter_mut()
            .map(|(_, n)| n)
            .find(|n| n.id == *id)
            .ok_or_else(|| Error::UnknownNote(id.0.clone()))
    }

    fn has_note(&self, id: &NoteId) -> bool {
        self.notes.iter().any(|(_, n)| n.id == *id)
    }

    fn record_name(&self, id: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|(_, r)| r.id.0 == id)
            .map(|(_, r)| &r.name as &str)
    }

    fn resolve_links(&self, draft: &NoteDraft) -> Vec<LinkedRecord> {
        let (ids, types) = draft.link_columns();
        ids.into_iter()
            .zip(types.into_iter())
            .map(|(id, related_object_type)| LinkedRecord {
                name: String::from(self.record_name(&id).unwrap_or(&id)),
                id: RecordId(id),
                related_object_type,
            })
            .collect()
    }
}

impl MockServer {
    pub fn new(categories: Vec<String>) -> MockServer {
        MockServer(Mutex::new(State {
            categories,
            ..State::default()
        }))
    }

    pub fn from_dump(dump: &Dump) -> MockServer {
        let server = MockServer::new(dump.categories.clone());
        for n in dump.notes.iter() {
            server.add_note(&dump.host, n.clone());
        }
        for (note, links) in dump.links.iter() {
            server.set_links(note, links.clone());
        }
        for r in dump.records.iter() {
            server.add_searchable(&r.object_type, r.id.clone(), &r.name);
        }
        server
    }

    pub fn add_note(&self, host: &HostRecord, note: NoteRecord) {
        self.0.lock().notes.push((host.id.clone(), note));
    }

    pub fn set_links(&self, note: &NoteId, links: Vec<LinkedRecord>) {
        self.0.lock().links.insert(note.clone(), links);
    }

    pub fn add_searchable(&self, object_type: &str, id: RecordId, name: &str) {
        self.0.lock().records.push((
            String::from(object_type),
            SearchHit {
                id,
                name: String::from(name),
            },
        ));
    }

    pub fn fail_fetch_notes(&self, fail: bool) {
        self.0.lock().fail_notes = fail;
    }

    pub fn fail_linked_records_for(&self, note: &NoteId) {
        self.0.lock().failing_links.insert(note.clone());
    }

    /// Delays are consumed one per `fetch_notes` call, in order
    pub fn delay_next_fetch_notes(&self, delay: Duration) {
        self.0.lock().notes_delays.push_back(delay);
    }

    pub fn delay_linked_records_for(&self, note: &NoteId, delay: Duration) {
        self.0.lock().links_delays.insert(note.clone(), delay);
    }

    pub fn test_note(&self, id: &NoteId) -> Option<NoteRecord> {
        self.0
            .lock()
            .notes
            .iter()
            .find(|(_, n)| n.id == *id)
            .map(|(_, n)| n.clone())
    }

    pub fn test_num_category_fetches(&self) -> usize {
        self.0.lock().num_category_fetches
    }

    pub fn test_num_search_calls(&self) -> usize {
        self.0.lock().num_search_calls
    }
}

#[async_trait]
impl LinkedRecordSource for MockServer {
    async fn fetch_linked_records(&self, note: &NoteId) -> anyhow::Result<Vec<LinkedRecord>> {
        let delay = self.0.lock().links_delays.get(note).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let s = self.0.lock();
        if s.failing_links.contains(note) {
            bail!("linked records of note {note} are unavailable");
        }
        if !s.has_note(note) {
            return Err(Error::UnknownNote(note.0.clone()).into());
        }
        Ok(s.links.get(note).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl NoteService for MockServer {
    async fn fetch_notes(&self, host: &HostRecord) -> anyhow::Result<Vec<NoteRecord>> {
        let delay = self.0.lock().notes_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let s = self.0.lock();
        if s.fail_notes {
            bail!("note service is unavailable");
        }
        let mut reply_counts: HashMap<&NoteId, u32> = HashMap::new();
        for n in s.notes.iter().map(|(_, n)| n).filter(|n| n.is_reply) {
            if let Some(p) = n.parent() {
                *reply_counts.entry(p).or_insert(0) += 1;
            }
        }
        Ok(s.notes
            .iter()
            .filter(|(h, _)| *h == host.id)
            .map(|(_, n)| NoteRecord {
                reply_count: match n.is_reply {
                    true => None,
                    false => Some(reply_counts.get(&n.id).copied().unwrap_or(0)),
                },
                ..n.clone()
            })
            .collect())
    }

    async fn fetch_category_options(&self) -> anyhow::Result<Vec<String>> {
        let mut s = self.0.lock();
        s.num_category_fetches += 1;
        Ok(s.categories.clone())
    }

    async fn create_note(
        &self,
        host: &HostRecord,
        draft: &NoteDraft,
        parent: Option<&NoteId>,
    ) -> anyhow::Result<NoteId> {
        let mut s = self.0.lock();
        if let Some(parent) = parent {
            if !s.notes.iter().any(|(_, n)| n.id == *parent && !n.is_reply) {
                return Err(Error::UnknownNote(parent.0.clone()).into());
            }
        }
        let id = NoteId(Uuid::new_v4().simple().to_string());
        let links = s.resolve_links(draft);
        s.links.insert(id.clone(), links);
        s.notes.push((
            host.id.clone(),
            NoteRecord {
                id: id.clone(),
                title: draft.title.clone(),
                category: draft.category.clone(),
                body: draft.body.clone(),
                parent_id: parent.cloned(),
                is_reply: parent.is_some(),
                created_date: Utc::now().to_rfc3339(),
                created_by: String::from(MOCK_USER),
                reply_count: None,
            },
        ));
        Ok(id)
    }

    async fn update_note(&self, note: &NoteId, draft: &NoteDraft) -> anyhow::Result<()> {
        let mut s = self.0.lock();
        let links = s.resolve_links(draft);
        let n = s.note_mut(note)?;
        n.title = draft.title.clone();
        n.category = draft.category.clone();
        n.body = draft.body.clone();
        s.links.insert(note.clone(), links);
        Ok(())
    }

    async fn delete_note(&self, note: &NoteId) -> anyhow::Result<()> {
        let mut s = self.0.lock();
        if !s.has_note(note) {
            return Err(Error::UnknownNote(note.0.clone()).into());
        }
        // replies go away with their root
        let removed = s
            .notes
            .iter()
            .filter(|(_, n)| n.id == *note || n.parent() == Some(note))
            .map(|(_, n)| n.id.clone())
            .collect::<HashSet<_>>();
        s.notes.retain(|(_, n)| !removed.contains(&n.id));
        s.links.retain(|id, _| !removed.contains(id));
        Ok(())
    }

    async fn search_records(
        &self,
        term: &str,
        object_type: &str,
    ) -> anyhow::Result<Vec<SearchHit>> {
        let mut s = self.0.lock();
        s.num_search_calls += 1;
        let term = term.to_lowercase();
        Ok(s.records
            .iter()
            .filter(|(t, r)| t == object_type && r.name.to_lowercase().contains(&term))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notefeed_api::LinkRef;

    fn host(id: &str) -> HostRecord {
        HostRecord {
            id: RecordId::new(id),
            object_type: String::from("Case"),
        }
    }

    fn draft(title: &str) -> NoteDraft {
        NoteDraft {
            title: String::from(title),
            category: String::from("General"),
            body: String::new(),
            links: Vec::new(),
        }
    }

    #[tokio::test]
    async fn notes_are_per_host() {
        let server = MockServer::new(Vec::new());
        let a = server.create_note(&host("h1"), &draft("a"), None).await.unwrap();
        server.create_note(&host("h2"), &draft("b"), None).await.unwrap();
        let r = server.create_note(&host("h1"), &draft("r"), Some(&a)).await.unwrap();

        let notes = server.fetch_notes(&host("h1")).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, a);
        assert_eq!(notes[0].reply_count, Some(1));
        assert_eq!(notes[1].id, r);
        assert_eq!(notes[1].parent(), Some(&a));
        assert_eq!(notes[1].created_by, MOCK_USER);
    }

    #[tokio::test]
    async fn reply_needs_root_parent() {
        let server = MockServer::new(Vec::new());
        let a = server.create_note(&host("h"), &draft("a"), None).await.unwrap();
        let r = server.create_note(&host("h"), &draft("r"), Some(&a)).await.unwrap();
        assert!(server.create_note(&host("h"), &draft("rr"), Some(&r)).await.is_err());
        let missing = NoteId::new("missing");
        assert!(server
            .create_note(&host("h"), &draft("x"), Some(&missing))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn links_are_named() {
        let server = MockServer::new(Vec::new());
        server.add_searchable("Contact", RecordId::new("003"), "Alice");
        let mut d = draft("a");
        d.links = vec![
            LinkRef {
                id: RecordId::new("003"),
                object_type: String::from("Contact"),
            },
            LinkRef {
                id: RecordId::new("004"),
                object_type: String::from("Contact"),
            },
        ];
        let a = server.create_note(&host("h"), &d, None).await.unwrap();
        let links = server.fetch_linked_records(&a).await.unwrap();
        let names = links.iter().map(|l| &l.name as &str).collect::<Vec<_>>();
        assert_eq!(names, vec!["Alice", "004"]);

        server.update_note(&a, &draft("a2")).await.unwrap();
        assert!(server.fetch_linked_records(&a).await.unwrap().is_empty());
        assert_eq!(server.test_note(&a).unwrap().title, "a2");
    }

    #[tokio::test]
    async fn delete_cascades() {
        let server = MockServer::new(Vec::new());
        let a = server.create_note(&host("h"), &draft("a"), None).await.unwrap();
        let r = server.create_note(&host("h"), &draft("r"), Some(&a)).await.unwrap();
        let b = server.create_note(&host("h"), &draft("b"), None).await.unwrap();
        server.delete_note(&a).await.unwrap();
        assert!(server.test_note(&r).is_none());
        assert!(server.fetch_linked_records(&r).await.is_err());
        let notes = server.fetch_notes(&host("h")).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, b);
        assert!(server.delete_note(&a).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let server = MockServer::new(Vec::new());
        let a = server.create_note(&host("h"), &draft("a"), None).await.unwrap();
        server.fail_linked_records_for(&a);
        assert!(server.fetch_linked_records(&a).await.is_err());
        server.fail_fetch_notes(true);
        assert!(server.fetch_notes(&host("h")).await.is_err());
        server.fail_fetch_notes(false);
        assert!(server.fetch_notes(&host("h")).await.is_ok());
    }

    #[test]
    fn load_dump() {
        let dump: Dump = serde_json::from_str(
            r#"{
                "host": {"id": "001", "objectType": "Account"},
                "notes": [
                    {"id": "A", "title": "t", "category": "General", "body": "b",
                     "createdDate": "2023-01-01T00:00:00Z", "createdBy": "me"}
                ],
                "links": {"A": [{"id": "003", "name": "Alice", "relatedObjectType": "Contact"}]},
                "categories": ["General"]
            }"#,
        )
        .unwrap();
        let server = MockServer::from_dump(&dump);
        assert!(server.test_note(&NoteId::new("A")).is_some());
        assert!(dump.records.is_empty());
    }
}
