#![cfg(test)]

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{LinkedRecord, LinkedRecordSource, NoteId, NoteRecord, RecordId};

pub fn note(id: &str, is_reply: bool, parent: Option<&str>) -> NoteRecord {
    NoteRecord {
        id: NoteId::new(id),
        title: format!("title of {id}"),
        category: String::from("General"),
        body: format!("body of {id}"),
        parent_id: parent.map(NoteId::new),
        is_reply,
        created_date: String::from("2023-03-14T15:09:26Z"),
        created_by: String::from("Jane Doe"),
        reply_count: None,
    }
}

pub fn root(id: &str) -> NoteRecord {
    note(id, false, None)
}

pub fn reply(id: &str, parent: &str) -> NoteRecord {
    note(id, true, Some(parent))
}

/// Every note is linked to one record named after it, except the failing ones
#[derive(Default)]
pub struct StubSource {
    pub failing: HashSet<NoteId>,
    pub empty: HashSet<NoteId>,
    pub calls: Mutex<Vec<NoteId>>,
}

impl StubSource {
    pub fn failing_on(ids: &[&str]) -> StubSource {
        StubSource {
            failing: ids.iter().map(|i| NoteId::new(*i)).collect(),
            ..StubSource::default()
        }
    }

    pub fn empty_on(ids: &[&str]) -> StubSource {
        StubSource {
            empty: ids.iter().map(|i| NoteId::new(*i)).collect(),
            ..StubSource::default()
        }
    }
}

#[async_trait]
impl LinkedRecordSource for StubSource {
    async fn fetch_linked_records(&self, note: &NoteId) -> anyhow::Result<Vec<LinkedRecord>> {
        self.calls.lock().push(note.clone());
        tokio::task::yield_now().await;
        if self.failing.contains(note) {
            anyhow::bail!("linked records of {note} are unavailable");
        }
        if self.empty.contains(note) {
            return Ok(Vec::new());
        }
        Ok(vec![LinkedRecord {
            id: RecordId::new(format!("rec-{note}")),
            name: format!("Record {note}"),
            related_object_type: String::from("Account"),
        }])
    }
}
