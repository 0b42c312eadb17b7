use async_trait::async_trait;

mod error;
pub use error::Error;

mod note;
pub use note::{NoteDraft, NoteId, NoteRecord};

mod record;
pub use record::{HostRecord, LinkRef, LinkedRecord, RecordId, SearchHit};

pub const CURRENT_RECORD_ONLY: &str = "Current record only";
pub const LINKED_RECORDS_ERROR: &str = "Error loading related records";

pub(crate) fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

/// Source of the records a note is linked to.
///
/// Split from [`NoteService`] so that enrichment only depends on the one call
/// it actually makes.
#[async_trait]
pub trait LinkedRecordSource {
    async fn fetch_linked_records(&self, note: &NoteId) -> anyhow::Result<Vec<LinkedRecord>>;
}

#[async_trait]
pub trait NoteService: LinkedRecordSource {
    async fn fetch_notes(&self, host: &HostRecord) -> anyhow::Result<Vec<NoteRecord>>;
    async fn fetch_category_options(&self) -> anyhow::Result<Vec<String>>;

    /// Returns the id of the newly created note
    async fn create_note(
        &self,
        host: &HostRecord,
        draft: &NoteDraft,
        parent: Option<&NoteId>,
    ) -> anyhow::Result<NoteId>;
    async fn update_note(&self, note: &NoteId, draft: &NoteDraft) -> anyhow::Result<()>;
    async fn delete_note(&self, note: &NoteId) -> anyhow::Result<()>;

    async fn search_records(&self, term: &str, object_type: &str)
        -> anyhow::Result<Vec<SearchHit>>;
}
