use crate::api::{LinkedRecord, NoteId, NoteRecord, CURRENT_RECORD_ONLY, LINKED_RECORDS_ERROR};

/// Whether a root's reply list is shown when nothing is known about it yet
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionPolicy {
    #[default]
    Collapsed,
    Expanded,
}

impl ExpansionPolicy {
    pub fn default_expanded(&self) -> bool {
        match self {
            ExpansionPolicy::Collapsed => false,
            ExpansionPolicy::Expanded => true,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Enrichment {
    Unresolved,
    Resolved {
        display_text: String,
        linked_records: Vec<LinkedRecord>,
    },
    Failed {
        display_text: String,
        reason: String,
    },
}

impl Enrichment {
    pub fn resolved(linked_records: Vec<LinkedRecord>) -> Enrichment {
        let display_text = match linked_records.is_empty() {
            true => String::from(CURRENT_RECORD_ONLY),
            false => linked_records
                .iter()
                .map(|r| &r.name as &str)
                .collect::<Vec<_>>()
                .join(", "),
        };
        Enrichment::Resolved {
            display_text,
            linked_records,
        }
    }

    pub fn failed(err: &anyhow::Error) -> Enrichment {
        Enrichment::Failed {
            display_text: String::from(LINKED_RECORDS_ERROR),
            reason: format!("{err:#}"),
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Enrichment::Unresolved)
    }

    pub fn display_text(&self) -> Option<&str> {
        match self {
            Enrichment::Unresolved => None,
            Enrichment::Resolved { display_text, .. } | Enrichment::Failed { display_text, .. } => {
                Some(display_text.as_str())
            }
        }
    }

    /// Failed and unresolved nodes have no linked records
    pub fn linked_records(&self) -> &[LinkedRecord] {
        match self {
            Enrichment::Resolved { linked_records, .. } => linked_records.as_slice(),
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ThreadNode {
    pub id: NoteId,
    pub title: String,
    pub category: String,
    pub body: String,
    pub created_date: String,
    pub created_by: String,

    pub is_reply: bool,

    /// Whether the reply list is shown, always false on replies
    pub expanded: bool,

    /// Replies in the order the service listed them, always empty on replies
    pub replies: Vec<ThreadNode>,

    pub enrichment: Enrichment,
}

impl ThreadNode {
    fn from_record(rec: &NoteRecord, is_reply: bool, expanded: bool) -> ThreadNode {
        ThreadNode {
            id: rec.id.clone(),
            title: rec.title.clone(),
            category: rec.category.clone(),
            body: rec.body.clone(),
            created_date: rec.created_date.clone(),
            created_by: rec.created_by.clone(),
            is_reply,
            expanded,
            replies: Vec::new(),
            enrichment: Enrichment::Unresolved,
        }
    }

    pub(crate) fn root(rec: &NoteRecord, expanded: bool) -> ThreadNode {
        ThreadNode::from_record(rec, false, expanded)
    }

    pub(crate) fn reply(rec: &NoteRecord) -> ThreadNode {
        ThreadNode::from_record(rec, true, false)
    }

    pub(crate) fn with_enrichment(self, enrichment: Enrichment) -> ThreadNode {
        debug_assert!(
            !self.enrichment.is_settled(),
            "node {} was already enriched",
            self.id
        );
        ThreadNode { enrichment, ..self }
    }

    pub(crate) fn with_expanded(self, expanded: bool) -> ThreadNode {
        ThreadNode { expanded, ..self }
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    pub fn created_display(&self) -> String {
        crate::display_date(&self.created_date)
    }
}
