use std::collections::HashSet;

use crate::{Error, LinkRef};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> NoteId {
        NoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note as returned by the service. A fresh fetch replaces the whole set.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub category: String,
    pub body: String,

    /// Id of the root note this one replies to
    #[serde(default)]
    pub parent_id: Option<NoteId>,
    #[serde(default)]
    pub is_reply: bool,

    /// Raw timestamp, as sent by the service (not necessarily parseable)
    pub created_date: String,
    pub created_by: String,

    #[serde(default)]
    pub reply_count: Option<u32>,
}

impl NoteRecord {
    /// The service sends an empty string instead of a missing parent link
    pub fn parent(&self) -> Option<&NoteId> {
        self.parent_id.as_ref().filter(|p| !p.0.is_empty())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub category: String,
    pub body: String,
    pub links: Vec<LinkRef>,
}

impl NoteDraft {
    /// `categories` is the picklist the category must belong to, when known
    pub fn validate(&self, categories: Option<&[String]>) -> Result<(), Error> {
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.category)?;
        crate::validate_string(&self.body)?;
        if self.title.trim().is_empty() {
            return Err(Error::EmptyField(String::from("title")));
        }
        if let Some(categories) = categories {
            if !categories.iter().any(|c| *c == self.category) {
                return Err(Error::UnknownCategory(self.category.clone()));
            }
        }
        let mut seen = HashSet::with_capacity(self.links.len());
        for l in self.links.iter() {
            crate::validate_string(&l.id.0)?;
            crate::validate_string(&l.object_type)?;
            if !seen.insert(&l.id) {
                return Err(Error::DuplicateLink(l.id.0.clone()));
            }
        }
        Ok(())
    }

    /// Record ids and their object types, as the parallel lists the service expects
    pub fn link_columns(&self) -> (Vec<String>, Vec<String>) {
        self.links
            .iter()
            .map(|l| (l.id.0.clone(), l.object_type.clone()))
            .unzip()
    }
}
