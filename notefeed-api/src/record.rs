#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> RecordId {
        RecordId(id.into())
    }
}

/// The record a note feed is attached to (eg. an account or a case)
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub id: RecordId,
    pub object_type: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedRecord {
    pub id: RecordId,
    pub name: String,
    pub related_object_type: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SearchHit {
    pub id: RecordId,
    pub name: String,
}

/// A link to be attached to a note on creation or update
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub id: RecordId,
    pub object_type: String,
}

impl LinkRef {
    pub fn from_hit(hit: &SearchHit, object_type: &str) -> LinkRef {
        LinkRef {
            id: hit.id.clone(),
            object_type: String::from(object_type),
        }
    }
}
