use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Unknown note {0}")]
    UnknownNote(String),

    #[error("Field must not be empty: {0}")]
    EmptyField(String),

    #[error("Category is not part of the picklist {0:?}")]
    UnknownCategory(String),

    #[error("Record linked more than once {0}")]
    DuplicateLink(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::UnknownNote(id) => json!({
                "message": "unknown note",
                "type": "unknown-note",
                "id": id,
            }),
            Error::EmptyField(field) => json!({
                "message": "field must not be empty",
                "type": "empty-field",
                "field": field,
            }),
            Error::UnknownCategory(c) => json!({
                "message": "category is not part of the picklist",
                "type": "unknown-category",
                "category": c,
            }),
            Error::DuplicateLink(id) => json!({
                "message": "record linked more than once",
                "type": "duplicate-link",
                "id": id,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let field = |name: &str, what: &str| -> anyhow::Result<String> {
            data.get(name)
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error is {what} without a {name}"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "unknown-note" => Error::UnknownNote(field("id", "an unknown note")?),
                "empty-field" => Error::EmptyField(field("field", "an empty field")?),
                "unknown-category" => {
                    Error::UnknownCategory(field("category", "an unknown category")?)
                }
                "duplicate-link" => Error::DuplicateLink(field("id", "a duplicate link")?),
                "null-byte" => {
                    Error::NullByteInString(field("string", "a null-byte-in-string")?)
                }
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_parse_back() {
        for err in [
            Error::Unknown(String::from("boom")),
            Error::UnknownNote(String::from("a0B")),
            Error::EmptyField(String::from("title")),
            Error::UnknownCategory(String::from("Other")),
            Error::DuplicateLink(String::from("001")),
            Error::NullByteInString(String::from("a\0b")),
        ] {
            assert_eq!(Error::parse(&err.contents()).unwrap(), err);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Error::parse(b"not json").is_err());
        assert!(Error::parse(br#"{"type":"nope"}"#).is_err());
        assert!(Error::parse(br#"{"type":"unknown-note"}"#).is_err());
        assert_eq!(
            Error::parse(br#"{"type":"unknown"}"#).unwrap(),
            Error::Unknown(String::new()),
        );
    }
}
