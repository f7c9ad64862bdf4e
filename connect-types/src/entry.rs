//! Relayed entries.
//!
//! An [`Entry`] is one text snippet or file reference pushed into a room.
//! The JSON form is flat, with a `type` discriminator next to the envelope
//! fields:
//!
//! ```json
//! {"id":"a1b2c3","from":"laptop","type":"text","content":"hello"}
//! {"id":"d4e5f6","from":"phone","type":"file","url":"9f2c_cat.png","name":"cat.png"}
//! ```

use serde::{Deserialize, Serialize};

use crate::{DeviceId, EntryId};

/// One item in a room's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Short random token.
    pub id: EntryId,
    /// Device that pushed the entry.
    pub from: DeviceId,
    /// Text or file payload.
    #[serde(flatten)]
    pub body: EntryBody,
}

impl Entry {
    /// Assemble an entry from its parts.
    pub fn new(id: EntryId, from: DeviceId, body: EntryBody) -> Self {
        Self { id, from, body }
    }

    /// Whether this entry carries a file reference.
    pub fn is_file(&self) -> bool {
        matches!(self.body, EntryBody::File { .. })
    }
}

/// Payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryBody {
    /// A text snippet.
    Text {
        /// Arbitrary text; `null` when the push carried neither text nor file.
        content: Option<String>,
    },
    /// A file held by the blob store.
    File {
        /// Storage reference used to download the file.
        url: String,
        /// Original filename as uploaded. Untrusted.
        name: String,
    },
}

impl EntryBody {
    /// Build a text payload.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: Some(content.into()),
        }
    }

    /// Build a text payload without content.
    pub fn empty_text() -> Self {
        Self::Text { content: None }
    }

    /// Build a file payload.
    pub fn file(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self::File {
            url: url.into(),
            name: name.into(),
        }
    }
}
