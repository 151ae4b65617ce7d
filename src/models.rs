use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

/// `YYYY-MM-DD`, as due dates are stored and entered.
pub const DUE_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The authenticated user all documents are scoped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub uid: String,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

document_id!(
    /// Store-assigned project identifier.
    ProjectId
);
document_id!(
    /// Store-assigned task identifier.
    TaskId
);

/// Fields of a project that has not been persisted yet.
///
/// Unknown fields are carried through `extra` so user-defined data written by
/// other clients survives a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "iso_date")]
    pub due_date: Date,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewProject {
    pub fn new(title: impl Into<String>, description: impl Into<String>, due_date: Date) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn into_project(self, id: ProjectId) -> Project {
        Project {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            extra: self.extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
    pub due_date: Date,
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn due_date_string(&self) -> Result<String, time::error::Format> {
        self.due_date.format(DUE_DATE_FORMAT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub text: String,
    pub project_id: ProjectId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl NewTask {
    /// Stamps the task with the local clock.
    pub fn now(text: impl Into<String>, project_id: ProjectId) -> Self {
        Self {
            text: text.into(),
            project_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            text: self.text,
            project_id: self.project_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub project_id: ProjectId,
    pub created_at: OffsetDateTime,
}
