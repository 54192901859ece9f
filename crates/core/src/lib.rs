#![forbid(unsafe_code)]

mod checklist;
mod model;

pub use checklist::*;
pub use model::*;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// Store-assigned identity of a form record. Never reused once assigned.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RecordId(i64);

    impl RecordId {
        pub fn new(value: i64) -> Self {
            Self(value)
        }

        pub fn get(self) -> i64 {
            self.0
        }
    }

    impl fmt::Display for RecordId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AttachmentId(i64);

    impl AttachmentId {
        pub fn new(value: i64) -> Self {
            Self(value)
        }

        pub fn get(self) -> i64 {
            self.0
        }
    }

    impl fmt::Display for AttachmentId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}
