#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Answer to a single checklist item. The domain is closed: anything else is rejected on write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChecklistValue {
    #[serde(rename = "SI")]
    Si,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "OP")]
    Operative,
    #[serde(rename = "NOP")]
    NotOperative,
    #[serde(rename = "OB")]
    Observed,
}

impl ChecklistValue {
    pub const ALL: [ChecklistValue; 6] = [
        ChecklistValue::Si,
        ChecklistValue::No,
        ChecklistValue::NotApplicable,
        ChecklistValue::Operative,
        ChecklistValue::NotOperative,
        ChecklistValue::Observed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Si => "SI",
            Self::No => "NO",
            Self::NotApplicable => "N/A",
            Self::Operative => "OP",
            Self::NotOperative => "NOP",
            Self::Observed => "OB",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
    }
}

impl fmt::Display for ChecklistValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checklist items persisted as their own domain-constrained columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItem {
    RedSeca,
    RedHumeda,
}

impl ChecklistItem {
    pub const ALL: [ChecklistItem; 2] = [ChecklistItem::RedSeca, ChecklistItem::RedHumeda];

    /// Column name in the record table; also the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedSeca => "red_seca",
            Self::RedHumeda => "red_humeda",
        }
    }
}

impl fmt::Display for ChecklistItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecklistItem {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownChecklistItem {
                item: value.to_string(),
            })
    }
}

/// Answered checklist items. Unanswered items are simply absent.
pub type Checklist = BTreeMap<ChecklistItem, ChecklistValue>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown checklist item: {item}")]
    UnknownChecklistItem { item: String },
    #[error("checklist item {item} has value {value:?} outside SI, NO, N/A, OP, NOP, OB")]
    InvalidChecklistValue { item: ChecklistItem, value: String },
}

/// Validates raw checklist answers as they arrive from the capture form.
///
/// Item names must be known and values must match the domain exactly (case-sensitive). An empty
/// value means the item was left unanswered and is dropped.
pub fn parse_checklist<'a, I>(raw: I) -> Result<Checklist, ValidationError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut checklist = Checklist::new();
    for (item, value) in raw {
        let item = item.parse::<ChecklistItem>()?;
        if value.is_empty() {
            continue;
        }
        let Some(parsed) = ChecklistValue::parse(value) else {
            return Err(ValidationError::InvalidChecklistValue {
                item,
                value: value.to_string(),
            });
        };
        checklist.insert(item, parsed);
    }
    Ok(checklist)
}
