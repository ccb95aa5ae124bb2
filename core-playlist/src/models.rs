//! Playlist domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One membership of a video in a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Membership identifier; distinct from the video identifier
    pub id: String,
    pub title: String,
    pub channel: String,
    /// Length in seconds, when known
    pub duration: Option<u64>,
    /// ISO-8601 timestamp of when the item was added to the playlist
    pub date_added: String,
    /// ISO-8601 timestamp of when the video was published
    pub date_uploaded: Option<String>,
    /// Zero-based position at load time
    pub original_index: usize,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, original_index: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            channel: String::new(),
            duration: None,
            date_added: String::new(),
            date_uploaded: None,
            original_index,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_date_added(mut self, date: impl Into<String>) -> Self {
        self.date_added = date.into();
        self
    }

    pub fn with_date_uploaded(mut self, date: impl Into<String>) -> Self {
        self.date_uploaded = Some(date.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    /// Map a provider privacy status; anything but `public` is private
    pub fn from_privacy_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case("public") {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub visibility: Visibility,
    /// Equals the number of items after every successful load or apply
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Channel,
    Duration,
    DateAdded,
    DateUploaded,
    Title,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Channel => "channel",
            SortField::Duration => "duration",
            SortField::DateAdded => "dateAdded",
            SortField::DateUploaded => "dateUploaded",
            SortField::Title => "title",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortRule {
    pub field: SortField,
    pub direction: SortDirection,
    /// Lower values are evaluated first
    pub precedence: i32,
}

impl SortRule {
    pub fn new(field: SortField, direction: SortDirection, precedence: i32) -> Self {
        Self {
            field,
            direction,
            precedence,
        }
    }

    pub fn asc(field: SortField, precedence: i32) -> Self {
        Self::new(field, SortDirection::Asc, precedence)
    }

    pub fn desc(field: SortField, precedence: i32) -> Self {
        Self::new(field, SortDirection::Desc, precedence)
    }
}

/// Set of sort rules, kept in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    rules: Vec<SortRule>,
}

impl SortSpec {
    pub fn new(rules: Vec<SortRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[SortRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in evaluation order. Equal precedence keeps declaration order.
    pub fn ordered(&self) -> Vec<SortRule> {
        let mut ordered = self.rules.clone();
        ordered.sort_by_key(|rule| rule.precedence);
        ordered
    }
}

impl From<Vec<SortRule>> for SortSpec {
    fn from(rules: Vec<SortRule>) -> Self {
        Self::new(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_mapping() {
        assert_eq!(Visibility::from_privacy_status("public"), Visibility::Public);
        assert_eq!(Visibility::from_privacy_status("unlisted"), Visibility::Private);
        assert_eq!(Visibility::from_privacy_status("private"), Visibility::Private);
        assert_eq!(Visibility::from_privacy_status(""), Visibility::Private);
    }

    #[test]
    fn test_sort_spec_equal_precedence_keeps_declaration_order() {
        let spec = SortSpec::new(vec![
            SortRule::asc(SortField::Title, 2),
            SortRule::desc(SortField::Duration, 1),
            SortRule::asc(SortField::Channel, 1),
        ]);

        let fields: Vec<SortField> = spec.ordered().iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec![SortField::Duration, SortField::Channel, SortField::Title]
        );
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = Item::new("PLI1", "Song", 0)
            .with_channel("Artist")
            .with_date_added("2024-01-01T00:00:00Z");
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["dateAdded"], "2024-01-01T00:00:00Z");
        assert_eq!(json["originalIndex"], 0);
        assert!(json["duration"].is_null());
    }

    #[test]
    fn test_sort_rule_wire_format() {
        let rule = SortRule::desc(SortField::DateUploaded, 3);
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            json,
            r#"{"field":"dateUploaded","direction":"desc","precedence":3}"#
        );
    }
}
