use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const GOAL_STATUS_ACTIVE: &str = "active";
pub const COMMITMENT_STATUS_PENDING: &str = "pending";

/// Column every record table is scoped by.
pub const USER_ID: &str = "user_id";

/// Tables holding per-user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Preferences,
    Goals,
    Commitments,
    SessionLogs,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Preferences => "preferences",
            Table::Goals => "goals",
            Table::Commitments => "commitments",
            Table::SessionLogs => "session_logs",
        }
    }

    /// Single-row tables hold at most one row per user.
    pub fn is_single_row(self) -> bool {
        matches!(self, Table::Preferences | Table::Goals)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// The four user-tunable preference fields. Every write replaces all four,
/// so an absent field is stored as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreferenceFields {
    pub personality_mode: Option<String>,
    pub tone_preference: Option<String>,
    pub allow_reflection: Option<bool>,
    pub humor_enabled: Option<bool>,
}

impl PreferenceFields {
    pub const COLUMNS: [&'static str; 4] = [
        "personality_mode",
        "tone_preference",
        "allow_reflection",
        "humor_enabled",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreferenceRecord {
    pub user_id: String,
    #[serde(flatten)]
    pub fields: PreferenceFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GoalRecord {
    pub user_id: String,
    pub goal_text: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommitmentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: String,
    pub commitment_text: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preference_record_flattens_fields() {
        let record = PreferenceRecord {
            user_id: "u1".to_string(),
            fields: PreferenceFields {
                personality_mode: Some("mentor".to_string()),
                tone_preference: None,
                allow_reflection: Some(true),
                humor_enabled: Some(false),
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "u1",
                "personality_mode": "mentor",
                "tone_preference": null,
                "allow_reflection": true,
                "humor_enabled": false,
            })
        );
    }

    #[test]
    fn preference_columns_match_serialized_fields() {
        let value = serde_json::to_value(PreferenceFields::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for column in PreferenceFields::COLUMNS {
            assert!(keys.contains(&column), "missing column {column}");
        }
        assert_eq!(keys.len(), PreferenceFields::COLUMNS.len());
    }

    #[test]
    fn commitment_record_reads_store_row() {
        let row = json!({
            "id": 7,
            "user_id": "u1",
            "commitment_text": "walk daily",
            "due_date": "2026-11-01",
            "status": "pending",
            "created_at": "2026-10-18T10:00:00.000000+00:00"
        });
        let record: CommitmentRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
        assert_eq!(record.id, Some(7));
    }

    #[test]
    fn only_preferences_and_goals_are_single_row() {
        assert!(Table::Preferences.is_single_row());
        assert!(Table::Goals.is_single_row());
        assert!(!Table::Commitments.is_single_row());
        assert!(!Table::SessionLogs.is_single_row());
    }
}
