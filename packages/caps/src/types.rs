// ABOUTME: CAP type definitions
// ABOUTME: Record, status enums, and create/update inputs for Critical Action Points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transition::CapTransition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CapStatus {
    Pending,
    InProgress,
    Completed,
    Approved,
    Archived,
}

impl Default for CapStatus {
    fn default() -> Self {
        CapStatus::Pending
    }
}

impl CapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapStatus::Pending => "pending",
            CapStatus::InProgress => "in-progress",
            CapStatus::Completed => "completed",
            CapStatus::Approved => "approved",
            CapStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for CapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CapexRevexType {
    Capex,
    Revex,
    None,
}

impl CapexRevexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapexRevexType::Capex => "CAPEX",
            CapexRevexType::Revex => "REVEX",
            CapexRevexType::None => "NONE",
        }
    }
}

impl Default for CapexRevexType {
    fn default() -> Self {
        CapexRevexType::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Pending
    }
}

/// A Critical Action Point as stored and returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cap {
    pub id: String,
    pub cap_id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: CapStatus,

    // Completion
    pub completion_details: Option<String>,
    pub completion_upload_url: Option<String>,
    pub attachments: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,

    pub tags: Vec<String>,

    // Action management
    pub corrective_action: Option<String>,
    pub remarks: Option<String>,
    pub expected_closure_date: Option<DateTime<Utc>>,
    pub team_members: Vec<String>,

    // Expenditure
    pub capex_revex_type: CapexRevexType,
    pub capex_revex_amount: f64,

    // Approval workflow
    pub approval_status: ApprovalStatus,
    pub approval_notes: Option<String>,
    pub submitted_for_approval_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CapCreateInput {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct CapUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub corrective_action: Option<String>,
    pub remarks: Option<String>,
    pub expected_closure_date: Option<DateTime<Utc>>,
    pub team_members: Option<Vec<String>>,
    pub capex_revex_type: Option<CapexRevexType>,
    pub capex_revex_amount: Option<f64>,
    pub approval_notes: Option<String>,
    pub attachments: Option<Vec<String>>,

    // Only consulted when the transition completes the CAP
    pub completion_details: Option<String>,
    pub completion_upload_url: Option<String>,

    pub transition: Option<CapTransition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&CapStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::from_str::<CapStatus>("\"archived\"").unwrap(),
            CapStatus::Archived
        );
        assert_eq!(CapStatus::InProgress.to_string(), "in-progress");
        assert_eq!(ApprovalStatus::Rejected.as_str(), "rejected");
        assert_eq!(CapexRevexType::Revex.as_str(), "REVEX");
        assert!(serde_json::from_str::<CapStatus>("\"done\"").is_err());
    }

    #[test]
    fn test_capex_revex_wire_names() {
        assert_eq!(
            serde_json::to_string(&CapexRevexType::Capex).unwrap(),
            "\"CAPEX\""
        );
        assert_eq!(
            serde_json::from_str::<CapexRevexType>("\"NONE\"").unwrap(),
            CapexRevexType::None
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(CapStatus::default(), CapStatus::Pending);
        assert_eq!(ApprovalStatus::default(), ApprovalStatus::Pending);
        assert_eq!(CapexRevexType::default(), CapexRevexType::None);
    }
}
