// ABOUTME: Status and approval transitions requested through an update
// ABOUTME: Submit-for-approval and set-status are mutually exclusive, submit wins

use chrono::{DateTime, Utc};

use crate::error::CapError;
use crate::types::{ApprovalStatus, CapStatus};

/// Statuses a client may set directly. Archiving has its own operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
    Approved,
}

impl From<WorkflowStatus> for CapStatus {
    fn from(status: WorkflowStatus) -> Self {
        match status {
            WorkflowStatus::Pending => CapStatus::Pending,
            WorkflowStatus::InProgress => CapStatus::InProgress,
            WorkflowStatus::Completed => CapStatus::Completed,
            WorkflowStatus::Approved => CapStatus::Approved,
        }
    }
}

impl TryFrom<CapStatus> for WorkflowStatus {
    type Error = CapError;

    fn try_from(status: CapStatus) -> Result<Self, Self::Error> {
        match status {
            CapStatus::Pending => Ok(WorkflowStatus::Pending),
            CapStatus::InProgress => Ok(WorkflowStatus::InProgress),
            CapStatus::Completed => Ok(WorkflowStatus::Completed),
            CapStatus::Approved => Ok(WorkflowStatus::Approved),
            CapStatus::Archived => Err(CapError::Validation(
                "Status 'archived' cannot be set through an update; archive the CAP instead"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapTransition {
    /// Hand the CAP to management for approval
    Submit,
    SetStatus(WorkflowStatus),
}

/// Column values a transition writes
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEffect {
    pub status: CapStatus,
    pub approval_status: Option<ApprovalStatus>,
    pub submitted_for_approval_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransitionEffect {
    /// Completion details and upload URL are only written alongside a completion
    pub fn completes(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl CapTransition {
    /// Build the transition an update body asks for.
    ///
    /// `submit_for_approval == Some(true)` takes precedence over any `status`.
    pub fn from_request(
        submit_for_approval: Option<bool>,
        status: Option<CapStatus>,
    ) -> Result<Option<Self>, CapError> {
        if submit_for_approval == Some(true) {
            return Ok(Some(CapTransition::Submit));
        }

        match status {
            Some(status) => Ok(Some(CapTransition::SetStatus(status.try_into()?))),
            None => Ok(None),
        }
    }

    pub fn effect(&self, now: DateTime<Utc>) -> TransitionEffect {
        match self {
            CapTransition::Submit => TransitionEffect {
                status: CapStatus::Approved,
                approval_status: Some(ApprovalStatus::Pending),
                submitted_for_approval_at: Some(now),
                completed_at: None,
            },
            CapTransition::SetStatus(status) => TransitionEffect {
                status: (*status).into(),
                approval_status: None,
                submitted_for_approval_at: None,
                completed_at: (*status == WorkflowStatus::Completed).then_some(now),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_submit_wins_over_status() {
        let transition =
            CapTransition::from_request(Some(true), Some(CapStatus::Completed)).unwrap();
        assert_eq!(transition, Some(CapTransition::Submit));
    }

    #[test]
    fn test_submit_false_falls_through_to_status() {
        let transition =
            CapTransition::from_request(Some(false), Some(CapStatus::InProgress)).unwrap();
        assert_eq!(
            transition,
            Some(CapTransition::SetStatus(WorkflowStatus::InProgress))
        );
    }

    #[test]
    fn test_no_transition_requested() {
        assert_eq!(CapTransition::from_request(None, None).unwrap(), None);
        assert_eq!(CapTransition::from_request(Some(false), None).unwrap(), None);
    }

    #[test]
    fn test_archived_status_is_rejected() {
        let err = CapTransition::from_request(None, Some(CapStatus::Archived)).unwrap_err();
        assert!(matches!(err, CapError::Validation(_)));
    }

    #[test]
    fn test_submit_with_archived_status_still_submits() {
        let transition =
            CapTransition::from_request(Some(true), Some(CapStatus::Archived)).unwrap();
        assert_eq!(transition, Some(CapTransition::Submit));
    }

    #[test]
    fn test_submit_effect() {
        let now = Utc::now();
        let effect = CapTransition::Submit.effect(now);

        assert_eq!(effect.status, CapStatus::Approved);
        assert_eq!(effect.approval_status, Some(ApprovalStatus::Pending));
        assert_eq!(effect.submitted_for_approval_at, Some(now));
        assert_eq!(effect.completed_at, None);
        assert!(!effect.completes());
    }

    #[rstest]
    #[case(WorkflowStatus::Pending, CapStatus::Pending, false)]
    #[case(WorkflowStatus::InProgress, CapStatus::InProgress, false)]
    #[case(WorkflowStatus::Completed, CapStatus::Completed, true)]
    #[case(WorkflowStatus::Approved, CapStatus::Approved, false)]
    fn test_set_status_effect(
        #[case] requested: WorkflowStatus,
        #[case] expected: CapStatus,
        #[case] completes: bool,
    ) {
        let now = Utc::now();
        let effect = CapTransition::SetStatus(requested).effect(now);

        assert_eq!(effect.status, expected);
        assert_eq!(effect.approval_status, None);
        assert_eq!(effect.submitted_for_approval_at, None);
        assert_eq!(effect.completes(), completes);
        if completes {
            assert_eq!(effect.completed_at, Some(now));
        }
    }
}
