// ABOUTME: HTTP request handlers for CAP operations
// ABOUTME: Create, list, fetch, update, and archive Critical Action Points for the current user

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use cap_records::input::{coerce_amount, parse_date_value};
use cap_records::{
    CapCreateInput, CapResult, CapStatus, CapTransition, CapUpdateInput, CapexRevexType,
};

use crate::auth::CurrentUser;
use crate::db::DbState;
use crate::response::{ApiError, MessageResponse};

const CREATED_MESSAGE: &str = "Critical Action Point created";
const UPDATED_MESSAGE: &str = "Critical Action Point updated";
const ARCHIVED_MESSAGE: &str = "Critical Action Point archived";

/// Request body for creating a CAP
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCapRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    /// Date string or epoch milliseconds
    pub due_date: Option<Value>,
    pub tags: Option<Vec<String>>,
}

impl CreateCapRequest {
    fn into_input(self) -> CapResult<CapCreateInput> {
        Ok(CapCreateInput {
            due_date: parse_date_value("dueDate", self.due_date.as_ref())?,
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            tags: self.tags,
        })
    }
}

/// Request body for updating a CAP; absent and null fields are left untouched
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub status: Option<CapStatus>,
    pub completion_details: Option<String>,
    pub completion_upload_url: Option<String>,
    pub corrective_action: Option<String>,
    pub remarks: Option<String>,
    pub expected_closure_date: Option<Value>,
    pub team_members: Option<Vec<String>>,
    pub capex_revex_type: Option<CapexRevexType>,
    /// Number or numeric string
    pub capex_revex_amount: Option<Value>,
    pub approval_notes: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub submit_for_approval: Option<bool>,
}

impl UpdateCapRequest {
    fn into_input(self) -> CapResult<CapUpdateInput> {
        let transition = CapTransition::from_request(self.submit_for_approval, self.status)?;

        Ok(CapUpdateInput {
            due_date: parse_date_value("dueDate", self.due_date.as_ref())?,
            expected_closure_date: parse_date_value(
                "expectedClosureDate",
                self.expected_closure_date.as_ref(),
            )?,
            capex_revex_amount: self.capex_revex_amount.as_ref().and_then(coerce_amount),
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            tags: self.tags,
            corrective_action: self.corrective_action,
            remarks: self.remarks,
            team_members: self.team_members,
            capex_revex_type: self.capex_revex_type,
            approval_notes: self.approval_notes,
            attachments: self.attachments,
            completion_details: self.completion_details,
            completion_upload_url: self.completion_upload_url,
            transition,
        })
    }
}

/// Create a new CAP owned by the current user
pub async fn create_cap(
    State(db): State<DbState>,
    user: CurrentUser,
    Json(request): Json<CreateCapRequest>,
) -> impl IntoResponse {
    info!("Creating CAP '{}' for user: {}", request.title, user.id);

    let input = match request.into_input() {
        Ok(input) => input,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match db.cap_storage.create_cap(&user.id, input).await {
        Ok(cap) => (
            StatusCode::CREATED,
            ResponseJson(MessageResponse::with_item(CREATED_MESSAGE, cap)),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// List the current user's non-archived CAPs, newest first
pub async fn list_caps(State(db): State<DbState>, user: CurrentUser) -> impl IntoResponse {
    info!("Listing CAPs for user: {}", user.id);

    match db.cap_storage.list_caps(&user.id).await {
        Ok(caps) => (StatusCode::OK, ResponseJson(caps)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Get a single CAP by ID
pub async fn get_cap(
    State(db): State<DbState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Getting CAP: {} for user: {}", id, user.id);

    match db.cap_storage.get_cap(&user.id, &id).await {
        Ok(cap) => (StatusCode::OK, ResponseJson(cap)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Update an existing CAP
pub async fn update_cap(
    State(db): State<DbState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateCapRequest>,
) -> impl IntoResponse {
    info!("Updating CAP: {} for user: {}", id, user.id);

    let input = match request.into_input() {
        Ok(input) => input,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match db.cap_storage.update_cap(&user.id, &id, input).await {
        Ok(cap) => (
            StatusCode::OK,
            ResponseJson(MessageResponse::with_item(UPDATED_MESSAGE, cap)),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Archive a CAP (soft delete)
pub async fn delete_cap(
    State(db): State<DbState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Archiving CAP: {} for user: {}", id, user.id);

    match db.cap_storage.archive_cap(&user.id, &id).await {
        Ok(_) => (
            StatusCode::OK,
            ResponseJson(MessageResponse::new(ARCHIVED_MESSAGE)),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cap_records::{CapError, WorkflowStatus};
    use serde_json::json;

    fn update_request(body: Value) -> UpdateCapRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_update_request_maps_fields() {
        let input = update_request(json!({
            "title": "Fix pump",
            "dueDate": "2025-06-30",
            "expectedClosureDate": "2025-07-15T08:00:00Z",
            "capexRevexType": "REVEX",
            "capexRevexAmount": "300.25",
            "teamMembers": ["lee"],
            "status": "in-progress"
        }))
        .into_input()
        .unwrap();

        assert_eq!(input.title.as_deref(), Some("Fix pump"));
        assert!(input.due_date.is_some());
        assert!(input.expected_closure_date.is_some());
        assert_eq!(input.capex_revex_type, Some(CapexRevexType::Revex));
        assert_eq!(input.capex_revex_amount, Some(300.25));
        assert_eq!(input.team_members, Some(vec!["lee".to_string()]));
        assert_eq!(
            input.transition,
            Some(CapTransition::SetStatus(WorkflowStatus::InProgress))
        );
    }

    #[test]
    fn test_update_request_accepts_local_and_epoch_dates() {
        let input = update_request(json!({
            "dueDate": "2025-06-30T10:00",
            "expectedClosureDate": 1751241600000_i64
        }))
        .into_input()
        .unwrap();

        assert_eq!(
            input.due_date.unwrap().to_rfc3339(),
            "2025-06-30T10:00:00+00:00"
        );
        assert_eq!(
            input.expected_closure_date.unwrap().to_rfc3339(),
            "2025-06-30T00:00:00+00:00"
        );
    }

    #[test]
    fn test_update_request_nulls_are_untouched() {
        let input = update_request(json!({
            "description": null,
            "capexRevexAmount": null,
            "status": null,
            "submitForApproval": null
        }))
        .into_input()
        .unwrap();

        assert!(input.description.is_none());
        assert!(input.capex_revex_amount.is_none());
        assert!(input.transition.is_none());
    }

    #[test]
    fn test_update_request_rejects_bad_date() {
        let err = update_request(json!({ "dueDate": "someday" }))
            .into_input()
            .unwrap_err();
        assert!(matches!(err, CapError::Validation(_)));
    }

    #[test]
    fn test_update_request_rejects_archived_status() {
        let err = update_request(json!({ "status": "archived" }))
            .into_input()
            .unwrap_err();
        assert!(matches!(err, CapError::Validation(_)));
    }

    #[test]
    fn test_create_request_title_defaults_to_empty() {
        let request: CreateCapRequest = serde_json::from_value(json!({})).unwrap();
        let input = request.into_input().unwrap();
        assert_eq!(input.title, "");
    }
}
