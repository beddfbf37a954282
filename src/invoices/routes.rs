//! Invoice number route handlers

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::AppState;

use super::services::issue_invoice_number;

#[derive(Debug, Deserialize)]
pub struct IssueNumberRequest {
    pub settings_group: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub consumer_id: String,
}

#[derive(Debug, Serialize)]
pub struct IssueNumberResponse {
    pub settings_group: String,
    pub year: i32,
    pub number: i64,
    pub formatted: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/invoices/numbers", post(issue))
}

async fn issue(
    State(state): State<AppState>,
    Json(req): Json<IssueNumberRequest>,
) -> Result<Json<IssueNumberResponse>> {
    let issued =
        issue_invoice_number(state.store.as_ref(), &req.settings_group, req.year, &req.consumer_id)
            .await?;

    Ok(Json(IssueNumberResponse {
        formatted: issued.formatted(&state.config.invoice_prefix),
        settings_group: issued.settings_group,
        year: issued.year,
        number: issued.number,
    }))
}
