//! Create deployment handler

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use kfctl_types::{KfDef, GCP_ACCESS_TOKEN_NAME};

/// Create a deployment from a `KfDef`
pub async fn create_deployment(
    State(state): State<AppState>,
    payload: Result<Json<KfDef>, JsonRejection>,
) -> ApiResult<Json<KfDef>> {
    let Json(kfdef) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    kfdef
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let app = kfdef.app_name().to_string();
    tracing::debug!(
        app = %app,
        secrets = kfdef.spec.secrets.len(),
        request_token = kfdef.spec.literal_secret(GCP_ACCESS_TOKEN_NAME).is_some(),
        "Received create deployment request"
    );

    let request = state.build_request(kfdef);
    let build = async {
        let _serialized = state.build_lock.lock().await;
        state.builder.build(&request).await
    };

    let created = tokio::time::timeout(state.request_timeout, build)
        .await
        .map_err(|_| {
            ApiError::DeadlineExceeded(format!(
                "deployment {} not created within {}s",
                app,
                state.request_timeout.as_secs_f64()
            ))
        })??;

    tracing::info!(app = %app, "Created deployment");

    Ok(Json(created))
}
