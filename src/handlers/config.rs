use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Current configuration as JSON. The recognition API key is reported only
/// as present/absent, never echoed back.
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "recognition": {
                "endpoint": config.recognition.endpoint,
                "api_key_set": config.recognition.api_key.is_some(),
                "encoding": config.recognition.encoding,
                "sample_rate_hertz": config.recognition.sample_rate_hertz,
                "language_code": config.recognition.language_code
            },
            "upload": {
                "scratch_dir": config.upload.scratch_dir,
                "max_upload_bytes": config.upload.max_upload_bytes
            }
        }
    })))
}

/// Apply a partial configuration update, validating before it takes effect.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str)?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "server": {
                "host": current_config.server.host,
                "port": current_config.server.port
            },
            "recognition": {
                "endpoint": current_config.recognition.endpoint,
                "api_key_set": current_config.recognition.api_key.is_some(),
                "encoding": current_config.recognition.encoding,
                "sample_rate_hertz": current_config.recognition.sample_rate_hertz,
                "language_code": current_config.recognition.language_code
            },
            "upload": {
                "scratch_dir": current_config.upload.scratch_dir,
                "max_upload_bytes": current_config.upload.max_upload_bytes
            }
        }
    })))
}
