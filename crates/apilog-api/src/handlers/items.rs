//! Demo item handlers exercising bodies and captured errors.

use axum::Json;
use axum::extract::Path;
use serde_json::{Value, json};

use apilog_core::error::AppError;

use crate::error::ApiError;

/// `POST /echo`: returns the JSON body it was given.
pub async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

/// `GET /items/{id}`: only item `1` exists.
pub async fn get_item(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    if id != "1" {
        return Err(AppError::not_found(format!("Item {id} not found")).into());
    }
    Ok(Json(json!({ "id": 1, "name": "sample" })))
}

/// `GET /fail`: always fails with an internal error.
pub async fn fail() -> Result<Json<Value>, ApiError> {
    Err(AppError::internal("Something went wrong").into())
}
