//! 错误处理测试

use axum::{http::StatusCode, response::IntoResponse};
use cafe_colombia_auth::error::{set_expose_details, AppError};
use http_body_util::BodyExt;

async fn render(error: AppError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_error_taxonomy_status_codes() {
    let cases = [
        (AppError::AuthenticationRequired, StatusCode::UNAUTHORIZED, "authentication_required"),
        (AppError::invalid_token("x"), StatusCode::UNAUTHORIZED, "invalid_token"),
        (AppError::TokenExpired, StatusCode::UNAUTHORIZED, "token_expired"),
        (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED, "invalid_credentials"),
        (AppError::forbidden("no"), StatusCode::FORBIDDEN, "forbidden"),
        (AppError::AccountLocked, StatusCode::LOCKED, "account_locked"),
        (AppError::validation("bad"), StatusCode::BAD_REQUEST, "validation_error"),
        (AppError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        (AppError::internal_auth("down"), StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        (AppError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    ];

    for (error, status, code) in cases {
        let (actual_status, json) = render(error).await;
        assert_eq!(actual_status, status);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], code);
        assert!(json["requestId"].is_string());
    }
}

#[tokio::test]
async fn test_forbidden_role_body() {
    let (status, json) = render(AppError::forbidden_role("admin", "moderator")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["required"], "admin");
    assert_eq!(json["actual"], "moderator");
    assert!(json["message"].as_str().unwrap().contains("moderator"));
}

#[tokio::test]
async fn test_details_exposed_in_development() {
    set_expose_details(true);

    let (_, json) = render(AppError::internal_auth("find_active_by_email failed: pool timed out")).await;
    assert_eq!(json["message"], "Authentication service unavailable");
    assert!(json["details"].as_str().unwrap().contains("pool timed out"));
}

#[test]
fn test_authentication_failure_classification() {
    assert!(AppError::TokenExpired.is_authentication_failure());
    assert!(!AppError::forbidden("no").is_authentication_failure());
    assert!(!AppError::internal_auth("db").is_authentication_failure());
}
