/// HTTP mapping for console errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::core::{ConsoleError, OperationResult};

impl ConsoleError {
    pub fn status_code(&self) -> StatusCode {
        if let ConsoleError::UploadTooLarge { .. } = self {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_result())).into_response()
    }
}

/// 200 for success, 500 carrying the failed step's diagnostic otherwise
pub fn result_response(result: OperationResult) -> Response {
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GuardViolation;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ConsoleError::validation("No file selected.").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConsoleError::UploadTooLarge { limit: 16 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ConsoleError::Precondition(GuardViolation::PlaceholderCredential).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConsoleError::Command(OperationResult::failure("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
