use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use salesboard_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        DomainError::NoInventory { .. }
        | DomainError::InsufficientStock { .. }
        | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Internal(msg) => {
            tracing::error!(error = %msg, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.code(), err.to_string())
}

/// Malformed or mistyped JSON bodies are client errors like any other.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_argument", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesboard_core::{ProductId, WarehouseId};

    #[test]
    fn stock_errors_are_conflicts() {
        let res = domain_error_to_response(DomainError::insufficient_stock(
            WarehouseId::new(1),
            ProductId::new(2),
            5,
            1,
        ));
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = domain_error_to_response(DomainError::NoInventory {
            warehouse_id: WarehouseId::new(1),
            product_id: ProductId::new(2),
        });
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn each_kind_has_its_own_status() {
        let cases = [
            (DomainError::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("order 1"), StatusCode::NOT_FOUND),
            (DomainError::conflict("dup"), StatusCode::CONFLICT),
            (DomainError::internal("db"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }
}
