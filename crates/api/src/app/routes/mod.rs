use std::str::FromStr;

use axum::Router;

use salesboard_core::DomainError;

use crate::app::errors;

pub mod customers;
pub mod events;
pub mod orders;
pub mod products;
pub mod system;
pub mod warehouses;

/// Everything served under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/warehouses", warehouses::router())
        .nest("/products", products::router())
        .nest("/customers", customers::router())
        .merge(events::router())
}

/// Parse a numeric path segment into an id, rejecting zero and negatives.
pub(crate) fn parse_id<T>(raw: &str, field: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError> + Copy + Into<i64>,
{
    let id = raw.parse::<T>().map_err(errors::domain_error_to_response)?;
    let value: i64 = id.into();
    if value <= 0 {
        return Err(errors::domain_error_to_response(DomainError::invalid_argument(
            format!("{field} must be > 0 (got {raw})"),
        )));
    }
    Ok(id)
}
