use crate::error::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(Error::AuthForbidden(_)) => StatusCode::FORBIDDEN,
            Some(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            Some(Error::JsonExtractorRejection(err)) => rejection_status(err),
            // `WithRejection` hands over the bare extractor rejection.
            _ => any_err
                .downcast_ref::<JsonRejection>()
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, rejection_status),
        };
        let body = Json(json!({
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn status_of(err: Error) -> StatusCode {
        APIError::from(err).into_response().status()
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            status_of(Error::AuthForbidden(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(Error::InvalidIp("nope".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::ZoneParse {
                line: 1,
                reason: "missing TTL".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::InvalidDNS01("abc.com".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::AlreadyRunning),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
