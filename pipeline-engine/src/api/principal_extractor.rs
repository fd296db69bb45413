use std::future::{ready, Ready};

use actix_web::{FromRequest, HttpRequest};

use crate::error::Error;
use crate::principal::Principal;

/// Extracts the caller's [`Principal`] from the request extensions: an external authentication
/// middleware (outside this crate's scope) resolves the session and inserts the `Principal`
/// before the request reaches a handler here. A handler that takes `Principal` as an argument
/// fails the request with `Unauthorized` if no middleware populated it.
impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let principal = req.extensions().get::<Principal>().cloned();
        ready(principal.ok_or_else(|| {
            Error::Unauthorized("No authenticated session for this request".to_owned())
        }))
    }
}

/// Lets `Principal` (and anything else using `?`/`From<Error>` inside an extractor) fail an
/// actix-web request directly with the same JSON shape [`common::api::ApiResponse`] uses
/// elsewhere, without needing an `HttpRequest` in hand to build one.
impl actix_web::ResponseError for Error {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::StorageError(_) | Error::IngestionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let message = match self {
            Error::StorageError(_) | Error::IngestionError(_) => {
                log::error!("{self}");
                "Could not perform the required action due to an internal error".to_owned()
            }
            other => other.to_string(),
        };
        actix_web::HttpResponse::build(self.status_code()).json(serde_json::json!({
            "type": "Failure",
            "data": message,
        }))
    }
}
