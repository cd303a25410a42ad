use std::time::Instant;

use cookie::{Cookie, CookieJar};
use failure::Fail;
use futures::{future, Future, Stream};
use gotham::{
    handler::{HandlerFuture, IntoHandlerError},
    helpers::http::response::{create_response, create_temporary_redirect as temp_redirect},
    state::{FromState, State},
};
use gotham_derive::{StateData, StaticResponseExtender};
use http::{header, HeaderMap, Response, StatusCode, Uri};
use hyper::Body;
use mime::APPLICATION_JSON as JSON;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::Settings,
    error::{Error, Toggle},
    pagination::PageRequest,
    user::Actor,
};

pub mod comments;
pub mod posts;
pub mod questions;
pub mod users;

pub type HandlerResult = Result<Response<Body>, failure::Error>;

/// Returned when an endpoint needs a logged in user and there is none
#[derive(Debug, Fail)]
#[fail(display = "You need to be logged in to do that")]
pub struct LoginRequired;

/// The `?page=` query parameter. `-1` asks for the last page.
#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PageQuery {
    page: Option<i64>,
}

impl PageQuery {
    pub fn request(state: &State) -> PageRequest {
        PageRequest::from_query(PageQuery::try_borrow_from(state).and_then(|query| query.page))
    }
}

/// The logged in user, if any
pub fn actor(state: &State) -> Result<&Actor, LoginRequired> {
    Actor::try_borrow_from(state).ok_or(LoginRequired)
}

/// Creates a `HandlerFuture` that runs the given function
pub fn body_handler<F>(mut state: State, op: F) -> Box<HandlerFuture>
where
    F: FnOnce(&State, Vec<u8>) -> Response<Body> + Send + 'static,
{
    let f = Body::take_from(&mut state)
        .concat2()
        .then(|result| match result {
            Ok(body) => {
                let response = op(&state, body.to_vec());
                future::ok((state, response))
            }
            Err(e) => future::err((state, e.into_handler_error())),
        });

    Box::new(f)
}

/// Decodes a request body as JSON or, failing a JSON content type, as a url encoded form.
pub fn parse_body<T: DeserializeOwned>(state: &State, body: &[u8]) -> Result<T, failure::Error> {
    let is_json = HeaderMap::borrow_from(state)
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.starts_with("application/json"));
    if is_json {
        Ok(serde_json::from_slice(body)?)
    } else {
        Ok(serde_urlencoded::from_bytes(body)?)
    }
}

pub fn json_response<T: Serialize>(state: &State, value: &T) -> HandlerResult {
    let content = serde_json::to_string(value)?;
    Ok(create_response(state, StatusCode::OK, JSON, content))
}

#[derive(Serialize)]
struct ToggleResponse<'a> {
    changed: bool,
    message: &'a str,
}

/// Reports the outcome of a relationship change. An unchanged relationship isn't an error, the
/// message tells the user it was already the way they asked for.
pub fn toggle_response(state: &State, toggle: Toggle, changed: &str, unchanged: &str) -> HandlerResult {
    let message = match toggle {
        Toggle::Changed => changed,
        Toggle::Unchanged => unchanged,
    };
    json_response(
        state,
        &ToggleResponse {
            changed: toggle.changed(),
            message,
        },
    )
}

/// A 303 redirect, so the client follows up with a GET
pub fn see_other(state: &State, location: String) -> Response<Body> {
    let mut response = temp_redirect(state, location);
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
}

/// Whether a boolean preference cookie is set
pub fn preference(state: &State, name: &str) -> bool {
    CookieJar::borrow_from(state)
        .get(name)
        .map_or(false, |cookie| !cookie.value().is_empty())
}

/// Stores a boolean preference cookie and redirects to `location`.
pub fn set_preference(
    state: &State,
    name: &'static str,
    enabled: bool,
    max_age: Option<time::Duration>,
    location: String,
) -> HandlerResult {
    let settings = Settings::borrow_from(state);
    let value = if enabled { "1" } else { "" };
    let mut cookie = Cookie::build(name, value).path("/").http_only(true).finish();
    if let Some(max_age) = max_age {
        cookie.set_max_age(max_age);
    }
    if settings.cookie.secure {
        cookie.set_secure(true);
    }
    if let Some(ref domain) = settings.cookie.domain {
        cookie.set_domain(domain.to_owned());
    }

    let mut response = see_other(state, location);
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie.to_string().parse()?);
    Ok(response)
}

/// The status code an error is reported with.
pub fn status_of(error: &failure::Error) -> StatusCode {
    if error.downcast_ref::<LoginRequired>().is_some() {
        return StatusCode::UNAUTHORIZED;
    }
    if error.downcast_ref::<serde_json::Error>().is_some()
        || error.downcast_ref::<serde_urlencoded::de::Error>().is_some()
    {
        return StatusCode::BAD_REQUEST;
    }
    match error.downcast_ref::<Error>() {
        Some(Error::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(Error::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        Some(Error::InvalidOperation(_)) => StatusCode::BAD_REQUEST,
        Some(Error::Database(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The `{"error": message}` body every failure is reported with.
pub fn error_body(error: &failure::Error) -> String {
    serde_json::json!({ "error": error.to_string() }).to_string()
}

pub fn error_response(state: &State, error: failure::Error) -> Response<Body> {
    let status = status_of(&error);
    if status.is_server_error() {
        error!("{} {}: {}", status, Uri::borrow_from(state), error);
    } else {
        debug!("{} {}: {}", status, Uri::borrow_from(state), error);
    }
    create_response(state, status, JSON, error_body(&error))
}

pub fn response(state: &State, result: HandlerResult) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(error) => error_response(state, error),
    }
}

/// Warns about requests that took longer than the configured threshold.
pub fn log_slow(state: &State, started: Instant) {
    let elapsed = started.elapsed();
    let limit = Settings::borrow_from(state).slow_request_time;
    let seconds = elapsed.as_secs() as f64 + f64::from(elapsed.subsec_micros()) / 1e6;
    if seconds >= limit {
        warn!("Slow request: {} took {:.3}s", Uri::borrow_from(state), seconds);
    }
}

#[macro_export]
macro_rules! handler {
    ($handler_fn:path) => {
        |state| {
            let started = std::time::Instant::now();
            let r = $crate::handler::response(&state, $handler_fn(&state));
            $crate::handler::log_slow(&state, started);
            (state, r)
        }
    };
}

#[macro_export]
macro_rules! body_handler {
    ($handler_fn:path) => {
        |state| {
            let started = std::time::Instant::now();
            $crate::handler::body_handler(state, move |state, post| {
                let r = $crate::handler::response(&state, $handler_fn(state, post));
                $crate::handler::log_slow(&state, started);
                r
            })
        }
    };
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::{error_body, status_of, LoginRequired};
    use crate::{error::Error, user::Permission};

    #[test]
    fn error_status() {
        let status = |e: failure::Error| status_of(&e);
        assert_eq!(status(Error::NotFound("post").into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status(Error::PermissionDenied(Permission::ModerateComments).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(Error::InvalidOperation("You can't follow yourself").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(LoginRequired.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(failure::err_msg("pool exhausted")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(status(malformed.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_body_is_json() {
        let body = error_body(&failure::err_msg("connection refused"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "connection refused" }));
        assert_eq!(
            error_body(&Error::NotFound("comment").into()),
            r#"{"error":"No such comment"}"#
        );
    }
}
