pub mod direct;
pub mod health;
pub mod log;
pub mod publish;
pub mod subscribe;

use axum::Router;

use crate::state::AppState;

/// Build the gateway route tree, mounted under `ROOT_PATH`.
///
/// Route hierarchy:
///
/// ```text
/// /publish                 publish to topic followers (PUT)
/// /error                   error notice (PUT)
/// /notify                  developer notice (PUT, GET ?message&subject)
///
/// /email                   ad hoc email send (PUT)
/// /sms                     ad hoc SMS send (PUT)
/// /gcm                     ad hoc push send (PUT)
///
/// /log/{id}                get, delete a log entry
///
/// /subscribe               create subscriber (PUT)
/// /subscribe/{id}          get, delete
/// /unsubscribe/{id}        delete via link, HTML page (GET)
/// /verify/{id}             mark verified (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(publish::router())
        .merge(direct::router())
        .merge(log::router())
        .merge(subscribe::router())
}
