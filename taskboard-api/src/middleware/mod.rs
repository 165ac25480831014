/// HTTP middleware for the API server
///
/// Authentication lives in `taskboard_shared::auth::middleware` and is wired
/// up in `app::build_router`.

pub mod security;
