//! The server does not authenticate users itself. An upstream layer does that, and passes the user's identity in the
//! `X-User-Id` header. [`CurrentUser`] extracts it, and rejects the request with a 401 if it is missing.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        self.0.as_str()
    }
}

impl FromRequest for CurrentUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| CurrentUser(s.to_string()));
        let result = user.ok_or_else(|| {
            debug!("💻️ Request to {} has no user identity", req.path());
            ServerError::Unauthenticated
        });
        ready(result)
    }
}
