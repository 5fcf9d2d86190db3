//! Admin key middleware.
//!
//! Operator-only routes (e.g. triggering reconciliation by hand) are wrapped with this middleware. The request must
//! carry the configured admin key in the `X-Admin-Key` header. The key itself is read from the [`AdminKey`] app data,
//! so the middleware can be attached to a route before the configuration is known.
//!
//! * No header: 401 Unauthorized.
//! * Wrong key: 403 Forbidden.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::config::AdminKey;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

#[derive(Default)]
pub struct AdminKeyMiddlewareFactory;

impl AdminKeyMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            trace!("🔐️ Checking admin key for {}", req.path());
            let key = req.app_data::<web::Data<AdminKey>>().ok_or_else(|| {
                warn!("🔐️ No admin key has been configured for this app");
                ErrorInternalServerError("No admin key has been configured.")
            })?;
            let provided = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No admin key was supplied for {}. Denying access.", req.path());
                ErrorUnauthorized("No admin key found.")
            })?;
            if key.matches(provided) {
                trace!("🔐️ Admin key check for request ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin key supplied for {}. Denying access.", req.path());
                Err(ErrorForbidden("Invalid admin key."))
            }
        })
    }
}
