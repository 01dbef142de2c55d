//! Access control list middleware for the Farmgate server.
//! This middleware can be placed on any route or service.
//!
//! It validates the bearer token on the incoming request against the server's JWT verifier and
//! then checks the role claim against the required roles for the route. On success the claims
//! are stashed in the request extensions for the handler's [`JwtClaims`] extractor; otherwise a
//! 401 (bad or missing token) or 403 (wrong role) response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use farmgate_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{
    auth::{bearer_token, JwtClaims, JwtVerifier},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let verifier = req
                .app_data::<web::Data<JwtVerifier>>()
                .ok_or_else(|| {
                    log::warn!("🔑️ No JWT verifier is registered on the server");
                    Error::from(ServerError::InitializeError(
                        "No JWT verifier is registered on the server".to_string(),
                    ))
                })?
                .clone();
            let claims = bearer_token(req.request()).and_then(|token| verifier.validate(token)).map_err(|e| {
                log::warn!("🔑️ Rejecting request to {}: {e}", req.path());
                Error::from(ServerError::AuthenticationError(e))
            })?;
            if !required_roles.contains(&claims.role) {
                log::warn!("🔑️ User {} lacks the required role for {}", claims.sub, req.path());
                return Err(ServerError::AuthenticationError(AuthError::InsufficientPermissions(format!(
                    "This endpoint requires one of the following roles: {required_roles:?}"
                )))
                .into());
            }
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
