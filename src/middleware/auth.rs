//! Bearer token authentication
//!
//! Clients authenticate with `Authorization: Bearer <token>`. The token is
//! hashed and matched against stored user credentials.
//!
//! [`RequireAuth`] wraps a scope and rejects unauthenticated requests before
//! they reach a handler. Handlers inside the scope receive the caller via the
//! [`AuthedUser`] extractor. Routes outside the scope can call
//! [`require_user`] or [`maybe_user`] directly.

use crate::orm::users;
use actix_web::body::EitherBody;
use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{error, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

/// The authenticated caller, inserted into request extensions by [`RequireAuth`].
#[derive(Clone, Debug)]
pub struct AuthedUser(pub users::Model);

impl AuthedUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<AuthedUser>().cloned().ok_or_else(|| {
            error::ErrorInternalServerError("Authentication context missing.")
        }))
    }
}

/// Pull the bearer token out of the Authorization header, if present.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_owned())
}

/// Resolve the caller if a bearer token is present.
///
/// No token means an anonymous caller. A token that matches no account is
/// rejected rather than downgraded.
pub async fn maybe_user(req: &HttpRequest) -> Result<Option<users::Model>, Error> {
    let token = match bearer_token(req) {
        Some(token) => token,
        None => return Ok(None),
    };

    match crate::user::authenticate_by_token(&token).await {
        Ok(Some(user)) => Ok(Some(user)),
        Ok(None) => Err(error::ErrorUnauthorized("Invalid API token.")),
        Err(e) => {
            log::error!("Token lookup failed: {}", e);
            Err(error::ErrorInternalServerError("Authentication failed"))
        }
    }
}

/// Resolve the caller from their bearer token, or fail with 401.
pub async fn require_user(req: &HttpRequest) -> Result<users::Model, Error> {
    match maybe_user(req).await? {
        Some(user) => Ok(user),
        None => Err(error::ErrorUnauthorized("A valid API token is required.")),
    }
}

/// Middleware guard for routes that must not be reached anonymously.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireAuth;

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            let token = bearer_token(req.request());

            let user = match token {
                Some(token) => {
                    crate::user::authenticate_by_token(&token).await.map_err(|e| {
                        log::error!("Token lookup failed: {}", e);
                        error::ErrorInternalServerError("Authentication failed")
                    })?
                }
                None => None,
            };

            match user {
                Some(user) => {
                    req.extensions_mut().insert(AuthedUser(user));
                    svc.call(req).await.map(|res| res.map_into_left_body())
                }
                None => {
                    log::debug!("Rejected unauthenticated request to {}", req.path());
                    // Materialized as a response rather than an Err so the
                    // rejection is observable inside the service chain too.
                    let (req, _) = req.into_parts();
                    let resp = error::ErrorUnauthorized("A valid API token is required.")
                        .error_response()
                        .map_into_right_body();
                    Ok(ServiceResponse::new(req, resp))
                }
            }
        })
    }
}
