//! The `account` and `auth` controllers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};
use waypost_auth::SecretKeyProvider;
use waypost_http::{
    Controller, CreatePerformer, Handler, Operation, ReadPerformer, RequestContext, RouteHandler,
    RouteResult,
};
use waypost_model::error::{ApiError, messages};
use waypost_model::payload::PayloadMap;

use crate::error::AccountStoreError;
use crate::model::{AccountPayload, LoginPayload, LoginRequest, NewAccount};
use crate::store::{AccountKeyProvider, AccountStore};
use crate::validate::{
    MAX_EMAIL_LENGTH, MAX_PASSWORD_LENGTH, email_is_valid, name_is_valid, password_is_valid,
};

/// Error numbers specific to the account and auth routes.
pub mod errors {
    /// Name longer than allowed.
    pub const NAME_TOO_LONG: i64 = 512_187_272;
    /// Email failed validation.
    pub const INVALID_EMAIL: i64 = 512_187_273;
    /// Password failed validation.
    pub const INVALID_PASSWORD: i64 = 512_187_274;
    /// Email already belongs to another account.
    pub const EMAIL_UNAVAILABLE: i64 = 300_544_903;
    /// Account creation failed in storage.
    pub const CREATE_FAILED: i64 = 300_544_904;
    /// The signed-in account no longer exists.
    pub const ACCOUNT_GONE: i64 = 2_857_365_840;
    /// Login body did not parse.
    pub const LOGIN_UNPARSEABLE_BODY: i64 = 5_616_956_025;
    /// Login email too long.
    pub const LOGIN_EMAIL_TOO_LONG: i64 = 5_616_956_026;
    /// Login password too long.
    pub const LOGIN_PASSWORD_TOO_LONG: i64 = 5_616_956_027;
    /// Login body was empty.
    pub const LOGIN_EMPTY_BODY: i64 = 3_775_590_199;
    /// Wrong email or password.
    pub const INVALID_LOGIN: i64 = 5_296_511_999;
}

fn storage_failure(err: &AccountStoreError) -> ApiError {
    error!(error = %err, "account store failure");
    ApiError::custom(
        http::StatusCode::INTERNAL_SERVER_ERROR,
        err.code(),
        messages::INTERNAL,
    )
    .with_debug(err.code(), err.to_string())
}

/// Serves `account`: creation, and reading your own account by id.
#[derive(Debug)]
pub struct AccountController<S> {
    store: Arc<S>,
}

impl<S> AccountController<S> {
    /// Serve accounts from `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: AccountStore> Controller for AccountController<S> {
    fn name(&self) -> &str {
        "AccountController"
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::new("PostHandlerV1Create", Handler::create(Arc::clone(&self))),
            Operation::new("AuthGetHandlerV1", Handler::read(self)),
        ]
    }

    fn authenticator(&self) -> Option<Arc<dyn SecretKeyProvider>> {
        Some(Arc::new(AccountKeyProvider::new(Arc::clone(&self.store))))
    }
}

#[async_trait]
impl<S: AccountStore> CreatePerformer for AccountController<S> {
    type Request = NewAccount;
    type Response = AccountPayload;

    fn validate_create(&self, _ctx: &RequestContext, request: &NewAccount) -> Result<(), ApiError> {
        let err_no = if !name_is_valid(&request.name) {
            errors::NAME_TOO_LONG
        } else if !email_is_valid(&request.email) {
            errors::INVALID_EMAIL
        } else if !password_is_valid(&request.password) {
            errors::INVALID_PASSWORD
        } else {
            return Ok(());
        };
        Err(ApiError::custom(
            http::StatusCode::BAD_REQUEST,
            err_no,
            messages::BAD_REQUEST,
        ))
    }

    async fn perform_create(
        &self,
        _ctx: &RequestContext,
        request: NewAccount,
    ) -> Result<Option<AccountPayload>, ApiError> {
        match self
            .store
            .create_account(&request.name, &request.email, &request.password)
        {
            Ok(account) => Ok(Some(AccountPayload::from(&account))),
            Err(AccountStoreError::EmailUnavailable(_)) => Err(ApiError::custom(
                http::StatusCode::CONFLICT,
                errors::EMAIL_UNAVAILABLE,
                "Could Not Create Account, Email address unavailable",
            )),
            Err(err) => Err(storage_failure(&err)),
        }
    }
}

#[async_trait]
impl<S: AccountStore> ReadPerformer for AccountController<S> {
    async fn perform_read(&self, ctx: &RequestContext) -> Result<PayloadMap, ApiError> {
        let public_key = ctx.public_key().ok_or_else(ApiError::forbidden)?;
        let account = self
            .store
            .account_with_public_key(public_key)
            .map_err(|err| storage_failure(&err))?
            .ok_or_else(|| {
                ApiError::custom(
                    http::StatusCode::NOT_FOUND,
                    errors::ACCOUNT_GONE,
                    messages::NOT_FOUND,
                )
            })?;
        if account.pkey != ctx.endpoint().primary_key() {
            return Err(ApiError::forbidden());
        }
        PayloadMap::single(&AccountPayload::from(&account))
            .map_err(|err| ApiError::internal(err.to_string()))
    }
}

/// Serves `auth`: exchanging email and password for a signing key pair.
#[derive(Debug)]
pub struct AuthController<S> {
    store: Arc<S>,
}

impl<S> AuthController<S> {
    /// Authenticate against `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: AccountStore> Controller for AuthController<S> {
    fn name(&self) -> &str {
        "AuthController"
    }

    fn operations(self: Arc<Self>) -> Vec<Operation> {
        vec![Operation::new(
            "PostHandlerV1Login",
            Handler::custom(LoginHandler {
                store: Arc::clone(&self.store),
            }),
        )]
    }
}

struct LoginHandler<S> {
    store: Arc<S>,
}

fn bad_login(err_no: i64, message: impl Into<String>) -> RouteResult {
    ApiError::custom(http::StatusCode::BAD_REQUEST, err_no, message).into()
}

#[async_trait]
impl<S: AccountStore> RouteHandler for LoginHandler<S> {
    async fn handle(&self, ctx: &RequestContext) -> RouteResult {
        if ctx.body().is_empty() {
            return bad_login(
                errors::LOGIN_EMPTY_BODY,
                format!("{}: Expected non-empty body", messages::BAD_REQUEST),
            );
        }
        let Ok(request) = serde_json::from_slice::<LoginRequest>(ctx.body()) else {
            return bad_login(
                errors::LOGIN_UNPARSEABLE_BODY,
                format!("{}: Cannot parse body", messages::BAD_REQUEST),
            );
        };
        if request.email.len() > MAX_EMAIL_LENGTH {
            return bad_login(errors::LOGIN_EMAIL_TOO_LONG, messages::BAD_REQUEST);
        }
        if request.password.len() > MAX_PASSWORD_LENGTH {
            return bad_login(errors::LOGIN_PASSWORD_TOO_LONG, messages::BAD_REQUEST);
        }

        match self.store.login(&request.email, &request.password) {
            Ok(account) => RouteResult::payload(&LoginPayload {
                public_key: account.public_key,
                secret_key: account.secret_key,
            }),
            Err(AccountStoreError::InvalidCredentials) => {
                debug!(request_id = %ctx.request_id(), "login rejected");
                ApiError::custom(
                    http::StatusCode::FORBIDDEN,
                    errors::INVALID_LOGIN,
                    "Invalid email or password",
                )
                .into()
            }
            Err(err) => storage_failure(&err).into(),
        }
    }
}

impl<S> std::fmt::Debug for LoginHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoginHandler")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use waypost_auth::client::insert_auth_headers;
    use waypost_http::{ResponseBody, Router, RouterBuilder};
    use waypost_model::payload::{PayloadEnvelope, PayloadRegistry};

    use super::*;
    use crate::register_account_routes;
    use crate::store::InMemoryAccountStore;

    fn router() -> (Router, Arc<InMemoryAccountStore>) {
        let store = Arc::new(InMemoryAccountStore::new());
        let mut builder = RouterBuilder::new("/api");
        assert_eq!(register_account_routes(&mut builder, &store).unwrap(), 3);
        (builder.build().unwrap(), store)
    }

    fn post(path: &str, body: serde_json::Value) -> http::Request<Bytes> {
        http::Request::post(path)
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    async fn envelope(response: http::Response<ResponseBody>) -> PayloadEnvelope {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let registry = PayloadRegistry::new()
            .register::<AccountPayload>()
            .register::<LoginPayload>();
        PayloadEnvelope::decode(&bytes, &registry).unwrap()
    }

    fn ada() -> serde_json::Value {
        serde_json::json!({"Name": "Ada", "Email": "ada@example.com", "Password": "analytical1"})
    }

    #[test]
    fn test_should_only_give_account_routes_an_authenticator() {
        let store = Arc::new(InMemoryAccountStore::new());
        assert!(AccountController::new(Arc::clone(&store)).authenticator().is_some());
        assert!(AuthController::new(store).authenticator().is_none());
    }

    #[tokio::test]
    async fn test_should_create_account() {
        let (router, store) = router();
        let response = router.handle(post("/api/v1/account/create", ada())).await;
        assert_eq!(response.status(), http::StatusCode::OK);

        let accounts = envelope(response).await.payloads::<AccountPayload>().unwrap();
        assert_eq!(accounts[0].email, "ada@example.com");
        assert!(store.account_with_id(accounts[0].id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_and_invalid_accounts() {
        let (router, _) = router();
        router.handle(post("/api/v1/account/create", ada())).await;

        let response = router.handle(post("/api/v1/account/create", ada())).await;
        assert_eq!(response.status(), http::StatusCode::CONFLICT);
        assert_eq!(envelope(response).await.error_number, errors::EMAIL_UNAVAILABLE);

        let cases = [
            (serde_json::json!({"Name": "x".repeat(300), "Email": "a@b.co", "Password": "pass-word"}), errors::NAME_TOO_LONG),
            (serde_json::json!({"Name": "Bo", "Email": "nope", "Password": "pass-word"}), errors::INVALID_EMAIL),
            (serde_json::json!({"Name": "Bo", "Email": "bo@example.com", "Password": "password"}), errors::INVALID_PASSWORD),
        ];
        for (body, err_no) in cases {
            let response = router.handle(post("/api/v1/account/create", body)).await;
            assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
            assert_eq!(envelope(response).await.error_number, err_no);
        }
    }

    #[tokio::test]
    async fn test_should_login_and_read_own_account() {
        let (router, _) = router();
        let created = envelope(router.handle(post("/api/v1/account/create", ada())).await)
            .await
            .payloads::<AccountPayload>()
            .unwrap()
            .remove(0);

        let response = router
            .handle(post(
                "/api/v1/auth/login",
                serde_json::json!({"Email": "ada@example.com", "Password": "analytical1"}),
            ))
            .await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let keys = envelope(response).await.payloads::<LoginPayload>().unwrap().remove(0);
        assert_eq!(keys.public_key, created.public_key);

        let path = format!("/api/v1/account/{}", created.id);
        let mut request = http::Request::get(path.as_str()).body(Bytes::new()).unwrap();
        let (method, uri) = (request.method().clone(), request.uri().clone());
        insert_auth_headers(
            request.headers_mut(),
            &method,
            &uri,
            "20240102T030405Z",
            &keys.public_key,
            &keys.secret_key,
        )
        .unwrap();
        let response = router.handle(request).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let me = envelope(response).await.payloads::<AccountPayload>().unwrap();
        assert_eq!(me, vec![created]);
    }

    #[tokio::test]
    async fn test_should_reject_bad_logins() {
        let (router, _) = router();
        router.handle(post("/api/v1/account/create", ada())).await;

        let response = router
            .handle(post(
                "/api/v1/auth/login",
                serde_json::json!({"Email": "ada@example.com", "Password": "guess-123"}),
            ))
            .await;
        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
        assert_eq!(envelope(response).await.error_number, errors::INVALID_LOGIN);

        let response = router
            .handle(http::Request::post("/api/v1/auth/login").body(Bytes::from_static(b"{")).unwrap())
            .await;
        assert_eq!(envelope(response).await.error_number, errors::LOGIN_UNPARSEABLE_BODY);

        let response = router
            .handle(post(
                "/api/v1/auth/login",
                serde_json::json!({"Email": "a".repeat(300), "Password": "x"}),
            ))
            .await;
        assert_eq!(envelope(response).await.error_number, errors::LOGIN_EMAIL_TOO_LONG);
    }

    #[tokio::test]
    async fn test_should_forbid_reading_unsigned_or_foreign_account() {
        let (router, store) = router();
        let ada = store.create_account("Ada", "ada@example.com", "analytical1").unwrap();
        let grace = store.create_account("Grace", "grace@example.com", "compiler1").unwrap();

        let unsigned = http::Request::get(format!("/api/v1/account/{}", ada.pkey).as_str())
            .body(Bytes::new())
            .unwrap();
        assert_eq!(router.handle(unsigned).await.status(), http::StatusCode::FORBIDDEN);

        let path = format!("/api/v1/account/{}", ada.pkey);
        let mut request = http::Request::get(path.as_str()).body(Bytes::new()).unwrap();
        let (method, uri) = (request.method().clone(), request.uri().clone());
        insert_auth_headers(
            request.headers_mut(),
            &method,
            &uri,
            "20240102T030405Z",
            &grace.public_key,
            &grace.secret_key,
        )
        .unwrap();
        assert_eq!(router.handle(request).await.status(), http::StatusCode::FORBIDDEN);
    }
}
