//! Caller identity from the `Authorization: Bearer <jwt>` header. The token names the account;
//! its role is read from the users table on every request.

use crate::auth::JwtKeys;
use crate::error::AppError;
use crate::model::Role;
use crate::service::UserService;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

const BEARER: &str = "Bearer ";

/// Authenticated caller. Rejects with 401 when the token is missing or invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Identity as claimed by the token, before the account is checked.
    pub fn from_headers(headers: &HeaderMap, keys: &JwtKeys) -> Result<Option<Self>, AppError> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix(BEARER))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("malformed authorization header".into()))?;
        let claims = keys.verify(token)?;
        Ok(Some(AuthUser {
            id: claims.user_id()?,
            role: claims.role,
        }))
    }

    /// Swap the token's role for the stored one. A deleted account is 401.
    pub async fn refresh(self, pool: &PgPool) -> Result<Self, AppError> {
        let role = UserService::role_of(pool, self.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;
        if role != self.role {
            tracing::debug!(user_id = %self.id, token_role = %self.role, role = %role, "stored role differs from token");
        }
        Ok(AuthUser { id: self.id, role })
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("staff access required".into()))
        }
    }

    pub fn require_user_manager(&self) -> Result<(), AppError> {
        if self.role.can_manage_users() {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin or owner access required".into()))
        }
    }

    /// The caller is `owner`, or staff.
    pub fn require_self_or_staff(&self, owner: Option<Uuid>) -> Result<(), AppError> {
        if self.is_staff() || owner == Some(self.id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("not allowed to access this resource".into()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
    PgPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);
        let claimed = AuthUser::from_headers(&parts.headers, &keys)?
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
        claimed.refresh(&PgPool::from_ref(state)).await
    }
}

/// Optional caller, for routes open to guests. A present but invalid token is still a 401.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
    PgPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);
        match AuthUser::from_headers(&parts.headers, &keys)? {
            Some(claimed) => Ok(MaybeAuthUser(Some(claimed.refresh(&PgPool::from_ref(state)).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

/// Staff caller (admin, owner or staff). 401 without a token, 403 for customers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaffUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
    PgPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_staff()?;
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::connection::connect_lazy;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;

    /// Keys plus a pool that never connects; these tests fail before any query.
    #[derive(Clone)]
    struct TestState {
        keys: Arc<JwtKeys>,
        pool: PgPool,
    }

    impl FromRef<TestState> for Arc<JwtKeys> {
        fn from_ref(state: &TestState) -> Self {
            state.keys.clone()
        }
    }

    impl FromRef<TestState> for PgPool {
        fn from_ref(state: &TestState) -> Self {
            state.pool.clone()
        }
    }

    fn state() -> TestState {
        let settings = PoolSettings {
            acquire_timeout: Duration::from_millis(200),
            ..PoolSettings::default()
        };
        TestState {
            keys: Arc::new(JwtKeys::from_secret(b"extractor-test")),
            pool: connect_lazy("postgres://app:pw@127.0.0.1:1/storefront", &settings).unwrap(),
        }
    }

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let err = AuthUser::from_request_parts(&mut parts(None), &state()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn valid_token_names_the_caller() {
        let keys = JwtKeys::from_secret(b"extractor-test");
        let id = Uuid::new_v4();
        let token = keys.issue(id, Role::Customer).unwrap();
        let p = parts(Some(&format!("Bearer {}", token)));
        let user = AuthUser::from_headers(&p.headers, &keys).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Customer);
    }

    #[tokio::test]
    async fn valid_token_still_needs_the_account() {
        let state = state();
        let token = state.keys.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let mut p = parts(Some(&format!("Bearer {}", token)));
        let err = StaffUser::from_request_parts(&mut p, &state).await.unwrap_err();
        assert!(matches!(err, AppError::Db(_)));
    }

    #[tokio::test]
    async fn guest_is_allowed_but_bad_token_is_not() {
        let state = state();
        let guest = MaybeAuthUser::from_request_parts(&mut parts(None), &state).await.unwrap();
        assert_eq!(guest.0, None);
        let err = MaybeAuthUser::from_request_parts(&mut parts(Some("Bearer nope")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = MaybeAuthUser::from_request_parts(&mut parts(Some("Basic abc")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn ownership_rules() {
        let me = AuthUser { id: Uuid::new_v4(), role: Role::Customer };
        assert!(me.require_self_or_staff(Some(me.id)).is_ok());
        assert!(me.require_self_or_staff(Some(Uuid::new_v4())).is_err());
        assert!(me.require_self_or_staff(None).is_err());
        assert!(me.require_staff().is_err());
        let staff = AuthUser { id: Uuid::new_v4(), role: Role::Staff };
        assert!(staff.require_self_or_staff(None).is_ok());
        assert!(staff.require_user_manager().is_err());
    }
}
