use std::{future::Future, pin::Pin};

use actix_identity::Identity;
use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use serde::Serialize;

use crate::{
    db,
    errors::{AppError, AppResult},
    structs::{Role, User},
    AppState,
};

/// The authenticated caller of a request. Loaded fresh from the users
/// table so role changes and deletions take effect on the next request.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Self-or-admin: the actor owns the resource or is an admin.
    pub fn authorize(&self, owner_id: i64) -> AppResult<()> {
        if self.is_admin() || self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Strict ownership; admins get no pass.
    pub fn require_self(&self, user_id: i64) -> AppResult<()> {
        if self.id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Actor {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let identity = Identity::extract(&req)
                .await
                .map_err(|_| AppError::Unauthenticated)?;
            let user_id: i64 = identity
                .id()
                .ok()
                .and_then(|id| id.parse().ok())
                .ok_or(AppError::Unauthenticated)?;
            let state = req
                .app_data::<Data<AppState>>()
                .ok_or_else(|| AppError::Config("application state is not registered".into()))?;
            match db::users::find(&state.db_pool, user_id).await? {
                Some(user) => Ok(Actor::from(user)),
                None => {
                    log::warn!("Session refers to missing user {}", user_id);
                    identity.logout();
                    Err(AppError::Unauthenticated)
                }
            }
        })
    }
}
