use crate::auth::{hash_password, verify_password, TokenService};
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_types::domain::user::{Role, User};
use storefront_types::ports::user_repository::UserRepository;
use storefront_types::ports::RepoError;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

pub struct UserService<R: UserRepository> {
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    admin_secret: Option<String>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>, admin_secret: Option<String>) -> Self {
        Self {
            repo,
            tokens,
            admin_secret,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let role = match (&req.admin_secret, &self.admin_secret) {
            (Some(given), Some(expected)) if given == expected => Role::Admin,
            _ => Role::Customer,
        };
        let hash = hash_password(&req.password)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
        let user = User::new(req.name, &req.email, hash, role)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let user = match self.repo.create_user(user).await {
            Ok(u) => u,
            Err(RepoError::Conflict(_)) => {
                return Err(AppError::Conflict("user already exists".into()))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "user registered");
        self.respond(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let invalid = || AppError::Unauthorized("invalid email or password".into());
        let user = self
            .repo
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&req.password, &user.password_hash) {
            return Err(invalid());
        }
        self.respond(user)
    }

    pub async fn profile(&self, id: Uuid) -> Result<User, AppError> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AppError> {
        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse { user, token })
    }
}
