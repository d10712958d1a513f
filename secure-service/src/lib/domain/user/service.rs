use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;

use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::Password;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::Session;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for registration, login and profile lookup.
///
/// Argon2 work runs on the blocking pool so it never stalls request workers.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuance
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    async fn hash_password(&self, password: Password) -> Result<String, UserError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(password.expose()))
            .await
            .map_err(|e| UserError::Unknown(format!("Hashing task failed: {}", e)))?
            .map_err(|e| UserError::PasswordHashing(e.to_string()))
    }

    fn issue_session(&self, user: User) -> Result<Session, UserError> {
        let token = self
            .authenticator
            .generate_token(user.id.as_i64())
            .map_err(|e| UserError::TokenGeneration(e.to_string()))?;

        Ok(Session { user, token })
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<Session, UserError> {
        let RegisterCommand {
            email,
            username,
            password,
        } = command;

        // Early out before paying for a hash; `create` stays the authority on uniqueness.
        if self.repository.exists_by_email(email.as_str()).await? {
            return Err(UserError::EmailAlreadyExists(email.to_string()));
        }

        let password_hash = self.hash_password(password).await?;

        let user = self
            .repository
            .create(NewUser {
                email,
                username,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.issue_session(user)
    }

    async fn login(&self, command: LoginCommand) -> Result<Session, UserError> {
        let user = self.repository.find_by_email(&command.email).await?;

        // An unknown email still pays for a verification.
        let authenticator = Arc::clone(&self.authenticator);
        let stored = user
            .as_ref()
            .map(|user| (user.password_hash.clone(), user.id.as_i64()));

        let result = tokio::task::spawn_blocking(move || match stored {
            Some((stored_hash, user_id)) => {
                authenticator.authenticate(&command.password, &stored_hash, user_id)
            }
            None => Err(authenticator.reject_unknown_user(&command.password)),
        })
        .await
        .map_err(|e| UserError::Unknown(format!("Verification task failed: {}", e)))?;

        let Some(user) = user else {
            tracing::debug!("Login rejected: unknown email");
            return Err(UserError::InvalidCredentials);
        };

        match result {
            Ok(authentication) => {
                tracing::info!(user_id = %user.id, "User logged in");
                Ok(Session {
                    user,
                    token: authentication.access_token,
                })
            }
            Err(AuthenticationError::InvalidCredentials) => {
                tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
                Err(UserError::InvalidCredentials)
            }
            Err(AuthenticationError::PasswordError(e)) => {
                Err(UserError::PasswordHashing(e.to_string()))
            }
            Err(AuthenticationError::JwtError(e)) => Err(UserError::TokenGeneration(e.to_string())),
        }
    }

    async fn get_profile(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }
}
