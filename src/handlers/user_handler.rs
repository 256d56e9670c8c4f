//! User Directory Handler
//!
//! Registration and lookup of the users that own library entries.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Clock, DomainError, User};
use crate::repository::{RepositoryError, UserRepository};

use super::CreateUserCommand;

/// Handler for user registration and lookup
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.users.get_by_id(id).await?)
    }

    /// Register a user.
    ///
    /// # Errors
    /// `DomainError::Validation` for malformed input and
    /// `DomainError::Conflict` when the email is already registered.
    #[tracing::instrument(skip(self, command), fields(role = %command.role))]
    pub async fn create(&self, command: CreateUserCommand) -> Result<User, DomainError> {
        let user = User::register(
            &command.name,
            &command.email,
            &command.password,
            command.role,
            self.clock.now(),
        )
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected user registration"))?;

        match self.users.create(&user).await {
            Ok(()) => {}
            Err(RepositoryError::UniqueViolation(_)) => {
                return Err(DomainError::conflict(format!(
                    "A user with email {} already exists",
                    user.email
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }
}
