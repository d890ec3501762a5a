use crate::auth::{Operation, TokenService, hash_password, verify_password};
use crate::core::{Principal, Role, UserBuilder, UserProfile, skills};
use crate::error::{Result, TriageError};
use crate::storage::UserRepository;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Signup {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Admin change to another user's role and/or skills
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChange {
    #[serde(default)]
    pub email: String,
    pub role: Option<Role>,
    pub skills: Option<Vec<String>>,
}

/// Issued token and the user it belongs to
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Account operations
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// Register a new account with role `user`
    pub async fn signup(&self, input: Signup) -> Result<UserProfile> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || input.password.is_empty() {
            return Err(TriageError::validation("Email and password are required"));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(TriageError::validation(format!("'{email}' is not a valid email address")));
        }

        let user = UserBuilder::new()
            .email(email)
            .password_hash(hash_password(&input.password)?)
            .role(Role::User)
            .skills(skills::normalize_skills(&input.skills))
            .build();
        let user = self.users.create_user(user).await?;
        info!(user_id = %user.id, "User signed up");
        Ok(user.profile())
    }

    /// Check credentials and issue a token
    pub async fn login(&self, input: Credentials) -> Result<Session> {
        let invalid = || TriageError::Unauthenticated("Invalid credentials".to_string());

        let Some(user) = self.users.find_user_by_email(&input.email).await? else {
            return Err(invalid());
        };
        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(invalid());
        }

        Ok(Session {
            token: self.tokens.issue(&user)?,
            user: user.profile(),
        })
    }

    /// Change another user's role and/or skills (admin)
    pub async fn update_user(&self, principal: &Principal, change: UserChange) -> Result<UserProfile> {
        Operation::UpdateUser.authorize(principal)?;
        if change.role.is_none() && change.skills.is_none() {
            return Err(TriageError::validation("Provide a role or skills to update"));
        }
        self.apply(&change.email, change.role, change.skills).await
    }

    /// Every registered user (admin)
    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<UserProfile>> {
        Operation::ListUsers.authorize(principal)?;
        self.all_users().await
    }

    /// Every registered user, without a role check; for the operator CLI
    pub async fn all_users(&self) -> Result<Vec<UserProfile>> {
        Ok(self
            .users
            .list_users()
            .await?
            .iter()
            .map(|u| u.profile())
            .collect())
    }

    /// Set a role without a role check; for bootstrapping the first admin
    pub async fn set_role(&self, email: &str, role: Role) -> Result<UserProfile> {
        self.apply(email, Some(role), None).await
    }

    async fn apply(
        &self,
        email: &str,
        role: Option<Role>,
        skills: Option<Vec<String>>,
    ) -> Result<UserProfile> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| TriageError::user_not_found(email.trim()))?;
        let skills = skills.map(skills::normalize_skills);
        let updated = self.users.update_user_profile(&user.id, role, skills).await?;
        info!(user_id = %updated.id, role = %updated.role, "User updated");
        Ok(updated.profile())
    }
}
