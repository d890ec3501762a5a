//! Test utilities for ticket-triage
//!
//! Shared fixtures for unit tests: a throwaway help desk backed by a
//! temporary directory, and an event bus that records what was published.

#![cfg(test)]

use crate::core::{Principal, Role, User, UserBuilder};
use crate::error::{Result, TriageError};
use crate::events::{EventBus, TicketEvent};
use crate::storage::{FileStorage, UserRepository};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Password given to every user created through [`TestDesk::user`]
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Event bus that keeps published events in memory
#[derive(Default)]
pub struct RecordingBus {
    events: Mutex<Vec<TicketEvent>>,
    unavailable: AtomicBool,
}

impl RecordingBus {
    /// Make every following publish fail
    pub fn go_down(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<TicketEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, event: TicketEvent) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TriageError::UpstreamUnavailable("bus is down".to_string()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Temporary help desk with storage and a recording bus
pub struct TestDesk {
    _temp_dir: TempDir,
    pub storage: Arc<FileStorage>,
    pub bus: Arc<RecordingBus>,
}

impl TestDesk {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(FileStorage::new(temp_dir.path()));
        Self {
            _temp_dir: temp_dir,
            storage,
            bus: Arc::new(RecordingBus::default()),
        }
    }

    /// Register a user with [`TEST_PASSWORD`]
    pub async fn user(&self, email: &str, role: Role, skills: &[&str]) -> User {
        let hash = crate::auth::hash_password(TEST_PASSWORD).expect("Failed to hash password");
        self.storage
            .create_user(
                UserBuilder::new()
                    .email(email)
                    .password_hash(hash)
                    .role(role)
                    .skills(skills.iter().copied())
                    .build(),
            )
            .await
            .expect("Failed to create user")
    }
}

/// Principal for an existing user
pub const fn principal(user: &User) -> Principal {
    Principal::new(user.id, user.role)
}
