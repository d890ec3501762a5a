use super::repository::{FailureLog, TicketRepository, TicketScope, TriageFailure, UserRepository};
use crate::core::{Role, Status, Ticket, TicketId, TicketUpdate, UpdateGuard, User, UserId};
use crate::error::{Result, TriageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const TICKETS_DIR: &str = "tickets";
const USERS_DIR: &str = "users";
const FAILURE_LOG: &str = "triage-failures.jsonl";

/// Document store keeping one YAML file per ticket and per user
///
/// Documents are written to a temporary file and renamed into place, so
/// readers never observe a partial document. Writers within the process are
/// serialized by a shared lock, which turns read-check-write sequences into
/// atomic conditional updates. Clones share the lock.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    /// Create a storage rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory layout up front
    pub async fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(self.root.join(TICKETS_DIR)).await?;
        fs::create_dir_all(self.root.join(USERS_DIR)).await?;
        Ok(())
    }

    fn ticket_path(&self, id: &TicketId) -> PathBuf {
        self.root.join(TICKETS_DIR).join(format!("{id}.yaml"))
    }

    fn user_path(&self, id: &UserId) -> PathBuf {
        self.root.join(USERS_DIR).join(format!("{id}.yaml"))
    }

    async fn read_doc<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_yaml::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_doc<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_yaml::to_string(value)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(doc) = Self::read_doc(&path).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Load every ticket document
    pub async fn load_all_tickets(&self) -> Result<Vec<Ticket>> {
        Self::read_all(&self.root.join(TICKETS_DIR)).await
    }

    /// Load every user document
    pub async fn load_all_users(&self) -> Result<Vec<User>> {
        Self::read_all(&self.root.join(USERS_DIR)).await
    }
}

#[async_trait]
impl TicketRepository for FileStorage {
    async fn create(
        &self,
        title: String,
        description: String,
        created_by: UserId,
    ) -> Result<Ticket> {
        let ticket = Ticket::new(title, description, created_by);
        let _guard = self.write_lock.lock().await;
        Self::write_doc(&self.ticket_path(&ticket.id), &ticket).await?;
        Ok(ticket)
    }

    async fn find(&self, id: &TicketId) -> Result<Option<Ticket>> {
        Self::read_doc(&self.ticket_path(id)).await
    }

    async fn list(&self, scope: TicketScope) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .load_all_tickets()
            .await?
            .into_iter()
            .filter(|t| scope.permits(t))
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    async fn update(
        &self,
        id: &TicketId,
        guard: UpdateGuard,
        update: TicketUpdate,
    ) -> Result<Ticket> {
        let _lock = self.write_lock.lock().await;
        let path = self.ticket_path(id);
        let mut ticket: Ticket = Self::read_doc(&path)
            .await?
            .ok_or_else(|| TriageError::ticket_not_found(id))?;

        if !guard.permits(ticket.status) {
            return Err(TriageError::Conflict {
                id: id.to_string(),
                actual: ticket.status,
            });
        }

        ticket.apply(update);
        Self::write_doc(&path, &ticket).await?;
        Ok(ticket)
    }

    async fn open_load(&self) -> Result<HashMap<UserId, usize>> {
        let mut load = HashMap::new();
        for ticket in self.load_all_tickets().await? {
            if let (true, Some(assignee)) = (ticket.status.is_open_work(), ticket.assigned_to) {
                *load.entry(assignee).or_insert(0) += 1;
            }
        }
        Ok(load)
    }

    async fn stale_open(&self, cutoff: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .load_all_tickets()
            .await?
            .into_iter()
            .filter(|t| t.status == Status::Open && t.created_at < cutoff)
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }
}

#[async_trait]
impl UserRepository for FileStorage {
    async fn create_user(&self, user: User) -> Result<User> {
        let _lock = self.write_lock.lock().await;
        let email = user.email.to_lowercase();
        if self
            .load_all_users()
            .await?
            .iter()
            .any(|u| u.email.to_lowercase() == email)
        {
            return Err(TriageError::AlreadyExists(format!(
                "a user with email {} is already registered",
                user.email
            )));
        }
        Self::write_doc(&self.user_path(&user.id), &user).await?;
        Ok(user)
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        Self::read_doc(&self.user_path(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .load_all_users()
            .await?
            .into_iter()
            .find(|u| u.email.to_lowercase() == email))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.load_all_users().await?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_user_profile(
        &self,
        id: &UserId,
        role: Option<Role>,
        skills: Option<Vec<String>>,
    ) -> Result<User> {
        let _lock = self.write_lock.lock().await;
        let path = self.user_path(id);
        let mut user: User = Self::read_doc(&path)
            .await?
            .ok_or_else(|| TriageError::user_not_found(id))?;

        if let Some(role) = role {
            user.role = role;
        }
        if let Some(skills) = skills {
            user.skills = skills;
        }
        Self::write_doc(&path, &user).await?;
        Ok(user)
    }
}

#[async_trait]
impl FailureLog for FileStorage {
    async fn record_failure(&self, failure: &TriageFailure) -> Result<()> {
        let _lock = self.write_lock.lock().await;
        fs::create_dir_all(&self.root).await?;
        let mut line = serde_json::to_string(failure)?;
        line.push('\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(FAILURE_LOG))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn failures(&self) -> Result<Vec<TriageFailure>> {
        let content = match fs::read_to_string(self.root.join(FAILURE_LOG)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Into::into))
            .collect()
    }
}
