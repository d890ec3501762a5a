use super::{Priority, Role, Status, Ticket, TicketId, User, UserId};
use chrono::{DateTime, Utc};

/// Builder for creating Ticket instances
#[derive(Default)]
pub struct TicketBuilder {
    id: Option<TicketId>,
    title: Option<String>,
    description: Option<String>,
    status: Option<Status>,
    created_by: Option<UserId>,
    assigned_to: Option<UserId>,
    summary: Option<String>,
    required_skills: Vec<String>,
    helpful_notes: Option<String>,
    priority: Option<Priority>,
    solution: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    /// Create a new ticket builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ticket ID
    #[must_use]
    pub const fn id(mut self, id: TicketId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the creator
    #[must_use]
    pub const fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    /// Set the assigned moderator
    #[must_use]
    pub const fn assigned_to(mut self, moderator: UserId) -> Self {
        self.assigned_to = Some(moderator);
        self
    }

    /// Set the AI summary
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Add a single required skill
    #[must_use]
    pub fn skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skills.push(skill.into());
        self
    }

    /// Set helpful notes
    #[must_use]
    pub fn helpful_notes(mut self, notes: impl Into<String>) -> Self {
        self.helpful_notes = Some(notes.into());
        self
    }

    /// Set the priority
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the solution
    #[must_use]
    pub fn solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    /// Set `created_at` timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the ticket
    pub fn build(self) -> Ticket {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Ticket {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            created_by: self.created_by.unwrap_or_default(),
            assigned_to: self.assigned_to,
            summary: self.summary,
            required_skills: self.required_skills,
            helpful_notes: self.helpful_notes,
            priority: self.priority,
            solution: self.solution,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Builder for creating User instances
#[derive(Default)]
pub struct UserBuilder {
    id: Option<UserId>,
    email: Option<String>,
    password_hash: Option<String>,
    role: Option<Role>,
    skills: Vec<String>,
    created_at: Option<DateTime<Utc>>,
}

impl UserBuilder {
    /// Create a new user builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID
    #[must_use]
    pub const fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the email
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the stored password hash
    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Set the role
    #[must_use]
    pub const fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set skills
    #[must_use]
    pub fn skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Set `created_at` timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the user
    pub fn build(self) -> User {
        let id = self.id.unwrap_or_default();
        User {
            id,
            email: self
                .email
                .unwrap_or_else(|| format!("user-{id}@example.com")),
            password_hash: self.password_hash.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            skills: self.skills,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_builder() {
        let moderator = UserId::new();
        let ticket = TicketBuilder::new()
            .title("Login broken")
            .description("blank screen on login")
            .status(Status::InProgress)
            .assigned_to(moderator)
            .skill("React")
            .skill("CSS")
            .priority(Priority::High)
            .build();

        assert_eq!(ticket.title, "Login broken");
        assert_eq!(ticket.status, Status::InProgress);
        assert_eq!(ticket.assigned_to, Some(moderator));
        assert_eq!(ticket.required_skills.len(), 2);
        assert_eq!(ticket.created_at, ticket.updated_at);
    }

    #[test]
    fn test_user_builder() {
        let user = UserBuilder::new()
            .email("mod@example.com")
            .role(Role::Moderator)
            .skills(["React", "Node"])
            .build();

        assert_eq!(user.email, "mod@example.com");
        assert_eq!(user.role, Role::Moderator);
        assert_eq!(user.skills, vec!["React", "Node"]);
    }
}
