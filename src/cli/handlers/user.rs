use super::HandlerContext;
use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::core::Role;
use crate::error::Result;
use crate::service::UserService;

/// Set a user's role directly in storage
pub async fn handle_user_set_role(
    config: Config,
    email: &str,
    role: Role,
    formatter: &OutputFormatter,
) -> Result<()> {
    let ctx = HandlerContext::new(config).await?;
    let users = UserService::new(ctx.storage.clone(), ctx.tokens());
    let profile = users.set_role(email, role).await?;

    if formatter.is_json() {
        return formatter.print_json(&profile);
    }
    formatter.success(&format!("{} is now {}", profile.email, profile.role));
    Ok(())
}

pub async fn handle_user_list(config: Config, formatter: &OutputFormatter) -> Result<()> {
    let ctx = HandlerContext::new(config).await?;
    let users = UserService::new(ctx.storage.clone(), ctx.tokens())
        .all_users()
        .await?;

    if formatter.is_json() {
        return formatter.print_json(&users);
    }
    if users.is_empty() {
        formatter.info("No users registered");
        return Ok(());
    }
    for user in &users {
        formatter.info(&format!(
            "{:<32} {:<10} {}",
            user.email,
            user.role.as_str(),
            user.skills.join(", ")
        ));
    }
    Ok(())
}
