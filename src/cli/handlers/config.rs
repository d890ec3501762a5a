use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::error::Result;

/// Print the effective configuration with secrets redacted
pub fn handle_config_show(config: &Config, formatter: &OutputFormatter) -> Result<()> {
    let shown = config.redacted();
    if formatter.is_json() {
        return formatter.print_json(&shown);
    }
    formatter.info(serde_yaml::to_string(&shown)?.trim_end());
    Ok(())
}
