use clap::{Parser, Subcommand};

use crate::config::{AllowedOrigins, Config, IdentityConfig, StoreConfig};
use crate::domain::BillingMonth;
use crate::identity::SharedSecretVerifier;
use crate::startup;

#[derive(Parser)]
#[command(name = "paysplit")]
#[command(about = "Paysplit - shared household expense tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Print the effective configuration
    Config,

    /// Validate configuration and probe the record store
    Check,

    /// Spreadsheet management commands
    #[command(subcommand)]
    Sheet(SheetCommands),

    /// Print the payment summary for a month
    Summary {
        /// Month in MM/YYYY form (default: current month)
        #[arg(short, long, value_name = "MM/YYYY")]
        month: Option<BillingMonth>,
    },

    /// Issue a development token signed with AUTH_JWT_SECRET
    Token {
        /// Subject (user id) of the token
        #[arg(value_name = "SUBJECT")]
        subject: String,

        #[arg(short, long)]
        email: Option<String>,

        /// Validity in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[derive(Subcommand)]
pub enum SheetCommands {
    /// Write the header row if it is missing
    Init,
}

pub fn handle_config_show(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Bind Address: {}", config.bind_address());
    match &config.store {
        StoreConfig::Memory => println!("  Record Store: memory"),
        StoreConfig::Sheets(sheets) => {
            println!("  Record Store: sheets");
            println!("    Spreadsheet: {}", mask_secret(&sheets.spreadsheet_id));
            println!("    Sheet: {} (tab {})", sheets.sheet_name, sheets.sheet_tab_id);
            println!("    API URL: {}", sheets.api_url);
            println!("    Credentials: {:?}", sheets.credentials);
        }
    }
    println!("  Identity: {}", config.identity.describe());
    match &config.allowed_origins {
        AllowedOrigins::Any => println!("  CORS Origins: *"),
        AllowedOrigins::List(origins) => println!("  CORS Origins: {}", origins.join(", ")),
    }
    println!("  People: {} / {}", config.person_a_name, config.person_b_name);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

pub async fn handle_check(config: &Config) -> anyhow::Result<()> {
    let report = startup::validate_environment(config).await;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("startup validation failed");
    }
    Ok(())
}

pub async fn handle_sheet_init(config: &Config) -> anyhow::Result<()> {
    let state = startup::build_state(config)?;
    state.payments.prepare_store().await?;

    println!("✓ Sheet headers are in place");
    Ok(())
}

pub async fn handle_summary(config: &Config, month: Option<BillingMonth>) -> anyhow::Result<()> {
    let state = startup::build_state(config)?;
    let summary = state.payments.summary(month).await?;

    println!("Summary for {}", summary.current_month);
    println!("{:<30} {:>12} {:>12}", "", config.person_a_name, config.person_b_name);
    println!("{}", "-".repeat(56));
    println!(
        "{:<30} {:>12} {:>12}",
        "Due this month", summary.total_amount_a, summary.total_amount_b
    );
    println!(
        "{:<30} {:>12} {:>12}",
        "Unpaid this month", summary.unpaid_this_month_a, summary.unpaid_this_month_b
    );
    println!(
        "{:<30} {:>12} {:>12}",
        "Outstanding", summary.outstanding_a, summary.outstanding_b
    );
    println!("\n{} active item(s)", summary.items.len());
    for item in &summary.items {
        println!("  {:<36} {}", item.id, item.name);
    }

    Ok(())
}

pub fn handle_token(
    config: &Config,
    subject: &str,
    email: Option<&str>,
    hours: i64,
) -> anyhow::Result<()> {
    let IdentityConfig::SharedSecret { secret } = &config.identity else {
        anyhow::bail!("tokens can only be issued when AUTH_JWT_SECRET is the identity provider");
    };
    if hours <= 0 {
        anyhow::bail!("--hours must be greater than zero");
    }

    let token = SharedSecretVerifier::new(secret).issue(
        subject,
        email,
        chrono::Duration::hours(hours),
    )?;
    println!("{}", token);
    Ok(())
}

/// Keeps the first and last four characters of long identifiers.
fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_identifiers() {
        assert_eq!(mask_secret("1AbCdEfGhIjKlMn"), "1AbC****KlMn");
        assert_eq!(mask_secret("short"), "****");
    }

    #[test]
    fn parses_summary_month() {
        let cli = Cli::try_parse_from(["paysplit", "summary", "--month", "03/2025"]).unwrap();
        match cli.command {
            Some(Commands::Summary { month }) => {
                assert_eq!(month, Some("03/2025".parse().unwrap()))
            }
            _ => panic!("expected summary command"),
        }
        assert!(Cli::try_parse_from(["paysplit", "summary", "--month", "2025-03"]).is_err());
    }

    #[test]
    fn parses_sheet_init() {
        let cli = Cli::try_parse_from(["paysplit", "sheet", "init"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Sheet(SheetCommands::Init))));
    }
}
