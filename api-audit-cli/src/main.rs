//! api-audit command line: verbose API Gateway stage logging with
//! snapshot/restore, Macie2 membership sync, and caller identity lookup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use api_audit_core::{ApiAuditService, AuditState};

#[derive(Parser)]
#[command(name = "api-audit", version, about, long_about = None)]
struct Cli {
    /// Path of the JSON state file holding stage snapshots.
    #[arg(long, global = true, default_value = "api-audit.state.json")]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enable verbose logging on every stage of the given REST APIs.
    EnableLogging {
        /// REST API id to track; repeat for several.
        #[arg(long = "rest-api-id", required = true)]
        rest_api_ids: Vec<String>,
    },
    /// Restore the snapshotted logging configuration and stop tracking.
    ///
    /// Without ids, restores every tracked REST API.
    RestoreLogging {
        /// REST API id to restore; repeat for several.
        #[arg(long = "rest-api-id")]
        rest_api_ids: Vec<String>,
    },
    /// Show tracked REST APIs and stored snapshots (offline).
    Status,
    /// List the stage names of a REST API.
    ListStages {
        rest_api_id: String,
    },
    /// Overwrite a stage's description, snapshotting the prior value.
    SetDescription {
        #[arg(long)]
        rest_api_id: String,
        #[arg(long)]
        stage_name: String,
        #[arg(long)]
        description: String,
    },
    /// Restore a stage's snapshotted description.
    ResetDescription {
        #[arg(long)]
        rest_api_id: String,
        #[arg(long)]
        stage_name: String,
    },
    /// Macie2 organization membership management.
    #[command(subcommand)]
    Macie(MacieCommand),
    /// Show the identity the toolkit is running as.
    CallerIdentity,
}

#[derive(Subcommand)]
enum MacieCommand {
    /// List current member accounts.
    Members,
    /// Associate the given accounts as members.
    Add {
        /// Member account id; repeat for several.
        #[arg(long = "account", required = true)]
        accounts: Vec<String>,
    },
    /// Disassociate and delete the given member accounts.
    Remove {
        /// Member account id; repeat for several.
        #[arg(long = "account", required = true)]
        accounts: Vec<String>,
    },
    /// Make the live membership match the given account list exactly.
    Sync {
        /// Desired member account id; repeat for several.
        #[arg(long = "account", required = true)]
        accounts: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Status is served from the state file alone; no AWS credentials needed.
    if matches!(cli.command, Command::Status) {
        return print_status(&cli.state_file);
    }

    let service = ApiAuditService::new()
        .await
        .context("failed to initialize AWS clients")?;

    match cli.command {
        Command::Status => unreachable!("handled above"),
        Command::EnableLogging { rest_api_ids } => {
            let mut state = AuditState::load(&cli.state_file)?;
            let result = service.enable_logging(&mut state, &rest_api_ids).await;
            // Snapshots taken before a mid-operation failure must survive it.
            state.save(&cli.state_file)?;
            let patched = result?;
            println!("Enabled verbose logging on {patched} stage(s)");
        }
        Command::RestoreLogging { rest_api_ids } => {
            let mut state = AuditState::load(&cli.state_file)?;
            let result = service.restore_logging(&mut state, &rest_api_ids).await;
            state.save(&cli.state_file)?;
            let restored = result?;
            println!("Restored {restored} stage(s)");
        }
        Command::ListStages { rest_api_id } => {
            for name in service.list_stage_names(&rest_api_id).await? {
                println!("{name}");
            }
        }
        Command::SetDescription {
            rest_api_id,
            stage_name,
            description,
        } => {
            let mut state = AuditState::load(&cli.state_file)?;
            let result = service
                .set_stage_description(&mut state, &rest_api_id, &stage_name, &description)
                .await;
            state.save(&cli.state_file)?;
            result?;
            println!("Updated description of stage '{stage_name}'");
        }
        Command::ResetDescription {
            rest_api_id,
            stage_name,
        } => {
            let mut state = AuditState::load(&cli.state_file)?;
            let result = service
                .reset_stage_description(&mut state, &rest_api_id, &stage_name)
                .await;
            state.save(&cli.state_file)?;
            if result? {
                println!("Restored description of stage '{stage_name}'");
            } else {
                println!("No snapshot for stage '{stage_name}', nothing to restore");
            }
        }
        Command::Macie(command) => run_macie(&service, command).await?,
        Command::CallerIdentity => {
            let identity = service.caller_identity().await?;
            println!("Account: {}", identity.account_id);
            println!("Arn:     {}", identity.arn);
            println!("UserId:  {}", identity.user_id);
            if let Some(role_arn) = identity.eks_role_arn {
                println!("EKS role: {role_arn}");
            }
        }
    }
    Ok(())
}

async fn run_macie(service: &ApiAuditService, command: MacieCommand) -> anyhow::Result<()> {
    match command {
        MacieCommand::Members => {
            for account in service.macie_members().await? {
                println!("{account}");
            }
        }
        MacieCommand::Add { accounts } => {
            let added = service.macie_add_members(&accounts).await?;
            println!("Associated {added} member account(s)");
        }
        MacieCommand::Remove { accounts } => {
            let removed = service.macie_remove_members(&accounts).await?;
            println!("Removed {removed} member account(s)");
        }
        MacieCommand::Sync { accounts } => {
            let outcome = service.macie_sync_members(&accounts).await?;
            println!(
                "Membership in sync: {} added, {} removed",
                outcome.added.len(),
                outcome.removed.len()
            );
        }
    }
    Ok(())
}

fn print_status(state_file: &Path) -> anyhow::Result<()> {
    let state = AuditState::load(state_file)?;
    if state.rest_api_ids.is_empty() {
        println!("No REST APIs tracked");
    } else {
        println!("Tracked REST APIs:");
        for rest_api_id in &state.rest_api_ids {
            println!("  {rest_api_id}");
        }
    }
    if !state.rest_api_states.is_empty() {
        println!("Stage snapshots:");
        for (key, encoded) in &state.rest_api_states {
            println!("  {key}: {encoded}");
        }
    }
    if !state.stage_descriptions.is_empty() {
        println!("Description snapshots:");
        for (key, description) in &state.stage_descriptions {
            println!("  {key}: {description}");
        }
    }
    Ok(())
}
