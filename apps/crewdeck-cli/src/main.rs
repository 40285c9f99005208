mod app;
mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use app::{App, CliResult};
use cli::{
    AuditCommand, BulkCommand, ClaimsCommand, Cli, Command, InviteCommand, MemberCommand,
    PartnerCommand, TaskCommand,
};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> CliResult<bool> {
    let app = App::open(cli.database.as_deref(), cli.actor, cli.json).await?;

    let ok = match cli.command {
        Command::Partner { partner_cmd } => match partner_cmd {
            PartnerCommand::Create {
                id,
                name,
                plan,
                admin,
                admin_name,
                tenant,
            } => {
                cmd_partner_create(&app, &id, &name, &plan, &admin, &admin_name, tenant.as_deref())
                    .await?
            }
            PartnerCommand::Show { id } => cmd_partner_show(&app, &id).await?,
        },
        Command::Invite { invite_cmd } => match invite_cmd {
            InviteCommand::Create {
                partner,
                tenant,
                phone,
                name,
                role,
                hours,
            } => {
                cmd_invite_create(&app, &partner, tenant.as_deref(), &phone, &name, &role, hours)
                    .await?
            }
            InviteCommand::Bulk {
                file,
                partner,
                tenant,
                hours,
            } => cmd_invite_bulk(&app, &file, &partner, tenant.as_deref(), hours).await?,
            InviteCommand::Accept { code, phone, user } => {
                cmd_invite_accept(&app, &code, &phone, &user).await?
            }
            InviteCommand::Show { code } => cmd_invite_show(&app, &code).await?,
            InviteCommand::List { partner, status } => {
                cmd_invite_list(&app, &partner, status.as_deref()).await?
            }
            InviteCommand::Cancel { id, partner } => {
                cmd_invite_cancel(&app, &id, &partner).await?
            }
        },
        Command::Member { member_cmd } => match member_cmd {
            MemberCommand::List { partner, status } => {
                cmd_member_list(&app, &partner, status.as_deref()).await?
            }
            MemberCommand::Show { user, partner } => {
                cmd_member_show(&app, &user, &partner).await?
            }
            MemberCommand::Deactivate {
                user,
                partner,
                reason,
            } => cmd_member_deactivate(&app, &user, &partner, reason).await?,
            MemberCommand::Reactivate {
                user,
                partner,
                code,
            } => cmd_member_reactivate(&app, &user, &partner, code.as_deref()).await?,
            MemberCommand::Role {
                user,
                role,
                partner,
            } => cmd_member_role(&app, &user, &role, &partner).await?,
        },
        Command::Task { task_cmd } => match task_cmd {
            TaskCommand::Create {
                title,
                partner,
                assignee,
            } => cmd_task_create(&app, &title, &partner, assignee.as_deref()).await?,
            TaskCommand::List {
                partner,
                assignee,
                status,
            } => cmd_task_list(&app, &partner, assignee.as_deref(), &status).await?,
            TaskCommand::Transfer { partner, from, to } => {
                cmd_task_transfer(&app, &partner, &from, &to).await?
            }
        },
        Command::Bulk { bulk_cmd } => match bulk_cmd {
            BulkCommand::Run { file, dry_run } => cmd_bulk_run(&app, &file, dry_run).await?,
        },
        Command::Audit { audit_cmd } => match audit_cmd {
            AuditCommand::List {
                partner,
                action,
                user,
                limit,
                offset,
            } => {
                cmd_audit_list(
                    &app,
                    &partner,
                    action.as_deref(),
                    user.as_deref(),
                    limit,
                    offset,
                )
                .await?
            }
        },
        Command::Claims { claims_cmd } => match claims_cmd {
            ClaimsCommand::Show { user } => cmd_claims_show(&app, &user).await?,
            ClaimsCommand::Reconcile { user } => cmd_claims_reconcile(&app, &user).await?,
        },
    };

    app.log_notices();
    Ok(ok)
}
