use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crewdeck")]
#[command(about = "Workspace membership and invitations", version)]
pub struct Cli {
    /// SQLite database URL (defaults to ~/.crewdeck/crewdeck.db)
    #[arg(long, env = "CREWDECK_DATABASE_URL", global = true)]
    pub database: Option<String>,

    /// User id the command acts as (required for changes)
    #[arg(long = "as", env = "CREWDECK_ACTOR", global = true)]
    pub actor: Option<String>,

    /// Print the raw response envelope as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Partner (tenant) commands
    Partner {
        #[command(subcommand)]
        partner_cmd: PartnerCommand,
    },
    /// Invitation code commands
    Invite {
        #[command(subcommand)]
        invite_cmd: InviteCommand,
    },
    /// Team member commands
    Member {
        #[command(subcommand)]
        member_cmd: MemberCommand,
    },
    /// Task commands
    Task {
        #[command(subcommand)]
        task_cmd: TaskCommand,
    },
    /// Validate-then-execute batches
    Bulk {
        #[command(subcommand)]
        bulk_cmd: BulkCommand,
    },
    /// Audit log commands
    Audit {
        #[command(subcommand)]
        audit_cmd: AuditCommand,
    },
    /// Identity claims commands
    Claims {
        #[command(subcommand)]
        claims_cmd: ClaimsCommand,
    },
}

#[derive(Subcommand)]
pub enum PartnerCommand {
    /// Register a partner with its first admin
    Create {
        /// Partner ID
        id: String,
        /// Display name
        name: String,
        /// Billing plan
        #[arg(long, default_value = "team")]
        plan: String,
        /// User id of the first partner admin
        #[arg(long)]
        admin: String,
        /// Display name of the first partner admin
        #[arg(long, default_value = "Admin")]
        admin_name: String,
        /// Tenant ID (defaults to the partner ID)
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Show a partner
    Show {
        /// Partner ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum InviteCommand {
    /// Issue an invitation code for a phone number
    Create {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Tenant ID (defaults to the partner ID)
        #[arg(long)]
        tenant: Option<String>,
        /// Invitee phone number
        #[arg(long)]
        phone: String,
        /// Invitee name
        #[arg(long)]
        name: String,
        /// partner_admin or employee
        #[arg(long, default_value = "employee")]
        role: String,
        /// Expiry in hours instead of the standard seven days
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Issue invitations for every entry of a JSON file
    Bulk {
        /// JSON array of {"phoneNumber", "name", "role"?}
        file: PathBuf,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Tenant ID (defaults to the partner ID)
        #[arg(long)]
        tenant: Option<String>,
        /// Expiry in hours (defaults to CREWDECK_INVITE_EXPIRY_HOURS)
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Accept an invitation code
    Accept {
        /// Invitation code
        code: String,
        /// Phone number the code was sent to
        #[arg(long)]
        phone: String,
        /// User id joining the partner
        #[arg(long)]
        user: String,
    },
    /// Show what a code grants without using it
    Show {
        /// Invitation code
        code: String,
    },
    /// List a partner's invitations
    List {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// pending, accepted, expired or cancelled
        #[arg(long)]
        status: Option<String>,
    },
    /// Cancel a pending invitation
    Cancel {
        /// Invitation ID
        id: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// List a partner's members
    List {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// active or suspended
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one member
    Show {
        /// User ID
        user: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
    },
    /// Suspend a member and revoke their open tasks
    Deactivate {
        /// User ID
        user: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Reason recorded on the member
        #[arg(long)]
        reason: Option<String>,
    },
    /// Restore a suspended member with a fresh invitation code
    Reactivate {
        /// User ID
        user: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Pending invitation code for the partner
        #[arg(long)]
        code: Option<String>,
    },
    /// Change a member's role
    Role {
        /// User ID
        user: String,
        /// partner_admin or employee
        role: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        /// Task title
        title: String,
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Assignee user ID
        #[arg(long)]
        assignee: Option<String>,
    },
    /// List a partner's tasks
    List {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Only tasks assigned to this user
        #[arg(long)]
        assignee: Option<String>,
        /// Only tasks in this status (repeatable)
        #[arg(long)]
        status: Vec<String>,
    },
    /// Move every open task from one member to another
    Transfer {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Current assignee
        #[arg(long)]
        from: String,
        /// New assignee
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
pub enum BulkCommand {
    /// Run a bulk request from a JSON file
    Run {
        /// JSON file with {"partnerId", "performedBy", "items": [...]}
        file: PathBuf,
        /// Validate only
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum AuditCommand {
    /// List audit entries for a partner, newest first
    List {
        /// Partner ID
        #[arg(long, short = 'p')]
        partner: String,
        /// Filter by action (e.g. member.deactivate)
        #[arg(long)]
        action: Option<String>,
        /// Filter by target user
        #[arg(long)]
        user: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<u32>,
        /// Entries to skip
        #[arg(long)]
        offset: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ClaimsCommand {
    /// Show a user's claims
    Show {
        /// User ID
        user: String,
    },
    /// Rebuild a user's claims from their active memberships
    Reconcile {
        /// User ID
        user: String,
    },
}
