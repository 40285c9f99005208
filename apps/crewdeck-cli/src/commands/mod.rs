pub mod audit;
pub mod bulk;
pub mod claims;
pub mod invite;
pub mod member;
pub mod partner;
pub mod task;

pub use audit::cmd_audit_list;
pub use bulk::cmd_bulk_run;
pub use claims::{cmd_claims_reconcile, cmd_claims_show};
pub use invite::{
    cmd_invite_accept, cmd_invite_bulk, cmd_invite_cancel, cmd_invite_create, cmd_invite_list,
    cmd_invite_show,
};
pub use member::{
    cmd_member_deactivate, cmd_member_list, cmd_member_reactivate, cmd_member_role,
    cmd_member_show,
};
pub use partner::{cmd_partner_create, cmd_partner_show};
pub use task::{cmd_task_create, cmd_task_list, cmd_task_transfer};
