//! Atomic multi-document write batches.

use super::{InvitationCode, Partner, Task, TeamMember, WorkspaceLink};

/// A single full-record upsert inside a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    PutPartner(Partner),
    PutTeamMember(TeamMember),
    PutWorkspaceLink(WorkspaceLink),
    PutInvitation(InvitationCode),
    PutTask(Task),
}

impl WriteOp {
    /// Collection the op writes to, for logging.
    pub fn collection(&self) -> &'static str {
        match self {
            WriteOp::PutPartner(_) => "partners",
            WriteOp::PutTeamMember(_) => "teamMembers",
            WriteOp::PutWorkspaceLink(_) => "userWorkspaceLinks",
            WriteOp::PutInvitation(_) => "invitationCodes",
            WriteOp::PutTask(_) => "tasks",
        }
    }
}

/// Ordered list of writes applied all-or-nothing by `Store::commit`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn put_team_member(mut self, member: TeamMember) -> Self {
        self.ops.push(WriteOp::PutTeamMember(member));
        self
    }

    pub fn put_workspace_link(mut self, link: WorkspaceLink) -> Self {
        self.ops.push(WriteOp::PutWorkspaceLink(link));
        self
    }

    pub fn put_invitation(mut self, invitation: InvitationCode) -> Self {
        self.ops.push(WriteOp::PutInvitation(invitation));
        self
    }

    pub fn put_task(mut self, task: Task) -> Self {
        self.ops.push(WriteOp::PutTask(task));
        self
    }

    pub fn put_partner(mut self, partner: Partner) -> Self {
        self.ops.push(WriteOp::PutPartner(partner));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
