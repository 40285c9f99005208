//! Shared state for one CLI invocation.

use std::sync::Arc;

use crewdeck_audit::AuditLog;
use crewdeck_identity::IdentityProvider;
use crewdeck_membership::{Backends, MembershipConfig, MembershipService};
use crewdeck_notify::Notifier;
use crewdeck_notify_memory::MemoryNotifier;
use crewdeck_storage::{Store, UserId};
use crewdeck_store_sqlite::SqliteStore;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub struct App {
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub service: MembershipService,
    pub json: bool,
    actor: Option<UserId>,
}

impl App {
    /// Open the database (running migrations) and wire the service over it.
    pub async fn open(database: Option<&str>, actor: Option<String>, json: bool) -> CliResult<Self> {
        let config = MembershipConfig::from_env()?;
        let store = Arc::new(match database {
            Some(url) => SqliteStore::open(url).await?,
            None => SqliteStore::open_default().await?,
        });
        let notifier = Arc::new(MemoryNotifier::new());
        let service = MembershipService::new(
            Backends {
                store: store.clone() as Arc<dyn Store>,
                identity: store.clone() as Arc<dyn IdentityProvider>,
                audit: store.clone() as Arc<dyn AuditLog>,
                notifier: notifier.clone() as Arc<dyn Notifier>,
            },
            &config,
        );
        tracing::debug!(?config, "membership service ready");
        Ok(Self {
            store,
            notifier,
            service,
            json,
            actor: actor.map(UserId::from),
        })
    }

    /// The `--as` user, required by every command that changes something.
    pub fn actor(&self) -> CliResult<UserId> {
        self.actor
            .clone()
            .ok_or_else(|| "this command needs --as <user-id> (or CREWDECK_ACTOR)".into())
    }

    /// There is no delivery transport; log what would have been sent.
    pub fn log_notices(&self) {
        for notice in self.notifier.sent() {
            tracing::info!(
                kind = ?notice.kind,
                partner_id = %notice.partner_id,
                recipients = ?notice.recipients,
                channels = ?notice.channels,
                payload = %notice.payload,
                "notice"
            );
        }
    }
}
