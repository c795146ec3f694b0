//! The upgrade protocol.
//!
//! Opening a store for normal use goes through a fixed sequence:
//!
//! ```text
//! OpenedShared -> Checked -> Done
//!                    |
//!                    +-> ClosedForUpgrade -> OpenedExclusive -> Applied
//!                          -> ClosedAfterUpgrade -> ReopenedShared
//! ```
//!
//! A handle's access mode is fixed at open time, so going exclusive means
//! closing the shared handle first and opening a fresh one. At no point does
//! the coordinator hold two live handles for the same store.

use std::path::Path;

use keel_migrate::Migrator;
use keel_store::{AccessMode, StoreHandle, StoreOptions};

use crate::error::{Result, UpgradeError};

/// Opens and closes handles on one store.
///
/// Dropping a handle must release it just like [`HandleFactory::close`].
pub trait HandleFactory {
    type Handle;

    /// Open a new handle in `mode`. Must fail, not block indefinitely, when
    /// a conflicting handle exists.
    fn open(&self, mode: AccessMode) -> Result<Self::Handle>;

    /// Close a handle.
    fn close(&self, handle: Self::Handle) -> Result<()>;
}

/// Decides whether migrations are pending and applies them.
pub trait UpgradePlan<H> {
    /// Read-only check, callable on a shared handle.
    fn has_pending(&self, handle: &H) -> Result<bool>;

    /// Apply pending migrations through an exclusive handle. Returns the
    /// names applied, in order.
    fn apply(&self, handle: &H, data_dir: &Path) -> Result<Vec<String>>;
}

/// [`HandleFactory`] over a directory store.
#[derive(Debug, Clone)]
pub struct StoreFactory {
    options: StoreOptions,
}

impl StoreFactory {
    pub fn new(options: StoreOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

impl HandleFactory for StoreFactory {
    type Handle = StoreHandle;

    fn open(&self, mode: AccessMode) -> Result<StoreHandle> {
        self.options
            .clone()
            .mode(mode)
            .open()
            .map_err(UpgradeError::Open)
    }

    fn close(&self, handle: StoreHandle) -> Result<()> {
        handle.close().map_err(UpgradeError::Close)
    }
}

impl UpgradePlan<StoreHandle> for Migrator<'_> {
    fn has_pending(&self, handle: &StoreHandle) -> Result<bool> {
        Migrator::has_pending(self, handle).map_err(UpgradeError::Inspect)
    }

    fn apply(&self, handle: &StoreHandle, data_dir: &Path) -> Result<Vec<String>> {
        Migrator::apply(self, handle, data_dir)
            .map(|report| report.applied)
            .map_err(UpgradeError::Migrate)
    }
}

/// States of the upgrade sequence, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeState {
    OpenedShared,
    Checked,
    Done,
    ClosedForUpgrade,
    OpenedExclusive,
    Applied,
    ClosedAfterUpgrade,
    ReopenedShared,
}

/// A successfully opened store.
#[derive(Debug)]
pub struct Upgrade<H> {
    /// Shared handle, ready for normal use.
    pub handle: H,
    /// States entered, in order.
    pub states: Vec<UpgradeState>,
    /// Migrations applied during this run.
    pub applied: Vec<String>,
}

impl<H> Upgrade<H> {
    /// Whether the store went through an exclusive migration window.
    pub fn upgraded(&self) -> bool {
        self.states.contains(&UpgradeState::OpenedExclusive)
    }

    pub fn into_handle(self) -> H {
        self.handle
    }
}

type Probe<'a, H> = Box<dyn Fn(&H) -> Result<()> + 'a>;

/// Runs the upgrade sequence against one store.
pub struct Coordinator<'a, F: HandleFactory, P> {
    factory: &'a F,
    plan: &'a P,
    data_dir: &'a Path,
    apply_migrations: bool,
    probe: Option<Probe<'a, F::Handle>>,
}

impl<'a, F, P> Coordinator<'a, F, P>
where
    F: HandleFactory,
    P: UpgradePlan<F::Handle>,
{
    pub fn new(factory: &'a F, plan: &'a P, data_dir: &'a Path) -> Self {
        Self {
            factory,
            plan,
            data_dir,
            apply_migrations: true,
            probe: None,
        }
    }

    /// Skip the migration check entirely when `false`.
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Run `probe` on the first shared handle, before the migration check.
    pub fn probe(mut self, probe: impl Fn(&F::Handle) -> Result<()> + 'a) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Run the sequence. Any failure aborts it and no handle is returned.
    pub fn run(&self) -> Result<Upgrade<F::Handle>> {
        let mut states = Vec::new();

        let shared = self.factory.open(AccessMode::Shared)?;
        enter(&mut states, UpgradeState::OpenedShared);

        if let Some(probe) = &self.probe {
            probe(&shared)?;
        }

        if !self.apply_migrations {
            enter(&mut states, UpgradeState::Done);
            return Ok(Upgrade {
                handle: shared,
                states,
                applied: Vec::new(),
            });
        }

        let pending = self.plan.has_pending(&shared)?;
        enter(&mut states, UpgradeState::Checked);
        if !pending {
            enter(&mut states, UpgradeState::Done);
            return Ok(Upgrade {
                handle: shared,
                states,
                applied: Vec::new(),
            });
        }

        tracing::info!("Re-opening store in exclusive mode to apply migrations");
        self.factory.close(shared)?;
        enter(&mut states, UpgradeState::ClosedForUpgrade);

        let exclusive = self.factory.open(AccessMode::Exclusive)?;
        enter(&mut states, UpgradeState::OpenedExclusive);

        let applied = match self.plan.apply(&exclusive, self.data_dir) {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(close_err) = self.factory.close(exclusive) {
                    tracing::warn!(error = %close_err, "failed to close store after migration failure");
                }
                return Err(e);
            }
        };
        enter(&mut states, UpgradeState::Applied);

        self.factory.close(exclusive)?;
        enter(&mut states, UpgradeState::ClosedAfterUpgrade);

        let shared = self.factory.open(AccessMode::Shared)?;
        enter(&mut states, UpgradeState::ReopenedShared);
        tracing::info!(applied = applied.len(), "store upgraded");

        Ok(Upgrade {
            handle: shared,
            states,
            applied,
        })
    }
}

fn enter(states: &mut Vec<UpgradeState>, state: UpgradeState) {
    tracing::debug!(?state, "upgrade state");
    states.push(state);
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use keel_migrate::MigrateError;
    use keel_store::StoreError;

    use super::*;
    use UpgradeState::*;

    /// Factory that enforces the single-live-handle rule and logs calls.
    #[derive(Default)]
    struct MockFactory {
        live: Cell<usize>,
        peak: Cell<usize>,
        events: RefCell<Vec<&'static str>>,
        fail_exclusive: bool,
    }

    #[derive(Debug)]
    struct MockHandle {
        mode: AccessMode,
    }

    impl HandleFactory for MockFactory {
        type Handle = MockHandle;

        fn open(&self, mode: AccessMode) -> Result<MockHandle> {
            if mode.is_exclusive() && (self.fail_exclusive || self.live.get() > 0) {
                return Err(UpgradeError::Open(StoreError::Locked {
                    path: "mock".into(),
                    mode,
                }));
            }
            self.live.set(self.live.get() + 1);
            self.peak.set(self.peak.get().max(self.live.get()));
            self.events.borrow_mut().push(match mode {
                AccessMode::Shared => "open shared",
                AccessMode::Exclusive => "open exclusive",
            });
            Ok(MockHandle { mode })
        }

        fn close(&self, handle: MockHandle) -> Result<()> {
            self.live.set(self.live.get() - 1);
            self.events.borrow_mut().push(match handle.mode {
                AccessMode::Shared => "close shared",
                AccessMode::Exclusive => "close exclusive",
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPlan {
        pending: bool,
        inspect_fails: bool,
        apply_fails: bool,
        applied_with: RefCell<Option<AccessMode>>,
    }

    impl UpgradePlan<MockHandle> for MockPlan {
        fn has_pending(&self, _: &MockHandle) -> Result<bool> {
            if self.inspect_fails {
                return Err(UpgradeError::Inspect(MigrateError::Store(
                    StoreError::InvalidData("unreadable".into()),
                )));
            }
            Ok(self.pending)
        }

        fn apply(&self, handle: &MockHandle, _: &Path) -> Result<Vec<String>> {
            *self.applied_with.borrow_mut() = Some(handle.mode);
            if self.apply_fails {
                return Err(UpgradeError::Migrate(MigrateError::DuplicateName("x".into())));
            }
            Ok(vec!["a".to_string(), "b".to_string()])
        }
    }

    fn run(factory: &MockFactory, plan: &MockPlan) -> Result<Upgrade<MockHandle>> {
        Coordinator::new(factory, plan, Path::new("/data")).run()
    }

    #[test]
    fn test_nothing_pending_keeps_shared_handle() {
        let factory = MockFactory::default();
        let plan = MockPlan::default();

        let upgrade = run(&factory, &plan).unwrap();
        assert_eq!(upgrade.states, vec![OpenedShared, Checked, Done]);
        assert_eq!(upgrade.handle.mode, AccessMode::Shared);
        assert!(!upgrade.upgraded());
        assert!(plan.applied_with.borrow().is_none());
        assert_eq!(*factory.events.borrow(), vec!["open shared"]);
    }

    #[test]
    fn test_pending_runs_full_sequence() {
        let factory = MockFactory::default();
        let plan = MockPlan {
            pending: true,
            ..Default::default()
        };

        let upgrade = run(&factory, &plan).unwrap();
        assert_eq!(
            upgrade.states,
            vec![
                OpenedShared,
                Checked,
                ClosedForUpgrade,
                OpenedExclusive,
                Applied,
                ClosedAfterUpgrade,
                ReopenedShared
            ]
        );
        assert_eq!(upgrade.applied, vec!["a", "b"]);
        assert_eq!(upgrade.handle.mode, AccessMode::Shared);
        assert_eq!(*plan.applied_with.borrow(), Some(AccessMode::Exclusive));
        assert_eq!(
            *factory.events.borrow(),
            vec![
                "open shared",
                "close shared",
                "open exclusive",
                "close exclusive",
                "open shared"
            ]
        );
        assert_eq!(factory.peak.get(), 1);
    }

    #[test]
    fn test_apply_failure_closes_exclusive_and_returns_no_handle() {
        let factory = MockFactory::default();
        let plan = MockPlan {
            pending: true,
            apply_fails: true,
            ..Default::default()
        };

        let err = run(&factory, &plan).unwrap_err();
        assert!(matches!(err, UpgradeError::Migrate(_)));
        assert_eq!(factory.live.get(), 0);
        assert_eq!(factory.events.borrow().last(), Some(&"close exclusive"));
    }

    #[test]
    fn test_inspect_failure_is_not_nothing_pending() {
        let factory = MockFactory::default();
        let plan = MockPlan {
            inspect_fails: true,
            ..Default::default()
        };

        let err = run(&factory, &plan).unwrap_err();
        assert!(matches!(err, UpgradeError::Inspect(_)));
    }

    #[test]
    fn test_exclusive_open_failure_aborts() {
        let factory = MockFactory {
            fail_exclusive: true,
            ..Default::default()
        };
        let plan = MockPlan {
            pending: true,
            ..Default::default()
        };

        let err = run(&factory, &plan).unwrap_err();
        assert!(matches!(err, UpgradeError::Open(StoreError::Locked { .. })));
        assert!(plan.applied_with.borrow().is_none());
    }

    #[test]
    fn test_migrations_disabled_skips_check() {
        let factory = MockFactory::default();
        let plan = MockPlan {
            pending: true,
            ..Default::default()
        };

        let upgrade = Coordinator::new(&factory, &plan, Path::new("/data"))
            .apply_migrations(false)
            .run()
            .unwrap();
        assert_eq!(upgrade.states, vec![OpenedShared, Done]);
    }

    #[test]
    fn test_probe_runs_on_shared_handle_and_can_abort() {
        let factory = MockFactory::default();
        let plan = MockPlan {
            pending: true,
            ..Default::default()
        };
        let probed = Cell::new(None);

        let err = Coordinator::new(&factory, &plan, Path::new("/data"))
            .probe(|handle: &MockHandle| {
                probed.set(Some(handle.mode));
                Err(UpgradeError::Config("stop".into()))
            })
            .run()
            .unwrap_err();
        assert!(matches!(err, UpgradeError::Config(_)));
        assert_eq!(probed.get(), Some(AccessMode::Shared));
        assert!(plan.applied_with.borrow().is_none());
    }
}
