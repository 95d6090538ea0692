//! The rpm transaction driver: opens a handle, stages every plan item onto
//! it, and runs the transaction while mirroring progress into the history
//! store and a [`Progress`] sink.
//!
//! No concrete rpm binding lives in this workspace; [`RpmTransactionHandle`]
//! is the seam a real one would be wired in at.

use std::path::Path;

use pmcore_common::{Progress, ProgressEvent};
use pmcore_history::{HistoryStore, NewTransaction, TransactionState};
use pmcore_types::PackageAction;

use crate::{Error, PlanItem, TransactionPlan};

/// One element staged onto an [`RpmTransactionHandle`]: the artifact to add
/// and the action it plays in the transaction.
#[derive(Clone, Debug)]
pub struct TransactionElement<'a> {
    pub item: &'a PlanItem,
    pub artifact: Option<&'a Path>,
}

/// The result rpm reports back for one transaction run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RpmRunResult {
    pub return_code: i32,
    pub failed_items: usize,
}

impl RpmRunResult {
    pub fn ok(&self) -> bool {
        self.return_code == 0
    }
}

/// Abstraction over an underlying rpm transaction handle. A real
/// implementation would wrap `rpmtsCreate`/`rpmtsAddInstallElement`/
/// `rpmtsRun` or an equivalent FFI surface; callers in this workspace only
/// ever see this trait.
pub trait RpmTransactionHandle {
    /// Stages one element (install, upgrade, erase, ...) onto the handle.
    fn add_element(&mut self, element: &TransactionElement<'_>) -> Result<(), Error>;

    /// Runs every staged element, invoking `on_progress` for each byte of
    /// scriptlet/transfer output the underlying engine produces.
    fn run(&mut self, on_progress: &mut dyn FnMut(ProgressEvent)) -> Result<RpmRunResult, Error>;
}

/// Runs `plan` against `handle`, recording the attempt in `history`.
///
/// Implements the numbered steps of the rpm transaction protocol:
/// 1. the handle is assumed already open (construction is the caller's,
///    since only the caller knows the rpmdb root and transaction flags).
/// 2. every plan item is staged via [`RpmTransactionHandle::add_element`].
/// 3. `progress` receives a [`ProgressEvent::PackageBegin`] per item as it
///    is staged, ahead of the actual run, so a UI can show the full queue.
/// 4. a history record is opened in the `"in-progress"` state before the
///    transaction runs.
/// 5. the transaction runs, translating rpm's own progress callbacks into
///    [`ProgressEvent`]s via `handle.run`.
/// 6. on failure, every item belonging to the plan is marked failed and the
///    history record closes in the `"error"` state.
/// 7. on success, the history record closes in the `"done"` state and each
///    item's reason is persisted for future carry-over.
pub fn run_plan(
    plan: &TransactionPlan,
    handle: &mut dyn RpmTransactionHandle,
    history: &HistoryStore,
    new_transaction: &NewTransaction,
    artifacts: &std::collections::HashMap<pmcore_types::PackageId, std::path::PathBuf>,
    progress: &dyn Progress,
    now: i64,
) -> Result<RpmRunResult, Error> {
    for item in plan.items() {
        let element = TransactionElement { item, artifact: artifacts.get(&item.package).map(|p| p.as_path()) };
        handle.add_element(&element)?;
        progress.on_event(ProgressEvent::PackageBegin {
            nevra: format!("{}-{}:{}-{}.{}", item.name, item.epoch.0, item.version, item.release, item.arch),
            action: item.action,
        });
    }

    let trans_id = history.new_transaction(new_transaction)?;
    let mut item_ids = Vec::with_capacity(plan.items().len());
    for item in plan.items() {
        let id = history.add_item(
            trans_id,
            item.name.as_str(),
            &item.epoch.0.to_string(),
            &item.version,
            &item.release,
            item.arch.as_str(),
            item.repoid.as_str(),
            item.action,
            item.reason,
        )?;
        item_ids.push(id);
    }

    let mut events = Vec::new();
    let run_result = handle.run(&mut |event| events.push(event));
    for event in events {
        progress.on_event(event);
    }

    let result = match run_result {
        Ok(result) if result.ok() => {
            history.finish_transaction(trans_id, now, TransactionState::Done)?;
            for item in plan.items() {
                if item.action == PackageAction::Remove {
                    continue;
                }
                history.set_package_reason(item.name.as_str(), item.arch.as_str(), item.reason)?;
            }
            progress.on_event(ProgressEvent::TransactionEnd { ok: true });
            result
        }
        Ok(result) => {
            for id in &item_ids {
                history.mark_item_failed(*id)?;
            }
            history.finish_transaction(trans_id, now, TransactionState::Error)?;
            progress.on_event(ProgressEvent::TransactionEnd { ok: false });
            return Err(Error::RpmTransactionFailed(result.return_code));
        }
        Err(err) => {
            for id in &item_ids {
                history.mark_item_failed(*id)?;
            }
            history.finish_transaction(trans_id, now, TransactionState::Error)?;
            progress.on_event(ProgressEvent::TransactionEnd { ok: false });
            return Err(err);
        }
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_common::NullProgress;
    use pmcore_sack::Sack;
    use pmcore_solve::{ResolutionAction, Solution};
    use pmcore_types::{Architecture, Evr, Name, Nevra, PackageBuilder, PoolId, Reason, RepoHandle, RepoId};
    use std::collections::HashMap;

    struct FakeHandle {
        staged: usize,
        result: RpmRunResult,
    }

    impl RpmTransactionHandle for FakeHandle {
        fn add_element(&mut self, _element: &TransactionElement<'_>) -> Result<(), Error> {
            self.staged += 1;
            Ok(())
        }

        fn run(&mut self, on_progress: &mut dyn FnMut(ProgressEvent)) -> Result<RpmRunResult, Error> {
            on_progress(ProgressEvent::ScriptOutput { bytes: b"done".to_vec() });
            Ok(self.result)
        }
    }

    fn one_item_plan() -> TransactionPlan {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let nevra = Nevra::new(Name::new("foo").unwrap(), Evr::parse("1.0-1").unwrap(), Architecture::new("x86_64").unwrap());
        let id = sack.add_package(PackageBuilder::new(nevra, RepoHandle(0)).location("foo-1.0-1.rpm".to_string()).build());
        sack.make_provides_ready();

        let mut reasons = HashMap::new();
        reasons.insert(id, Reason::User);
        let solution = Solution::new(vec![ResolutionAction::Install(id)], reasons, Vec::new());
        TransactionPlan::from_solution(&sack, &solution)
    }

    fn new_txn() -> NewTransaction {
        NewTransaction {
            dt_begin: 1,
            rpmdb_version: "abc".to_string(),
            releasever: "42".to_string(),
            user_id: 0,
            cmdline: "pmcore install foo".to_string(),
            comment: None,
        }
    }

    #[test]
    fn successful_run_marks_the_history_record_done() {
        let plan = one_item_plan();
        let history = HistoryStore::open_in_memory().unwrap();
        let mut handle = FakeHandle { staged: 0, result: RpmRunResult { return_code: 0, failed_items: 0 } };

        let result = run_plan(&plan, &mut handle, &history, &new_txn(), &HashMap::new(), &NullProgress, 2);
        assert!(result.is_ok());
        assert_eq!(handle.staged, 1);

        let records = history.list_transactions(&Default::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, TransactionState::Done);
    }

    #[test]
    fn failing_run_marks_items_failed_and_records_error_state() {
        let plan = one_item_plan();
        let history = HistoryStore::open_in_memory().unwrap();
        let mut handle = FakeHandle { staged: 0, result: RpmRunResult { return_code: 1, failed_items: 1 } };

        let result = run_plan(&plan, &mut handle, &history, &new_txn(), &HashMap::new(), &NullProgress, 2);
        assert!(matches!(result, Err(Error::RpmTransactionFailed(1))));

        let records = history.list_transactions(&Default::default()).unwrap();
        assert_eq!(records[0].state, TransactionState::Error);
        let items = history.items_for(records[0].id).unwrap();
        assert!(items[0].failed);
    }
}
