//! Groups a plan's install-class items by owning repo and fetches each
//! package artifact into that repo's cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use pmcore_common::{Progress, ProgressEvent};
use pmcore_repo::{Repo, VarMap};
use pmcore_types::{PackageId, RepoId};

use crate::{Error, PlanItem, TransactionPlan};

/// Artifact paths keyed by the plan item's package, for items that
/// downloaded (or were already cached) successfully.
pub type Downloaded = HashMap<PackageId, std::path::PathBuf>;

const DEFAULT_MAX_PARALLEL_DOWNLOADS: usize = 3;

/// Downloads every install-class item of `plan`, grouped by owning repo.
///
/// Within each repo, up to `max_parallel_downloads` artifacts are fetched
/// concurrently. Progress is reported as a single aggregated stream: a
/// [`ProgressEvent::DownloadStart`] with the plan's total byte count,
/// followed by a [`ProgressEvent::DownloadProgress`] after each item
/// completes, carrying the running total and that item's package id.
///
/// A failure from a non-[`Repo::required`] repo is recorded against that
/// item but does not stop the remaining downloads; a failure from a
/// required repo aborts the whole run once its repo's items have all been
/// attempted, surfaced as [`Error::RequiredDownloadFailed`].
pub async fn download_plan(
    plan: &TransactionPlan,
    repos: &HashMap<RepoId, Repo>,
    vars: &VarMap,
    progress: &dyn Progress,
    max_parallel_downloads: usize,
) -> Result<Downloaded, Error> {
    let mut by_repo: HashMap<&RepoId, Vec<&PlanItem>> = HashMap::new();
    for item in plan.install_class() {
        by_repo.entry(&item.repoid).or_default().push(item);
    }

    let total_bytes: u64 = plan.install_class().map(|item| item.download_size).sum();
    progress.on_event(ProgressEvent::DownloadStart { total_bytes });

    let limit = max_parallel_downloads.max(1);
    let downloaded_bytes = Arc::new(AtomicU64::new(0));
    let mut downloaded = Downloaded::new();
    let mut required_failures = Vec::new();

    for (repo_id, items) in by_repo {
        let repo = repos.get(repo_id).ok_or_else(|| Error::MissingRepo(repo_id.to_string()))?;

        let results = stream::iter(items)
            .map(|item| {
                let downloaded_bytes = downloaded_bytes.clone();
                async move {
                    let result = repo.download_package(&item.location, checksum_or_default(item), vars).await;
                    if let Ok(path) = &result {
                        let bytes = path.metadata().map(|m| m.len()).unwrap_or(0);
                        let running_total = downloaded_bytes.fetch_add(bytes, Ordering::SeqCst) + bytes;
                        progress.on_event(ProgressEvent::DownloadProgress {
                            total_bytes,
                            downloaded_bytes: running_total,
                            current_item_id: item.package,
                        });
                        progress.on_event(ProgressEvent::Downloaded { item: item.location.clone(), bytes });
                    }
                    (item.package, item.location.clone(), result)
                }
            })
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await;

        for (package, location, result) in results {
            match result {
                Ok(path) => {
                    downloaded.insert(package, path);
                }
                Err(err) => {
                    log::warn!("failed to download {location} from {repo_id}: {err}");
                    if repo.required() {
                        required_failures.push(location);
                    }
                }
            }
        }
    }

    if !required_failures.is_empty() {
        return Err(Error::RequiredDownloadFailed(required_failures));
    }

    Ok(downloaded)
}

fn checksum_or_default(item: &PlanItem) -> &pmcore_types::Checksum {
    static FALLBACK: std::sync::OnceLock<pmcore_types::Checksum> = std::sync::OnceLock::new();
    item.checksum.as_ref().unwrap_or_else(|| {
        FALLBACK.get_or_init(|| pmcore_types::Checksum::new(pmcore_types::ChecksumKind::Sha256, Vec::new()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_common::NullProgress;
    use pmcore_sack::Sack;
    use pmcore_solve::{ResolutionAction, Solution};
    use pmcore_types::{Architecture, Evr, Name, Nevra, PackageBuilder, PoolId, Reason, RepoHandle};
    use std::collections::HashMap as Map;

    fn one_item_plan(repoid: &str) -> TransactionPlan {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new(repoid).unwrap());
        let nevra = Nevra::new(Name::new("foo").unwrap(), Evr::parse("1.0-1").unwrap(), Architecture::new("x86_64").unwrap());
        let id = sack.add_package(PackageBuilder::new(nevra, RepoHandle(0)).location("foo-1.0-1.rpm".to_string()).download_size(1024).build());
        sack.make_provides_ready();

        let mut reasons = Map::new();
        reasons.insert(id, Reason::User);
        let solution = Solution::new(vec![ResolutionAction::Install(id)], reasons, Vec::new());
        TransactionPlan::from_solution(&sack, &solution)
    }

    #[tokio::test]
    async fn missing_repo_mapping_is_an_error() {
        let plan = one_item_plan("r");
        let repos: Map<RepoId, Repo> = Map::new();
        let vars = VarMap::new();

        let result = download_plan(&plan, &repos, &vars, &NullProgress, DEFAULT_MAX_PARALLEL_DOWNLOADS).await;
        assert!(matches!(result, Err(Error::MissingRepo(_))));
    }

    #[test]
    fn checksum_or_default_falls_back_without_panicking() {
        let plan = one_item_plan("r");
        let item = &plan.items()[0];
        assert!(item.checksum.is_none());
        let _ = checksum_or_default(item);
    }

    #[test]
    fn plan_item_carries_its_download_size() {
        let plan = one_item_plan("r");
        assert_eq!(plan.items()[0].download_size, 1024);
    }
}
