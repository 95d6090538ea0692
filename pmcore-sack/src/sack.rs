//! The sack: a [`Pool`] plus the excludes/includes algebra that derives the
//! *considered* set, and installonly/running-kernel bookkeeping.

use pmcore_types::{Package, PackageId, PackageSet, PoolId, RepoHandle, RepoId};

use crate::glob::glob_matches;
use crate::pool::Pool;

const DEFAULT_INSTALLONLY_LIMIT: u32 = 3;

struct AttachedRepo {
    handle: RepoHandle,
    id: RepoId,
    excludes: PackageSet,
    includes: PackageSet,
    use_includes: bool,
}

/// Owns a [`Pool`] along with every repo's excludes/includes and the
/// installonly/running-kernel state that the goal and solver layers consult.
pub struct Sack {
    pool: Pool,
    repos: Vec<AttachedRepo>,
    global_excludes: PackageSet,
    considered: PackageSet,
    considered_dirty: bool,
    installonly_patterns: Vec<String>,
    installonly_limit: u32,
    running_kernel: Option<PackageId>,
}

impl Sack {
    pub fn new(pool_id: PoolId) -> Self {
        Self {
            pool: Pool::new(pool_id),
            repos: Vec::new(),
            global_excludes: PackageSet::new(pool_id),
            considered: PackageSet::new(pool_id),
            considered_dirty: true,
            installonly_patterns: vec![
                "kernel".to_string(),
                "kernel-core".to_string(),
                "kernel-uek".to_string(),
                "kernel-debug".to_string(),
                "kernel-modules".to_string(),
            ],
            installonly_limit: DEFAULT_INSTALLONLY_LIMIT,
            running_kernel: None,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool.id()
    }

    /// Attaches a new, empty-excludes repo to the sack. Call [`Sack::ingest_repo`]
    /// afterward to load its packages.
    pub fn attach_repo(&mut self, handle: RepoHandle, id: RepoId) {
        if self.repos.iter().any(|r| r.handle == handle) {
            return;
        }
        self.repos.push(AttachedRepo {
            handle,
            id,
            excludes: PackageSet::new(self.pool.id()),
            includes: PackageSet::new(self.pool.id()),
            use_includes: false,
        });
    }

    /// Returns the externally visible repo id for an internal handle, if the
    /// repo is attached.
    pub fn repo_id(&self, handle: RepoHandle) -> Option<&RepoId> {
        self.repos.iter().find(|r| r.handle == handle).map(|r| &r.id)
    }

    pub fn add_package(&mut self, package: Package) -> PackageId {
        let id = self.pool.add_package(package);
        self.considered_dirty = true;
        id
    }

    /// Adds every package parsed out of a repo's metadata (e.g.
    /// `pmcore_repo::parse_primary`'s output) to the pool, attributed to
    /// `handle`. `handle` must already be attached via [`Sack::attach_repo`].
    pub fn ingest_repo(&mut self, handle: RepoHandle, packages: Vec<Package>) -> Vec<PackageId> {
        packages
            .into_iter()
            .map(|pkg| {
                debug_assert_eq!(pkg.owning_repo(), handle, "ingested package must be owned by the repo it's ingested into");
                self.add_package(pkg)
            })
            .collect()
    }

    fn repo_mut(&mut self, handle: RepoHandle) -> Option<&mut AttachedRepo> {
        self.repos.iter_mut().find(|r| r.handle == handle)
    }

    pub fn set_repo_excludes(&mut self, handle: RepoHandle, excludes: PackageSet) {
        if let Some(repo) = self.repo_mut(handle) {
            repo.excludes = excludes;
            self.considered_dirty = true;
        }
    }

    pub fn set_repo_includes(&mut self, handle: RepoHandle, includes: PackageSet) {
        if let Some(repo) = self.repo_mut(handle) {
            repo.includes = includes;
            self.considered_dirty = true;
        }
    }

    pub fn set_use_includes(&mut self, handle: RepoHandle, use_includes: bool) {
        if let Some(repo) = self.repo_mut(handle) {
            repo.use_includes = use_includes;
            self.considered_dirty = true;
        }
    }

    pub fn set_global_excludes(&mut self, excludes: PackageSet) {
        self.global_excludes = excludes;
        self.considered_dirty = true;
    }

    /// Runs `make_provides_ready` on the pool and lazily recomputes the
    /// considered set. Every operation that consults dependencies or the
    /// considered set must call this first.
    pub fn make_provides_ready(&mut self) {
        self.pool.make_provides_ready();
        if !self.considered_dirty {
            return;
        }
        let mut all = PackageSet::new(self.pool.id());
        for (id, _) in self.pool.iter() {
            all.add(id);
        }
        all = all
            .difference(&self.global_excludes)
            .expect("global excludes share this sack's pool id");

        for repo in &self.repos {
            let mut repo_ids = PackageSet::new(self.pool.id());
            for &id in self.pool.by_repo(repo.handle) {
                repo_ids.add(id);
            }
            let repo_considered = if repo.use_includes {
                repo_ids
                    .intersection(&repo.includes)
                    .expect("repo includes share this sack's pool id")
            } else {
                repo_ids.clone()
            };
            let repo_considered = repo_considered
                .difference(&repo.excludes)
                .expect("repo excludes share this sack's pool id");
            // Replace this repo's full contribution (already present in
            // `all` minus global excludes) with its narrowed considered set.
            all = all.difference(&repo_ids).expect("same pool id");
            all = all.union(&repo_considered).expect("same pool id");
        }

        self.considered = all;
        self.considered_dirty = false;
    }

    /// Returns the considered bitmap. Callers should have already called
    /// [`Sack::make_provides_ready`]; an un-synced result still reflects the
    /// value as of the last call.
    pub fn considered(&self) -> &PackageSet {
        &self.considered
    }

    pub fn installonly_patterns(&self) -> &[String] {
        &self.installonly_patterns
    }

    pub fn set_installonly_patterns(&mut self, patterns: Vec<String>) {
        self.installonly_patterns = patterns;
    }

    pub fn installonly_limit(&self) -> u32 {
        self.installonly_limit
    }

    pub fn set_installonly_limit(&mut self, limit: u32) {
        self.installonly_limit = limit;
    }

    /// Returns `true` if `package` provides any of the installonly patterns.
    pub fn is_installonly(&self, package: &Package) -> bool {
        self.installonly_patterns.iter().any(|pattern| {
            glob_matches(pattern, package.nevra().name().as_str())
                || package
                    .provides()
                    .iter()
                    .any(|dep| glob_matches(pattern, dep.name().as_str()))
        })
    }

    pub fn running_kernel(&self) -> Option<PackageId> {
        self.running_kernel
    }

    /// Resolves the running kernel: the installed, installonly package whose
    /// release matches `release` (typically `uname -r`, supplied by the
    /// caller rather than read here). Leaves the cached id unset (`None`,
    /// the spec's "-1") if no installed package matches.
    pub fn resolve_running_kernel(&mut self, release: &str) {
        self.running_kernel = self
            .pool
            .iter()
            .find(|(_, pkg)| pkg.is_installed() && self.is_installonly(pkg) && pkg.nevra().evr().release() == release)
            .map(|(id, _)| id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Epoch, Evr, Name, Nevra, PackageBuilder, Reason};

    fn kernel(version: &str, release: &str, installed: bool) -> Package {
        let nevra = Nevra::new(Name::new("kernel").unwrap(), Evr::new(Epoch(0), version, release), Architecture::new("x86_64").unwrap());
        let mut builder = PackageBuilder::new(nevra, RepoHandle(0)).reason(Reason::User);
        if installed {
            builder = builder.install_time(Some(1));
        }
        builder.build()
    }

    #[test]
    fn considered_excludes_globally_excluded_packages() {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let id = sack.add_package(kernel("5.4", "1", false));
        let mut excl = PackageSet::new(PoolId(0));
        excl.add(id);
        sack.set_global_excludes(excl);
        sack.make_provides_ready();
        assert!(!sack.considered().contains(id));
    }

    #[test]
    fn use_includes_restricts_repo_contribution() {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let keep = sack.add_package(kernel("5.4", "1", false));
        let drop = sack.add_package(kernel("5.3", "1", false));
        let mut inc = PackageSet::new(PoolId(0));
        inc.add(keep);
        sack.set_repo_includes(RepoHandle(0), inc);
        sack.set_use_includes(RepoHandle(0), true);
        sack.make_provides_ready();
        assert!(sack.considered().contains(keep));
        assert!(!sack.considered().contains(drop));
    }

    #[test]
    fn ingest_repo_adds_every_package_under_the_given_handle() {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let ids = sack.ingest_repo(RepoHandle(0), vec![kernel("5.4", "1", false), kernel("5.5", "1", false)]);
        assert_eq!(ids.len(), 2);
        assert_eq!(sack.pool().by_repo(RepoHandle(0)).len(), 2);
    }

    #[test]
    fn is_installonly_matches_kernel_packages() {
        let sack = Sack::new(PoolId(0));
        assert!(sack.is_installonly(&kernel("5.4", "1", false)));
    }

    #[test]
    fn running_kernel_resolves_by_release_match() {
        let mut sack = Sack::new(PoolId(0));
        sack.add_package(kernel("5.1", "200", true));
        let running = sack.add_package(kernel("5.2", "201", true));
        sack.add_package(kernel("5.3", "202", true));
        sack.resolve_running_kernel("201");
        assert_eq!(sack.running_kernel(), Some(running));
    }

    #[test]
    fn unmatched_release_leaves_running_kernel_unset() {
        let mut sack = Sack::new(PoolId(0));
        sack.add_package(kernel("5.1", "200", true));
        sack.resolve_running_kernel("nonexistent");
        assert_eq!(sack.running_kernel(), None);
    }
}
