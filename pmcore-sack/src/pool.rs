//! The package pool: an append-only arena of [`Package`]s plus the indices
//! needed to answer "who provides X" without a linear scan.

use std::collections::HashMap;

use pmcore_types::{Name, Package, PackageId, PoolId, RepoHandle};

/// Owns every package known to a sack, across every attached repo.
pub struct Pool {
    id: PoolId,
    packages: Vec<Package>,
    by_name: HashMap<Name, Vec<PackageId>>,
    /// Maps a provided capability name to every package providing it
    /// (including the package's own name, an implicit self-provide).
    provides: HashMap<String, Vec<PackageId>>,
    by_repo: HashMap<RepoHandle, Vec<PackageId>>,
    dirty: bool,
}

impl Pool {
    pub fn new(id: PoolId) -> Self {
        Self {
            id,
            packages: Vec::new(),
            by_name: HashMap::new(),
            provides: HashMap::new(),
            by_repo: HashMap::new(),
            dirty: false,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Appends `package` and returns its freshly assigned id. The provides
    /// index is not updated until [`Pool::make_provides_ready`] runs.
    pub fn add_package(&mut self, package: Package) -> PackageId {
        let id = PackageId(self.packages.len() as u32);
        self.by_name.entry(package.nevra().name().clone()).or_default().push(id);
        self.by_repo.entry(package.owning_repo()).or_default().push(id);
        self.packages.push(package);
        self.dirty = true;
        id
    }

    pub fn get(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.index())
    }

    pub fn get_mut(&mut self, id: PackageId) -> Option<&mut Package> {
        self.packages.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages.iter().enumerate().map(|(i, p)| (PackageId(i as u32), p))
    }

    pub fn by_name(&self, name: &Name) -> &[PackageId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_repo(&self, repo: RepoHandle) -> &[PackageId] {
        self.by_repo.get(&repo).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Packages providing `capability`, including self-provides.
    pub fn providers_of(&self, capability: &str) -> &[PackageId] {
        self.provides.get(capability).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Marks the provides index stale; the next [`Pool::make_provides_ready`]
    /// call will rebuild it.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Idempotently rebuilds the whatprovides index. Every operation that
    /// consults dependencies must call this first.
    pub fn make_provides_ready(&mut self) {
        if !self.dirty {
            return;
        }
        self.provides.clear();
        for (id, package) in self.packages.iter().enumerate() {
            let id = PackageId(id as u32);
            self.provides.entry(package.nevra().name().as_str().to_string()).or_default().push(id);
            for provide in package.provides() {
                self.provides.entry(provide.name().as_str().to_string()).or_default().push(id);
            }
        }
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Epoch, Evr, Nevra, PackageBuilder, RepoHandle, Reldep};

    fn package(name: &str, provides: &[&str]) -> Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Epoch(0), "1.0", "1"), Architecture::new("x86_64").unwrap());
        let mut builder = PackageBuilder::new(nevra, RepoHandle(0));
        for p in provides {
            builder = builder.provides(vec![Reldep::unversioned(Name::new(*p).unwrap())]);
        }
        builder.build()
    }

    #[test]
    fn provides_index_includes_self_and_explicit_provides() {
        let mut pool = Pool::new(PoolId(0));
        pool.add_package(package("glibc", &["libc.so.6"]));
        pool.make_provides_ready();
        assert_eq!(pool.providers_of("glibc").len(), 1);
        assert_eq!(pool.providers_of("libc.so.6").len(), 1);
    }

    #[test]
    fn dirty_flag_skips_redundant_rebuilds() {
        let mut pool = Pool::new(PoolId(0));
        pool.add_package(package("a", &[]));
        pool.make_provides_ready();
        assert!(!pool.dirty);
        pool.add_package(package("b", &[]));
        assert!(pool.dirty);
    }
}
