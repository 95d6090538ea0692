//! Read-only package attributes, as recorded after ingestion.

use crate::{Checksum, Nevra, Reason, Reldep, RepoHandle};

/// The full attribute set of one known package, as described in §3 of the
/// data model: everything is read-only once a [`Package`] has been built by
/// the repo ingestion path.
#[derive(Clone, Debug)]
pub struct Package {
    nevra: Nevra,
    /// Name of the source rpm this binary package was built from; empty for
    /// installed-only or source-less packages.
    source_rpm: String,
    summary: String,
    description: String,
    license: String,
    url: String,
    vendor: String,
    packager: String,
    build_host: String,
    build_time: u64,
    /// Installation timestamp; only set for packages from the local system.
    install_time: Option<u64>,
    group: String,
    checksum: Option<Checksum>,
    header_checksum: Option<Checksum>,
    download_size: u64,
    install_size: u64,
    /// Path to the package artifact, relative to the owning repo's base url.
    location: String,
    base_url: Option<String>,
    owning_repo: RepoHandle,
    files: Vec<String>,
    reason: Reason,

    requires: Vec<Reldep>,
    requires_pre: Vec<Reldep>,
    conflicts: Vec<Reldep>,
    obsoletes: Vec<Reldep>,
    provides: Vec<Reldep>,
    recommends: Vec<Reldep>,
    suggests: Vec<Reldep>,
    enhances: Vec<Reldep>,
    supplements: Vec<Reldep>,
    prereq_ignoreinst: Vec<Reldep>,
}

/// Fields required to build a [`Package`]; kept separate from the struct
/// itself so ingestion code (`pmcore-repo`) can assemble one field at a time
/// from streamed metadata without a dozen-argument constructor.
#[derive(Clone, Debug, Default)]
pub struct PackageBuilder {
    nevra: Option<Nevra>,
    source_rpm: String,
    summary: String,
    description: String,
    license: String,
    url: String,
    vendor: String,
    packager: String,
    build_host: String,
    build_time: u64,
    install_time: Option<u64>,
    group: String,
    checksum: Option<Checksum>,
    header_checksum: Option<Checksum>,
    download_size: u64,
    install_size: u64,
    location: String,
    base_url: Option<String>,
    owning_repo: Option<RepoHandle>,
    files: Vec<String>,
    reason: Reason,
    requires: Vec<Reldep>,
    requires_pre: Vec<Reldep>,
    conflicts: Vec<Reldep>,
    obsoletes: Vec<Reldep>,
    provides: Vec<Reldep>,
    recommends: Vec<Reldep>,
    suggests: Vec<Reldep>,
    enhances: Vec<Reldep>,
    supplements: Vec<Reldep>,
    prereq_ignoreinst: Vec<Reldep>,
}

macro_rules! setter {
    ($field:ident, $ty:ty) => {
        pub fn $field(mut self, value: $ty) -> Self {
            self.$field = value;
            self
        }
    };
}

impl PackageBuilder {
    /// Creates a builder seeded with the package's identity and owning repo.
    pub fn new(nevra: Nevra, owning_repo: RepoHandle) -> Self {
        Self {
            nevra: Some(nevra),
            owning_repo: Some(owning_repo),
            reason: Reason::Unknown,
            ..Default::default()
        }
    }

    setter!(source_rpm, String);
    setter!(summary, String);
    setter!(description, String);
    setter!(license, String);
    setter!(url, String);
    setter!(vendor, String);
    setter!(packager, String);
    setter!(build_host, String);
    setter!(build_time, u64);
    setter!(install_time, Option<u64>);
    setter!(group, String);
    setter!(checksum, Option<Checksum>);
    setter!(header_checksum, Option<Checksum>);
    setter!(download_size, u64);
    setter!(install_size, u64);
    setter!(location, String);
    setter!(base_url, Option<String>);
    setter!(files, Vec<String>);
    setter!(reason, Reason);
    setter!(requires, Vec<Reldep>);
    setter!(conflicts, Vec<Reldep>);
    setter!(obsoletes, Vec<Reldep>);
    setter!(provides, Vec<Reldep>);
    setter!(recommends, Vec<Reldep>);
    setter!(suggests, Vec<Reldep>);
    setter!(enhances, Vec<Reldep>);
    setter!(supplements, Vec<Reldep>);
    setter!(prereq_ignoreinst, Vec<Reldep>);

    /// Sets the subset of `requires` that must be satisfied before the
    /// package's pre-install scriptlet runs.
    ///
    /// Every entry must also be present in `requires`; entries that are not
    /// are silently ignored when [`Package::regular_requires`] is derived,
    /// matching the spec's `requires_pre ⊆ requires` invariant.
    pub fn requires_pre(mut self, value: Vec<Reldep>) -> Self {
        self.requires_pre = value;
        self
    }

    /// Finalizes the builder into an immutable [`Package`].
    ///
    /// # Panics
    ///
    /// Panics if [`Nevra`] was never supplied; this is a programmer error in
    /// ingestion code, not a data-quality issue worth a recoverable error.
    pub fn build(self) -> Package {
        let requires_pre: Vec<Reldep> = self
            .requires_pre
            .into_iter()
            .filter(|dep| self.requires.contains(dep))
            .collect();
        Package {
            nevra: self.nevra.expect("PackageBuilder::new always sets nevra"),
            source_rpm: self.source_rpm,
            summary: self.summary,
            description: self.description,
            license: self.license,
            url: self.url,
            vendor: self.vendor,
            packager: self.packager,
            build_host: self.build_host,
            build_time: self.build_time,
            install_time: self.install_time,
            group: self.group,
            checksum: self.checksum,
            header_checksum: self.header_checksum,
            download_size: self.download_size,
            install_size: self.install_size,
            location: self.location,
            base_url: self.base_url,
            owning_repo: self.owning_repo.expect("PackageBuilder::new always sets owning_repo"),
            files: self.files,
            reason: self.reason,
            requires: self.requires,
            requires_pre,
            conflicts: self.conflicts,
            obsoletes: self.obsoletes,
            provides: self.provides,
            recommends: self.recommends,
            suggests: self.suggests,
            enhances: self.enhances,
            supplements: self.supplements,
            prereq_ignoreinst: self.prereq_ignoreinst,
        }
    }
}

impl Package {
    /// Returns the canonical package identity.
    pub fn nevra(&self) -> &Nevra {
        &self.nevra
    }

    /// Returns the source rpm name, or an empty string if none.
    pub fn source_rpm(&self) -> &str {
        &self.source_rpm
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn packager(&self) -> &str {
        &self.packager
    }

    pub fn build_host(&self) -> &str {
        &self.build_host
    }

    pub fn build_time(&self) -> u64 {
        self.build_time
    }

    /// Returns the install timestamp, if this package represents an
    /// installed (rather than merely available) package.
    pub fn install_time(&self) -> Option<u64> {
        self.install_time
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    pub fn header_checksum(&self) -> Option<&Checksum> {
        self.header_checksum.as_ref()
    }

    pub fn download_size(&self) -> u64 {
        self.download_size
    }

    pub fn install_size(&self) -> u64 {
        self.install_size
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn owning_repo(&self) -> RepoHandle {
        self.owning_repo
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn requires(&self) -> &[Reldep] {
        &self.requires
    }

    pub fn requires_pre(&self) -> &[Reldep] {
        &self.requires_pre
    }

    /// Returns `requires - requires_pre`.
    pub fn regular_requires(&self) -> Vec<&Reldep> {
        self.requires
            .iter()
            .filter(|dep| !self.requires_pre.contains(dep))
            .collect()
    }

    pub fn conflicts(&self) -> &[Reldep] {
        &self.conflicts
    }

    pub fn obsoletes(&self) -> &[Reldep] {
        &self.obsoletes
    }

    pub fn provides(&self) -> &[Reldep] {
        &self.provides
    }

    pub fn recommends(&self) -> &[Reldep] {
        &self.recommends
    }

    pub fn suggests(&self) -> &[Reldep] {
        &self.suggests
    }

    pub fn enhances(&self) -> &[Reldep] {
        &self.enhances
    }

    pub fn supplements(&self) -> &[Reldep] {
        &self.supplements
    }

    pub fn prereq_ignoreinst(&self) -> &[Reldep] {
        &self.prereq_ignoreinst
    }

    /// Returns `true` if this package record represents an installed
    /// package (i.e. originates from the local system, not a repo).
    pub fn is_installed(&self) -> bool {
        self.install_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Architecture, Evr, Name};

    fn nevra() -> Nevra {
        Nevra::new(
            Name::new("flying").unwrap(),
            Evr::parse("3-0").unwrap(),
            Architecture::new("noarch").unwrap(),
        )
    }

    #[test]
    fn requires_pre_is_subset_of_requires() {
        let a = Reldep::parse("A").unwrap();
        let b = Reldep::parse("B").unwrap();
        let pkg = PackageBuilder::new(nevra(), RepoHandle(0))
            .requires(vec![a.clone()])
            .requires_pre(vec![a.clone(), b])
            .build();
        assert_eq!(pkg.requires_pre(), &[a]);
    }

    #[test]
    fn regular_requires_excludes_pre() {
        let a = Reldep::parse("A").unwrap();
        let b = Reldep::parse("B").unwrap();
        let pkg = PackageBuilder::new(nevra(), RepoHandle(0))
            .requires(vec![a.clone(), b.clone()])
            .requires_pre(vec![a])
            .build();
        assert_eq!(pkg.regular_requires(), vec![&b]);
    }
}
