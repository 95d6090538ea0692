//! Narrow traits decoupling the solver and query layers from the concrete
//! [`pmcore_types::Package`] struct, mirroring the teacher's split between
//! `Named`/`Versioned`/`RuntimeRelations`/`Installed`.

use pmcore_types::{Evr, Name, Package, PackageAction, PackageId, Reason, Reldep};

/// An interface for retrieving the name of a package-like record.
pub trait Named {
    fn get_name(&self) -> &Name;
}

/// An interface for retrieving the EVR of a package-like record.
pub trait Versioned {
    fn get_evr(&self) -> &Evr;
}

/// An interface for retrieving dependency relations.
pub trait RuntimeRelations {
    fn get_requires(&self) -> &[Reldep];
    fn get_requires_pre(&self) -> &[Reldep];
    fn get_conflicts(&self) -> &[Reldep];
    fn get_obsoletes(&self) -> &[Reldep];
    fn get_provides(&self) -> &[Reldep];
    fn get_recommends(&self) -> &[Reldep];
    fn get_suggests(&self) -> &[Reldep];
    fn get_enhances(&self) -> &[Reldep];
    fn get_supplements(&self) -> &[Reldep];
}

/// An interface for packages that currently exist on the system.
pub trait Installed {
    fn install_reason(&self) -> Reason;
}

/// Generic package-metadata interface: name, version, and all dependency
/// relations. Anything implementing the three narrower traits gets this for
/// free, exactly as `alpm_common::GenericPackageMetadata` is blanket-derived.
pub trait GenericPackageMetadata: Named + Versioned + RuntimeRelations {}
impl<T> GenericPackageMetadata for T where T: Named + Versioned + RuntimeRelations {}

/// Generic interface for metadata of packages installed on the system.
pub trait GenericInstalledPackageMetadata: GenericPackageMetadata + Installed {}
impl<T> GenericInstalledPackageMetadata for T where T: GenericPackageMetadata + Installed {}

impl Named for Package {
    fn get_name(&self) -> &Name {
        self.nevra().name()
    }
}

impl Versioned for Package {
    fn get_evr(&self) -> &Evr {
        self.nevra().evr()
    }
}

impl RuntimeRelations for Package {
    fn get_requires(&self) -> &[Reldep] {
        self.requires()
    }

    fn get_requires_pre(&self) -> &[Reldep] {
        self.requires_pre()
    }

    fn get_conflicts(&self) -> &[Reldep] {
        self.conflicts()
    }

    fn get_obsoletes(&self) -> &[Reldep] {
        self.obsoletes()
    }

    fn get_provides(&self) -> &[Reldep] {
        self.provides()
    }

    fn get_recommends(&self) -> &[Reldep] {
        self.recommends()
    }

    fn get_suggests(&self) -> &[Reldep] {
        self.suggests()
    }

    fn get_enhances(&self) -> &[Reldep] {
        self.enhances()
    }

    fn get_supplements(&self) -> &[Reldep] {
        self.supplements()
    }
}

impl Installed for Package {
    fn install_reason(&self) -> Reason {
        self.reason()
    }
}

/// A single step a [`crate::Progress`] sink can be notified of.
///
/// Grounded on the design note replacing C-style progress callbacks with a
/// typed event enum consumed synchronously by an implementer-supplied sink.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    MetadataStart { repo: String },
    MetadataDone { repo: String },
    DownloadStart { total_bytes: u64 },
    /// Aggregated download progress across the whole plan, emitted after
    /// each item's transfer completes.
    DownloadProgress { total_bytes: u64, downloaded_bytes: u64, current_item_id: PackageId },
    Downloaded { item: String, bytes: u64 },
    PackageBegin { nevra: String, action: PackageAction },
    ScriptOutput { bytes: Vec<u8> },
    TransactionEnd { ok: bool },
}

/// Sink for [`ProgressEvent`]s emitted by the fetcher and rpm transaction
/// drivers. Implementations run synchronously on the driver's own thread.
pub trait Progress {
    fn on_event(&self, event: ProgressEvent);
}

/// A [`Progress`] sink that discards every event; the default when a caller
/// does not care about progress reporting.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Name as PmName, Nevra, PackageBuilder, RepoHandle};

    #[test]
    fn package_implements_generic_metadata() {
        let pkg = PackageBuilder::new(
            Nevra::new(
                PmName::new("flying").unwrap(),
                Evr::parse("3-0").unwrap(),
                Architecture::new("noarch").unwrap(),
            ),
            RepoHandle(0),
        )
        .build();
        fn assert_generic<T: GenericPackageMetadata>(_: &T) {}
        assert_generic(&pkg);
    }
}
