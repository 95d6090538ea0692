//! Traits shared across the package-sack, query, selector, and solver
//! crates, so that those layers can be generic over "anything that looks
//! like package metadata" instead of depending directly on
//! [`pmcore_types::Package`].

mod traits;

pub use traits::{
    GenericInstalledPackageMetadata,
    GenericPackageMetadata,
    Installed,
    Named,
    NullProgress,
    Progress,
    ProgressEvent,
    RuntimeRelations,
    Versioned,
};
