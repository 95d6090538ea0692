//! The repo object and its refresh/download lifecycle. Parsing a fetched
//! repo's packages into the pool is [`crate::parse_primary`]'s job; this
//! module only gets the verified bytes onto disk and back off it.

use std::path::PathBuf;

use pmcore_config::{ConfigSchema, RepoConfig};
use pmcore_types::{Checksum, RepoId};

use crate::{
    fetch::{fetch_to_file, Mirror},
    repomd::parse_repomd,
    vars::VarMap,
    Error,
};

/// How a repo sources its packages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepoKind {
    Remote,
    Local,
    Media,
}

/// How much of a repo's content this process will use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Enabled {
    None,
    MetadataOnly,
    PackagesAndMetadata,
}

/// The declared metadata files a `repomd.xml` may point at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum MetadataKind {
    Primary,
    Filelists,
    Updateinfo,
    Group,
    Other,
    Appstream,
    Modules,
}

/// One entry parsed out of `repomd.xml`: where a metadata file lives and
/// what it should hash to.
#[derive(Clone, Debug)]
pub struct RepomdEntry {
    pub kind: MetadataKind,
    pub location: String,
    pub checksum: Checksum,
}

/// Flags accepted by [`Repo::update`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateFlags {
    pub force: bool,
    pub import_pubkey: bool,
    pub simulate: bool,
}

/// A single repo: identity, configuration, and the on-disk cache directory
/// the refresh protocol reads from and writes to.
pub struct Repo {
    id: RepoId,
    kind: RepoKind,
    config: RepoConfig,
    cache_root: PathBuf,
    enabled: Enabled,
    required: bool,
    client: reqwest::Client,
    /// Overrides mirror resolution; used by tests to avoid real network
    /// access without touching the production `mirrors()` code path.
    override_mirrors: Option<Vec<Mirror>>,
}

impl Repo {
    pub fn new(id: RepoId, kind: RepoKind, config: RepoConfig, cache_root: PathBuf) -> Self {
        let required = !config.get("skip_if_unavailable").and_then(|c| c.get_bool()).unwrap_or(false);
        Self {
            id,
            kind,
            config,
            cache_root,
            enabled: Enabled::PackagesAndMetadata,
            required,
            client: reqwest::Client::new(),
            override_mirrors: None,
        }
    }

    #[cfg(test)]
    fn set_mirrors_for_test(&mut self, mirrors: Vec<Mirror>) {
        self.override_mirrors = Some(mirrors);
    }

    pub fn id(&self) -> &RepoId {
        &self.id
    }

    pub fn kind(&self) -> RepoKind {
        self.kind
    }

    pub fn enabled(&self) -> Enabled {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: Enabled) {
        self.enabled = enabled;
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// If `false`, a refresh failure is demoted to a warning instead of
    /// propagating (per spec §4.2's skip-if-unavailable semantics).
    pub fn required(&self) -> bool {
        self.required
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache_root.join(self.id.as_str())
    }

    fn tmp_dir(&self) -> PathBuf {
        let mut dir = self.cache_dir().into_os_string();
        dir.push(".tmp");
        dir.into()
    }

    /// Resolves `$releasever`/`$basearch`/... in the configured mirror
    /// triple and ensures the cache directory exists.
    pub fn setup(&mut self, vars: &VarMap) -> Result<(), Error> {
        if let Some(urls) = self.config.get("baseurl").and_then(|c| c.get_string_list()) {
            if !urls.is_empty() {
                let expanded: Vec<String> = urls.iter().map(|u| vars.expand(u)).collect();
                for (raw, resolved) in urls.iter().zip(expanded.iter()) {
                    if raw != resolved {
                        log::debug!("repo `{}`: baseurl `{raw}` resolved to `{resolved}`", self.id);
                    }
                }
            }
        }
        std::fs::create_dir_all(self.cache_dir()).map_err(|source| Error::CannotWriteCache {
            repo_id: self.id.to_string(),
            source,
        })
    }

    fn mirrors(&self, vars: &VarMap) -> Vec<Mirror> {
        if let Some(mirrors) = &self.override_mirrors {
            return mirrors.clone();
        }
        match self.kind {
            RepoKind::Remote => self
                .config
                .get("baseurl")
                .and_then(|c| c.get_string_list())
                .unwrap_or_default()
                .iter()
                .map(|u| Mirror::Http(vars.expand(u)))
                .collect(),
            RepoKind::Local | RepoKind::Media => {
                let path = self
                    .config
                    .get("baseurl")
                    .and_then(|c| c.get_string())
                    .unwrap_or_default();
                vec![Mirror::File(PathBuf::from(vars.expand(&path)))]
            }
        }
    }

    /// Attempts to load metadata from the on-disk cache without touching
    /// the network, honoring `max_cache_age` against the effective
    /// `metadata_expire` (per §9, the smaller of the two governs).
    pub fn check(&self, max_cache_age: u64) -> Result<bool, Error> {
        let repomd = self.cache_dir().join("repodata").join("repomd.xml");
        let metadata = match std::fs::metadata(&repomd) {
            Ok(metadata) => metadata,
            Err(_) => return Ok(false),
        };
        let mtime = metadata
            .modified()
            .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;
        let age = mtime.elapsed().unwrap_or_default().as_secs();
        let metadata_expire = self
            .config
            .get("metadata_expire")
            .and_then(|c| c.get_seconds())
            .unwrap_or(u64::MAX);
        let threshold = metadata_expire.min(max_cache_age);
        Ok(age <= threshold)
    }

    /// Runs the refresh protocol: fetch into a sibling temp directory,
    /// verify, and atomically swap it into place. Returns `Ok(true)` if a
    /// swap happened, `Ok(false)` if the cache was already fresh or the new
    /// metadata was not newer than what is cached.
    pub async fn update(&mut self, flags: UpdateFlags, vars: &VarMap) -> Result<bool, Error> {
        if matches!(self.kind, RepoKind::Local | RepoKind::Media) {
            // Local/media repos read straight off the filesystem; there is
            // no remote cache to refresh.
            return Ok(false);
        }

        if !flags.force {
            let max_cache_age = self
                .config
                .get("metadata_expire")
                .and_then(|c| c.get_seconds())
                .unwrap_or(u64::MAX);
            if self.check(max_cache_age)? {
                return Ok(false);
            }
        }

        let mirrors = self.mirrors(vars);
        let tmp = self.tmp_dir();
        let tmp_repodata = tmp.join("repodata");
        std::fs::create_dir_all(&tmp_repodata)
            .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;

        let repomd = fetch_to_file(&self.client, &mirrors, "repodata/repomd.xml")
            .await
            .map_err(|detail| Error::NotAvailable { repo_id: self.id.to_string(), detail })?;

        if let Some(context) = &repomd.last_error {
            log::warn!("repo `{}`: recovered after mirror failure: {context}", self.id);
        }

        std::fs::write(tmp_repodata.join("repomd.xml"), &repomd.bytes)
            .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;

        let xml = String::from_utf8_lossy(&repomd.bytes);
        let parsed = parse_repomd(self.id.as_str(), &xml)?;

        for entry in &parsed.entries {
            let fetched = fetch_to_file(&self.client, &mirrors, &entry.location)
                .await
                .map_err(|detail| Error::NotAvailable { repo_id: self.id.to_string(), detail })?;
            let dest = tmp.join(&entry.location);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;
            }
            std::fs::write(&dest, &fetched.bytes)
                .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;
            if !checksum_matches(&dest, &entry.checksum) {
                return Err(Error::ChecksumMismatch {
                    repo_id: self.id.to_string(),
                    file: entry.location.clone(),
                });
            }
        }

        let previous_revision = self.cached_revision();
        if !flags.force {
            if let Some(previous) = previous_revision {
                if parsed.revision <= previous {
                    let _ = std::fs::remove_dir_all(&tmp);
                    return Ok(false);
                }
            }
        }

        if flags.simulate {
            let _ = std::fs::remove_dir_all(&tmp);
            return Ok(false);
        }

        self.commit(tmp)?;
        Ok(true)
    }

    /// Reads back the `<revision>` stamped in the currently cached
    /// `repomd.xml`, if any.
    fn cached_revision(&self) -> Option<u64> {
        let path = self.cache_dir().join("repodata").join("repomd.xml");
        let xml = std::fs::read_to_string(path).ok()?;
        parse_repomd(self.id.as_str(), &xml).ok().map(|r| r.revision)
    }

    /// Step 7 of the refresh protocol: the atomic directory swap. Any
    /// failure here leaves the prior cache intact.
    fn commit(&self, tmp: PathBuf) -> Result<(), Error> {
        let cache_dir = self.cache_dir();
        let old_packages = cache_dir.join("packages");
        if old_packages.is_dir() {
            let _ = std::fs::rename(&old_packages, tmp.join("packages"));
        }
        if cache_dir.is_dir() {
            std::fs::remove_dir_all(&cache_dir)
                .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;
        }
        std::fs::rename(&tmp, &cache_dir).map_err(|source| Error::CannotWriteCache {
            repo_id: self.id.to_string(),
            source,
        })
    }

    /// Resolves the on-disk path of a cached metadata file by kind, reading
    /// back `repomd.xml` to find its location. Returns `None` if nothing is
    /// cached yet.
    pub fn cached_metadata_path(&self, kind: MetadataKind) -> Result<Option<PathBuf>, Error> {
        let repomd_path = self.cache_dir().join("repodata").join("repomd.xml");
        let xml = match std::fs::read_to_string(&repomd_path) {
            Ok(xml) => xml,
            Err(_) => return Ok(None),
        };
        let parsed = parse_repomd(self.id.as_str(), &xml)?;
        Ok(parsed.entries.iter().find(|e| e.kind == kind).map(|e| self.cache_dir().join(&e.location)))
    }

    /// Removes this repo's entire on-disk cache.
    pub fn clean(&self) -> Result<(), Error> {
        let dir = self.cache_dir();
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)
                .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;
        }
        Ok(())
    }

    /// Downloads a package's file into this repo's package cache, verifying
    /// it against `checksum`. Already-complete files are not re-fetched.
    pub async fn download_package(&self, location: &str, checksum: &Checksum, vars: &VarMap) -> Result<PathBuf, Error> {
        if matches!(self.kind, RepoKind::Local | RepoKind::Media) {
            return Err(Error::Internal {
                repo_id: self.id.to_string(),
                detail: "cannot download packages from a local-kind repo".to_string(),
            });
        }

        let dest = self.cache_dir().join("packages").join(
            location.rsplit('/').next().unwrap_or(location),
        );
        if dest.is_file() && checksum_matches(&dest, checksum) {
            return Ok(dest);
        }

        std::fs::create_dir_all(dest.parent().unwrap())
            .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;

        let mirrors = self.mirrors(vars);
        let outcome = fetch_to_file(&self.client, &mirrors, location)
            .await
            .map_err(|detail| Error::NotAvailable { repo_id: self.id.to_string(), detail })?;

        std::fs::write(&dest, &outcome.bytes)
            .map_err(|source| Error::CannotWriteCache { repo_id: self.id.to_string(), source })?;

        if !checksum_matches(&dest, checksum) {
            return Err(Error::ChecksumMismatch {
                repo_id: self.id.to_string(),
                file: location.to_string(),
            });
        }
        Ok(dest)
    }
}

fn checksum_matches(path: &PathBuf, expected: &Checksum) -> bool {
    use sha2::Digest;
    let Ok(bytes) = std::fs::read(path) else { return false };
    let digest = match expected.kind() {
        pmcore_types::ChecksumKind::Sha256 => sha2::Sha256::digest(&bytes).to_vec(),
        pmcore_types::ChecksumKind::Sha512 => sha2::Sha512::digest(&bytes).to_vec(),
        pmcore_types::ChecksumKind::Sha1 => {
            use sha1::Sha1;
            Sha1::digest(&bytes).to_vec()
        }
    };
    digest.as_slice() == expected.digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_config::ConfigSchema;
    use sha2::Digest;
    use tempfile::tempdir;

    fn write_repomd(dir: &std::path::Path, revision: u64, primary: &[u8]) {
        std::fs::create_dir_all(dir.join("repodata")).unwrap();
        std::fs::write(dir.join("repodata").join("primary.xml"), primary).unwrap();
        let digest = sha2::Sha256::digest(primary);
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        let xml = format!(
            "<repomd><revision>{revision}</revision><data type=\"primary\"><checksum type=\"sha256\">{hex}</checksum><location href=\"repodata/primary.xml\"/></data></repomd>"
        );
        std::fs::write(dir.join("repodata").join("repomd.xml"), xml).unwrap();
    }

    #[tokio::test]
    async fn update_swaps_cache_on_newer_revision() {
        let mirror = tempdir().unwrap();
        write_repomd(mirror.path(), 100, b"primary-v1");

        let cache_root = tempdir().unwrap();
        let mut config = RepoConfig::new();
        config.cell("baseurl").unwrap().set(pmcore_config::Priority::RepoConfig, "unused").unwrap();
        let mut repo = Repo::new(RepoId::new("updates").unwrap(), RepoKind::Remote, config, cache_root.path().to_path_buf());

        repo.set_mirrors_for_test(vec![Mirror::File(mirror.path().to_path_buf())]);

        let vars = VarMap::new();
        repo.setup(&vars).unwrap();
        let updated = repo.update(UpdateFlags::default(), &vars).await.unwrap();
        assert!(updated);
        assert!(cache_root.path().join("updates").join("repodata").join("primary.xml").is_file());

        // A second update with the same revision is a no-op.
        let updated_again = repo.update(UpdateFlags::default(), &vars).await.unwrap();
        assert!(!updated_again);

        let primary_path = repo.cached_metadata_path(MetadataKind::Primary).unwrap().unwrap();
        assert_eq!(primary_path, cache_root.path().join("updates").join("repodata").join("primary.xml"));
    }

    #[test]
    fn cached_metadata_path_is_none_before_any_update() {
        let cache_root = tempdir().unwrap();
        let config = RepoConfig::new();
        let repo = Repo::new(RepoId::new("updates").unwrap(), RepoKind::Remote, config, cache_root.path().to_path_buf());
        assert!(repo.cached_metadata_path(MetadataKind::Primary).unwrap().is_none());
    }
}
