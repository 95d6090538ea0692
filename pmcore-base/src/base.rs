//! The facade: owns configuration, the attached repos, the package sack,
//! and the history store, and wires them together for a caller that just
//! wants "load config, discover repos, resolve a goal, run it".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pmcore_config::{ConfigSchema, MainConfig, Priority, RepoConfig};
use pmcore_history::HistoryStore;
use pmcore_repo::{MetadataKind, Repo, RepoKind, UpdateFlags, VarMap};
use pmcore_sack::Sack;
use pmcore_types::{PoolId, RepoHandle, RepoId};

use crate::Error;

/// Owns the process-wide configuration, repo set, package sack, and history
/// store; the top-level object a caller constructs once per run.
pub struct Base {
    main: MainConfig,
    repos: HashMap<RepoId, Repo>,
    repo_handles: HashMap<RepoId, RepoHandle>,
    sack: Sack,
    vars: VarMap,
    history: Option<HistoryStore>,
    next_repo_handle: u32,
}

impl Base {
    pub fn new() -> Self {
        Self {
            main: MainConfig::new(),
            repos: HashMap::new(),
            repo_handles: HashMap::new(),
            sack: Sack::new(PoolId(0)),
            vars: VarMap::from_host(),
            history: None,
            next_repo_handle: 0,
        }
    }

    pub fn main_config(&self) -> &MainConfig {
        &self.main
    }

    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarMap {
        &mut self.vars
    }

    pub fn sack(&self) -> &Sack {
        &self.sack
    }

    pub fn sack_mut(&mut self) -> &mut Sack {
        &mut self.sack
    }

    pub fn repos(&self) -> &HashMap<RepoId, Repo> {
        &self.repos
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    /// Loads `path` as the main config file, at [`Priority::MainConfig`].
    pub fn load_config_from_file(&mut self, path: &Path) -> Result<(), Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.display().to_string(), source })?;
        let doc = pmcore_config::parse_ini(&path.display().to_string(), &text)?;
        if let Some(entries) = doc.section("main") {
            self.main.load_entries(entries, Priority::MainConfig)?;
        }
        Ok(())
    }

    /// Loads every `*.conf` file in `dir` as a main-config drop-in, at
    /// [`Priority::DropinConfig`], in directory order.
    pub fn load_config_from_dir(&mut self, dir: &Path) -> Result<(), Error> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|source| Error::Io { path: dir.display().to_string(), source })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("conf"))
            .collect();
        paths.sort();

        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| Error::Io { path: path.display().to_string(), source })?;
            let doc = pmcore_config::parse_ini(&path.display().to_string(), &text)?;
            if let Some(entries) = doc.section("main") {
                self.main.load_entries(entries, Priority::DropinConfig)?;
            }
        }
        Ok(())
    }

    /// Walks every non-`[main]` section of `main_conf` plus every `*.conf`
    /// file under the configured `reposdir`, creating one [`Repo`] per
    /// section at [`Priority::RepoConfig`].
    pub fn create_repos_from_system_configuration(&mut self, main_conf: &Path) -> Result<(), Error> {
        let text = std::fs::read_to_string(main_conf).map_err(|source| Error::Io { path: main_conf.display().to_string(), source })?;
        let doc = pmcore_config::parse_ini(&main_conf.display().to_string(), &text)?;
        for (name, entries) in &doc.sections {
            if name == "main" {
                continue;
            }
            self.add_repo_section(name, entries)?;
        }

        let reposdir = self.main.cell("reposdir").and_then(|c| c.get_string()).unwrap_or_else(|| "/etc/pmcore/repos.d".to_string());
        let mut paths: Vec<PathBuf> = match std::fs::read_dir(&reposdir) {
            Ok(iter) => iter
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("conf"))
                .collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();

        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| Error::Io { path: path.display().to_string(), source })?;
            let doc = pmcore_config::parse_ini(&path.display().to_string(), &text)?;
            for (name, entries) in &doc.sections {
                self.add_repo_section(name, entries)?;
            }
        }
        Ok(())
    }

    fn add_repo_section(&mut self, name: &str, entries: &[pmcore_config::IniEntry]) -> Result<(), Error> {
        let mut config = RepoConfig::new();
        config.load_entries(entries, Priority::RepoConfig)?;

        let kind = config
            .get("baseurl")
            .and_then(|c| c.get_string_list())
            .and_then(|urls| urls.first().cloned())
            .filter(|url| url.starts_with("file://"))
            .map(|_| RepoKind::Local)
            .unwrap_or(RepoKind::Remote);

        let repo_id = RepoId::new(name).map_err(|e| Error::InvalidRepoId(name.to_string(), e))?;
        let cache_root = self.main.cell("cachedir").and_then(|c| c.get_string()).unwrap_or_else(|| "/var/cache/pmcore".to_string());
        let mut repo = Repo::new(repo_id.clone(), kind, config, PathBuf::from(cache_root));
        repo.setup(&self.vars)?;

        let handle = RepoHandle(self.next_repo_handle);
        self.next_repo_handle += 1;
        self.sack.attach_repo(handle, repo_id.clone());
        self.repo_handles.insert(repo_id.clone(), handle);
        self.repos.insert(repo_id, repo);
        Ok(())
    }

    /// Opens (or creates) the transaction history database at `path`.
    pub fn open_history(&mut self, path: &Path) -> Result<(), Error> {
        self.history = Some(HistoryStore::open(path)?);
        Ok(())
    }

    /// Refreshes `repo_id`'s metadata cache and, if the refresh actually
    /// fetched new `primary.xml` (or it's the first refresh), parses it and
    /// feeds the packages into the sack. Returns `true` if metadata changed.
    pub async fn refresh_repo(&mut self, repo_id: &RepoId, flags: UpdateFlags) -> Result<bool, Error> {
        let handle = *self.repo_handles.get(repo_id).ok_or_else(|| Error::UnknownRepo(repo_id.as_str().to_string()))?;
        let repo = self.repos.get_mut(repo_id).ok_or_else(|| Error::UnknownRepo(repo_id.as_str().to_string()))?;
        let changed = repo.update(flags, &self.vars).await?;

        let already_loaded = !self.sack.pool().by_repo(handle).is_empty();
        if changed || !already_loaded {
            self.load_repo_packages(repo_id, handle)?;
        }
        Ok(changed)
    }

    /// Parses `repo_id`'s cached `primary.xml`, if any, and adds its
    /// packages to the sack under `handle`. Returns how many were added.
    fn load_repo_packages(&mut self, repo_id: &RepoId, handle: RepoHandle) -> Result<usize, Error> {
        let repo = self.repos.get(repo_id).ok_or_else(|| Error::UnknownRepo(repo_id.as_str().to_string()))?;
        let Some(path) = repo.cached_metadata_path(MetadataKind::Primary)? else {
            return Ok(0);
        };
        let xml = std::fs::read_to_string(&path).map_err(|source| Error::Io { path: path.display().to_string(), source })?;
        let packages = pmcore_repo::parse_primary(repo_id.as_str(), handle, &xml)?;
        let count = packages.len();
        self.sack.ingest_repo(handle, packages);
        Ok(count)
    }

    /// Applies the main config's `installonly_limit`/`installonly_patterns`
    /// to the sack, then finalizes its provides index.
    pub fn fill(&mut self) {
        if let Some(limit) = self.main.cell("installonly_limit").and_then(|c| c.get_int()) {
            self.sack.set_installonly_limit(limit.max(0) as u32);
        }
        if let Some(patterns) = self.main.cell("installonly_patterns").and_then(|c| c.get_string_list()) {
            self.sack.set_installonly_patterns(patterns);
        }
        self.sack.make_provides_ready();
    }
}

impl Default for Base {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_config_from_file_applies_main_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmcore.conf");
        std::fs::write(&path, "[main]\ncachedir=/srv/cache\ngpgcheck=0\n").unwrap();

        let mut base = Base::new();
        base.load_config_from_file(&path).unwrap();
        assert_eq!(base.main_config().get("cachedir").unwrap().get_string().as_deref(), Some("/srv/cache"));
        assert_eq!(base.main_config().get("gpgcheck").unwrap().get_bool(), Some(false));
    }

    #[test]
    fn dropin_config_overrides_main_config_priority() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = dir.path().join("pmcore.conf");
        std::fs::write(&main_path, "[main]\ncachedir=/srv/cache\n").unwrap();
        let dropins = dir.path().join("conf.d");
        std::fs::create_dir(&dropins).unwrap();
        std::fs::write(dropins.join("10-override.conf"), "[main]\ncachedir=/srv/other\n").unwrap();

        let mut base = Base::new();
        base.load_config_from_file(&main_path).unwrap();
        base.load_config_from_dir(&dropins).unwrap();
        assert_eq!(base.main_config().get("cachedir").unwrap().get_string().as_deref(), Some("/srv/other"));
    }

    fn write_repomd_and_primary(repo_cache_dir: &Path) {
        use sha2::Digest;
        let repodata = repo_cache_dir.join("repodata");
        std::fs::create_dir_all(&repodata).unwrap();
        let primary = br#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="1">
  <package type="rpm">
    <name>foo</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="1.2" rel="3"/>
    <checksum type="sha256" pkgid="YES">deadbeef</checksum>
    <location href="Packages/f/foo-1.2-3.x86_64.rpm"/>
    <format>
      <rpm:license>GPL-2.0</rpm:license>
    </format>
  </package>
</metadata>"#;
        std::fs::write(repodata.join("primary.xml"), primary).unwrap();
        let digest = sha2::Sha256::digest(primary);
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        let repomd = format!(
            "<repomd><revision>1</revision><data type=\"primary\"><checksum type=\"sha256\">{hex}</checksum><location href=\"repodata/primary.xml\"/></data></repomd>"
        );
        std::fs::write(repodata.join("repomd.xml"), repomd).unwrap();
    }

    #[test]
    fn load_repo_packages_feeds_parsed_primary_xml_into_the_sack() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = dir.path().join("pmcore.conf");
        let cache_dir = dir.path().join("cache");
        std::fs::write(&main_path, format!("[main]\ncachedir={}\n[updates]\nbaseurl=https://example.test/updates\n", cache_dir.display())).unwrap();

        let mut base = Base::new();
        base.load_config_from_file(&main_path).unwrap();
        base.create_repos_from_system_configuration(&main_path).unwrap();

        let repo_id = RepoId::new("updates").unwrap();
        write_repomd_and_primary(&cache_dir.join("updates"));

        let handle = *base.repo_handles.get(&repo_id).unwrap();
        let added = base.load_repo_packages(&repo_id, handle).unwrap();
        assert_eq!(added, 1);
        assert_eq!(base.sack().pool().by_repo(handle).len(), 1);
    }

    #[test]
    fn create_repos_from_system_configuration_discovers_sections_and_dropins() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = dir.path().join("pmcore.conf");
        let reposdir = dir.path().join("repos.d");
        std::fs::create_dir(&reposdir).unwrap();

        {
            let mut f = std::fs::File::create(&main_path).unwrap();
            writeln!(f, "[main]\nreposdir={}\ncachedir={}", reposdir.display(), dir.path().join("cache").display()).unwrap();
            writeln!(f, "[inline-repo]\nbaseurl=https://example.test/inline").unwrap();
        }
        std::fs::write(reposdir.join("extra.conf"), "[extra]\nbaseurl=https://example.test/extra\n").unwrap();

        let mut base = Base::new();
        base.load_config_from_file(&main_path).unwrap();
        base.create_repos_from_system_configuration(&main_path).unwrap();

        assert_eq!(base.repos().len(), 2);
        assert!(base.repos().contains_key(&RepoId::new("inline-repo").unwrap()));
        assert!(base.repos().contains_key(&RepoId::new("extra").unwrap()));
    }
}
