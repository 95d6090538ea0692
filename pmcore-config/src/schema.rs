//! Named bundles of [`OptionCell`]s for the main config section and for a
//! single repo section, plus bulk loading from a parsed [`IniDocument`]
//! section.

use crate::{ini::IniEntry, Error, Kind, OptionCell, Priority};

/// A named, ordered collection of option cells that can be bulk-loaded from
/// an INI section. Unknown keys are logged and ignored; a value that fails
/// its kind's validation is a hard [`Error`].
pub trait ConfigSchema {
    fn cells(&self) -> &[(&'static str, OptionCell)];
    fn cells_mut(&mut self) -> &mut [(&'static str, OptionCell)];

    /// Looks up a cell for reading without requiring exclusive access.
    fn get(&self, name: &str) -> Option<&OptionCell> {
        self.cells().iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }

    fn cell(&mut self, name: &str) -> Option<&mut OptionCell> {
        self.cells_mut().iter_mut().find(|(n, _)| *n == name).map(|(_, c)| c)
    }

    /// Applies every entry in `entries` at `priority`. Keys with no matching
    /// cell are logged at `warn` and skipped, per spec's "unknown keys are
    /// ignored with a warning".
    fn load_entries(&mut self, entries: &[IniEntry], priority: Priority) -> Result<(), Error> {
        for entry in entries {
            match self.cell(&entry.key) {
                Some(cell) => cell.set(priority, &entry.value)?,
                None => log::warn!("unknown configuration key `{}`, ignoring", entry.key),
            }
        }
        Ok(())
    }
}

macro_rules! cells {
    ($($name:expr => $kind:expr, $default:expr);* $(;)?) => {
        vec![$(($name, OptionCell::with_default($name, $kind, $default).expect("built-in default is valid"))),*]
    };
}

/// The `[main]` section: global behavior not tied to any one repo.
pub struct MainConfig {
    cells: Vec<(&'static str, OptionCell)>,
}

impl Default for MainConfig {
    fn default() -> Self {
        let cells = cells! {
            "cachedir" => Kind::Path { must_exist: false, must_be_absolute: true }, "/var/cache/pmcore";
            "persistdir" => Kind::Path { must_exist: false, must_be_absolute: true }, "/var/lib/pmcore";
            "reposdir" => Kind::Path { must_exist: false, must_be_absolute: true }, "/etc/pmcore/repos.d";
            "gpgcheck" => Kind::Bool, "true";
            "repo_gpgcheck" => Kind::Bool, "false";
            "installonly_limit" => Kind::Int { min: Some(0), max: None }, "3";
            "clean_requirements_on_remove" => Kind::Bool, "true";
            "best" => Kind::Bool, "false";
            "obsoletes" => Kind::Bool, "true";
            "skip_if_unavailable" => Kind::Bool, "false";
            "metadata_expire" => Kind::Seconds, "6h";
            "max_cache_age" => Kind::Seconds, "never";
            "retries" => Kind::Int { min: Some(0), max: None }, "10";
            "timeout" => Kind::Seconds, "30";
            "max_parallel_downloads" => Kind::Int { min: Some(1), max: Some(100) }, "3";
            "minrate" => Kind::Bandwidth, "1k";
            "throttle" => Kind::Throttle, "0";
            "bandwidth" => Kind::Bandwidth, "0";
            "proxy" => Kind::Str { validator: None }, "";
            "proxy_username" => Kind::Str { validator: None }, "";
            "proxy_password" => Kind::Str { validator: None }, "";
            "sslverify" => Kind::Bool, "true";
            "protect_running_kernel" => Kind::Bool, "true";
            "installonly_patterns" => Kind::StringList, "kernel kernel-core kernel-uek kernel-debug kernel-modules";
        };
        Self { cells }
    }
}

impl ConfigSchema for MainConfig {
    fn cells(&self) -> &[(&'static str, OptionCell)] {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut [(&'static str, OptionCell)] {
        &mut self.cells
    }
}

impl MainConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One repo's section: `enabled`, source triple, GPG, TLS, and proxy
/// settings, per spec §4.2's mandatory repo key list.
pub struct RepoConfig {
    cells: Vec<(&'static str, OptionCell)>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        let cells = cells! {
            "name" => Kind::Str { validator: None }, "";
            "enabled" => Kind::Bool, "true";
            "enabled_metadata" => Kind::Bool, "false";
            "skip_if_unavailable" => Kind::Bool, "false";
            "cost" => Kind::Int { min: Some(1), max: None }, "1000";
            "baseurl" => Kind::StringList, "";
            "mirrorlist" => Kind::url(), "";
            "metalink" => Kind::url(), "";
            "gpgcheck" => Kind::Bool, "true";
            "repo_gpgcheck" => Kind::Bool, "false";
            "gpgkey" => Kind::StringList, "";
            "exclude" => Kind::StringList, "";
            "proxy" => Kind::Str { validator: None }, "";
            "proxy_username" => Kind::Str { validator: None }, "";
            "proxy_password" => Kind::Str { validator: None }, "";
            "proxy_auth_method" => Kind::Enum {
                allowed: vec![
                    "any".into(), "none".into(), "basic".into(), "digest".into(),
                    "negotiate".into(), "ntlm".into(), "digest_ie".into(), "ntlm_wb".into(),
                ],
            }, "any";
            "username" => Kind::Str { validator: None }, "";
            "password" => Kind::Str { validator: None }, "";
            "sslcacert" => Kind::Path { must_exist: false, must_be_absolute: true }, "";
            "sslclientcert" => Kind::Path { must_exist: false, must_be_absolute: true }, "";
            "sslclientkey" => Kind::Path { must_exist: false, must_be_absolute: true }, "";
            "sslverify" => Kind::Bool, "true";
            "metadata_expire" => Kind::Seconds, "6h";
            "module_hotfixes" => Kind::Bool, "false";
        };
        Self { cells }
    }
}

impl ConfigSchema for RepoConfig {
    fn cells(&self) -> &[(&'static str, OptionCell)] {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut [(&'static str, OptionCell)] {
        &mut self.cells
    }
}

impl RepoConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_ini;

    #[test]
    fn main_config_loads_known_keys_at_priority() {
        let doc = parse_ini("main.conf", "[main]\ncachedir=/srv/cache\ngpgcheck=0\n").unwrap();
        let mut main = MainConfig::new();
        main.load_entries(doc.section("main").unwrap(), Priority::MainConfig).unwrap();
        assert_eq!(main.cell("cachedir").unwrap().get_string().as_deref(), Some("/srv/cache"));
        assert_eq!(main.cell("gpgcheck").unwrap().get_bool(), Some(false));
    }

    #[test]
    fn unknown_key_is_ignored_not_an_error() {
        let doc = parse_ini("main.conf", "[main]\nnot_a_real_option=1\n").unwrap();
        let mut main = MainConfig::new();
        assert!(main.load_entries(doc.section("main").unwrap(), Priority::MainConfig).is_ok());
    }

    #[test]
    fn repo_config_rejects_bad_enum_value() {
        let doc = parse_ini("updates.conf", "[updates]\nproxy_auth_method=bogus\n").unwrap();
        let mut repo = RepoConfig::new();
        assert!(repo.load_entries(doc.section("updates").unwrap(), Priority::RepoConfig).is_err());
    }

    #[test]
    fn repo_config_baseurl_is_a_list() {
        let doc = parse_ini(
            "updates.conf",
            "[updates]\nbaseurl=https://a.example/repo\n https://b.example/repo\n",
        )
        .unwrap();
        let mut repo = RepoConfig::new();
        repo.load_entries(doc.section("updates").unwrap(), Priority::RepoConfig).unwrap();
        let urls = repo.cell("baseurl").unwrap().get_string_list().unwrap();
        assert_eq!(urls, vec!["https://a.example/repo", "https://b.example/repo"]);
    }
}
