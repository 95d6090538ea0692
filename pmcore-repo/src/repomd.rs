//! Minimal `repomd.xml` extraction.
//!
//! This only pulls out the handful of fields the refresh protocol needs
//! (per-kind location, checksum, and the generated timestamp) via targeted
//! regexes rather than a full XML parse, since those are the only fields
//! the rest of the crate consumes.

use once_cell::sync::Lazy;
use regex::Regex;

use pmcore_types::{Checksum, ChecksumKind};

use crate::{repo::MetadataKind, repo::RepomdEntry, Error};

static DATA_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<data type="([^"]+)">(.*?)</data>"#).expect("valid regex")
});
static LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<location href="([^"]+)"\s*/>"#).expect("valid regex"));
static CHECKSUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<checksum type="([^"]+)">([0-9a-fA-F]+)</checksum>"#).expect("valid regex"));
static REVISION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<revision>(\d+)</revision>"#).expect("valid regex"));

fn kind_from_str(kind: &str) -> Option<MetadataKind> {
    match kind {
        "primary" => Some(MetadataKind::Primary),
        "filelists" => Some(MetadataKind::Filelists),
        "updateinfo" => Some(MetadataKind::Updateinfo),
        "group" | "group_gz" => Some(MetadataKind::Group),
        "other" => Some(MetadataKind::Other),
        "appstream" => Some(MetadataKind::Appstream),
        "modules" => Some(MetadataKind::Modules),
        _ => None,
    }
}

fn checksum_kind_from_str(kind: &str, repo_id: &str) -> Result<ChecksumKind, Error> {
    match kind {
        "sha1" | "sha" => Ok(ChecksumKind::Sha1),
        "sha256" => Ok(ChecksumKind::Sha256),
        "sha512" => Ok(ChecksumKind::Sha512),
        other => Err(Error::FileInvalid {
            repo_id: repo_id.to_string(),
            file: "repomd.xml".to_string(),
            detail: format!("unsupported checksum algorithm `{other}`"),
        }),
    }
}

/// The parsed subset of `repomd.xml`: the generated-timestamp and every
/// recognized `<data>` entry.
#[derive(Debug)]
pub struct Repomd {
    pub revision: u64,
    pub entries: Vec<RepomdEntry>,
}

pub fn parse_repomd(repo_id: &str, xml: &str) -> Result<Repomd, Error> {
    let revision = REVISION
        .captures(xml)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let mut entries = Vec::new();
    for caps in DATA_BLOCK.captures_iter(xml) {
        let kind_str = &caps[1];
        let Some(kind) = kind_from_str(kind_str) else {
            continue;
        };
        let body = &caps[2];
        let location = LOCATION
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::FileInvalid {
                repo_id: repo_id.to_string(),
                file: "repomd.xml".to_string(),
                detail: format!("`{kind_str}` entry is missing a <location>"),
            })?;
        let checksum = CHECKSUM
            .captures(body)
            .ok_or_else(|| Error::FileInvalid {
                repo_id: repo_id.to_string(),
                file: "repomd.xml".to_string(),
                detail: format!("`{kind_str}` entry is missing a <checksum>"),
            })
            .and_then(|c| {
                let kind = checksum_kind_from_str(&c[1], repo_id)?;
                Checksum::from_hex(kind, &c[2]).map_err(|_| Error::FileInvalid {
                    repo_id: repo_id.to_string(),
                    file: "repomd.xml".to_string(),
                    detail: format!("`{kind_str}` entry has a malformed checksum"),
                })
            })?;
        entries.push(RepomdEntry { kind, location, checksum });
    }

    Ok(Repomd { revision, entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1700000000</revision>
  <data type="primary">
    <checksum type="sha256">deadbeefcafebabe</checksum>
    <location href="repodata/primary.xml.gz"/>
  </data>
  <data type="filelists">
    <checksum type="sha256">0123456789abcdef</checksum>
    <location href="repodata/filelists.xml.gz"/>
  </data>
</repomd>"#;

    #[test]
    fn parses_known_data_entries() {
        let repomd = parse_repomd("updates", SAMPLE).unwrap();
        assert_eq!(repomd.revision, 1700000000);
        assert_eq!(repomd.entries.len(), 2);
        assert_eq!(repomd.entries[0].kind, MetadataKind::Primary);
        assert_eq!(repomd.entries[0].location, "repodata/primary.xml.gz");
    }

    #[test]
    fn missing_checksum_is_file_invalid() {
        let xml = r#"<data type="primary"><location href="repodata/primary.xml.gz"/></data>"#;
        let err = parse_repomd("updates", xml).unwrap_err();
        assert!(matches!(err, Error::FileInvalid { .. }));
    }
}
