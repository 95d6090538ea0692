//! `primary.xml` parsing: turns one repo's package listing into
//! [`Package`] records ready for [`pmcore_sack::Sack::ingest_repo`].
//!
//! Unlike `repomd.xml`'s handful of flat fields, `primary.xml` nests
//! per-package `<format>` blocks with repeated `<rpm:entry>` dependency
//! lists, so this reads it as a real event stream rather than targeted
//! regexes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use pmcore_types::{
    Architecture, Checksum, ChecksumKind, Epoch, Evr, Name, Nevra, Package, PackageBuilder, Reldep, ReldepFlag, RepoHandle,
};

use crate::Error;

#[derive(Clone, Copy, Eq, PartialEq)]
enum DepList {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Enhances,
    Supplements,
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum TextTarget {
    Name,
    Arch,
    Summary,
    Description,
    Packager,
    Url,
    License,
    Vendor,
    Group,
    BuildHost,
    SourceRpm,
    Checksum,
    File,
}

#[derive(Default)]
struct Pending {
    name: String,
    arch: String,
    epoch: Epoch,
    version: String,
    release: String,
    checksum_kind: Option<ChecksumKind>,
    checksum: String,
    summary: String,
    description: String,
    packager: String,
    url: String,
    build_time: u64,
    download_size: u64,
    install_size: u64,
    location: String,
    license: String,
    vendor: String,
    group: String,
    build_host: String,
    source_rpm: String,
    provides: Vec<Reldep>,
    requires: Vec<Reldep>,
    requires_pre: Vec<Reldep>,
    conflicts: Vec<Reldep>,
    obsoletes: Vec<Reldep>,
    recommends: Vec<Reldep>,
    suggests: Vec<Reldep>,
    enhances: Vec<Reldep>,
    supplements: Vec<Reldep>,
    files: Vec<String>,
}

fn attr(tag: &BytesStart, key: &[u8]) -> Option<String> {
    tag.attributes().flatten().find(|a| a.key.as_ref() == key).map(|a| a.unescape_value().unwrap_or_default().into_owned())
}

fn reldep_from_entry(tag: &BytesStart) -> Option<Reldep> {
    let name = Name::new(attr(tag, b"name")?).ok()?;
    let Some(flag_str) = attr(tag, b"flags") else {
        return Some(Reldep::unversioned(name));
    };
    let flag = match flag_str.as_str() {
        "LT" => ReldepFlag::Lt,
        "LE" => ReldepFlag::Le,
        "EQ" => ReldepFlag::Eq,
        "GE" => ReldepFlag::Ge,
        "GT" => ReldepFlag::Gt,
        _ => return Some(Reldep::unversioned(name)),
    };
    let epoch = attr(tag, b"epoch").and_then(|e| e.parse().ok()).unwrap_or(0);
    let version = attr(tag, b"ver").unwrap_or_default();
    let release = attr(tag, b"rel").unwrap_or_default();
    Some(Reldep::versioned(name, flag, Evr::new(Epoch(epoch), version, release)))
}

fn dep_list_from_local_name(name: &[u8]) -> Option<DepList> {
    match name {
        b"provides" => Some(DepList::Provides),
        b"requires" => Some(DepList::Requires),
        b"conflicts" => Some(DepList::Conflicts),
        b"obsoletes" => Some(DepList::Obsoletes),
        b"recommends" => Some(DepList::Recommends),
        b"suggests" => Some(DepList::Suggests),
        b"enhances" => Some(DepList::Enhances),
        b"supplements" => Some(DepList::Supplements),
        _ => None,
    }
}

fn push_dep(pending: &mut Pending, list: DepList, dep: Reldep, pre: bool) {
    match list {
        DepList::Provides => pending.provides.push(dep),
        DepList::Requires => {
            if pre {
                pending.requires_pre.push(dep.clone());
            }
            pending.requires.push(dep);
        }
        DepList::Conflicts => pending.conflicts.push(dep),
        DepList::Obsoletes => pending.obsoletes.push(dep),
        DepList::Recommends => pending.recommends.push(dep),
        DepList::Suggests => pending.suggests.push(dep),
        DepList::Enhances => pending.enhances.push(dep),
        DepList::Supplements => pending.supplements.push(dep),
    }
}

fn finish_package(repo_id: &str, owning_repo: RepoHandle, pending: Pending) -> Result<Package, Error> {
    if pending.name.is_empty() {
        return Err(Error::FileInvalid { repo_id: repo_id.to_string(), file: "primary.xml".to_string(), detail: "package is missing a <name>".to_string() });
    }
    if pending.arch.is_empty() {
        return Err(Error::FileInvalid { repo_id: repo_id.to_string(), file: "primary.xml".to_string(), detail: format!("package `{}` is missing an <arch>", pending.name) });
    }
    let name = Name::new(pending.name.as_str()).map_err(|e| Error::FileInvalid {
        repo_id: repo_id.to_string(),
        file: "primary.xml".to_string(),
        detail: format!("invalid package name `{}`: {e}", pending.name),
    })?;
    let arch = Architecture::new(pending.arch.as_str()).map_err(|e| Error::FileInvalid {
        repo_id: repo_id.to_string(),
        file: "primary.xml".to_string(),
        detail: format!("invalid arch `{}`: {e}", pending.arch),
    })?;
    let nevra = Nevra::new(name, Evr::new(pending.epoch, pending.version, pending.release), arch);
    let checksum = pending.checksum_kind.map(|kind| Checksum::from_hex(kind, &pending.checksum)).transpose().map_err(|_| {
        Error::FileInvalid { repo_id: repo_id.to_string(), file: "primary.xml".to_string(), detail: format!("package `{nevra}` has a malformed checksum") }
    })?;

    Ok(PackageBuilder::new(nevra, owning_repo)
        .source_rpm(pending.source_rpm)
        .summary(pending.summary)
        .description(pending.description)
        .license(pending.license)
        .url(pending.url)
        .vendor(pending.vendor)
        .packager(pending.packager)
        .build_host(pending.build_host)
        .build_time(pending.build_time)
        .group(pending.group)
        .checksum(checksum)
        .download_size(pending.download_size)
        .install_size(pending.install_size)
        .location(pending.location)
        .files(pending.files)
        .requires(pending.requires)
        .requires_pre(pending.requires_pre)
        .conflicts(pending.conflicts)
        .obsoletes(pending.obsoletes)
        .provides(pending.provides)
        .recommends(pending.recommends)
        .suggests(pending.suggests)
        .enhances(pending.enhances)
        .supplements(pending.supplements)
        .build())
}

/// Parses a `primary.xml` document into packages owned by `owning_repo`.
pub fn parse_primary(repo_id: &str, owning_repo: RepoHandle, xml: &str) -> Result<Vec<Package>, Error> {
    let mut reader = Reader::from_str(xml);

    let mut packages = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut dep_list: Option<DepList> = None;
    let mut text_target: Option<TextTarget> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event().map_err(|source| Error::FileInvalid {
            repo_id: repo_id.to_string(),
            file: "primary.xml".to_string(),
            detail: source.to_string(),
        })? {
            Event::Eof => break,
            Event::Start(tag) => {
                let local = tag.local_name().into_inner().to_vec();
                match local.as_slice() {
                    b"package" => pending = Some(Pending::default()),
                    b"version" => {
                        if let Some(p) = pending.as_mut() {
                            p.epoch = Epoch(attr(&tag, b"epoch").and_then(|e| e.parse().ok()).unwrap_or(0));
                            p.version = attr(&tag, b"ver").unwrap_or_default();
                            p.release = attr(&tag, b"rel").unwrap_or_default();
                        }
                    }
                    b"checksum" => {
                        text_target = Some(TextTarget::Checksum);
                        text_buf.clear();
                        if let Some(p) = pending.as_mut() {
                            p.checksum_kind = attr(&tag, b"type").and_then(|k| match k.as_str() {
                                "sha1" | "sha" => Some(ChecksumKind::Sha1),
                                "sha256" => Some(ChecksumKind::Sha256),
                                "sha512" => Some(ChecksumKind::Sha512),
                                _ => None,
                            });
                        }
                    }
                    b"name" => {
                        text_target = Some(TextTarget::Name);
                        text_buf.clear();
                    }
                    b"arch" => {
                        text_target = Some(TextTarget::Arch);
                        text_buf.clear();
                    }
                    b"summary" => {
                        text_target = Some(TextTarget::Summary);
                        text_buf.clear();
                    }
                    b"description" => {
                        text_target = Some(TextTarget::Description);
                        text_buf.clear();
                    }
                    b"packager" => {
                        text_target = Some(TextTarget::Packager);
                        text_buf.clear();
                    }
                    b"url" => {
                        text_target = Some(TextTarget::Url);
                        text_buf.clear();
                    }
                    b"license" => {
                        text_target = Some(TextTarget::License);
                        text_buf.clear();
                    }
                    b"vendor" => {
                        text_target = Some(TextTarget::Vendor);
                        text_buf.clear();
                    }
                    b"group" => {
                        text_target = Some(TextTarget::Group);
                        text_buf.clear();
                    }
                    b"buildhost" => {
                        text_target = Some(TextTarget::BuildHost);
                        text_buf.clear();
                    }
                    b"sourcerpm" => {
                        text_target = Some(TextTarget::SourceRpm);
                        text_buf.clear();
                    }
                    b"file" => {
                        text_target = Some(TextTarget::File);
                        text_buf.clear();
                    }
                    other => {
                        if let Some(list) = dep_list_from_local_name(other) {
                            dep_list = Some(list);
                        }
                    }
                }
            }
            Event::Empty(tag) => {
                let local = tag.local_name().into_inner().to_vec();
                match local.as_slice() {
                    b"version" => {
                        if let Some(p) = pending.as_mut() {
                            p.epoch = Epoch(attr(&tag, b"epoch").and_then(|e| e.parse().ok()).unwrap_or(0));
                            p.version = attr(&tag, b"ver").unwrap_or_default();
                            p.release = attr(&tag, b"rel").unwrap_or_default();
                        }
                    }
                    b"size" => {
                        if let Some(p) = pending.as_mut() {
                            p.download_size = attr(&tag, b"package").and_then(|s| s.parse().ok()).unwrap_or(0);
                            p.install_size = attr(&tag, b"installed").and_then(|s| s.parse().ok()).unwrap_or(0);
                        }
                    }
                    b"time" => {
                        if let Some(p) = pending.as_mut() {
                            p.build_time = attr(&tag, b"build").and_then(|s| s.parse().ok()).unwrap_or(0);
                        }
                    }
                    b"location" => {
                        if let Some(p) = pending.as_mut() {
                            p.location = attr(&tag, b"href").unwrap_or_default();
                        }
                    }
                    b"entry" => {
                        if let (Some(list), Some(p)) = (dep_list, pending.as_mut()) {
                            if let Some(dep) = reldep_from_entry(&tag) {
                                let pre = attr(&tag, b"pre").as_deref() == Some("1");
                                push_dep(p, list, dep, pre);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if text_target.is_some() {
                    text_buf.push_str(&text.unescape().map_err(|source| Error::FileInvalid {
                        repo_id: repo_id.to_string(),
                        file: "primary.xml".to_string(),
                        detail: source.to_string(),
                    })?);
                }
            }
            Event::End(tag) => {
                let local = tag.local_name().into_inner().to_vec();
                if let Some(target) = text_target.take() {
                    let value = std::mem::take(&mut text_buf).trim().to_string();
                    if let Some(p) = pending.as_mut() {
                        match target {
                            TextTarget::Name => p.name = value,
                            TextTarget::Arch => p.arch = value,
                            TextTarget::Summary => p.summary = value,
                            TextTarget::Description => p.description = value,
                            TextTarget::Packager => p.packager = value,
                            TextTarget::Url => p.url = value,
                            TextTarget::License => p.license = value,
                            TextTarget::Vendor => p.vendor = value,
                            TextTarget::Group => p.group = value,
                            TextTarget::BuildHost => p.build_host = value,
                            TextTarget::SourceRpm => p.source_rpm = value,
                            TextTarget::Checksum => p.checksum = value,
                            TextTarget::File => p.files.push(value),
                        }
                    }
                }
                if dep_list_from_local_name(&local) == dep_list && dep_list.is_some() {
                    dep_list = None;
                }
                if local.as_slice() == b"package" {
                    if let Some(p) = pending.take() {
                        packages.push(finish_package(repo_id, owning_repo, p)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="1">
  <package type="rpm">
    <name>foo</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="1.2" rel="3"/>
    <checksum type="sha256" pkgid="YES">deadbeef</checksum>
    <summary>The foo library</summary>
    <description>Longer description of foo.</description>
    <packager>Foo Packagers</packager>
    <url>https://example.invalid/foo</url>
    <time file="1700000000" build="1699999000"/>
    <size package="1024" installed="2048" archive="4096"/>
    <location href="Packages/f/foo-1.2-3.x86_64.rpm"/>
    <format>
      <rpm:license>GPL-2.0</rpm:license>
      <rpm:vendor>Example</rpm:vendor>
      <rpm:group>Libraries</rpm:group>
      <rpm:buildhost>builder.example.invalid</rpm:buildhost>
      <rpm:sourcerpm>foo-1.2-3.src.rpm</rpm:sourcerpm>
      <rpm:header-range start="280" end="3120"/>
      <rpm:provides>
        <rpm:entry name="foo" flags="EQ" epoch="0" ver="1.2" rel="3"/>
      </rpm:provides>
      <rpm:requires>
        <rpm:entry name="libc.so.6" pre="1"/>
        <rpm:entry name="bar" flags="GE" epoch="0" ver="1.0" rel="1"/>
      </rpm:requires>
      <file>/usr/lib/libfoo.so.1</file>
    </format>
  </package>
</metadata>"#;

    #[test]
    fn parses_identity_and_version() {
        let packages = parse_primary("updates", RepoHandle(0), SAMPLE).unwrap();
        assert_eq!(packages.len(), 1);
        let pkg = &packages[0];
        assert_eq!(pkg.nevra().name().as_str(), "foo");
        assert_eq!(pkg.nevra().arch().as_str(), "x86_64");
        assert_eq!(pkg.nevra().evr().version(), "1.2");
        assert_eq!(pkg.nevra().evr().release(), "3");
        assert_eq!(pkg.location(), "Packages/f/foo-1.2-3.x86_64.rpm");
        assert_eq!(pkg.download_size(), 1024);
        assert_eq!(pkg.install_size(), 2048);
    }

    #[test]
    fn parses_format_fields_and_deps() {
        let packages = parse_primary("updates", RepoHandle(0), SAMPLE).unwrap();
        let pkg = &packages[0];
        assert_eq!(pkg.license(), "GPL-2.0");
        assert_eq!(pkg.source_rpm(), "foo-1.2-3.src.rpm");
        assert_eq!(pkg.provides().len(), 1);
        assert_eq!(pkg.requires().len(), 2);
        assert_eq!(pkg.requires_pre().len(), 1);
        assert_eq!(pkg.requires_pre()[0].name().as_str(), "libc.so.6");
        assert_eq!(pkg.files(), &["/usr/lib/libfoo.so.1".to_string()]);
    }

    #[test]
    fn missing_name_is_file_invalid() {
        let xml = r#"<metadata><package><arch>x86_64</arch><version epoch="0" ver="1" rel="1"/></package></metadata>"#;
        let err = parse_primary("updates", RepoHandle(0), xml).unwrap_err();
        assert!(matches!(err, Error::FileInvalid { .. }));
    }
}
