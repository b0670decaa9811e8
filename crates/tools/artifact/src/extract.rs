//! Archive member selection and extraction.
//!
//! Every member name is checked before anything is written: one escaping
//! member rejects the whole archive. The selected member is written into a
//! temporary file next to its destination and renamed into place, so a
//! partially extracted binary is never observable.

use crate::error::{ArtifactError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Supported archive formats, chosen by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.tar.gz` / `.tgz`.
    TarGz,
    /// `.zip`.
    Zip,
    /// Not an archive: the file is the binary itself.
    Raw,
}

impl ArchiveKind {
    /// Archive format implied by the file extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else if lower.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Raw
        }
    }
}

/// Whether an archive member name would resolve outside the extraction root.
///
/// Both `/` and `\` count as separators. Absolute names, drive prefixes and
/// any `..` that climbs above the root are escapes.
#[must_use]
pub fn escapes_root(member: &str) -> bool {
    let normalized = member.replace('\\', "/");
    if normalized.starts_with('/') {
        return true;
    }
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }

    let mut depth: i64 = 0;
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

/// Normalized member path: forward slashes, no empty or `.` segments.
fn normalize(member: &str) -> String {
    member
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// How the wanted member is identified.
#[derive(Debug, Clone)]
pub enum MemberSelector {
    /// An explicit member path (`extract_path`); matched exactly or as a
    /// trailing path (so top-level version directories need not be spelled out).
    Path(String),
    /// Any member whose file name equals this binary name.
    FileName(String),
}

impl MemberSelector {
    fn matches(&self, member: &str) -> bool {
        let member = normalize(member);
        match self {
            Self::Path(wanted) => {
                let wanted = normalize(wanted);
                member == wanted || member.ends_with(&format!("/{wanted}"))
            }
            Self::FileName(name) => member.rsplit('/').next() == Some(name.as_str()),
        }
    }

    fn describe(&self) -> &str {
        match self {
            Self::Path(p) | Self::FileName(p) => p,
        }
    }
}

/// Extract the selected member of `archive` to `dest`.
///
/// Blocking; run it on a blocking thread.
pub fn extract_member(
    archive: &Path,
    kind: ArchiveKind,
    selector: &MemberSelector,
    dest: &Path,
) -> Result<()> {
    match kind {
        ArchiveKind::TarGz => {
            check_tar_members(archive)?;
            extract_from_tar_gz(archive, selector, dest)
        }
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
            check_zip_members(&mut zip)?;
            extract_from_zip(&mut zip, selector, dest)
        }
        ArchiveKind::Raw => write_atomically(&mut File::open(archive)?, dest),
    }
}

fn open_tar(archive: &Path) -> Result<tar::Archive<GzDecoder<File>>> {
    Ok(tar::Archive::new(GzDecoder::new(File::open(archive)?)))
}

fn check_tar_members(archive: &Path) -> Result<()> {
    let mut tar = open_tar(archive)?;
    for entry in tar.entries().map_err(tar_error)? {
        let entry = entry.map_err(tar_error)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if escapes_root(&name) {
            return Err(ArtifactError::path_traversal(name));
        }
        if let Some(link) = entry.link_name_bytes() {
            let link = String::from_utf8_lossy(&link).into_owned();
            if escapes_root(&link) {
                return Err(ArtifactError::path_traversal(format!("{name} -> {link}")));
            }
        }
    }
    Ok(())
}

fn extract_from_tar_gz(archive: &Path, selector: &MemberSelector, dest: &Path) -> Result<()> {
    let mut tar = open_tar(archive)?;
    for entry in tar.entries().map_err(tar_error)? {
        let mut entry = entry.map_err(tar_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if selector.matches(&name) {
            debug!(member = %name, dest = %dest.display(), "Extracting from tarball");
            return write_atomically(&mut entry, dest);
        }
    }
    Err(ArtifactError::MemberNotFound {
        member: selector.describe().to_string(),
    })
}

fn check_zip_members(zip: &mut zip::ZipArchive<File>) -> Result<()> {
    for i in 0..zip.len() {
        let file = zip.by_index(i)?;
        if file.enclosed_name().is_none() || escapes_root(file.name()) {
            return Err(ArtifactError::path_traversal(file.name()));
        }
    }
    Ok(())
}

fn extract_from_zip(
    zip: &mut zip::ZipArchive<File>,
    selector: &MemberSelector,
    dest: &Path,
) -> Result<()> {
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        if !file.is_file() {
            continue;
        }
        let name = file.name().to_string();
        if selector.matches(&name) {
            debug!(member = %name, dest = %dest.display(), "Extracting from zip");
            return write_atomically(&mut file, dest);
        }
    }
    Err(ArtifactError::MemberNotFound {
        member: selector.describe().to_string(),
    })
}

/// Copy `reader` into a fresh temp file beside `dest`, mark it executable and
/// rename it over `dest`.
fn write_atomically(reader: &mut dyn Read, dest: &Path) -> Result<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| ArtifactError::archive(format!("no parent for {}", dest.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tooldock-extract-")
        .tempfile_in(dir)?;
    io::copy(reader, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755))?;
    }

    tmp.persist(dest).map_err(|e| ArtifactError::Io(e.error))?;
    Ok(())
}

fn tar_error(e: io::Error) -> ArtifactError {
    ArtifactError::archive(format!("unreadable tarball: {e}"))
}
