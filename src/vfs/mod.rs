// src/vfs/mod.rs - search-path filesystem over directories and zip archives
pub mod file;

pub use file::AssetFile;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::{result::ZipError, ZipArchive};
use crate::errors::TentacleError;

/// SHA-256 of a file's contents, used to notice edits between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

enum Mount {
    Directory(PathBuf),
    Archive {
        path: PathBuf,
        archive: RefCell<ZipArchive<BufReader<File>>>,
    },
}

impl Mount {
    fn open(path: &Path) -> Result<Self, TentacleError> {
        if path.is_dir() {
            return Ok(Mount::Directory(path.to_path_buf()));
        }

        if !path.is_file() {
            return Err(TentacleError::AssetError(format!(
                "Cannot mount {}: no such file or directory",
                path.display()
            )));
        }

        let reader = BufReader::new(File::open(path)?);
        let archive = ZipArchive::new(reader)?;
        Ok(Mount::Archive {
            path: path.to_path_buf(),
            archive: RefCell::new(archive),
        })
    }

    fn root(&self) -> &Path {
        match self {
            Mount::Directory(root) => root,
            Mount::Archive { path, .. } => path,
        }
    }

    fn contains(&self, vpath: &str) -> bool {
        match self {
            Mount::Directory(root) => disk_path(root, vpath).is_file(),
            Mount::Archive { archive, .. } => {
                archive.borrow().file_names().any(|name| name == vpath)
            }
        }
    }

    fn read(&self, vpath: &str) -> Result<Option<Vec<u8>>, TentacleError> {
        match self {
            Mount::Directory(root) => {
                let path = disk_path(root, vpath);
                if !path.is_file() {
                    return Ok(None);
                }
                Ok(Some(std::fs::read(path)?))
            }
            Mount::Archive { archive, .. } => {
                let mut archive = archive.borrow_mut();
                let mut entry = match archive.by_name(vpath) {
                    Ok(entry) => entry,
                    Err(ZipError::FileNotFound) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                if entry.is_dir() {
                    return Ok(None);
                }
                let mut bytes = Vec::with_capacity(initial_capacity(entry.size()));
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
        }
    }

    fn files(&self) -> Vec<String> {
        match self {
            Mount::Directory(root) => WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    let relative = entry.path().strip_prefix(root).ok()?;
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    Some(parts.join("/"))
                })
                .collect(),
            Mount::Archive { archive, .. } => archive
                .borrow()
                .file_names()
                .filter(|name| !name.ends_with('/'))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Archive headers are untrusted; larger entries grow while reading.
const MAX_PREALLOC: u64 = 1 << 20;

fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

fn disk_path(root: &Path, vpath: &str) -> PathBuf {
    vpath.split('/').fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Turns a script-facing path into the canonical `a/b/c` form.
///
/// Leading slashes, empty segments and `.` are dropped; `..` is refused so
/// nothing outside the mounted roots can be reached.
pub fn normalize(path: &str) -> Result<String, TentacleError> {
    let mut parts = Vec::new();
    for segment in path.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(TentacleError::AssetError(format!(
                    "Path escapes the search path: {}",
                    path
                )))
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        return Err(TentacleError::AssetError("Empty path".to_string()));
    }

    Ok(parts.join("/"))
}

/// An ordered search path of mounted directories and archives.
///
/// Lookups walk the mounts front to back and the first one holding the file
/// wins, so a loose directory mounted ahead of `data.zip` overrides it.
#[derive(Default)]
pub struct VirtualFs {
    mounts: Vec<Mount>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Directory holding the running executable.
    pub fn base_dir() -> Result<PathBuf, TentacleError> {
        let exe = std::env::current_exe()?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| TentacleError::AssetError("Executable has no parent directory".to_string()))
    }

    pub fn mount(&mut self, path: impl AsRef<Path>, append: bool) -> Result<(), TentacleError> {
        let mount = Mount::open(path.as_ref())?;
        log::info!("Mounted {}", mount.root().display());

        if append {
            self.mounts.push(mount);
        } else {
            self.mounts.insert(0, mount);
        }
        Ok(())
    }

    pub fn unmount(&mut self, path: impl AsRef<Path>) -> bool {
        let before = self.mounts.len();
        self.mounts.retain(|m| m.root() != path.as_ref());
        before != self.mounts.len()
    }

    pub fn search_path(&self) -> Vec<PathBuf> {
        self.mounts.iter().map(|m| m.root().to_path_buf()).collect()
    }

    pub fn exists(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(vpath) => self.mounts.iter().any(|m| m.contains(&vpath)),
            Err(_) => false,
        }
    }

    /// Root of the mount that would serve `path`.
    pub fn locate(&self, path: &str) -> Option<PathBuf> {
        let vpath = normalize(path).ok()?;
        self.mounts
            .iter()
            .find(|m| m.contains(&vpath))
            .map(|m| m.root().to_path_buf())
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, TentacleError> {
        let vpath = normalize(path)?;
        for mount in &self.mounts {
            if let Some(bytes) = mount.read(&vpath)? {
                return Ok(bytes);
            }
        }

        Err(TentacleError::AssetError(format!("File not found in search path: {}", vpath)))
    }

    pub fn read_to_string(&self, path: &str) -> Result<String, TentacleError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|_| TentacleError::AssetError(format!("File is not valid UTF-8: {}", path)))
    }

    pub fn fingerprint(&self, path: &str) -> Option<Fingerprint> {
        match self.read(path) {
            Ok(bytes) => Some(Fingerprint::of(&bytes)),
            Err(e) => {
                log::debug!("No fingerprint for {}: {}", path, e);
                None
            }
        }
    }

    /// Every visible file across all mounts, sorted and deduplicated.
    pub fn list(&self) -> Vec<String> {
        let mut files = BTreeSet::new();
        for mount in &self.mounts {
            files.extend(mount.files());
        }
        files.into_iter().collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    pub fn write_archive(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in files {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    pub fn write_file(root: &Path, name: &str, contents: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
