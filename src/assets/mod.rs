// src/assets/mod.rs
pub mod manifest;

pub use manifest::{read_manifest, ManifestEntry};

use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::{
    errors::TentacleError,
    vfs::{Fingerprint, VirtualFs},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Texture,
    Audio,
    Font,
    Data,
}

impl AssetKind {
    pub fn from_path(path: &str) -> Option<AssetKind> {
        let extension = Path::new(path).extension()?.to_str()?.to_lowercase();

        match extension.as_str() {
            "lua" => Some(AssetKind::Script),
            "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif" => Some(AssetKind::Texture),
            "wav" | "ogg" | "mp3" | "flac" => Some(AssetKind::Audio),
            "ttf" | "otf" | "fnt" => Some(AssetKind::Font),
            "json" | "xml" | "yaml" | "toml" | "csv" | "txt" => Some(AssetKind::Data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    name: String,
    path: String,
    kind: AssetKind,
    fingerprint: Option<Fingerprint>,
}

impl Asset {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            fingerprint: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    fn differs_from(&self, other: &Asset) -> bool {
        self.path != other.path || self.kind != other.kind || self.fingerprint != other.fingerprint
    }
}

/// Something that holds on to assets and must hear when they change.
pub trait AssetOwner {
    /// Called for assets that changed on disk or were added to the manifest.
    /// Returns whether the owner accepted the new version.
    fn on_asset_reload(&mut self, asset: &Asset) -> bool;

    fn on_asset_destroyed(&mut self, asset: &Asset);
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshReport {
    pub added: Vec<String>,
    pub reloaded: Vec<String>,
    pub rejected: Vec<String>,
    pub destroyed: Vec<String>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.reloaded.is_empty()
            && self.rejected.is_empty()
            && self.destroyed.is_empty()
    }
}

/// Name to path lookup driven by a Lua manifest, with change notification.
pub struct ManifestAssetStore {
    manifest_path: String,
    assets: HashMap<String, Asset>,
}

impl ManifestAssetStore {
    pub fn empty(manifest_path: impl Into<String>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            assets: HashMap::new(),
        }
    }

    pub fn load(vfs: &VirtualFs, manifest_path: &str) -> Result<Self, TentacleError> {
        let assets = Self::scan(vfs, manifest_path)?;
        log::info!("Loaded {} assets from {}", assets.len(), manifest_path);

        Ok(Self {
            manifest_path: manifest_path.to_string(),
            assets,
        })
    }

    fn scan(vfs: &VirtualFs, manifest_path: &str) -> Result<HashMap<String, Asset>, TentacleError> {
        let mut assets = HashMap::new();

        for entry in read_manifest(vfs, manifest_path)? {
            let kind = entry
                .kind
                .or_else(|| AssetKind::from_path(&entry.path))
                .unwrap_or(AssetKind::Data);
            let mut asset = Asset::new(entry.name, entry.path, kind);

            if !vfs.exists(&asset.path) {
                log::warn!("Asset [{}] points at missing file {}", asset.name, asset.path);
            }
            asset.fingerprint = vfs.fingerprint(&asset.path);

            if let Some(previous) = assets.insert(asset.name.clone(), asset) {
                log::warn!("Asset [{}] is declared more than once in {}", previous.name, manifest_path);
            }
        }

        Ok(assets)
    }

    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }

    /// Points the store at another manifest. Takes effect on the next refresh.
    pub fn set_manifest_path(&mut self, manifest_path: &str) {
        if self.manifest_path != manifest_path {
            log::info!("Manifest moved from {} to {}", self.manifest_path, manifest_path);
            self.manifest_path = manifest_path.to_string();
        }
    }

    pub fn asset_exists(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn get_asset_by_name(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.assets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Snapshot of name to path, for handing to scripts.
    pub fn index(&self) -> HashMap<String, String> {
        self.assets
            .values()
            .map(|asset| (asset.name.clone(), asset.path.clone()))
            .collect()
    }

    /// Re-reads the manifest and every asset, telling `owner` what changed.
    ///
    /// If the manifest no longer evaluates the store is left as it was.
    pub fn refresh(&mut self, vfs: &VirtualFs, owner: &mut dyn AssetOwner) -> Result<RefreshReport, TentacleError> {
        let fresh = Self::scan(vfs, &self.manifest_path)?;
        let mut report = RefreshReport::default();

        let mut removed: Vec<String> = self
            .assets
            .keys()
            .filter(|name| !fresh.contains_key(*name))
            .cloned()
            .collect();
        removed.sort();
        for name in removed {
            if let Some(asset) = self.assets.remove(&name) {
                log::info!("Asset [{}] was removed", name);
                owner.on_asset_destroyed(&asset);
                report.destroyed.push(name);
            }
        }

        let mut names: Vec<&String> = fresh.keys().collect();
        names.sort();
        for name in names {
            let asset = &fresh[name];
            match self.assets.get(name) {
                None => {
                    log::info!("Asset [{}] was added", name);
                    owner.on_asset_reload(asset);
                    report.added.push(name.clone());
                }
                Some(old) if old.differs_from(asset) => {
                    log::info!(
                        "Asset [{}] changed ({} -> {})",
                        name,
                        describe_fingerprint(old.fingerprint),
                        describe_fingerprint(asset.fingerprint)
                    );
                    if owner.on_asset_reload(asset) {
                        report.reloaded.push(name.clone());
                    } else {
                        report.rejected.push(name.clone());
                    }
                }
                Some(_) => {}
            }
        }

        self.assets = fresh;
        Ok(report)
    }

    pub fn clear_assets(&mut self, owner: &mut dyn AssetOwner) {
        let mut names = self.names();
        names.reverse();
        for name in names {
            if let Some(asset) = self.assets.remove(&name) {
                owner.on_asset_destroyed(&asset);
            }
        }
        log::info!("Cleared all assets");
    }
}

fn describe_fingerprint(fingerprint: Option<Fingerprint>) -> String {
    match fingerprint {
        Some(fingerprint) => fingerprint.to_string(),
        None => "missing".to_string(),
    }
}
