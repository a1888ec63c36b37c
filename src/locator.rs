//! Photo discovery for an entity name.
//!
//! Lookup runs an ordered chain of [`LocateStrategy`] values. In
//! [`LocateMode::Main`] the first strategy that yields objects wins; in
//! [`LocateMode::All`] every strategy contributes and results are merged in
//! chain order. Store failures inside a strategy are logged and count as
//! "nothing found", so the chain always degrades to the placeholder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::config::LocatorConfig;
use crate::model::photo::{Generation, PhotoHandle};
use crate::model::photo_album::PhotoSet;
use crate::names::NameCandidates;
use crate::store::{join_path, ObjectPath, ObjectStore, StoreEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMode {
    Main,
    All,
}

#[async_trait]
pub trait LocateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Objects found for the entity, or `None` when this strategy yielded nothing.
    async fn locate(&self, store: &dyn ObjectStore, names: &NameCandidates) -> Option<Vec<ObjectPath>>;
}

/// Lists `folder`, logging and swallowing store errors.
pub(crate) async fn list_or_warn(
    store: &dyn ObjectStore,
    folder: &str,
    step: &'static str,
) -> Option<Vec<StoreEntry>> {
    match store.list(folder).await {
        Ok(entries) => Some(entries),
        Err(err) => {
            tracing::warn!(step, folder, error = %err, "store listing failed");
            None
        }
    }
}

/// Folder entries matching the entity: exact (case-insensitive) matches
/// first, then folders containing a candidate. Candidate order is kept
/// within each group.
pub fn matching_folders(entries: &[StoreEntry], names: &NameCandidates) -> Vec<String> {
    let folders: Vec<&StoreEntry> = entries.iter().filter(|e| e.is_folder).collect();
    let candidates = names.folder_candidates();

    let mut matches: Vec<String> = Vec::new();
    for candidate in &candidates {
        for folder in folders.iter().filter(|f| f.name.to_lowercase() == *candidate) {
            push_unique(&mut matches, &folder.name);
        }
    }
    for candidate in &candidates {
        for folder in folders.iter().filter(|f| f.name.to_lowercase().contains(candidate.as_str())) {
            push_unique(&mut matches, &folder.name);
        }
    }

    matches
}

fn push_unique(matches: &mut Vec<String>, name: &str) {
    if !matches.iter().any(|m| m == name) {
        matches.push(name.to_string());
    }
}

/// Entity folder found in the bucket root; exact names beat partial ones.
pub struct FolderMatch;

#[async_trait]
impl LocateStrategy for FolderMatch {
    fn name(&self) -> &'static str {
        "folder-match"
    }

    async fn locate(&self, store: &dyn ObjectStore, names: &NameCandidates) -> Option<Vec<ObjectPath>> {
        let root = list_or_warn(store, "", self.name()).await?;
        let folder = matching_folders(&root, names).into_iter().next()?;
        tracing::debug!(folder = %folder, "matched entity folder");

        let mut files: Vec<String> = list_or_warn(store, &folder, self.name())
            .await?
            .into_iter()
            .filter(StoreEntry::is_jpeg)
            .map(|e| e.name)
            .collect();
        if files.is_empty() {
            tracing::debug!(folder = %folder, "entity folder holds no photos");
            return None;
        }

        files.sort();
        Some(files.iter().map(|f| ObjectPath::new(join_path(&folder, f))).collect())
    }
}

/// Flat layout from before per-entity folders: `<firstToken><digits>.jpg` in the root.
pub struct LegacyFlat;

#[async_trait]
impl LocateStrategy for LegacyFlat {
    fn name(&self) -> &'static str {
        "legacy-flat"
    }

    async fn locate(&self, store: &dyn ObjectStore, names: &NameCandidates) -> Option<Vec<ObjectPath>> {
        let pattern = format!(r"(?i)^{}(\d+)\.jpe?g$", regex::escape(&names.first_token));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(err) => {
                tracing::warn!(error = %err, "invalid legacy name pattern");
                return None;
            }
        };

        let root = list_or_warn(store, "", self.name()).await?;
        let mut found: Vec<(u64, String)> = root
            .into_iter()
            .filter(|e| !e.is_folder)
            .filter_map(|e| {
                let seq = re.captures(&e.name)?.get(1)?.as_str().parse().ok()?;
                Some((seq, e.name))
            })
            .collect();
        if found.is_empty() {
            return None;
        }

        found.sort();
        Some(found.into_iter().map(|(_, name)| ObjectPath::new(name)).collect())
    }
}

/// Direct probes of conventional paths such as `<name>/<name>1.jpg`.
pub struct ConventionalProbe;

impl ConventionalProbe {
    pub fn paths(names: &NameCandidates) -> Vec<String> {
        let lower = names.lowercase();
        let mut paths = vec![
            format!("{0}/{0}1.jpg", names.full),
            format!("{}/1.jpg", names.full),
            format!("{0}/{0}1.jpg", lower),
            format!("{}/{}", names.full, names.file_name(1)),
            format!("{}/{}", names.base_name, names.file_name(1)),
        ];
        let mut seen = Vec::with_capacity(paths.len());
        paths.retain(|p| {
            let fresh = !seen.contains(p);
            seen.push(p.clone());
            fresh
        });
        paths
    }
}

#[async_trait]
impl LocateStrategy for ConventionalProbe {
    fn name(&self) -> &'static str {
        "conventional-probe"
    }

    async fn locate(&self, store: &dyn ObjectStore, names: &NameCandidates) -> Option<Vec<ObjectPath>> {
        let mut listings: HashMap<String, Vec<StoreEntry>> = HashMap::new();
        let mut found = Vec::new();

        for path in Self::paths(names) {
            let path = ObjectPath::new(path);
            let parent = path.parent().to_string();
            if !listings.contains_key(&parent) {
                let entries = list_or_warn(store, &parent, self.name()).await.unwrap_or_default();
                listings.insert(parent.clone(), entries);
            }

            let exists = listings
                .get(&parent)
                .map_or(false, |entries| entries.iter().any(|e| !e.is_folder && e.name == path.file_name()));
            if exists {
                found.push(path);
            }
        }

        if found.is_empty() {
            None
        } else {
            Some(found)
        }
    }
}

pub fn default_strategies() -> Vec<Box<dyn LocateStrategy>> {
    vec![Box::new(FolderMatch), Box::new(LegacyFlat), Box::new(ConventionalProbe)]
}

/// Hands out strictly increasing generations based on wall-clock milliseconds.
#[derive(Debug, Default)]
pub struct GenerationClock {
    last: AtomicU64,
}

impl GenerationClock {
    pub fn next(&self) -> Generation {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        Generation(now.max(prev + 1))
    }
}

pub struct PhotoLocator {
    store: Arc<dyn ObjectStore>,
    config: LocatorConfig,
    strategies: Vec<Box<dyn LocateStrategy>>,
    clock: GenerationClock,
}

impl PhotoLocator {
    pub fn new(store: Arc<dyn ObjectStore>, config: LocatorConfig) -> Self {
        Self::with_strategies(store, config, default_strategies())
    }

    pub fn with_strategies(
        store: Arc<dyn ObjectStore>,
        config: LocatorConfig,
        strategies: Vec<Box<dyn LocateStrategy>>,
    ) -> Self {
        PhotoLocator {
            store,
            config,
            strategies,
            clock: GenerationClock::default(),
        }
    }

    /// Store-backed photos for `name`, without any placeholder substitution.
    ///
    /// Returns `None` for a blank name.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, name: &str, mode: LocateMode) -> Option<PhotoSet> {
        let names = NameCandidates::resolve(name)?;
        let generation = self.clock.next();

        let mut paths: Vec<ObjectPath> = Vec::new();
        for strategy in &self.strategies {
            let found = match strategy.locate(self.store.as_ref(), &names).await {
                Some(found) => found,
                None => {
                    tracing::debug!(strategy = strategy.name(), "strategy yielded nothing");
                    continue;
                }
            };

            tracing::debug!(strategy = strategy.name(), count = found.len(), "strategy found photos");
            for path in found {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            if mode == LocateMode::Main {
                break;
            }
        }

        let photos = paths
            .iter()
            .map(|p| PhotoHandle::stamped(&self.store.public_url(p.as_str()), generation))
            .collect();
        Some(PhotoSet::new(names.full, generation, photos))
    }

    pub async fn locate_all(&self, name: &str) -> Option<PhotoSet> {
        self.locate(name, LocateMode::All).await
    }

    /// First photo of the entity, else the placeholder. `None` for a blank name.
    pub async fn main_photo(&self, name: &str) -> Option<PhotoHandle> {
        let set = self.locate(name, LocateMode::Main).await?;
        match set.photos.into_iter().next() {
            Some(photo) => Some(photo),
            None => Some(self.placeholder(set.generation).await),
        }
    }

    /// Every photo of the entity, or just the placeholder when there are none.
    pub async fn all_photos(&self, name: &str) -> Vec<PhotoHandle> {
        match self.locate_all(name).await {
            None => Vec::new(),
            Some(set) if set.is_empty() => vec![self.placeholder(set.generation).await],
            Some(set) => set.photos,
        }
    }

    /// Shared placeholder object if present, else the static fallback image.
    pub async fn placeholder(&self, generation: Generation) -> PhotoHandle {
        let path = ObjectPath::new(self.config.placeholder_path.as_str());
        let present = list_or_warn(self.store.as_ref(), path.parent(), "placeholder")
            .await
            .map_or(false, |entries| entries.iter().any(|e| !e.is_folder && e.name == path.file_name()));

        if present {
            PhotoHandle::stamped(&self.store.public_url(path.as_str()), generation)
        } else {
            tracing::debug!("placeholder object missing, using fallback image");
            PhotoHandle::new(self.config.fallback_url.clone())
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}
