use serde::Serialize;

use crate::model::photo::{Generation, PhotoHandle};

/// Photos of one entity as observed in a single listing pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoSet {
    pub(crate) name: String,
    pub(crate) generation: Generation,
    pub(crate) photos: Vec<PhotoHandle>,
}

impl PhotoSet {
    pub fn new(name: impl Into<String>, generation: Generation, photos: Vec<PhotoHandle>) -> Self {
        PhotoSet { name: name.into(), generation, photos }
    }

    pub fn empty(name: impl Into<String>, generation: Generation) -> Self {
        Self::new(name, generation, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn photos(&self) -> &[PhotoHandle] {
        &self.photos
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn contains(&self, handle: &PhotoHandle) -> bool {
        self.photos.contains(handle)
    }

    pub fn urls(&self) -> Vec<String> {
        self.photos.iter().map(|p| p.url().to_string()).collect()
    }
}
