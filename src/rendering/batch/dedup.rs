use std::collections::HashMap;
use std::ops::Index;

use crate::rendering::common::types::{SourceImage, VertexStream};

pub(crate) type ContentHash = blake3::Hash;

/// A table of unique entries addressed by the hash of their content.
#[derive(Debug)]
pub(crate) struct DedupTable<T> {
    entries: Vec<T>,
    /// The hash each entry is found by, `None` once it has been retired.
    keys: Vec<Option<ContentHash>>,
    lookup: HashMap<ContentHash, usize>,
}

impl<T> Default for DedupTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            keys: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<T> DedupTable<T> {
    /// Returns the index of the entry with `hash`, calling `make` only if there is none yet. The flag is true when
    /// a new entry has been created.
    pub fn get_or_insert_with(&mut self, hash: ContentHash, make: impl FnOnce() -> T) -> (usize, bool) {
        if let Some(&index) = self.lookup.get(&hash) {
            return (index, false);
        }

        self.entries.push(make());
        self.keys.push(Some(hash));
        let index = self.entries.len() - 1;
        self.lookup.insert(hash, index);
        (index, true)
    }

    /// Stops resolving submissions to the entry at `index`. The entry itself stays valid.
    pub fn retire(&mut self, index: usize) {
        let Some(old) = self.keys.get_mut(index).and_then(Option::take) else {
            return;
        };
        if self.lookup.get(&old) == Some(&index) {
            self.lookup.remove(&old);
        }
    }

    /// Has to be called whenever the content at `index` changes. When another entry already has that content,
    /// lookups keep resolving to the other one.
    pub fn rehash(&mut self, index: usize, hash: ContentHash) {
        if index >= self.entries.len() {
            return;
        }

        self.retire(index);
        if *self.lookup.entry(hash).or_insert(index) == index {
            self.keys[index] = Some(hash);
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }
}

impl<T> Index<usize> for DedupTable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.entries[index]
    }
}

/// Covers every stream, its semantic included, so arrays sharing positions but not their other attributes never
/// alias.
pub(crate) fn hash_vertex_streams(streams: &[VertexStream]) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"vertices");
    for stream in streams {
        hasher.update(&u32::from(stream.semantic()).to_le_bytes());
        hasher.update(&(stream.len() as u64).to_le_bytes());
        hasher.update(stream.as_bytes());
    }
    hasher.finalize()
}

/// Mirrored and unmirrored variants of the same indices are different content.
pub(crate) fn hash_indices(indices: &[u32], mirrored: bool) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"indices");
    hasher.update(&[mirrored as u8]);
    hasher.update(bytemuck::cast_slice(indices));
    hasher.finalize()
}

/// The usage takes part, as it decides the format an image ends up in.
pub(crate) fn hash_image(image: &SourceImage) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"image");
    hasher.update(&image.width.to_le_bytes());
    hasher.update(&image.height.to_le_bytes());
    hasher.update(&[image.srgb as u8, image.usage as u8]);
    hasher.update(&image.pixels);
    hasher.finalize()
}
