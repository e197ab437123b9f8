//! Image reference mapping: base filename → 1-based image number.

use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Lookup table from an image's base filename to its sequence number.
///
/// Built once from the extraction order and read-only afterwards. When two
/// images share a base filename, the later one wins and the name is listed
/// in [`ImageRefMap::collisions`].
#[derive(Debug, Clone, Default)]
pub struct ImageRefMap {
    numbers: HashMap<String, usize>,
    collisions: Vec<String>,
}

impl ImageRefMap {
    pub fn build<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut map = Self::default();
        for (i, path) in paths.iter().enumerate() {
            let number = i + 1;
            let name = file_name(path.as_ref());
            if let Some(previous) = map.numbers.insert(name.clone(), number) {
                warn!(
                    "Image filename '{}' used by images {} and {}; references resolve to {}",
                    name, previous, number, number
                );
                if !map.collisions.contains(&name) {
                    map.collisions.push(name);
                }
            }
        }
        map
    }

    pub fn get(&self, file_name: &str) -> Option<usize> {
        self.numbers.get(file_name).copied()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Base filenames that more than one image mapped to.
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }
}

/// Last path component as a string, or the whole path if it has none.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
