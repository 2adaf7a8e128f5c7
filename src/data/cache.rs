use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::LoadError;
use super::model::Dataset;

/// Single-slot, load-on-first-use dataset cache.
///
/// The source files are treated as static input: once a path has been
/// loaded it is served from memory for the rest of the process. Asking for
/// a different path replaces the slot.
#[derive(Default)]
pub struct DatasetCache {
    slot: Option<(PathBuf, Arc<Dataset>)>,
}

impl DatasetCache {
    /// Return the cached dataset for `path`, loading it with `load` on a miss.
    ///
    /// A failed load leaves the previous entry in place.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<Dataset>, LoadError>
    where
        F: FnOnce(&Path) -> Result<Dataset, LoadError>,
    {
        if let Some((cached_path, dataset)) = &self.slot {
            if cached_path == path {
                log::debug!("dataset cache hit for {}", path.display());
                return Ok(Arc::clone(dataset));
            }
        }

        let dataset = Arc::new(load(path)?);
        self.slot = Some((path.to_path_buf(), Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn source(&self) -> Option<&Path> {
        self.slot.as_ref().map(|(p, _)| p.as_path())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::data::model::Value;

    fn tiny(_: &Path) -> Result<Dataset, LoadError> {
        Ok(Dataset::from_rows(
            vec!["x".into()],
            vec![vec![Value::Integer(1)]],
        ))
    }

    #[test]
    fn same_path_loads_once() {
        let mut cache = DatasetCache::default();
        let calls = Cell::new(0);
        let path = Path::new("data.csv");

        for _ in 0..3 {
            let ds = cache
                .get_or_load(path, |p| {
                    calls.set(calls.get() + 1);
                    tiny(p)
                })
                .unwrap();
            assert_eq!(ds.len(), 1);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.source(), Some(path));
    }

    #[test]
    fn other_path_replaces_slot_and_failures_keep_it() {
        let mut cache = DatasetCache::default();
        let first = cache.get_or_load(Path::new("a.csv"), tiny).unwrap();

        let err = cache.get_or_load(Path::new("b.csv"), |p| {
            Err(LoadError::new(p, anyhow::anyhow!("boom")))
        });
        assert!(err.is_err());
        assert_eq!(cache.source(), Some(Path::new("a.csv")));
        let again = cache
            .get_or_load(Path::new("a.csv"), |_| panic!("should be cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&again, &first));

        cache.get_or_load(Path::new("b.csv"), tiny).unwrap();
        assert_eq!(cache.source(), Some(Path::new("b.csv")));
    }
}
