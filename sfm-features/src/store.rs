use crate::{Error, GlobalDescriptor, LocalFeatures, PairMatches, Result};
use log::*;
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Local features of every image, keyed by the image name.
pub type FeatureStore = Store<String, LocalFeatures>;

/// Global descriptors of every image, keyed by the image name.
pub type GlobalStore = Store<String, GlobalDescriptor>;

/// Matches of every image pair, keyed by the pair of image names in the order they were matched.
pub type MatchStore = Store<(String, String), PairMatches>;

/// A map persisted as one bincode file.
///
/// Nothing touches the disk until [`Store::save`] is called.
#[derive(Debug, Clone)]
pub struct Store<K, V> {
    path: PathBuf,
    entries: BTreeMap<K, V>,
}

impl<K, V> Store<K, V>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Creates an empty store which will be written to `path`, ignoring anything already there.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::create(path));
        }
        let file = File::open(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let entries =
            bincode::deserialize_from(BufReader::new(file)).map_err(|source| Error::Store {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, entries })
    }

    /// Loads the store at `path` unless `overwrite` is set, in which case an empty store is returned.
    pub fn open_or_create(path: impl Into<PathBuf>, overwrite: bool) -> Result<Self> {
        if overwrite {
            Ok(Self::create(path))
        } else {
            Self::open(path)
        }
    }

    /// Loads the store at `path`, failing if it does not exist.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::Io {
                path,
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter()
    }

    /// Writes the store next to its destination and renames it into place.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let staging = self.path.with_extension("partial");
        let file = File::create(&staging).map_err(|source| Error::Io {
            path: staging.clone(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), &self.entries).map_err(|source| {
            Error::Store {
                path: staging.clone(),
                source,
            }
        })?;
        std::fs::rename(&staging, &self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("wrote {} entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }
}

impl MatchStore {
    /// Retrieves the matches of a pair regardless of the order the pair was matched in.
    ///
    /// The returned matches index the features of `a` first.
    pub fn find_pair(&self, a: &str, b: &str) -> Option<PairMatches> {
        let key = (a.to_owned(), b.to_owned());
        if let Some(matches) = self.entries.get(&key) {
            return Some(matches.clone());
        }
        let (a, b) = key;
        self.entries.get(&(b, a)).map(PairMatches::swapped)
    }

    pub fn contains_pair(&self, a: &str, b: &str) -> bool {
        let key = (a.to_owned(), b.to_owned());
        if self.entries.contains_key(&key) {
            return true;
        }
        let (a, b) = key;
        self.entries.contains_key(&(b, a))
    }
}
