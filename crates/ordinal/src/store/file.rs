use crate::{Sequence, SequenceConfig, Store, StoreError};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

const EXTENSION: &str = ".json";

/// A [`Store`] keeping one pretty-printed JSON document per sequence in a
/// directory (`<dir>/<name>.json`).
///
/// Every mutation is staged in a hidden temp file in the same directory,
/// flushed to disk, then moved into place, so a crash leaves either the old
/// or the new record and never a torn one. Creation links the staged file
/// into place, which fails if the target exists; that keeps init one-shot
/// even across processes sharing the directory.
///
/// Names are used verbatim as file stems. The engine only hands over names
/// that pass [`validate_name`](crate::validate_name).
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    staged: AtomicU64,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            staged: AtomicU64::new(0),
        })
    }

    /// The directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{EXTENSION}"))
    }

    /// Writes `sequence` to a fresh hidden file and syncs it.
    fn stage(&self, name: &str, sequence: &Sequence) -> Result<PathBuf, StoreError> {
        let n = self.staged.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!(".{name}.{}.{n}.tmp", std::process::id()));
        let bytes = serde_json::to_vec_pretty(sequence)?;

        let result = File::create(&path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(err) = result {
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }
        Ok(path)
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> io::Result<()> {
        File::open(&self.dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Store for FileStore {
    fn init_sequence(
        &self,
        name: &str,
        config: &SequenceConfig,
        begin: i64,
    ) -> Result<(), StoreError> {
        let staged = self.stage(name, &Sequence::new(config.clone(), begin))?;
        let linked = fs::hard_link(&staged, self.path_of(name));
        let _ = fs::remove_file(&staged);
        match linked {
            Ok(()) => Ok(self.sync_dir()?),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Exists(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read(&self, name: &str) -> Result<Sequence, StoreError> {
        match fs::read(self.path_of(name)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::Missing(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, name: &str, sequence: &Sequence) -> Result<(), StoreError> {
        let target = self.path_of(name);
        if !target.try_exists()? {
            return Err(StoreError::Missing(name.to_string()));
        }
        let staged = self.stage(name, sequence)?;
        if let Err(err) = fs::rename(&staged, &target) {
            let _ = fs::remove_file(&staged);
            return Err(err.into());
        }
        Ok(self.sync_dir()?)
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(stem) = file_name.strip_suffix(EXTENSION) {
                names.push(stem.to_string());
            }
        }
        Ok(names)
    }
}
