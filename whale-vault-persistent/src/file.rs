// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, BufRead as _, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use fs4::FileExt as _;

use super::Persist;

/// An exclusive lock on the state file, released when dropped.
struct Lock(fs_err::File);

impl Lock {
    fn acquire(file: fs_err::File, path: &Path) -> anyhow::Result<Self> {
        file.file().try_lock_exclusive().with_context(|| {
            format!(
                "Could not lock \"{}\". Is another Whale Vault process using it?",
                path.display()
            )
        })?;
        Ok(Lock(file))
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(error) = self.0.file().unlock() {
            tracing::warn!("Failed to unlock state file: {error}");
        }
    }
}

/// A [`Persist`] implementation storing the value as pretty-printed JSON at a given path.
///
/// The file is locked for as long as this value lives. Saving writes a sibling staging
/// file first and renames it over the original.
pub struct File<T> {
    _lock: Lock,
    path: PathBuf,
    value: T,
}

impl<T> std::ops::Deref for File<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Opens the file for reading and writing, creating it if needed. On Unix, only the
/// current user may read it since it can hold wallet addresses and code hashes.
fn open_options() -> fs_err::OpenOptions {
    let mut options = fs_err::OpenOptions::new();
    #[cfg(target_family = "unix")]
    fs_err::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
    options.create(true).read(true).write(true);
    options
}

impl<T: serde::de::DeserializeOwned> File<T> {
    /// Reads the value stored at `path`, or calls `default` if the file is missing or empty.
    pub fn read_or_create(
        path: &Path,
        default: impl FnOnce() -> anyhow::Result<T>,
    ) -> anyhow::Result<Self> {
        let lock = Lock::acquire(open_options().open(path)?, path)?;
        let mut reader = io::BufReader::new(&lock.0);
        let value = if reader.fill_buf()?.is_empty() {
            default()?
        } else {
            serde_json::from_reader(reader)
                .with_context(|| format!("invalid state file {}", path.display()))?
        };
        Ok(Self {
            _lock: lock,
            path: path.into(),
            value,
        })
    }

    /// The location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: serde::Serialize + serde::de::DeserializeOwned> Persist for File<T> {
    type Error = anyhow::Error;

    fn as_mut(this: &mut Self) -> &mut T {
        &mut this.value
    }

    fn persist(this: &mut Self) -> anyhow::Result<()> {
        let mut staging_path = this.path.clone();
        staging_path.set_extension("json.new");
        let staging_file = open_options().truncate(true).open(&staging_path)?;
        let mut writer = io::BufWriter::new(staging_file);

        let written = serde_json::to_writer_pretty(&mut writer, &this.value)
            .map_err(anyhow::Error::from)
            .and_then(|()| writer.flush().map_err(anyhow::Error::from));
        if let Err(error) = written {
            fs_err::remove_file(&staging_path)
                .with_context(|| format!("cleaning up after failed write: {error}"))?;
            return Err(error.context("failed to save the state file"));
        }
        fs_err::rename(&staging_path, &this.path)?;
        Ok(())
    }

    fn into_value(this: Self) -> T {
        this.value
    }
}
