//! File-backed data providers
//!
//! A [`DataProvider`] is a handle to one file of raw bytes inside the
//! manager's data directory. The [`DataProviderManager`] is the only
//! component that knows where those files live: everything else refers to a
//! provider by id and reaches its bytes through the scoped `with_reader` /
//! `with_writer` calls, which open the file for the duration of a closure
//! and close it on every exit path.
//!
//! Backing files are created lazily, on first write.

use crate::error::{Error, Result};
use crate::file_types;
use crate::ids::DataProviderId;
use crate::progress::ProgressNotifier;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Bytes copied per progress step when importing files
pub const IMPORT_CHUNK_SIZE: usize = 64 * 1024;

/// Handle to one backing file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataProvider {
    id: DataProviderId,
    mime_type: String,
    /// File name relative to the manager's data directory
    file_name: String,
    /// Whether the backing file has been created
    materialized: bool,
}

impl DataProvider {
    /// Describe a provider whose backing file already exists
    ///
    /// Used when re-registering providers read from a document. The file
    /// name must be a plain name inside the data directory.
    pub fn existing(
        id: DataProviderId,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        validate_file_name(&file_name)?;
        Ok(Self {
            id,
            mime_type: mime_type.into(),
            file_name,
            materialized: true,
        })
    }

    fn fresh(id: DataProviderId, mime_type: &str) -> Self {
        let file_name = format!("{}.{}", id, file_types::extension_for(mime_type));
        Self {
            id,
            mime_type: mime_type.to_string(),
            file_name,
            materialized: false,
        }
    }

    pub fn id(&self) -> &DataProviderId {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }
}

fn validate_file_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let plain = path.components().count() == 1
        && path.file_name().map(|f| f == path.as_os_str()).unwrap_or(false);
    if name.is_empty() || !plain {
        return Err(Error::structural(format!(
            "data provider file name {:?} must be a plain file name",
            name
        )));
    }
    Ok(())
}

/// Owner of every data provider of a presentation
#[derive(Debug)]
pub struct DataProviderManager {
    data_dir: PathBuf,
    providers: BTreeMap<DataProviderId, DataProvider>,
    /// Nesting depth of deferred-sweep scopes
    deferred: usize,
}

impl DataProviderManager {
    /// Create a manager storing its files under `data_dir`
    ///
    /// The directory is created on first write, not here.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            providers: BTreeMap::new(),
            deferred: 0,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Point the manager at another directory
    ///
    /// Only allowed while no provider has backing storage yet.
    pub fn set_data_dir(&mut self, data_dir: impl Into<PathBuf>) -> Result<()> {
        if self.providers.values().any(|p| p.materialized) {
            return Err(Error::AlreadyInitialized(format!(
                "data directory {} already holds provider files",
                self.data_dir.display()
            )));
        }
        self.data_dir = data_dir.into();
        Ok(())
    }

    /// Allocate a provider with a fresh id; its file is created on first write
    pub fn create_data_provider(&mut self, mime_type: &str) -> DataProviderId {
        let provider = DataProvider::fresh(DataProviderId::generate(), mime_type);
        let id = provider.id.clone();
        log::debug!("Created data provider {} ({})", id, mime_type);
        self.providers.insert(id.clone(), provider);
        id
    }

    /// Allocate a provider under a caller-chosen id
    pub fn create_data_provider_with_id(
        &mut self,
        id: DataProviderId,
        mime_type: &str,
    ) -> Result<DataProviderId> {
        self.add_data_provider(DataProvider::fresh(id.clone(), mime_type))?;
        Ok(id)
    }

    /// Register a provider that already carries an id
    pub fn add_data_provider(&mut self, provider: DataProvider) -> Result<()> {
        if self.providers.contains_key(&provider.id) {
            return Err(Error::structural(format!(
                "duplicate data provider id {}",
                provider.id
            )));
        }
        if self.providers.values().any(|p| p.file_name == provider.file_name) {
            return Err(Error::structural(format!(
                "data provider file {} is already managed",
                provider.file_name
            )));
        }
        self.providers.insert(provider.id.clone(), provider);
        Ok(())
    }

    /// Unregister a provider and delete its backing file
    pub fn remove_data_provider(&mut self, id: &DataProviderId) -> Result<DataProvider> {
        let provider = self
            .providers
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("data provider {}", id)))?;
        if provider.materialized {
            let path = self.data_dir.join(&provider.file_name);
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("Deleted {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(provider)
    }

    pub fn get(&self, id: &DataProviderId) -> Option<&DataProvider> {
        self.providers.get(id)
    }

    pub fn contains(&self, id: &DataProviderId) -> bool {
        self.providers.contains_key(id)
    }

    /// Providers in id order
    pub fn iter(&self) -> impl Iterator<Item = &DataProvider> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn provider(&self, id: &DataProviderId) -> Result<&DataProvider> {
        self.providers
            .get(id)
            .ok_or_else(|| Error::not_found(format!("data provider {}", id)))
    }

    /// Absolute path of a provider's backing file
    pub fn path_of(&self, id: &DataProviderId) -> Result<PathBuf> {
        Ok(self.data_dir.join(&self.provider(id)?.file_name))
    }

    /// Read a provider's bytes through a scoped reader
    ///
    /// A provider that was never written reads as empty. A provider whose
    /// file has disappeared fails with `MissingData`.
    pub fn with_reader<R>(
        &self,
        id: &DataProviderId,
        f: impl FnOnce(&mut dyn Read) -> Result<R>,
    ) -> Result<R> {
        let provider = self.provider(id)?;
        if !provider.materialized {
            return f(&mut io::empty());
        }
        let path = self.data_dir.join(&provider.file_name);
        let file = File::open(&path).map_err(|e| Error::missing_data(id, e))?;
        let mut reader = BufReader::new(file);
        f(&mut reader)
    }

    /// Replace a provider's bytes through a scoped writer
    pub fn with_writer<R>(
        &mut self,
        id: &DataProviderId,
        f: impl FnOnce(&mut dyn Write) -> Result<R>,
    ) -> Result<R> {
        self.write_scoped(id, false, f)
    }

    /// Append to a provider's bytes through a scoped writer
    pub fn with_appender<R>(
        &mut self,
        id: &DataProviderId,
        f: impl FnOnce(&mut dyn Write) -> Result<R>,
    ) -> Result<R> {
        self.write_scoped(id, true, f)
    }

    fn write_scoped<R>(
        &mut self,
        id: &DataProviderId,
        append: bool,
        f: impl FnOnce(&mut dyn Write) -> Result<R>,
    ) -> Result<R> {
        let path = self.path_of(id)?;
        fs::create_dir_all(&self.data_dir)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&path)?;
        if let Some(provider) = self.providers.get_mut(id) {
            provider.materialized = true;
        }
        let mut writer = BufWriter::new(file);
        let value = f(&mut writer)?;
        writer.flush()?;
        Ok(value)
    }

    pub fn read_all(&self, id: &DataProviderId) -> Result<Vec<u8>> {
        self.with_reader(id, |reader| {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    }

    pub fn write_all(&mut self, id: &DataProviderId, bytes: &[u8]) -> Result<()> {
        self.with_writer(id, |writer| Ok(writer.write_all(bytes)?))
    }

    /// Size of a provider's payload in bytes
    pub fn byte_len(&self, id: &DataProviderId) -> Result<u64> {
        let provider = self.provider(id)?;
        if !provider.materialized {
            return Ok(0);
        }
        let path = self.data_dir.join(&provider.file_name);
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| Error::missing_data(id, e))
    }

    /// Create the backing file of a provider that was never written
    pub fn ensure_storage(&mut self, id: &DataProviderId) -> Result<()> {
        if self.provider(id)?.materialized {
            return Ok(());
        }
        self.with_writer(id, |_| Ok(()))
    }

    /// Copy an external file into a new provider
    ///
    /// Progress is reported per [`IMPORT_CHUNK_SIZE`] chunk. If the copy is
    /// cancelled or fails, the partial provider is removed again.
    pub fn import_file(
        &mut self,
        source: &Path,
        mime_type: Option<&str>,
        progress: &mut ProgressNotifier,
    ) -> Result<DataProviderId> {
        let mime_type = match mime_type {
            Some(mime) => mime.to_string(),
            None => source
                .extension()
                .and_then(|e| e.to_str())
                .and_then(file_types::mime_for_extension)
                .unwrap_or(file_types::BINARY_MIME_TYPE)
                .to_string(),
        };
        let id = self.create_data_provider(&mime_type);
        match self.copy_into(&id, source, progress) {
            Ok(()) => Ok(id),
            Err(e) => {
                log::debug!("Import of {} aborted: {}", source.display(), e);
                self.remove_data_provider(&id)?;
                Err(e)
            }
        }
    }

    fn copy_into(
        &mut self,
        id: &DataProviderId,
        source: &Path,
        progress: &mut ProgressNotifier,
    ) -> Result<()> {
        let mut input = File::open(source)?;
        let total = input.metadata()?.len();
        progress.step("import", 0, total)?;
        self.with_writer(id, |writer| {
            let mut buffer = vec![0u8; IMPORT_CHUNK_SIZE];
            let mut copied = 0u64;
            loop {
                let read = input.read(&mut buffer)?;
                if read == 0 {
                    return Ok(());
                }
                writer.write_all(&buffer[..read])?;
                copied += read as u64;
                progress.step("import", copied, total)?;
            }
        })
    }

    // === DEFERRED SWEEP SCOPE ===

    /// Postpone orphan collection until the matching `exit_deferred`
    pub fn enter_deferred(&mut self) {
        self.deferred += 1;
    }

    /// Leave a deferred scope; returns true when the outermost scope closed
    pub fn exit_deferred(&mut self) -> bool {
        self.deferred = self.deferred.saturating_sub(1);
        self.deferred == 0
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred > 0
    }

    /// Remove every provider not named in `referenced`
    pub(crate) fn remove_unreferenced(
        &mut self,
        referenced: &HashSet<DataProviderId>,
    ) -> Result<Vec<DataProviderId>> {
        let orphans: Vec<DataProviderId> = self
            .providers
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
        for id in &orphans {
            self.remove_data_provider(id)?;
        }
        Ok(orphans)
    }

    /// Drop every provider not named in `referenced` from the table
    ///
    /// Backing files stay on disk.
    pub(crate) fn forget_unreferenced(&mut self, referenced: &HashSet<DataProviderId>) -> Vec<DataProvider> {
        let orphans: Vec<DataProviderId> = self
            .providers
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
        orphans
            .iter()
            .filter_map(|id| self.providers.remove(id))
            .collect()
    }
}
