//! Sharded YAML document storage.
//!
//! Every collection is a directory under the clinic data dir; every document
//! is a YAML file inside a sharded per-identifier directory:
//!
//! ```text
//! <collection_dir>/<s1>/<s2>/<record-id>/<doc>.yaml
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the identifier. This
//! module contains **only** data operations - no domain validation. Store
//! calls are point-in-time request/response operations; updates are whole-
//! document read-modify-write, and concurrent writers to the same record are
//! last-write-wins.

use crate::error::{ClinicError, ClinicResult};
use physio_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Returns the sharded directory a document with `id` lives in.
pub(crate) fn document_dir(collection_dir: &Path, id: RecordId) -> PathBuf {
    id.sharded_dir(collection_dir)
}

/// Allocates a fresh identifier and creates its sharded directory.
///
/// Guards against pathological identifier collisions (or pre-existing
/// directories from external interference) by retrying up to 5 times with
/// different identifiers from `id_source`.
///
/// # Errors
///
/// Returns [`ClinicError::DocumentDirCreation`] if a unique directory cannot
/// be created after 5 attempts, or [`ClinicError::StorageDirCreation`] if the
/// shard parents cannot be created.
pub(crate) fn allocate_document_dir(
    collection_dir: &Path,
    mut id_source: impl FnMut() -> RecordId,
) -> ClinicResult<(RecordId, PathBuf)> {
    for _attempt in 0..5 {
        let id = id_source();
        let candidate = id.sharded_dir(collection_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(ClinicError::StorageDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ClinicError::DocumentDirCreation(e)),
        }
    }

    Err(ClinicError::DocumentDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique document directory after 5 attempts",
    )))
}

/// Serialises `document` as YAML into `doc_dir/file_name`.
pub(crate) fn write_document<T: Serialize>(
    doc_dir: &Path,
    file_name: &str,
    document: &T,
) -> ClinicResult<()> {
    let yaml = serde_yaml::to_string(document).map_err(ClinicError::YamlSerialisation)?;
    fs::write(doc_dir.join(file_name), yaml).map_err(ClinicError::FileWrite)
}

/// Allocates an identifier, builds the document with it, and persists it.
///
/// If the write fails the just-allocated directory is rolled back so a failed
/// create leaves no trace in the collection.
pub(crate) fn create_document<T: Serialize>(
    collection_dir: &Path,
    file_name: &str,
    build: impl FnOnce(RecordId) -> T,
) -> ClinicResult<T> {
    let (id, doc_dir) = allocate_document_dir(collection_dir, RecordId::new)?;
    let document = build(id);

    if let Err(err) = write_document(&doc_dir, file_name, &document) {
        let _ = fs::remove_dir_all(&doc_dir);
        return Err(err);
    }

    Ok(document)
}

/// Reads the document with `id`, returning `Ok(None)` when it does not exist.
pub(crate) fn read_document<T: DeserializeOwned>(
    collection_dir: &Path,
    id: RecordId,
    file_name: &str,
) -> ClinicResult<Option<T>> {
    let path = id.sharded_dir(collection_dir).join(file_name);
    if !path.is_file() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path).map_err(ClinicError::FileRead)?;
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(ClinicError::YamlDeserialisation)
}

/// Removes the document directory for `id`. Returns whether it existed.
pub(crate) fn delete_document(collection_dir: &Path, id: RecordId) -> ClinicResult<bool> {
    let doc_dir = id.sharded_dir(collection_dir);
    if !doc_dir.is_dir() {
        return Ok(false);
    }

    fs::remove_dir_all(&doc_dir).map_err(ClinicError::FileDelete)?;
    Ok(true)
}

/// Reads every document in a collection.
///
/// Traverses the sharded directory structure and parses each `file_name`
/// found. Individual documents that cannot be read or parsed are logged as
/// warnings and skipped; a missing collection directory yields an empty list.
pub(crate) fn scan_documents<T: DeserializeOwned>(
    collection_dir: &Path,
    file_name: &str,
) -> Vec<T> {
    let mut documents = Vec::new();

    let s1_iter = match fs::read_dir(collection_dir) {
        Ok(it) => it,
        Err(_) => return documents,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for id_ent in id_iter.flatten() {
                let doc_path = id_ent.path().join(file_name);
                if !doc_path.is_file() {
                    continue;
                }

                match fs::read_to_string(&doc_path) {
                    Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
                        Ok(document) => documents.push(document),
                        Err(e) => {
                            tracing::warn!(
                                "failed to parse document: {} - {}",
                                doc_path.display(),
                                e
                            );
                        }
                    },
                    Err(e) => {
                        tracing::warn!("failed to read document: {} - {}", doc_path.display(), e);
                    }
                }
            }
        }
    }

    documents
}
