use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use crossbeam::channel::Sender;
use zip::ZipArchive;
use crate::core::error::{Error, ErrorKind, Result};

/// One named blob from the dataset bundle.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Users,
    Locations,
    Visits,
}

impl MemberKind {
    /// Classify a member by its file name, e.g. `users_1.json`.
    /// Anything that is not a JSON member of a known entity is `None`.
    pub fn classify(name: &str) -> Option<MemberKind> {
        let file_name = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        if !file_name.ends_with(".json") {
            return None;
        }

        if file_name.contains("visit") {
            Some(MemberKind::Visits)
        } else if file_name.contains("location") {
            Some(MemberKind::Locations)
        } else if file_name.contains("user") {
            Some(MemberKind::Users)
        } else {
            None
        }
    }
}

/// Dataset container: a zip archive, or a directory holding the same members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
    Archive(PathBuf),
    Directory(PathBuf),
}

impl Bundle {
    pub fn open(path: &Path) -> Result<Bundle> {
        let metadata = fs::metadata(path).map_err(|e| Error {
            kind: ErrorKind::Io,
            context: format!("Cannot open dataset {}: {}", path.display(), e),
        })?;

        if metadata.is_dir() {
            Ok(Bundle::Directory(path.to_path_buf()))
        } else {
            Ok(Bundle::Archive(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Bundle::Archive(path) | Bundle::Directory(path) => path,
        }
    }

    /// Push every member into `sink` in bundle order. Stops quietly when the
    /// receiving side has gone away. Returns the number of members sent.
    pub fn stream(&self, sink: &Sender<Member>) -> Result<usize> {
        match self {
            Bundle::Archive(path) => stream_archive(path, sink),
            Bundle::Directory(path) => stream_directory(path, sink),
        }
    }
}

fn stream_archive(path: &Path, sink: &Sender<Member>) -> Result<usize> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut sent = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;

        if sink.send(Member { name, contents }).is_err() {
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

fn stream_directory(path: &Path, sink: &Sender<Member>) -> Result<usize> {
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut sent = 0;
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = fs::read(&file)?;

        if sink.send(Member { name, contents }).is_err() {
            break;
        }
        sent += 1;
    }

    Ok(sent)
}
