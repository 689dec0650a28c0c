use crate::consts::{CELWORK_VERSION, RECOVERED_FILENAME_SUFFIX, RECOVERY_INFO_FILE_NAME, RECOVERY_PID_FILE_NAME, RECOVERY_SPRITE_FILE_NAME, RECOVERY_VERSION_FILE_NAME};
use crate::document::{Document, DocumentId, DocumentInfo};
use crate::error::EditorError;
use crate::observer::{DocumentChange, DocumentObserver};

use celwork_document::{PixelFormat, Sprite, SpriteSnapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Summary of a backed up document, stored next to its snapshot so backups can be listed without loading them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BackupInfo {
	document: DocumentInfo,
	pixel_format: PixelFormat,
	width: u32,
	height: u32,
	frame_count: usize,
}

impl BackupInfo {
	fn new(document: &DocumentInfo, sprite: &Sprite) -> Self {
		Self {
			document: document.clone(),
			pixel_format: sprite.pixel_format(),
			width: sprite.width(),
			height: sprite.height(),
			frame_count: sprite.frame_count(),
		}
	}

	fn description(&self) -> String {
		let frames = if self.frame_count == 1 { "frame" } else { "frames" };
		format!(
			"{} Sprite {}x{}, {} {frames}: {}",
			self.pixel_format, self.width, self.height, self.frame_count, self.document.filename
		)
	}
}

/// A document found in a recovery session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
	dir: PathBuf,
	description: String,
}

impl Backup {
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// For example "RGB Sprite 32x32, 3 frames: walk.ase".
	pub fn description(&self) -> &str {
		&self.description
	}
}

/// A directory where the documents of one editor process are backed up after every change.
///
/// Each document gets a subdirectory named after its id holding a JSON snapshot of the sprite. The `pid` and `ver`
/// files identify the process that owns the session, so a later process can offer to restore the backups of one
/// that did not exit cleanly.
#[derive(Debug, Clone)]
pub struct RecoverySession {
	path: PathBuf,
	pid: Option<u32>,
}

impl RecoverySession {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), pid: None }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Human readable name of a session directory named "date-time-pid".
	pub fn name(&self) -> String {
		let title = self.path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
		let parts: Vec<&str> = title.split('-').collect();
		if let [date, time, pid] = parts[..] {
			return format!("Session date: {date} time: {time} (PID {pid})");
		}
		title
	}

	/// Marks the directory as the session of the process `pid`.
	pub fn create(&mut self, pid: u32) -> Result<(), EditorError> {
		std::fs::create_dir_all(&self.path)?;
		std::fs::write(self.pid_path(), pid.to_string())?;
		std::fs::write(self.version_path(), CELWORK_VERSION)?;
		self.pid = Some(pid);
		log::info!("Created recovery session at {}", self.path.display());
		Ok(())
	}

	/// The process that created the session, if it is recorded.
	pub fn pid(&mut self) -> Option<u32> {
		if self.pid.is_none() {
			self.pid = std::fs::read_to_string(self.pid_path()).ok().and_then(|pid| pid.trim().parse().ok());
		}
		self.pid
	}

	/// Whether the process that created the session is still alive. A session that is not running but still holds
	/// backups belongs to a process that crashed.
	pub fn is_running(&mut self) -> bool {
		let Some(pid) = self.pid() else { return false };
		let pid = Pid::from_u32(pid);
		let mut system = System::new();
		system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
		system.process(pid).is_some()
	}

	/// The Celwork version that created the session.
	pub fn version(&self) -> Option<String> {
		std::fs::read_to_string(self.version_path()).ok().map(|version| version.trim().to_string())
	}

	/// Whether the session holds no backed up document.
	pub fn is_empty(&self) -> bool {
		self.document_dirs().is_empty()
	}

	/// Deletes the session's marker files and its directory. A directory that still holds backups is kept.
	pub fn remove_from_disk(&self) -> Result<(), EditorError> {
		for path in [self.pid_path(), self.version_path()] {
			if path.is_file() {
				std::fs::remove_file(path)?;
			}
		}
		if let Err(error) = std::fs::remove_dir(&self.path) {
			log::debug!("Recovery session directory {} cannot be removed: {error}", self.path.display());
		}
		Ok(())
	}

	/// Writes the current state of a document, replacing its previous backup.
	pub fn save_document_changes(&self, document: &DocumentInfo, sprite: &Sprite) -> Result<(), EditorError> {
		let dir = self.document_dir(document.id);
		log::debug!("Saving backup of document {} to {}", document.id, dir.display());
		std::fs::create_dir_all(&dir)?;

		let snapshot = serde_json::to_vec(&sprite.snapshot())?;
		let info = serde_json::to_vec_pretty(&BackupInfo::new(document, sprite))?;
		write_replacing(&dir.join(RECOVERY_SPRITE_FILE_NAME), &snapshot)?;
		write_replacing(&dir.join(RECOVERY_INFO_FILE_NAME), &info)?;
		Ok(())
	}

	/// Deletes the backup of a document, for example once it was closed normally.
	pub fn remove_document(&self, id: DocumentId) -> Result<(), EditorError> {
		let dir = self.document_dir(id);
		if dir.is_dir() {
			std::fs::remove_dir_all(dir)?;
		}
		Ok(())
	}

	/// The backed up documents, ordered by directory name. Backups whose summary cannot be read are skipped.
	pub fn backups(&self) -> Vec<Backup> {
		self.document_dirs()
			.into_iter()
			.filter_map(|dir| match read_json::<BackupInfo>(&dir.join(RECOVERY_INFO_FILE_NAME)) {
				Ok(info) => Some(Backup { description: info.description(), dir }),
				Err(error) => {
					log::warn!("Skipping unreadable backup {}: {error}", dir.display());
					None
				}
			})
			.collect()
	}

	/// Rebuilds a backed up document. The recovered document gets a new id and a filename marked as recovered.
	pub fn restore_backup(&self, backup: &Backup) -> Result<Document, EditorError> {
		let info: BackupInfo = read_json(&backup.dir.join(RECOVERY_INFO_FILE_NAME))?;
		let snapshot: SpriteSnapshot = read_json(&backup.dir.join(RECOVERY_SPRITE_FILE_NAME))?;
		let sprite = Sprite::from_snapshot(&snapshot)?;

		let document = Document::new(sprite)?.with_filename(recovered_filename(&info.document.filename));
		log::info!("Restored backup {} as document {}", backup.dir.display(), document.id());
		Ok(document)
	}

	pub fn delete_backup(&self, backup: &Backup) -> Result<(), EditorError> {
		if backup.dir.is_dir() {
			std::fs::remove_dir_all(&backup.dir)?;
		}
		Ok(())
	}

	fn pid_path(&self) -> PathBuf {
		self.path.join(RECOVERY_PID_FILE_NAME)
	}

	fn version_path(&self) -> PathBuf {
		self.path.join(RECOVERY_VERSION_FILE_NAME)
	}

	fn document_dir(&self, id: DocumentId) -> PathBuf {
		self.path.join(id.to_string())
	}

	fn document_dirs(&self) -> Vec<PathBuf> {
		let Ok(entries) = std::fs::read_dir(&self.path) else { return Vec::new() };
		let mut dirs: Vec<_> = entries.filter_map(Result::ok).map(|entry| entry.path()).filter(|path| path.is_dir()).collect();
		dirs.sort();
		dirs
	}
}

impl DocumentObserver for RecoverySession {
	fn on_document_changed(&mut self, document: &DocumentInfo, sprite: &Sprite, change: &DocumentChange) -> Result<(), EditorError> {
		log::trace!("Backing up document {} after \"{}\"", document.id, change.label());
		self.save_document_changes(document, sprite)
	}
}

/// Writes next to the destination first so a crash mid-write never leaves a truncated file behind.
fn write_replacing(path: &Path, data: &[u8]) -> Result<(), EditorError> {
	let temporary = path.with_extension("tmp");
	std::fs::write(&temporary, data)?;
	std::fs::rename(&temporary, path)?;
	Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EditorError> {
	let data = std::fs::read(path)?;
	Ok(serde_json::from_slice(&data)?)
}

/// "art/walk.ase" becomes "art/walk-Recovered.ase". Untitled documents stay untitled.
fn recovered_filename(filename: &str) -> String {
	if filename.is_empty() {
		return String::new();
	}
	let path = Path::new(filename);
	let stem = path.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
	let name = match path.extension() {
		Some(extension) => format!("{stem}{RECOVERED_FILENAME_SUFFIX}.{}", extension.to_string_lossy()),
		None => format!("{stem}{RECOVERED_FILENAME_SUFFIX}"),
	};
	match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		Some(parent) => parent.join(name).to_string_lossy().into_owned(),
		None => name,
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::commands::{AddFrame, RenameLayer};
	use crate::test_utils::test_document;
	use crate::transaction::Modification;
	use celwork_document::DocumentError;
	use pretty_assertions::assert_eq;

	#[test]
	fn session_names_and_markers() {
		let directory = tempfile::tempdir().unwrap();
		let mut session = RecoverySession::new(directory.path().join("20261019-101500-4242"));
		assert_eq!(session.name(), "Session date: 20261019 time: 101500 (PID 4242)");
		assert_eq!(RecoverySession::new("scratch").name(), "scratch");

		session.create(4242).unwrap();
		assert_eq!(RecoverySession::new(session.path()).pid(), Some(4242));
		assert_eq!(session.version().as_deref(), Some(CELWORK_VERSION));
		assert!(session.is_empty());

		session.remove_from_disk().unwrap();
		assert!(!session.path().exists());
	}

	#[test]
	fn observed_documents_can_be_restored() {
		let directory = tempfile::tempdir().unwrap();
		let mut session = RecoverySession::new(directory.path());
		session.create(1).unwrap();

		let (document, layer) = test_document();
		let mut document = document.with_filename("art/walk.ase");
		document.add_observer(session.clone());
		let mut transaction = document.begin_transaction("Rename", Modification::ModifyDocument);
		transaction.execute(RenameLayer::new(layer, "Ink")).unwrap();
		transaction.commit();
		let mut transaction = document.begin_transaction("Add frame", Modification::ModifyDocument);
		transaction.execute(AddFrame::new(4)).unwrap();
		transaction.commit();

		let backups = session.backups();
		assert_eq!(backups.len(), 1);
		assert_eq!(backups[0].description(), "RGB Sprite 4x4, 5 frames: art/walk.ase");

		let restored = session.restore_backup(&backups[0]).unwrap();
		assert_eq!(restored.sprite().snapshot(), document.sprite().snapshot());
		assert_eq!(Path::new(restored.filename()), Path::new("art").join("walk-Recovered.ase"));
		assert_ne!(restored.id(), document.id());
		assert!(!restored.can_undo());

		session.delete_backup(&backups[0]).unwrap();
		assert!(session.is_empty());
	}

	#[test]
	fn removed_and_corrupt_backups_are_not_listed() {
		let directory = tempfile::tempdir().unwrap();
		let session = RecoverySession::new(directory.path());
		let (document, _) = test_document();
		session.save_document_changes(document.info(), document.sprite()).unwrap();
		assert_eq!(session.backups()[0].description(), "RGB Sprite 4x4, 4 frames: ");

		session.remove_document(document.id()).unwrap();
		assert!(session.is_empty());

		std::fs::create_dir(directory.path().join("broken")).unwrap();
		assert!(!session.is_empty());
		assert!(session.backups().is_empty());
	}

	#[test]
	fn live_sessions_are_told_apart_from_crashed_ones() {
		let directory = tempfile::tempdir().unwrap();
		let mut session = RecoverySession::new(directory.path().join("live"));
		assert!(!session.is_running());

		session.create(std::process::id()).unwrap();
		assert!(RecoverySession::new(session.path()).is_running());
	}

	#[test]
	fn corrupt_pixel_data_fails_to_restore() {
		let directory = tempfile::tempdir().unwrap();
		let session = RecoverySession::new(directory.path());
		let (document, _) = test_document();
		session.save_document_changes(document.info(), document.sprite()).unwrap();

		let backup = &session.backups()[0];
		let path = backup.dir().join(RECOVERY_SPRITE_FILE_NAME);
		let mut snapshot: serde_json::Value = read_json(&path).unwrap();
		snapshot["images"][0]["data"] = serde_json::json!([0]);
		std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

		assert_eq!(
			session.restore_backup(backup).err(),
			Some(EditorError::PreconditionViolated(DocumentError::InvalidPixelData { expected: 64, found: 1 }))
		);
	}

	#[test]
	fn recovered_filenames_keep_their_extension() {
		assert_eq!(recovered_filename("walk.ase"), "walk-Recovered.ase");
		assert_eq!(recovered_filename("walk"), "walk-Recovered");
		assert_eq!(recovered_filename(""), "");
	}
}
