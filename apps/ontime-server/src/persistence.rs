use std::io;
use std::path::{Path, PathBuf};

use rundown::ProjectFile;
use show_control::LogOrigin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::ServerError;

/// Read a project file; a missing file is not an error, a malformed one is
pub async fn load_project(path: &Path) -> Result<Option<ProjectFile>, ServerError> {
	match tokio::fs::read_to_string(path).await {
		Ok(json) => {
			let file = ProjectFile::from_json(&json)?;
			info!(origin = %LogOrigin::Server, path = %path.display(), entries = file.rundown.len(), "project loaded");
			Ok(Some(file))
		}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			info!(origin = %LogOrigin::Server, path = %path.display(), "no project file yet, starting empty");
			Ok(None)
		}
		Err(e) => Err(e.into()),
	}
}

/// Replace the file through a sibling temp file and a rename
pub async fn write_project(path: &Path, file: &ProjectFile) -> Result<(), ServerError> {
	let json = file.to_json_pretty()?;
	let tmp = path.with_extension("tmp");
	tokio::fs::write(&tmp, json).await?;
	tokio::fs::rename(&tmp, path).await?;
	Ok(())
}

/// Save every snapshot the show sends; ends once the show drops its sender
pub fn spawn_writer(path: PathBuf, mut snapshot_rx: mpsc::Receiver<ProjectFile>) -> JoinHandle<()> {
	tokio::spawn(async move {
		while let Some(mut file) = snapshot_rx.recv().await {
			// only the newest one is worth writing
			while let Ok(newer) = snapshot_rx.try_recv() {
				file = newer;
			}
			match write_project(&path, &file).await {
				Ok(()) => debug!(path = %path.display(), "project saved"),
				Err(e) => error!(origin = %LogOrigin::Server, path = %path.display(), error = %e, "failed to save project"),
			}
		}
		debug!("project writer finished");
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rundown::{Entry, OntimeEvent, ProjectData, MINUTE_MS};

	fn project(title: &str) -> ProjectFile {
		ProjectFile {
			project: ProjectData {
				title: title.to_string(),
				description: String::new(),
			},
			rundown: vec![Entry::from(OntimeEvent::new("a", 0, MINUTE_MS).with_cue("1"))],
			..ProjectFile::default()
		}
	}

	#[tokio::test]
	async fn written_project_loads_back() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("show.json");

		write_project(&path, &project("Gala")).await.unwrap();
		let loaded = load_project(&path).await.unwrap().unwrap();
		assert_eq!(loaded, project("Gala"));
		assert!(!path.with_extension("tmp").exists());
	}

	#[tokio::test]
	async fn missing_file_starts_empty() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load_project(&dir.path().join("nope.json")).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn malformed_file_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("broken.json");
		tokio::fs::write(&path, "{ \"rundown\": 3 }").await.unwrap();
		assert!(matches!(load_project(&path).await, Err(ServerError::Project(_))));
	}

	#[tokio::test]
	async fn writer_keeps_the_latest_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("show.json");
		let (tx, rx) = mpsc::channel(4);

		tx.send(project("first")).await.unwrap();
		tx.send(project("second")).await.unwrap();
		drop(tx);
		spawn_writer(path.clone(), rx).await.unwrap();

		let loaded = load_project(&path).await.unwrap().unwrap();
		assert_eq!(loaded.project.title, "second");
	}
}
