use celwork_document::uuid::set_uuid_seed;
use celwork_document::{Cel, Image, Layer, LayerId, PixelFormat, Sprite};
use celwork_editor::commands::{AddCel, AddFrame, AddLayer, CopyCel, DisplaceFrames, MoveCel, RemoveFrame, RenameLayer, SetCelOpacity, SetPixels, WritePolicy};
use celwork_editor::{Document, DocumentChange, DocumentInfo, EditorError, Modification, RecoverySession, Site};
use glam::UVec2;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

const RED: [u8; 4] = [255, 0, 0, 255];

fn init() {
	let _ = env_logger::builder().is_test(true).try_init();
	set_uuid_seed(0);
}

/// An 8x8 RGB document with 8 frames and one image layer holding cels at frames 1, 3 and 5.
fn document_with_cels() -> (Document, LayerId) {
	init();
	let mut sprite = Sprite::new(PixelFormat::Rgb, 8, 8, 8);
	let layer = sprite.add_layer(sprite.root(), Layer::new_image().with_name("Ink")).unwrap();
	for frame in [1, 3, 5] {
		sprite.add_cel(layer, Cel::from_image(frame, Image::new(PixelFormat::Rgb, 8, 8))).unwrap();
	}
	(Document::new(sprite).unwrap(), layer)
}

fn commit_rename(document: &mut Document, layer: LayerId, name: &str) {
	let mut transaction = document.begin_transaction(name, Modification::ModifyDocument);
	transaction.execute(RenameLayer::new(layer, name)).unwrap();
	transaction.commit();
}

fn frames(document: &Document, layer: LayerId) -> Vec<i32> {
	document.sprite().image_layer(layer).unwrap().cels().iter().map(Cel::frame).collect()
}

#[test]
fn rollback_restores_the_exact_sprite() {
	let (mut document, layer) = document_with_cels();
	let before = document.sprite().snapshot();

	let mut transaction = document.begin_transaction("Shuffle", Modification::ModifyDocument);
	let folder = AddLayer::new(transaction.sprite().root(), Layer::new_folder());
	let folder_id = folder.layer_id();
	transaction.execute(folder).unwrap();
	transaction.execute(AddFrame::new(0)).unwrap();
	transaction.execute(CopyCel::new((layer, 2), (layer, 0), true)).unwrap();
	transaction.execute(SetPixels::new(layer, 0, UVec2::ZERO, UVec2::ONE, RED.to_vec(), WritePolicy::Linked)).unwrap();
	transaction.execute(DisplaceFrames::new(layer, 4, 2)).unwrap();
	transaction.execute(RemoveFrame::new(1)).unwrap();
	transaction.sprite().validate().unwrap();
	assert!(transaction.sprite().contains_layer(folder_id));
	transaction.rollback().unwrap();

	assert_eq!(document.sprite().snapshot(), before);
	assert!(!document.sprite().contains_layer(folder_id));
	assert!(!document.can_undo());
	assert!(!document.is_dirty());
}

#[test]
fn undo_then_redo_restores_every_committed_state() {
	let (mut document, layer) = document_with_cels();
	let mut states = vec![document.sprite().snapshot()];

	let mut transaction = document.begin_transaction("Displace", Modification::ModifyDocument);
	transaction.execute(DisplaceFrames::new(layer, 3, 2)).unwrap();
	transaction.commit();
	assert_eq!(frames(&document, layer), [1, 5, 7]);
	states.push(document.sprite().snapshot());

	let mut transaction = document.begin_transaction("Move", Modification::ModifyDocument);
	transaction.execute(MoveCel::new((layer, 1), (layer, 0))).unwrap();
	transaction.execute(SetCelOpacity::new(layer, 0, 100)).unwrap();
	transaction.commit();
	states.push(document.sprite().snapshot());

	for state in states.iter().rev().skip(1) {
		document.undo().unwrap();
		assert_eq!(&document.sprite().snapshot(), state);
	}
	assert_eq!(document.undo(), Err(EditorError::NothingToUndo));

	for state in states.iter().skip(1) {
		document.redo().unwrap();
		assert_eq!(&document.sprite().snapshot(), state);
	}
	assert_eq!(document.redo(), Err(EditorError::NothingToRedo));
}

#[test]
fn committing_after_undo_discards_the_redo_tail() {
	let (mut document, layer) = document_with_cels();
	commit_rename(&mut document, layer, "T1");
	commit_rename(&mut document, layer, "T2");
	document.undo().unwrap();
	commit_rename(&mut document, layer, "T3");

	assert_eq!(document.history().labels(), ["T1", "T3"]);
	assert!(!document.can_redo());
	document.undo().unwrap();
	assert_eq!(document.sprite().layer(layer).unwrap().name(), "T1");
}

#[test]
fn dirty_state_follows_the_save_point() {
	let (mut document, layer) = document_with_cels();
	assert!(!document.is_dirty());

	commit_rename(&mut document, layer, "A");
	assert!(document.is_dirty());
	document.mark_as_saved();
	assert!(!document.is_dirty());

	let mut transaction = document.begin_transaction("Move site", Modification::NonModifying);
	transaction.set_site(Site { layer: Some(layer), frame: 3 });
	transaction.execute(RenameLayer::new(layer, "A")).unwrap();
	transaction.commit();
	assert!(!document.is_dirty());

	commit_rename(&mut document, layer, "B");
	document.undo().unwrap();
	assert!(!document.is_dirty());
	document.undo().unwrap();
	assert!(!document.is_dirty());
	assert_eq!(document.site(), Site { layer: Some(layer), frame: 0 });
	document.undo().unwrap();
	assert!(document.is_dirty());
	document.redo().unwrap();
	assert!(!document.is_dirty());
}

#[test]
fn dropped_transaction_leaves_history_untouched() {
	let (mut document, layer) = document_with_cels();
	commit_rename(&mut document, layer, "Saved");
	let (can_undo, len, dirty, before) = (document.can_undo(), document.history().len(), document.is_dirty(), document.sprite().snapshot());

	let mut transaction = document.begin_transaction("Never committed", Modification::ModifyDocument);
	transaction.execute(AddFrame::new(6)).unwrap();
	transaction.execute(AddCel::new(layer, Cel::from_image(6, Image::new(PixelFormat::Rgb, 8, 8)))).unwrap();
	drop(transaction);

	assert_eq!(document.can_undo(), can_undo);
	assert_eq!(document.history().len(), len);
	assert_eq!(document.is_dirty(), dirty);
	assert_eq!(document.sprite().snapshot(), before);
}

#[test]
fn pixel_writes_respect_the_write_policy() {
	let (mut document, layer) = document_with_cels();
	let mut transaction = document.begin_transaction("Link", Modification::ModifyDocument);
	transaction.execute(CopyCel::new((layer, 1), (layer, 2), true)).unwrap();
	transaction.commit();
	let linked = document.sprite().snapshot();

	let pixel = |document: &Document, frame| document.sprite().find_cel(layer, frame).unwrap().image().pixel(0, 0).unwrap().to_vec();
	let shared = |document: &Document| Arc::ptr_eq(document.sprite().find_cel(layer, 1).unwrap().image(), document.sprite().find_cel(layer, 2).unwrap().image());

	let mut transaction = document.begin_transaction("Paint one", Modification::ModifyDocument);
	transaction.execute(SetPixels::new(layer, 2, UVec2::ZERO, UVec2::ONE, RED.to_vec(), WritePolicy::CloneOnWrite)).unwrap();
	transaction.commit();
	assert_eq!(pixel(&document, 2), RED);
	assert_eq!(pixel(&document, 1), [0; 4]);
	assert!(!shared(&document));
	document.undo().unwrap();
	assert!(shared(&document));
	assert_eq!(document.sprite().snapshot(), linked);

	let mut transaction = document.begin_transaction("Paint both", Modification::ModifyDocument);
	transaction.execute(SetPixels::new(layer, 2, UVec2::ZERO, UVec2::ONE, RED.to_vec(), WritePolicy::Linked)).unwrap();
	transaction.commit();
	assert_eq!(pixel(&document, 1), RED);
	assert_eq!(pixel(&document, 3), [0; 4]);
	assert!(shared(&document));
	document.undo().unwrap();
	assert_eq!(document.sprite().snapshot(), linked);
}

#[test]
fn observers_and_recovery_follow_modifying_changes() {
	let directory = tempfile::tempdir().unwrap();
	let (document, layer) = document_with_cels();
	let mut document = document.with_filename("walk.ase");

	let mut session = RecoverySession::new(directory.path().join("20261019-120000-7"));
	session.create(7).unwrap();
	document.add_observer(session.clone());

	let labels = Arc::new(Mutex::new(Vec::new()));
	let recorded = Arc::clone(&labels);
	document.add_observer(move |_: &DocumentInfo, _: &Sprite, change: &DocumentChange| {
		recorded.lock().unwrap().push(change.label().to_string());
		Ok(())
	});

	let mut transaction = document.begin_transaction("Select", Modification::NonModifying);
	transaction.set_site(Site { layer: Some(layer), frame: 5 });
	transaction.commit();
	assert!(session.is_empty());

	commit_rename(&mut document, layer, "Outline");
	document.undo().unwrap();
	assert_eq!(*labels.lock().unwrap(), ["Outline", "Outline"]);

	let backups = session.backups();
	assert_eq!(backups.len(), 1);
	assert_eq!(backups[0].description(), "RGB Sprite 8x8, 8 frames: walk.ase");
	let restored = session.restore_backup(&backups[0]).unwrap();
	assert_eq!(restored.sprite().snapshot(), document.sprite().snapshot());
	assert_eq!(restored.filename(), "walk-Recovered.ase");

	session.remove_document(document.id()).unwrap();
	session.remove_from_disk().unwrap();
	assert!(!session.path().exists());
}
