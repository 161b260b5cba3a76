mod support;

use soundboard::catalog::{Catalog, CatalogError, SoundDraft};
use soundboard::config::Config;
use soundboard::hotkeys::Key;
use soundboard::soundboard::{Soundboard, SoundboardError};
use soundboard::store::BlobStoreManager;

use crate::support::{tracing_init, RecordingBackend, SharedHandle};

fn draft(name: &str, file_id: &str, hotkey: &str, category: &str) -> SoundDraft {
    SoundDraft {
        name: Some(name.to_string()),
        file_id: Some(file_id.to_string()),
        hotkey: Some(hotkey.to_string()),
        category: Some(category.to_string()),
        ..SoundDraft::default()
    }
}

fn new_board() -> (
    Soundboard,
    BlobStoreManager,
    std::rc::Rc<std::cell::RefCell<Vec<SharedHandle>>>,
) {
    let store = BlobStoreManager::in_memory();
    let (backend, handles) = RecordingBackend::new();
    let board = Soundboard::with_parts(Catalog::new(), store.clone(), Box::new(backend));
    (board, store, handles)
}

#[tokio::test]
async fn duplicate_hotkey_leaves_the_bank_unchanged() {
    tracing_init();
    let (mut board, _, _) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();

    let mut clap = draft("Clap", &file_id, "c", "sound");
    clap.volume = Some(80);
    board.add_sound(clap).await.unwrap();
    assert_eq!(board.catalog().banks()[0].sounds.len(), 1);

    let err = board
        .add_sound(draft("Crash", &file_id, "c", "sound"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SoundboardError::Catalog(CatalogError::DuplicateHotkey(_))
    ));
    assert_eq!(board.catalog().banks()[0].sounds.len(), 1);
}

#[tokio::test]
async fn removing_a_sound_releases_its_clip() {
    let (mut board, store, _) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    board
        .add_sound(draft("Clap", &file_id, "c", "sound"))
        .await
        .unwrap();

    board.remove_sound(0).await.unwrap();

    assert!(board.catalog().banks()[0].sounds.is_empty());
    assert!(store.get(&file_id).await.is_err());
}

#[tokio::test]
async fn hotkeys_trigger_sounds_in_the_current_bank() {
    let (mut board, _, handles) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    board
        .add_sound(draft("Clap", &file_id, "c", "sound"))
        .await
        .unwrap();

    // Case-insensitive hit.
    board.handle_key(Key::Char('C'), false).await.unwrap();
    assert_eq!(handles.borrow().len(), 1);
    assert!(handles.borrow()[0].borrow().started);

    // Unbound keys do nothing.
    board.handle_key(Key::Char('z'), false).await.unwrap();
    assert_eq!(handles.borrow().len(), 1);
}

#[tokio::test]
async fn typing_suppresses_hotkeys_but_not_escape() {
    let (mut board, _, handles) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    let file_id2 = board.import_clip(b"music bytes").await.unwrap();
    board
        .add_sound(draft("Clap", &file_id, "c", "sound"))
        .await
        .unwrap();
    board
        .add_sound(draft("Anthem", &file_id2, "a", "music"))
        .await
        .unwrap();

    board.handle_key(Key::Char('c'), false).await.unwrap();
    board.handle_key(Key::Char('a'), false).await.unwrap();
    assert_eq!(board.engine().active_count(), 2);

    board.handle_key(Key::Char('c'), true).await.unwrap();
    assert_eq!(handles.borrow().len(), 2);

    board.handle_key(Key::Escape, true).await.unwrap();
    assert_eq!(board.engine().active_count(), 0);
    assert!(handles.borrow().iter().all(|h| h.borrow().stopped));
}

#[tokio::test]
async fn live_volume_and_loop_updates_reach_the_occupant() {
    let (mut board, _, handles) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    let mut clap = draft("Clap", &file_id, "c", "sound");
    clap.volume = Some(80);
    board.add_sound(clap).await.unwrap();

    board.set_global_volume(50);
    board.play(0).await.unwrap();
    assert!((handles.borrow()[0].borrow().volume - 0.4).abs() < 1e-6);

    board.change_volume(0, 50).await.unwrap();
    assert!((handles.borrow()[0].borrow().volume - 0.25).abs() < 1e-6);
    assert_eq!(board.catalog().banks()[0].sounds[0].volume, 50);

    board.toggle_loop(0).await.unwrap();
    assert!(handles.borrow()[0].borrow().looping);
    assert!(board.catalog().banks()[0].sounds[0].looping);
}

#[tokio::test]
async fn playing_a_sound_with_a_deleted_clip_is_reported_not_fatal() {
    tracing_init();
    let (mut board, store, _) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    board
        .add_sound(draft("Clap", &file_id, "c", "sound"))
        .await
        .unwrap();
    store.delete(&file_id).await.unwrap();

    board.play(0).await.unwrap();
    assert_eq!(board.engine().active_count(), 0);
}

#[tokio::test]
async fn backup_restore_roundtrip_through_the_controller() {
    let (mut board, _, _) = new_board();
    let file_id = board.import_clip(b"clap bytes").await.unwrap();
    board
        .add_sound(draft("Clap", &file_id, "c", "sound"))
        .await
        .unwrap();
    board.add_bank("Stage").await.unwrap();
    let json = board.backup().await.unwrap();

    let (mut fresh, fresh_store, _) = new_board();
    fresh.restore(&json).await.unwrap();

    assert_eq!(fresh.catalog().banks(), board.catalog().banks());
    assert_eq!(fresh.catalog().current_bank_index(), 0);
    assert_eq!(fresh_store.get(&file_id).await.unwrap(), b"clap bytes");
}

#[tokio::test]
async fn a_rejected_restore_leaves_the_catalog_untouched() {
    let (mut board, _, _) = new_board();
    board.add_bank("Stage").await.unwrap();

    let err = board.restore("{broken").await.unwrap_err();
    assert!(matches!(err, SoundboardError::Transfer(_)));
    assert_eq!(board.catalog().banks().len(), 2);
    assert_eq!(board.catalog().current_bank_index(), 1);
}

#[tokio::test]
async fn board_state_survives_reopen() {
    tracing_init();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
    };

    {
        let (backend, _) = RecordingBackend::new();
        let mut board = Soundboard::open(&config, Box::new(backend)).await;
        let file_id = board.import_clip(b"clap bytes").await.unwrap();
        board
            .add_sound(draft("Clap", &file_id, "c", "sound"))
            .await
            .unwrap();
        board.add_bank("Stage").await.unwrap();
    }

    let (backend, handles) = RecordingBackend::new();
    let mut board = Soundboard::open(&config, Box::new(backend)).await;
    assert_eq!(board.catalog().banks().len(), 2);
    assert_eq!(board.catalog().current_bank_index(), 1);
    assert_eq!(board.catalog().banks()[0].sounds[0].name, "Clap");

    // The stored clip is still there and playable after reopening.
    board.select_bank(0).await.unwrap();
    board.play(0).await.unwrap();
    assert_eq!(handles.borrow().len(), 1);
}
