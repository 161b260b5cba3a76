// Test support: blob store fakes and a recording audio backend

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use soundboard::catalog::Sound;
use soundboard::playback::{AudioBackend, AudioError, AudioHandle};
use soundboard::store::{BlobStore, StoreError};

/// Initialize tracing for tests with proper test output handling
#[allow(unused)]
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Build a sound whose hotkey is its id's first character.
#[allow(unused)]
pub fn sound(id: &str, file_id: &str, category: &str) -> Sound {
    Sound {
        id: id.to_string(),
        name: id.to_string(),
        file_id: file_id.to_string(),
        hotkey: id.chars().next().unwrap_or('x').to_string(),
        category: category.to_string(),
        volume: 100,
        looping: false,
    }
}

/// What the engine did to one audio handle.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleState {
    pub volume: f32,
    pub looping: bool,
    pub started: bool,
    pub stopped: bool,
}

pub type SharedHandle = Rc<RefCell<HandleState>>;

/// Audio backend that records every handle it creates instead of making
/// noise.
#[derive(Default)]
pub struct RecordingBackend {
    handles: Rc<RefCell<Vec<SharedHandle>>>,
}

impl RecordingBackend {
    /// Returns the backend and a live view of the handles it will create.
    #[allow(unused)]
    pub fn new() -> (Self, Rc<RefCell<Vec<SharedHandle>>>) {
        let backend = Self::default();
        let handles = backend.handles.clone();
        (backend, handles)
    }
}

impl AudioBackend for RecordingBackend {
    fn load(&self, _bytes: Vec<u8>) -> Result<Box<dyn AudioHandle>, AudioError> {
        let state = Rc::new(RefCell::new(HandleState {
            volume: 1.0,
            looping: false,
            started: false,
            stopped: false,
        }));
        self.handles.borrow_mut().push(state.clone());
        Ok(Box::new(RecordingHandle { state }))
    }
}

struct RecordingHandle {
    state: SharedHandle,
}

impl AudioHandle for RecordingHandle {
    fn start(&mut self) -> Result<(), AudioError> {
        self.state.borrow_mut().started = true;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.borrow_mut().looping = looping;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stopped = true;
    }
}

/// In-memory blob store that counts reads per key.
#[derive(Default)]
pub struct CountingStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    reads: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    #[allow(unused)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(unused)]
    pub fn reads(&self, key: &str) -> usize {
        self.reads.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl BlobStore for CountingStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        *self.reads.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory blob store whose reads of one key block until released, for
/// driving in-flight playback races deterministically.
pub struct GatedStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    gated_key: String,
    gate: Arc<Notify>,
}

impl GatedStore {
    /// Returns the store and the handle that releases reads of `gated_key`.
    #[allow(unused)]
    pub fn new(gated_key: &str) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(GatedStore {
            blobs: Mutex::new(HashMap::new()),
            gated_key: gated_key.to_string(),
            gate: gate.clone(),
        });
        (store, gate)
    }
}

#[async_trait::async_trait]
impl BlobStore for GatedStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        if key == self.gated_key {
            self.gate.notified().await;
        }
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}
