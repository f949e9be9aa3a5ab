//! Shared test utilities: a scripted audio device and a fake assistant service

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::sync::watch;

use talkback::device::{CaptureHandle, PlaybackHandle, Release};
use talkback::{
    AudioDevice, AudioMode, BlobStore, CaptureOutcome, Config, Error, Interaction,
    InteractionStatus, PlaybackSource, PlatformKind, Result, TransportClient, platform,
};

/// How the fake answers permission requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Fails,
}

/// What the fake recorder produces on stop
#[derive(Debug, Clone)]
pub enum Recording {
    /// Finished recording with these bytes
    Audio(Vec<u8>),
    /// Nothing captured, no URI
    Empty,
    /// Bytes written but device does not report completion
    Unfinished(Vec<u8>),
}

/// Where the fake writes recordings
#[derive(Debug, Clone)]
pub enum Sink {
    Dir(PathBuf),
    Blobs(BlobStore),
}

/// Everything the fake device was asked to do
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub permission_requests: usize,
    pub modes: Vec<AudioMode>,
    pub captures_acquired: usize,
    pub captures_released: usize,
    pub playbacks_acquired: usize,
    pub playbacks_released: usize,
    pub playbacks_started: usize,
    pub loaded_now: usize,
    pub max_loaded: usize,
    pub sources: Vec<PlaybackSource>,
    /// Controller status seen when a recording was stopped
    pub status_at_stop: Vec<InteractionStatus>,
    /// Controller status seen when a reply was loaded
    pub status_at_load: Vec<InteractionStatus>,
}

/// Scripted [`AudioDevice`]
pub struct FakeDevice {
    pub permission: Cell<Permission>,
    pub recording: RefCell<Recording>,
    pub fail_playback_start: Cell<bool>,
    pub sink: Sink,
    pub log: Rc<RefCell<DeviceLog>>,
    /// Status feed sampled from inside device calls
    pub status: RefCell<Option<watch::Receiver<InteractionStatus>>>,
}

impl FakeDevice {
    pub fn new(sink: Sink) -> Rc<Self> {
        Rc::new(Self {
            permission: Cell::new(Permission::Granted),
            recording: RefCell::new(Recording::Audio(b"RIFF-fake-utterance".to_vec())),
            fail_playback_start: Cell::new(false),
            sink,
            log: Rc::new(RefCell::new(DeviceLog::default())),
            status: RefCell::new(None),
        })
    }

    /// Record the controller's status whenever a recording stops or a reply loads
    pub fn watch_status(&self, rx: watch::Receiver<InteractionStatus>) {
        *self.status.borrow_mut() = Some(rx);
    }

    fn current_status(&self) -> Option<InteractionStatus> {
        self.status.borrow().as_ref().map(|rx| *rx.borrow())
    }

    pub fn with_permission(sink: Sink, permission: Permission) -> Rc<Self> {
        let device = Self::new(sink);
        device.permission.set(permission);
        device
    }
}

#[async_trait(?Send)]
impl AudioDevice for FakeDevice {
    async fn request_permission(&self) -> Result<bool> {
        self.log.borrow_mut().permission_requests += 1;
        match self.permission.get() {
            Permission::Granted => Ok(true),
            Permission::Denied => Ok(false),
            Permission::Fails => Err(Error::Audio("no capture subsystem".to_string())),
        }
    }

    async fn configure_mode(&self, mode: AudioMode) -> Result<()> {
        self.log.borrow_mut().modes.push(mode);
        Ok(())
    }

    async fn acquire_capture(&self) -> Result<Box<dyn CaptureHandle>> {
        self.log.borrow_mut().captures_acquired += 1;
        Ok(Box::new(FakeCapture {
            recording: self.recording.borrow().clone(),
            sink: self.sink.clone(),
            log: Rc::clone(&self.log),
            status: self.status.borrow().clone(),
            released: false,
        }))
    }

    async fn acquire_playback(&self, source: &PlaybackSource) -> Result<Box<dyn PlaybackHandle>> {
        let seen = self.current_status();
        let mut log = self.log.borrow_mut();
        log.status_at_load.extend(seen);
        log.playbacks_acquired += 1;
        log.loaded_now += 1;
        log.max_loaded = log.max_loaded.max(log.loaded_now);
        log.sources.push(source.clone());
        Ok(Box::new(FakePlayback {
            fail_start: self.fail_playback_start.get(),
            log: Rc::clone(&self.log),
            released: false,
        }))
    }
}

struct FakeCapture {
    recording: Recording,
    sink: Sink,
    log: Rc<RefCell<DeviceLog>>,
    status: Option<watch::Receiver<InteractionStatus>>,
    released: bool,
}

impl FakeCapture {
    fn store(&self, data: &[u8]) -> String {
        match &self.sink {
            Sink::Dir(dir) => {
                let path = dir.join("recording.m4a");
                std::fs::write(&path, data).unwrap();
                format!("file://{}", path.display())
            }
            Sink::Blobs(store) => store.create(data.to_vec()),
        }
    }
}

#[async_trait(?Send)]
impl CaptureHandle for FakeCapture {
    async fn stop(&mut self) -> Result<CaptureOutcome> {
        if let Some(rx) = &self.status {
            self.log.borrow_mut().status_at_stop.push(*rx.borrow());
        }
        Ok(match self.recording.clone() {
            Recording::Audio(data) => CaptureOutcome {
                uri: Some(self.store(&data)),
                finished: true,
            },
            Recording::Empty => CaptureOutcome {
                uri: None,
                finished: true,
            },
            Recording::Unfinished(data) => CaptureOutcome {
                uri: Some(self.store(&data)),
                finished: false,
            },
        })
    }
}

impl Release for FakeCapture {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.borrow_mut().captures_released += 1;
        }
    }
}

struct FakePlayback {
    fail_start: bool,
    log: Rc<RefCell<DeviceLog>>,
    released: bool,
}

#[async_trait(?Send)]
impl PlaybackHandle for FakePlayback {
    async fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::Audio("speaker busy".to_string()));
        }
        self.log.borrow_mut().playbacks_started += 1;
        Ok(())
    }
}

impl Release for FakePlayback {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut log = self.log.borrow_mut();
            log.playbacks_released += 1;
            log.loaded_now -= 1;
        }
    }
}

/// One request received by the fake service
#[derive(Debug, Clone, Default)]
pub struct ReceivedTalk {
    pub accept: Option<String>,
    pub file: Vec<u8>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub context: Option<String>,
}

struct ServerState {
    response: Mutex<(StatusCode, Vec<u8>)>,
    requests: Mutex<Vec<ReceivedTalk>>,
}

/// Fake assistant service serving `POST /talk`
pub struct FakeServer {
    pub url: String,
    state: Arc<ServerState>,
}

impl FakeServer {
    /// Start on an ephemeral port answering with `status` and `body`
    pub async fn spawn(status: StatusCode, body: &[u8]) -> Self {
        let state = Arc::new(ServerState {
            response: Mutex::new((status, body.to_vec())),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/talk", post(talk))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// Change the answer for subsequent requests
    pub fn respond_with(&self, status: StatusCode, body: &[u8]) {
        *self.state.response.lock().unwrap() = (status, body.to_vec());
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ReceivedTalk> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn talk(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut received = ReceivedTalk {
        accept: headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        ..ReceivedTalk::default()
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("file") => {
                received.file_name = field.file_name().map(ToString::to_string);
                received.file_type = field.content_type().map(ToString::to_string);
                received.file = field.bytes().await.unwrap().to_vec();
            }
            Some("context") => received.context = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    state.requests.lock().unwrap().push(received);

    let (status, body) = state.response.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "audio/mpeg")], body).into_response()
}

/// Build a controller over a fake device
pub async fn interaction(
    device: &Rc<FakeDevice>,
    kind: PlatformKind,
    blobs: BlobStore,
    cache_dir: &Path,
    endpoint: Option<String>,
) -> Interaction {
    let config = Config {
        endpoint,
        platform: kind,
        cache_dir: cache_dir.to_path_buf(),
        ..Config::default()
    };
    let platform = platform::for_kind(&config, blobs).unwrap();
    let transport = TransportClient::new(&config).unwrap();
    let device: Rc<dyn AudioDevice> = Rc::clone(device) as Rc<dyn AudioDevice>;
    Interaction::new(device, platform, transport).await
}
