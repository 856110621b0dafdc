// Shared scripted doubles for the integration tests: capture devices with
// deterministic chunk scripts, an analysis backend with queued replies, and
// an audio output whose completion the test drives by hand.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use leaseguard_voice::{
    AnalysisBackend, AudioClip, AudioOutput, CaptureDevice, CaptureError, CapturePayload,
    DepositReply, DeviceConstraints, DeviceProvider, LiveStream, MaintenanceDetails,
    MaintenanceReply, MaintenanceRequest, MediaChunk, MediaKind, PlaybackControl, PlaybackError,
    PlaybackOutcome, UploadError, Urgency, VoiceChatReply,
};

// ============================================================================
// Scripted capture devices
// ============================================================================

pub struct ScriptedDevice {
    chunks: Vec<Vec<u8>>,
    mime_type: String,
    fail_acquire: bool,
    releases: Arc<AtomicUsize>,
    tx: Option<mpsc::Sender<MediaChunk>>,
    live: bool,
}

impl ScriptedDevice {
    pub fn audio(chunks: Vec<Vec<u8>>, releases: Arc<AtomicUsize>) -> Self {
        Self {
            chunks,
            mime_type: "audio/webm".to_string(),
            fail_acquire: false,
            releases,
            tx: None,
            live: false,
        }
    }

    pub fn video(chunks: Vec<Vec<u8>>, releases: Arc<AtomicUsize>) -> Self {
        Self {
            mime_type: "video/webm".to_string(),
            ..Self::audio(chunks, releases)
        }
    }

    /// Device whose permission prompt is declined.
    pub fn denied(releases: Arc<AtomicUsize>) -> Self {
        Self {
            fail_acquire: true,
            ..Self::audio(Vec::new(), releases)
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(
        &mut self,
        _constraints: DeviceConstraints,
    ) -> Result<LiveStream, CaptureError> {
        if self.fail_acquire {
            return Err(CaptureError::PermissionDenied(
                "scripted denial".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        for (i, data) in self.chunks.iter().enumerate() {
            tx.send(MediaChunk {
                data: data.clone(),
                timestamp_ms: i as u64 * 100,
            })
            .await
            .expect("chunk script larger than channel capacity");
        }

        // Keep the sender so the stream stays open until release().
        self.tx = Some(tx);
        self.live = true;

        Ok(LiveStream {
            mime_type: self.mime_type.clone(),
            kind: MediaKind::from_mime(&self.mime_type),
            rx,
        })
    }

    async fn release(&mut self) -> Result<(), CaptureError> {
        if self.live {
            self.live = false;
            self.tx = None;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Provider handing out scripted devices in order; an exhausted script acts
/// like missing hardware.
pub struct ScriptedProvider {
    devices: Mutex<VecDeque<ScriptedDevice>>,
    pub opens: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(devices: Vec<ScriptedDevice>) -> Self {
        Self {
            devices: Mutex::new(devices.into()),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, device: ScriptedDevice) {
        self.devices.lock().unwrap().push_back(device);
    }
}

impl DeviceProvider for ScriptedProvider {
    fn open(&self) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.devices
            .lock()
            .unwrap()
            .pop_front()
            .map(|d| Box::new(d) as Box<dyn CaptureDevice>)
            .ok_or_else(|| CaptureError::PermissionDenied("no capture device".to_string()))
    }
}

// ============================================================================
// Scripted analysis backend
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub endpoint: &'static str,
    pub bytes: usize,
    pub mime_type: String,
}

pub struct MockBackend {
    chat: Mutex<VecDeque<Result<VoiceChatReply, UploadError>>>,
    maintenance: Mutex<VecDeque<Result<MaintenanceReply, UploadError>>>,
    deposit: Mutex<VecDeque<Result<DepositReply, UploadError>>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            chat: Mutex::new(VecDeque::new()),
            maintenance: Mutex::new(VecDeque::new()),
            deposit: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn queue_chat(&self, reply: Result<VoiceChatReply, UploadError>) {
        self.chat.lock().unwrap().push_back(reply);
    }

    pub fn queue_maintenance(&self, reply: Result<MaintenanceReply, UploadError>) {
        self.maintenance.lock().unwrap().push_back(reply);
    }

    pub fn queue_deposit(&self, reply: Result<DepositReply, UploadError>) {
        self.deposit.lock().unwrap().push_back(reply);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, endpoint: &'static str, payload: &CapturePayload) {
        self.uploads.lock().unwrap().push(RecordedUpload {
            endpoint,
            bytes: payload.len(),
            mime_type: payload.mime_type().to_string(),
        });
    }
}

pub fn chat_reply(transcript: &str, answer: &str, audio: Option<Vec<u8>>) -> VoiceChatReply {
    VoiceChatReply {
        transcript: transcript.to_string(),
        answer: answer.to_string(),
        speech: audio.map(AudioClip::mp3),
    }
}

pub fn maintenance_reply(
    transcript: &str,
    title: &str,
    urgency: Urgency,
    pdf: Option<Vec<u8>>,
) -> MaintenanceReply {
    MaintenanceReply {
        transcript: transcript.to_string(),
        request: MaintenanceRequest {
            title: title.to_string(),
            description: transcript.to_string(),
            issue_category: "plumbing".to_string(),
            urgency,
            location: "kitchen".to_string(),
            requested_action: "Please inspect and repair".to_string(),
            safety_concern: false,
        },
        speech: None,
        letter_pdf: pdf,
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for MockBackend {
    async fn voice_chat(
        &self,
        payload: &CapturePayload,
        _lease_id: Option<&str>,
    ) -> Result<VoiceChatReply, UploadError> {
        self.pause().await;
        self.record("chat", payload);
        self.chat
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UploadError::Status(500)))
    }

    async fn maintenance_report(
        &self,
        payload: &CapturePayload,
        _details: &MaintenanceDetails,
    ) -> Result<MaintenanceReply, UploadError> {
        self.pause().await;
        self.record("maintenance", payload);
        self.maintenance
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UploadError::Status(500)))
    }

    async fn deposit_upload(&self, payload: &CapturePayload) -> Result<DepositReply, UploadError> {
        self.pause().await;
        self.record("deposit", payload);
        self.deposit
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UploadError::Status(500)))
    }
}

// ============================================================================
// Hand-driven audio output
// ============================================================================

struct ManualSlot {
    done: Option<oneshot::Sender<PlaybackOutcome>>,
    releases: usize,
    bytes: usize,
}

/// Output whose clips finish only when the test says so.
#[derive(Clone)]
pub struct ManualOutput {
    slots: Arc<Mutex<Vec<ManualSlot>>>,
}

impl ManualOutput {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Finish playback `index` naturally. Returns false if already finished.
    pub fn complete(&self, index: usize) -> bool {
        let mut slots = self.slots.lock().unwrap();
        let slot = &mut slots[index];
        match slot.done.take() {
            Some(tx) => {
                slot.releases += 1;
                let _ = tx.send(PlaybackOutcome::Completed);
                true
            }
            None => false,
        }
    }

    /// How many playbacks were ever started.
    pub fn started(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// How many playbacks are still unfinished.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.done.is_some())
            .count()
    }

    /// Release count for one playback; the invariant under test is == 1.
    pub fn releases(&self, index: usize) -> usize {
        self.slots.lock().unwrap()[index].releases
    }

    pub fn clip_bytes(&self, index: usize) -> usize {
        self.slots.lock().unwrap()[index].bytes
    }
}

struct ManualControl {
    slots: Arc<Mutex<Vec<ManualSlot>>>,
    index: usize,
}

impl PlaybackControl for ManualControl {
    fn stop(&self) {
        let mut slots = self.slots.lock().unwrap();
        let slot = &mut slots[self.index];
        if let Some(tx) = slot.done.take() {
            slot.releases += 1;
            let _ = tx.send(PlaybackOutcome::Stopped);
        }
    }
}

impl AudioOutput for ManualOutput {
    fn start(
        &self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, PlaybackError> {
        let mut slots = self.slots.lock().unwrap();
        let index = slots.len();
        slots.push(ManualSlot {
            done: Some(done),
            releases: 0,
            bytes: clip.len(),
        });
        Ok(Box::new(ManualControl {
            slots: Arc::clone(&self.slots),
            index,
        }))
    }
}
