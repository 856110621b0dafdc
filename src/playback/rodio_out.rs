// rodio output on a dedicated playback thread.
//
// `rodio::OutputStream` is !Send, so a single thread owns it for the life of
// the output and plays one clip at a time from a command queue. The manager
// guarantees the previous clip's cancel flag is raised before the next
// command is queued, so the queue never grows past one live clip.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use super::output::{AudioClip, AudioOutput, PlaybackControl, PlaybackOutcome};
use crate::error::PlaybackError;

/// How often the playback thread polls the sink and the cancel flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct PlayCommand {
    bytes: Vec<u8>,
    cancel: Arc<AtomicBool>,
    done: oneshot::Sender<PlaybackOutcome>,
}

/// Hardware audio output backed by the default rodio device.
pub struct RodioOutput {
    tx: mpsc::Sender<PlayCommand>,
}

impl RodioOutput {
    /// Spawn the playback thread and open the default output device.
    pub fn new() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::channel::<PlayCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        std::thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || playback_thread(rx, ready_tx))
            .map_err(|e| PlaybackError::Output(format!("playback thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("audio output ready");
                Ok(Self { tx })
            }
            Ok(Err(e)) => Err(PlaybackError::Output(e)),
            Err(_) => Err(PlaybackError::Output(
                "playback thread exited before opening the device".to_string(),
            )),
        }
    }
}

fn playback_thread(rx: mpsc::Receiver<PlayCommand>, ready_tx: mpsc::Sender<Result<(), String>>) {
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("no output device: {e}")));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    while let Ok(cmd) = rx.recv() {
        let source = match rodio::Decoder::new(Cursor::new(cmd.bytes)) {
            Ok(source) => source,
            Err(e) => {
                warn!("clip decode failed: {e}");
                let _ = cmd.done.send(PlaybackOutcome::Failed);
                continue;
            }
        };

        let sink = match rodio::Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("sink unavailable: {e}");
                let _ = cmd.done.send(PlaybackOutcome::Failed);
                continue;
            }
        };

        sink.append(source);

        let outcome = loop {
            if cmd.cancel.load(Ordering::SeqCst) {
                sink.stop();
                break PlaybackOutcome::Stopped;
            }
            if sink.empty() {
                break PlaybackOutcome::Completed;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        // The sink (the playable resource) is dropped here, once, before the
        // outcome resolves.
        drop(sink);
        let _ = cmd.done.send(outcome);
    }
}

struct RodioControl {
    cancel: Arc<AtomicBool>,
}

impl PlaybackControl for RodioControl {
    fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl AudioOutput for RodioOutput {
    fn start(
        &self,
        clip: AudioClip,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, PlaybackError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let cmd = PlayCommand {
            bytes: clip.bytes.as_ref().clone(),
            cancel: Arc::clone(&cancel),
            done,
        };

        self.tx
            .send(cmd)
            .map_err(|_| PlaybackError::Output("playback thread is gone".to_string()))?;

        Ok(Box::new(RodioControl { cancel }))
    }
}
