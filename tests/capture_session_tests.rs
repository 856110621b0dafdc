// Integration tests for the capture session lifecycle.
//
// These verify the invariant every surface depends on: one complete
// start→stop cycle produces exactly one payload and exactly one device
// release, on every exit path.

mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::ScriptedDevice;
use leaseguard_voice::{
    CaptureDeviceFactory, CaptureConfig, CaptureDevice, CaptureSession, DeviceConstraints,
    DeviceSource, MediaKind, SessionState,
};

#[tokio::test]
async fn complete_cycle_produces_one_payload_and_one_release() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = ScriptedDevice::audio(
        vec![b"ab".to_vec(), Vec::new(), b"cd".to_vec(), b"ef".to_vec()],
        Arc::clone(&releases),
    );

    let session = CaptureSession::open(Box::new(device), DeviceConstraints::audio_only())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    assert_eq!(session.mime_type(), "audio/webm");
    assert_eq!(session.kind(), MediaKind::Audio);

    let payload = session.stop().await.unwrap();

    // Empty fragments are dropped; the rest concatenate in arrival order.
    assert_eq!(payload.bytes(), b"abcdef");
    assert_eq!(payload.mime_type(), "audio/webm");
    assert_eq!(payload.kind(), MediaKind::Audio);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_with_zero_chunks_yields_empty_payload() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = ScriptedDevice::audio(Vec::new(), Arc::clone(&releases));

    let session = CaptureSession::open(Box::new(device), DeviceConstraints::audio_only())
        .await
        .unwrap();
    let payload = session.stop().await.unwrap();

    assert!(payload.is_empty());
    assert_eq!(payload.len(), 0);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn device_release_is_idempotent() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut device = ScriptedDevice::audio(vec![b"x".to_vec()], Arc::clone(&releases));

    let _stream = device
        .acquire(DeviceConstraints::audio_only())
        .await
        .unwrap();
    assert!(device.is_live());

    device.release().await.unwrap();
    device.release().await.unwrap();
    device.release().await.unwrap();

    assert!(!device.is_live());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropping_a_live_session_releases_the_device() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = ScriptedDevice::audio(vec![b"x".to_vec()], Arc::clone(&releases));

    let session = CaptureSession::open(Box::new(device), DeviceConstraints::audio_only())
        .await
        .unwrap();
    drop(session);

    // Teardown release happens on a spawned task.
    for _ in 0..50 {
        if releases.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn acquire_failure_creates_no_session() {
    let releases = Arc::new(AtomicUsize::new(0));
    let device = ScriptedDevice::denied(Arc::clone(&releases));

    let result = CaptureSession::open(Box::new(device), DeviceConstraints::audio_only()).await;

    assert!(result.is_err());
    // No session was created, so there is nothing to release.
    assert_eq!(releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn file_device_streams_whole_file_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walkthrough.webm");

    // Big enough to span several 32 KiB chunks, patterned to catch reordering.
    let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    let device = CaptureDeviceFactory::create(
        &DeviceSource::File {
            path: path.clone(),
            mime_type: "video/webm".to_string(),
        },
        &CaptureConfig::default(),
    )
    .unwrap();

    let session = CaptureSession::open(device, DeviceConstraints::audio_video())
        .await
        .unwrap();
    let payload = session.stop().await.unwrap();

    assert_eq!(payload.bytes(), content.as_slice());
    assert_eq!(payload.kind(), MediaKind::Video);
    assert_eq!(payload.mime_type(), "video/webm");
}

#[tokio::test]
async fn file_device_missing_file_is_permission_denied() {
    let device = CaptureDeviceFactory::create(
        &DeviceSource::File {
            path: PathBuf::from("/nonexistent/clip.webm"),
            mime_type: "audio/webm".to_string(),
        },
        &CaptureConfig::default(),
    )
    .unwrap();

    let result = CaptureSession::open(device, DeviceConstraints::audio_only()).await;
    assert!(matches!(
        result,
        Err(leaseguard_voice::CaptureError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn camera_source_has_no_backend_here() {
    let result = CaptureDeviceFactory::create(&DeviceSource::Camera, &CaptureConfig::default());
    assert!(matches!(
        result,
        Err(leaseguard_voice::CaptureError::Unsupported(_))
    ));
}
