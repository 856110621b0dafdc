pub mod device;
pub mod file;
pub mod microphone;
pub mod payload;
pub mod session;

pub use device::{
    CaptureConfig, CaptureDevice, CaptureDeviceFactory, DeviceConstraints, DeviceProvider,
    DeviceSource, LiveStream, MediaChunk, SourceProvider,
};
pub use file::FileDevice;
pub use microphone::MicrophoneDevice;
pub use payload::{CapturePayload, MediaKind};
pub use session::{CaptureSession, SessionState};
