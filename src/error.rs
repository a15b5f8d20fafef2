// Application-level errors. Everything here aborts startup.

use thiserror::Error;

use crate::engine::MeshError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop failure: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to build mesh: {0}")]
    Mesh(#[from] MeshError),
}
