use std::path::PathBuf;

use thiserror::Error;

use crate::simulation::handoff::HandoffError;

/// Everything that can stop the simulation.
///
/// Apart from the render shader diagnostics (which are logged and tolerated),
/// every variant is fatal: it is reported once and the process exits non-zero.
#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to open shader source {}: {source}", .path.display())]
    ShaderSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create GPU surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found{}", filter_hint(.filter))]
    NoAdapter { filter: Option<String> },

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("particle buffer needs {required} bytes but the device allows {limit}")]
    BufferTooLarge { required: u64, limit: u64 },

    #[error("compute program build failed:\n{log}")]
    ComputeBuild { log: String },

    #[error("GPU failure during {stage}: {message}")]
    Gpu { stage: &'static str, message: String },

    #[error("failed to acquire next swapchain texture: {0}")]
    Frame(wgpu::SurfaceError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

fn filter_hint(filter: &Option<String>) -> String {
    match filter {
        Some(filter) => format!(" matching `{filter}`"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn gpu(stage: &'static str, message: impl ToString) -> Self {
        Error::Gpu {
            stage,
            message: message.to_string(),
        }
    }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_adapter_mentions_filter() {
        let err = Error::NoAdapter {
            filter: Some("nvidia".into()),
        };
        assert_eq!(
            err.to_string(),
            "no compatible GPU adapter found matching `nvidia`"
        );

        let err = Error::NoAdapter { filter: None };
        assert_eq!(err.to_string(), "no compatible GPU adapter found");
    }

    #[test]
    fn compute_build_surfaces_full_log() {
        let err = Error::ComputeBuild {
            log: "error at 3:7: unknown identifier `foo`\nerror at 9:1: expected `}`".into(),
        };
        let message = err.to_string();
        assert!(message.starts_with("compute program build failed:\n"));
        assert!(message.contains("3:7"));
        assert!(message.contains("9:1"));
    }
}
