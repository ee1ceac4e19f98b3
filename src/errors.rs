//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`SssError`] covers all failure modes including:
//! - GPU initialization failures
//! - Shader compilation and linking failures
//! - Incomplete framebuffers and oversized textures
//! - Pipeline state-machine misuse
//! - Asset loading and decoding errors
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, SssError>`.
//!
//! ```rust,ignore
//! use sss::errors::{SssError, Result};
//!
//! fn build_targets() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::shader::ShaderStage;

/// The main error type for the SSS renderer.
#[derive(Error, Debug)]
pub enum SssError {
    // ========================================================================
    // GPU & Window Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Surface creation, configuration or acquisition failed.
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Window system error.
    #[error("Window system error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    /// Event loop error (winit).
    #[cfg(feature = "winit")]
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// The shader compiler rejected a source unit.
    #[error("Failed to compile {stage} shader \"{label}\":\n{diagnostic}")]
    ShaderCompile {
        /// Source label (usually the file name)
        label: String,
        /// Stage the unit was compiled for
        stage: ShaderStage,
        /// Compiler diagnostic text
        diagnostic: String,
    },

    /// The vertex and fragment units could not be linked together.
    #[error("Failed to link program \"{label}\": {reason}")]
    ShaderLink {
        /// Program label
        label: String,
        /// Reason reported by the linker
        reason: String,
    },

    // ========================================================================
    // Render Target Errors
    // ========================================================================
    /// The attachment combination of a framebuffer is not supported.
    #[error("Framebuffer \"{target}\" is incomplete: {reason}")]
    FramebufferIncomplete {
        /// Name of the render target set
        target: String,
        /// What made the attachment set invalid
        reason: String,
    },

    /// A texture dimension is zero or exceeds the device limit.
    #[error("Texture \"{label}\" of size {width}x{height} exceeds device limit {max}")]
    TextureTooLarge {
        /// Texture label
        label: String,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Maximum supported dimension
        max: u32,
    },

    // ========================================================================
    // Pipeline State Errors
    // ========================================================================
    /// An operation was called in a state that does not allow it.
    #[error("Operation `{operation}` is not valid in state {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// Current state description
        state: String,
    },

    /// A handle or named resource does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// No parameter with this name exists on the configuration surface.
    #[error("Unknown configuration parameter: {0}")]
    UnknownParameter(String),

    /// The supplied value has the wrong type for the parameter.
    #[error("Parameter \"{name}\" expects a {expected} value")]
    ParameterType {
        /// Parameter name
        name: String,
        /// Expected value kind
        expected: &'static str,
    },

    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// The requested asset was not found.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Mesh file parsing failed.
    #[error("Mesh load error: {0}")]
    MeshLoad(String),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for SssError {
    fn from(err: image::ImageError) -> Self {
        SssError::ImageDecodeError(err.to_string())
    }
}

impl From<tobj::LoadError> for SssError {
    fn from(err: tobj::LoadError) -> Self {
        SssError::MeshLoad(err.to_string())
    }
}

/// Alias for `Result<T, SssError>`.
pub type Result<T> = std::result::Result<T, SssError>;
