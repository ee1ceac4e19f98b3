//! Shader Programs
//!
//! WGSL sources are loaded from a shader directory, compiled per stage with
//! naga (parse + validate + reflect), and linked into a [`LinkedProgram`]
//! whose interface has been checked across stages. A [`ShaderProgram`] wraps
//! the backend handle together with a CPU copy of the uniform block so
//! passes can set uniforms by name.
//!
//! # Binding convention
//!
//! | Group | Binding | Contents |
//! |-------|---------|----------|
//! | 0 | 0 | The program's uniform block (`var<uniform>`) |
//! | 1 | 0..15 | Texture units |
//! | 1 | 16 | Shared linear sampler |
//! | 1 | 17 | Shared comparison sampler |

mod compiler;
mod program;

pub use compiler::{
    IoSlot, IoType, LinkedProgram, ShaderUnit, TextureBinding, TextureKind, UniformBlock,
    UniformMember, compile, link,
};
pub use program::{FixedFunction, ShaderLibrary, ShaderProgram, UniformLocation, UniformValue};

use std::fmt;

/// Pipeline stage a shader unit is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn to_naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}
