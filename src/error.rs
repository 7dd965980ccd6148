use std::io;

use crate::shader::Stage;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: Stage, log: String },
    #[error("compiled {stage} shader is not valid SPIR-V: {source}")]
    Spirv {
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("shader module rejected by the device: {0:?}")]
    Module(gfx_hal::device::ShaderError),
    #[error("pipeline layout could not be created: {0:?}")]
    Layout(gfx_hal::device::OutOfMemory),
    #[error("graphics pipeline failed to link: {0:?}")]
    Link(gfx_hal::pso::CreationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfx_hal::device::OutOfMemory;

    #[test]
    fn layout_failure_is_reported_not_fatal() {
        let err = Error::Layout(OutOfMemory::Device);
        assert!(err.to_string().starts_with("pipeline layout could not be created"));
    }

    #[test]
    fn compile_failure_carries_stage_and_log() {
        let err = Error::Compile {
            stage: Stage::Vertex,
            log: "0:1: syntax error".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "vertex shader failed to compile:\n0:1: syntax error"
        );
    }
}
