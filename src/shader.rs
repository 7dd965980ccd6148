use gfx_hal::pso;
use std::fmt;
use std::io::{Cursor, Read};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn shader_type(self) -> glsl_to_spirv::ShaderType {
        match self {
            Stage::Vertex => glsl_to_spirv::ShaderType::Vertex,
            Stage::Fragment => glsl_to_spirv::ShaderType::Fragment,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Stage::Vertex => "VERTEX",
            Stage::Fragment => "FRAGMENT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Program {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl Program {
    pub const PATTERN: Program = Program {
        vertex: include_str!("data/pattern.vert"),
        fragment: include_str!("data/pattern.frag"),
    };

    pub fn compile(&self) -> Result<(Vec<u32>, Vec<u32>), Error> {
        let vs = compile(Stage::Vertex, self.vertex);
        log_compile_status(Stage::Vertex, &vs);
        let fs = compile(Stage::Fragment, self.fragment);
        log_compile_status(Stage::Fragment, &fs);
        Ok((vs?, fs?))
    }
}

const FLAT_VERTEX_SPV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/flat.vert.spv"));
const FLAT_FRAGMENT_SPV: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/flat.frag.spv"));

pub fn flat_spirv() -> (Vec<u32>, Vec<u32>) {
    let vs = pso::read_spirv(Cursor::new(FLAT_VERTEX_SPV)).expect("Corrupt flat.vert.spv");
    let fs = pso::read_spirv(Cursor::new(FLAT_FRAGMENT_SPV)).expect("Corrupt flat.frag.spv");
    (vs, fs)
}

pub fn compile(stage: Stage, source: &str) -> Result<Vec<u32>, Error> {
    let mut file = glsl_to_spirv::compile(source, stage.shader_type())
        .map_err(|log| Error::Compile { stage, log })?;
    let mut buf = vec![];
    file.read_to_end(&mut buf)
        .map_err(|source| Error::Spirv { stage, source })?;
    pso::read_spirv(Cursor::new(&buf[..])).map_err(|source| Error::Spirv { stage, source })
}

pub fn log_compile_status(stage: Stage, result: &Result<Vec<u32>, Error>) {
    match status_message(stage, result) {
        Some(message) => log::error!("{}", message),
        None => log::debug!("{} shader compiled", stage),
    }
}

/// The console report for a failed stage; `None` when it compiled.
pub fn status_message(stage: Stage, result: &Result<Vec<u32>, Error>) -> Option<String> {
    let detail = match result {
        Ok(_) => return None,
        Err(Error::Compile { log: info_log, .. }) => info_log.clone(),
        Err(err) => err.to_string(),
    };
    Some(format!(
        "ERROR::SHADER::{}::COMPILATION_FAILED\n{}",
        stage.tag(),
        detail
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn pattern_program_compiles() {
        let (vs, fs) = Program::PATTERN.compile().unwrap();
        assert_eq!(vs[0], SPIRV_MAGIC);
        assert_eq!(fs[0], SPIRV_MAGIC);
    }

    #[test]
    fn flat_program_is_embedded() {
        let (vs, fs) = flat_spirv();
        assert_eq!(vs[0], SPIRV_MAGIC);
        assert_eq!(fs[0], SPIRV_MAGIC);
    }

    #[test]
    fn broken_source_reports_stage_and_log() {
        let err = compile(Stage::Fragment, "#version 450\nvoid main() { oops }\n").unwrap_err();
        match err {
            Error::Compile { stage, log } => {
                assert_eq!(stage, Stage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn broken_program_still_compiles_other_stage() {
        let program = Program {
            vertex: Program::PATTERN.vertex,
            fragment: "#version 450\nvoid main() { undefined_call(); }\n",
        };
        let vs = compile(Stage::Vertex, program.vertex);
        let fs = compile(Stage::Fragment, program.fragment);
        assert_eq!(status_message(Stage::Vertex, &vs), None);
        let message = status_message(Stage::Fragment, &fs).unwrap();
        assert!(message.starts_with("ERROR::SHADER::FRAGMENT::COMPILATION_FAILED\n"));
        assert!(message.len() > "ERROR::SHADER::FRAGMENT::COMPILATION_FAILED\n".len());
        assert!(program.compile().is_err());
    }

    #[test]
    fn broken_vertex_stage_is_tagged_vertex() {
        let vs = compile(Stage::Vertex, "#version 450\nvoid main() { gl_Position = oops; }\n");
        let message = status_message(Stage::Vertex, &vs).unwrap();
        assert!(message.starts_with("ERROR::SHADER::VERTEX::COMPILATION_FAILED\n"));
    }

    #[test]
    fn non_compile_errors_keep_their_description() {
        let result: Result<Vec<u32>, Error> = Err(Error::Spirv {
            stage: Stage::Fragment,
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated"),
        });
        let message = status_message(Stage::Fragment, &result).unwrap();
        assert_eq!(
            message,
            "ERROR::SHADER::FRAGMENT::COMPILATION_FAILED\n\
             compiled fragment shader is not valid SPIR-V: truncated"
        );
    }

    #[test]
    fn pattern_stays_between_its_colours() {
        let color_a = [0.905f32, 0.045, 0.045];
        let color_b = [0.995f32, 0.705, 0.051];
        let mix = |t: f32| -> [f32; 3] {
            let mut out = [0.0; 3];
            for i in 0..3 {
                out[i] = color_a[i] * (1.0 - t) + color_b[i] * t;
            }
            out
        };

        for step in 0..50 {
            let time = 2.06 + step as f32 * 0.1;
            for &(x, y) in &[(-0.5f32, -0.5f32), (0.5, -0.5), (0.0, 0.5), (0.0, 0.0)] {
                let pattern = (10.0 * y + time).sin() * (10.0 * x + time).sin() * 0.5 + 0.5;
                assert!((0.0..=1.0).contains(&pattern));
                let color = mix(pattern);
                for i in 0..3 {
                    let (lo, hi) = if color_a[i] < color_b[i] {
                        (color_a[i], color_b[i])
                    } else {
                        (color_b[i], color_a[i])
                    };
                    assert!(color[i] >= lo - 1e-6 && color[i] <= hi + 1e-6);
                }
            }
        }
    }
}
