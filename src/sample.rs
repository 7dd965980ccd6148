use gfx_hal::window;

use crate::shader::Program;

const WINDOW_SIZE: window::Extent2D = window::Extent2D {
    width: 500,
    height: 500,
};

const LAVENDER: [f32; 4] = [0.64, 0.5, 0.81, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const SKY: [f32; 3] = [0.29, 0.71, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource {
    ClientArray,
    BufferObject,
    LibraryBuffer,
}

#[derive(Debug, Clone, Copy)]
pub enum Shading {
    Flat([f32; 3]),
    Pattern(Program),
}

impl Shading {
    pub fn push_constants(&self, time: f32) -> [u32; 4] {
        let data = match self {
            Shading::Flat([r, g, b]) => [*r, *g, *b, 0.0],
            Shading::Pattern(_) => [time, 0.0, 0.0, 0.0],
        };
        [
            data[0].to_bits(),
            data[1].to_bits(),
            data[2].to_bits(),
            data[3].to_bits(),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub title: &'static str,
    pub size: window::Extent2D,
    pub clear_color: [f32; 4],
    pub vertex_source: VertexSource,
    pub shading: Shading,
}

impl Sample {
    pub const CLASSIC_TRIANGLE: Sample = Sample {
        title: "Classic GL Triangle",
        size: WINDOW_SIZE,
        clear_color: LAVENDER,
        vertex_source: VertexSource::ClientArray,
        shading: Shading::Flat(BLUE),
    };

    pub const CLASSIC_TRIANGLE_VBO: Sample = Sample {
        title: "Classic GL Triangle with VBO",
        size: WINDOW_SIZE,
        clear_color: LAVENDER,
        vertex_source: VertexSource::BufferObject,
        shading: Shading::Flat(SKY),
    };

    pub const PANGO_TRIANGLE_VBO: Sample = Sample {
        title: "Pango GL Triangle with VBO",
        size: WINDOW_SIZE,
        clear_color: LAVENDER,
        vertex_source: VertexSource::LibraryBuffer,
        shading: Shading::Flat(SKY),
    };

    pub const TRIANGLE_VBO_SHADER: Sample = Sample {
        title: "Classic GL Triangle With VBO and Shader",
        size: WINDOW_SIZE,
        clear_color: LAVENDER,
        vertex_source: VertexSource::BufferObject,
        shading: Shading::Pattern(Program::PATTERN),
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    time: f32,
}

impl FrameClock {
    pub const START: f32 = 2.06;
    pub const STEP: f32 = 0.10;

    pub fn new() -> Self {
        FrameClock { time: Self::START }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn tick(&mut self) {
        self.time += Self::STEP;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Sample; 4] = [
        Sample::CLASSIC_TRIANGLE,
        Sample::CLASSIC_TRIANGLE_VBO,
        Sample::PANGO_TRIANGLE_VBO,
        Sample::TRIANGLE_VBO_SHADER,
    ];

    #[test]
    fn samples_share_window_and_background() {
        for sample in ALL.iter() {
            assert_eq!(sample.size.width, 500);
            assert_eq!(sample.size.height, 500);
            assert_eq!(sample.clear_color, [0.64, 0.5, 0.81, 0.0]);
        }
    }

    #[test]
    fn titles_are_distinct() {
        for (i, a) in ALL.iter().enumerate() {
            for b in ALL.iter().skip(i + 1) {
                assert_ne!(a.title, b.title);
            }
        }
    }

    #[test]
    fn only_the_shader_sample_is_programmable() {
        let programmable: Vec<&str> = ALL
            .iter()
            .filter(|s| match s.shading {
                Shading::Pattern(_) => true,
                Shading::Flat(_) => false,
            })
            .map(|s| s.title)
            .collect();
        assert_eq!(programmable, vec![Sample::TRIANGLE_VBO_SHADER.title]);
    }

    #[test]
    fn vertex_sources_per_sample() {
        assert_eq!(Sample::CLASSIC_TRIANGLE.vertex_source, VertexSource::ClientArray);
        assert_eq!(Sample::CLASSIC_TRIANGLE_VBO.vertex_source, VertexSource::BufferObject);
        assert_eq!(Sample::PANGO_TRIANGLE_VBO.vertex_source, VertexSource::LibraryBuffer);
        assert_eq!(Sample::TRIANGLE_VBO_SHADER.vertex_source, VertexSource::BufferObject);
    }

    #[test]
    fn flat_shading_pushes_its_colour() {
        let words = Shading::Flat([0.29, 0.71, 1.0]).push_constants(7.0);
        assert_eq!(f32::from_bits(words[0]), 0.29);
        assert_eq!(f32::from_bits(words[1]), 0.71);
        assert_eq!(f32::from_bits(words[2]), 1.0);
        assert_eq!(f32::from_bits(words[3]), 0.0);
    }

    #[test]
    fn pattern_shading_pushes_time() {
        let words = Shading::Pattern(Program::PATTERN).push_constants(2.5);
        assert_eq!(f32::from_bits(words[0]), 2.5);
        assert_eq!(&words[1..], &[0, 0, 0]);
    }

    #[test]
    fn clock_advances_a_tenth_per_frame() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.time(), 2.06);
        for _ in 0..10 {
            clock.tick();
        }
        assert!((clock.time() - 3.06).abs() < 1e-4);
    }
}
