use gfx_hal::format as f;

/// One triangle corner. Coordinates are normalized device coordinates with
/// y pointing up; the vertex shaders flip y for the backend's clip space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const POSITION_FORMAT: f::Format = f::Format::Rgb32Sfloat;
}

pub const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [-0.5, -0.5, 0.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
    },
    Vertex {
        position: [0.0, 0.5, 0.0],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn vertex_is_three_packed_floats() {
        assert_eq!(mem::size_of::<Vertex>(), 3 * mem::size_of::<f32>());
        assert_eq!(mem::size_of_val(&TRIANGLE), 9 * mem::size_of::<f32>());
    }

    #[test]
    fn triangle_apex_is_on_top() {
        let flat: Vec<f32> = TRIANGLE.iter().flat_map(|v| v.position.to_vec()).collect();
        assert_eq!(
            flat,
            vec![-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0]
        );
        assert!(TRIANGLE[2].position[1] > TRIANGLE[0].position[1]);
        assert!(TRIANGLE.iter().all(|v| v.position[2] == 0.0));
    }
}
