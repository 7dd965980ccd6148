use gfx_intro_triangle::Sample;

fn main() {
    gfx_intro_triangle::run(Sample::PANGO_TRIANGLE_VBO);
}
