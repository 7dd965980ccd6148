use gfx_intro_triangle::Sample;

fn main() {
    gfx_intro_triangle::run(Sample::CLASSIC_TRIANGLE);
}
