use anyhow::{Context, Result};
use kat_engine::device::{DrawMode, StageKind};
use kat_engine::logging::{init_logging, LoggingConfig};
use kat_engine::palette;
use kat_engine::render::{self, VertexArray, VertexBuffer};
use kat_engine::shader::{EmbeddedResources, Shader};
use kat_engine::time::FrameTime;
use kat_engine::window::{Window, WindowConfig};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "shaders/"]
struct Shaders;

/// Unit quad in the top-right quadrant, drawn as a fan.
const QUAD: [f32; 12] = [
    0.0, 0.0, 0.0, //
    1.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, //
    0.0, 1.0, 0.0, //
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = WindowConfig::new("Not Minecraft", 800, 800).with_vsync_interval(0);
    let mut window = Window::open(&config).context("failed to open window")?;
    let device = window.device();

    let vbo = VertexBuffer::with_data(&device, &QUAD);
    let mut vao = VertexArray::new(&device);
    vao.attach(&vbo, &[3])?;

    let mut shader = Shader::builder()
        .internal("main/vert.wgsl", StageKind::Vertex)
        .internal("main/frag.wgsl", StageKind::Fragment)
        .build(&device, &EmbeddedResources::<Shaders>::new())?;

    let mut fps_timer = 0.0;
    window.while_open(|t: FrameTime| {
        render::clear(&device, palette::CYAN);

        shader.use_program();
        shader.uniform4fv("uColor", palette::MAGENTA);
        render::draw_arrays(&vao, DrawMode::TriangleFan, 4);

        fps_timer += t.dt;
        if fps_timer >= 1.0 {
            fps_timer = 0.0;
            log::info!("{:.0} fps", t.fps());
        }
    });

    Ok(())
}
