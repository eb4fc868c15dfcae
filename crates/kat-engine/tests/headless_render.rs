//! End-to-end rendering through a real wgpu adapter into an offscreen target.
//!
//! Ignored by default: run with `cargo test -- --ignored` on a machine with a
//! GPU (or a software adapter such as lavapipe).

use std::rc::Rc;

use anyhow::Result;
use kat_engine::device::{DrawMode, SharedDevice, StageKind};
use kat_engine::gpu::{GpuInit, WgpuDevice};
use kat_engine::palette;
use kat_engine::render::{self, VertexArray, VertexBuffer};
use kat_engine::shader::{Shader, StaticResources};
use kat_engine::ShaderError;

const VERT: &str = "
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
";

const FRAG: &str = "
@group(0) @binding(0) var<uniform> uColor: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return uColor;
}
";

/// Covers the whole viewport with one triangle.
const COVER: [f32; 9] = [-1.0, -1.0, 0.0, 3.0, -1.0, 0.0, -1.0, 3.0, 0.0];

/// Right half of the viewport as a four-vertex fan.
const RIGHT_HALF: [f32; 12] = [0.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];

fn setup(size: u32) -> Result<(Rc<WgpuDevice>, SharedDevice)> {
    let device = Rc::new(WgpuDevice::headless(size, size, GpuInit::default())?);
    let shared: SharedDevice = device.clone();
    Ok((device, shared))
}

fn flat_shader(device: &SharedDevice) -> Result<Shader, ShaderError> {
    let loader = StaticResources::new().with("flat/vert", VERT).with("flat/frag", FRAG);
    Shader::builder()
        .internal("flat/vert", StageKind::Vertex)
        .internal("flat/frag", StageKind::Fragment)
        .build(device, &loader)
}

fn pixel(pixels: &[u8], size: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * size + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

#[test]
#[ignore = "needs a GPU adapter"]
fn clear_fills_target() -> Result<()> {
    let (device, shared) = setup(4)?;

    render::clear(&shared, palette::BLUE);
    assert!(device.present().is_ok());

    let pixels = device.read_pixels()?;
    assert_eq!(pixels.len(), 4 * 4 * 4);
    assert!(pixels.chunks(4).all(|p| p == [0, 0, 255, 255]));
    Ok(())
}

#[test]
#[ignore = "needs a GPU adapter"]
fn triangle_takes_uniform_color() -> Result<()> {
    let (device, shared) = setup(8)?;

    let vbo = VertexBuffer::with_data(&shared, &COVER);
    let mut vao = VertexArray::new(&shared);
    vao.attach(&vbo, &[3])?;
    let mut shader = flat_shader(&shared)?;

    render::clear(&shared, palette::BLACK);
    shader.use_program();
    shader.uniform4fv("uColor", palette::RED);
    render::draw_triangles(&vao, 3);
    assert!(device.present().is_ok());

    let pixels = device.read_pixels()?;
    assert!(pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
    Ok(())
}

#[test]
#[ignore = "needs a GPU adapter"]
fn fan_covers_only_its_area() -> Result<()> {
    let (device, shared) = setup(8)?;

    let vbo = VertexBuffer::with_data(&shared, &RIGHT_HALF);
    let mut vao = VertexArray::new(&shared);
    vao.attach(&vbo, &[3])?;
    let mut shader = flat_shader(&shared)?;

    render::clear(&shared, palette::CYAN);
    shader.use_program();
    shader.uniform4fv("uColor", palette::MAGENTA);
    render::draw_arrays(&vao, DrawMode::TriangleFan, 4);
    assert!(device.present().is_ok());

    let pixels = device.read_pixels()?;
    assert_eq!(pixel(&pixels, 8, 1, 4), [0, 255, 255, 255]);
    assert_eq!(pixel(&pixels, 8, 6, 4), [255, 0, 255, 255]);
    Ok(())
}

/// Left half of the viewport as a four-vertex fan.
const LEFT_HALF: [f32; 12] = [-1.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0, 1.0, 0.0];

#[test]
#[ignore = "needs a GPU adapter"]
fn draws_keep_their_own_uniforms_across_frames() -> Result<()> {
    let (device, shared) = setup(8)?;

    let left = VertexBuffer::with_data(&shared, &LEFT_HALF);
    let right = VertexBuffer::with_data(&shared, &RIGHT_HALF);
    let mut left_vao = VertexArray::new(&shared);
    left_vao.attach(&left, &[3])?;
    let mut right_vao = VertexArray::new(&shared);
    right_vao.attach(&right, &[3])?;
    let mut shader = flat_shader(&shared)?;

    for (a, b) in [(palette::RED, palette::GREEN), (palette::YELLOW, palette::BLUE)] {
        render::clear(&shared, palette::BLACK);
        shader.use_program();
        shader.uniform4fv("uColor", a);
        render::draw_arrays(&left_vao, DrawMode::TriangleFan, 4);
        shader.uniform4fv("uColor", b);
        render::draw_arrays(&right_vao, DrawMode::TriangleFan, 4);
        assert!(device.present().is_ok());

        let pixels = device.read_pixels()?;
        assert_eq!(pixel(&pixels, 8, 1, 4), a.to_array().map(|c| (c * 255.0) as u8));
        assert_eq!(pixel(&pixels, 8, 6, 4), b.to_array().map(|c| (c * 255.0) as u8));
    }
    Ok(())
}

#[test]
#[ignore = "needs a GPU adapter"]
fn invalid_wgsl_fails_to_compile() -> Result<()> {
    let (_device, shared) = setup(4)?;

    let loader = StaticResources::new()
        .with("bad/vert", "@vertex fn vs_main( -> @builtin(position) vec4<f32> {}")
        .with("flat/frag", FRAG);
    let err = Shader::builder()
        .internal("bad/vert", StageKind::Vertex)
        .internal("flat/frag", StageKind::Fragment)
        .build(&shared, &loader)
        .unwrap_err();

    assert!(matches!(err, ShaderError::Compile { kind: StageKind::Vertex, .. }));
    Ok(())
}

#[test]
#[ignore = "needs a GPU adapter"]
fn missing_fragment_stage_fails_to_link() -> Result<()> {
    let (_device, shared) = setup(4)?;

    let loader = StaticResources::new().with("flat/vert", VERT);
    let err = Shader::builder()
        .internal("flat/vert", StageKind::Vertex)
        .build(&shared, &loader)
        .unwrap_err();

    assert!(matches!(err, ShaderError::Link { .. }));
    Ok(())
}
