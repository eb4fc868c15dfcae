//! Maps draw modes onto wgpu primitive topologies.
//!
//! wgpu has no fans or loops; those are drawn indexed with generated indices.

use std::ops::Range;

use crate::device::DrawMode;

/// How one draw call is issued on wgpu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Topology {
    pub primitive: wgpu::PrimitiveTopology,
    pub strip_index_format: Option<wgpu::IndexFormat>,
    /// Vertices read by the draw.
    pub vertices: Range<u32>,
    /// Absolute vertex indices, or `None` for a direct draw of `vertices`.
    pub indices: Option<Vec<u32>>,
}

/// Returns `Err` with a reason for modes wgpu cannot express, and for
/// vertex ranges that run past `u32::MAX`.
pub(crate) fn expand(mode: DrawMode, first: u32, count: u32) -> Result<Topology, &'static str> {
    use wgpu::PrimitiveTopology as P;

    let end = first
        .checked_add(count)
        .ok_or("vertex range runs past u32::MAX")?;
    let vertices = first..end;

    let (primitive, strip_index_format, indices) = match mode {
        DrawMode::Points => (P::PointList, None, None),
        DrawMode::Lines => (P::LineList, None, None),
        DrawMode::LineStrip => (P::LineStrip, None, None),
        DrawMode::Triangles => (P::TriangleList, None, None),
        DrawMode::TriangleStrip => (P::TriangleStrip, None, None),
        DrawMode::TriangleFan => (P::TriangleList, None, Some(fan_indices(vertices.clone()))),
        DrawMode::LineLoop => (
            P::LineStrip,
            Some(wgpu::IndexFormat::Uint32),
            Some(loop_indices(vertices.clone())),
        ),
        DrawMode::LinesAdjacency
        | DrawMode::LineStripAdjacency
        | DrawMode::TrianglesAdjacency
        | DrawMode::TriangleStripAdjacency => {
            return Err("adjacency topologies need geometry shaders, which wgpu does not have");
        }
        DrawMode::Patches => return Err("patch topology needs tessellation, which wgpu does not have"),
    };

    Ok(Topology {
        primitive,
        strip_index_format,
        vertices,
        indices,
    })
}

/// `(first, v, v+1)` for every triangle of the fan.
fn fan_indices(vertices: Range<u32>) -> Vec<u32> {
    if vertices.len() < 3 {
        return Vec::new();
    }
    let first = vertices.start;
    (first + 1..vertices.end - 1)
        .flat_map(|v| [first, v, v + 1])
        .collect()
}

/// The strip over `vertices` closed back onto its first vertex.
fn loop_indices(vertices: Range<u32>) -> Vec<u32> {
    if vertices.len() < 2 {
        return Vec::new();
    }
    let first = vertices.start;
    vertices.chain(std::iter::once(first)).collect()
}
