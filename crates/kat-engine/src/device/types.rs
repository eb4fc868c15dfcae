use std::fmt;

/// Buffer usage hint: expected access frequency × direction.
///
/// A hint only; it never changes correctness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    StaticRead,
    StaticCopy,
    DynamicDraw,
    DynamicRead,
    DynamicCopy,
    StreamDraw,
    StreamRead,
    StreamCopy,
}

impl BufferUsage {
    pub const ALL: [BufferUsage; 9] = [
        BufferUsage::StaticDraw,
        BufferUsage::StaticRead,
        BufferUsage::StaticCopy,
        BufferUsage::DynamicDraw,
        BufferUsage::DynamicRead,
        BufferUsage::DynamicCopy,
        BufferUsage::StreamDraw,
        BufferUsage::StreamRead,
        BufferUsage::StreamCopy,
    ];

    /// True for the `*Read` and `*Copy` hints, i.e. data may flow back out of the buffer.
    #[inline]
    pub fn is_readback(self) -> bool {
        !matches!(
            self,
            BufferUsage::StaticDraw | BufferUsage::DynamicDraw | BufferUsage::StreamDraw
        )
    }
}

/// Topology mode of a draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LinesAdjacency,
    LineStrip,
    LineStripAdjacency,
    LineLoop,
    Triangles,
    TrianglesAdjacency,
    TriangleStrip,
    TriangleStripAdjacency,
    TriangleFan,
    Patches,
}

/// Shader stage kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Vertex => "vertex",
            StageKind::TessControl => "tessellation-control",
            StageKind::TessEvaluation => "tessellation-evaluation",
            StageKind::Geometry => "geometry",
            StageKind::Fragment => "fragment",
            StageKind::Compute => "compute",
        })
    }
}

/// Format of one vertex attribute: `components` × f32, at `offset` bytes
/// into the vertex.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttribFormat {
    pub components: u32,
    pub offset: u32,
}

/// Value written by a program-targeted uniform call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue<'a> {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 4×4 matrix.
    Mat4(&'a [f32; 16]),
}

impl UniformValue<'_> {
    /// Float components in upload order.
    pub fn components(&self) -> &[f32] {
        match self {
            UniformValue::Float(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
            UniformValue::Mat4(m) => &m[..],
        }
    }
}
