//! The finished, immutable output of a bucket.

use crate::paint::PaintArrays;
use crate::segment::Segment;
use crate::vertex::{IconVertex, QuadVertex, Triangle};

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutVertices {
    Icon(Vec<IconVertex>),
    Quad(Vec<QuadVertex>),
}

impl LayoutVertices {
    pub fn len(&self) -> usize {
        match self {
            LayoutVertices::Icon(v) => v.len(),
            LayoutVertices::Quad(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw vertex buffer contents, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            LayoutVertices::Icon(v) => bytemuck::cast_slice(v),
            LayoutVertices::Quad(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn stride(&self) -> usize {
        match self {
            LayoutVertices::Icon(_) => std::mem::size_of::<IconVertex>(),
            LayoutVertices::Quad(_) => std::mem::size_of::<QuadVertex>(),
        }
    }

    pub fn has_texture(&self) -> bool {
        matches!(self, LayoutVertices::Icon(_))
    }
}

/// Everything the draw layer reads for one (tile, layer group).
///
/// Never mutated after construction, so it can be shared across threads freely.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeBuffers {
    layout_vertices: LayoutVertices,
    triangles: Vec<Triangle>,
    segments: Vec<Segment>,
    paint: Vec<PaintArrays>,
    icons_need_linear: bool,
}

impl ShapeBuffers {
    pub(crate) fn from_parts(
        layout_vertices: LayoutVertices,
        triangles: Vec<Triangle>,
        segments: Vec<Segment>,
        paint: Vec<PaintArrays>,
        icons_need_linear: bool,
    ) -> Self {
        Self {
            layout_vertices,
            triangles,
            segments,
            paint,
            icons_need_linear,
        }
    }

    pub fn layout_vertices(&self) -> &LayoutVertices {
        &self.layout_vertices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        self.layout_vertices.as_bytes()
    }

    /// Index buffer: u16 triples, relative to each segment's vertex offset.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Paint data of one style layer, by layer id.
    pub fn paint(&self, layer_id: &str) -> Option<&PaintArrays> {
        self.paint.iter().find(|p| p.layer_id() == layer_id)
    }

    pub fn paint_layers(&self) -> &[PaintArrays] {
        &self.paint
    }

    /// Sample the atlas with linear rather than nearest filtering.
    pub fn icons_need_linear(&self) -> bool {
        self.icons_need_linear
    }

    pub fn vertex_count(&self) -> usize {
        self.layout_vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}
