use crate::paint::PaintArrays;
use crate::segment::SegmentVector;
use crate::style::{GlobalProperties, ShapeLayer};
use crate::vertex::{LayoutVertex, Triangle};
use crate::Properties;
use std::sync::Arc;

/// Buffers shared by every bucket variant: layout vertices, triangles,
/// segments and one set of paint arrays per style layer.
#[derive(Debug, Clone)]
pub(crate) struct ArrayGroup<V> {
    pub(crate) layout_vertices: Vec<V>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) segments: SegmentVector,
    pub(crate) paint: Vec<PaintArrays>,
}

impl<V: LayoutVertex> ArrayGroup<V> {
    pub(crate) fn new(layers: &[Arc<ShapeLayer>], globals: &GlobalProperties) -> Self {
        Self {
            layout_vertices: Vec::new(),
            triangles: Vec::new(),
            segments: SegmentVector::new(),
            paint: layers.iter().map(|l| PaintArrays::new(l, globals)).collect(),
        }
    }

    /// Append one marker: reserve room in a segment, then write vertices and
    /// triangles whose local indices are rebased onto the segment.
    pub(crate) fn emit(&mut self, vertices: &[V], triangles: &[[u16; 3]]) {
        let segment = self.segments.prepare(
            vertices.len(),
            self.layout_vertices.len(),
            self.triangles.len(),
        );

        let base = segment.vertex_length as u16;
        segment.vertex_length += vertices.len() as u32;
        segment.primitive_length += triangles.len() as u32;

        self.layout_vertices.extend_from_slice(vertices);
        self.triangles
            .extend(triangles.iter().map(|t| Triangle([base + t[0], base + t[1], base + t[2]])));
    }

    /// Back-fill paint values for the vertices of the feature just emitted.
    pub(crate) fn populate_paint_arrays(
        &mut self,
        layers: &[Arc<ShapeLayer>],
        globals: &GlobalProperties,
        properties: &Properties,
    ) {
        let vertex_len = self.layout_vertices.len();

        for (arrays, layer) in self.paint.iter_mut().zip(layers) {
            arrays.populate(layer, globals, properties, vertex_len);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.layout_vertices.clear();
        self.triangles.clear();
        self.segments.clear();
        self.paint.iter_mut().for_each(PaintArrays::clear);
    }
}
