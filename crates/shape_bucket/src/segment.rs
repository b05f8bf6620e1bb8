//! Draw segments: vertex/index ranges addressable with u16 indices.

use log::trace;

/// Most vertices one segment may hold; relative indices then fit a `u16`.
pub const MAX_SEGMENT_VERTICES: usize = u16::MAX as usize + 1;

/// One draw call's worth of vertices and triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    pub vertex_offset: u32,
    pub vertex_length: u32,
    pub primitive_offset: u32,
    pub primitive_length: u32,
}

impl Segment {
    /// Absolute vertex range covered by this segment.
    pub fn vertex_range(&self) -> std::ops::Range<usize> {
        let start = self.vertex_offset as usize;
        start..start + self.vertex_length as usize
    }

    /// Absolute triangle range covered by this segment.
    pub fn primitive_range(&self) -> std::ops::Range<usize> {
        let start = self.primitive_offset as usize;
        start..start + self.primitive_length as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentVector {
    segments: Vec<Segment>,
    max_vertices: usize,
}

impl Default for SegmentVector {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentVector {
    pub fn new() -> Self {
        Self::with_max_vertices(MAX_SEGMENT_VERTICES)
    }

    /// A smaller ceiling, mostly useful for exercising segment splits.
    pub fn with_max_vertices(max_vertices: usize) -> Self {
        Self {
            segments: Vec::new(),
            max_vertices: max_vertices.clamp(4, MAX_SEGMENT_VERTICES),
        }
    }

    /// Return a segment with room for `vertices` more vertices, opening a new one
    /// at the buffers' current lengths when the open segment is full.
    pub fn prepare(&mut self, vertices: usize, vertex_len: usize, primitive_len: usize) -> &mut Segment {
        let fits = self
            .segments
            .last()
            .map_or(false, |s| s.vertex_length as usize + vertices <= self.max_vertices);

        if !fits {
            trace!(
                "opening segment {} at vertex {} / primitive {}",
                self.segments.len(),
                vertex_len,
                primitive_len
            );
            self.segments.push(Segment {
                vertex_offset: vertex_len as u32,
                vertex_length: 0,
                primitive_offset: primitive_len as u32,
                primitive_length: 0,
            });
        }

        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn into_vec(self) -> Vec<Segment> {
        self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_open_segment_until_full() {
        let mut segments = SegmentVector::with_max_vertices(8);
        let (mut vertices, mut primitives) = (0usize, 0usize);

        for _ in 0..3 {
            let segment = segments.prepare(4, vertices, primitives);
            segment.vertex_length += 4;
            segment.primitive_length += 2;
            vertices += 4;
            primitives += 2;
        }

        assert_eq!(
            segments.as_slice(),
            &[
                Segment { vertex_offset: 0, vertex_length: 8, primitive_offset: 0, primitive_length: 4 },
                Segment { vertex_offset: 8, vertex_length: 4, primitive_offset: 4, primitive_length: 2 },
            ]
        );
    }

    #[test]
    fn default_ceiling_is_u16_addressable() {
        let mut segments = SegmentVector::new();
        let segment = segments.prepare(4, 0, 0);
        segment.vertex_length = (MAX_SEGMENT_VERTICES - 4) as u32;

        // Exactly fills the segment.
        segments.prepare(4, MAX_SEGMENT_VERTICES - 4, 0).vertex_length += 4;
        assert_eq!(segments.len(), 1);

        // One more opens a new one.
        let next = segments.prepare(3, MAX_SEGMENT_VERTICES, 0);
        assert_eq!(next.vertex_offset as usize, MAX_SEGMENT_VERTICES);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn ranges_are_absolute() {
        let segment = Segment { vertex_offset: 10, vertex_length: 4, primitive_offset: 5, primitive_length: 2 };

        assert_eq!(segment.vertex_range(), 10..14);
        assert_eq!(segment.primitive_range(), 5..7);
    }
}
