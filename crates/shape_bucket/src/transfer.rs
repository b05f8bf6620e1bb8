//! SHPB: finished shape buffers as a file, so tiles can be built offline and
//! loaded straight into the draw layer.
//!
//! File layout (little-endian):
//!   00  : [u8;4]  magic = b"SHPB"
//!   04  : u32     version = 1
//!   08  : u32     flags (bitfield)
//!                 bit 0 => icon vertices (12 bytes, textured); else unit-square (8 bytes)
//!                 bit 1 => icons need linear filtering
//!                 bit 2 => body is deflate-compressed
//!   0C  : u32     body length in bytes, as stored
//!   10  : body
//!
//! Body:
//!   u32 vertex_count, u32 triangle_count, u32 segment_count, u32 layer_count
//!   vertex_count records of i16/u16 components
//!   triangle_count x u16[3]
//!   segment_count x u32[4] (vertex offset, vertex length, primitive offset, primitive length)
//!   for each layer:
//!     u16 id_len, id (utf-8), u8 binding_count
//!     for each binding:
//!       u8 name_len, name (utf-8), u8 tag
//!       tag 0 => constant:   u8 n, f32[n]
//!       tag 1 => per-vertex: u8 type (1 = u8, 2 = u16), u32 len, values[len]

use crate::buffers::{LayoutVertices, ShapeBuffers};
use crate::error::{Error, Result};
use crate::paint::{AttributeData, AttributeType, AttributeValues, PaintArrays, PaintAttribute, PaintBinding};
use crate::segment::{Segment, MAX_SEGMENT_VERTICES};
use crate::vertex::{IconVertex, QuadVertex, Triangle};
use smallvec::SmallVec;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub const SHPB_MAGIC: [u8; 4] = *b"SHPB";
pub const SHPB_VERSION: u32 = 1;

const FLAG_TEXTURE: u32 = 1 << 0;
const FLAG_LINEAR: u32 = 1 << 1;
const FLAG_DEFLATE: u32 = 1 << 2;

const TAG_CONSTANT: u8 = 0;
const TAG_PER_VERTEX: u8 = 1;

/// Deflate level used when compressing bodies.
const DEFLATE_LEVEL: u8 = 6;

#[inline(always)]
fn need(buf: &[u8], want: usize) -> Result<()> {
    if buf.len() < want {
        Err(bad("truncated SHPB"))
    } else {
        Ok(())
    }
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    need(buf, n)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[inline(always)]
fn le_u8(buf: &mut &[u8]) -> Result<u8> {
    Ok(take(buf, 1)?[0])
}

#[inline(always)]
fn le_u16(buf: &mut &[u8]) -> Result<u16> {
    let b = take(buf, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline(always)]
fn le_i16(buf: &mut &[u8]) -> Result<i16> {
    let b = take(buf, 2)?;
    Ok(i16::from_le_bytes([b[0], b[1]]))
}

#[inline(always)]
fn le_u32(buf: &mut &[u8]) -> Result<u32> {
    let b = take(buf, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline(always)]
fn le_f32(buf: &mut &[u8]) -> Result<f32> {
    let b = take(buf, 4)?;
    Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| bad("name is not utf-8"))
}

#[cold]
fn bad(msg: &str) -> Error {
    Error::Transfer(msg.to_string())
}

/// Serialize finished buffers, optionally deflating the body.
pub fn encode(buffers: &ShapeBuffers, compress: bool) -> Result<Vec<u8>> {
    let body = encode_body(buffers)?;

    let mut flags = 0u32;
    if buffers.layout_vertices().has_texture() {
        flags |= FLAG_TEXTURE;
    }
    if buffers.icons_need_linear() {
        flags |= FLAG_LINEAR;
    }

    let body = if compress {
        flags |= FLAG_DEFLATE;
        miniz_oxide::deflate::compress_to_vec(&body, DEFLATE_LEVEL)
    } else {
        body
    };

    let mut out = Vec::with_capacity(16 + body.len());
    out.write_all(&SHPB_MAGIC)?;
    write_u32(&mut out, SHPB_VERSION)?;
    write_u32(&mut out, flags)?;
    write_u32(&mut out, body.len() as u32)?;
    out.write_all(&body)?;

    Ok(out)
}

fn encode_body(buffers: &ShapeBuffers) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let layers = buffers.paint_layers();

    write_u32(&mut out, buffers.vertex_count() as u32)?;
    write_u32(&mut out, buffers.triangle_count() as u32)?;
    write_u32(&mut out, buffers.segments().len() as u32)?;
    write_u32(&mut out, layers.len() as u32)?;

    match buffers.layout_vertices() {
        LayoutVertices::Icon(vertices) => {
            for v in vertices {
                write_i16(&mut out, v.pos[0])?;
                write_i16(&mut out, v.pos[1])?;
                write_i16(&mut out, v.offset[0])?;
                write_i16(&mut out, v.offset[1])?;
                write_u16(&mut out, v.tex[0])?;
                write_u16(&mut out, v.tex[1])?;
            }
        }
        LayoutVertices::Quad(vertices) => {
            for v in vertices {
                write_i16(&mut out, v.pos[0])?;
                write_i16(&mut out, v.pos[1])?;
                write_i16(&mut out, v.extrude[0])?;
                write_i16(&mut out, v.extrude[1])?;
            }
        }
    }

    for Triangle(indices) in buffers.triangles() {
        for &index in indices {
            write_u16(&mut out, index)?;
        }
    }

    for segment in buffers.segments() {
        write_u32(&mut out, segment.vertex_offset)?;
        write_u32(&mut out, segment.vertex_length)?;
        write_u32(&mut out, segment.primitive_offset)?;
        write_u32(&mut out, segment.primitive_length)?;
    }

    for layer in layers {
        let id = layer.layer_id().as_bytes();
        let id_len = u16::try_from(id.len()).map_err(|_| bad("layer id too long"))?;
        write_u16(&mut out, id_len)?;
        out.write_all(id)?;

        out.write_all(&[layer.bindings().len() as u8])?;

        for binding in layer.bindings() {
            let name = binding.attribute.name.as_bytes();
            out.write_all(&[name.len() as u8])?;
            out.write_all(name)?;

            match &binding.data {
                AttributeData::Constant(values) => {
                    out.write_all(&[TAG_CONSTANT, values.len() as u8])?;
                    for &value in values {
                        out.write_all(&value.to_le_bytes())?;
                    }
                }
                AttributeData::PerVertex(values) => {
                    out.write_all(&[TAG_PER_VERTEX, binding.attribute.ty as u8])?;
                    write_u32(&mut out, values.len() as u32)?;
                    match values {
                        AttributeValues::Uint8(v) => out.write_all(v)?,
                        AttributeValues::Uint16(v) => {
                            for &value in v {
                                write_u16(&mut out, value)?;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Parse SHPB bytes, checking that segments, indices and paint arrays agree
/// with the vertex buffer.
pub fn decode(mut p: &[u8]) -> Result<ShapeBuffers> {
    if take(&mut p, 4)? != SHPB_MAGIC {
        return Err(bad("bad SHPB magic"));
    }

    let version = le_u32(&mut p)?;
    if version != SHPB_VERSION {
        return Err(bad("unsupported SHPB version"));
    }

    let flags = le_u32(&mut p)?;
    let body_len = le_u32(&mut p)? as usize;
    let stored = take(&mut p, body_len)?;

    let inflated;
    let body = if flags & FLAG_DEFLATE != 0 {
        inflated = miniz_oxide::inflate::decompress_to_vec(stored)
            .map_err(|e| Error::Transfer(format!("inflate failed: {:?}", e.status)))?;
        inflated.as_slice()
    } else {
        stored
    };

    decode_body(body, flags)
}

fn decode_body(mut p: &[u8], flags: u32) -> Result<ShapeBuffers> {
    let vertex_count = le_u32(&mut p)? as usize;
    let triangle_count = le_u32(&mut p)? as usize;
    let segment_count = le_u32(&mut p)? as usize;
    let layer_count = le_u32(&mut p)? as usize;

    let textured = flags & FLAG_TEXTURE != 0;
    let stride = if textured { 12 } else { 8 };
    need(p, vertex_count.checked_mul(stride).ok_or_else(|| bad("vertex size overflow"))?)?;

    let layout_vertices = if textured {
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(IconVertex {
                pos: [le_i16(&mut p)?, le_i16(&mut p)?],
                offset: [le_i16(&mut p)?, le_i16(&mut p)?],
                tex: [le_u16(&mut p)?, le_u16(&mut p)?],
            });
        }
        LayoutVertices::Icon(vertices)
    } else {
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(QuadVertex {
                pos: [le_i16(&mut p)?, le_i16(&mut p)?],
                extrude: [le_i16(&mut p)?, le_i16(&mut p)?],
            });
        }
        LayoutVertices::Quad(vertices)
    };

    need(p, triangle_count.checked_mul(6).ok_or_else(|| bad("index size overflow"))?)?;
    let mut triangles = Vec::with_capacity(triangle_count);
    for _ in 0..triangle_count {
        triangles.push(Triangle([le_u16(&mut p)?, le_u16(&mut p)?, le_u16(&mut p)?]));
    }

    need(p, segment_count.checked_mul(16).ok_or_else(|| bad("segment size overflow"))?)?;
    let mut segments = Vec::with_capacity(segment_count);
    for _ in 0..segment_count {
        segments.push(Segment {
            vertex_offset: le_u32(&mut p)?,
            vertex_length: le_u32(&mut p)?,
            primitive_offset: le_u32(&mut p)?,
            primitive_length: le_u32(&mut p)?,
        });
    }
    check_segments(&segments, &triangles, vertex_count)?;

    let mut paint = Vec::with_capacity(layer_count.min(64));
    for _ in 0..layer_count {
        paint.push(decode_layer(&mut p, vertex_count)?);
    }

    if !p.is_empty() {
        return Err(bad("trailing bytes after SHPB body"));
    }

    Ok(ShapeBuffers::from_parts(
        layout_vertices,
        triangles,
        segments,
        paint,
        flags & FLAG_LINEAR != 0,
    ))
}

fn check_segments(segments: &[Segment], triangles: &[Triangle], vertex_count: usize) -> Result<()> {
    let (mut vertices, mut primitives) = (0usize, 0usize);

    for segment in segments {
        if segment.vertex_offset as usize != vertices || segment.primitive_offset as usize != primitives {
            return Err(bad("segments are not contiguous"));
        }
        if segment.vertex_length as usize > MAX_SEGMENT_VERTICES {
            return Err(bad("segment exceeds the u16 index range"));
        }

        vertices += segment.vertex_length as usize;
        primitives += segment.primitive_length as usize;

        let owned = triangles
            .get(segment.primitive_range())
            .ok_or_else(|| bad("segment covers missing triangles"))?;
        if owned
            .iter()
            .flat_map(|t| t.0)
            .any(|index| index as u32 >= segment.vertex_length)
        {
            return Err(bad("index outside its segment"));
        }
    }

    if vertices != vertex_count || primitives != triangles.len() {
        return Err(bad("segments do not cover the buffers"));
    }

    Ok(())
}

fn decode_layer(p: &mut &[u8], vertex_count: usize) -> Result<PaintArrays> {
    let id_len = le_u16(p)? as usize;
    let layer_id = utf8(take(p, id_len)?)?;

    let binding_count = le_u8(p)? as usize;
    let mut bindings = Vec::with_capacity(binding_count);

    for _ in 0..binding_count {
        let name_len = le_u8(p)? as usize;
        let name = utf8(take(p, name_len)?)?;
        let attribute = PaintAttribute::by_name(&name)
            .ok_or_else(|| Error::Transfer(format!("unknown paint attribute {:?}", name)))?;

        let data = match le_u8(p)? {
            TAG_CONSTANT => {
                let n = le_u8(p)? as usize;
                let mut values = SmallVec::new();
                for _ in 0..n {
                    values.push(le_f32(p)?);
                }
                AttributeData::Constant(values)
            }
            TAG_PER_VERTEX => {
                let ty = le_u8(p)?;
                if ty != attribute.ty as u8 {
                    return Err(Error::Transfer(format!("{}: wrong component type {}", name, ty)));
                }

                let len = le_u32(p)? as usize;
                if len != vertex_count * attribute.components {
                    return Err(Error::Transfer(format!("{}: length does not match vertices", name)));
                }

                let values = match attribute.ty {
                    AttributeType::Uint8 => AttributeValues::Uint8(take(p, len)?.to_vec()),
                    AttributeType::Uint16 => {
                        need(p, len * 2)?;
                        let mut values = Vec::with_capacity(len);
                        for _ in 0..len {
                            values.push(le_u16(p)?);
                        }
                        AttributeValues::Uint16(values)
                    }
                };
                AttributeData::PerVertex(values)
            }
            tag => return Err(Error::Transfer(format!("{}: unknown binding tag {}", name, tag))),
        };

        bindings.push(PaintBinding { attribute, data });
    }

    Ok(PaintArrays::from_parts(layer_id, bindings, vertex_count))
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<ShapeBuffers> {
    let file = File::open(path)?;
    // SAFETY: the map is only read while parsing and dropped before returning.
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    decode(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<ShapeBuffers> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

pub fn write_file<P: AsRef<Path>>(path: P, buffers: &ShapeBuffers, compress: bool) -> Result<()> {
    let bytes = encode(buffers, compress)?;

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.flush()?;

    Ok(())
}

#[inline]
fn write_u16<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

#[inline]
fn write_i16<W: Write>(w: &mut W, v: i16) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

#[inline]
fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
