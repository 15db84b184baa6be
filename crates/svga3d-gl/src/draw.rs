//! `DRAW_PRIMITIVES`: vertex declarations and primitive ranges to host draws.
//!
//! A draw runs in two phases. [`prepare`] resolves every array to a host buffer (or, for
//! zero-stride arrays, to a single decoded element) while no guest context is bound,
//! because backing creation switches to the Shared Context. [`execute`] then runs on the
//! guest context: it binds the arrays, issues one host draw per range and puts the array
//! state back the way it found it.

use svga3d_protocol::draw::PrimitiveType;
use svga3d_protocol::{PrimitiveRange, VertexDecl, VertexDivisor, SVGA3D_INVALID_ID};

use crate::caps::HostFeatures;
use crate::config::{MAX_FIXED_TEXTURE_STAGES, MAX_PRIMITIVE_RANGES, MAX_VERTEX_ARRAYS};
use crate::context::Host;
use crate::error::CommandError;
use crate::format::FormatConverter;
use crate::gl::{consts as gl, GLenum, GLuint};
use crate::slots::SlotMap;
use crate::state::Apply;
use crate::surface::{BackingUsage, HostObject, Surface};
use crate::vertex::{decode_element, fixed_array, CheckedDecl, FixedArray};

/// Upper bound on vertices expanded for a constant fixed-function position.
const MAX_EXPANDED_VERTICES: u32 = 1 << 20;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ArraySource {
    Buffer(GLuint),
    /// Zero-stride array: every vertex reads the same element.
    Constant { value: [f32; 4], bytes: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DrawArray {
    pub decl: CheckedDecl,
    pub source: ArraySource,
    pub divisor: VertexDivisor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct IndexSource {
    pub buffer: GLuint,
    pub ty: GLenum,
    pub offset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DrawRange {
    pub mode: GLenum,
    pub vertex_count: u32,
    pub index: Option<IndexSource>,
    /// First vertex of a non-indexed range, base vertex of an indexed one.
    pub bias: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DrawCall {
    pub arrays: Vec<DrawArray>,
    pub ranges: Vec<DrawRange>,
    pub instances: u32,
    /// Vertices addressed by any range; sizes expanded constant arrays.
    pub vertex_span: u32,
}

pub(crate) fn primitive_mode(ty: PrimitiveType) -> Option<GLenum> {
    Some(match ty {
        PrimitiveType::TriangleList => gl::TRIANGLES,
        PrimitiveType::PointList => gl::POINTS,
        PrimitiveType::LineList => gl::LINES,
        PrimitiveType::LineStrip => gl::LINE_STRIP,
        PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
        PrimitiveType::TriangleFan => gl::TRIANGLE_FAN,
        PrimitiveType::Invalid => return None,
    })
}

/// Vertices (or indices) consumed by `count` primitives.
pub(crate) fn vertex_count(ty: PrimitiveType, count: u32) -> Option<u32> {
    match ty {
        PrimitiveType::TriangleList => count.checked_mul(3),
        PrimitiveType::PointList => Some(count),
        PrimitiveType::LineList => count.checked_mul(2),
        PrimitiveType::LineStrip => count.checked_add(1),
        PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan => count.checked_add(2),
        PrimitiveType::Invalid => None,
    }
}

fn index_type(width: u32) -> Result<GLenum, CommandError> {
    match width {
        2 => Ok(gl::UNSIGNED_SHORT),
        4 => Ok(gl::UNSIGNED_INT),
        w => Err(CommandError::unknown("index width", w)),
    }
}

/// Largest index among `count` indices at `offset` in a shadow.
fn max_index(data: &[u8], offset: usize, width: u32, count: u32) -> Result<u32, CommandError> {
    let w = width as usize;
    let end = (count as usize)
        .checked_mul(w)
        .and_then(|n| n.checked_add(offset))
        .filter(|end| *end <= data.len())
        .ok_or(CommandError::Malformed("index range past the end of the index buffer"))?;
    Ok(data[offset..end]
        .chunks_exact(w)
        .map(|c| match c {
            [a, b] => u32::from(u16::from_le_bytes([*a, *b])),
            [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
            _ => 0,
        })
        .max()
        .unwrap_or(0))
}

fn constant_element(surface: &Surface, d: &CheckedDecl) -> Result<ArraySource, CommandError> {
    let data = surface
        .level(0, 0)
        .map(|l| l.data.as_slice())
        .ok_or(CommandError::InvalidSurface(surface.sid))?;
    let start = d.decl.array.offset as usize;
    let bytes = data
        .get(start..start + d.element_bytes())
        .ok_or(CommandError::Malformed("vertex array offset past the end of its surface"))?;
    let value = decode_element(d.ty, bytes).ok_or(CommandError::Malformed("short vertex element"))?;
    Ok(ArraySource::Constant {
        value,
        bytes: bytes.to_vec(),
    })
}

fn vertex_buffer(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    sid: u32,
) -> Result<GLuint, CommandError> {
    let surface = surfaces.get_mut(sid).ok_or(CommandError::InvalidSurface(sid))?;
    surface.ensure_backing(host, converter, BackingUsage::VertexData)?;
    match surface.object() {
        Some(HostObject::Buffer { name }) => Ok(name),
        _ => Err(CommandError::Unsupported("vertex data in a non-buffer surface")),
    }
}

/// Checks the command and resolves every array and index buffer. Must run with no guest
/// context bound.
pub(crate) fn prepare(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    decls: &[VertexDecl],
    ranges: &[PrimitiveRange],
    divisors: &[VertexDivisor],
) -> Result<DrawCall, CommandError> {
    if decls.len() > MAX_VERTEX_ARRAYS {
        return Err(CommandError::IndexOutOfRange {
            what: "vertex declaration",
            index: decls.len() as u32,
            limit: MAX_VERTEX_ARRAYS as u32,
        });
    }
    if ranges.is_empty() || ranges.len() > MAX_PRIMITIVE_RANGES {
        return Err(CommandError::IndexOutOfRange {
            what: "primitive range",
            index: ranges.len() as u32,
            limit: MAX_PRIMITIVE_RANGES as u32,
        });
    }
    if divisors.len() > decls.len() {
        return Err(CommandError::Malformed("more vertex divisors than declarations"));
    }
    let checked = decls.iter().map(CheckedDecl::new).collect::<Result<Vec<_>, _>>()?;

    let mut out_ranges = Vec::with_capacity(ranges.len());
    let mut span = 0u32;
    for r in ranges {
        let ty = r
            .primitive_type()
            .filter(|t| *t != PrimitiveType::Invalid)
            .ok_or_else(|| CommandError::unknown("primitive type", r.prim_type))?;
        let count = vertex_count(ty, r.primitive_count).ok_or(CommandError::Malformed("primitive count overflow"))?;
        let mode = primitive_mode(ty).ok_or_else(|| CommandError::unknown("primitive type", r.prim_type))?;

        let index = if r.index_array.surface_id == SVGA3D_INVALID_ID {
            if r.index_bias < 0 {
                return Err(CommandError::Malformed("negative first vertex"));
            }
            span = span.max((r.index_bias as u32).saturating_add(count));
            None
        } else {
            let ty = index_type(r.index_width)?;
            let sid = r.index_array.surface_id;
            let offset = r.index_array.offset as usize;
            let highest = {
                let surface = surfaces.get(sid).ok_or(CommandError::InvalidSurface(sid))?;
                let data = surface.level(0, 0).map(|l| l.data.as_slice()).unwrap_or_default();
                max_index(data, offset, r.index_width, count)?
            };
            span = span.max((i64::from(highest) + i64::from(r.index_bias) + 1).clamp(0, i64::from(u32::MAX)) as u32);
            let buffer = vertex_buffer(surfaces, host, converter, sid)?;
            Some(IndexSource { buffer, ty, offset })
        };
        out_ranges.push(DrawRange {
            mode,
            vertex_count: count,
            index,
            bias: r.index_bias,
        });
    }

    let mut arrays = Vec::with_capacity(checked.len());
    for (i, d) in checked.into_iter().enumerate() {
        let sid = d.decl.array.surface_id;
        let source = if d.is_constant() {
            constant_element(surfaces.get(sid).ok_or(CommandError::InvalidSurface(sid))?, &d)?
        } else {
            ArraySource::Buffer(vertex_buffer(surfaces, host, converter, sid)?)
        };
        if d.decl.range_hint.last != 0 {
            span = span.max(d.decl.range_hint.last);
        }
        arrays.push(DrawArray {
            decl: d,
            source,
            divisor: divisors.get(i).copied().unwrap_or_default(),
        });
    }

    // Stream 0 carries the instance count of indexed instancing.
    let instances = arrays
        .iter()
        .find(|a| a.divisor.indexed_data())
        .map_or(1, |a| a.divisor.count().max(1));
    Ok(DrawCall {
        arrays,
        ranges: out_ranges,
        instances,
        vertex_span: span,
    })
}

/// Host array state a draw changed and has to put back.
#[derive(Default)]
struct Bindings {
    attribs: Vec<u32>,
    divisors: Vec<u32>,
    client_states: Vec<GLenum>,
    texcoord_units: Vec<u32>,
    temp_buffers: Vec<GLuint>,
    constants: Vec<FixedArray>,
}

/// Runs a prepared draw on the bound guest context. `generic` selects generic
/// attributes (a vertex shader is active) over the fixed-function arrays.
pub(crate) fn execute(a: &mut Apply<'_>, call: &DrawCall, generic: bool) -> Result<(), CommandError> {
    if call.instances > 1 && !a.supports(HostFeatures::DRAW_INSTANCED) {
        return Err(CommandError::Unsupported("instanced draw"));
    }
    if call.ranges.iter().any(|r| r.index.is_some() && r.bias != 0) && !a.supports(HostFeatures::DRAW_BASE_VERTEX) {
        return Err(CommandError::Unsupported("indexed draw with a base vertex"));
    }
    if !generic && call.vertex_span > MAX_EXPANDED_VERTICES && call.arrays.iter().any(expands_position) {
        return Err(CommandError::Malformed("constant position over too many vertices"));
    }
    tracing::trace!(
        arrays = call.arrays.len(),
        ranges = call.ranges.len(),
        instances = call.instances,
        generic,
        "draw primitives"
    );

    let mut b = Bindings::default();
    let setup = if generic {
        bind_generic(a, call, &mut b)
    } else {
        bind_fixed(a, call, &mut b)
    };
    let result = setup.map(|()| {
        for r in &call.ranges {
            draw_range(a, r, call.instances);
        }
    });
    unbind(a, b);
    a.trace("draw primitives");
    result
}

fn bind_generic(a: &mut Apply<'_>, call: &DrawCall, b: &mut Bindings) -> Result<(), CommandError> {
    let max = a.caps.limits.max_vertex_attribs;
    for (i, arr) in call.arrays.iter().enumerate() {
        let index = i as u32;
        if index >= max {
            return Err(CommandError::Unsupported("more vertex declarations than host attributes"));
        }
        let f = arr.decl.format();
        match &arr.source {
            ArraySource::Constant { value, .. } => {
                a.gl.disable_vertex_attrib_array(index);
                a.gl.vertex_attrib_4fv(index, value);
            }
            ArraySource::Buffer(name) => {
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl
                    .vertex_attrib_pointer(index, f.size, f.ty, f.normalized, arr.decl.decl.array.stride, arr.decl.decl.array.offset as usize);
                a.gl.enable_vertex_attrib_array(index);
                b.attribs.push(index);
            }
        }
        if arr.divisor.instance_data() {
            if !a.supports(HostFeatures::INSTANCED_ARRAYS) {
                return Err(CommandError::Unsupported("per-instance vertex data"));
            }
            a.gl.vertex_attrib_divisor(index, arr.divisor.count().max(1));
            b.divisors.push(index);
        }
    }
    Ok(())
}

/// A zero-stride fixed-function position, which has to be replicated per vertex.
fn expands_position(arr: &DrawArray) -> bool {
    matches!(arr.source, ArraySource::Constant { .. })
        && fixed_array(arr.decl.usage, arr.decl.decl.identity.usage_index) == Some(FixedArray::Position)
}

fn fixed_units(a: &Apply<'_>) -> usize {
    (a.caps.limits.max_texture_units as usize).min(MAX_FIXED_TEXTURE_STAGES)
}

fn bind_fixed(a: &mut Apply<'_>, call: &DrawCall, b: &mut Bindings) -> Result<(), CommandError> {
    for arr in &call.arrays {
        let d = &arr.decl;
        if arr.divisor.instance_data() {
            return Err(CommandError::Unsupported("per-instance vertex data without a vertex shader"));
        }
        let Some(target) = fixed_array(d.usage, d.decl.identity.usage_index) else {
            tracing::debug!(usage = d.usage.name(), index = d.decl.identity.usage_index, "no fixed-function array; skipped");
            continue;
        };
        let f = d.format();
        let stride = d.decl.array.stride;
        let offset = d.decl.array.offset as usize;

        match (&arr.source, target) {
            (ArraySource::Constant { bytes, .. }, FixedArray::Position) => {
                // Positions have no current value; replicate the element instead.
                let n = call.vertex_span as usize;
                let mut data = Vec::new();
                data.try_reserve_exact(bytes.len() * n)?;
                for _ in 0..n {
                    data.extend_from_slice(bytes);
                }
                let name = a.gl.gen_buffer();
                b.temp_buffers.push(name);
                a.gl.bind_buffer(gl::ARRAY_BUFFER, name);
                a.gl.buffer_data(gl::ARRAY_BUFFER, data.len(), Some(&data), gl::STREAM_DRAW);
                a.gl.vertex_pointer(f.size, f.ty, bytes.len() as u32, 0);
                enable_client(a, b, gl::VERTEX_ARRAY);
            }
            (ArraySource::Constant { value, .. }, other) => {
                set_current(a, other, value);
                b.constants.push(other);
            }
            (ArraySource::Buffer(name), FixedArray::Position) => {
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl.vertex_pointer(f.size, f.ty, stride, offset);
                enable_client(a, b, gl::VERTEX_ARRAY);
            }
            (ArraySource::Buffer(name), FixedArray::Normal) => {
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl.normal_pointer(f.ty, stride, offset);
                enable_client(a, b, gl::NORMAL_ARRAY);
            }
            (ArraySource::Buffer(name), FixedArray::Color) => {
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl.color_pointer(f.size, f.ty, stride, offset);
                enable_client(a, b, gl::COLOR_ARRAY);
            }
            (ArraySource::Buffer(name), FixedArray::SecondaryColor) => {
                if !a.supports(HostFeatures::SECONDARY_COLOR) {
                    tracing::debug!("host has no secondary colour arrays; skipped");
                    continue;
                }
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl.secondary_color_pointer(f.size, f.ty, stride, offset);
                enable_client(a, b, gl::SECONDARY_COLOR_ARRAY);
            }
            (ArraySource::Buffer(name), FixedArray::Fog) => {
                if !a.supports(HostFeatures::FOG_COORD) {
                    tracing::debug!("host has no fog coordinate arrays; skipped");
                    continue;
                }
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                a.gl.fog_coord_pointer(f.ty, stride, offset);
                enable_client(a, b, gl::FOG_COORD_ARRAY);
            }
            (ArraySource::Buffer(name), FixedArray::TexCoord(set)) => {
                a.gl.bind_buffer(gl::ARRAY_BUFFER, *name);
                for stage in 0..fixed_units(a) {
                    if a.shadow.texcoord_index(stage) != set {
                        continue;
                    }
                    let unit = stage as u32;
                    a.gl.client_active_texture(gl::TEXTURE0 + unit);
                    a.gl.tex_coord_pointer(f.size, f.ty, stride, offset);
                    a.gl.enable_client_state(gl::TEXTURE_COORD_ARRAY);
                    b.texcoord_units.push(unit);
                }
                a.gl.client_active_texture(gl::TEXTURE0);
            }
        }
    }
    Ok(())
}

fn enable_client(a: &mut Apply<'_>, b: &mut Bindings, array: GLenum) {
    a.gl.enable_client_state(array);
    b.client_states.push(array);
}

/// Loads a constant into the host's current vertex value.
fn set_current(a: &mut Apply<'_>, target: FixedArray, v: &[f32; 4]) {
    match target {
        FixedArray::Position => {}
        FixedArray::Normal => a.gl.normal_3fv(&[v[0], v[1], v[2]]),
        FixedArray::Color => a.gl.color_4fv(v),
        FixedArray::SecondaryColor => {
            if a.supports(HostFeatures::SECONDARY_COLOR) {
                a.gl.secondary_color_3fv(&[v[0], v[1], v[2]]);
            }
        }
        FixedArray::Fog => {
            if a.supports(HostFeatures::FOG_COORD) {
                a.gl.fog_coord_f(v[0]);
            }
        }
        FixedArray::TexCoord(set) => {
            for stage in 0..fixed_units(a) {
                if a.shadow.texcoord_index(stage) == set {
                    a.gl.multi_tex_coord_4fv(gl::TEXTURE0 + stage as u32, v);
                }
            }
        }
    }
}

/// Host defaults of the current vertex values.
fn reset_current(a: &mut Apply<'_>, target: FixedArray) {
    let v = match target {
        FixedArray::Color => [1.0, 1.0, 1.0, 1.0],
        FixedArray::Normal => [0.0, 0.0, 1.0, 0.0],
        FixedArray::TexCoord(_) => [0.0, 0.0, 0.0, 1.0],
        _ => [0.0; 4],
    };
    set_current(a, target, &v);
}

fn draw_range(a: &mut Apply<'_>, r: &DrawRange, instances: u32) {
    let gl = &mut *a.gl;
    match r.index {
        None if instances > 1 => gl.draw_arrays_instanced(r.mode, r.bias, r.vertex_count, instances),
        None => gl.draw_arrays(r.mode, r.bias, r.vertex_count),
        Some(ix) => {
            gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, ix.buffer);
            match (instances > 1, r.bias != 0) {
                (false, false) => gl.draw_elements(r.mode, r.vertex_count, ix.ty, ix.offset),
                (true, false) => gl.draw_elements_instanced(r.mode, r.vertex_count, ix.ty, ix.offset, instances),
                (false, true) => gl.draw_elements_base_vertex(r.mode, r.vertex_count, ix.ty, ix.offset, r.bias),
                (true, true) => {
                    gl.draw_elements_instanced_base_vertex(r.mode, r.vertex_count, ix.ty, ix.offset, instances, r.bias)
                }
            }
        }
    }
}

fn unbind(a: &mut Apply<'_>, b: Bindings) {
    for index in b.divisors {
        a.gl.vertex_attrib_divisor(index, 0);
    }
    for index in b.attribs {
        a.gl.disable_vertex_attrib_array(index);
    }
    for array in b.client_states {
        a.gl.disable_client_state(array);
    }
    for unit in b.texcoord_units {
        a.gl.client_active_texture(gl::TEXTURE0 + unit);
        a.gl.disable_client_state(gl::TEXTURE_COORD_ARRAY);
    }
    a.gl.client_active_texture(gl::TEXTURE0);
    for target in b.constants {
        reset_current(a, target);
    }
    a.gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, 0);
    a.gl.bind_buffer(gl::ARRAY_BUFFER, 0);
    for name in b.temp_buffers {
        a.gl.delete_buffer(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_counts_become_vertex_counts() {
        assert_eq!(vertex_count(PrimitiveType::TriangleList, 2), Some(6));
        assert_eq!(vertex_count(PrimitiveType::TriangleStrip, 2), Some(4));
        assert_eq!(vertex_count(PrimitiveType::TriangleFan, 1), Some(3));
        assert_eq!(vertex_count(PrimitiveType::LineList, 3), Some(6));
        assert_eq!(vertex_count(PrimitiveType::LineStrip, 3), Some(4));
        assert_eq!(vertex_count(PrimitiveType::PointList, 5), Some(5));
        assert_eq!(vertex_count(PrimitiveType::TriangleList, u32::MAX), None);
    }

    #[test]
    fn max_index_reads_both_widths() {
        let shorts: Vec<u8> = [0u16, 7, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(max_index(&shorts, 0, 2, 3).ok(), Some(7));
        assert_eq!(max_index(&shorts, 4, 2, 1).ok(), Some(3));
        assert!(max_index(&shorts, 2, 2, 3).is_err());
        let ints: Vec<u8> = [9u32, 70_000].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(max_index(&ints, 0, 4, 2).ok(), Some(70_000));
        assert!(index_type(3).is_err());
    }
}
