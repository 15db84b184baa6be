//! Render states.
//!
//! Each state ID maps to one small handler. A handler validates the value, then programs
//! the host; the new value is already in the shadow when it runs, so composite handlers
//! can re-derive their whole group from it.

use svga3d_protocol::state::{
    BlendEquation, BlendOp, CmpFunc, Face, FillMode, FogFunction, FrontWinding, PackedFillMode,
    PackedFogMode, PackedLinePattern, RenderStateId, ShadeMode, StencilOp, VertexMaterialSource,
};
use svga3d_protocol::RenderState;

use super::{argb, clamp_to, Apply};
use crate::caps::HostFeatures;
use crate::config::MAX_FIXED_TEXTURE_STAGES;
use crate::error::CommandError;
use crate::gl::{consts as gl, GLenum};

pub(crate) type Handler = fn(&mut Apply<'_>, u32) -> Result<(), CommandError>;

/// Applies one render state. On failure the shadow keeps its previous value.
pub(crate) fn set_render_state(a: &mut Apply<'_>, rs: RenderState) -> Result<(), CommandError> {
    let id = RenderStateId::from_u32(rs.state)
        .filter(|id| *id != RenderStateId::Invalid)
        .ok_or_else(|| CommandError::unknown("render state", rs.state))?;
    tracing::debug!(state = id.name(), value = rs.value, "set render state");

    let slot = id as usize;
    let previous = a.shadow.render[slot].replace(rs.value);
    if let Err(err) = handler(id)(a, rs.value) {
        a.shadow.render[slot] = previous;
        tracing::warn!(state = id.name(), value = rs.value, %err, "render state rejected");
        return Err(err);
    }
    a.trace(id.name());
    Ok(())
}

pub(crate) fn handler(id: RenderStateId) -> Handler {
    use RenderStateId as R;
    match id {
        R::ZEnable => |a, v| enable(a, gl::DEPTH_TEST, v),
        R::ZWriteEnable => |a, v| {
            a.gl.depth_mask(v != 0);
            Ok(())
        },
        R::AlphaTestEnable => |a, v| enable(a, gl::ALPHA_TEST, v),
        R::DitherEnable => |a, v| enable(a, gl::DITHER, v),
        R::BlendEnable => |a, v| enable(a, gl::BLEND, v),
        R::FogEnable => |a, v| enable(a, gl::FOG, v),
        R::SpecularEnable => |a, v| {
            let mode = if v != 0 { gl::SEPARATE_SPECULAR_COLOR } else { gl::SINGLE_COLOR };
            a.gl.light_model_i(gl::LIGHT_MODEL_COLOR_CONTROL, mode as i32);
            Ok(())
        },
        R::StencilEnable => |a, v| enable(a, gl::STENCIL_TEST, v),
        R::LightingEnable => |a, v| enable(a, gl::LIGHTING, v),
        R::NormalizeNormals => |a, v| enable(a, gl::NORMALIZE, v),
        R::PointSpriteEnable => point_sprite,
        R::PointScaleEnable | R::PointScaleA | R::PointScaleB | R::PointScaleC => |a, _| point_attenuation(a),
        R::StencilRef
        | R::StencilMask
        | R::StencilFunc
        | R::StencilFail
        | R::StencilZFail
        | R::StencilPass
        | R::StencilEnable2Sided
        | R::CcwStencilFunc
        | R::CcwStencilFail
        | R::CcwStencilZFail
        | R::CcwStencilPass => |a, _| stencil(a),
        R::StencilWriteMask => |a, v| {
            a.gl.stencil_mask(v);
            Ok(())
        },
        R::FogStart => |a, v| fog_f(a, gl::FOG_START, v),
        R::FogEnd => |a, v| fog_f(a, gl::FOG_END, v),
        R::FogDensity => |a, v| fog_f(a, gl::FOG_DENSITY, v),
        R::FogColor => |a, v| {
            a.gl.fog_fv(gl::FOG_COLOR, &argb(v));
            Ok(())
        },
        R::FogMode | R::RangeFogEnable => |a, _| fog_mode(a),
        R::PointSize => |a, v| {
            let size = clamp_to(f32::from_bits(v), a.caps.limits.point_size_range);
            a.gl.point_size(size);
            Ok(())
        },
        R::PointSizeMin => |a, v| point_size_limit(a, gl::POINT_SIZE_MIN, v),
        R::PointSizeMax => |a, v| point_size_limit(a, gl::POINT_SIZE_MAX, v),
        R::Ambient => |a, v| {
            a.gl.light_model_fv(gl::LIGHT_MODEL_AMBIENT, &argb(v));
            Ok(())
        },
        R::ClipPlaneEnable => clip_plane_enable,
        R::FillMode => fill_mode,
        R::ShadeMode => |a, v| {
            let mode = match ShadeMode::from_u32(v) {
                Some(ShadeMode::Flat) => gl::FLAT,
                Some(ShadeMode::Smooth | ShadeMode::Phong) => gl::SMOOTH,
                _ => return Err(CommandError::unknown("shade mode", v)),
            };
            a.gl.shade_model(mode);
            Ok(())
        },
        R::LinePattern => |a, v| {
            let p = PackedLinePattern::from_raw(v);
            if p.repeat == 0 {
                a.gl.disable(gl::LINE_STIPPLE);
            } else {
                a.gl.enable(gl::LINE_STIPPLE);
                a.gl.line_stipple(p.repeat as i32, p.pattern);
            }
            Ok(())
        },
        R::SrcBlend
        | R::DstBlend
        | R::BlendEquation
        | R::SeparateAlphaBlendEnable
        | R::SrcBlendAlpha
        | R::DstBlendAlpha
        | R::BlendEquationAlpha => |a, _| blend(a),
        R::CullMode => |a, v| {
            let mode = match Face::from_u32(v) {
                Some(Face::None) => {
                    a.gl.disable(gl::CULL_FACE);
                    return Ok(());
                }
                Some(Face::Front) => gl::FRONT,
                Some(Face::Back) => gl::BACK,
                Some(Face::FrontBack) => gl::FRONT_AND_BACK,
                _ => return Err(CommandError::unknown("cull mode", v)),
            };
            a.gl.enable(gl::CULL_FACE);
            a.gl.cull_face(mode);
            Ok(())
        },
        R::ZFunc => |a, v| {
            let func = compare_func(v)?;
            a.gl.depth_func(func);
            Ok(())
        },
        R::AlphaFunc | R::AlphaRef => |a, _| {
            let func = compare_func(a.rs_or(RenderStateId::AlphaFunc, CmpFunc::Always as u32))?;
            let reference = (a.rs_or(RenderStateId::AlphaRef, 0) & 0xff) as f32 / 255.0;
            a.gl.alpha_func(func, reference);
            Ok(())
        },
        R::FrontWinding => |a, v| {
            let mode = match FrontWinding::from_u32(v) {
                Some(FrontWinding::Cw) => gl::CW,
                Some(FrontWinding::Ccw) => gl::CCW,
                _ => return Err(CommandError::unknown("front winding", v)),
            };
            a.gl.front_face(mode);
            Ok(())
        },
        R::ZBias | R::DepthBias | R::SlopeScaleDepthBias => |a, _| depth_bias(a),
        R::ColorWriteEnable => |a, v| color_write(a, 0, v),
        R::ColorWriteEnable1 => |a, v| color_write(a, 1, v),
        R::ColorWriteEnable2 => |a, v| color_write(a, 2, v),
        R::ColorWriteEnable3 => |a, v| color_write(a, 3, v),
        R::VertexMaterialEnable
        | R::DiffuseMaterialSource
        | R::SpecularMaterialSource
        | R::AmbientMaterialSource
        | R::EmissiveMaterialSource => |a, _| color_material(a),
        R::TextureFactor => |a, v| {
            let color = argb(v);
            for unit in 0..fixed_units(a) {
                a.gl.active_texture(gl::TEXTURE0 + unit);
                a.gl.tex_env_fv(gl::TEXTURE_ENV, gl::TEXTURE_ENV_COLOR, &color);
            }
            a.gl.active_texture(gl::TEXTURE0);
            Ok(())
        },
        R::LocalViewer => |a, v| {
            a.gl.light_model_i(gl::LIGHT_MODEL_LOCAL_VIEWER, i32::from(v != 0));
            Ok(())
        },
        R::ScissorTestEnable => |a, v| enable(a, gl::SCISSOR_TEST, v),
        R::BlendColor => |a, v| {
            a.gl.blend_color(argb(v));
            Ok(())
        },
        R::MultisampleAntialias => |a, v| enable(a, gl::MULTISAMPLE, v),
        R::AntialiasedLineEnable => |a, v| enable(a, gl::LINE_SMOOTH, v),
        R::LineWidth => |a, v| {
            let width = clamp_to(f32::from_bits(v), a.caps.limits.line_width_range);
            a.gl.line_width(width);
            Ok(())
        },
        R::VertexBlend | R::IndexedVertexBlendEnable | R::TweenFactor => |_, v| {
            if v != 0 {
                tracing::debug!(value = v, "vertex blending is not translated");
            }
            Ok(())
        },
        // Shadow only: no host equivalent, or derived elsewhere.
        R::CoordinateType
        | R::OutputGamma
        | R::ZVisible
        | R::LastPixel
        | R::Clipping
        | R::Wrap0
        | R::Wrap1
        | R::Wrap2
        | R::Wrap3
        | R::Wrap4
        | R::Wrap5
        | R::Wrap6
        | R::Wrap7
        | R::Wrap8
        | R::Wrap9
        | R::Wrap10
        | R::Wrap11
        | R::Wrap12
        | R::Wrap13
        | R::Wrap14
        | R::Wrap15
        | R::MultisampleMask
        | R::TransparencyAntialias => |_, _| Ok(()),
        R::Invalid => |_, v| Err(CommandError::unknown("render state", v)),
    }
}

fn enable(a: &mut Apply<'_>, cap: GLenum, v: u32) -> Result<(), CommandError> {
    a.gl.set_enabled(cap, v != 0);
    Ok(())
}

fn fog_f(a: &mut Apply<'_>, pname: GLenum, v: u32) -> Result<(), CommandError> {
    a.gl.fog_f(pname, f32::from_bits(v));
    Ok(())
}

fn fixed_units(a: &Apply<'_>) -> u32 {
    a.caps.limits.max_texture_units.min(MAX_FIXED_TEXTURE_STAGES as u32)
}

pub(crate) fn compare_func(v: u32) -> Result<GLenum, CommandError> {
    Ok(match CmpFunc::from_u32(v) {
        Some(CmpFunc::Never) => gl::NEVER,
        Some(CmpFunc::Less) => gl::LESS,
        Some(CmpFunc::Equal) => gl::EQUAL,
        Some(CmpFunc::LessEqual) => gl::LEQUAL,
        Some(CmpFunc::Greater) => gl::GREATER,
        Some(CmpFunc::NotEqual) => gl::NOTEQUAL,
        Some(CmpFunc::GreaterEqual) => gl::GEQUAL,
        Some(CmpFunc::Always) => gl::ALWAYS,
        _ => return Err(CommandError::unknown("compare function", v)),
    })
}

fn stencil_op(v: u32) -> Result<GLenum, CommandError> {
    Ok(match StencilOp::from_u32(v) {
        Some(StencilOp::Keep) => gl::KEEP,
        Some(StencilOp::Zero) => gl::ZERO,
        Some(StencilOp::Replace) => gl::REPLACE,
        Some(StencilOp::IncrSat) => gl::INCR,
        Some(StencilOp::DecrSat) => gl::DECR,
        Some(StencilOp::Invert) => gl::INVERT,
        Some(StencilOp::Incr) => gl::INCR_WRAP,
        Some(StencilOp::Decr) => gl::DECR_WRAP,
        _ => return Err(CommandError::unknown("stencil op", v)),
    })
}

fn blend_factor(a: &Apply<'_>, v: u32) -> Result<GLenum, CommandError> {
    let op = BlendOp::from_u32(v).ok_or_else(|| CommandError::unknown("blend op", v))?;
    let dual = matches!(
        op,
        BlendOp::Src1Color | BlendOp::InvSrc1Color | BlendOp::Src1Alpha | BlendOp::InvSrc1Alpha
    );
    if dual && !a.supports(HostFeatures::DUAL_SOURCE_BLEND) {
        return Err(CommandError::Unsupported("dual-source blend factor"));
    }
    Ok(match op {
        BlendOp::Zero => gl::ZERO,
        BlendOp::One => gl::ONE,
        BlendOp::SrcColor => gl::SRC_COLOR,
        BlendOp::InvSrcColor => gl::ONE_MINUS_SRC_COLOR,
        BlendOp::SrcAlpha => gl::SRC_ALPHA,
        BlendOp::InvSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
        BlendOp::DestAlpha => gl::DST_ALPHA,
        BlendOp::InvDestAlpha => gl::ONE_MINUS_DST_ALPHA,
        BlendOp::DestColor => gl::DST_COLOR,
        BlendOp::InvDestColor => gl::ONE_MINUS_DST_COLOR,
        BlendOp::SrcAlphaSat => gl::SRC_ALPHA_SATURATE,
        BlendOp::BlendFactor => gl::CONSTANT_COLOR,
        BlendOp::InvBlendFactor => gl::ONE_MINUS_CONSTANT_COLOR,
        BlendOp::Src1Color => gl::SRC1_COLOR,
        BlendOp::InvSrc1Color => gl::ONE_MINUS_SRC1_COLOR,
        BlendOp::Src1Alpha => gl::SRC1_ALPHA,
        BlendOp::InvSrc1Alpha => gl::ONE_MINUS_SRC1_ALPHA,
        BlendOp::BlendFactorAlpha => gl::CONSTANT_ALPHA,
        BlendOp::InvBlendFactorAlpha => gl::ONE_MINUS_CONSTANT_ALPHA,
        BlendOp::Invalid => return Err(CommandError::unknown("blend op", v)),
    })
}

fn blend_equation(v: u32) -> Result<GLenum, CommandError> {
    Ok(match BlendEquation::from_u32(v) {
        Some(BlendEquation::Add) => gl::FUNC_ADD,
        Some(BlendEquation::Subtract) => gl::FUNC_SUBTRACT,
        Some(BlendEquation::RevSubtract) => gl::FUNC_REVERSE_SUBTRACT,
        Some(BlendEquation::Minimum) => gl::MIN,
        Some(BlendEquation::Maximum) => gl::MAX,
        _ => return Err(CommandError::unknown("blend equation", v)),
    })
}

/// Blend factors and equations, combined or separate-alpha.
fn blend(a: &mut Apply<'_>) -> Result<(), CommandError> {
    use RenderStateId as R;
    let src = blend_factor(a, a.rs_or(R::SrcBlend, BlendOp::One as u32))?;
    let dst = blend_factor(a, a.rs_or(R::DstBlend, BlendOp::Zero as u32))?;
    let eq = blend_equation(a.rs_or(R::BlendEquation, BlendEquation::Add as u32))?;
    let separate = a.rs_or(R::SeparateAlphaBlendEnable, 0) != 0;

    // Alpha values are validated even while separate blending is off.
    let src_a = a.rs(R::SrcBlendAlpha).map(|v| blend_factor(a, v)).transpose()?.unwrap_or(src);
    let dst_a = a.rs(R::DstBlendAlpha).map(|v| blend_factor(a, v)).transpose()?.unwrap_or(dst);
    let eq_a = a.rs(R::BlendEquationAlpha).map(blend_equation).transpose()?.unwrap_or(eq);

    if separate && a.supports(HostFeatures::BLEND_SEPARATE) {
        a.gl.blend_func_separate(src, dst, src_a, dst_a);
        a.gl.blend_equation_separate(eq, eq_a);
    } else {
        if separate {
            tracing::debug!("host lacks separate blending; using the colour factors for alpha");
        }
        a.gl.blend_func(src, dst);
        a.gl.blend_equation(eq);
    }
    Ok(())
}

struct StencilSide {
    func: GLenum,
    fail: GLenum,
    zfail: GLenum,
    pass: GLenum,
}

fn stencil_side(a: &Apply<'_>, ccw: bool) -> Result<StencilSide, CommandError> {
    use RenderStateId as R;
    let front = |id, default: u32| a.rs_or(id, default);
    let side = |ccw_id, front_id, default: u32| {
        if ccw {
            a.rs(ccw_id).unwrap_or_else(|| front(front_id, default))
        } else {
            front(front_id, default)
        }
    };
    Ok(StencilSide {
        func: compare_func(side(R::CcwStencilFunc, R::StencilFunc, CmpFunc::Always as u32))?,
        fail: stencil_op(side(R::CcwStencilFail, R::StencilFail, StencilOp::Keep as u32))?,
        zfail: stencil_op(side(R::CcwStencilZFail, R::StencilZFail, StencilOp::Keep as u32))?,
        pass: stencil_op(side(R::CcwStencilPass, R::StencilPass, StencilOp::Keep as u32))?,
    })
}

/// Stencil function and operations, one- or two-sided.
fn stencil(a: &mut Apply<'_>) -> Result<(), CommandError> {
    let front = stencil_side(a, false)?;
    let back = stencil_side(a, true)?;
    let reference = a.rs_or(RenderStateId::StencilRef, 0) as i32;
    let mask = a.rs_or(RenderStateId::StencilMask, u32::MAX);
    let two_sided = a.rs_or(RenderStateId::StencilEnable2Sided, 0) != 0;

    if two_sided && a.supports(HostFeatures::STENCIL_SEPARATE) {
        a.gl.stencil_func_separate(gl::FRONT, front.func, reference, mask);
        a.gl.stencil_op_separate(gl::FRONT, front.fail, front.zfail, front.pass);
        a.gl.stencil_func_separate(gl::BACK, back.func, reference, mask);
        a.gl.stencil_op_separate(gl::BACK, back.fail, back.zfail, back.pass);
    } else {
        if two_sided {
            tracing::debug!("host lacks separate stencil; back faces use the front state");
        }
        a.gl.stencil_func(front.func, reference, mask);
        a.gl.stencil_op(front.fail, front.zfail, front.pass);
    }
    Ok(())
}

fn fog_mode(a: &mut Apply<'_>) -> Result<(), CommandError> {
    let Some(raw) = a.rs(RenderStateId::FogMode) else {
        return Ok(());
    };
    let mode = PackedFogMode::from_raw(raw);
    let function = FogFunction::from_u32(mode.function)
        .ok_or_else(|| CommandError::unknown("fog function", mode.function))?;
    let (gl_mode, per_vertex) = match function {
        FogFunction::Exp => (gl::EXP, false),
        FogFunction::Exp2 => (gl::EXP2, false),
        FogFunction::Linear => (gl::LINEAR, false),
        FogFunction::PerVertex => (gl::LINEAR, true),
        FogFunction::Invalid => return Ok(()),
    };
    a.gl.fog_i(gl::FOG_MODE, gl_mode as i32);
    if a.supports(HostFeatures::FOG_COORD) {
        let src = if per_vertex { gl::FOG_COORD } else { gl::FRAGMENT_DEPTH };
        a.gl.fog_i(gl::FOG_COORD_SRC, src as i32);
    } else if per_vertex {
        tracing::debug!("host lacks fog coordinates; per-vertex fog uses depth");
    }
    if a.supports(HostFeatures::FOG_DISTANCE) {
        let range = mode.base == 1 || a.rs_or(RenderStateId::RangeFogEnable, 0) != 0;
        let distance = if range { gl::EYE_RADIAL_NV } else { gl::EYE_PLANE_ABSOLUTE_NV };
        a.gl.fog_i(gl::FOG_DISTANCE_MODE_NV, distance as i32);
    }
    Ok(())
}

fn point_sprite(a: &mut Apply<'_>, v: u32) -> Result<(), CommandError> {
    let on = v != 0;
    a.gl.set_enabled(gl::POINT_SPRITE, on);
    for unit in 0..fixed_units(a) {
        a.gl.active_texture(gl::TEXTURE0 + unit);
        a.gl.tex_env_i(gl::POINT_SPRITE, gl::COORD_REPLACE, i32::from(on));
    }
    a.gl.active_texture(gl::TEXTURE0);
    Ok(())
}

fn point_attenuation(a: &mut Apply<'_>) -> Result<(), CommandError> {
    use RenderStateId as R;
    if !a.supports(HostFeatures::POINT_PARAMETERS) {
        return Ok(());
    }
    let coefficients = if a.rs_or(R::PointScaleEnable, 0) != 0 {
        [
            a.rs_f32(R::PointScaleA, 1.0),
            a.rs_f32(R::PointScaleB, 0.0),
            a.rs_f32(R::PointScaleC, 0.0),
        ]
    } else {
        [1.0, 0.0, 0.0]
    };
    a.gl.point_parameter_fv(gl::POINT_DISTANCE_ATTENUATION, &coefficients);
    Ok(())
}

fn point_size_limit(a: &mut Apply<'_>, pname: GLenum, v: u32) -> Result<(), CommandError> {
    if a.supports(HostFeatures::POINT_PARAMETERS) {
        let size = clamp_to(f32::from_bits(v), a.caps.limits.point_size_range);
        a.gl.point_parameter_f(pname, size);
    }
    Ok(())
}

fn clip_plane_enable(a: &mut Apply<'_>, v: u32) -> Result<(), CommandError> {
    let planes = a
        .caps
        .limits
        .max_clip_planes
        .min(crate::config::MAX_CLIP_PLANES as u32);
    for i in 0..planes {
        a.gl.set_enabled(gl::CLIP_PLANE0 + i, v & (1 << i) != 0);
    }
    if v >> planes != 0 {
        tracing::debug!(mask = v, planes, "clip planes beyond the host limit stay disabled");
    }
    Ok(())
}

fn fill_mode(a: &mut Apply<'_>, v: u32) -> Result<(), CommandError> {
    let packed = PackedFillMode::from_raw(v);
    let mode = match FillMode::from_u32(packed.mode) {
        Some(FillMode::Point) => gl::POINT,
        Some(FillMode::Line) => gl::LINE,
        Some(FillMode::Fill) => gl::FILL,
        _ => return Err(CommandError::unknown("fill mode", packed.mode)),
    };
    let face = match Face::from_u32(packed.face) {
        Some(Face::Front) => gl::FRONT,
        Some(Face::Back) => gl::BACK,
        _ => gl::FRONT_AND_BACK,
    };
    a.gl.polygon_mode(face, mode);
    Ok(())
}

/// Combined depth bias. The guest's constant bias is a fraction of the depth range;
/// the host counts in units of the smallest resolvable depth difference.
fn depth_bias(a: &mut Apply<'_>) -> Result<(), CommandError> {
    use RenderStateId as R;
    const DEPTH_UNITS: f32 = 16_777_215.0;
    let slope = a.rs_f32(R::SlopeScaleDepthBias, 0.0);
    let units = a.rs_f32(R::DepthBias, 0.0) * DEPTH_UNITS + a.rs_or(R::ZBias, 0) as f32;
    if slope == 0.0 && units == 0.0 {
        a.gl.disable(gl::POLYGON_OFFSET_FILL);
    } else {
        a.gl.enable(gl::POLYGON_OFFSET_FILL);
        a.gl.polygon_offset(slope, units);
    }
    Ok(())
}

fn color_write(a: &mut Apply<'_>, index: u32, v: u32) -> Result<(), CommandError> {
    color_mask(a, index, v);
    Ok(())
}

fn color_mask(a: &mut Apply<'_>, index: u32, v: u32) {
    let mask = [v & 1 != 0, v & 2 != 0, v & 4 != 0, v & 8 != 0];
    if a.supports(HostFeatures::COLOR_MASK_INDEXED) {
        a.gl.color_mask_i(index, mask);
    } else if index == 0 {
        a.gl.color_mask(mask);
    } else {
        tracing::debug!(index, "host lacks per-target colour masks");
    }
}

/// Colour, depth and stencil write masks: all on with `force`, otherwise as the guest
/// last set them.
pub(crate) fn write_masks(a: &mut Apply<'_>, force: bool) {
    use RenderStateId as R;
    fn pick(a: &Apply<'_>, force: bool, id: RenderStateId, default: u32) -> u32 {
        if force {
            default
        } else {
            a.rs_or(id, default)
        }
    }
    let colour = [R::ColorWriteEnable, R::ColorWriteEnable1, R::ColorWriteEnable2, R::ColorWriteEnable3];
    for (index, id) in colour.into_iter().enumerate() {
        let v = pick(a, force, id, 0xf);
        color_mask(a, index as u32, v);
    }
    let depth = pick(a, force, R::ZWriteEnable, 1) != 0;
    a.gl.depth_mask(depth);
    let stencil = pick(a, force, R::StencilWriteMask, u32::MAX);
    a.gl.stencil_mask(stencil);
}

/// Scissor test and rectangle as the guest last set them.
pub(crate) fn restore_scissor(a: &mut Apply<'_>) {
    let on = a.rs_or(RenderStateId::ScissorTestEnable, 0) != 0;
    a.gl.set_enabled(gl::SCISSOR_TEST, on);
    if let Some(r) = a.shadow.scissor {
        a.gl.scissor(r.x as i32, r.y as i32, r.w, r.h);
    }
}

fn color_material(a: &mut Apply<'_>) -> Result<(), CommandError> {
    use RenderStateId as R;
    let source = |id, default: VertexMaterialSource| -> Result<VertexMaterialSource, CommandError> {
        let v = a.rs_or(id, default as u32);
        VertexMaterialSource::from_u32(v).ok_or_else(|| CommandError::unknown("material source", v))
    };
    let diffuse = source(R::DiffuseMaterialSource, VertexMaterialSource::Diffuse)?;
    let specular = source(R::SpecularMaterialSource, VertexMaterialSource::Specular)?;
    let ambient = source(R::AmbientMaterialSource, VertexMaterialSource::None)?;
    let emissive = source(R::EmissiveMaterialSource, VertexMaterialSource::None)?;

    if a.rs_or(R::VertexMaterialEnable, 0) == 0 {
        a.gl.disable(gl::COLOR_MATERIAL);
        return Ok(());
    }
    // The host tracks one material property from the primary vertex colour.
    let from_color = |s| s == VertexMaterialSource::Diffuse;
    let mode = if from_color(diffuse) && from_color(ambient) {
        Some(gl::AMBIENT_AND_DIFFUSE)
    } else if from_color(diffuse) {
        Some(gl::DIFFUSE)
    } else if from_color(ambient) {
        Some(gl::AMBIENT)
    } else if from_color(emissive) {
        Some(gl::EMISSION)
    } else if from_color(specular) {
        Some(gl::SPECULAR)
    } else {
        None
    };
    match mode {
        Some(mode) => {
            a.gl.color_material(gl::FRONT_AND_BACK, mode);
            a.gl.enable(gl::COLOR_MATERIAL);
        }
        None => a.gl.disable(gl::COLOR_MATERIAL),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_has_a_handler_and_invalid_is_rejected() {
        // Building the table for every ID must not panic.
        for id in RenderStateId::ALL {
            let _ = handler(*id);
        }
        assert!(compare_func(0).is_err());
        assert_eq!(compare_func(CmpFunc::LessEqual as u32).ok(), Some(gl::LEQUAL));
        assert_eq!(stencil_op(StencilOp::Incr as u32).ok(), Some(gl::INCR_WRAP));
        assert_eq!(stencil_op(StencilOp::IncrSat as u32).ok(), Some(gl::INCR));
        assert!(blend_equation(9).is_err());
    }
}
