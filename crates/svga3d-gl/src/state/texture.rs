//! Texture stage states.
//!
//! Sampler parameters live in the host texture object, so they can only be programmed
//! while a texture is bound to the stage and have to be replayed on every rebind.
//! Combiners and coordinate generation are per texture unit and only exist for the
//! fixed-function stages.

use svga3d_protocol::state::{
    TexCoordGen, TextureAddress, TextureArgSource, TextureCombiner, TextureFilter, TextureStateId,
    TEX_ARG_MODIFIER_ALPHAREPLICATE, TEX_ARG_MODIFIER_COMPLEMENT, TEX_ARG_SOURCE_MASK,
};
use svga3d_protocol::{TextureState, SVGA3D_INVALID_ID};

use super::{argb, transform, Apply, BoundTexture};
use crate::caps::HostFeatures;
use crate::config::{MAX_FIXED_TEXTURE_STAGES, MAX_TEXTURE_STAGES};
use crate::error::CommandError;
use crate::gl::{consts as gl, GLenum};

pub(crate) type Handler = fn(&mut Apply<'_>, usize, u32) -> Result<(), CommandError>;

/// Applies one texture state. On failure the shadow keeps its previous value.
pub(crate) fn set_texture_state(a: &mut Apply<'_>, ts: TextureState) -> Result<(), CommandError> {
    let name = TextureStateId::from_u32(ts.name)
        .filter(|n| *n != TextureStateId::Invalid)
        .ok_or_else(|| CommandError::unknown("texture state", ts.name))?;
    let stage = ts.stage as usize;
    if stage >= MAX_TEXTURE_STAGES {
        return Err(CommandError::IndexOutOfRange {
            what: "texture stage",
            index: ts.stage,
            limit: MAX_TEXTURE_STAGES as u32,
        });
    }
    tracing::debug!(stage, state = name.name(), value = ts.value, "set texture state");

    let previous = a.shadow.texture[stage][name as usize].replace(ts.value);
    let result = handler(name)(a, stage, ts.value);
    a.gl.active_texture(gl::TEXTURE0);
    if let Err(err) = result {
        a.shadow.texture[stage][name as usize] = previous;
        tracing::warn!(stage, state = name.name(), value = ts.value, %err, "texture state rejected");
        return Err(err);
    }
    a.trace(name.name());
    Ok(())
}

pub(crate) fn handler(name: TextureStateId) -> Handler {
    use TextureStateId as T;
    match name {
        T::BindTexture => bind_stage,
        T::ColorOp | T::ColorArg0 | T::ColorArg1 | T::ColorArg2 => |a, s, _| combiner(a, s, Channel::Color),
        T::AlphaOp | T::AlphaArg0 | T::AlphaArg1 | T::AlphaArg2 => |a, s, _| combiner(a, s, Channel::Alpha),
        T::AddressU => |a, s, v| address(a, s, gl::TEXTURE_WRAP_S, v),
        T::AddressV => |a, s, v| address(a, s, gl::TEXTURE_WRAP_T, v),
        T::AddressW => |a, s, v| address(a, s, gl::TEXTURE_WRAP_R, v),
        T::MipFilter | T::MinFilter | T::MagFilter | T::TextureAnisotropicLevel => |a, s, _| filters(a, s),
        T::BorderColor => |a, s, v| {
            if let Some(t) = bound(a, s) {
                a.gl.tex_parameter_fv(t.target, gl::TEXTURE_BORDER_COLOR, &argb(v));
            }
            Ok(())
        },
        T::TextureMipmapLevel => |a, s, v| {
            if let Some(t) = bound(a, s) {
                a.gl.tex_parameter_i(t.target, gl::TEXTURE_BASE_LEVEL, v as i32);
            }
            Ok(())
        },
        T::TextureLodBias => |a, s, v| {
            if let Some(t) = bound(a, s) {
                let max = a.caps.limits.max_lod_bias;
                let bias = f32::from_bits(v).max(-max).min(max);
                a.gl.tex_parameter_f(t.target, gl::TEXTURE_LOD_BIAS, bias);
            }
            Ok(())
        },
        T::TexCoordGen => tex_coord_gen,
        T::TextureTransformFlags => |a, s, _| {
            if s < fixed_units(a) {
                transform::load_texture_matrix(a, s);
            }
            Ok(())
        },
        // Consumed by the draw pipeline.
        T::TexCoordIndex => |_, _, _| Ok(()),
        T::BumpEnvMat00
        | T::BumpEnvMat01
        | T::BumpEnvMat10
        | T::BumpEnvMat11
        | T::BumpEnvLScale
        | T::BumpEnvLOffset
        | T::Gamma => |_, s, _| {
            tracing::trace!(stage = s, "texture state has no fixed-function equivalent");
            Ok(())
        },
        T::Invalid => |_, _, v| Err(CommandError::unknown("texture state", v)),
    }
}

fn fixed_units(a: &Apply<'_>) -> usize {
    (a.caps.limits.max_texture_units as usize).min(MAX_FIXED_TEXTURE_STAGES)
}

fn image_units(a: &Apply<'_>) -> usize {
    (a.caps.limits.max_texture_image_units as usize).min(MAX_TEXTURE_STAGES)
}

/// The stage's texture, with its unit made active.
fn bound(a: &mut Apply<'_>, stage: usize) -> Option<BoundTexture> {
    let t = a.shadow.textures[stage]?;
    a.gl.active_texture(gl::TEXTURE0 + stage as u32);
    Some(t)
}

/// Rebinds a stage. The previous texture is unbound (and disabled on fixed-function
/// units) first; after the new bind every state set on the stage is replayed.
fn bind_stage(a: &mut Apply<'_>, stage: usize, sid: u32) -> Result<(), CommandError> {
    let next = if sid == SVGA3D_INVALID_ID {
        None
    } else {
        Some(
            a.resolved
                .iter()
                .copied()
                .find(|t| t.sid == sid)
                .ok_or(CommandError::InvalidSurface(sid))?,
        )
    };
    if stage >= image_units(a) {
        tracing::debug!(stage, sid, "texture stage beyond the host's units; shadow only");
        a.shadow.textures[stage] = next;
        return Ok(());
    }
    let fixed = stage < fixed_units(a);
    a.gl.active_texture(gl::TEXTURE0 + stage as u32);
    let prev = a.shadow.textures[stage].take();
    if let Some(prev) = prev {
        detach(a, prev, fixed);
    }
    let Some(t) = next else {
        return Ok(());
    };
    attach(a, stage, t, fixed);
    a.shadow.textures[stage] = Some(t);

    if let Err(err) = replay_samplers(a, stage) {
        // The unit goes back to the texture it held before the command.
        a.gl.active_texture(gl::TEXTURE0 + stage as u32);
        detach(a, t, fixed);
        if let Some(prev) = prev {
            attach(a, stage, prev, fixed);
        }
        a.shadow.textures[stage] = prev;
        return Err(err);
    }
    Ok(())
}

fn attach(a: &mut Apply<'_>, stage: usize, t: BoundTexture, fixed: bool) {
    a.gl.bind_texture(t.target, t.name);
    let disabled = a.shadow.texture_state(stage, TextureStateId::ColorOp)
        == Some(TextureCombiner::Disable as u32);
    if fixed && !disabled {
        a.gl.enable(t.target);
    }
}

fn detach(a: &mut Apply<'_>, t: BoundTexture, fixed: bool) {
    a.gl.bind_texture(t.target, 0);
    if fixed {
        a.gl.disable(t.target);
    }
}

fn replay_samplers(a: &mut Apply<'_>, stage: usize) -> Result<(), CommandError> {
    for name in TextureStateId::ALL {
        if matches!(name, TextureStateId::Invalid | TextureStateId::BindTexture) {
            continue;
        }
        if let Some(v) = a.shadow.texture_state(stage, *name) {
            handler(*name)(a, stage, v)?;
        }
    }
    Ok(())
}

fn address(a: &mut Apply<'_>, stage: usize, pname: GLenum, v: u32) -> Result<(), CommandError> {
    let mode = match TextureAddress::from_u32(v) {
        Some(TextureAddress::Wrap) => gl::REPEAT,
        Some(TextureAddress::Mirror) => gl::MIRRORED_REPEAT,
        Some(TextureAddress::Clamp | TextureAddress::Edge) => gl::CLAMP_TO_EDGE,
        Some(TextureAddress::Border) => gl::CLAMP_TO_BORDER,
        Some(TextureAddress::MirrorOnce) => gl::MIRROR_CLAMP_TO_EDGE,
        _ => return Err(CommandError::unknown("texture address mode", v)),
    };
    if let Some(t) = bound(a, stage) {
        a.gl.tex_parameter_i(t.target, pname, mode as i32);
    }
    Ok(())
}

fn filter_state(a: &Apply<'_>, stage: usize, name: TextureStateId, default: TextureFilter) -> Result<TextureFilter, CommandError> {
    match a.shadow.texture_state(stage, name) {
        None => Ok(default),
        Some(v) => TextureFilter::from_u32(v).ok_or_else(|| CommandError::unknown("texture filter", v)),
    }
}

/// Min/mag/mip filters and anisotropy, derived together.
fn filters(a: &mut Apply<'_>, stage: usize) -> Result<(), CommandError> {
    let min = filter_state(a, stage, TextureStateId::MinFilter, TextureFilter::Nearest)?;
    let mag = filter_state(a, stage, TextureStateId::MagFilter, TextureFilter::Nearest)?;
    let mip = filter_state(a, stage, TextureStateId::MipFilter, TextureFilter::None)?;
    let Some(t) = bound(a, stage) else {
        return Ok(());
    };

    let smooth = |f: TextureFilter| !matches!(f, TextureFilter::None | TextureFilter::Nearest);
    let min_gl = match (smooth(min), mip) {
        (false, TextureFilter::None) => gl::NEAREST,
        (true, TextureFilter::None) => gl::LINEAR,
        (false, TextureFilter::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
        (true, TextureFilter::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
        (false, _) => gl::NEAREST_MIPMAP_LINEAR,
        (true, _) => gl::LINEAR_MIPMAP_LINEAR,
    };
    let mag_gl = if smooth(mag) { gl::LINEAR } else { gl::NEAREST };
    a.gl.tex_parameter_i(t.target, gl::TEXTURE_MIN_FILTER, min_gl as i32);
    a.gl.tex_parameter_i(t.target, gl::TEXTURE_MAG_FILTER, mag_gl as i32);

    if a.supports(HostFeatures::ANISOTROPY) {
        let level = if min == TextureFilter::Anisotropic || mag == TextureFilter::Anisotropic {
            a.shadow
                .texture_state(stage, TextureStateId::TextureAnisotropicLevel)
                .unwrap_or(1) as f32
        } else {
            1.0
        };
        let level = level.max(1.0).min(a.caps.limits.max_anisotropy);
        a.gl.tex_parameter_f(t.target, gl::TEXTURE_MAX_ANISOTROPY, level);
    }
    Ok(())
}

fn tex_coord_gen(a: &mut Apply<'_>, stage: usize, v: u32) -> Result<(), CommandError> {
    let gen = TexCoordGen::from_u32(v).ok_or_else(|| CommandError::unknown("texcoord generation", v))?;
    if stage >= fixed_units(a) {
        return Ok(());
    }
    let mode = match gen {
        TexCoordGen::Off => None,
        TexCoordGen::EyePosition => Some(gl::EYE_LINEAR),
        TexCoordGen::EyeNormal => Some(gl::NORMAL_MAP),
        TexCoordGen::ReflectionVector => Some(gl::REFLECTION_MAP),
        TexCoordGen::Sphere => Some(gl::SPHERE_MAP),
    };
    a.gl.active_texture(gl::TEXTURE0 + stage as u32);
    let coords = [
        (gl::S, gl::TEXTURE_GEN_S),
        (gl::T, gl::TEXTURE_GEN_T),
        (gl::R, gl::TEXTURE_GEN_R),
    ];
    for (coord, cap) in coords {
        match mode {
            // Sphere mapping only generates s and t.
            Some(gl::SPHERE_MAP) if coord == gl::R => a.gl.disable(cap),
            Some(mode) => {
                a.gl.tex_gen_i(coord, gl::TEXTURE_GEN_MODE, mode as i32);
                a.gl.enable(cap);
            }
            None => a.gl.disable(cap),
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Color,
    Alpha,
}

impl Channel {
    fn op(self) -> TextureStateId {
        match self {
            Self::Color => TextureStateId::ColorOp,
            Self::Alpha => TextureStateId::AlphaOp,
        }
    }

    fn args(self) -> [TextureStateId; 3] {
        match self {
            Self::Color => [TextureStateId::ColorArg0, TextureStateId::ColorArg1, TextureStateId::ColorArg2],
            Self::Alpha => [TextureStateId::AlphaArg0, TextureStateId::AlphaArg1, TextureStateId::AlphaArg2],
        }
    }

    fn combine(self) -> GLenum {
        match self {
            Self::Color => gl::COMBINE_RGB,
            Self::Alpha => gl::COMBINE_ALPHA,
        }
    }

    fn sources(self) -> [GLenum; 3] {
        match self {
            Self::Color => [gl::SRC0_RGB, gl::SRC1_RGB, gl::SRC2_RGB],
            Self::Alpha => [gl::SRC0_ALPHA, gl::SRC1_ALPHA_ENV, gl::SRC2_ALPHA],
        }
    }

    fn operands(self) -> [GLenum; 3] {
        match self {
            Self::Color => [gl::OPERAND0_RGB, gl::OPERAND1_RGB, gl::OPERAND2_RGB],
            Self::Alpha => [gl::OPERAND0_ALPHA, gl::OPERAND1_ALPHA, gl::OPERAND2_ALPHA],
        }
    }

    fn scale(self) -> GLenum {
        match self {
            Self::Color => gl::RGB_SCALE,
            Self::Alpha => gl::ALPHA_SCALE,
        }
    }
}

/// One host combiner input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Input {
    /// Guest argument 0, 1 or 2 of the stage.
    Arg(usize),
    /// Alpha of a fixed source, used by the blend-by-alpha combiners.
    AlphaOf(GLenum),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Combine {
    mode: GLenum,
    scale: i32,
    inputs: &'static [Input],
}

const ARG1: &[Input] = &[Input::Arg(1)];
const ARG2: &[Input] = &[Input::Arg(2)];
const ARG12: &[Input] = &[Input::Arg(1), Input::Arg(2)];
const PREVIOUS_ONLY: &[Input] = &[];

fn combine_for(op: TextureCombiner, channel: Channel) -> Combine {
    let c = |mode, scale, inputs| Combine { mode, scale, inputs };
    let blend_by = |src| -> &'static [Input] {
        match src {
            gl::TEXTURE => &[Input::Arg(1), Input::Arg(2), Input::AlphaOf(gl::TEXTURE)],
            gl::PRIMARY_COLOR => &[Input::Arg(1), Input::Arg(2), Input::AlphaOf(gl::PRIMARY_COLOR)],
            gl::CONSTANT => &[Input::Arg(1), Input::Arg(2), Input::AlphaOf(gl::CONSTANT)],
            _ => &[Input::Arg(1), Input::Arg(2), Input::AlphaOf(gl::PREVIOUS)],
        }
    };
    match op {
        TextureCombiner::Disable | TextureCombiner::Invalid => c(gl::REPLACE, 1, PREVIOUS_ONLY),
        TextureCombiner::SelectArg1 => c(gl::REPLACE, 1, ARG1),
        TextureCombiner::SelectArg2 => c(gl::REPLACE, 1, ARG2),
        TextureCombiner::Modulate => c(gl::MODULATE, 1, ARG12),
        TextureCombiner::Modulate2x => c(gl::MODULATE, 2, ARG12),
        TextureCombiner::Modulate4x => c(gl::MODULATE, 4, ARG12),
        TextureCombiner::Add => c(gl::ADD, 1, ARG12),
        TextureCombiner::AddSigned => c(gl::ADD_SIGNED, 1, ARG12),
        TextureCombiner::AddSigned2x => c(gl::ADD_SIGNED, 2, ARG12),
        TextureCombiner::Subtract => c(gl::SUBTRACT, 1, ARG12),
        TextureCombiner::BlendTextureAlpha => c(gl::INTERPOLATE, 1, blend_by(gl::TEXTURE)),
        TextureCombiner::BlendDiffuseAlpha => c(gl::INTERPOLATE, 1, blend_by(gl::PRIMARY_COLOR)),
        TextureCombiner::BlendCurrentAlpha => c(gl::INTERPOLATE, 1, blend_by(gl::PREVIOUS)),
        TextureCombiner::BlendFactorAlpha => c(gl::INTERPOLATE, 1, blend_by(gl::CONSTANT)),
        // The host's dot product writes all four channels from the colour combiner.
        TextureCombiner::DotProduct3 if channel == Channel::Color => c(gl::DOT3_RGBA, 1, ARG12),
        TextureCombiner::Lerp => c(gl::INTERPOLATE, 1, &[Input::Arg(1), Input::Arg(2), Input::Arg(0)]),
        _ => c(gl::MODULATE, 1, ARG12),
    }
}

fn default_op(stage: usize, channel: Channel) -> TextureCombiner {
    match (stage, channel) {
        (0, Channel::Color) => TextureCombiner::Modulate,
        (0, Channel::Alpha) => TextureCombiner::SelectArg1,
        _ => TextureCombiner::Disable,
    }
}

/// Host (source, operand) for one guest combiner argument.
fn argument(v: u32, channel: Channel) -> Result<(GLenum, GLenum), CommandError> {
    let source = match TextureArgSource::from_u32(v & TEX_ARG_SOURCE_MASK) {
        Some(TextureArgSource::Constant) => gl::CONSTANT,
        Some(TextureArgSource::Previous) => gl::PREVIOUS,
        Some(TextureArgSource::Diffuse) => gl::PRIMARY_COLOR,
        Some(TextureArgSource::Texture) => gl::TEXTURE,
        // No separate specular input exists on the host.
        Some(TextureArgSource::Specular) => gl::PRIMARY_COLOR,
        _ => return Err(CommandError::unknown("texture argument", v)),
    };
    let complement = v & TEX_ARG_MODIFIER_COMPLEMENT != 0;
    let alpha = channel == Channel::Alpha || v & TEX_ARG_MODIFIER_ALPHAREPLICATE != 0;
    let operand = match (alpha, complement) {
        (false, false) => gl::SRC_COLOR,
        (false, true) => gl::ONE_MINUS_SRC_COLOR,
        (true, false) => gl::SRC_ALPHA,
        (true, true) => gl::ONE_MINUS_SRC_ALPHA,
    };
    Ok((source, operand))
}

fn combiner(a: &mut Apply<'_>, stage: usize, channel: Channel) -> Result<(), CommandError> {
    let op = match a.shadow.texture_state(stage, channel.op()) {
        None => default_op(stage, channel),
        Some(v) => TextureCombiner::from_u32(v)
            .filter(|op| *op != TextureCombiner::Invalid)
            .ok_or_else(|| CommandError::unknown("texture combiner", v))?,
    };
    let [arg0, arg1, arg2] = channel.args();
    let defaults = [
        (arg0, TextureArgSource::Previous),
        (arg1, TextureArgSource::Texture),
        (arg2, TextureArgSource::Previous),
    ];
    let mut args = [(0, 0); 3];
    for (slot, (id, default)) in args.iter_mut().zip(defaults) {
        let v = a.shadow.texture_state(stage, id).unwrap_or(default as u32);
        *slot = argument(v, channel)?;
    }

    if stage >= fixed_units(a) || !a.supports(HostFeatures::TEXTURE_ENV_COMBINE) {
        return Ok(());
    }
    let combine = combine_for(op, channel);
    if !matches!(
        op,
        TextureCombiner::Disable
            | TextureCombiner::SelectArg1
            | TextureCombiner::SelectArg2
            | TextureCombiner::Modulate
            | TextureCombiner::Modulate2x
            | TextureCombiner::Modulate4x
            | TextureCombiner::Add
            | TextureCombiner::AddSigned
            | TextureCombiner::AddSigned2x
            | TextureCombiner::Subtract
            | TextureCombiner::BlendTextureAlpha
            | TextureCombiner::BlendDiffuseAlpha
            | TextureCombiner::BlendCurrentAlpha
            | TextureCombiner::BlendFactorAlpha
            | TextureCombiner::DotProduct3
            | TextureCombiner::Lerp
    ) {
        tracing::debug!(stage, op = op.name(), "combiner approximated by modulate");
    }

    a.gl.active_texture(gl::TEXTURE0 + stage as u32);
    if channel == Channel::Color {
        // A disabled colour stage passes the previous result through untouched.
        if let Some(t) = a.shadow.textures[stage] {
            a.gl.set_enabled(t.target, op != TextureCombiner::Disable);
        }
    }
    a.gl.tex_env_i(gl::TEXTURE_ENV, gl::TEXTURE_ENV_MODE, gl::COMBINE as i32);
    a.gl.tex_env_i(gl::TEXTURE_ENV, channel.combine(), combine.mode as i32);
    a.gl.tex_env_i(gl::TEXTURE_ENV, channel.scale(), combine.scale);

    let inputs: &[Input] = if combine.inputs.is_empty() {
        &[Input::AlphaOf(gl::PREVIOUS)]
    } else {
        combine.inputs
    };
    for (i, input) in inputs.iter().enumerate() {
        let (source, operand) = match *input {
            Input::Arg(n) => args[n],
            Input::AlphaOf(src) if channel == Channel::Alpha || combine.inputs.is_empty() => {
                let operand = if channel == Channel::Alpha { gl::SRC_ALPHA } else { gl::SRC_COLOR };
                (src, operand)
            }
            Input::AlphaOf(src) => (src, gl::SRC_ALPHA),
        };
        a.gl.tex_env_i(gl::TEXTURE_ENV, channel.sources()[i], source as i32);
        a.gl.tex_env_i(gl::TEXTURE_ENV, channel.operands()[i], operand as i32);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_carry_their_modifiers() {
        let tex = TextureArgSource::Texture as u32;
        assert_eq!(argument(tex, Channel::Color).ok(), Some((gl::TEXTURE, gl::SRC_COLOR)));
        assert_eq!(
            argument(tex | TEX_ARG_MODIFIER_COMPLEMENT, Channel::Color).ok(),
            Some((gl::TEXTURE, gl::ONE_MINUS_SRC_COLOR))
        );
        assert_eq!(
            argument(tex | TEX_ARG_MODIFIER_ALPHAREPLICATE, Channel::Color).ok(),
            Some((gl::TEXTURE, gl::SRC_ALPHA))
        );
        assert_eq!(argument(tex, Channel::Alpha).ok(), Some((gl::TEXTURE, gl::SRC_ALPHA)));
        assert!(argument(0, Channel::Color).is_err());
    }

    #[test]
    fn lerp_interpolates_by_argument_zero() {
        let c = combine_for(TextureCombiner::Lerp, Channel::Color);
        assert_eq!(c.mode, gl::INTERPOLATE);
        assert_eq!(c.inputs, &[Input::Arg(1), Input::Arg(2), Input::Arg(0)]);
        let m = combine_for(TextureCombiner::Modulate4x, Channel::Alpha);
        assert_eq!((m.mode, m.scale), (gl::MODULATE, 4));
    }

    #[test]
    fn failed_sampler_replay_restores_the_previous_binding() {
        use crate::caps::{probe_profile, HostCaps};
        use crate::platform::{ContextRequest, PlatformContext, Profile};
        use crate::soft::SoftPlatform;
        use crate::state::StateShadow;

        let (mut platform, host) = SoftPlatform::with_defaults();
        let ctx = platform.create_context(&ContextRequest::legacy(), None).unwrap();
        platform.make_current(Some(&ctx)).unwrap();
        let mut api = platform.load_gl().unwrap();
        let primary = probe_profile(&mut *api, Profile::Legacy).unwrap();
        let caps = HostCaps::assemble(&mut *api, primary, None).unwrap();
        let first = BoundTexture {
            sid: 1,
            target: gl::TEXTURE_2D,
            name: api.gen_texture(),
        };
        let second = BoundTexture {
            sid: 2,
            target: gl::TEXTURE_2D,
            name: api.gen_texture(),
        };
        let resolved = [first, second];
        let bind = |sid| TextureState {
            stage: 1,
            name: TextureStateId::BindTexture as u32,
            value: sid,
        };

        let mut shadow = StateShadow::default();
        let mut a = Apply::new(&mut *api, &caps, &mut shadow, false);
        a.resolved = &resolved;
        set_texture_state(&mut a, bind(1)).unwrap();
        // Stored sampler state the replay cannot translate.
        a.shadow.texture[1][TextureStateId::AddressU as usize] = Some(0xdead);
        let err = set_texture_state(&mut a, bind(2)).unwrap_err();
        assert!(matches!(err, CommandError::UnknownEnum { value: 0xdead, .. }));
        drop(a);

        assert_eq!(shadow.textures[1], Some(first));
        assert_eq!(shadow.texture_state(1, TextureStateId::BindTexture), Some(1));
        let state = host.context(ctx.handle()).unwrap();
        assert_eq!(state.texture_bindings.get(&(1, gl::TEXTURE_2D)), Some(&first.name));
        assert!(state.is_enabled_on_unit(gl::TEXTURE_2D, 1));
    }

    #[test]
    fn stage_zero_defaults_modulate() {
        assert_eq!(default_op(0, Channel::Color), TextureCombiner::Modulate);
        assert_eq!(default_op(3, Channel::Alpha), TextureCombiner::Disable);
    }
}
