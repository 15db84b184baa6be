//! Transforms, lights, clip planes and the material.
//!
//! The host evaluates lights and clip planes in eye space at the moment they are
//! specified, so both are programmed with only the VIEW matrix loaded and have to be
//! programmed again whenever WORLD or VIEW changes.

use svga3d_protocol::state::{LightType, TextureStateId, TransformType, TEX_TRANSFORM_OFF};
use svga3d_protocol::{LightData, Material};

use super::Apply;
use crate::config::{MAX_CLIP_PLANES, MAX_FIXED_TEXTURE_STAGES, MAX_LIGHTS};
use crate::error::CommandError;
use crate::gl::consts as gl;
use crate::math::{mul, Mat4, DEPTH_FIXUP, IDENTITY};

pub(crate) fn set_transform(a: &mut Apply<'_>, ty: u32, matrix: Mat4) -> Result<(), CommandError> {
    let ty = TransformType::from_u32(ty)
        .filter(|t| *t != TransformType::Invalid)
        .ok_or_else(|| CommandError::unknown("transform type", ty))?;
    tracing::debug!(transform = ty.name(), "set transform");
    a.shadow.transforms[ty as usize] = Some(matrix);

    match ty {
        TransformType::World | TransformType::View => {
            a.gl.matrix_mode(gl::MODELVIEW);
            reprogram_eye_space(a);
        }
        TransformType::Projection => {
            a.gl.matrix_mode(gl::PROJECTION);
            a.gl.load_matrix(&mul(&matrix, &DEPTH_FIXUP));
            a.gl.matrix_mode(gl::MODELVIEW);
        }
        _ => match ty.texture_stage() {
            Some(stage) => {
                load_texture_matrix(a, stage);
                a.gl.active_texture(gl::TEXTURE0);
            }
            // Vertex blending matrices have no fixed-function equivalent.
            None => tracing::trace!(transform = ty.name(), "transform kept in the shadow only"),
        },
    }
    a.trace("set transform");
    Ok(())
}

fn shadow_or_identity(a: &Apply<'_>, ty: TransformType) -> Mat4 {
    a.shadow.transform(ty).copied().unwrap_or(IDENTITY)
}

fn host_lights(a: &Apply<'_>) -> usize {
    (a.caps.limits.max_lights as usize).min(MAX_LIGHTS)
}

fn host_clip_planes(a: &Apply<'_>) -> usize {
    (a.caps.limits.max_clip_planes as usize).min(MAX_CLIP_PLANES)
}

/// Programs every valid light and clip plane against the current VIEW matrix, then
/// loads WORLD x VIEW. MODELVIEW must be the current matrix mode.
pub(crate) fn reprogram_eye_space(a: &mut Apply<'_>) {
    let view = shadow_or_identity(a, TransformType::View);
    let world = shadow_or_identity(a, TransformType::World);

    for i in 0..host_lights(a) {
        if let Some(data) = a.shadow.lights[i].data {
            program_light_with_view(a, i, &data, &view);
        }
    }
    let planes = host_clip_planes(a);
    if a.shadow.clip_planes[..planes].iter().any(Option::is_some) {
        a.gl.load_matrix(&view);
        for i in 0..planes {
            if let Some(plane) = a.shadow.clip_planes[i] {
                a.gl.clip_plane(gl::CLIP_PLANE0 + i as u32, &plane.map(f64::from));
            }
        }
    }
    a.gl.load_matrix(&mul(&world, &view));
}

/// Loads a stage's texture matrix, or identity while its transform flags are off.
/// Leaves the stage's unit active.
pub(crate) fn load_texture_matrix(a: &mut Apply<'_>, stage: usize) {
    if stage >= MAX_FIXED_TEXTURE_STAGES || stage >= a.caps.limits.max_texture_units as usize {
        return;
    }
    let flags = a
        .shadow
        .texture_state(stage, TextureStateId::TextureTransformFlags)
        .unwrap_or(TEX_TRANSFORM_OFF);
    let matrix = TransformType::from_u32(TransformType::Texture0 as u32 + stage as u32)
        .and_then(|ty| a.shadow.transform(ty).copied());

    a.gl.active_texture(gl::TEXTURE0 + stage as u32);
    a.gl.matrix_mode(gl::TEXTURE);
    match matrix {
        Some(m) if flags != TEX_TRANSFORM_OFF => a.gl.load_matrix(&m),
        _ => a.gl.load_identity(),
    }
    a.gl.matrix_mode(gl::MODELVIEW);
}

pub(crate) fn set_light_data(a: &mut Apply<'_>, index: u32, data: LightData) -> Result<(), CommandError> {
    let i = light_index(index)?;
    let ty = data
        .light_type()
        .filter(|t| *t != LightType::Invalid)
        .ok_or_else(|| CommandError::unknown("light type", data.ty))?;
    tracing::debug!(index, light = ty.name(), "set light data");
    a.shadow.lights[i].data = Some(data);
    if i >= host_lights(a) {
        tracing::debug!(index, "light beyond the host's lights; shadow only");
        return Ok(());
    }

    let view = shadow_or_identity(a, TransformType::View);
    let world = shadow_or_identity(a, TransformType::World);
    a.gl.matrix_mode(gl::MODELVIEW);
    program_light_with_view(a, i, &data, &view);
    a.gl.load_matrix(&mul(&world, &view));
    a.trace("set light data");
    Ok(())
}

pub(crate) fn set_light_enabled(a: &mut Apply<'_>, index: u32, enabled: bool) -> Result<(), CommandError> {
    let i = light_index(index)?;
    a.shadow.lights[i].enabled = enabled;
    if i < host_lights(a) {
        a.gl.set_enabled(gl::LIGHT0 + i as u32, enabled);
        a.trace("set light enabled");
    }
    Ok(())
}

pub(crate) fn set_clip_plane(a: &mut Apply<'_>, index: u32, plane: [f32; 4]) -> Result<(), CommandError> {
    let i = index as usize;
    if i >= MAX_CLIP_PLANES {
        return Err(CommandError::IndexOutOfRange {
            what: "clip plane",
            index,
            limit: MAX_CLIP_PLANES as u32,
        });
    }
    a.shadow.clip_planes[i] = Some(plane);
    if i >= host_clip_planes(a) {
        return Ok(());
    }
    let view = shadow_or_identity(a, TransformType::View);
    let world = shadow_or_identity(a, TransformType::World);
    a.gl.matrix_mode(gl::MODELVIEW);
    a.gl.load_matrix(&view);
    a.gl.clip_plane(gl::CLIP_PLANE0 + index, &plane.map(f64::from));
    a.gl.load_matrix(&mul(&world, &view));
    a.trace("set clip plane");
    Ok(())
}

pub(crate) fn set_material(a: &mut Apply<'_>, m: Material) {
    a.shadow.material = Some(m);
    a.gl.material_fv(gl::FRONT_AND_BACK, gl::DIFFUSE, &m.diffuse);
    a.gl.material_fv(gl::FRONT_AND_BACK, gl::AMBIENT, &m.ambient);
    a.gl.material_fv(gl::FRONT_AND_BACK, gl::SPECULAR, &m.specular);
    a.gl.material_fv(gl::FRONT_AND_BACK, gl::EMISSION, &m.emissive);
    a.gl.material_f(gl::FRONT_AND_BACK, gl::SHININESS, m.shininess.clamp(0.0, 128.0));
    a.trace("set material");
}

fn light_index(index: u32) -> Result<usize, CommandError> {
    if index as usize >= MAX_LIGHTS {
        return Err(CommandError::IndexOutOfRange {
            what: "light",
            index,
            limit: MAX_LIGHTS as u32,
        });
    }
    Ok(index as usize)
}

/// Spot cone half-angle in degrees; the guest gives the full outer cone in radians.
fn spot_cutoff(phi: f32) -> f32 {
    (phi.to_degrees() / 2.0).clamp(0.0, 90.0)
}

/// Loads VIEW (or identity for view-space lights) and specifies one light. Leaves that
/// matrix loaded.
fn program_light_with_view(a: &mut Apply<'_>, i: usize, d: &LightData, view: &Mat4) {
    let light = gl::LIGHT0 + i as u32;
    a.gl.load_matrix(if d.in_world_space != 0 { view } else { &IDENTITY });

    a.gl.light_fv(light, gl::DIFFUSE, &d.diffuse);
    a.gl.light_fv(light, gl::SPECULAR, &d.specular);
    a.gl.light_fv(light, gl::AMBIENT, &d.ambient);

    match d.light_type() {
        Some(LightType::Directional) => {
            let dir = [-d.direction[0], -d.direction[1], -d.direction[2], 0.0];
            a.gl.light_fv(light, gl::POSITION, &dir);
            a.gl.light_f(light, gl::SPOT_CUTOFF, 180.0);
        }
        Some(LightType::Spot1 | LightType::Spot2) => {
            let pos = [d.position[0], d.position[1], d.position[2], 1.0];
            a.gl.light_fv(light, gl::POSITION, &pos);
            a.gl.light_fv(light, gl::SPOT_DIRECTION, &d.direction[..3]);
            a.gl.light_f(light, gl::SPOT_EXPONENT, d.falloff.clamp(0.0, 128.0));
            a.gl.light_f(light, gl::SPOT_CUTOFF, spot_cutoff(d.phi));
        }
        _ => {
            let pos = [d.position[0], d.position[1], d.position[2], 1.0];
            a.gl.light_fv(light, gl::POSITION, &pos);
            a.gl.light_f(light, gl::SPOT_CUTOFF, 180.0);
        }
    }
    a.gl.light_f(light, gl::CONSTANT_ATTENUATION, d.attenuation0);
    a.gl.light_f(light, gl::LINEAR_ATTENUATION, d.attenuation1);
    a.gl.light_f(light, gl::QUADRATIC_ATTENUATION, d.attenuation2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_cutoff_is_half_the_cone_in_degrees() {
        assert!((spot_cutoff(std::f32::consts::FRAC_PI_2) - 45.0).abs() < 1e-4);
        assert_eq!(spot_cutoff(4.0 * std::f32::consts::PI), 90.0);
        assert_eq!(spot_cutoff(-1.0), 0.0);
    }

    #[test]
    fn light_indices_are_bounded() {
        assert_eq!(light_index(31).ok(), Some(31));
        assert!(matches!(
            light_index(32),
            Err(CommandError::IndexOutOfRange { what: "light", .. })
        ));
    }
}
