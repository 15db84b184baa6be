//! Render targets: attachments of the context's own framebuffer object.

use svga3d_protocol::state::RenderTargetType;
use svga3d_protocol::SurfaceImageId;

use super::Apply;
use crate::error::CommandError;
use crate::gl::{consts as gl, GLenum, GLuint};
use crate::surface::HostObject;

/// A render-target image resolved to its host object before the guest context is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TargetImage {
    pub image: SurfaceImageId,
    pub object: HostObject,
    /// Texture target of the attached face (cube faces are distinct targets).
    pub image_target: GLenum,
    pub has_stencil: bool,
}

pub(crate) fn target_type(ty: u32) -> Result<RenderTargetType, CommandError> {
    RenderTargetType::from_u32(ty).ok_or_else(|| CommandError::unknown("render target type", ty))
}

fn attachment(ty: RenderTargetType, has_stencil: bool) -> GLenum {
    match (ty, ty.color_index()) {
        (_, Some(i)) => gl::COLOR_ATTACHMENT0 + i as u32,
        (RenderTargetType::Depth, None) if has_stencil => gl::DEPTH_STENCIL_ATTACHMENT,
        (RenderTargetType::Depth, None) => gl::DEPTH_ATTACHMENT,
        (_, None) if has_stencil => gl::DEPTH_STENCIL_ATTACHMENT,
        _ => gl::STENCIL_ATTACHMENT,
    }
}

/// Binds (creating on first use) the context framebuffer for drawing and reading.
pub(crate) fn bind_framebuffer(a: &mut Apply<'_>, fbo: &mut GLuint) {
    if *fbo == 0 {
        *fbo = a.gl.gen_framebuffer();
        tracing::debug!(fbo = *fbo, "created context framebuffer");
    }
    a.gl.bind_framebuffer(gl::FRAMEBUFFER, *fbo);
}

/// Attaches `target` (or detaches, for `None`) and refreshes the draw buffer list.
pub(crate) fn set_render_target(
    a: &mut Apply<'_>,
    fbo: &mut GLuint,
    ty: RenderTargetType,
    target: Option<TargetImage>,
) -> Result<(), CommandError> {
    if let Some(i) = ty.color_index() {
        if i >= a.caps.limits.max_draw_buffers as usize {
            return Err(CommandError::Unsupported("colour target beyond the host's draw buffers"));
        }
    }
    tracing::debug!(target = ty.name(), image = ?target.map(|t| t.image), "set render target");
    bind_framebuffer(a, fbo);

    let slot = ty as usize;
    match target {
        None => {
            let point = attachment(ty, false);
            a.gl.framebuffer_renderbuffer(gl::FRAMEBUFFER, point, 0);
            a.shadow.render_targets[slot] = None;
        }
        Some(t) => {
            let point = attachment(ty, t.has_stencil);
            match t.object {
                HostObject::Texture { name, .. } => {
                    a.gl.framebuffer_texture(gl::FRAMEBUFFER, point, t.image_target, name, t.image.mipmap, 0);
                }
                HostObject::Renderbuffer { name } => a.gl.framebuffer_renderbuffer(gl::FRAMEBUFFER, point, name),
                HostObject::Buffer { .. } => {
                    return Err(CommandError::Unsupported("buffer surface as a render target"));
                }
            }
            a.shadow.render_targets[slot] = Some(t.image);
        }
    }

    let draw: Vec<GLenum> = (0..crate::config::MAX_RENDER_TARGETS)
        .filter(|i| a.shadow.render_targets[RenderTargetType::Color0 as usize + i].is_some())
        .map(|i| gl::COLOR_ATTACHMENT0 + i as u32)
        .collect();
    if draw.is_empty() {
        a.gl.draw_buffers(&[gl::NONE]);
        a.gl.read_buffer(gl::NONE);
    } else {
        a.gl.draw_buffers(&draw);
        a.gl.read_buffer(draw[0]);
    }

    let status = a.gl.check_framebuffer_status(gl::FRAMEBUFFER);
    if status != gl::FRAMEBUFFER_COMPLETE {
        // Targets are set one at a time, so intermediate states are often incomplete.
        tracing::debug!(status, "context framebuffer incomplete");
    }
    a.trace("set render target");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_follow_the_target_type() {
        assert_eq!(attachment(RenderTargetType::Color3, false), gl::COLOR_ATTACHMENT0 + 3);
        assert_eq!(attachment(RenderTargetType::Depth, false), gl::DEPTH_ATTACHMENT);
        assert_eq!(attachment(RenderTargetType::Depth, true), gl::DEPTH_STENCIL_ATTACHMENT);
        assert_eq!(attachment(RenderTargetType::Stencil, false), gl::STENCIL_ATTACHMENT);
        assert!(target_type(99).is_err());
    }
}
