//! Guest shaders and the seam to the external shader runtime.
//!
//! The backend never translates shader bytecode itself. It validates the token stream's
//! framing, keeps the bytes for the lifetime of the shader id, and hands everything else
//! to a [`ShaderBridge`].

use std::cell::RefCell;
use std::rc::Rc;

use svga3d_protocol::state::{ShaderConstType, ShaderType};
use svga3d_protocol::Rect;

use crate::config::{MAX_SHADER_CONSTANT_REGISTERS, MAX_SHADER_IDS};
use crate::error::CommandError;
use crate::gl::GlApi;
use crate::slots::SlotMap;

/// Upper bound on accepted bytecode; real SM1-3 shaders are a few KiB.
pub const MAX_SHADER_BYTECODE_BYTES: usize = 256 * 1024;

const VERTEX_VERSION_PREFIX: u32 = 0xFFFE_0000;
const PIXEL_VERSION_PREFIX: u32 = 0xFFFF_0000;
const END_TOKEN: u32 = 0x0000_FFFF;

/// Opaque program handle owned by the bridge.
pub type ShaderHandle = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderVersion {
    pub ty: ShaderType,
    pub major: u8,
    pub minor: u8,
}

/// Checks the framing of a token stream: whole DWORDs, a version token for `ty` with a
/// shader model between 1 and 3, and the end token last.
pub fn validate_bytecode(ty: ShaderType, bytes: &[u8]) -> Result<(ShaderVersion, Vec<u32>), CommandError> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(CommandError::Malformed("shader bytecode length"));
    }
    if bytes.len() > MAX_SHADER_BYTECODE_BYTES {
        return Err(CommandError::Malformed("oversized shader bytecode"));
    }
    let tokens: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let version = tokens[0];
    let expected = match ty {
        ShaderType::Vs => VERTEX_VERSION_PREFIX,
        ShaderType::Ps => PIXEL_VERSION_PREFIX,
        ShaderType::Invalid => return Err(CommandError::unknown("shader type", ty.as_u32())),
    };
    if version & 0xFFFF_0000 != expected {
        return Err(CommandError::Malformed("shader version token"));
    }
    let major = ((version >> 8) & 0xff) as u8;
    let minor = (version & 0xff) as u8;
    if !(1..=3).contains(&major) {
        return Err(CommandError::Malformed("shader model"));
    }
    if tokens.len() < 2 || tokens[tokens.len() - 1] != END_TOKEN {
        return Err(CommandError::Malformed("shader end token"));
    }
    Ok((ShaderVersion { ty, major, minor }, tokens))
}

/// What the bridge sees right before a draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawShaderState {
    pub vertex: Option<ShaderHandle>,
    pub pixel: Option<ShaderHandle>,
    pub viewport: Option<Rect>,
}

/// Adapter to the shader compiler/runtime. Every call runs with the guest context `cid`
/// current; errors are reported as text and surface as host errors.
pub trait ShaderBridge {
    fn create(
        &mut self,
        gl: &mut dyn GlApi,
        cid: u32,
        version: ShaderVersion,
        tokens: &[u32],
    ) -> Result<ShaderHandle, String>;

    fn destroy(&mut self, gl: &mut dyn GlApi, cid: u32, ty: ShaderType, handle: ShaderHandle);

    /// Makes `handle` the active program of its type, or unbinds with `None`.
    fn bind(
        &mut self,
        gl: &mut dyn GlApi,
        cid: u32,
        ty: ShaderType,
        handle: Option<ShaderHandle>,
    ) -> Result<(), String>;

    /// Stores `values.len()` consecutive four-component registers starting at `start`.
    fn set_constants(
        &mut self,
        gl: &mut dyn GlApi,
        cid: u32,
        ty: ShaderType,
        const_type: ShaderConstType,
        start: u32,
        values: &[[u32; 4]],
    ) -> Result<(), String>;

    fn update_state(&mut self, gl: &mut dyn GlApi, cid: u32, state: &DrawShaderState) -> Result<(), String>;

    /// The context is going away; drop anything kept for it.
    fn destroy_context(&mut self, _gl: &mut dyn GlApi, _cid: u32) {}
}

/// Accepts every shader and does nothing with it. Draws then run fixed-function.
#[derive(Debug, Default)]
pub struct NullShaderBridge {
    next: ShaderHandle,
}

impl ShaderBridge for NullShaderBridge {
    fn create(&mut self, _: &mut dyn GlApi, _: u32, _: ShaderVersion, _: &[u32]) -> Result<ShaderHandle, String> {
        self.next += 1;
        Ok(self.next)
    }

    fn destroy(&mut self, _: &mut dyn GlApi, _: u32, _: ShaderType, _: ShaderHandle) {}

    fn bind(&mut self, _: &mut dyn GlApi, _: u32, _: ShaderType, _: Option<ShaderHandle>) -> Result<(), String> {
        Ok(())
    }

    fn set_constants(
        &mut self,
        _: &mut dyn GlApi,
        _: u32,
        _: ShaderType,
        _: ShaderConstType,
        _: u32,
        _: &[[u32; 4]],
    ) -> Result<(), String> {
        Ok(())
    }

    fn update_state(&mut self, _: &mut dyn GlApi, _: u32, _: &DrawShaderState) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderCall {
    Create { cid: u32, version: ShaderVersion, tokens: usize, handle: ShaderHandle },
    Destroy { cid: u32, ty: ShaderType, handle: ShaderHandle },
    Bind { cid: u32, ty: ShaderType, handle: Option<ShaderHandle> },
    SetConstants { cid: u32, ty: ShaderType, const_type: ShaderConstType, start: u32, values: Vec<[u32; 4]> },
    UpdateState { cid: u32, state: DrawShaderState },
    DestroyContext { cid: u32 },
}

/// Records every call; the log is shared so a test can keep a handle after the bridge
/// moves into the device.
#[derive(Clone, Debug, Default)]
pub struct RecordingShaderBridge {
    calls: Rc<RefCell<Vec<ShaderCall>>>,
    next: ShaderHandle,
    /// Makes `create` fail, to exercise error paths.
    pub fail_create: bool,
}

impl RecordingShaderBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Rc<RefCell<Vec<ShaderCall>>> {
        Rc::clone(&self.calls)
    }

    fn push(&self, call: ShaderCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ShaderBridge for RecordingShaderBridge {
    fn create(
        &mut self,
        _: &mut dyn GlApi,
        cid: u32,
        version: ShaderVersion,
        tokens: &[u32],
    ) -> Result<ShaderHandle, String> {
        if self.fail_create {
            return Err("compilation refused".to_owned());
        }
        self.next += 1;
        self.push(ShaderCall::Create {
            cid,
            version,
            tokens: tokens.len(),
            handle: self.next,
        });
        Ok(self.next)
    }

    fn destroy(&mut self, _: &mut dyn GlApi, cid: u32, ty: ShaderType, handle: ShaderHandle) {
        self.push(ShaderCall::Destroy { cid, ty, handle });
    }

    fn bind(&mut self, _: &mut dyn GlApi, cid: u32, ty: ShaderType, handle: Option<ShaderHandle>) -> Result<(), String> {
        self.push(ShaderCall::Bind { cid, ty, handle });
        Ok(())
    }

    fn set_constants(
        &mut self,
        _: &mut dyn GlApi,
        cid: u32,
        ty: ShaderType,
        const_type: ShaderConstType,
        start: u32,
        values: &[[u32; 4]],
    ) -> Result<(), String> {
        self.push(ShaderCall::SetConstants {
            cid,
            ty,
            const_type,
            start,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn update_state(&mut self, _: &mut dyn GlApi, cid: u32, state: &DrawShaderState) -> Result<(), String> {
        self.push(ShaderCall::UpdateState { cid, state: *state });
        Ok(())
    }

    fn destroy_context(&mut self, _: &mut dyn GlApi, cid: u32) {
        self.push(ShaderCall::DestroyContext { cid });
    }
}

#[derive(Debug)]
pub struct Shader {
    pub version: ShaderVersion,
    pub bytecode: Vec<u8>,
    pub handle: ShaderHandle,
}

/// One context's shaders, per type, plus the active slot of each type.
#[derive(Debug)]
pub struct ContextShaders {
    vertex: SlotMap<Shader>,
    pixel: SlotMap<Shader>,
    active_vertex: Option<u32>,
    active_pixel: Option<u32>,
}

impl Default for ContextShaders {
    fn default() -> Self {
        Self {
            vertex: SlotMap::with_limit(MAX_SHADER_IDS),
            pixel: SlotMap::with_limit(MAX_SHADER_IDS),
            active_vertex: None,
            active_pixel: None,
        }
    }
}

fn shader_type(ty: u32) -> Result<ShaderType, CommandError> {
    ShaderType::from_u32(ty)
        .filter(|t| *t != ShaderType::Invalid)
        .ok_or_else(|| CommandError::unknown("shader type", ty))
}

impl ContextShaders {
    fn table(&self, ty: ShaderType) -> &SlotMap<Shader> {
        match ty {
            ShaderType::Ps => &self.pixel,
            _ => &self.vertex,
        }
    }

    fn table_mut(&mut self, ty: ShaderType) -> &mut SlotMap<Shader> {
        match ty {
            ShaderType::Ps => &mut self.pixel,
            _ => &mut self.vertex,
        }
    }

    fn active_mut(&mut self, ty: ShaderType) -> &mut Option<u32> {
        match ty {
            ShaderType::Ps => &mut self.active_pixel,
            _ => &mut self.active_vertex,
        }
    }

    pub fn get(&self, ty: ShaderType, shid: u32) -> Option<&Shader> {
        self.table(ty).get(shid)
    }

    pub fn active(&self, ty: ShaderType) -> Option<u32> {
        match ty {
            ShaderType::Ps => self.active_pixel,
            _ => self.active_vertex,
        }
    }

    pub fn active_handle(&self, ty: ShaderType) -> Option<ShaderHandle> {
        self.active(ty).and_then(|id| self.get(ty, id)).map(|s| s.handle)
    }

    /// Whether draws use generic attributes (a vertex shader is bound).
    pub fn vertex_shader_bound(&self) -> bool {
        self.active_handle(ShaderType::Vs).is_some()
    }

    pub fn len(&self) -> usize {
        self.vertex.len() + self.pixel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn define(
        &mut self,
        bridge: &mut dyn ShaderBridge,
        gl: &mut dyn GlApi,
        cid: u32,
        shid: u32,
        ty: u32,
        bytecode: &[u8],
    ) -> Result<(), CommandError> {
        let ty = shader_type(ty)?;
        let (version, tokens) = validate_bytecode(ty, bytecode)?;
        self.table_mut(ty)
            .reserve_for(shid)
            .map_err(|e| CommandError::slot("shader", shid, e))?;
        let mut stored = Vec::new();
        stored.try_reserve_exact(bytecode.len())?;
        stored.extend_from_slice(bytecode);

        if self.table(ty).contains(shid) {
            self.destroy(bridge, gl, cid, shid, ty.as_u32())?;
        }
        let handle = bridge
            .create(gl, cid, version, &tokens)
            .map_err(CommandError::ShaderBridge)?;
        tracing::debug!(cid, shid, ty = ty.name(), major = version.major, minor = version.minor, "define shader");
        self.table_mut(ty)
            .insert(
                shid,
                Shader {
                    version,
                    bytecode: stored,
                    handle,
                },
            )
            .map_err(|e| CommandError::slot("shader", shid, e))?;
        Ok(())
    }

    pub(crate) fn destroy(
        &mut self,
        bridge: &mut dyn ShaderBridge,
        gl: &mut dyn GlApi,
        cid: u32,
        shid: u32,
        ty: u32,
    ) -> Result<(), CommandError> {
        let ty = shader_type(ty)?;
        let shader = self
            .table_mut(ty)
            .remove(shid)
            .ok_or(CommandError::InvalidShader {
                cid,
                shid,
                ty: ty.as_u32(),
            })?;
        if *self.active_mut(ty) == Some(shid) {
            *self.active_mut(ty) = None;
            if let Err(err) = bridge.bind(gl, cid, ty, None) {
                tracing::warn!(cid, shid, %err, "unbinding destroyed shader failed");
            }
        }
        bridge.destroy(gl, cid, ty, shader.handle);
        tracing::debug!(cid, shid, ty = ty.name(), "destroy shader");
        Ok(())
    }

    /// `SVGA3D_INVALID_ID` unbinds the type's shader.
    pub(crate) fn set(
        &mut self,
        bridge: &mut dyn ShaderBridge,
        gl: &mut dyn GlApi,
        cid: u32,
        ty: u32,
        shid: u32,
    ) -> Result<(), CommandError> {
        let ty = shader_type(ty)?;
        let (slot, handle) = if shid == svga3d_protocol::SVGA3D_INVALID_ID {
            (None, None)
        } else {
            let shader = self.get(ty, shid).ok_or(CommandError::InvalidShader {
                cid,
                shid,
                ty: ty.as_u32(),
            })?;
            (Some(shid), Some(shader.handle))
        };
        bridge
            .bind(gl, cid, ty, handle)
            .map_err(CommandError::ShaderBridge)?;
        *self.active_mut(ty) = slot;
        Ok(())
    }

    pub(crate) fn destroy_all(&mut self, bridge: &mut dyn ShaderBridge, gl: &mut dyn GlApi, cid: u32) {
        for ty in [ShaderType::Vs, ShaderType::Ps] {
            if self.active_mut(ty).take().is_some() {
                if let Err(err) = bridge.bind(gl, cid, ty, None) {
                    tracing::warn!(cid, ?ty, %err, "unbinding shader failed");
                }
            }
            for (_, shader) in self.table_mut(ty).drain() {
                bridge.destroy(gl, cid, ty, shader.handle);
            }
        }
    }
}

/// Validates and forwards a constant upload. Constants are context state, not shader
/// state, so no shader needs to be bound.
pub(crate) fn set_constants(
    bridge: &mut dyn ShaderBridge,
    gl: &mut dyn GlApi,
    cid: u32,
    start: u32,
    ty: u32,
    const_type: u32,
    values: &[[u32; 4]],
) -> Result<(), CommandError> {
    let ty = shader_type(ty)?;
    let const_type =
        ShaderConstType::from_u32(const_type).ok_or_else(|| CommandError::unknown("shader constant type", const_type))?;
    let end = u64::from(start) + values.len() as u64;
    if values.is_empty() || end > u64::from(MAX_SHADER_CONSTANT_REGISTERS) {
        return Err(CommandError::IndexOutOfRange {
            what: "shader constant register",
            index: start.saturating_add(values.len() as u32),
            limit: MAX_SHADER_CONSTANT_REGISTERS,
        });
    }
    tracing::trace!(cid, start, count = values.len(), ty = ty.name(), "set shader constants");
    bridge
        .set_constants(gl, cid, ty, const_type, start, values)
        .map_err(CommandError::ShaderBridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[u32]) -> Vec<u8> {
        tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
    }

    #[test]
    fn accepts_a_minimal_vs_2_0() {
        let (v, tokens) = validate_bytecode(ShaderType::Vs, &words(&[0xFFFE_0200, END_TOKEN])).unwrap();
        assert_eq!((v.major, v.minor), (2, 0));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn rejects_bad_framing() {
        let ok = words(&[0xFFFF_0300, 0x0000_0001, END_TOKEN]);
        assert!(validate_bytecode(ShaderType::Ps, &ok).is_ok());
        // Vertex token handed in as a pixel shader.
        assert!(validate_bytecode(ShaderType::Ps, &words(&[0xFFFE_0300, END_TOKEN])).is_err());
        assert!(validate_bytecode(ShaderType::Vs, &words(&[0xFFFE_0400, END_TOKEN])).is_err());
        assert!(validate_bytecode(ShaderType::Vs, &words(&[0xFFFE_0200, 0])).is_err());
        assert!(validate_bytecode(ShaderType::Vs, &ok[..7]).is_err());
        assert!(validate_bytecode(ShaderType::Vs, &[]).is_err());
    }
}
