//! Guest surfaces and the host objects behind them.
//!
//! A surface starts as CPU shadow data only. The host object (texture, buffer or
//! renderbuffer) is created the first time something needs it and every level is
//! allocated and uploaded at that point. After that, uncompressed textures and
//! renderbuffers are authoritative on the host (they can be rendered to), while buffers,
//! compressed and emulated textures stay authoritative in the shadow.

use svga3d_protocol::{Size3, SurfaceFlags, SurfaceFormat};

use crate::config::MAX_MIP_LEVELS;
use crate::context::{Binding, Host};
use crate::error::CommandError;
use crate::format::{host_format, FormatConverter, HostFormat, EMULATED_RAW};
use crate::gl::{consts as gl, Extent, GLenum, GLint, GLuint, GlApi, Offset3};

/// Parameters of `SURFACE_DEFINE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceDesc {
    /// Raw `SVGA3dSurfaceFlags`.
    pub flags: u32,
    /// Raw `SVGA3dSurfaceFormat`.
    pub format: u32,
    pub face_count: u32,
    pub mip_levels: u32,
    /// Face-major: all levels of face 0, then face 1, ...
    pub sizes: Vec<Size3>,
    pub multisample_count: u32,
    pub autogen_filter: u32,
}

impl SurfaceDesc {
    /// A single-level 2D surface with no usage hints.
    pub fn texture_2d(format: SurfaceFormat, width: u32, height: u32) -> Self {
        Self::with_mips(format, SurfaceFlags::empty(), 1, Size3::new(width, height, 1), 1)
    }

    /// A full halving chain of `levels` levels for each of `faces` faces.
    pub fn with_mips(format: SurfaceFormat, flags: SurfaceFlags, faces: u32, base: Size3, levels: u32) -> Self {
        let chain: Vec<Size3> = (0..levels)
            .map(|l| {
                Size3::new(
                    (base.width >> l).max(1),
                    (base.height >> l).max(1),
                    (base.depth >> l).max(1),
                )
            })
            .collect();
        let sizes = (0..faces).flat_map(|_| chain.iter().copied()).collect();
        Self {
            flags: flags.bits(),
            format: format.as_u32(),
            face_count: faces,
            mip_levels: levels,
            sizes,
            multisample_count: 0,
            autogen_filter: 0,
        }
    }

    /// A vertex or index buffer of `bytes` bytes.
    pub fn buffer(bytes: u32, flags: SurfaceFlags) -> Self {
        Self::with_mips(SurfaceFormat::Buffer, flags, 1, Size3::new(bytes, 1, 1), 1)
    }
}

/// One (face, level) image and its CPU shadow.
#[derive(Debug)]
pub struct MipLevel {
    pub size: Size3,
    /// Bytes per row of blocks.
    pub pitch: u32,
    /// Rows of blocks per slice.
    pub rows: u32,
    pub data: Vec<u8>,
    /// The shadow holds bytes the host object has not seen yet.
    pub dirty: bool,
}

impl MipLevel {
    fn alloc(hf: &HostFormat, size: Size3) -> Result<Self, CommandError> {
        let pitch = hf.block.pitch(size.width);
        let rows = hf.block.blocks_high(size.height);
        let bytes = (pitch as usize)
            .checked_mul(rows as usize)
            .and_then(|v| v.checked_mul(size.depth as usize))
            .ok_or(CommandError::NoMemory("surface shadow"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| CommandError::NoMemory("surface shadow"))?;
        data.resize(bytes, 0);
        Ok(Self {
            size,
            pitch,
            rows,
            data,
            dirty: false,
        })
    }

    pub fn slice_bytes(&self) -> usize {
        self.pitch as usize * self.rows as usize
    }
}

/// Host object shape chosen at define time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackingKind {
    Texture(GLenum),
    Buffer,
    Renderbuffer,
}

/// The host object of a backed surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostObject {
    Texture { name: GLuint, target: GLenum },
    Buffer { name: GLuint },
    Renderbuffer { name: GLuint },
}

/// Why a caller needs the host object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackingUsage {
    Texture,
    RenderTarget,
    VertexData,
    Transfer,
}

#[derive(Debug)]
pub struct Surface {
    pub sid: u32,
    pub format: SurfaceFormat,
    pub flags: SurfaceFlags,
    pub host_format: HostFormat,
    pub face_count: u32,
    pub level_count: u32,
    pub multisample_count: u32,
    pub autogen_filter: u32,
    levels: Vec<MipLevel>,
    kind: BackingKind,
    object: Option<HostObject>,
    /// Raw texture of an emulated format.
    raw_texture: Option<GLuint>,
}

fn backing_kind(format: SurfaceFormat, flags: SurfaceFlags, cube: bool, depth: u32) -> BackingKind {
    if format == SurfaceFormat::Buffer
        || flags.intersects(SurfaceFlags::HINT_INDEXBUFFER | SurfaceFlags::HINT_VERTEXBUFFER)
    {
        BackingKind::Buffer
    } else if flags.contains(SurfaceFlags::HINT_DEPTHSTENCIL) && !flags.contains(SurfaceFlags::HINT_TEXTURE) {
        BackingKind::Renderbuffer
    } else if cube {
        BackingKind::Texture(gl::TEXTURE_CUBE_MAP)
    } else if depth > 1 {
        BackingKind::Texture(gl::TEXTURE_3D)
    } else {
        BackingKind::Texture(gl::TEXTURE_2D)
    }
}

/// Runs `f` with tightly packed client pixel storage and puts the previous values back.
pub(crate) fn with_pixel_store<R>(gl: &mut dyn GlApi, pack: bool, f: impl FnOnce(&mut dyn GlApi) -> R) -> R {
    let pnames: [(GLenum, GLint); 3] = if pack {
        [(gl::PACK_ALIGNMENT, 1), (gl::PACK_ROW_LENGTH, 0), (gl::PACK_IMAGE_HEIGHT, 0)]
    } else {
        [(gl::UNPACK_ALIGNMENT, 1), (gl::UNPACK_ROW_LENGTH, 0), (gl::UNPACK_IMAGE_HEIGHT, 0)]
    };
    let saved = pnames.map(|(p, _)| (p, gl.get_integer(p)));
    for (p, v) in pnames {
        gl.pixel_store_i(p, v);
    }
    let r = f(&mut *gl);
    for (p, v) in saved {
        gl.pixel_store_i(p, v);
    }
    r
}

impl Surface {
    /// Validates `desc` and allocates zeroed shadows. Nothing is created on the host.
    pub fn define(sid: u32, desc: &SurfaceDesc) -> Result<Self, CommandError> {
        let format = SurfaceFormat::from_u32(desc.format).ok_or(CommandError::unknown("surface format", desc.format))?;
        let flags = SurfaceFlags::from_bits_truncate(desc.flags);
        let hf = host_format(format).ok_or(CommandError::Unsupported("surface format"))?;

        let cube = flags.contains(SurfaceFlags::CUBEMAP);
        match (desc.face_count, cube) {
            (1, false) | (6, true) => {}
            _ => return Err(CommandError::Malformed("surface face count")),
        }
        if desc.mip_levels == 0 || desc.mip_levels > MAX_MIP_LEVELS {
            return Err(CommandError::IndexOutOfRange {
                what: "mip level count",
                index: desc.mip_levels,
                limit: MAX_MIP_LEVELS,
            });
        }
        let count = desc.face_count as usize * desc.mip_levels as usize;
        if desc.sizes.len() != count {
            return Err(CommandError::Malformed("surface mip size list"));
        }
        if desc.sizes.iter().any(|s| s.width == 0 || s.height == 0 || s.depth == 0) {
            return Err(CommandError::Malformed("zero-sized mip level"));
        }
        let depth = desc.sizes[0].depth;
        if hf.emulated && (cube || depth > 1) {
            return Err(CommandError::Unsupported("emulated format outside a 2D surface"));
        }
        if hf.compressed && depth > 1 {
            return Err(CommandError::Unsupported("compressed volume surface"));
        }

        let mut levels = Vec::new();
        levels.try_reserve_exact(count)?;
        for size in &desc.sizes {
            levels.push(MipLevel::alloc(&hf, *size)?);
        }
        if desc.multisample_count > 1 {
            tracing::debug!(sid, samples = desc.multisample_count, "multisampling is not emulated");
        }

        Ok(Self {
            sid,
            format,
            flags,
            host_format: hf,
            face_count: desc.face_count,
            level_count: desc.mip_levels,
            multisample_count: desc.multisample_count,
            autogen_filter: desc.autogen_filter,
            levels,
            kind: backing_kind(format, flags, cube, depth),
            object: None,
            raw_texture: None,
        })
    }

    pub fn kind(&self) -> BackingKind {
        self.kind
    }

    pub fn object(&self) -> Option<HostObject> {
        self.object
    }

    pub fn is_backed(&self) -> bool {
        self.object.is_some()
    }

    pub fn raw_texture(&self) -> Option<GLuint> {
        self.raw_texture
    }

    pub fn is_depth(&self) -> bool {
        self.host_format.is_depth()
    }

    fn index(&self, face: u32, level: u32) -> Option<usize> {
        (face < self.face_count && level < self.level_count)
            .then(|| (face * self.level_count + level) as usize)
    }

    pub fn level(&self, face: u32, level: u32) -> Option<&MipLevel> {
        self.levels.get(self.index(face, level)?)
    }

    pub(crate) fn level_mut(&mut self, face: u32, level: u32) -> Option<&mut MipLevel> {
        let i = self.index(face, level)?;
        self.levels.get_mut(i)
    }

    pub(crate) fn check_image(&self, face: u32, level: u32) -> Result<(), CommandError> {
        self.index(face, level).map(|_| ()).ok_or(CommandError::InvalidImage {
            sid: self.sid,
            face,
            mipmap: level,
        })
    }

    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// GL target of one face's images.
    pub fn image_target(&self, face: u32) -> GLenum {
        match self.kind {
            BackingKind::Texture(gl::TEXTURE_CUBE_MAP) => gl::TEXTURE_CUBE_MAP_POSITIVE_X + face,
            BackingKind::Texture(t) => t,
            _ => 0,
        }
    }

    /// The shadow is the reference copy of the data (nothing on the host can change it).
    pub fn shadow_authoritative(&self) -> bool {
        match self.object {
            None => true,
            Some(HostObject::Buffer { .. }) => true,
            Some(HostObject::Texture { .. }) => self.host_format.compressed || self.host_format.emulated,
            Some(HostObject::Renderbuffer { .. }) => false,
        }
    }

    /// Discards pending shadow writes.
    pub fn invalidate(&mut self) {
        for l in &mut self.levels {
            l.dirty = false;
        }
    }

    /// Creates the host object on first use. Creation happens on the Shared Context and
    /// the caller's binding is restored afterwards.
    pub fn ensure_backing(
        &mut self,
        host: &mut Host,
        converter: &mut dyn FormatConverter,
        usage: BackingUsage,
    ) -> Result<(), CommandError> {
        if self.object.is_none() && usage == BackingUsage::VertexData {
            if let BackingKind::Texture(gl::TEXTURE_2D) = self.kind {
                tracing::debug!(sid = self.sid, "surface first used as vertex data; backing it with a buffer");
                self.kind = BackingKind::Buffer;
            }
        }
        match (self.kind, usage) {
            (BackingKind::Buffer, BackingUsage::Texture | BackingUsage::RenderTarget)
            | (BackingKind::Renderbuffer, BackingUsage::Texture | BackingUsage::VertexData)
            | (BackingKind::Texture(_), BackingUsage::VertexData) => {
                return Err(CommandError::Unsupported("surface used outside its backing kind"));
            }
            (BackingKind::Texture(_), BackingUsage::RenderTarget)
                if self.host_format.compressed || self.host_format.emulated =>
            {
                return Err(CommandError::Unsupported("render target in a compressed or emulated format"));
            }
            _ => {}
        }
        if self.object.is_some() {
            return Ok(());
        }

        let mut g = host.bind(Binding::Shared)?;
        let object = match self.kind {
            BackingKind::Texture(target) => self.create_texture(g.gl(), converter, target)?,
            BackingKind::Buffer => self.create_buffer(g.gl()),
            BackingKind::Renderbuffer => {
                let level = &self.levels[0];
                let gl = g.gl();
                let name = gl.gen_renderbuffer();
                gl.bind_renderbuffer(name);
                gl.renderbuffer_storage(self.host_format.internal, level.size.width, level.size.height);
                gl.bind_renderbuffer(0);
                HostObject::Renderbuffer { name }
            }
        };
        if let Some(err) = g.drain("create surface backing") {
            tracing::warn!(sid = self.sid, code = err, "surface backing may be incomplete");
        }
        tracing::debug!(sid = self.sid, ?object, "created surface backing");
        self.object = Some(object);
        for l in &mut self.levels {
            l.dirty = false;
        }
        Ok(())
    }

    fn create_texture(
        &mut self,
        gl: &mut dyn GlApi,
        converter: &mut dyn FormatConverter,
        target: GLenum,
    ) -> Result<HostObject, CommandError> {
        let name = gl.gen_texture();
        gl.bind_texture(target, name);
        gl.tex_parameter_i(target, gl::TEXTURE_BASE_LEVEL, 0);
        gl.tex_parameter_i(target, gl::TEXTURE_MAX_LEVEL, self.level_count as GLint - 1);
        if self.level_count == 1 {
            // A mipmapping min filter would leave a single-level texture incomplete.
            gl.tex_parameter_i(target, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
        }

        let hf = self.host_format;
        let result = with_pixel_store(gl, false, |gl| -> Result<(), CommandError> {
            for face in 0..self.face_count {
                let image_target = self.image_target(face);
                for level in 0..self.level_count {
                    let l = &self.levels[(face * self.level_count + level) as usize];
                    let extent = Extent::new(l.size.width, l.size.height, l.size.depth);
                    if hf.compressed {
                        gl.compressed_tex_image(image_target, level, hf.internal, extent, &l.data);
                    } else if hf.emulated {
                        let bgra = convert(converter, self.format, l)?;
                        gl.tex_image(image_target, level, hf.internal, extent, hf.format, hf.ty, Some(bgra.as_slice()));
                    } else {
                        let data = l.dirty.then_some(l.data.as_slice());
                        gl.tex_image(image_target, level, hf.internal, extent, hf.format, hf.ty, data);
                    }
                }
            }
            Ok(())
        });
        gl.bind_texture(target, 0);
        if let Err(err) = result {
            gl.delete_texture(name);
            return Err(err);
        }

        if hf.emulated {
            let raw = gl.gen_texture();
            gl.bind_texture(gl::TEXTURE_2D, raw);
            gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_BASE_LEVEL, 0);
            gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAX_LEVEL, self.level_count as GLint - 1);
            with_pixel_store(gl, false, |gl| {
                for (level, l) in self.levels.iter().enumerate() {
                    let extent = Extent::new(hf.raw_width(l.size.width), l.size.height, 1);
                    let (internal, format, ty) = EMULATED_RAW;
                    gl.tex_image(gl::TEXTURE_2D, level as u32, internal, extent, format, ty, Some(l.data.as_slice()));
                }
            });
            gl.bind_texture(gl::TEXTURE_2D, 0);
            self.raw_texture = Some(raw);
        }
        Ok(HostObject::Texture { name, target })
    }

    fn create_buffer(&self, gl: &mut dyn GlApi) -> HostObject {
        let usage = if self.flags.contains(SurfaceFlags::HINT_DYNAMIC) {
            gl::DYNAMIC_DRAW
        } else {
            gl::STATIC_DRAW
        };
        let data = &self.levels[0].data;
        let name = gl.gen_buffer();
        gl.bind_buffer(gl::ARRAY_BUFFER, name);
        gl.buffer_data(gl::ARRAY_BUFFER, data.len(), Some(data.as_slice()), usage);
        gl.bind_buffer(gl::ARRAY_BUFFER, 0);
        HostObject::Buffer { name }
    }

    /// Brings one level's shadow up to date with the host object.
    pub(crate) fn sync_level(&mut self, host: &mut Host, face: u32, level: u32) -> Result<(), CommandError> {
        self.check_image(face, level)?;
        if self.shadow_authoritative() {
            return Ok(());
        }
        let Some(HostObject::Texture { name, target }) = self.object else {
            return Err(CommandError::Unsupported("reading back a renderbuffer surface"));
        };
        if self.is_depth() {
            return Err(CommandError::Unsupported("reading back a depth/stencil surface"));
        }
        let image_target = self.image_target(face);
        let hf = self.host_format;
        let i = (face * self.level_count + level) as usize;
        let data = &mut self.levels[i].data;

        let mut g = host.bind(Binding::Shared)?;
        let gl = g.gl();
        gl.bind_texture(target, name);
        with_pixel_store(gl, true, |gl| gl.get_tex_image(image_target, level, hf.format, hf.ty, data));
        gl.bind_texture(target, 0);
        g.drain("surface readback");
        Ok(())
    }

    /// Pushes one level's shadow to the host object, or marks it dirty when there is
    /// none yet.
    pub(crate) fn flush_level(
        &mut self,
        host: &mut Host,
        converter: &mut dyn FormatConverter,
        face: u32,
        level: u32,
    ) -> Result<(), CommandError> {
        self.check_image(face, level)?;
        let i = (face * self.level_count + level) as usize;
        let Some(object) = self.object else {
            self.levels[i].dirty = true;
            return Ok(());
        };
        let image_target = self.image_target(face);
        let hf = self.host_format;
        let l = &self.levels[i];
        let extent = Extent::new(l.size.width, l.size.height, l.size.depth);

        // Conversion runs before the bind so a failure leaves no host state behind.
        let bgra = if hf.emulated {
            Some(convert(converter, self.format, l)?)
        } else {
            None
        };

        let mut g = host.bind(Binding::Shared)?;
        let gl = g.gl();
        match object {
            HostObject::Buffer { name } => {
                gl.bind_buffer(gl::ARRAY_BUFFER, name);
                gl.buffer_sub_data(gl::ARRAY_BUFFER, 0, &l.data);
                gl.bind_buffer(gl::ARRAY_BUFFER, 0);
            }
            HostObject::Renderbuffer { .. } => {
                return Err(CommandError::Unsupported("uploading to a renderbuffer surface"));
            }
            HostObject::Texture { name, target } => {
                gl.bind_texture(target, name);
                with_pixel_store(gl, false, |gl| {
                    if hf.compressed {
                        gl.compressed_tex_image(image_target, level, hf.internal, extent, &l.data);
                    } else if let Some(bgra) = &bgra {
                        gl.tex_sub_image(image_target, level, Offset3::default(), extent, hf.format, hf.ty, bgra);
                    } else {
                        gl.tex_sub_image(image_target, level, Offset3::default(), extent, hf.format, hf.ty, &l.data);
                    }
                });
                gl.bind_texture(target, 0);
                if let Some(raw) = self.raw_texture {
                    let (_, format, ty) = EMULATED_RAW;
                    let raw_extent = Extent::new(hf.raw_width(extent.width), extent.height, 1);
                    gl.bind_texture(gl::TEXTURE_2D, raw);
                    with_pixel_store(gl, false, |gl| {
                        gl.tex_sub_image(gl::TEXTURE_2D, level, Offset3::default(), raw_extent, format, ty, &l.data);
                    });
                    gl.bind_texture(gl::TEXTURE_2D, 0);
                }
            }
        }
        g.drain("surface upload");
        drop(g);
        self.levels[i].dirty = false;
        Ok(())
    }

    /// Copies every readable host image into the shadows.
    pub fn read_back(&mut self, host: &mut Host) -> Result<(), CommandError> {
        if self.is_depth() {
            return Err(CommandError::Unsupported("reading back a depth/stencil surface"));
        }
        for face in 0..self.face_count {
            for level in 0..self.level_count {
                self.sync_level(host, face, level)?;
            }
        }
        Ok(())
    }

    /// Deletes the host objects. The shadows are kept.
    pub(crate) fn destroy_host(&mut self, host: &mut Host) {
        let object = self.object.take();
        let raw = self.raw_texture.take();
        if object.is_none() && raw.is_none() {
            return;
        }
        let Ok(mut g) = host.bind(Binding::Shared) else {
            tracing::warn!(sid = self.sid, "no Shared Context to delete surface objects on");
            return;
        };
        let gl = g.gl();
        match object {
            Some(HostObject::Texture { name, .. }) => gl.delete_texture(name),
            Some(HostObject::Buffer { name }) => gl.delete_buffer(name),
            Some(HostObject::Renderbuffer { name }) => gl.delete_renderbuffer(name),
            None => {}
        }
        if let Some(raw) = raw {
            gl.delete_texture(raw);
        }
        g.trace("delete surface backing");
    }
}

fn convert(
    converter: &mut dyn FormatConverter,
    format: SurfaceFormat,
    level: &MipLevel,
) -> Result<Vec<u8>, CommandError> {
    let mut out = vec![0u8; level.size.width as usize * level.size.height as usize * 4];
    converter
        .to_bgra(format, level.size.width, level.size.height, &level.data, &mut out)
        .map_err(|err| CommandError::Conversion(err.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_kind_follows_flags() {
        let vb = Surface::define(1, &SurfaceDesc::buffer(64, SurfaceFlags::HINT_VERTEXBUFFER)).unwrap();
        assert_eq!(vb.kind(), BackingKind::Buffer);

        let mut d = SurfaceDesc::texture_2d(SurfaceFormat::ZD24S8, 8, 8);
        d.flags = SurfaceFlags::HINT_DEPTHSTENCIL.bits();
        assert_eq!(Surface::define(2, &d).unwrap().kind(), BackingKind::Renderbuffer);
        d.flags |= SurfaceFlags::HINT_TEXTURE.bits();
        assert_eq!(Surface::define(2, &d).unwrap().kind(), BackingKind::Texture(gl::TEXTURE_2D));

        let cube = SurfaceDesc::with_mips(
            SurfaceFormat::A8R8G8B8,
            SurfaceFlags::CUBEMAP,
            6,
            Size3::new(16, 16, 1),
            3,
        );
        let s = Surface::define(3, &cube).unwrap();
        assert_eq!(s.kind(), BackingKind::Texture(gl::TEXTURE_CUBE_MAP));
        assert_eq!(s.levels().len(), 18);
        assert_eq!(s.image_target(2), gl::TEXTURE_CUBE_MAP_POSITIVE_X + 2);

        let vol = SurfaceDesc::with_mips(SurfaceFormat::A8R8G8B8, SurfaceFlags::empty(), 1, Size3::new(4, 4, 4), 1);
        assert_eq!(Surface::define(4, &vol).unwrap().kind(), BackingKind::Texture(gl::TEXTURE_3D));
    }

    #[test]
    fn shadow_sizes_use_block_pitch() {
        let s = Surface::define(1, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 10, 6)).unwrap();
        let l = s.level(0, 0).unwrap();
        assert_eq!((l.pitch, l.rows), (24, 2));
        assert_eq!(l.data.len(), 48);
        assert!(s.level(0, 1).is_none());
        assert!(s.level(1, 0).is_none());
    }

    #[test]
    fn malformed_descriptions_are_rejected() {
        let mut d = SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4);
        d.face_count = 6;
        assert!(matches!(Surface::define(1, &d), Err(CommandError::Malformed(_))));

        let mut d = SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4);
        d.sizes[0].height = 0;
        assert!(matches!(Surface::define(1, &d), Err(CommandError::Malformed(_))));

        let mut d = SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4);
        d.format = 9999;
        assert!(matches!(Surface::define(1, &d), Err(CommandError::UnknownEnum { .. })));

        let d = SurfaceDesc::texture_2d(SurfaceFormat::Nv12, 4, 4);
        assert!(matches!(Surface::define(1, &d), Err(CommandError::Unsupported(_))));

        let mut d = SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4);
        d.mip_levels = 0;
        d.sizes.clear();
        assert!(matches!(Surface::define(1, &d), Err(CommandError::IndexOutOfRange { .. })));
    }

    #[test]
    fn mip_chain_halves_to_one() {
        let d = SurfaceDesc::with_mips(SurfaceFormat::A8R8G8B8, SurfaceFlags::empty(), 1, Size3::new(8, 2, 1), 4);
        let sizes: Vec<_> = d.sizes.iter().map(|s| (s.width, s.height)).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }
}
