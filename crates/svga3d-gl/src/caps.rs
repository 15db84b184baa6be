//! Host capability discovery.
//!
//! Probing runs once at power-on with a bootstrap context current. Extensions that a
//! host version promoted to core are added to the set, so feature checks can ask for the
//! extension name alone.

use bitflags::bitflags;
use svga3d_protocol::devcaps::shader_version;

use crate::config::MIN_GL_VERSION;
use crate::error::InitError;
use crate::gl::{consts as gl, drain_errors, GlApi, OptionalEntryPoint};
use crate::platform::Profile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses the leading `major.minor` of a version string. Vendor suffixes and an
    /// "OpenGL ES" prefix are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        Self::split(s).map(|(major, minor, _)| Self { major, minor })
    }

    /// Parses a shading-language version, whose minor always has two digits: a driver
    /// reporting "1.2" means 1.20.
    pub fn parse_glsl(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix("OpenGL ES GLSL ES ").unwrap_or(s);
        let (major, minor, digits) = Self::split(s)?;
        let minor = if digits == 1 { minor * 10 } else { minor };
        Some(Self { major, minor })
    }

    fn split(s: &str) -> Option<(u32, u32, usize)> {
        let s = s.trim();
        let s = s.strip_prefix("OpenGL ES ").unwrap_or(s);
        let s = s.strip_prefix("OpenGL ES-CM ").unwrap_or(s);
        let head = s.split_whitespace().next()?;
        let mut parts = head.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor_raw = parts.next()?;
        let digits: String = minor_raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        let minor = digits.parse().ok()?;
        Some((major, minor, digits.len()))
    }

    pub fn at_least(self, major: u32, minor: u32) -> bool {
        self >= Self::new(major, minor)
    }
}

impl core::fmt::Display for GlVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Extensions a core version implies.
const PROMOTED: &[((u32, u32), &[&str])] = &[
    (
        (1, 3),
        &[
            "GL_ARB_multitexture",
            "GL_ARB_texture_compression",
            "GL_ARB_texture_cube_map",
            "GL_ARB_texture_env_combine",
            "GL_ARB_texture_env_dot3",
            "GL_ARB_texture_border_clamp",
        ],
    ),
    (
        (1, 4),
        &[
            "GL_ARB_point_parameters",
            "GL_ARB_texture_mirrored_repeat",
            "GL_ARB_depth_texture",
            "GL_EXT_blend_color",
            "GL_EXT_blend_func_separate",
            "GL_EXT_fog_coord",
            "GL_EXT_secondary_color",
            "GL_EXT_stencil_wrap",
            "GL_EXT_texture_lod_bias",
        ],
    ),
    (
        (1, 5),
        &["GL_ARB_vertex_buffer_object", "GL_ARB_occlusion_query"],
    ),
    (
        (2, 0),
        &[
            "GL_ARB_shader_objects",
            "GL_ARB_vertex_shader",
            "GL_ARB_fragment_shader",
            "GL_ARB_draw_buffers",
            "GL_ARB_point_sprite",
            "GL_ARB_texture_non_power_of_two",
            "GL_EXT_blend_equation_separate",
            "GL_EXT_stencil_two_side",
        ],
    ),
    (
        (2, 1),
        &["GL_ARB_pixel_buffer_object", "GL_EXT_texture_sRGB"],
    ),
    (
        (3, 0),
        &[
            "GL_ARB_framebuffer_object",
            "GL_ARB_half_float_vertex",
            "GL_ARB_texture_float",
            "GL_ARB_texture_rg",
            "GL_ARB_vertex_array_object",
            "GL_ARB_map_buffer_range",
            "GL_EXT_draw_buffers2",
            "GL_EXT_gpu_shader4",
        ],
    ),
    (
        (3, 1),
        &[
            "GL_ARB_draw_instanced",
            "GL_ARB_texture_rectangle",
            "GL_ARB_uniform_buffer_object",
            "GL_ARB_copy_buffer",
        ],
    ),
    (
        (3, 2),
        &[
            "GL_ARB_draw_elements_base_vertex",
            "GL_ARB_depth_clamp",
            "GL_ARB_provoking_vertex",
            "GL_ARB_seamless_cube_map",
            "GL_ARB_sync",
            "GL_ARB_geometry_shader4",
        ],
    ),
    (
        (3, 3),
        &[
            "GL_ARB_instanced_arrays",
            "GL_ARB_blend_func_extended",
            "GL_ARB_occlusion_query2",
            "GL_ARB_texture_swizzle",
            "GL_ARB_sampler_objects",
        ],
    ),
    (
        (4, 0),
        &[
            "GL_ARB_draw_buffers_blend",
            "GL_ARB_gpu_shader5",
            "GL_ARB_texture_cube_map_array",
        ],
    ),
    (
        (4, 1),
        &[
            "GL_ARB_viewport_array",
            "GL_ARB_separate_shader_objects",
            "GL_ARB_get_program_binary",
        ],
    ),
];

/// Space-padded extension list; lookups match whole names only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    padded: String,
}

impl ExtensionSet {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut padded = String::from(" ");
        for n in names {
            let n = n.trim();
            if n.is_empty() {
                continue;
            }
            padded.push_str(n);
            padded.push(' ');
        }
        Self { padded }
    }

    pub fn contains(&self, name: &str) -> bool {
        !name.is_empty() && !name.contains(' ') && self.padded.contains(&format!(" {name} "))
    }

    pub fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.padded.push_str(name);
            self.padded.push(' ');
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.padded.split_whitespace()
    }

    pub fn len(&self) -> usize {
        self.names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_promoted(&mut self, version: GlVersion) {
        for ((major, minor), names) in PROMOTED {
            if version.at_least(*major, *minor) {
                for n in *names {
                    self.insert(n);
                }
            }
        }
    }
}

/// Shader model reachable with a profile's extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShaderTier {
    Sm11,
    Sm20,
    Sm30,
    Sm40,
}

impl ShaderTier {
    pub fn vertex_version(self) -> u32 {
        match self {
            Self::Sm11 => shader_version::VS_11,
            Self::Sm20 => shader_version::VS_20,
            Self::Sm30 => shader_version::VS_30,
            Self::Sm40 => shader_version::VS_40,
        }
    }

    pub fn fragment_version(self) -> u32 {
        match self {
            Self::Sm11 => shader_version::PS_11,
            Self::Sm20 => shader_version::PS_20,
            Self::Sm30 => shader_version::PS_30,
            Self::Sm40 => shader_version::PS_40,
        }
    }

    fn from_profile(extensions: &ExtensionSet, glsl: Option<GlVersion>) -> Self {
        let by_ext = if extensions.contains("GL_NV_gpu_program4") || extensions.contains("GL_EXT_gpu_shader4") {
            Self::Sm40
        } else if extensions.contains("GL_NV_vertex_program3") || extensions.contains("GL_ARB_shader_texture_lod") {
            Self::Sm30
        } else if extensions.contains("GL_ARB_fragment_program") {
            Self::Sm20
        } else {
            Self::Sm11
        };
        let by_glsl = match glsl {
            Some(v) if v.at_least(1, 50) => Self::Sm40,
            Some(v) if v.at_least(1, 20) => Self::Sm30,
            _ => Self::Sm11,
        };
        by_ext.max(by_glsl)
    }
}

/// What one profile reports.
#[derive(Clone, Debug)]
pub struct ProfileCaps {
    pub profile: Profile,
    pub version: GlVersion,
    pub glsl_version: Option<GlVersion>,
    pub extensions: ExtensionSet,
    pub tier: ShaderTier,
}

impl ProfileCaps {
    pub fn meets_minimum(&self) -> bool {
        self.version.at_least(MIN_GL_VERSION.0, MIN_GL_VERSION.1)
    }
}

/// Numeric host limits, queried on the rendering profile.
#[derive(Clone, Debug, PartialEq)]
pub struct Limits {
    pub max_lights: u32,
    pub max_clip_planes: u32,
    pub max_texture_size: u32,
    pub max_rectangle_texture_size: u32,
    pub max_3d_texture_size: u32,
    pub max_cube_map_size: u32,
    /// Fixed-function texture units.
    pub max_texture_units: u32,
    pub max_texture_image_units: u32,
    pub max_vertex_texture_image_units: u32,
    pub max_draw_buffers: u32,
    pub max_anisotropy: f32,
    pub max_lod_bias: f32,
    pub point_size_range: [f32; 2],
    pub line_width_range: [f32; 2],
    pub max_vertex_attribs: u32,
    pub max_vertex_uniform_components: u32,
    pub max_fragment_uniform_components: u32,
    pub max_elements_vertices: u32,
    pub max_elements_indices: u32,
    pub max_samples: u32,
}

impl Limits {
    fn query(gl: &mut dyn GlApi, extensions: &ExtensionSet) -> Self {
        let mut int = |pname| gl.get_integer(pname).max(0) as u32;
        let max_lights = int(gl::MAX_LIGHTS);
        let max_clip_planes = int(gl::MAX_CLIP_PLANES);
        let max_texture_size = int(gl::MAX_TEXTURE_SIZE);
        let max_rectangle_texture_size = int(gl::MAX_RECTANGLE_TEXTURE_SIZE);
        let max_3d_texture_size = int(gl::MAX_3D_TEXTURE_SIZE);
        let max_cube_map_size = int(gl::MAX_CUBE_MAP_TEXTURE_SIZE);
        let max_texture_units = int(gl::MAX_TEXTURE_UNITS);
        let max_texture_image_units = int(gl::MAX_TEXTURE_IMAGE_UNITS);
        let max_vertex_texture_image_units = int(gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS);
        let max_draw_buffers = int(gl::MAX_DRAW_BUFFERS);
        let max_vertex_attribs = int(gl::MAX_VERTEX_ATTRIBS);
        let max_vertex_uniform_components = int(gl::MAX_VERTEX_UNIFORM_COMPONENTS);
        let max_fragment_uniform_components = int(gl::MAX_FRAGMENT_UNIFORM_COMPONENTS);
        let max_elements_vertices = int(gl::MAX_ELEMENTS_VERTICES);
        let max_elements_indices = int(gl::MAX_ELEMENTS_INDICES);
        let max_samples = int(gl::MAX_SAMPLES);

        let max_anisotropy = if extensions.contains("GL_EXT_texture_filter_anisotropic") {
            gl.get_float(gl::MAX_TEXTURE_MAX_ANISOTROPY).max(1.0)
        } else {
            1.0
        };
        let max_lod_bias = gl.get_float(gl::MAX_TEXTURE_LOD_BIAS);
        let mut point_size_range = [1.0, 1.0];
        gl.get_float_v(gl::ALIASED_POINT_SIZE_RANGE, &mut point_size_range);
        let mut line_width_range = [1.0, 1.0];
        gl.get_float_v(gl::ALIASED_LINE_WIDTH_RANGE, &mut line_width_range);

        // Some limits are legacy-only or extension-gated; the errors are expected.
        drain_errors(gl, "limit queries");

        Self {
            max_lights,
            max_clip_planes,
            max_texture_size,
            max_rectangle_texture_size,
            max_3d_texture_size,
            max_cube_map_size,
            max_texture_units,
            max_texture_image_units,
            max_vertex_texture_image_units,
            max_draw_buffers,
            max_anisotropy,
            max_lod_bias,
            point_size_range,
            line_width_range,
            max_vertex_attribs,
            max_vertex_uniform_components,
            max_fragment_uniform_components,
            max_elements_vertices,
            max_elements_indices,
            max_samples,
        }
    }
}

bitflags! {
    /// Optional host features the translator picks paths by.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HostFeatures: u32 {
        const DRAW_INSTANCED = 1 << 0;
        const DRAW_BASE_VERTEX = 1 << 1;
        const INSTANCED_ARRAYS = 1 << 2;
        const STENCIL_SEPARATE = 1 << 3;
        const BLEND_SEPARATE = 1 << 4;
        const COLOR_MASK_INDEXED = 1 << 5;
        const POINT_PARAMETERS = 1 << 6;
        const FOG_COORD = 1 << 7;
        const SECONDARY_COLOR = 1 << 8;
        const ANISOTROPY = 1 << 9;
        const S3TC = 1 << 10;
        const FOG_DISTANCE = 1 << 11;
        const TEXTURE_ENV_COMBINE = 1 << 12;
        const DUAL_SOURCE_BLEND = 1 << 13;
    }
}

/// Everything power-on learned about the host.
#[derive(Clone, Debug)]
pub struct HostCaps {
    pub vendor: String,
    pub renderer: String,
    /// The profile rendering contexts use.
    pub primary: ProfileCaps,
    /// The other profile, when dual-profile probing ran.
    pub other: Option<ProfileCaps>,
    /// Highest tier either probed profile reaches.
    pub tier: ShaderTier,
    pub limits: Limits,
    pub features: HostFeatures,
}

impl HostCaps {
    pub fn has_extension(&self, name: &str) -> bool {
        self.primary.extensions.contains(name)
    }

    pub fn supports(&self, f: HostFeatures) -> bool {
        self.features.contains(f)
    }

    /// Combines the probed profiles. Fails when neither reaches [`MIN_GL_VERSION`] or
    /// the rendering profile lacks framebuffer objects.
    pub fn assemble(
        gl: &mut dyn GlApi,
        primary: ProfileCaps,
        other: Option<ProfileCaps>,
    ) -> Result<Self, InitError> {
        let best = other
            .iter()
            .map(|o| o.version)
            .chain(std::iter::once(primary.version))
            .max()
            .unwrap_or(primary.version);
        if !primary.meets_minimum() && !other.as_ref().is_some_and(ProfileCaps::meets_minimum) {
            return Err(InitError::VersionTooLow {
                found_major: best.major,
                found_minor: best.minor,
                required_major: MIN_GL_VERSION.0,
                required_minor: MIN_GL_VERSION.1,
            });
        }
        if !primary.extensions.contains("GL_ARB_framebuffer_object")
            && !primary.extensions.contains("GL_EXT_framebuffer_object")
        {
            return Err(InitError::MissingExtension("GL_ARB_framebuffer_object"));
        }

        let vendor = gl.get_string(gl::VENDOR).unwrap_or_default();
        let renderer = gl.get_string(gl::RENDERER).unwrap_or_default();
        let limits = Limits::query(gl, &primary.extensions);
        let features = features(gl, &primary.extensions);
        let tier = other.iter().map(|o| o.tier).fold(primary.tier, ShaderTier::max);

        Ok(Self {
            vendor,
            renderer,
            primary,
            other,
            tier,
            limits,
            features,
        })
    }
}

fn features(gl: &dyn GlApi, ext: &ExtensionSet) -> HostFeatures {
    let mut f = HostFeatures::empty();
    let mut set = |flag, on| f.set(flag, on);
    set(
        HostFeatures::DRAW_INSTANCED,
        gl.supports(OptionalEntryPoint::DrawInstanced) && ext.contains("GL_ARB_draw_instanced"),
    );
    set(
        HostFeatures::DRAW_BASE_VERTEX,
        gl.supports(OptionalEntryPoint::DrawBaseVertex)
            && ext.contains("GL_ARB_draw_elements_base_vertex"),
    );
    set(
        HostFeatures::INSTANCED_ARRAYS,
        gl.supports(OptionalEntryPoint::VertexAttribDivisor) && ext.contains("GL_ARB_instanced_arrays"),
    );
    set(
        HostFeatures::STENCIL_SEPARATE,
        gl.supports(OptionalEntryPoint::StencilSeparate),
    );
    set(
        HostFeatures::BLEND_SEPARATE,
        gl.supports(OptionalEntryPoint::BlendSeparate) && ext.contains("GL_EXT_blend_func_separate"),
    );
    set(
        HostFeatures::COLOR_MASK_INDEXED,
        gl.supports(OptionalEntryPoint::ColorMaskIndexed) && ext.contains("GL_EXT_draw_buffers2"),
    );
    set(
        HostFeatures::POINT_PARAMETERS,
        gl.supports(OptionalEntryPoint::PointParameters) && ext.contains("GL_ARB_point_parameters"),
    );
    set(
        HostFeatures::FOG_COORD,
        gl.supports(OptionalEntryPoint::FogCoord) && ext.contains("GL_EXT_fog_coord"),
    );
    set(
        HostFeatures::SECONDARY_COLOR,
        gl.supports(OptionalEntryPoint::SecondaryColor) && ext.contains("GL_EXT_secondary_color"),
    );
    set(
        HostFeatures::ANISOTROPY,
        ext.contains("GL_EXT_texture_filter_anisotropic") || ext.contains("GL_ARB_texture_filter_anisotropic"),
    );
    set(HostFeatures::S3TC, ext.contains("GL_EXT_texture_compression_s3tc"));
    set(HostFeatures::FOG_DISTANCE, ext.contains("GL_NV_fog_distance"));
    set(
        HostFeatures::TEXTURE_ENV_COMBINE,
        ext.contains("GL_ARB_texture_env_combine"),
    );
    set(
        HostFeatures::DUAL_SOURCE_BLEND,
        ext.contains("GL_ARB_blend_func_extended"),
    );
    f
}

fn gather_extensions(gl: &mut dyn GlApi, version: GlVersion) -> ExtensionSet {
    let mut set = ExtensionSet::default();
    if version.at_least(3, 0) {
        let count = gl.get_integer(gl::NUM_EXTENSIONS).max(0) as u32;
        for i in 0..count {
            if let Some(name) = gl.get_string_i(gl::EXTENSIONS, i) {
                set.insert(&name);
            }
        }
    }
    if set.is_empty() {
        if let Some(all) = gl.get_string(gl::EXTENSIONS) {
            set = ExtensionSet::from_names(all.split_whitespace());
        }
    }
    set
}

/// Probes the profile whose context is current.
pub fn probe_profile(gl: &mut dyn GlApi, profile: Profile) -> Result<ProfileCaps, InitError> {
    let raw = gl
        .get_string(gl::VERSION)
        .ok_or_else(|| InitError::UnparsableVersion(String::new()))?;
    let version = GlVersion::parse(&raw).ok_or(InitError::UnparsableVersion(raw))?;
    let glsl_version = gl
        .get_string(gl::SHADING_LANGUAGE_VERSION)
        .and_then(|s| GlVersion::parse_glsl(&s));

    let mut extensions = gather_extensions(gl, version);
    // Probing walks both query styles; whichever the profile rejects leaves an error behind.
    drain_errors(gl, "extension probe");
    extensions.add_promoted(version);

    let tier = ShaderTier::from_profile(&extensions, glsl_version);
    tracing::info!(
        ?profile,
        %version,
        glsl = ?glsl_version,
        extensions = extensions.len(),
        ?tier,
        "probed host profile"
    );
    Ok(ProfileCaps {
        profile,
        version,
        glsl_version,
        extensions,
        tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings_parse() {
        assert_eq!(GlVersion::parse("3.0 Mesa 23.1"), Some(GlVersion::new(3, 0)));
        assert_eq!(GlVersion::parse("4.6.0 NVIDIA 535.54"), Some(GlVersion::new(4, 6)));
        assert_eq!(GlVersion::parse("2.1 Metal - 76.3"), Some(GlVersion::new(2, 1)));
        assert_eq!(GlVersion::parse("1.30 NVIDIA via Cg"), Some(GlVersion::new(1, 30)));
        assert_eq!(GlVersion::parse("OpenGL ES 3.2"), Some(GlVersion::new(3, 2)));
        assert_eq!(GlVersion::parse("garbage"), None);
        assert_eq!(GlVersion::parse(""), None);
    }

    #[test]
    fn shading_language_minors_have_two_digits() {
        assert_eq!(GlVersion::parse_glsl("1.2"), Some(GlVersion::new(1, 20)));
        assert_eq!(GlVersion::parse_glsl("1.20 NVIDIA via Cg compiler"), Some(GlVersion::new(1, 20)));
        assert_eq!(GlVersion::parse_glsl("4.6"), Some(GlVersion::new(4, 60)));
        assert_eq!(GlVersion::parse_glsl("1.5"), Some(GlVersion::new(1, 50)));
        assert_eq!(GlVersion::parse_glsl("OpenGL ES GLSL ES 3.00"), Some(GlVersion::new(3, 0)));
        assert_eq!(GlVersion::parse_glsl("n/a"), None);
        let none = ExtensionSet::default();
        assert_eq!(
            ShaderTier::from_profile(&none, GlVersion::parse_glsl("1.2")),
            ShaderTier::Sm30
        );
    }

    #[test]
    fn extension_lookup_matches_whole_names() {
        let set = ExtensionSet::from_names(["GL_ARB_texture_float", "GL_EXT_fog_coord"]);
        assert!(set.contains("GL_EXT_fog_coord"));
        assert!(!set.contains("GL_ARB_texture"));
        assert!(!set.contains("GL_EXT_fog_coord GL_ARB_texture_float"));
        assert!(!set.contains(""));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn promoted_extensions_follow_version() {
        let mut set = ExtensionSet::default();
        set.add_promoted(GlVersion::new(3, 1));
        assert!(set.contains("GL_ARB_framebuffer_object"));
        assert!(set.contains("GL_ARB_draw_instanced"));
        assert!(!set.contains("GL_ARB_draw_elements_base_vertex"));
    }

    #[test]
    fn tier_takes_best_of_extensions_and_glsl() {
        let none = ExtensionSet::default();
        assert_eq!(ShaderTier::from_profile(&none, None), ShaderTier::Sm11);
        let arb = ExtensionSet::from_names(["GL_ARB_fragment_program"]);
        assert_eq!(ShaderTier::from_profile(&arb, None), ShaderTier::Sm20);
        assert_eq!(
            ShaderTier::from_profile(&arb, Some(GlVersion::new(1, 20))),
            ShaderTier::Sm30
        );
        assert_eq!(
            ShaderTier::from_profile(&none, Some(GlVersion::new(4, 10))),
            ShaderTier::Sm40
        );
        let nv = ExtensionSet::from_names(["GL_NV_gpu_program4"]);
        assert_eq!(ShaderTier::from_profile(&nv, None), ShaderTier::Sm40);
    }
}
