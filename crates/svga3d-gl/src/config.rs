//! Backend configuration and fixed device limits.

pub const MAX_CONTEXT_IDS: u32 = svga3d_protocol::SVGA3D_MAX_CONTEXT_IDS;
pub const MAX_SURFACE_IDS: u32 = svga3d_protocol::SVGA3D_MAX_SURFACE_IDS;
pub const MAX_SHADER_IDS: u32 = svga3d_protocol::SVGA3D_MAX_SHADERIDS;
pub const MAX_TEXTURE_STAGES: usize = svga3d_protocol::SVGA3D_MAX_TEXTURE_STAGES;
pub const MAX_FIXED_TEXTURE_STAGES: usize = svga3d_protocol::SVGA3D_MAX_FIXED_TEXTURE_STAGES;
pub const MAX_LIGHTS: usize = svga3d_protocol::SVGA3D_MAX_LIGHTS;
pub const MAX_CLIP_PLANES: usize = svga3d_protocol::SVGA3D_MAX_CLIP_PLANES;
pub const MAX_VERTEX_ARRAYS: usize = svga3d_protocol::SVGA3D_MAX_VERTEX_ARRAYS;
pub const MAX_PRIMITIVE_RANGES: usize = svga3d_protocol::SVGA3D_MAX_DRAW_PRIMITIVE_RANGES;
pub const MAX_RENDER_TARGETS: usize = svga3d_protocol::SVGA3D_MAX_RENDER_TARGETS;
pub const MAX_SHADER_CONSTANT_REGISTERS: u32 = svga3d_protocol::SVGA3D_MAX_SHADER_CONSTANT_REGISTERS;
pub const MAX_SCREENS: u32 = 64;
/// Mip levels per surface face; enough for a 16M-texel edge.
pub const MAX_MIP_LEVELS: u32 = 24;

/// Minimum host GL version for either probed profile.
pub const MIN_GL_VERSION: (u32, u32) = (3, 0);

/// Context id reserved for the Shared Context.
pub const SHARED_CONTEXT_ID: u32 = 0xffff_eeee;

pub const CHECK_ERRORS_ENV: &str = "SVGA3D_GL_CHECK_ERRORS";
pub const DUAL_PROFILE_ENV: &str = "SVGA3D_GL_DUAL_PROFILE";
pub const DISABLE_DUAL_PROFILE_ENV: &str = "SVGA3D_GL_DISABLE_DUAL_PROFILE";
pub const LIBRARY_ENV: &str = "SVGA3D_GL_LIBRARY";

pub(crate) fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Drain and log host errors after every state-translation call.
    pub check_host_errors: bool,
    /// Probe the legacy and core profiles separately and merge the shader tiers.
    pub dual_profile: bool,
    /// Overrides the platform's default GL library.
    pub gl_library: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            check_host_errors: false,
            dual_profile: cfg!(target_os = "macos"),
            gl_library: None,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if env_var_truthy(CHECK_ERRORS_ENV) {
            cfg.check_host_errors = true;
        }
        if env_var_truthy(DUAL_PROFILE_ENV) {
            cfg.dual_profile = true;
        }
        if env_var_truthy(DISABLE_DUAL_PROFILE_ENV) {
            cfg.dual_profile = false;
        }
        if let Ok(path) = std::env::var(LIBRARY_ENV) {
            let path = path.trim();
            if !path.is_empty() {
                cfg.gl_library = Some(path.to_owned());
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_common_spellings() {
        // Unique names keep parallel tests from racing on the same variable.
        for (i, v) in ["1", "true", "YES", " on "].iter().enumerate() {
            let name = format!("SVGA3D_GL_TEST_TRUTHY_{i}");
            std::env::set_var(&name, v);
            assert!(env_var_truthy(&name), "{v:?} should be truthy");
            std::env::remove_var(&name);
        }
        std::env::set_var("SVGA3D_GL_TEST_FALSY", "0");
        assert!(!env_var_truthy("SVGA3D_GL_TEST_FALSY"));
        std::env::remove_var("SVGA3D_GL_TEST_FALSY");
        assert!(!env_var_truthy("SVGA3D_GL_TEST_UNSET"));
    }

    #[test]
    fn shared_context_id_is_outside_guest_range() {
        assert!(SHARED_CONTEXT_ID >= MAX_CONTEXT_IDS);
    }
}
