//! OpenGL enumerant values used by the backend.
//!
//! Only the subset the translator touches; values are from the Khronos registry.

#![allow(dead_code)]

use super::{GLbitfield, GLenum};

pub const NO_ERROR: GLenum = 0;
pub const INVALID_ENUM: GLenum = 0x0500;
pub const INVALID_VALUE: GLenum = 0x0501;
pub const INVALID_OPERATION: GLenum = 0x0502;
pub const STACK_OVERFLOW: GLenum = 0x0503;
pub const STACK_UNDERFLOW: GLenum = 0x0504;
pub const OUT_OF_MEMORY: GLenum = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: GLenum = 0x0506;

pub const NONE: GLenum = 0;
pub const ZERO: GLenum = 0;
pub const ONE: GLenum = 1;

// Strings and queries.
pub const VENDOR: GLenum = 0x1F00;
pub const RENDERER: GLenum = 0x1F01;
pub const VERSION: GLenum = 0x1F02;
pub const EXTENSIONS: GLenum = 0x1F03;
pub const SHADING_LANGUAGE_VERSION: GLenum = 0x8B8C;
pub const NUM_EXTENSIONS: GLenum = 0x821D;
pub const CONTEXT_PROFILE_MASK: GLenum = 0x9126;
pub const CONTEXT_CORE_PROFILE_BIT: i32 = 0x1;
pub const CONTEXT_COMPATIBILITY_PROFILE_BIT: i32 = 0x2;

// Limits.
pub const MAX_LIGHTS: GLenum = 0x0D31;
pub const MAX_CLIP_PLANES: GLenum = 0x0D32;
pub const MAX_TEXTURE_SIZE: GLenum = 0x0D33;
pub const MAX_VIEWPORT_DIMS: GLenum = 0x0D3A;
pub const MAX_TEXTURE_UNITS: GLenum = 0x84E2;
pub const MAX_TEXTURE_COORDS: GLenum = 0x8871;
pub const MAX_TEXTURE_IMAGE_UNITS: GLenum = 0x8872;
pub const MAX_VERTEX_TEXTURE_IMAGE_UNITS: GLenum = 0x8B4C;
pub const MAX_RECTANGLE_TEXTURE_SIZE: GLenum = 0x84F8;
pub const MAX_3D_TEXTURE_SIZE: GLenum = 0x8073;
pub const MAX_CUBE_MAP_TEXTURE_SIZE: GLenum = 0x851C;
pub const MAX_DRAW_BUFFERS: GLenum = 0x8824;
pub const MAX_COLOR_ATTACHMENTS: GLenum = 0x8CDF;
pub const MAX_TEXTURE_MAX_ANISOTROPY: GLenum = 0x84FF;
pub const TEXTURE_MAX_ANISOTROPY: GLenum = 0x84FE;
pub const MAX_TEXTURE_LOD_BIAS: GLenum = 0x84FD;
pub const ALIASED_POINT_SIZE_RANGE: GLenum = 0x846D;
pub const SMOOTH_POINT_SIZE_RANGE: GLenum = 0x0B12;
pub const ALIASED_LINE_WIDTH_RANGE: GLenum = 0x846E;
pub const MAX_VERTEX_ATTRIBS: GLenum = 0x8869;
pub const MAX_VERTEX_UNIFORM_COMPONENTS: GLenum = 0x8B4A;
pub const MAX_FRAGMENT_UNIFORM_COMPONENTS: GLenum = 0x8B49;
pub const MAX_ELEMENTS_VERTICES: GLenum = 0x80E8;
pub const MAX_ELEMENTS_INDICES: GLenum = 0x80E9;
pub const MAX_SAMPLES: GLenum = 0x8D57;

// Capabilities.
pub const DEPTH_TEST: GLenum = 0x0B71;
pub const ALPHA_TEST: GLenum = 0x0BC0;
pub const DITHER: GLenum = 0x0BD0;
pub const BLEND: GLenum = 0x0BE2;
pub const FOG: GLenum = 0x0B60;
pub const STENCIL_TEST: GLenum = 0x0B90;
pub const LIGHTING: GLenum = 0x0B50;
pub const NORMALIZE: GLenum = 0x0BA1;
pub const POINT_SPRITE: GLenum = 0x8861;
pub const CULL_FACE: GLenum = 0x0B44;
pub const SCISSOR_TEST: GLenum = 0x0C11;
pub const POLYGON_OFFSET_FILL: GLenum = 0x8037;
pub const LINE_STIPPLE: GLenum = 0x0B24;
pub const LINE_SMOOTH: GLenum = 0x0B20;
pub const MULTISAMPLE: GLenum = 0x809D;
pub const COLOR_MATERIAL: GLenum = 0x0B57;
pub const CLIP_PLANE0: GLenum = 0x3000;
pub const LIGHT0: GLenum = 0x4000;
pub const TEXTURE_GEN_S: GLenum = 0x0C60;
pub const TEXTURE_GEN_T: GLenum = 0x0C61;
pub const TEXTURE_GEN_R: GLenum = 0x0C62;
pub const TEXTURE_GEN_Q: GLenum = 0x0C63;

// Texture targets.
pub const TEXTURE_2D: GLenum = 0x0DE1;
pub const TEXTURE_3D: GLenum = 0x806F;
pub const TEXTURE_CUBE_MAP: GLenum = 0x8513;
pub const TEXTURE_CUBE_MAP_POSITIVE_X: GLenum = 0x8515;
pub const TEXTURE_BINDING_2D: GLenum = 0x8069;
pub const TEXTURE_BINDING_3D: GLenum = 0x806A;
pub const TEXTURE_BINDING_CUBE_MAP: GLenum = 0x8514;
pub const TEXTURE0: GLenum = 0x84C0;
pub const ACTIVE_TEXTURE: GLenum = 0x84E0;
pub const CLIENT_ACTIVE_TEXTURE: GLenum = 0x84E1;

// Blending.
pub const SRC_COLOR: GLenum = 0x0300;
pub const ONE_MINUS_SRC_COLOR: GLenum = 0x0301;
pub const SRC_ALPHA: GLenum = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: GLenum = 0x0303;
pub const DST_ALPHA: GLenum = 0x0304;
pub const ONE_MINUS_DST_ALPHA: GLenum = 0x0305;
pub const DST_COLOR: GLenum = 0x0306;
pub const ONE_MINUS_DST_COLOR: GLenum = 0x0307;
pub const SRC_ALPHA_SATURATE: GLenum = 0x0308;
pub const CONSTANT_COLOR: GLenum = 0x8001;
pub const ONE_MINUS_CONSTANT_COLOR: GLenum = 0x8002;
pub const CONSTANT_ALPHA: GLenum = 0x8003;
pub const ONE_MINUS_CONSTANT_ALPHA: GLenum = 0x8004;
pub const SRC1_ALPHA: GLenum = 0x8589;
pub const SRC1_COLOR: GLenum = 0x88F9;
pub const ONE_MINUS_SRC1_COLOR: GLenum = 0x88FA;
pub const ONE_MINUS_SRC1_ALPHA: GLenum = 0x88FB;
pub const FUNC_ADD: GLenum = 0x8006;
pub const MIN: GLenum = 0x8007;
pub const MAX: GLenum = 0x8008;
pub const FUNC_SUBTRACT: GLenum = 0x800A;
pub const FUNC_REVERSE_SUBTRACT: GLenum = 0x800B;
pub const BLEND_SRC_RGB: GLenum = 0x80C9;
pub const BLEND_DST_RGB: GLenum = 0x80C8;
pub const BLEND_SRC_ALPHA: GLenum = 0x80CB;
pub const BLEND_DST_ALPHA: GLenum = 0x80CA;
pub const BLEND_EQUATION_RGB: GLenum = 0x8009;
pub const BLEND_EQUATION_ALPHA: GLenum = 0x883D;
pub const BLEND_COLOR: GLenum = 0x8005;

// Comparison and stencil.
pub const NEVER: GLenum = 0x0200;
pub const LESS: GLenum = 0x0201;
pub const EQUAL: GLenum = 0x0202;
pub const LEQUAL: GLenum = 0x0203;
pub const GREATER: GLenum = 0x0204;
pub const NOTEQUAL: GLenum = 0x0205;
pub const GEQUAL: GLenum = 0x0206;
pub const ALWAYS: GLenum = 0x0207;
pub const KEEP: GLenum = 0x1E00;
pub const REPLACE: GLenum = 0x1E01;
pub const INCR: GLenum = 0x1E02;
pub const DECR: GLenum = 0x1E03;
pub const INVERT: GLenum = 0x150A;
pub const INCR_WRAP: GLenum = 0x8507;
pub const DECR_WRAP: GLenum = 0x8508;
pub const STENCIL_FUNC: GLenum = 0x0B92;
pub const STENCIL_VALUE_MASK: GLenum = 0x0B93;
pub const STENCIL_FAIL: GLenum = 0x0B94;
pub const STENCIL_PASS_DEPTH_FAIL: GLenum = 0x0B95;
pub const STENCIL_PASS_DEPTH_PASS: GLenum = 0x0B96;
pub const STENCIL_REF: GLenum = 0x0B97;
pub const STENCIL_WRITEMASK: GLenum = 0x0B98;
pub const STENCIL_BACK_FUNC: GLenum = 0x8800;
pub const STENCIL_BACK_FAIL: GLenum = 0x8801;
pub const STENCIL_BACK_PASS_DEPTH_FAIL: GLenum = 0x8802;
pub const STENCIL_BACK_PASS_DEPTH_PASS: GLenum = 0x8803;
pub const STENCIL_BACK_REF: GLenum = 0x8CA3;
pub const STENCIL_BACK_VALUE_MASK: GLenum = 0x8CA4;
pub const STENCIL_BACK_WRITEMASK: GLenum = 0x8CA5;
pub const DEPTH_FUNC: GLenum = 0x0B74;
pub const DEPTH_WRITEMASK: GLenum = 0x0B72;
pub const DEPTH_RANGE: GLenum = 0x0B70;
pub const ALPHA_TEST_FUNC: GLenum = 0x0BC1;
pub const ALPHA_TEST_REF: GLenum = 0x0BC2;

// Rasterisation.
pub const FRONT: GLenum = 0x0404;
pub const BACK: GLenum = 0x0405;
pub const FRONT_AND_BACK: GLenum = 0x0408;
pub const CW: GLenum = 0x0900;
pub const CCW: GLenum = 0x0901;
pub const POINT: GLenum = 0x1B00;
pub const LINE: GLenum = 0x1B01;
pub const FILL: GLenum = 0x1B02;
pub const FLAT: GLenum = 0x1D00;
pub const SMOOTH: GLenum = 0x1D01;
pub const CULL_FACE_MODE: GLenum = 0x0B45;
pub const FRONT_FACE: GLenum = 0x0B46;
pub const POLYGON_MODE: GLenum = 0x0B40;
pub const SHADE_MODEL: GLenum = 0x0B54;
pub const POLYGON_OFFSET_FACTOR: GLenum = 0x8038;
pub const POLYGON_OFFSET_UNITS: GLenum = 0x2A00;
pub const LINE_STIPPLE_PATTERN: GLenum = 0x0B25;
pub const LINE_STIPPLE_REPEAT: GLenum = 0x0B26;
pub const LINE_WIDTH: GLenum = 0x0B21;
pub const POINT_SIZE: GLenum = 0x0B11;
pub const POINT_SIZE_MIN: GLenum = 0x8126;
pub const POINT_SIZE_MAX: GLenum = 0x8127;
pub const POINT_DISTANCE_ATTENUATION: GLenum = 0x8129;
pub const COORD_REPLACE: GLenum = 0x8862;
pub const VIEWPORT: GLenum = 0x0BA2;
pub const SCISSOR_BOX: GLenum = 0x0C10;
pub const COLOR_WRITEMASK: GLenum = 0x0C23;
pub const COLOR_CLEAR_VALUE: GLenum = 0x0C22;
pub const DEPTH_CLEAR_VALUE: GLenum = 0x0B73;
pub const STENCIL_CLEAR_VALUE: GLenum = 0x0B91;

// Fog.
pub const FOG_MODE: GLenum = 0x0B65;
pub const FOG_DENSITY: GLenum = 0x0B62;
pub const FOG_START: GLenum = 0x0B63;
pub const FOG_END: GLenum = 0x0B64;
pub const FOG_COLOR: GLenum = 0x0B66;
pub const EXP: GLenum = 0x0800;
pub const EXP2: GLenum = 0x0801;
pub const FOG_COORD_SRC: GLenum = 0x8450;
pub const FOG_COORD: GLenum = 0x8451;
pub const FRAGMENT_DEPTH: GLenum = 0x8452;
pub const FOG_DISTANCE_MODE_NV: GLenum = 0x855A;
pub const EYE_RADIAL_NV: GLenum = 0x855B;
pub const EYE_PLANE_ABSOLUTE_NV: GLenum = 0x855C;

// Lighting and materials.
pub const LIGHT_MODEL_AMBIENT: GLenum = 0x0B53;
pub const LIGHT_MODEL_LOCAL_VIEWER: GLenum = 0x0B51;
pub const LIGHT_MODEL_COLOR_CONTROL: GLenum = 0x81F8;
pub const SINGLE_COLOR: GLenum = 0x81F9;
pub const SEPARATE_SPECULAR_COLOR: GLenum = 0x81FA;
pub const AMBIENT: GLenum = 0x1200;
pub const DIFFUSE: GLenum = 0x1201;
pub const SPECULAR: GLenum = 0x1202;
pub const POSITION: GLenum = 0x1203;
pub const SPOT_DIRECTION: GLenum = 0x1204;
pub const SPOT_EXPONENT: GLenum = 0x1205;
pub const SPOT_CUTOFF: GLenum = 0x1206;
pub const CONSTANT_ATTENUATION: GLenum = 0x1207;
pub const LINEAR_ATTENUATION: GLenum = 0x1208;
pub const QUADRATIC_ATTENUATION: GLenum = 0x1209;
pub const EMISSION: GLenum = 0x1600;
pub const SHININESS: GLenum = 0x1601;
pub const AMBIENT_AND_DIFFUSE: GLenum = 0x1602;

// Matrices.
pub const MODELVIEW: GLenum = 0x1700;
pub const PROJECTION: GLenum = 0x1701;
pub const TEXTURE: GLenum = 0x1702;
pub const MATRIX_MODE: GLenum = 0x0BA0;
pub const MODELVIEW_MATRIX: GLenum = 0x0BA6;
pub const PROJECTION_MATRIX: GLenum = 0x0BA7;
pub const TEXTURE_MATRIX: GLenum = 0x0BA8;

// Texture environment.
pub const TEXTURE_ENV: GLenum = 0x2300;
pub const TEXTURE_ENV_MODE: GLenum = 0x2200;
pub const TEXTURE_ENV_COLOR: GLenum = 0x2201;
pub const MODULATE: GLenum = 0x2100;
pub const ADD: GLenum = 0x0104;
pub const COMBINE: GLenum = 0x8570;
pub const COMBINE_RGB: GLenum = 0x8571;
pub const COMBINE_ALPHA: GLenum = 0x8572;
pub const RGB_SCALE: GLenum = 0x8573;
pub const ALPHA_SCALE: GLenum = 0x0D1C;
pub const ADD_SIGNED: GLenum = 0x8574;
pub const INTERPOLATE: GLenum = 0x8575;
pub const CONSTANT: GLenum = 0x8576;
pub const PRIMARY_COLOR: GLenum = 0x8577;
pub const PREVIOUS: GLenum = 0x8578;
pub const SUBTRACT: GLenum = 0x84E7;
pub const DOT3_RGBA: GLenum = 0x86AF;
pub const SRC0_RGB: GLenum = 0x8580;
pub const SRC1_RGB: GLenum = 0x8581;
pub const SRC2_RGB: GLenum = 0x8582;
pub const SRC0_ALPHA: GLenum = 0x8588;
pub const SRC1_ALPHA_ENV: GLenum = 0x8589;
pub const SRC2_ALPHA: GLenum = 0x858A;
pub const OPERAND0_RGB: GLenum = 0x8590;
pub const OPERAND1_RGB: GLenum = 0x8591;
pub const OPERAND2_RGB: GLenum = 0x8592;
pub const OPERAND0_ALPHA: GLenum = 0x8598;
pub const OPERAND1_ALPHA: GLenum = 0x8599;
pub const OPERAND2_ALPHA: GLenum = 0x859A;
pub const TEXTURE_FILTER_CONTROL: GLenum = 0x8500;
pub const TEXTURE_LOD_BIAS: GLenum = 0x8501;

// Texture parameters.
pub const TEXTURE_MAG_FILTER: GLenum = 0x2800;
pub const TEXTURE_MIN_FILTER: GLenum = 0x2801;
pub const TEXTURE_WRAP_S: GLenum = 0x2802;
pub const TEXTURE_WRAP_T: GLenum = 0x2803;
pub const TEXTURE_WRAP_R: GLenum = 0x8072;
pub const TEXTURE_BORDER_COLOR: GLenum = 0x1004;
pub const TEXTURE_BASE_LEVEL: GLenum = 0x813C;
pub const TEXTURE_MAX_LEVEL: GLenum = 0x813D;
pub const NEAREST: GLenum = 0x2600;
pub const LINEAR: GLenum = 0x2601;
pub const NEAREST_MIPMAP_NEAREST: GLenum = 0x2700;
pub const LINEAR_MIPMAP_NEAREST: GLenum = 0x2701;
pub const NEAREST_MIPMAP_LINEAR: GLenum = 0x2702;
pub const LINEAR_MIPMAP_LINEAR: GLenum = 0x2703;
pub const REPEAT: GLenum = 0x2901;
pub const CLAMP_TO_EDGE: GLenum = 0x812F;
pub const CLAMP_TO_BORDER: GLenum = 0x812D;
pub const MIRRORED_REPEAT: GLenum = 0x8370;
pub const MIRROR_CLAMP_TO_EDGE: GLenum = 0x8743;
pub const TEXTURE_SWIZZLE_R: GLenum = 0x8E42;
pub const TEXTURE_SWIZZLE_G: GLenum = 0x8E43;
pub const TEXTURE_SWIZZLE_B: GLenum = 0x8E44;
pub const TEXTURE_SWIZZLE_A: GLenum = 0x8E45;

// Texture coordinate generation.
pub const S: GLenum = 0x2000;
pub const T: GLenum = 0x2001;
pub const R: GLenum = 0x2002;
pub const Q: GLenum = 0x2003;
pub const TEXTURE_GEN_MODE: GLenum = 0x2500;
pub const EYE_LINEAR: GLenum = 0x2400;
pub const OBJECT_LINEAR: GLenum = 0x2401;
pub const SPHERE_MAP: GLenum = 0x2402;
pub const NORMAL_MAP: GLenum = 0x8511;
pub const REFLECTION_MAP: GLenum = 0x8512;

// Pixel store.
pub const UNPACK_ROW_LENGTH: GLenum = 0x0CF2;
pub const UNPACK_SKIP_ROWS: GLenum = 0x0CF3;
pub const UNPACK_SKIP_PIXELS: GLenum = 0x0CF4;
pub const UNPACK_ALIGNMENT: GLenum = 0x0CF5;
pub const UNPACK_SKIP_IMAGES: GLenum = 0x806D;
pub const UNPACK_IMAGE_HEIGHT: GLenum = 0x806E;
pub const PACK_ROW_LENGTH: GLenum = 0x0D02;
pub const PACK_SKIP_ROWS: GLenum = 0x0D03;
pub const PACK_SKIP_PIXELS: GLenum = 0x0D04;
pub const PACK_ALIGNMENT: GLenum = 0x0D05;
pub const PACK_SKIP_IMAGES: GLenum = 0x806B;
pub const PACK_IMAGE_HEIGHT: GLenum = 0x806C;

// Pixel formats.
pub const STENCIL_INDEX: GLenum = 0x1901;
pub const DEPTH_COMPONENT: GLenum = 0x1902;
pub const RED: GLenum = 0x1903;
pub const ALPHA: GLenum = 0x1906;
pub const RGB: GLenum = 0x1907;
pub const RGBA: GLenum = 0x1908;
pub const LUMINANCE: GLenum = 0x1909;
pub const LUMINANCE_ALPHA: GLenum = 0x190A;
pub const BGR: GLenum = 0x80E0;
pub const BGRA: GLenum = 0x80E1;
pub const RG: GLenum = 0x8227;
pub const DEPTH_STENCIL: GLenum = 0x84F9;

// Internal formats.
pub const RGB5: GLenum = 0x8050;
pub const RGB8: GLenum = 0x8051;
pub const RGBA4: GLenum = 0x8056;
pub const RGB5_A1: GLenum = 0x8057;
pub const RGBA8: GLenum = 0x8058;
pub const RGB10_A2: GLenum = 0x8059;
pub const RGBA16: GLenum = 0x805B;
pub const RGB565: GLenum = 0x8D62;
pub const ALPHA8: GLenum = 0x803C;
pub const LUMINANCE8: GLenum = 0x8040;
pub const LUMINANCE16: GLenum = 0x8042;
pub const LUMINANCE4_ALPHA4: GLenum = 0x8043;
pub const LUMINANCE8_ALPHA8: GLenum = 0x8045;
pub const R8: GLenum = 0x8229;
pub const R16: GLenum = 0x822A;
pub const RG8: GLenum = 0x822B;
pub const RG16: GLenum = 0x822C;
pub const R16F: GLenum = 0x822D;
pub const R32F: GLenum = 0x822E;
pub const RG16F: GLenum = 0x822F;
pub const RG32F: GLenum = 0x8230;
pub const RGBA32F: GLenum = 0x8814;
pub const RGBA16F: GLenum = 0x881A;
pub const RG8_SNORM: GLenum = 0x8F95;
pub const RGBA8_SNORM: GLenum = 0x8F97;
pub const RG16_SNORM: GLenum = 0x8F99;
pub const DEPTH_COMPONENT16: GLenum = 0x81A5;
pub const DEPTH_COMPONENT24: GLenum = 0x81A6;
pub const DEPTH_COMPONENT32: GLenum = 0x81A7;
pub const DEPTH_COMPONENT32F: GLenum = 0x8CAC;
pub const DEPTH24_STENCIL8: GLenum = 0x88F0;
pub const COMPRESSED_RGBA_S3TC_DXT1_EXT: GLenum = 0x83F1;
pub const COMPRESSED_RGBA_S3TC_DXT3_EXT: GLenum = 0x83F2;
pub const COMPRESSED_RGBA_S3TC_DXT5_EXT: GLenum = 0x83F3;

// Data types.
pub const BYTE: GLenum = 0x1400;
pub const UNSIGNED_BYTE: GLenum = 0x1401;
pub const SHORT: GLenum = 0x1402;
pub const UNSIGNED_SHORT: GLenum = 0x1403;
pub const INT: GLenum = 0x1404;
pub const UNSIGNED_INT: GLenum = 0x1405;
pub const FLOAT: GLenum = 0x1406;
pub const HALF_FLOAT: GLenum = 0x140B;
pub const UNSIGNED_SHORT_5_6_5: GLenum = 0x8363;
pub const UNSIGNED_SHORT_4_4_4_4_REV: GLenum = 0x8365;
pub const UNSIGNED_SHORT_1_5_5_5_REV: GLenum = 0x8366;
pub const UNSIGNED_INT_8_8_8_8_REV: GLenum = 0x8367;
pub const UNSIGNED_INT_2_10_10_10_REV: GLenum = 0x8368;
pub const INT_2_10_10_10_REV: GLenum = 0x8D9F;
pub const UNSIGNED_INT_24_8: GLenum = 0x84FA;

// Buffers.
pub const ARRAY_BUFFER: GLenum = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: GLenum = 0x8893;
pub const ARRAY_BUFFER_BINDING: GLenum = 0x8894;
pub const ELEMENT_ARRAY_BUFFER_BINDING: GLenum = 0x8895;
pub const STREAM_DRAW: GLenum = 0x88E0;
pub const STATIC_DRAW: GLenum = 0x88E4;
pub const DYNAMIC_DRAW: GLenum = 0x88E8;

// Framebuffers.
pub const FRAMEBUFFER: GLenum = 0x8D40;
pub const READ_FRAMEBUFFER: GLenum = 0x8CA8;
pub const DRAW_FRAMEBUFFER: GLenum = 0x8CA9;
pub const DRAW_FRAMEBUFFER_BINDING: GLenum = 0x8CA6;
pub const READ_FRAMEBUFFER_BINDING: GLenum = 0x8CAA;
pub const RENDERBUFFER: GLenum = 0x8D41;
pub const COLOR_ATTACHMENT0: GLenum = 0x8CE0;
pub const DEPTH_ATTACHMENT: GLenum = 0x8D00;
pub const STENCIL_ATTACHMENT: GLenum = 0x8D20;
pub const DEPTH_STENCIL_ATTACHMENT: GLenum = 0x821A;
pub const FRAMEBUFFER_COMPLETE: GLenum = 0x8CD5;
pub const FRAMEBUFFER_UNSUPPORTED: GLenum = 0x8CDD;
pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: GLenum = 0x8CD6;
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: GLenum = 0x8CD7;
pub const COLOR_BUFFER_BIT: GLbitfield = 0x4000;
pub const DEPTH_BUFFER_BIT: GLbitfield = 0x0100;
pub const STENCIL_BUFFER_BIT: GLbitfield = 0x0400;

// Fixed-function client arrays.
pub const VERTEX_ARRAY: GLenum = 0x8074;
pub const NORMAL_ARRAY: GLenum = 0x8075;
pub const COLOR_ARRAY: GLenum = 0x8076;
pub const TEXTURE_COORD_ARRAY: GLenum = 0x8078;
pub const FOG_COORD_ARRAY: GLenum = 0x8457;
pub const SECONDARY_COLOR_ARRAY: GLenum = 0x845E;

// Primitives.
pub const POINTS: GLenum = 0x0000;
pub const LINES: GLenum = 0x0001;
pub const LINE_STRIP: GLenum = 0x0003;
pub const TRIANGLES: GLenum = 0x0004;
pub const TRIANGLE_STRIP: GLenum = 0x0005;
pub const TRIANGLE_FAN: GLenum = 0x0006;

// Queries.
pub const SAMPLES_PASSED: GLenum = 0x8914;
pub const QUERY_RESULT: GLenum = 0x8866;
pub const QUERY_RESULT_AVAILABLE: GLenum = 0x8867;
