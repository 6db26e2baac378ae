//! Shader program registry and the persisted shader preference.
//!
//! Every background shader ships inside the binary as WebGL-1 style GLSL. The
//! renderer wraps these sources for its own backend; nothing here touches the
//! GPU.
mod preference;
mod registry;

pub use preference::{
    load_selected_shader, FilePreferenceStore, MemoryPreferenceStore, PreferenceError,
    PreferenceStore, PREFERENCE_KEY,
};
pub use registry::{
    definitions, lookup, ParseShaderIdError, ShaderDefinition, ShaderId, UnknownShader,
    VERTEX_SOURCE,
};
