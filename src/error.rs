//! Error types shared by the core and the browser glue.

/// Everything that can stop an effect from being built or drawn.
///
/// None of these are fatal to the page: callers at the per-container
/// boundary log them and leave the static fallback in place.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EffectError {
    /// A rendering context could not be created on the canvas.
    #[error("rendering context unavailable")]
    ContextUnavailable,

    /// The host element has no drawing surface.
    #[error("canvas not found: {0}")]
    MissingCanvas(String),

    /// A shader stage failed to compile.
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    /// The vertex and fragment stages failed to link.
    #[error("program link failed: {0}")]
    ProgramLink(String),

    /// A GPU object (buffer, vertex array, program) could not be allocated.
    #[error("GPU resource allocation failed: {0}")]
    Resource(String),

    /// Generated geometry is inconsistent.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// A host (JavaScript) call threw.
    #[error("host error: {0}")]
    Js(String),
}

/// Why a color string was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("empty color value")]
    Empty,

    #[error("invalid hex color: {0}")]
    InvalidHex(String),

    #[error("invalid rgb() color: {0}")]
    InvalidRgb(String),

    #[error("invalid hsl() color: {0}")]
    InvalidHsl(String),

    #[error("unknown color name: {0}")]
    UnknownName(String),

    #[error("unsupported color format: {0}")]
    Unsupported(String),
}
