use serde_json::Value;

use crate::validation::ResolvedParams;

/// Resize bounds. Either dimension may be omitted; the engine preserves the
/// aspect ratio within whatever bound is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Crop window in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Transformation parameters a route may hand to its engine.
///
/// Which of these a given route actually accepts is the registry's business:
/// a route's rule set gates them before dispatch, so an engine only ever sees
/// combinations its route declared. `pdf_standard` is carried for validation
/// and metadata; it maps to no engine flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    pub resize: Option<Resize>,
    pub crop: Option<Crop>,
    /// Degrees clockwise.
    pub rotate: Option<i32>,
    /// Vertical mirror.
    pub flip: bool,
    /// Horizontal mirror.
    pub flop: bool,
    pub quality: Option<u8>,
    pub pdf_standard: Option<String>,
}

impl ConvertOptions {
    /// Extract the recognized transformation parameters from the merged
    /// parameter view. Callers run this after validation, so malformed
    /// values for gated fields were already rejected; anything else that
    /// fails to coerce is simply left unset.
    pub fn from_params(params: &ResolvedParams) -> Self {
        let resize = {
            let width = to_u32(params.resolve("resize.width"));
            let height = to_u32(params.resolve("resize.height"));
            (width.is_some() || height.is_some()).then_some(Resize { width, height })
        };

        // A crop needs the full window; a partial one is ignored.
        let crop = match (
            to_u32(params.resolve("crop.x")),
            to_u32(params.resolve("crop.y")),
            to_u32(params.resolve("crop.width")),
            to_u32(params.resolve("crop.height")),
        ) {
            (Some(x), Some(y), Some(width), Some(height)) => {
                Some(Crop { x, y, width, height })
            }
            _ => None,
        };

        Self {
            resize,
            crop,
            rotate: to_i32(params.resolve("rotate")),
            flip: to_bool(params.resolve("flip")).unwrap_or(false),
            flop: to_bool(params.resolve("flop")).unwrap_or(false),
            quality: to_u32(params.resolve("quality")).and_then(|q| u8::try_from(q).ok()),
            pdf_standard: params
                .resolve("pdf-standard")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

// Form-carried values arrive as strings as often as numbers, so the
// coercions below accept both.

fn to_u32(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_i32(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
