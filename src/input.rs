// src/input.rs
//
// Image source: turns a file path or base64 payload into a Raster.
// Decode failures surface here, before any comparison work starts.

use crate::error::{CompareError, Result};
use crate::raster::Raster;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tracing::debug;

pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| CompareError::Decode(format!("{}: {}", path.display(), e)))?;
    let raster = Raster::from_dynamic(img);
    debug!(
        "Loaded {} ({}x{}, {} channel(s))",
        path.display(),
        raster.width(),
        raster.height(),
        raster.channels()
    );
    Ok(raster)
}

/// Accepts bare base64 or a `data:image/...;base64,` URL.
pub fn load_base64(payload: &str) -> Result<Raster> {
    let encoded = match payload.find("base64,") {
        Some(idx) if payload.starts_with("data:") => &payload[idx + "base64,".len()..],
        _ => payload,
    };
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| CompareError::Decode(format!("invalid base64: {}", e)))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| CompareError::Decode(format!("unsupported image data: {}", e)))?;
    Ok(Raster::from_dynamic(img))
}
