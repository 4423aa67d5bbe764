//! Data URI helpers for generated step images.
//!
//! Images come back from the image model as inline base64 payloads and are
//! carried on each step as `data:<mime>;base64,<data>` URIs. Terminal
//! front-ends cannot display those inline, so they can also be written to disk.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

use crate::error::{CyberscriptError, Result};
use crate::types::AttackScenario;

/// MIME type assumed when the service does not report one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Wrap an already base64-encoded payload in a data URI.
pub fn encode_data_uri(mime: &str, base64_data: &str) -> String {
    format!("data:{};base64,{}", mime, base64_data)
}

/// Split a data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing 'data:' scheme"))?;
    let (mime, data) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("missing ';base64,' marker"))?;
    if !mime.starts_with("image/") {
        return Err(invalid(&format!("unexpected MIME type '{}'", mime)));
    }
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| invalid(&format!("bad base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Whether `uri` is a decodable image data URI.
pub fn is_image_data_uri(uri: &str) -> bool {
    decode_data_uri(uri).is_ok()
}

fn invalid(reason: &str) -> CyberscriptError {
    CyberscriptError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid image data URI: {}", reason),
    ))
}

fn extension_for(mime: &str) -> &str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Lowercase, dash-separated, ASCII-only form of a step title for file names.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    let mut out: String = trimmed.chars().take(48).collect();
    if out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "step".to_string()
    } else {
        out
    }
}

/// Write every illustrated step's image into `dir`.
///
/// Files are named `step-NN-<slug>.<ext>` with 1-based step numbers. Steps
/// without an image are skipped. Returns `(step index, path)` for each file written.
pub fn save_step_images(scenario: &AttackScenario, dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (idx, step) in scenario.steps.iter().enumerate() {
        let Some(uri) = step.image_url.as_deref() else {
            continue;
        };
        let (mime, bytes) = decode_data_uri(uri)?;
        let file_name = format!(
            "step-{:02}-{}.{}",
            idx + 1,
            slugify(&step.title),
            extension_for(&mime)
        );
        let path = dir.join(file_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(step = idx + 1, path = %path.display(), "Saved step image");
        written.push((idx, path));
    }
    Ok(written)
}
