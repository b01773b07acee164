//! Provenance extraction from PNG metadata.
//!
//! Generated images embed their generation parameters as PNG `tEXt`
//! chunks. Three layouts are recognized, tried in order:
//!
//! 1. A `parameters` chunk (A1111-style) containing a
//!    `<lora:name:strength>` directive → `"name:strength"`. A
//!    `parameters` chunk *without* the directive means the image is
//!    known to have no group → the `"NONE"` sentinel.
//! 2. A `prompt` chunk holding ComfyUI API JSON: the first
//!    `LoraLoader` node's model path, basename with the weights
//!    extension stripped.
//! 3. A `workflow` chunk holding ComfyUI workflow JSON, same rule.
//!
//! Anything else → `""` (no provenance information at all).

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a PNG file")]
    NotPng,

    #[error("truncated PNG chunk")]
    Truncated,
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Extract the provenance string for an image, per the rules above.
pub fn extract_provenance(path: &Path) -> Result<String, MetadataError> {
    let bytes = std::fs::read(path)?;
    let text_chunks = collect_text_chunks(&bytes)?;

    if let Some(parameters) = text_chunks.get("parameters") {
        if let Some(name) = parse_lora_directive(parameters) {
            return Ok(name);
        }
        // Parameters exist, but no group directive.
        return Ok("NONE".to_string());
    }

    if let Some(prompt) = text_chunks.get("prompt") {
        if let Ok(json) = serde_json::from_str::<Value>(prompt) {
            if let Some(name) = lora_from_api_json(&json) {
                return Ok(name);
            }
        }
    }

    if let Some(workflow) = text_chunks.get("workflow") {
        if let Ok(json) = serde_json::from_str::<Value>(workflow) {
            if let Some(name) = lora_from_workflow_json(&json) {
                return Ok(name);
            }
        }
    }

    Ok(String::new())
}

/// Walk the PNG chunk stream and collect `tEXt` keyword → text pairs.
/// Chunk text is Latin-1; each byte maps directly to a char.
fn collect_text_chunks(bytes: &[u8]) -> Result<HashMap<String, String>, MetadataError> {
    if bytes.len() < 8 || bytes[..8] != PNG_SIGNATURE {
        return Err(MetadataError::NotPng);
    }

    let mut chunks = HashMap::new();
    let mut offset = 8;

    while offset + 8 <= bytes.len() {
        let length =
            u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
                as usize;
        let chunk_type = &bytes[offset + 4..offset + 8];
        let data_start = offset + 8;
        let data_end = data_start + length;
        if data_end + 4 > bytes.len() {
            return Err(MetadataError::Truncated);
        }

        if chunk_type == b"tEXt" {
            let data = &bytes[data_start..data_end];
            let (keyword, text) = match data.iter().position(|&b| b == 0) {
                Some(null_idx) => (&data[..null_idx], &data[null_idx + 1..]),
                None => (&data[..0], data),
            };
            chunks.insert(latin1_to_string(keyword), latin1_to_string(text));
        } else if chunk_type == b"IEND" {
            break;
        }

        // Skip data + CRC.
        offset = data_end + 4;
    }

    Ok(chunks)
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse the first `<lora:name:strength>` directive out of a prompt
/// parameter block.
fn parse_lora_directive(text: &str) -> Option<String> {
    let start = text.find("<lora:")?;
    let body = &text[start + "<lora:".len()..];
    let end = body.find('>')?;
    let body = &body[..end];

    let (name, strength) = match body.find(':') {
        Some(colon) => (&body[..colon], &body[colon + 1..]),
        None => (body, ""),
    };
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if strength.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{name}:{strength}"))
    }
}

/// ComfyUI API format: an object of nodes keyed by id.
fn lora_from_api_json(json: &Value) -> Option<String> {
    let nodes = json.as_object()?;
    for node in nodes.values() {
        if node.get("class_type").and_then(Value::as_str) == Some("LoraLoader") {
            if let Some(name) = name_from_lora_node(node) {
                return Some(name);
            }
        }
    }
    None
}

/// ComfyUI workflow format: `{ "nodes": [...] }`.
fn lora_from_workflow_json(json: &Value) -> Option<String> {
    let nodes = json.get("nodes")?.as_array()?;
    for node in nodes {
        if node.get("class_type").and_then(Value::as_str) == Some("LoraLoader") {
            if let Some(name) = name_from_lora_node(node) {
                return Some(name);
            }
        }
    }
    None
}

fn name_from_lora_node(node: &Value) -> Option<String> {
    let inputs = node.get("inputs");
    if let Some(name) = inputs
        .and_then(|i| i.get("lora_name"))
        .and_then(Value::as_str)
    {
        return model_name_from_path(name);
    }
    if let Some(name) = inputs
        .and_then(|i| i.get("lora_name"))
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
    {
        return model_name_from_path(name);
    }
    if let Some(name) = node
        .get("widgets_values")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
    {
        return model_name_from_path(name);
    }
    None
}

/// Basename of a model path with the weights extension stripped.
fn model_name_from_path(model_path: &str) -> Option<String> {
    let base = model_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(model_path);
    let name = ["safetensors", "ckpt", "pt", "bin"]
        .iter()
        .find_map(|ext| {
            let suffix = format!(".{ext}");
            if base.to_ascii_lowercase().ends_with(&suffix) {
                Some(&base[..base.len() - suffix.len()])
            } else {
                None
            }
        })
        .unwrap_or(base)
        .trim()
        .to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal PNG: signature + the given tEXt chunks + IEND.
    /// CRCs are garbage — the chunk walker never checks them.
    fn png_with_text(chunks: &[(&str, &str)]) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        for (keyword, text) in chunks {
            let mut data = keyword.as_bytes().to_vec();
            data.push(0);
            data.extend_from_slice(text.as_bytes());
            bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
            bytes.extend_from_slice(b"tEXt");
            bytes.extend_from_slice(&data);
            bytes.extend_from_slice(&[0, 0, 0, 0]);
        }
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"IEND");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        (dir, path)
    }

    #[test]
    fn lora_directive_with_strength() {
        let png = png_with_text(&[("parameters", "a photo <lora:styleA:0.8> masterpiece")]);
        let (_dir, path) = write_temp(&png);
        assert_eq!(extract_provenance(&path).unwrap(), "styleA:0.8");
    }

    #[test]
    fn parameters_without_directive_is_sentinel() {
        let png = png_with_text(&[("parameters", "a plain prompt, no group")]);
        let (_dir, path) = write_temp(&png);
        assert_eq!(extract_provenance(&path).unwrap(), "NONE");
    }

    #[test]
    fn comfyui_prompt_chunk() {
        let prompt = r#"{"3":{"class_type":"LoraLoader","inputs":{"lora_name":"styles/fancy_style.safetensors"}}}"#;
        let png = png_with_text(&[("prompt", prompt)]);
        let (_dir, path) = write_temp(&png);
        assert_eq!(extract_provenance(&path).unwrap(), "fancy_style");
    }

    #[test]
    fn workflow_chunk_widgets_values() {
        let workflow =
            r#"{"nodes":[{"class_type":"LoraLoader","widgets_values":["deep\\nested\\thing.ckpt"]}]}"#;
        let png = png_with_text(&[("workflow", workflow)]);
        let (_dir, path) = write_temp(&png);
        assert_eq!(extract_provenance(&path).unwrap(), "thing");
    }

    #[test]
    fn no_metadata_is_empty() {
        let png = png_with_text(&[("Software", "some editor")]);
        let (_dir, path) = write_temp(&png);
        assert_eq!(extract_provenance(&path).unwrap(), "");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = extract_provenance(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, MetadataError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn non_png_is_an_error() {
        let (_dir, path) = write_temp(b"GIF89a not a png");
        assert!(matches!(
            extract_provenance(&path),
            Err(MetadataError::NotPng)
        ));
    }

    #[test]
    fn truncated_chunk_is_an_error() {
        let mut png = png_with_text(&[("parameters", "text")]);
        png.truncate(20);
        let (_dir, path) = write_temp(&png);
        assert!(matches!(
            extract_provenance(&path),
            Err(MetadataError::Truncated)
        ));
    }

    #[test]
    fn directive_without_strength() {
        assert_eq!(parse_lora_directive("x <lora:plain> y"), Some("plain".to_string()));
        assert_eq!(parse_lora_directive("no directive here"), None);
    }
}
