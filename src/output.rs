//! Saving generated images to disk.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;

use crate::error::StudioError;

/// Sanitize a string for use in a filename.
///
/// Converts to lowercase, replaces non-alphanumeric chars with hyphens,
/// collapses consecutive hyphens, and trims to max length.
#[must_use]
pub fn sanitize_for_filename(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(max_len);
    let mut last_was_hyphen = true;

    for ch in input.chars() {
        if result.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "lookbook".to_string()
    } else {
        result
    }
}

/// File extension for an image MIME type.
#[must_use]
pub fn mime_extension(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Split a base64 `data:` URI into MIME type and decoded bytes.
///
/// Returns `None` for anything that is not a base64 data URI.
#[must_use]
pub fn parse_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

/// Output path for image `index` of `total`.
///
/// With an explicit path its stem is reused; otherwise the stem comes from
/// the prompt plus a unix timestamp. Multiple images get `-N` suffixes and
/// the extension always follows the image type.
#[must_use]
pub fn output_path(
    explicit: Option<&str>,
    prompt: &str,
    index: usize,
    total: usize,
    mime: &str,
) -> PathBuf {
    let ext = mime_extension(mime);
    let (dir, stem) = match explicit {
        Some(p) => {
            let p = Path::new(p);
            let stem = p.file_stem().map_or_else(|| "lookbook".into(), |s| s.to_string_lossy());
            (p.parent().map(Path::to_path_buf).unwrap_or_default(), stem.into_owned())
        }
        None => {
            let timestamp =
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            (PathBuf::new(), format!("{}-{timestamp}", sanitize_for_filename(prompt, 50)))
        }
    };
    let name = if total > 1 {
        format!("{stem}-{}.{ext}", index + 1)
    } else {
        format!("{stem}.{ext}")
    };
    dir.join(name)
}

/// Fetch the bytes behind a result locator.
async fn fetch(client: &reqwest::Client, url: &str) -> Result<(String, Vec<u8>), StudioError> {
    if let Some(decoded) = parse_data_url(url) {
        return Ok(decoded);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(StudioError::InvalidArgument(format!("Unsupported image locator: {url:.60}")));
    }
    let response = client.get(url).send().await?.error_for_status()?;
    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    Ok((mime, response.bytes().await?.to_vec()))
}

/// Save every result image and return the written paths.
///
/// Remote URLs are downloaded with `client`, so its timeout applies.
///
/// # Errors
///
/// Returns [`StudioError::NoResults`] when `urls` is empty, or an error if an
/// image cannot be fetched or written.
pub async fn save_results(
    client: &reqwest::Client,
    urls: &[String],
    explicit: Option<&str>,
    prompt: &str,
) -> Result<Vec<PathBuf>, StudioError> {
    if urls.is_empty() {
        return Err(StudioError::NoResults);
    }
    let mut saved = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        let (mime, bytes) = fetch(client, url).await?;
        let path = output_path(explicit, prompt, i, urls.len(), &mime);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), mime = %mime, "image saved");
        saved.push(path);
    }
    Ok(saved)
}
