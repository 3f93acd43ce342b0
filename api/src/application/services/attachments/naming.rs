use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static OBJECT_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

const MAX_NAME_LEN: usize = 100;
const MAX_EXT_LEN: usize = 16;
const FALLBACK_NAME: &str = "file.bin";

/// Object types double as directory names and table names.
pub fn is_valid_object_type(object_type: &str) -> bool {
    OBJECT_TYPE_RE.is_match(object_type)
}

pub fn sanitize_file_name(name: &str) -> String {
    let mut s = name.trim().to_string();
    let invalid = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];
    for ch in invalid {
        s = s.replace(ch, "-");
    }
    s = s.replace(' ', "_");
    // "." and ".." would escape the owner directory
    if s.chars().all(|c| c == '.') {
        s.clear();
    }
    if s.len() > MAX_NAME_LEN {
        s = shorten_keeping_extension(&s);
    }
    if s.is_empty() {
        s = "file".into();
    }
    s
}

/// Name a file is stored under, before collision numbering.
pub fn stored_name(original: Option<&str>) -> String {
    sanitize_file_name(original_or_fallback(original))
}

/// Trims the stem so the last extension survives the length cap.
fn shorten_keeping_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.len() <= MAX_EXT_LEN => {
            let stem = truncate_on_boundary(stem, MAX_NAME_LEN - ext.len() - 1);
            format!("{stem}.{ext}")
        }
        _ => truncate_on_boundary(name, MAX_NAME_LEN).to_string(),
    }
}

fn truncate_on_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

pub fn split_name(name: &str) -> (String, String) {
    let p = Path::new(name);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file")
        .to_string();
    let ext = p
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    (stem, ext)
}

/// `photo.png` -> `photo-{n}.png`
pub fn numbered(name: &str, n: usize) -> String {
    let (stem, ext) = split_name(name);
    if ext.is_empty() {
        format!("{}-{}", stem, n)
    } else {
        format!("{}-{}.{}", stem, n, ext)
    }
}

pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = split_name(name);
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn file_name_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or("");
    let without_query = without_fragment.split('?').next().unwrap_or("");
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => without_query,
    };
    path.rsplit('/')
        .find(|seg| !seg.is_empty())
        .map(|seg| {
            urlencoding::decode(seg)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| seg.to_string())
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

fn original_or_fallback(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_NAME)
}
