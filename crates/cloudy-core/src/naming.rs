//! Backend-independent naming rules used before an object reaches a driver.

use std::future::Future;

use crate::error::{CloudyError, Result};
use crate::extensions::{ExtensionCategory, category_of};

/// Upper bound on renaming attempts before giving up.
pub const MAX_DISAMBIGUATION_ATTEMPTS: u32 = 1000;

/// Alphabet without look-alike characters (no 0/O, 1/l/I).
const SHORT_ID_ALPHABET: [char; 57] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'i', 'j', 'k', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const SHORT_ID_LEN: usize = 22;

/// Strip directory components: `"/a/b/hello.jpg"` -> `"hello.jpg"`.
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Split the base name into stem and raw (case-preserved) extension.
///
/// Leading dots belong to the stem, so `.bashrc` has no extension.
fn split_base(base: &str) -> (&str, &str) {
    let leading = base.len() - base.trim_start_matches('.').len();
    match base[leading..].rfind('.') {
        Some(idx) => (&base[..leading + idx], &base[leading + idx + 1..]),
        None => (base, ""),
    }
}

/// Lowercased substring after the last `.` of the base name, empty if none.
pub fn file_extension(path: &str) -> String {
    split_base(file_name(path)).1.to_lowercase()
}

/// The full path without its extension: `"a/b/c.txt"` -> `"a/b/c"`.
pub fn strip_extension(path: &str) -> &str {
    let base = file_name(path);
    let (stem, ext) = split_base(base);
    if ext.is_empty() && !base.ends_with('.') {
        return path;
    }
    let dir_len = path.len() - base.len();
    &path[..dir_len + stem.len()]
}

pub fn extension_category(path: &str) -> ExtensionCategory {
    category_of(&file_extension(path))
}

/// Lowercase, collapse every run of non-alphanumerics into one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().filter(|c| *c != '\'') {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Make a name safe to use as a single file on a local filesystem.
///
/// Separators turn into whitespace, whitespace runs into `_`, and anything
/// outside `[A-Za-z0-9_.-]` is dropped. Leading and trailing `.`/`_` go too.
pub fn secure_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(['.', '_']).to_string()
}

/// Resolve `(name, extension)` for an upload.
///
/// Without an explicit name the source's base name (minus extension) is
/// slugified. The source extension is appended whenever the name has none.
pub fn derive_upload_name(source_filename: &str, explicit_name: Option<&str>) -> (String, String) {
    let extension = file_extension(source_filename);
    let mut name = match explicit_name {
        Some(n) if !n.trim().is_empty() => n.trim().trim_end_matches('/').to_string(),
        _ => {
            let (stem, _) = split_base(file_name(source_filename));
            let slug = slugify(stem);
            if slug.is_empty() { "file".to_string() } else { slug }
        }
    };
    if file_extension(&name).trim().is_empty() && !extension.is_empty() {
        name = format!("{}.{}", name.trim_end_matches('.'), extension);
    }
    (name, extension)
}

/// Trim surrounding whitespace and `/`, so the name neither starts nor ends
/// with a separator.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_matches('/').trim().to_string()
}

/// Join `prefix` and `name` with exactly one `/`.
pub fn apply_prefix(name: &str, prefix: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// 22-character random token, collision probability negligible.
pub fn short_id() -> String {
    nanoid::nanoid!(SHORT_ID_LEN, &SHORT_ID_ALPHABET)
}

/// `{base}__{token}.{ext}`, where base is `name` without its extension.
pub fn with_token(name: &str, token: &str) -> String {
    let base = strip_extension(name);
    let extension = file_extension(name);
    if extension.is_empty() {
        format!("{base}__{token}")
    } else {
        format!("{base}__{token}.{extension}")
    }
}

/// Rename `name` until `exists` reports it free.
///
/// The check and the later write are not atomic: two concurrent callers can
/// both receive the same free name.
pub async fn disambiguate<F, Fut>(name: &str, mut exists: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let mut candidate = name.to_string();
    for attempt in 0..MAX_DISAMBIGUATION_ATTEMPTS {
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        candidate = with_token(name, &short_id());
        tracing::debug!(original = %name, %candidate, attempt, "name taken, retrying");
    }
    Err(CloudyError::NameExhausted {
        name: name.to_string(),
        attempts: MAX_DISAMBIGUATION_ATTEMPTS,
    })
}
