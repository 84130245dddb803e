use chrono::{DateTime, Datelike, Utc};
use rand::Rng;

pub const REFERENCE_PREFIX: &str = "ai-generated/references";

const SUFFIX_LEN: usize = 11;
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Storage key for an uploaded reference image.
///
/// Layout: `ai-generated/references/{YYYY}/{MM}/{DD}/{millis}-{suffix}.{ext}`.
/// The random suffix keeps keys distinct when two uploads land in the same
/// millisecond.
pub fn reference_key(now: DateTime<Utc>, extension: &str) -> String {
  format!(
    "{}/{:04}/{:02}/{:02}/{}-{}.{}",
    REFERENCE_PREFIX,
    now.year(),
    now.month(),
    now.day(),
    now.timestamp_millis(),
    random_suffix(),
    extension
  )
}

fn random_suffix() -> String {
  let mut rng = rand::thread_rng();
  (0..SUFFIX_LEN)
    .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
    .collect()
}

/// Extension for the stored object.
///
/// Uses the suffix after the last `.` of the original filename, then an
/// extension for the declared content type, then `bin`.
pub fn file_extension(filename: Option<&str>, content_type: Option<&str>) -> String {
  let from_name = filename
    .and_then(|name| name.rsplit_once('.'))
    .map(|(_, ext)| ext.trim())
    .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

  if let Some(ext) = from_name {
    return ext.to_ascii_lowercase();
  }

  content_type
    .and_then(extension_for_mime)
    .unwrap_or_else(|| "bin".to_string())
}

/// Prefers the extension spelled like the subtype (`image/jpeg` lists `jfif`
/// first), then the first registered one.
fn extension_for_mime(content_type: &str) -> Option<String> {
  let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
  let extensions = mime_guess::get_mime_extensions_str(&essence)?;
  let subtype = essence.split_once('/').map(|(_, sub)| sub).unwrap_or_default();

  extensions
    .iter()
    .find(|ext| **ext == subtype)
    .or_else(|| extensions.first())
    .map(|ext| ext.to_string())
}
