use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Known link shapes: watch, shorts, embed and the short-link host.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:youtube\.com/(?:shorts/|watch\?v=|embed/)|youtu\.be/)([\w-]{11})").expect("link pattern is valid")
});

/// Extract the 11-character video identifier from a pasted link.
///
/// Tries the known link shapes first, then falls back to reading the `v` query
/// parameter of any URL whose host contains `youtube.com`. Parse failures yield `None`.
/// Nothing is validated over the network.
pub fn extract_video_id(input: &str) -> Option<String> {
  let input = input.trim();
  if input.is_empty() {
    return None;
  }

  if let Some(id) = LINK_PATTERN.captures(input).and_then(|caps| caps.get(1)) {
    return Some(id.as_str().to_string());
  }

  let parsed = Url::parse(input).ok()?;
  if !parsed.host_str().is_some_and(|host| host.contains("youtube.com")) {
    return None;
  }
  parsed.query_pairs().find(|(key, _)| key == "v").map(|(_, value)| value.into_owned()).filter(|v| !v.is_empty())
}
