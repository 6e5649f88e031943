use rand::Rng;
use std::error::Error;
use std::ops::Range;
use url::Url;

pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://image.pollinations.ai/prompt/";

/// Seeds are drawn per URL; identical descriptions must not map to one image.
const SEED_RANGE: Range<u32> = 0..100_000;

/// Reduces a free-text description to `[A-Za-z0-9]` words joined by underscores.
/// Returns `None` when nothing usable is left.
pub fn sanitize_description(raw: &str) -> Option<String> {
    let kept: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    let token = kept.split_whitespace().collect::<Vec<_>>().join("_");
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    endpoint: Url,
}

impl ImageUrlBuilder {
    pub fn new(endpoint: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let endpoint = Url::parse(endpoint).map_err(|e|
            format!("Invalid image endpoint '{}': {}", endpoint, e)
        )?;
        if endpoint.cannot_be_a_base() {
            return Err(format!("Image endpoint '{}' cannot take a path segment", endpoint).into());
        }
        Ok(Self { endpoint })
    }

    /// Builds a generation URL for the description, or `None` if it sanitizes to nothing.
    pub fn build(&self, description: &str) -> Option<String> {
        let token = sanitize_description(description)?;
        let seed = rand::rng().random_range(SEED_RANGE);
        self.url_for(&token, seed)
    }

    fn url_for(&self, token: &str, seed: u32) -> Option<String> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().ok()?;
            segments.pop_if_empty().push(token);
        }
        url.query_pairs_mut()
            .append_pair("seed", &seed.to_string())
            .append_pair("nologo", "true");
        Some(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pollinations() -> ImageUrlBuilder {
        ImageUrlBuilder::new(DEFAULT_IMAGE_ENDPOINT).unwrap()
    }

    #[test]
    fn sanitizing_keeps_alphanumerics_and_underscores_words() {
        assert_eq!(sanitize_description("a red balloon").as_deref(), Some("a_red_balloon"));
        assert_eq!(
            sanitize_description("  A  giant,\n sparkly MOON!!  in 3D ").as_deref(),
            Some("A_giant_sparkly_MOON_in_3D")
        );
        assert_eq!(sanitize_description("dragón & café").as_deref(), Some("dragn_caf"));
    }

    #[test]
    fn punctuation_only_descriptions_yield_nothing() {
        assert_eq!(sanitize_description("!!!"), None);
        assert_eq!(sanitize_description("   "), None);
        assert_eq!(pollinations().build("?!... 🎨"), None);
    }

    #[test]
    fn url_embeds_token_seed_and_no_logo_flag() {
        let builder = pollinations();
        assert_eq!(
            builder.url_for("a_red_balloon", 42).as_deref(),
            Some("https://image.pollinations.ai/prompt/a_red_balloon?seed=42&nologo=true")
        );
    }

    #[test]
    fn endpoints_without_trailing_slash_still_get_one_segment() {
        let builder = ImageUrlBuilder::new("http://localhost:8080/img").unwrap();
        assert_eq!(
            builder.url_for("cat", 7).as_deref(),
            Some("http://localhost:8080/img/cat?seed=7&nologo=true")
        );
    }

    #[test]
    fn repeated_descriptions_get_different_seeds() {
        let builder = pollinations();
        let urls: Vec<String> = (0..6).filter_map(|_| builder.build("a red balloon")).collect();
        assert_eq!(urls.len(), 6);
        assert!(urls.iter().all(|u| u.contains("/prompt/a_red_balloon?seed=")));
        assert!(urls.iter().any(|u| u != &urls[0]));
    }

    #[test]
    fn rejects_unusable_endpoints() {
        assert!(ImageUrlBuilder::new("not a url").is_err());
        assert!(ImageUrlBuilder::new("mailto:art@example.com").is_err());
    }
}
