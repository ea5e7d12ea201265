//! Image references for menu items.
//!
//! Only builds a URL to the image-generation endpoint; nothing is fetched.

use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;
use tracing::{debug, warn};
use url::Url;

/// Builds image URLs, one generation per item name at a time.
pub struct ImageGenerator {
    base_url: String,
    in_flight: Mutex<HashSet<String>>,
}

/// Held while an item's reference is being generated.
pub struct InFlight<'a> {
    owner: &'a ImageGenerator,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.key);
    }
}

impl ImageGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `item_name`; `None` when a generation for it is already running.
    pub fn begin(&self, item_name: &str) -> Option<InFlight<'_>> {
        let key = item_name.trim().to_lowercase();
        if !self.lock().insert(key.clone()) {
            debug!(item = item_name, "Image generation already in flight");
            return None;
        }
        Some(InFlight { owner: self, key })
    }

    /// Image URL for `item_name` with a random seed, or `None` if the item is
    /// busy or the URL does not parse.
    pub fn generate(&self, item_name: &str) -> Option<String> {
        let _guard = self.begin(item_name)?;
        let seed = rand::thread_rng().gen_range(1..1_000_000u32);
        self.build_url(item_name, seed)
    }

    fn build_url(&self, item_name: &str, seed: u32) -> Option<String> {
        let prompt = format!(
            "foto profissional de comida, {}, hamburgueria artesanal, fundo escuro, iluminação de estúdio",
            item_name.trim()
        );
        let raw = format!(
            "{}/{}?width=512&height=512&seed={seed}&nologo=true",
            self.base_url,
            urlencoding::encode(&prompt)
        );
        match Url::parse(&raw) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!(item = item_name, error = %e, "Malformed image URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://image.pollinations.ai/prompt";

    #[test]
    fn builds_parseable_url_with_prompt_and_seed() {
        let generator = ImageGenerator::new(BASE);
        let url = generator.generate("Classic Burger").unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("image.pollinations.ai"));
        assert!(parsed.path().contains("Classic%20Burger"));
        assert!(parsed.query_pairs().any(|(k, _)| k == "seed"));
    }

    #[test]
    fn seed_varies_between_calls() {
        let generator = ImageGenerator::new(BASE);
        let urls: HashSet<String> = (0..5).filter_map(|_| generator.generate("Brownie")).collect();
        assert!(urls.len() > 1);
    }

    #[test]
    fn malformed_base_yields_none() {
        let generator = ImageGenerator::new("not a url");
        assert!(generator.generate("Brownie").is_none());
    }

    #[test]
    fn same_item_is_guarded_other_items_are_not() {
        let generator = ImageGenerator::new(BASE);
        let guard = generator.begin("Milkshake").unwrap();
        assert!(generator.generate("milkshake").is_none());
        assert!(generator.generate("Brownie").is_some());
        drop(guard);
        assert!(generator.generate("Milkshake").is_some());
    }
}
