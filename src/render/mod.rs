//! Quote card rendering
//!
//! HTML templates ([`template`]) rasterized to PNG by a [`Rasterizer`],
//! normally the shared headless [`BrowserPool`]. Finished PNGs are cached by
//! the hash of their HTML.

pub mod design;
pub mod presets;
pub mod validate;
pub mod sanitize;
pub mod template;
pub mod browser;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::Result;
use crate::config::RenderConfig;
use crate::model::QuotePostWithData;

pub use browser::{BrowserPool, Rasterizer};
pub use template::CardContent;
pub use validate::QuoteInput;

/// PNG bytes plus a strong validator for HTTP caching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    /// Quoted blake3 hex of the source HTML
    pub etag: String,
}

/// Bounded FIFO of rendered PNGs keyed by HTML hash
struct PngCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Arc<Vec<u8>>>,
}

impl PngCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, png: Arc<Vec<u8>>) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, png);
    }
}

pub struct Renderer {
    rasterizer: Arc<dyn Rasterizer>,
    cache: Mutex<PngCache>,
}

impl Renderer {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, cache_entries: usize) -> Self {
        Self {
            rasterizer,
            cache: Mutex::new(PngCache::new(cache_entries)),
        }
    }

    /// Renderer backed by a headless browser per `config`
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(Arc::new(BrowserPool::new(config)), config.cache_entries)
    }

    pub fn is_healthy(&self) -> bool {
        self.rasterizer.is_healthy()
    }

    /// Rasterize a full-size card document
    pub async fn render_html(&self, html: &str) -> Result<RenderedImage> {
        let key = blake3::hash(html.as_bytes()).to_hex().to_string();
        let etag = format!("\"{}\"", key);

        let cached = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key);
        if let Some(png) = cached {
            tracing::debug!(etag = %etag, "render cache hit");
            return Ok(RenderedImage {
                png: png.as_ref().clone(),
                etag,
            });
        }

        let png = self
            .rasterizer
            .screenshot(html, design::IMAGE_WIDTH, design::IMAGE_HEIGHT)
            .await?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::new(png.clone()));
        Ok(RenderedImage { png, etag })
    }

    /// Render an already validated and sanitized quote card
    pub async fn render_quote(&self, input: &QuoteInput) -> Result<RenderedImage> {
        let content = CardContent {
            core_value: &input.core_value,
            supporting_value: &input.supporting_value,
            quote: &input.quote,
            author: input.author.as_deref(),
        };
        self.render_html(&template::quote_card_html(&content, &input.style))
            .await
    }

    /// Render a stored post with the classic card
    pub async fn render_post(&self, post: &QuotePostWithData) -> Result<RenderedImage> {
        let author = post.quote.author_name();
        let content = CardContent {
            core_value: &post.core_value.value,
            supporting_value: &post.supporting_value.value,
            quote: &post.quote.quote.text,
            author: (!author.is_empty()).then_some(author),
        };
        self.render_html(&template::quote_card_html(&content, presets::CLASSIC_STYLE))
            .await
    }

    pub async fn render_text(&self, text: &str) -> Result<RenderedImage> {
        self.render_html(&template::text_card_html(text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingRasterizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Rasterizer for CountingRasterizer {
        async fn screenshot(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!((width, height), (1080, 1350));
            Ok(format!("png:{}", html.len()).into_bytes())
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_cache_hits_skip_rasterizer() {
        let raster = Arc::new(CountingRasterizer::default());
        let renderer = Renderer::new(raster.clone(), 4);

        let a = renderer.render_text("Hello **world**").await.unwrap();
        let b = renderer.render_text("Hello **world**").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
        assert!(a.etag.starts_with('"') && a.etag.ends_with('"'));
        assert_eq!(a.etag.len(), 66);

        let c = renderer.render_text("Something else").await.unwrap();
        assert_ne!(a.etag, c.etag);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let raster = Arc::new(CountingRasterizer::default());
        let renderer = Renderer::new(raster.clone(), 1);

        renderer.render_text("one").await.unwrap();
        renderer.render_text("two").await.unwrap();
        renderer.render_text("one").await.unwrap();
        assert_eq!(raster.calls.load(Ordering::SeqCst), 3);

        let uncached = Renderer::new(raster.clone(), 0);
        uncached.render_text("one").await.unwrap();
        uncached.render_text("one").await.unwrap();
        assert_eq!(raster.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_render_quote_uses_style() {
        let raster = Arc::new(CountingRasterizer::default());
        let renderer = Renderer::new(raster, 8);

        let mut input = QuoteInput::new("Growth", "Curiosity", "Every day is a new beginning.", None);
        let classic = renderer.render_quote(&input).await.unwrap();
        input.style = "daily-anchor-2".into();
        let preset = renderer.render_quote(&input).await.unwrap();
        assert_ne!(classic.etag, preset.etag);
        assert!(renderer.is_healthy());
    }
}
