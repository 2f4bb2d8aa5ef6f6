use crate::error::{Result, ShortenerError};
use crate::policy::{is_reserved_alias, sanitize_url};
use crate::shortener::{ShortenOutcome, ShortenParams, Shortener, UrlStats, POPULAR_LIMIT};
use async_trait::async_trait;
use jiff::Timestamp;
use linkdrop_core::{ShortCode, StorageError, UrlRecord, UrlRepository};
use linkdrop_generator::Generator;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// How many generated codes to try before giving up on a request.
    #[builder(default = 100)]
    pub max_attempts: usize,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `UrlRepository` and a `Generator` to handle:
/// - URL sanitization and blocking
/// - Idempotent shortening of already known URLs
/// - Short code generation (auto-generated or custom) with collision retry
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    settings: ShortenerSettings,
    // Serializes lookup-then-insert so one URL cannot be stored twice.
    shorten_lock: Arc<Mutex<()>>,
}

impl<R: UrlRepository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_settings(repository, generator, ShortenerSettings::default())
    }

    pub fn with_settings(repository: R, generator: G, settings: ShortenerSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            settings,
            shorten_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn insert_with_alias(&self, alias: &str, template: UrlRecord) -> Result<UrlRecord> {
        if is_reserved_alias(alias) {
            return Err(ShortenerError::ReservedAlias(alias.to_string()));
        }
        let record = UrlRecord {
            short_code: ShortCode::new(alias)?,
            ..template
        };
        self.repository.insert(record.clone()).await?;
        Ok(record)
    }

    async fn insert_generated(&self, template: UrlRecord) -> Result<UrlRecord> {
        for attempt in 1..=self.settings.max_attempts {
            let record = UrlRecord {
                short_code: ShortCode::new_unchecked(self.generator.generate()),
                ..template.clone()
            };
            match self.repository.insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(StorageError::Conflict(code)) => {
                    debug!(code = %code, attempt, "generated short code already taken");
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(
            attempts = self.settings.max_attempts,
            "could not find a free short code"
        );
        Err(ShortenerError::CodeSpaceExhausted(self.settings.max_attempts))
    }
}

#[async_trait]
impl<R: UrlRepository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<ShortenOutcome> {
        let original_url = sanitize_url(&params.original_url)?;

        let _guard = self.shorten_lock.lock().await;

        if let Some(record) = self.repository.find_by_original_url(&original_url).await? {
            debug!(code = %record.short_code, "url already shortened");
            return Ok(ShortenOutcome {
                record,
                existing: true,
            });
        }

        // The code is filled in once one is accepted by the repository.
        let template = UrlRecord {
            user_agent: params.user_agent,
            ..UrlRecord::new(ShortCode::new_unchecked(""), original_url)
        };

        let alias = params
            .custom_alias
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        let record = match alias {
            Some(alias) => self.insert_with_alias(alias, template).await?,
            None => self.insert_generated(template).await?,
        };

        info!(code = %record.short_code, url = %record.original_url, "shortened url");
        Ok(ShortenOutcome {
            record,
            existing: false,
        })
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.repository.record_click(code, Timestamp::now()).await?)
    }

    async fn info(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.repository.get(code).await?)
    }

    async fn stats(&self) -> Result<UrlStats> {
        let mut records = self.list().await?;
        let total_urls = records.len();
        let total_clicks = records.iter().map(|r| r.clicks).sum();

        records.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        records.truncate(POPULAR_LIMIT);

        Ok(UrlStats {
            total_urls,
            total_clicks,
            popular: records,
        })
    }

    async fn list(&self) -> Result<Vec<UrlRecord>> {
        let mut records = self.repository.list().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let deleted = self.repository.delete(code).await?;
        if deleted {
            info!(code = %code, "deleted short url");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_generator::{ConstantGenerator, RandomGenerator, SeqGenerator};
    use linkdrop_storage::InMemoryRepository;

    fn test_service() -> ShortenerService<InMemoryRepository<UrlRecord>, SeqGenerator> {
        let repo = InMemoryRepository::new();
        let generator = SeqGenerator::with_prefix("wh", 4);
        ShortenerService::new(repo, generator)
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new(s).unwrap()
    }

    #[tokio::test]
    async fn shorten_with_auto_generated_code() {
        let service = test_service();

        let outcome = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();

        assert!(!outcome.existing);
        assert_eq!(outcome.record.short_code.as_str(), "wh0000");
        assert_eq!(outcome.record.original_url, "https://example.com/");
        assert_eq!(outcome.record.clicks, 0);
        assert!(outcome.record.last_accessed.is_none());
    }

    #[tokio::test]
    async fn random_codes_are_six_alphanumerics() {
        let service = ShortenerService::new(
            InMemoryRepository::<UrlRecord>::new(),
            RandomGenerator::new(6),
        );

        let outcome = service
            .shorten(ShortenParams::new("https://example.com/a"))
            .await
            .unwrap();

        let code = outcome.record.short_code.as_str();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn shorten_with_custom_alias() {
        let service = test_service();

        let outcome = service
            .shorten(ShortenParams::new("https://example.com").with_alias("my-alias"))
            .await
            .unwrap();

        assert_eq!(outcome.record.short_code.as_str(), "my-alias");
    }

    #[tokio::test]
    async fn blank_alias_falls_back_to_generated_code() {
        let service = test_service();

        let outcome = service
            .shorten(ShortenParams::new("https://example.com").with_alias("  "))
            .await
            .unwrap();

        assert_eq!(outcome.record.short_code.as_str(), "wh0000");
    }

    #[tokio::test]
    async fn shorten_with_duplicate_alias_fails() {
        let service = test_service();

        service
            .shorten(ShortenParams::new("https://example1.com").with_alias("my-alias"))
            .await
            .unwrap();
        let err = service
            .shorten(ShortenParams::new("https://example2.com").with_alias("my-alias"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::AliasConflict(_)));
    }

    #[tokio::test]
    async fn shorten_with_invalid_alias_fails() {
        let service = test_service();

        let err = service
            .shorten(ShortenParams::new("https://example.com").with_alias("a b"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::InvalidShortCode(_)));
    }

    #[tokio::test]
    async fn shorten_with_route_prefix_alias_fails() {
        let service = test_service();

        for alias in ["api", "uploads", "API"] {
            let err = service
                .shorten(ShortenParams::new("https://example.com/r").with_alias(alias))
                .await
                .unwrap_err();
            assert!(matches!(err, ShortenerError::ReservedAlias(_)), "{alias}");
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shortening_same_url_twice_is_idempotent() {
        let service = test_service();

        let first = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();
        let second = service
            .shorten(ShortenParams::new("example.com").with_alias("ignored"))
            .await
            .unwrap();

        assert!(second.existing);
        assert_eq!(first.record.short_code, second.record.short_code);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn shorten_rejects_blocked_and_invalid_urls() {
        let service = test_service();

        let err = service
            .shorten(ShortenParams::new("http://192.168.0.1/router"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::BlockedUrl(_)));

        let err = service
            .shorten(ShortenParams::new("ftp://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn collisions_are_retried() {
        let repo: InMemoryRepository<UrlRecord> = InMemoryRepository::new();
        repo.insert(UrlRecord::new(code("wh0000"), "https://taken.com/"))
            .await
            .unwrap();
        repo.insert(UrlRecord::new(code("wh0001"), "https://taken2.com/"))
            .await
            .unwrap();
        let service = ShortenerService::new(repo, SeqGenerator::with_prefix("wh", 4));

        let outcome = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();

        assert_eq!(outcome.record.short_code.as_str(), "wh0002");
    }

    #[tokio::test]
    async fn exhausted_code_space_is_reported() {
        let repo: InMemoryRepository<UrlRecord> = InMemoryRepository::new();
        repo.insert(UrlRecord::new(code("abc123"), "https://taken.com/"))
            .await
            .unwrap();
        let settings = ShortenerSettings::builder().max_attempts(5).build();
        let service: ShortenerService<_, ConstantGenerator> =
            ShortenerService::with_settings(repo, SeqGenerator::constant("abc123"), settings);

        let err = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::CodeSpaceExhausted(5)));
    }

    #[tokio::test]
    async fn resolve_counts_clicks_but_info_does_not() {
        let service = test_service();
        service
            .shorten(ShortenParams::new("https://example.com").with_alias("abc123"))
            .await
            .unwrap();

        service.resolve(&code("abc123")).await.unwrap();
        let record = service.resolve(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(record.clicks, 2);
        assert!(record.last_accessed.is_some());

        let info = service.info(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(info.clicks, 2);
    }

    #[tokio::test]
    async fn resolve_nonexistent_url() {
        let service = test_service();

        let record = service.resolve(&code("nonexistent")).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn stats_rank_by_clicks() {
        let service = test_service();
        for (alias, url, clicks) in [
            ("low", "https://a.com", 1),
            ("high", "https://b.com", 5),
            ("mid", "https://c.com", 3),
        ] {
            service
                .shorten(ShortenParams::new(url).with_alias(alias))
                .await
                .unwrap();
            for _ in 0..clicks {
                service.resolve(&code(alias)).await.unwrap();
            }
        }

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_urls, 3);
        assert_eq!(stats.total_clicks, 9);
        let order: Vec<_> = stats
            .popular
            .iter()
            .map(|r| r.short_code.as_str())
            .collect();
        assert_eq!(order, ["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn stats_keep_only_top_ten() {
        let service = test_service();
        for i in 0..12 {
            service
                .shorten(ShortenParams::new(format!("https://example.com/{i}")))
                .await
                .unwrap();
        }

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_urls, 12);
        assert_eq!(stats.popular.len(), POPULAR_LIMIT);
    }

    #[tokio::test]
    async fn delete_existing_and_missing() {
        let service = test_service();
        service
            .shorten(ShortenParams::new("https://example.com").with_alias("abc123"))
            .await
            .unwrap();

        assert!(service.delete(&code("abc123")).await.unwrap());
        assert!(!service.delete(&code("abc123")).await.unwrap());
        assert!(service.info(&code("abc123")).await.unwrap().is_none());
    }
}
