use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    error::{AppError, AppResult},
    index::{Neighbor, SimilarityIndex},
    models::{Metadata, Recommendation, SelectedMovie},
    services::providers::MetadataProvider,
};

/// Tuning for the metadata join
#[derive(Debug, Clone)]
pub struct EnrichmentOptions {
    /// Upper bound on a single provider call
    pub timeout: Duration,
    /// Provider calls allowed in flight at once, shared by all requests
    pub concurrency: usize,
    /// Prefix for poster paths returned by the provider
    pub image_base_url: String,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            concurrency: 8,
            image_base_url: String::new(),
        }
    }
}

/// Turns a title into a ranked, filtered and optionally enriched list of similar movies
pub struct RecommendationService {
    index: Arc<SimilarityIndex>,
    provider: Arc<dyn MetadataProvider>,
    permits: Arc<Semaphore>,
    options: EnrichmentOptions,
    max_results: usize,
}

impl RecommendationService {
    pub fn new(
        index: Arc<SimilarityIndex>,
        provider: Arc<dyn MetadataProvider>,
        options: EnrichmentOptions,
        max_results: usize,
    ) -> Self {
        Self {
            index,
            provider,
            permits: Arc::new(Semaphore::new(options.concurrency.max(1))),
            options,
            max_results,
        }
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Recommends up to `k` movies similar to `title`
    ///
    /// The top `k` neighbors are selected first and only then filtered by
    /// `min_score`, so a high threshold shortens the list rather than pulling
    /// in lower-ranked movies. When `enrich` is set each surviving entry gets
    /// one metadata lookup; lookup failures leave that entry's metadata empty.
    pub async fn recommend(
        &self,
        title: &str,
        k: usize,
        min_score: f32,
        enrich: bool,
    ) -> AppResult<Vec<Recommendation>> {
        let (_, neighbors) = self.select(title, k, min_score)?;

        let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        let metadata = if enrich {
            self.enrich(&indices).await
        } else {
            vec![None; indices.len()]
        };

        let results = self.assemble(neighbors, metadata);
        log_results(title, k, min_score, enrich, results.len());

        Ok(results)
    }

    /// Same as [`recommend`](Self::recommend), plus the queried movie itself
    ///
    /// The queried movie's metadata is fetched in the same fan-out as the
    /// neighbors' when `enrich` is set.
    pub async fn recommend_with_selected(
        &self,
        title: &str,
        k: usize,
        min_score: f32,
        enrich: bool,
    ) -> AppResult<(SelectedMovie, Vec<Recommendation>)> {
        let (query, neighbors) = self.select(title, k, min_score)?;

        let mut indices = Vec::with_capacity(neighbors.len() + 1);
        indices.push(query);
        indices.extend(neighbors.iter().map(|n| n.index));

        let mut metadata = if enrich {
            self.enrich(&indices).await
        } else {
            vec![None; indices.len()]
        };
        let neighbor_metadata = metadata.split_off(1);
        let selected_metadata = metadata.pop().flatten();

        let movie = self
            .index
            .movie(query)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("resolved index {} has no movie", query)))?;
        let selected = SelectedMovie {
            movie,
            poster_url: self.poster_url(selected_metadata.as_ref()),
            metadata: selected_metadata,
        };

        let results = self.assemble(neighbors, neighbor_metadata);
        log_results(title, k, min_score, enrich, results.len());

        Ok((selected, results))
    }

    /// Resolve, select top-K, then threshold. No I/O.
    pub fn rank(&self, title: &str, k: usize, min_score: f32) -> AppResult<Vec<Neighbor>> {
        self.select(title, k, min_score).map(|(_, neighbors)| neighbors)
    }

    fn select(
        &self,
        title: &str,
        k: usize,
        min_score: f32,
    ) -> AppResult<(usize, Vec<Neighbor>)> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "number of recommendations must be at least 1".to_string(),
            ));
        }
        if k > self.max_results {
            return Err(AppError::InvalidInput(format!(
                "number of recommendations must be at most {}",
                self.max_results
            )));
        }
        if !min_score.is_finite() {
            return Err(AppError::InvalidInput(
                "minimum score must be a finite number".to_string(),
            ));
        }

        let query = self
            .index
            .catalog()
            .resolve(title)
            .ok_or_else(|| AppError::ItemNotFound(title.to_string()))?;

        let mut neighbors = self.index.top_k(query, k);
        neighbors.retain(|neighbor| neighbor.score >= min_score);

        Ok((query, neighbors))
    }

    fn assemble(
        &self,
        neighbors: Vec<Neighbor>,
        metadata: Vec<Option<Metadata>>,
    ) -> Vec<Recommendation> {
        neighbors
            .into_iter()
            .zip(metadata)
            .filter_map(|(neighbor, metadata)| {
                let movie = self.index.movie(neighbor.index)?.clone();
                Some(Recommendation {
                    movie,
                    similarity: neighbor.score,
                    poster_url: self.poster_url(metadata.as_ref()),
                    metadata,
                })
            })
            .collect()
    }

    fn poster_url(&self, metadata: Option<&Metadata>) -> Option<String> {
        metadata
            .and_then(|m| m.poster_path.as_deref())
            .map(|path| format!("{}{}", self.options.image_base_url, path))
    }

    /// Fetches metadata for the given catalog positions concurrently, preserving order
    ///
    /// Dropping the returned future aborts all outstanding lookups.
    async fn enrich(&self, indices: &[usize]) -> Vec<Option<Metadata>> {
        let mut metadata = vec![None; indices.len()];
        let mut tasks = JoinSet::new();

        for (position, &index) in indices.iter().enumerate() {
            let Some(movie) = self.index.movie(index) else {
                continue;
            };
            let title = movie.title.clone();
            let provider = Arc::clone(&self.provider);
            let permits = Arc::clone(&self.permits);
            let timeout = self.options.timeout;

            tasks.spawn(async move {
                let metadata = fetch_one(provider, permits, &title, timeout).await;
                (position, metadata)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, fetched)) => metadata[position] = fetched,
                Err(e) => tracing::warn!(error = %e, "Metadata task failed"),
            }
        }

        let enriched = metadata.iter().filter(|m| m.is_some()).count();
        if enriched < indices.len() {
            tracing::debug!(
                enriched,
                missing = indices.len() - enriched,
                "Partial metadata enrichment"
            );
        }

        metadata
    }
}

fn log_results(title: &str, k: usize, min_score: f32, enrich: bool, results: usize) {
    tracing::info!(
        title = %title,
        k,
        min_score,
        enrich,
        results,
        "Recommendations computed"
    );
}

/// One best-effort lookup; every failure mode collapses to `None`
async fn fetch_one(
    provider: Arc<dyn MetadataProvider>,
    permits: Arc<Semaphore>,
    title: &str,
    timeout: Duration,
) -> Option<Metadata> {
    let _permit = permits.acquire_owned().await.ok()?;

    match tokio::time::timeout(timeout, provider.fetch(title)).await {
        Ok(Ok(Some(metadata))) => Some(metadata),
        Ok(Ok(None)) => {
            tracing::debug!(title = %title, provider = provider.name(), "No metadata match");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(
                title = %title,
                provider = provider.name(),
                error = %e,
                "Metadata lookup failed"
            );
            None
        }
        Err(_) => {
            tracing::warn!(
                title = %title,
                provider = provider.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Metadata lookup timed out"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::Catalog,
        models::{Movie, MovieId},
        services::providers::{CircuitBreakerProvider, DisabledProvider, MockMetadataProvider},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tokio_test::assert_ok;

    fn index_from(titles: &[&str], matrix: Vec<Vec<f32>>) -> Arc<SimilarityIndex> {
        let movies = titles
            .iter()
            .enumerate()
            .map(|(i, title)| Movie {
                id: MovieId::Numeric(i as u64 + 1),
                title: title.to_string(),
                genres: vec![],
            })
            .collect();
        Arc::new(SimilarityIndex::new(Catalog::new(movies).unwrap(), matrix).unwrap())
    }

    /// A, B, C, D with A's row = [1.0, 0.9, 0.2, 0.05]
    fn abcd() -> Arc<SimilarityIndex> {
        index_from(
            &["A", "B", "C", "D"],
            vec![
                vec![1.0, 0.9, 0.2, 0.05],
                vec![0.9, 1.0, 0.3, 0.1],
                vec![0.2, 0.3, 1.0, 0.4],
                vec![0.05, 0.1, 0.4, 1.0],
            ],
        )
    }

    fn metadata(overview: &str, poster: Option<&str>) -> Metadata {
        Metadata {
            overview: Some(overview.to_string()),
            release_date: None,
            average_rating: Some(7.5),
            vote_count: Some(100),
            popularity: Some(10.0),
            poster_path: poster.map(str::to_string),
            fetched_at: Utc::now(),
        }
    }

    fn service(
        index: Arc<SimilarityIndex>,
        provider: Arc<dyn MetadataProvider>,
    ) -> RecommendationService {
        service_with_timeout(index, provider, Duration::from_millis(200))
    }

    fn service_with_timeout(
        index: Arc<SimilarityIndex>,
        provider: Arc<dyn MetadataProvider>,
        timeout: Duration,
    ) -> RecommendationService {
        RecommendationService::new(
            index,
            provider,
            EnrichmentOptions {
                timeout,
                concurrency: 4,
                image_base_url: "https://image.tmdb.org/t/p/w500".to_string(),
            },
            10,
        )
    }

    fn titles_and_scores(results: &[Recommendation]) -> Vec<(&str, f32)> {
        results
            .iter()
            .map(|r| (r.movie.title.as_str(), r.similarity))
            .collect()
    }

    #[tokio::test]
    async fn test_threshold_applied_after_top_k() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let results = service.recommend("A", 3, 0.1, false).await.unwrap();

        assert_eq!(titles_and_scores(&results), vec![("B", 0.9), ("C", 0.2)]);
        assert!(results.iter().all(|r| r.metadata.is_none()));
    }

    #[tokio::test]
    async fn test_k_one() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let results = service.recommend("A", 1, 0.0, false).await.unwrap();

        assert_eq!(titles_and_scores(&results), vec![("B", 0.9)]);
    }

    #[tokio::test]
    async fn test_threshold_does_not_backfill_from_below_k() {
        // With k=1 only B is selected; C must not replace it when B is filtered out
        let index = index_from(
            &["A", "B", "C"],
            vec![vec![1.0, 0.3, 0.2], vec![0.0; 3], vec![0.0; 3]],
        );
        let service = service(index, Arc::new(DisabledProvider));

        let results = service.recommend("A", 1, 0.25, false).await.unwrap();
        assert_eq!(titles_and_scores(&results), vec![("B", 0.3)]);

        let results = service.recommend("A", 1, 0.5, false).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_threshold_returns_min_k_n_minus_one() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        for k in 1..=6 {
            let results = assert_ok!(service.recommend("C", k, 0.0, false).await);
            assert_eq!(results.len(), k.min(3));
        }
    }

    #[tokio::test]
    async fn test_threshold_above_top_score_is_empty_not_error() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let results = service.recommend("A", 3, 0.95, false).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_title_is_item_not_found() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let result = service.recommend("Z", 5, 0.0, false).await;
        assert!(matches!(result, Err(AppError::ItemNotFound(title)) if title == "Z"));
    }

    #[tokio::test]
    async fn test_invalid_parameters_rejected() {
        let service = service(abcd(), Arc::new(DisabledProvider));

        assert!(matches!(
            service.recommend("A", 0, 0.0, false).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.recommend("A", 11, 0.0, false).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.recommend("A", 3, f32::NAN, false).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_title_uses_first_occurrence() {
        let index = index_from(
            &["Heat", "Ronin", "Heat"],
            vec![vec![1.0, 0.7, 0.2], vec![0.7, 1.0, 0.1], vec![0.9, 0.1, 1.0]],
        );
        let service = service(index, Arc::new(DisabledProvider));

        let results = service.recommend("Heat", 2, 0.0, false).await.unwrap();
        assert_eq!(titles_and_scores(&results), vec![("Ronin", 0.7), ("Heat", 0.2)]);
        assert_eq!(results[1].movie.id, MovieId::Numeric(3));
    }

    #[tokio::test]
    async fn test_enrichment_attaches_metadata_and_poster_url() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch()
            .with(eq("B"))
            .times(1)
            .returning(|_| Ok(Some(metadata("B overview", Some("/b.jpg")))));
        mock.expect_fetch()
            .with(eq("C"))
            .times(1)
            .returning(|_| Ok(Some(metadata("C overview", None))));
        mock.expect_name().return_const("mock");

        let service = service(abcd(), Arc::new(mock));
        let results = service.recommend("A", 3, 0.1, true).await.unwrap();

        assert_eq!(titles_and_scores(&results), vec![("B", 0.9), ("C", 0.2)]);
        assert_eq!(
            results[0].metadata.as_ref().unwrap().overview.as_deref(),
            Some("B overview")
        );
        assert_eq!(
            results[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/b.jpg")
        );
        assert!(results[1].metadata.is_some());
        assert!(results[1].poster_url.is_none());
    }

    #[tokio::test]
    async fn test_enrichment_failure_only_empties_that_entry() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch()
            .with(eq("B"))
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));
        mock.expect_fetch()
            .with(eq("C"))
            .returning(|_| Ok(Some(metadata("C overview", Some("/c.jpg")))));
        mock.expect_fetch().with(eq("D")).returning(|_| Ok(None));
        mock.expect_name().return_const("mock");

        let service = service(abcd(), Arc::new(mock));
        let results = service.recommend("A", 3, 0.0, true).await.unwrap();

        assert_eq!(
            titles_and_scores(&results),
            vec![("B", 0.9), ("C", 0.2), ("D", 0.05)]
        );
        assert!(results[0].metadata.is_none());
        assert!(results[1].metadata.is_some());
        assert!(results[2].metadata.is_none());
    }

    #[tokio::test]
    async fn test_disabled_provider_degrades_to_no_metadata() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let results = service.recommend("A", 2, 0.0, true).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata.is_none() && r.poster_url.is_none()));
    }

    /// Provider that never answers for one title
    struct Stalling;

    #[async_trait::async_trait]
    impl MetadataProvider for Stalling {
        async fn fetch(&self, title: &str) -> AppResult<Option<Metadata>> {
            if title == "B" {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(Some(metadata(title, None)))
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out_without_blocking_others() {
        let service = service(abcd(), Arc::new(Stalling));
        let results = service.recommend("A", 3, 0.0, true).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].metadata.is_none());
        assert_eq!(
            results[1].metadata.as_ref().unwrap().overview.as_deref(),
            Some("C")
        );
        assert!(results[2].metadata.is_some());
    }

    #[tokio::test]
    async fn test_enrich_false_never_calls_provider() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch().never();
        mock.expect_name().return_const("mock");

        let service = service(abcd(), Arc::new(mock));
        let results = service.recommend("A", 3, 0.0, false).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    /// Provider that hangs and records how its calls ended
    #[derive(Default)]
    struct Tracked {
        started: AtomicUsize,
        dropped: Arc<AtomicUsize>,
        completed: AtomicUsize,
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl MetadataProvider for Tracked {
        async fn fetch(&self, _title: &str) -> AppResult<Option<Metadata>> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = DropCounter(Arc::clone(&self.dropped));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        fn name(&self) -> &'static str {
            "tracked"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_trips_circuit_breaker() {
        let upstream = Arc::new(Tracked::default());
        let breaker = Arc::new(CircuitBreakerProvider::new(
            upstream.clone(),
            3,
            Duration::from_secs(30),
            Duration::from_millis(100),
        ));
        let service = service(abcd(), breaker.clone());

        for _ in 0..5 {
            let results = service.recommend("A", 3, 0.0, true).await.unwrap();
            assert_eq!(results.len(), 3);
            assert!(results.iter().all(|r| r.metadata.is_none()));
        }

        assert!(breaker.is_open());
        assert_eq!(upstream.started.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_request_aborts_in_flight_lookups() {
        let upstream = Arc::new(Tracked::default());
        let service = service_with_timeout(abcd(), upstream.clone(), Duration::from_secs(60));

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            service.recommend("A", 3, 0.0, true),
        )
        .await;
        assert!(outcome.is_err());

        // Let the runtime drop the aborted tasks; still far below the 60s lookup timeout
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(upstream.started.load(Ordering::SeqCst), 3);
        assert_eq!(upstream.dropped.load(Ordering::SeqCst), 3);
        assert_eq!(upstream.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_selected_movie_is_enriched_with_neighbors() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch()
            .with(eq("A"))
            .times(1)
            .returning(|_| Ok(Some(metadata("A overview", Some("/a.jpg")))));
        mock.expect_fetch()
            .with(eq("B"))
            .times(1)
            .returning(|_| Ok(Some(metadata("B overview", None))));
        mock.expect_fetch().with(eq("C")).times(1).returning(|_| Ok(None));
        mock.expect_name().return_const("mock");

        let service = service(abcd(), Arc::new(mock));
        let (selected, results) = service
            .recommend_with_selected("A", 2, 0.0, true)
            .await
            .unwrap();

        assert_eq!(selected.movie.title, "A");
        assert_eq!(
            selected.metadata.as_ref().unwrap().overview.as_deref(),
            Some("A overview")
        );
        assert_eq!(
            selected.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/a.jpg")
        );
        assert_eq!(titles_and_scores(&results), vec![("B", 0.9), ("C", 0.2)]);
        assert!(results[0].metadata.is_some());
        assert!(results[1].metadata.is_none());
    }

    #[tokio::test]
    async fn test_selected_movie_without_enrichment() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch().never();
        mock.expect_name().return_const("mock");

        let service = service(abcd(), Arc::new(mock));
        let (selected, results) = service
            .recommend_with_selected("A", 3, 0.1, false)
            .await
            .unwrap();

        assert_eq!(selected.movie.title, "A");
        assert!(selected.metadata.is_none());
        assert!(selected.poster_url.is_none());
        assert_eq!(titles_and_scores(&results), vec![("B", 0.9), ("C", 0.2)]);
    }

    #[tokio::test]
    async fn test_selected_movie_unknown_title() {
        let service = service(abcd(), Arc::new(DisabledProvider));
        let result = service.recommend_with_selected("Z", 3, 0.0, true).await;
        assert!(matches!(result, Err(AppError::ItemNotFound(_))));
    }
}
