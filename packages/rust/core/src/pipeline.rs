//! End-to-end extraction pipeline: text → sentences → candidates → resolved
//! places for a whole work.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use chimei_catalog::{Catalog, CatalogHandle};
use chimei_shared::{
    AppConfig, ChimeiError, ExtractionOptions, ResolvedPlace, Result, RunOverrides,
    SpanCandidate, StrategyKind, WorkExtraction, WorkText, expand_home, resolve_api_key,
};
use chimei_strategies::{
    EntityTagger, ExtractionStrategy, GazetteerTagger, Locality, SentenceInput, StrategyRegistry,
};
use chimei_text::{char_len, context_window, split_sentences, strip_markup};

use crate::ai::AiStrategy;
use crate::dedup::dedup_work;
use crate::resolver::resolve;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once the work has been segmented.
    fn work_started(&self, work_id: &str, sentences: usize);
    /// Called each time a sentence's candidates have been resolved.
    fn sentence_resolved(&self, work_id: &str, done: usize, total: usize);
    /// Called when the work's output is complete.
    fn work_finished(&self, extraction: &WorkExtraction);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn work_started(&self, _work_id: &str, _sentences: usize) {}
    fn sentence_resolved(&self, _work_id: &str, _done: usize, _total: usize) {}
    fn work_finished(&self, _extraction: &WorkExtraction) {}
}

/// Resolved candidates of one sentence, as returned by its task.
struct SentenceOutcome {
    index: usize,
    proposed: usize,
    resolved: Vec<SpanCandidate>,
}

/// Extraction pipeline. Cheap to share behind an `Arc`; every call works
/// on its own catalog snapshot and holds no state between works.
pub struct Pipeline {
    catalog: CatalogHandle,
    registry: Arc<StrategyRegistry>,
    options: ExtractionOptions,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(catalog: Catalog, registry: StrategyRegistry, options: ExtractionOptions) -> Self {
        let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
        Self {
            catalog: CatalogHandle::new(catalog),
            registry: Arc::new(registry),
            options,
            permits,
        }
    }

    /// Assemble the catalog, optional capabilities, and registry from
    /// configuration.
    ///
    /// A pattern that fails to compile, an unreadable gazetteer, or an
    /// invalid completion-service URL aborts here, before any extraction.
    pub fn from_config(config: &AppConfig, overrides: &RunOverrides) -> Result<Self> {
        let options = ExtractionOptions::from(config).with_overrides(overrides);
        let catalog = Catalog::with_config(&config.catalog)?;

        let tagger: Option<Arc<dyn EntityTagger>> = match &config.tagger.gazetteer_path {
            Some(path) if options.is_enabled(StrategyKind::Tagger) => {
                Some(Arc::new(GazetteerTagger::from_path(&expand_home(path))?))
            }
            _ => None,
        };

        let ai: Option<Box<dyn ExtractionStrategy>> = if options.is_enabled(StrategyKind::Ai) {
            let key = overrides
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .or_else(|| resolve_api_key(&config.ai));
            match key {
                Some(key) => Some(Box::new(AiStrategy::new(&config.ai, key)?)),
                None => None,
            }
        } else {
            None
        };

        let registry = StrategyRegistry::builder()
            .enable(&options.strategies)
            .tagger(tagger)
            .ai(ai)
            .timeout(options.strategy_timeout)
            .build();

        info!(
            strategies = ?registry.names(),
            remote = registry.has_remote(),
            patterns = catalog.len(),
            concurrency = options.concurrency,
            "pipeline ready"
        );
        Ok(Self::new(catalog, registry, options))
    }

    /// Live catalog handle; [`CatalogHandle::reload`] affects works started
    /// afterwards only.
    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extract the places of one work.
    ///
    /// 1. Clean markup (when enabled)
    /// 2. Short input ⇒ empty result
    /// 3. Segment into sentences
    /// 4. Propose and resolve each sentence on a bounded task set; only
    ///    local strategies count against the CPU pool
    /// 5. Attach context windows
    /// 6. Deduplicate across the work
    ///
    /// Dropping the returned future aborts the outstanding sentence tasks.
    #[instrument(skip_all, fields(work_id = %work_id))]
    pub async fn extract_work(
        &self,
        work_id: &str,
        text: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<WorkExtraction> {
        let start = Instant::now();

        let cleaned = if self.options.strip_markup {
            strip_markup(text)
        } else {
            text.to_string()
        };
        if char_len(cleaned.trim()) < self.options.min_text_chars {
            debug!(chars = char_len(cleaned.trim()), "input too short, skipping");
            let extraction = WorkExtraction::empty(work_id);
            progress.work_finished(&extraction);
            return Ok(extraction);
        }

        let sentences = Arc::new(split_sentences(&cleaned));
        let total = sentences.len();
        progress.work_started(work_id, total);

        let catalog = self.catalog.current();
        let mut tasks = JoinSet::new();
        for index in 0..total {
            let registry = Arc::clone(&self.registry);
            let catalog = Arc::clone(&catalog);
            let sentences = Arc::clone(&sentences);
            let permits = Arc::clone(&self.permits);

            tasks.spawn(async move {
                let input = SentenceInput {
                    index,
                    text: &sentences[index],
                    previous: index.checked_sub(1).map(|i| sentences[i].as_str()),
                    next: sentences.get(index + 1).map(String::as_str),
                    catalog: &catalog,
                };
                let local = async {
                    let _permit = permits
                        .acquire()
                        .await
                        .map_err(|e| ChimeiError::strategy("pipeline", e.to_string()))?;
                    Ok::<_, ChimeiError>(registry.propose_where(&input, Locality::Local).await)
                };
                // Remote strategies are paced by their own limiters.
                let remote = registry.propose_where(&input, Locality::Remote);
                let (local, remote) = tokio::join!(local, remote);

                let candidates = local?.merge(remote).into_candidates();
                debug!(sentence = index, candidates = candidates.len(), "candidates proposed");
                Ok::<_, ChimeiError>(SentenceOutcome {
                    index,
                    proposed: candidates.len(),
                    resolved: resolve(candidates),
                })
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcomes.push(outcome?);
                    progress.sentence_resolved(work_id, outcomes.len(), total);
                }
                // A panicking sentence task means a resolver defect; surface it.
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(ChimeiError::strategy(
                        "pipeline",
                        format!("sentence task cancelled: {e}"),
                    ));
                }
            }
        }
        outcomes.sort_by_key(|o| o.index);

        let candidate_count = outcomes.iter().map(|o| o.proposed).sum();
        let cap = self.options.context_chars;
        let promoted: Vec<ResolvedPlace> = outcomes
            .into_iter()
            .flat_map(|o| o.resolved)
            .map(|candidate| {
                let window = context_window(
                    &sentences,
                    candidate.sentence_index,
                    candidate.start,
                    candidate.end,
                    cap,
                );
                ResolvedPlace::promote(candidate, window.before, window.sentence, window.after)
            })
            .collect();

        let mut places = dedup_work(promoted);
        places.sort_by_key(|p| (p.sentence_index, p.start));

        let mut extraction = WorkExtraction::empty(work_id);
        extraction.places = places;
        extraction.sentence_count = total;
        extraction.candidate_count = candidate_count;

        info!(
            sentences = total,
            candidates = candidate_count,
            places = extraction.places.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "work extracted"
        );
        progress.work_finished(&extraction);
        Ok(extraction)
    }

    /// Extract several works concurrently. Results keep the input order and
    /// a failed work does not affect the others.
    pub async fn extract_batch(
        &self,
        works: Vec<WorkText>,
        progress: &dyn ProgressReporter,
    ) -> Vec<Result<WorkExtraction>> {
        info!(works = works.len(), "starting batch");
        let runs = works
            .iter()
            .map(|work| self.extract_work(&work.work_id, &work.text, progress));
        join_all(runs).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use chimei_shared::{Category, SpanCandidate};

    use super::*;
    use crate::resolver::is_overlap_free;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            Catalog::builtin().expect("builtin"),
            StrategyRegistry::builder().build(),
            ExtractionOptions::default(),
        )
    }

    fn names(extraction: &WorkExtraction) -> Vec<&str> {
        extraction
            .places
            .iter()
            .map(|p| p.place_name.as_str())
            .collect()
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl ExtractionStrategy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn extract(&self, _input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
            Err(ChimeiError::strategy("failing", "service unavailable"))
        }
    }

    #[derive(Debug)]
    struct Stalled;

    #[async_trait]
    impl ExtractionStrategy for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn extract(&self, _input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// Network-bound stand-in: slow, proposes nothing.
    #[derive(Debug)]
    struct SlowRemote(Duration);

    #[async_trait]
    impl ExtractionStrategy for SlowRemote {
        fn name(&self) -> &str {
            "slow-remote"
        }

        fn locality(&self) -> Locality {
            Locality::Remote
        }

        async fn extract(&self, _input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
            tokio::time::sleep(self.0).await;
            Ok(Vec::new())
        }
    }

    /// Records when each local extraction ran.
    #[derive(Debug)]
    struct Stamping(Arc<std::sync::Mutex<Vec<Instant>>>);

    #[async_trait]
    impl ExtractionStrategy for Stamping {
        fn name(&self) -> &str {
            "stamping"
        }

        async fn extract(&self, _input: &SentenceInput<'_>) -> Result<Vec<SpanCandidate>> {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(Instant::now());
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        resolved: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ProgressReporter for Counting {
        fn work_started(&self, _work_id: &str, _sentences: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn sentence_resolved(&self, _work_id: &str, _done: usize, _total: usize) {
            self.resolved.fetch_add(1, Ordering::SeqCst);
        }
        fn work_finished(&self, _extraction: &WorkExtraction) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn complete_place_wins_over_fragments() {
        let extraction = pipeline()
            .extract_work("w1", "戦争が激しくなり、一家は千葉県船橋市に疎開している。", &SilentProgress)
            .await
            .expect("extract");

        let names = names(&extraction);
        assert!(names.contains(&"千葉県船橋市"));
        for fragment in ["千葉", "千葉県", "船橋", "船橋市"] {
            assert!(!names.contains(&fragment), "fragment {fragment} survived");
        }
        let place = extraction
            .places
            .iter()
            .find(|p| p.place_name == "千葉県船橋市")
            .expect("complete place");
        assert_eq!(place.category, Category::CompletePlace);
        assert_eq!(place.before_text, "戦争が激しくなり、一家は");
        assert_eq!(place.after_text, "に疎開している。");
    }

    #[tokio::test]
    async fn known_compound_is_decomposed() {
        let extraction = pipeline()
            .extract_work("w2", "夕方、新宿駅前の喫茶店で待ち合わせをした。", &SilentProgress)
            .await
            .expect("extract");

        assert!(!names(&extraction).contains(&"新宿"));
        let place = extraction
            .places
            .iter()
            .find(|p| p.place_name == "新宿駅前")
            .expect("compound");
        assert_eq!(place.category, Category::FallbackCompound);
        assert_eq!(place.confidence.get(), 0.85);
        assert_eq!(place.base_form.as_deref(), Some("新宿"));
        assert_eq!(place.modifier.as_deref(), Some("駅前"));
    }

    #[tokio::test]
    async fn context_spans_neighbouring_sentences() {
        let extraction = pipeline()
            .extract_work("w3", "僕は本郷の下宿にいた。翌朝、上野へ出かけた。", &SilentProgress)
            .await
            .expect("extract");

        assert_eq!(extraction.sentence_count, 2);
        assert_eq!(names(&extraction), vec!["本郷", "上野"]);

        let hongo = &extraction.places[0];
        assert_eq!(hongo.before_text, "僕は");
        assert_eq!(hongo.sentence, "僕は本郷の下宿にいた。");
        assert_eq!(hongo.after_text, "の下宿にいた。翌朝、上野へ出かけた。");

        let ueno = &extraction.places[1];
        assert_eq!(ueno.sentence_index, 1);
        assert_eq!((ueno.start, ueno.end), (3, 5));
        assert_eq!(ueno.before_text, "僕は本郷の下宿にいた。翌朝、");
    }

    #[tokio::test]
    async fn short_and_empty_inputs_yield_nothing() {
        let pipeline = pipeline();
        for text in ["", "本郷へ行く。", "　\n\n"] {
            let extraction = pipeline
                .extract_work("short", text, &SilentProgress)
                .await
                .expect("extract");
            assert!(extraction.places.is_empty());
            assert_eq!(extraction.sentence_count, 0);
        }
    }

    #[tokio::test]
    async fn markup_is_stripped_before_extraction() {
        let extraction = pipeline()
            .extract_work(
                "w4",
                "［＃ここから２字下げ］\n本郷《ほんごう》の下宿に住んでいた頃の話を書いておく。\n\n底本：「全集」筑摩書房\n",
                &SilentProgress,
            )
            .await
            .expect("extract");

        assert_eq!(extraction.sentence_count, 1);
        assert_eq!(names(&extraction), vec!["本郷"]);
        assert_eq!(extraction.places[0].sentence, "本郷の下宿に住んでいた頃の話を書いておく。");
    }

    #[tokio::test]
    async fn repeated_sentences_are_deduplicated() {
        let extraction = pipeline()
            .extract_work("w5", "本郷へ行った。本郷へ行った。本郷へ行った。", &SilentProgress)
            .await
            .expect("extract");

        assert_eq!(extraction.sentence_count, 3);
        assert_eq!(extraction.places.len(), 1);
        assert_eq!(extraction.places[0].sentence_index, 0);
    }

    #[tokio::test]
    async fn output_is_idempotent_and_well_formed() {
        let text = "千葉県船橋市から上京し、本郷の下宿に住んだ。\
                    夕方、新宿駅前で友人と会い、隅田川沿いを歩いた。\
                    翌日は湯島神社前で別れた。";
        let pipeline = pipeline();
        let first = pipeline
            .extract_work("w6", text, &SilentProgress)
            .await
            .expect("first");
        let second = pipeline
            .extract_work("w6", text, &SilentProgress)
            .await
            .expect("second");

        assert_eq!(first.places, second.places);
        assert!(!first.places.is_empty());
        assert!(first.places.windows(2).all(|w| {
            (w[0].sentence_index, w[0].start) <= (w[1].sentence_index, w[1].start)
        }));
        for place in &first.places {
            let confidence = place.confidence.get();
            assert!((0.0..=1.0).contains(&confidence));
            assert!(place.start < place.end);
        }

        for index in 0..first.sentence_count {
            let spans: Vec<SpanCandidate> = first
                .places
                .iter()
                .filter(|p| p.sentence_index == index)
                .map(|p| {
                    SpanCandidate::new(index, &p.place_name, p.start, p.end, p.category, &p.method)
                        .expect("span")
                })
                .collect();
            assert!(is_overlap_free(&spans));
        }
    }

    #[tokio::test]
    async fn failing_strategy_degrades_nothing_else() {
        let text = "夕方、新宿駅前の喫茶店で待ち合わせをした。";
        let healthy = pipeline()
            .extract_work("w7", text, &SilentProgress)
            .await
            .expect("healthy");

        let degraded = Pipeline::new(
            Catalog::builtin().expect("builtin"),
            StrategyRegistry::builder().custom(Box::new(Failing)).build(),
            ExtractionOptions::default(),
        )
        .extract_work("w7", text, &SilentProgress)
        .await
        .expect("degraded");

        assert_eq!(healthy.places, degraded.places);
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let works = vec![
            WorkText::new("a", "僕は本郷の下宿にいた。翌朝、上野へ出かけた。"),
            WorkText::new("b", "短い。"),
            WorkText::new("c", "夕方、新宿駅前の喫茶店で待ち合わせをした。"),
        ];
        let progress = Counting::default();
        let results = pipeline().extract_batch(works, &progress).await;

        let ids: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().expect("extract").work_id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(results[1].as_ref().expect("b").places.is_empty());

        assert_eq!(progress.started.load(Ordering::SeqCst), 2);
        assert_eq!(progress.resolved.load(Ordering::SeqCst), 3);
        assert_eq!(progress.finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn implausible_words_are_not_places() {
        let extraction = pipeline()
            .extract_work(
                "w10",
                "沢山の人が野原に集まって、大都市の話を昨日からずっとしていた。",
                &SilentProgress,
            )
            .await
            .expect("extract");
        assert_eq!(extraction.sentence_count, 1);
        assert!(extraction.places.is_empty(), "{:?}", names(&extraction));
    }

    #[tokio::test]
    async fn slow_remote_strategy_does_not_hold_cpu_permits() {
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let registry = StrategyRegistry::builder()
            .custom(Box::new(Stamping(Arc::clone(&stamps))))
            .custom(Box::new(SlowRemote(Duration::from_millis(300))))
            .build();
        let options = ExtractionOptions {
            concurrency: 2,
            ..ExtractionOptions::default()
        };
        let pipeline = Pipeline::new(Catalog::builtin().expect("builtin"), registry, options);
        let text = "本郷へ行った。上野へ行った。銀座へ行った。新宿へ行った。浅草へ行った。神田へ行った。";

        let started = Instant::now();
        let extraction = pipeline
            .extract_work("w9", text, &SilentProgress)
            .await
            .expect("extract");
        let elapsed = started.elapsed();

        assert_eq!(extraction.sentence_count, 6);
        assert_eq!(
            names(&extraction),
            vec!["本郷", "上野", "銀座", "新宿", "浅草", "神田"]
        );

        let stamps = stamps.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(stamps.len(), 6);
        for stamp in stamps.iter() {
            let waited = stamp.duration_since(started);
            assert!(waited < Duration::from_millis(200), "local work waited {waited:?}");
        }
        // Six 300ms remote calls overlap instead of queueing two at a time.
        assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
        assert_eq!(pipeline.permits.available_permits(), 2);
    }

    #[tokio::test]
    async fn abandoned_work_can_be_dropped() {
        let pipeline = Pipeline::new(
            Catalog::builtin().expect("builtin"),
            StrategyRegistry::builder().custom(Box::new(Stalled)).build(),
            ExtractionOptions::default(),
        );
        let text = "僕は本郷の下宿にいた。翌朝、上野へ出かけた。";

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            pipeline.extract_work("w8", text, &SilentProgress),
        )
        .await;
        assert!(abandoned.is_err());

        // Permits held by the aborted tasks are returned.
        let permits = pipeline.permits.clone();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(permits.available_permits(), pipeline.options.concurrency.max(1));
    }

    #[test]
    fn from_config_honours_overrides() {
        let config = AppConfig::default();
        let overrides = RunOverrides {
            strategies: Some(vec![StrategyKind::Compound, StrategyKind::Ai]),
            api_key: None,
        };
        let pipeline = Pipeline::from_config(&config, &overrides).expect("pipeline");
        assert!(pipeline.registry().names().contains(&"compound"));
        assert!(!pipeline.registry().names().contains(&"lexical"));

        let overrides = RunOverrides {
            strategies: Some(vec![StrategyKind::Ai]),
            api_key: Some("sk-test".into()),
        };
        let pipeline = Pipeline::from_config(&config, &overrides).expect("pipeline");
        assert_eq!(pipeline.registry().names(), vec!["ai"]);
    }

    #[test]
    fn from_config_fails_fast_on_bad_pattern() {
        let mut config = AppConfig::default();
        config.catalog.patterns.push(chimei_shared::CustomPatternConfig {
            name: "broken".into(),
            regex: "[unclosed".into(),
            category: Category::Custom,
            confidence: None,
            priority: None,
            guarded: false,
        });
        let err = Pipeline::from_config(&config, &RunOverrides::default())
            .err()
            .expect("bad pattern rejected");
        assert!(matches!(err, ChimeiError::Pattern { .. }));
    }

    #[test]
    fn from_config_fails_fast_on_missing_gazetteer() {
        let mut config = AppConfig::default();
        config.tagger.gazetteer_path = Some("/nonexistent/chimei/gazetteer.tsv".into());
        assert!(Pipeline::from_config(&config, &RunOverrides::default()).is_err());
    }
}
