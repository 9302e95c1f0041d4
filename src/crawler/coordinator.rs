//! Crawl coordinator - the end-to-end page pipeline
//!
//! For every task taken from the queue the coordinator:
//! - Fetches the page through the spider (rate limit, retries)
//! - Scores content patterns and derives crawl suggestions
//! - Extracts the visible text and classifies it
//! - Saves a `CrawlRecord` under the chosen category

use crate::analysis::ContentAnalyzer;
use crate::classify::{Classifier, KeywordClassifier};
use crate::config::Config;
use crate::crawler::parser::extract_text;
use crate::crawler::{PageResult, Spider};
use crate::monitor::Monitor;
use crate::queue::TaskQueue;
use crate::state::Task;
use crate::storage::{open_storage, CrawlRecord, RecordStore, SqliteStorage};
use crate::CrawlError;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Main pipeline structure
pub struct Coordinator {
    spider: Arc<Spider>,
    analyzer: ContentAnalyzer,
    classifier: Arc<dyn Classifier>,
    storage: Arc<Mutex<SqliteStorage>>,
    monitor: Arc<dyn Monitor>,
    queue: Arc<TaskQueue>,
}

impl Coordinator {
    pub fn new(
        spider: Arc<Spider>,
        classifier: Arc<dyn Classifier>,
        storage: Arc<Mutex<SqliteStorage>>,
        monitor: Arc<dyn Monitor>,
        queue: Arc<TaskQueue>,
    ) -> Self {
        Self {
            spider,
            analyzer: ContentAnalyzer::new(),
            classifier,
            storage,
            monitor,
            queue,
        }
    }

    /// Creates a coordinator instance from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `queue` - Queue the coordinator consumes
    /// * `monitor` - Receiver of metrics and errors
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Spider, classifier and database are ready
    /// * `Err(CrawlError)` - The executor or the database could not be set up
    pub fn from_config(
        config: &Config,
        queue: Arc<TaskQueue>,
        monitor: Arc<dyn Monitor>,
    ) -> Result<Self, CrawlError> {
        let spider = Spider::from_config(config)?.with_monitor(Arc::clone(&monitor));
        let classifier = KeywordClassifier::from_config(&config.categories);
        let storage = open_storage(Path::new(&config.output.database_path))?;

        Ok(Self::new(
            Arc::new(spider),
            Arc::new(classifier),
            Arc::new(Mutex::new(storage)),
            monitor,
            queue,
        ))
    }

    pub fn spider(&self) -> &Arc<Spider> {
        &self.spider
    }

    pub fn storage(&self) -> &Arc<Mutex<SqliteStorage>> {
        &self.storage
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Runs one task through the whole pipeline
    ///
    /// Failures are reported to the monitor before being returned.
    pub async fn process_task(&self, task: &Task) -> Result<CrawlRecord, CrawlError> {
        let result = self.run_pipeline(task).await;
        if let Err(e) = &result {
            self.monitor
                .handle_error(e, &format!("processing {}", task.url));
        }
        result
    }

    /// Processes tasks from the queue until `cancel` fires
    ///
    /// A failed task is logged and the loop moves on. Returns the number of
    /// tasks processed successfully.
    pub async fn run(&self, cancel: &CancellationToken) -> usize {
        tracing::info!("Coordinator started");
        let mut processed = 0;

        while let Some(task) = self.queue.pop_task_or_cancel(cancel).await {
            if self.handle(&task).await {
                processed += 1;
            }
        }

        tracing::info!("Coordinator stopped after {} task(s)", processed);
        processed
    }

    /// Processes whatever is queued right now, then returns
    ///
    /// Stops early when `cancel` fires; remaining tasks stay queued.
    pub async fn drain(&self, cancel: &CancellationToken) -> usize {
        let mut processed = 0;

        while !cancel.is_cancelled() {
            let Some(task) = self.queue.try_pop_task() else {
                break;
            };
            if self.handle(&task).await {
                processed += 1;
            }
        }

        processed
    }

    async fn handle(&self, task: &Task) -> bool {
        match self.process_task(task).await {
            Ok(record) => {
                tracing::info!("Stored {} as {}", record.url, record.category);
                true
            }
            Err(e) => {
                tracing::error!("Error processing {}: {}", task.url, e);
                false
            }
        }
    }

    async fn run_pipeline(&self, task: &Task) -> Result<CrawlRecord, CrawlError> {
        let page = self.spider.crawl(&task.url, None).await?;
        self.record_page(page, Some(task))
    }

    /// Analyzes, classifies and stores an already fetched page
    ///
    /// The task, when given, contributes its id and payload to the record.
    pub fn record_page(
        &self,
        page: PageResult,
        task: Option<&Task>,
    ) -> Result<CrawlRecord, CrawlError> {
        let patterns = self.analyzer.analyze_page(&page.html);
        let suggestions = self.analyzer.get_crawl_suggestions(&patterns);
        let text = extract_text(&page.html);
        let category = self.classifier.classify(&text);

        tracing::debug!(
            "{}: {} pattern(s), classified as {}",
            page.url,
            patterns.len(),
            category
        );

        let record = CrawlRecord {
            url: page.url,
            title: page.metadata.title,
            category: category.clone(),
            crawled_at: page.timestamp,
            text,
            link_count: page.metadata.links.len(),
            suggestions,
            task_id: task.and_then(|task| task.id),
            payload: task.map(|task| task.payload.clone()).unwrap_or_default(),
        };

        {
            let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
            storage.save(&record.to_value()?, &category)?;
        }

        Ok(record)
    }
}
