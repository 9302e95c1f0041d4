use cadence_crawler::config::{CategoryEntry, Config, ExecutorConfig, OutputConfig};
use cadence_crawler::crawler::Coordinator;
use cadence_crawler::monitor::TracingMonitor;
use cadence_crawler::storage::{RecordQuery, RecordStore, SqliteStorage};
use cadence_crawler::{Task, TaskQueue, TaskScheduler};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to a database inside `dir`
fn create_test_config(dir: &TempDir) -> Config {
    Config {
        executor: ExecutorConfig {
            max_retries: 1,
            retry_delay_ms: 10,
            timeout_secs: 5,
            ..ExecutorConfig::default()
        },
        output: OutputConfig {
            database_path: dir
                .path()
                .join("crawl.db")
                .to_string_lossy()
                .into_owned(),
        },
        categories: vec![
            CategoryEntry {
                name: "news".to_string(),
                keywords: vec!["election".to_string(), "minister".to_string()],
            },
            CategoryEntry {
                name: "recipes".to_string(),
                keywords: vec!["flour".to_string(), "oven".to_string()],
            },
        ],
        ..Config::default()
    }
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/politics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Vote</title></head><body>
            <article>The election results surprised the minister.</article>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bread"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Bread</title></head><body>
            <div class="post">Heat the oven and mix the flour.</div>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(server)
        .await;
}

/// Waits until the database holds `expected` records in total
async fn wait_for_records(coordinator: &Coordinator, expected: u64) {
    loop {
        let stored = {
            let storage = coordinator.storage().lock().unwrap();
            storage.count("news").unwrap() + storage.count("recipes").unwrap()
        };
        if stored >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_pipeline_classifies_and_stores_pages() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir);
    let queue = Arc::new(TaskQueue::new());
    let monitor = Arc::new(TracingMonitor::new());
    let coordinator = Coordinator::from_config(&config, Arc::clone(&queue), monitor.clone())
        .expect("Failed to create coordinator");

    queue.push_task(Task::new(format!("{}/politics", mock_server.uri())).unwrap());
    queue.push_task(Task::new(format!("{}/gone", mock_server.uri())).unwrap());
    queue.push_task(
        Task::new(format!("{}/bread", mock_server.uri()))
            .unwrap()
            .with_field("source", "integration"),
    );

    let cancel = CancellationToken::new();
    let stopper = async {
        wait_for_records(&coordinator, 2).await;
        cancel.cancel();
    };

    let (processed, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(coordinator.run(&cancel), stopper)
    })
    .await
    .expect("Pipeline did not finish in time");

    assert_eq!(processed, 2);
    assert!(queue.is_empty());

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.pages_fetched, 2);
    assert_eq!(snapshot.errors_by_kind.get("fetch"), Some(&1));

    // Reopen the database file to check what was persisted
    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let news = storage.retrieve(&RecordQuery::category("news")).unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(news[0]["title"], "Vote");
    assert!(!news[0]["suggestions"]["content_selectors"]
        .as_array()
        .unwrap()
        .is_empty());

    let recipes = storage
        .retrieve(&RecordQuery::category("recipes").with_field("title", "Bread"))
        .unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0]["payload"]["source"], "integration");
    assert_eq!(recipes[0]["text"], "Heat the oven and mix the flour.");
}

#[tokio::test]
async fn test_drain_processes_queued_tasks_and_returns() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir);
    let queue = Arc::new(TaskQueue::new());
    let coordinator =
        Coordinator::from_config(&config, Arc::clone(&queue), Arc::new(TracingMonitor::new()))
            .unwrap();

    queue.push_task(Task::new(format!("{}/bread", mock_server.uri())).unwrap());
    queue.push_task(Task::new(format!("{}/gone", mock_server.uri())).unwrap());

    let processed = coordinator.drain(&CancellationToken::new()).await;

    assert_eq!(processed, 1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_scheduled_task_flows_through_pipeline() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir);
    let queue = Arc::new(TaskQueue::new());
    let coordinator =
        Coordinator::from_config(&config, Arc::clone(&queue), Arc::new(TracingMonitor::new()))
            .unwrap();
    let scheduler = TaskScheduler::new(Arc::clone(&queue), Duration::from_millis(20)).unwrap();

    let task = Task::new(format!("{}/politics", mock_server.uri())).unwrap();
    let id = scheduler.schedule_task(task, Utc::now() + chrono::TimeDelta::milliseconds(50));
    assert_eq!(scheduler.get_scheduled_tasks().len(), 1);

    let cancel = CancellationToken::new();
    let pipeline = async {
        let task = queue
            .pop_task_or_cancel(&cancel)
            .await
            .expect("Task was never dispatched");
        let record = coordinator.process_task(&task).await;
        cancel.cancel();
        (task, record)
    };

    let ((task, record), ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(pipeline, scheduler.run(&cancel))
    })
    .await
    .expect("Scheduled task did not run in time");

    assert_eq!(task.id, Some(id));
    let record = record.expect("Pipeline failed");
    assert_eq!(record.category, "news");
    assert_eq!(record.task_id, Some(id));
    assert!(scheduler.get_scheduled_tasks().is_empty());
    assert!(!scheduler.cancel_task(id));
}
