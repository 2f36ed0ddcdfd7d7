//! End-to-end tests for the benchmark pipeline.
//!
//! These run the full eleven-classifier suite on a synthetic 200-lake table
//! with 10% high-risk lakes and check ordering, determinism and the written
//! workbook.

use async_trait::async_trait;
use glofbench_core::config::{BenchConfig, FailurePolicy};
use glofbench_core::data::synthetic::{SyntheticSpec, generate, write_csv};
use glofbench_core::data::{DataSource, RecordTable};
use glofbench_core::error::BenchError;
use glofbench_core::pipeline::run_with_source;
use glofbench_core::report::read_table;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

const SUITE: [&str; 11] = [
    "Logistic Regression",
    "Random Forest",
    "Gradient Boosting",
    "XGBoost",
    "LightGBM",
    "CatBoost",
    "KNN",
    "SVM",
    "Naive Bayes",
    "Decision Tree",
    "AdaBoost",
];

/// Config reading `input` and writing `output_name` inside `dir`.
fn config_for(dir: &Path, input: &Path, output_name: &str) -> BenchConfig {
    let mut config = BenchConfig::default();
    config.data.input_path = input.to_path_buf();
    config.report.output_path = dir.join(output_name);
    config
}

fn synthetic_input(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("lakes.csv");
    write_csv(&SyntheticSpec::default(), &path).unwrap();
    path
}

/// In-memory source, for tables that need hand edits.
struct TableSource(RecordTable);

#[async_trait]
impl DataSource for TableSource {
    async fn load(&self) -> Result<RecordTable, BenchError> {
        Ok(self.0.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Records the message of every event emitted while installed.
#[derive(Clone, Default)]
struct MessageLog(Arc<Mutex<Vec<String>>>);

impl MessageLog {
    fn count(&self, message: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|m| *m == message).count()
    }
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for MessageLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.0.lock().unwrap().push(message);
        }
    }
}

#[tokio::test]
async fn test_end_to_end_writes_eleven_rows_in_order() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(dir.path());
    let config = config_for(dir.path(), &input, "results.xlsx");

    let output = glofbench_core::run(&config).await.unwrap();

    let names: Vec<&str> = output
        .table
        .records()
        .iter()
        .map(|r| r.classifier.as_str())
        .collect();
    assert_eq!(names, SUITE);
    assert!(output.outcomes.iter().all(|o| o.is_success()));
    for record in output.table.records() {
        for v in record.values() {
            assert!((0.0..=1.0).contains(&v), "{record:?}");
        }
        assert!(record.accuracy > 0.5, "{record:?}");
    }

    let summary = &output.summary;
    assert_eq!(summary.rows_loaded, 200);
    assert_eq!(summary.rows_dropped, 0);
    assert_eq!(summary.class_counts_before, [180, 20]);
    assert_eq!(summary.class_counts_after, [180, 180]);
    assert_eq!(summary.train_size + summary.test_size, 360);
    assert_eq!(summary.test_size, 72);

    let written = read_table(&config.report.output_path).unwrap();
    assert_eq!(written, output.table);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(dir.path());

    let first = glofbench_core::run(&config_for(dir.path(), &input, "a.xlsx"))
        .await
        .unwrap();
    let second = glofbench_core::run(&config_for(dir.path(), &input, "b.xlsx"))
        .await
        .unwrap();
    assert_eq!(first.table, second.table);
    assert_eq!(
        read_table(&dir.path().join("a.xlsx")).unwrap(),
        read_table(&dir.path().join("b.xlsx")).unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(dir.path());

    let sequential = glofbench_core::run(&config_for(dir.path(), &input, "seq.xlsx"))
        .await
        .unwrap();
    let mut config = config_for(dir.path(), &input, "par.xlsx");
    config.evaluation.parallel = true;
    let parallel = glofbench_core::run(&config).await.unwrap();

    assert_eq!(sequential.table, parallel.table);
}

#[tokio::test]
async fn test_incomplete_rows_are_dropped() {
    let dir = TempDir::new().unwrap();
    let mut table = generate(&SyntheticSpec::default()).unwrap();
    table.rows[3][0] = String::new();
    table.rows[10][2] = "NA".to_string();
    table.rows[11][3] = "NaN".to_string();

    let log = MessageLog::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(log.clone()));

    let config = config_for(dir.path(), Path::new("unused.csv"), "dropped.xlsx");
    let output = run_with_source(&config, &TableSource(table)).await.unwrap();
    assert_eq!(output.summary.rows_loaded, 200);
    assert_eq!(output.summary.rows_dropped, 3);
    assert_eq!(output.summary.source, "memory");
    assert_eq!(log.count("Dropped incomplete rows"), 1);
    assert_eq!(log.count("Built feature matrix"), 1);
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), &dir.path().join("absent.csv"), "never.xlsx");

    let err = glofbench_core::run(&config).await.unwrap_err();
    assert!(matches!(err, BenchError::Io(_)), "{err}");
    assert!(!config.report.output_path.exists());
}

#[tokio::test]
async fn test_too_few_positives_is_fatal() {
    let dir = TempDir::new().unwrap();
    let spec = SyntheticSpec {
        rows: 100,
        positive_fraction: 0.03,
        seed: 1,
    };
    let config = config_for(dir.path(), Path::new("unused.csv"), "never.xlsx");
    let err = run_with_source(&config, &TableSource(generate(&spec).unwrap()))
        .await
        .unwrap_err();
    // 3 positives cannot feed 5 nearest neighbours
    assert!(matches!(err, BenchError::Balance(_)), "{err}");
}

#[tokio::test]
async fn test_abort_policy_completes_on_healthy_data() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(dir.path());
    let mut config = config_for(dir.path(), &input, "abort.xlsx");
    config.evaluation.failure_policy = FailurePolicy::Abort;

    // a healthy dataset fits every classifier, so abort changes nothing
    let output = glofbench_core::run(&config).await.unwrap();
    assert_eq!(output.table.len(), 11);
}
