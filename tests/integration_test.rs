//! Integration tests for the stampede risk pipeline

use stampede_risk::{
    config::Config,
    data::{train_split_len, DataGenerator, Dataset, GeneratorConfig, MalformedPolicy, Record, RiskLevel},
    evaluation::{Evaluator, RiskPredictor},
    ml::{Scoring, CrossValidator},
    models::{ForestConfig, GbmParams, ModelKind, ModelSpec},
    pipeline::{run_demo, run_training, DemoConfig, TrainingConfig},
    preprocess::{ImputeStrategy, PreprocessConfig},
    report::{render_demo, render_training, write_json},
    RiskError, RiskScorer,
};
use std::fs;
use tempfile::tempdir;

fn generate(rows: usize, seed: u64) -> Dataset {
    DataGenerator::new(GeneratorConfig {
        rows,
        seed: Some(seed),
        ..Default::default()
    })
    .unwrap()
    .generate()
}

fn fast_training() -> TrainingConfig {
    TrainingConfig {
        folds: 3,
        candidates: vec![
            ModelSpec::new(
                "GradientBoosting",
                ModelKind::GradientBoosting(GbmParams {
                    n_estimators: 10,
                    ..Default::default()
                }),
            ),
            ModelSpec::new(
                "RandomForest",
                ModelKind::RandomForest(ForestConfig {
                    n_trees: 10,
                    ..Default::default()
                }),
            ),
        ],
        ..Default::default()
    }
}

/// Generate, save, reload and run the rule-based demo end to end
#[test]
fn test_generate_save_load_demo() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cctv_data.csv");

    let generated = generate(100, 11);
    generated.save_csv(&path).unwrap();

    let load = Dataset::load_csv(&path, MalformedPolicy::Fail).unwrap();
    assert_eq!(load.dataset.len(), 100);
    assert_eq!(load.skipped_empty, 0);
    assert!(load.rejected.is_empty());
    assert_eq!(load.dataset.records, generated.records);

    let report = run_demo(&load.dataset, &RiskScorer::default(), &DemoConfig::default()).unwrap();
    assert_eq!(report.train_size, 80);
    assert_eq!(report.test_size, 20);

    let cm = &report.evaluation.confusion;
    assert_eq!(cm.total(), 20);
    assert_eq!(report.evaluation.correct, cm.correct());

    // Row sums equal the per-class counts of the test partition
    let test_counts: usize = RiskLevel::ALL.iter().map(|&l| cm.row(l).iter().sum::<usize>()).sum();
    assert_eq!(test_counts, 20);

    let text = render_demo(&report);
    assert!(text.contains("Data loaded: 100 CCTV records"));
    assert!(text.contains("CCTV Feed #5:"));
}

/// Full training run over a generated file, with JSON output
#[test]
fn test_training_pipeline_end_to_end() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("cctv_data.csv");
    let json_path = dir.path().join("report.json");

    generate(80, 5).save_csv(&data_path).unwrap();
    let dataset = Dataset::load_csv(&data_path, MalformedPolicy::Fail).unwrap().dataset;

    let config = TrainingConfig {
        scoring: Scoring::F1Macro,
        preprocess: PreprocessConfig {
            impute: ImputeStrategy::Median,
            scale: true,
            ..Default::default()
        },
        ..fast_training()
    };

    let (report, pipeline) = run_training(&dataset, &config).unwrap();
    assert_eq!(report.train_size, train_split_len(80, 0.8));
    assert_eq!(report.test_size, 80 - 64);
    assert_eq!(report.evaluation.confusion.total(), report.test_size);
    assert_eq!(pipeline.name(), report.best_model);

    let supports: usize = report.classification_report.classes.iter().map(|c| c.support).sum();
    assert_eq!(supports, report.test_size);

    let text = render_training(&report);
    assert!(text.contains("BEST MODEL SELECTED"));
    assert!(text.contains("f1_macro"));

    write_json(&report, &json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["best_model"], report.best_model.as_str());
    assert_eq!(json["test_size"], 16);
}

/// The fitted pipeline can score records it has never seen
#[test]
fn test_fitted_pipeline_handles_missing_values() {
    let dataset = generate(60, 9);
    let (_, pipeline) = run_training(&dataset, &fast_training()).unwrap();

    let mut record = Record::new(1, 480, 9.5, 0.8, "Stage", RiskLevel::High);
    record.movement_speed = None;
    record.area_zone = None;

    let level = pipeline.predict(&record).unwrap();
    assert!(RiskLevel::ALL.contains(&level));

    // The rule-based scorer refuses the same record
    let err = RiskScorer::default().predict(&record).unwrap_err();
    assert!(matches!(err, RiskError::MalformedRecord { row: 1, .. }));
}

#[test]
fn test_missing_data_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cctv_data.csv");

    let err = Dataset::load_csv(&path, MalformedPolicy::Fail).unwrap_err();
    match err {
        RiskError::MissingDataFile { path: missing } => assert_eq!(missing, path),
        other => panic!("unexpected error {:?}", other),
    }
}

/// Empty rows are dropped; malformed rows follow the configured policy
#[test]
fn test_dirty_csv_policies() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dirty.csv");
    fs::write(
        &path,
        "People_Count,Movement_Speed,Density_sqm,Area_Zone,StampedeRiskLevel\n\
         450,3.0,8.0,Entry,High\n\
         ,,,,\n\
         300,fast,5.0,Exit,Medium\n\
         200,,2.0,,Low\n\
         120,1.0,2.0,Exit,Critical\n",
    )
    .unwrap();

    let err = Dataset::load_csv(&path, MalformedPolicy::Fail).unwrap_err();
    assert!(matches!(
        err,
        RiskError::MalformedRecord {
            row: 3,
            field: "Movement_Speed",
            ..
        }
    ));

    let load = Dataset::load_csv(&path, MalformedPolicy::Skip).unwrap();
    assert_eq!(load.dataset.len(), 2);
    assert_eq!(load.skipped_empty, 1);
    assert_eq!(load.rejected.len(), 2);

    let partial = &load.dataset.records[1];
    assert_eq!(partial.row, 4);
    assert_eq!(partial.movement_speed, None);
    assert_eq!(partial.area_zone, None);

    // Evaluating the scorer on the partial record names the row and field
    let err = Evaluator::default()
        .evaluate(&load.dataset, &RiskScorer::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RiskError::MalformedRecord {
            row: 4,
            field: "Movement_Speed",
            ..
        }
    ));
}

#[test]
fn test_k_fold_partition_properties() {
    for (n, k) in [(10, 2), (23, 5), (64, 5), (7, 7)] {
        let splits = CrossValidator::k_fold(n, k, 42).unwrap();
        assert_eq!(splits.len(), k);

        let mut seen = vec![0usize; n];
        for split in &splits {
            for &i in &split.test_indices {
                seen[i] += 1;
            }
            assert_eq!(split.train_indices.len() + split.test_indices.len(), n);
        }
        assert!(seen.iter().all(|&c| c == 1));
    }
}

#[test]
fn test_config_file_drives_training() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("stampede.toml");

    let mut config = Config::default();
    config.training = fast_training();
    config.training.folds = 4;
    config.save_to_file(&config_path).unwrap();

    let loaded = Config::load_or_default(&config_path).unwrap();
    assert_eq!(loaded.training.folds, 4);
    assert_eq!(loaded.training.candidates.len(), 2);

    let (report, _) = run_training(&generate(50, 2), &loaded.training).unwrap();
    for candidate in &report.candidates {
        assert_eq!(candidate.cv.scores.len(), 4);
    }
}
