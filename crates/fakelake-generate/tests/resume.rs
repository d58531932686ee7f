mod common;

use fakelake_core::OutputLayout;
use fakelake_generate::{FactManifest, GenerationEngine, GenerationError, ManifestStatus};

use common::{read_batches, small_config, temp_dir};

#[test]
fn resume_after_lost_chunks_matches_an_uninterrupted_run() {
    let reference_dir = temp_dir("resume_reference");
    GenerationEngine::new(small_config(&reference_dir))
        .expect("engine")
        .run()
        .expect("reference run");

    let dir = temp_dir("resume_partial");
    GenerationEngine::new(small_config(&dir))
        .expect("engine")
        .run()
        .expect("first run");
    let layout = OutputLayout::new(&dir);

    // Simulate a run interrupted after chunk 0 was published.
    let mut manifest = FactManifest::load(&layout.manifest_path())
        .expect("load")
        .expect("manifest present");
    manifest.chunks.retain(|chunk| chunk.index == 0);
    manifest.status = ManifestStatus::InProgress;
    manifest.save(&layout.manifest_path()).expect("save");
    std::fs::remove_file(layout.chunk_path(1)).expect("remove chunk 1");
    std::fs::remove_file(layout.chunk_path(2)).expect("remove chunk 2");

    let mut config = small_config(&dir);
    config.facts.resume = true;
    let result = GenerationEngine::new(config)
        .expect("engine")
        .run_facts()
        .expect("resumed run");

    let facts = result.report.facts.expect("fact report");
    assert_eq!(facts.chunks_skipped, 1);
    assert_eq!(facts.chunks_written, 2);
    assert_eq!(facts.rows_generated, 60);
    assert_eq!(facts.rows_available(), 100);

    let reference = OutputLayout::new(&reference_dir);
    for index in 0..3 {
        assert_eq!(
            read_batches(&layout.chunk_path(index)),
            read_batches(&reference.chunk_path(index)),
            "chunk {index}"
        );
    }

    let manifest = FactManifest::load(&layout.manifest_path())
        .expect("load")
        .expect("manifest present");
    assert_eq!(manifest.status, ManifestStatus::Completed);
    assert_eq!(manifest.chunks.len(), 3);
    assert_eq!(manifest.rows_recorded(), 100);

    let _ = std::fs::remove_dir_all(reference_dir);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn recorded_chunk_with_missing_file_is_regenerated() {
    let dir = temp_dir("resume_missing_file");
    GenerationEngine::new(small_config(&dir))
        .expect("engine")
        .run()
        .expect("first run");
    let layout = OutputLayout::new(&dir);
    let before = read_batches(&layout.chunk_path(1));
    std::fs::remove_file(layout.chunk_path(1)).expect("remove chunk 1");

    let mut config = small_config(&dir);
    config.facts.resume = true;
    let result = GenerationEngine::new(config)
        .expect("engine")
        .run_facts()
        .expect("resumed run");

    let facts = result.report.facts.expect("fact report");
    assert_eq!(facts.chunks_skipped, 2);
    assert_eq!(facts.chunks_written, 1);
    assert_eq!(read_batches(&layout.chunk_path(1)), before);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn resume_with_different_parameters_is_refused() {
    let dir = temp_dir("resume_mismatch");
    GenerationEngine::new(small_config(&dir))
        .expect("engine")
        .run()
        .expect("first run");

    let mut config = small_config(&dir);
    config.facts.resume = true;
    config.facts.chunk_size = 25;
    let err = GenerationEngine::new(config)
        .expect("engine")
        .run_facts()
        .expect_err("mismatch");
    assert!(matches!(err, GenerationError::ManifestMismatch(ref message) if message.contains("chunk_size")));

    // The earlier chunks are untouched.
    let layout = OutputLayout::new(&dir);
    assert!(layout.chunk_path(2).is_file());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn fresh_run_clears_chunks_of_a_larger_previous_run() {
    let dir = temp_dir("fresh_clears");
    let mut larger = small_config(&dir);
    larger.facts.total_rows = 200;
    GenerationEngine::new(larger)
        .expect("engine")
        .run()
        .expect("larger run");
    let layout = OutputLayout::new(&dir);
    assert!(layout.chunk_path(4).is_file());

    GenerationEngine::new(small_config(&dir))
        .expect("engine")
        .run_facts()
        .expect("smaller run");

    assert!(layout.chunk_path(2).is_file());
    assert!(!layout.chunk_path(3).exists());
    assert!(!layout.chunk_path(4).exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn resume_with_a_new_reference_date_is_refused() {
    let dir = temp_dir("resume_reference_date");
    GenerationEngine::new(small_config(&dir))
        .expect("engine")
        .run()
        .expect("first run");

    let mut config = small_config(&dir);
    config.facts.resume = true;
    config.reference_date = chrono::NaiveDate::from_ymd_opt(2030, 6, 30).expect("date");
    let err = GenerationEngine::new(config)
        .expect("engine")
        .run()
        .expect_err("mismatch");
    assert!(matches!(
        err,
        GenerationError::ManifestMismatch(ref message) if message.contains("reference_date")
    ));

    let _ = std::fs::remove_dir_all(dir);
}
