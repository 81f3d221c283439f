//! Upload-to-export flows through the coordinator, queue and processor.

mod common;

use common::{upload, ParameterFileBuilder, TestHarness};

use gadbatch::model::ProcessingStatus;
use gadbatch::worker::COMPLETED_STEP;
use gadbatch::{build_archive, export_manifest};

#[tokio::test]
async fn test_reference_file_is_parsed_and_completed() {
    let harness = TestHarness::new();

    let result = harness.upload(vec![ParameterFileBuilder::new().upload("span_a.txt")]);
    assert_eq!(result.batch_job.total_files, 1);

    let project_id = result.job_files[0].project_id.clone().unwrap();
    let params = harness
        .store
        .get_bridge_parameters(&project_id)
        .unwrap()
        .unwrap();
    assert_eq!(
        (params.scale1, params.scale2, params.skew, params.datum, params.toprl),
        (100.0, 50.0, 0.0, 100.0, 105.0)
    );
    assert_eq!(
        (params.left, params.right, params.xincr, params.yincr, params.noch),
        (0.0, 50.0, 5.0, 1.0, 11)
    );

    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    assert_eq!(job.processed_files, 1);
    assert!(job.completed_at.is_some());

    let files = harness.files(&job.id);
    assert_eq!(files[0].status, ProcessingStatus::Completed);
    assert_eq!(files[0].progress, 100);
    assert_eq!(files[0].current_step.as_deref(), Some(COMPLETED_STEP));
}

#[tokio::test]
async fn test_short_file_fails_and_job_stays_pending() {
    let harness = TestHarness::new();

    let result = harness.upload(vec![upload("short.txt", "100\n50\n0\n")]);
    assert_eq!(result.batch_job.failed_files, 1);
    assert!(result.job_files[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("insufficient data"));

    harness.drain().await;

    let job = harness.job(&result.batch_job.id);
    assert_eq!(job.status, ProcessingStatus::Pending);
    assert_eq!(job.failed_files, 1);
    assert_eq!(harness.files(&job.id)[0].progress, 0);
}

#[tokio::test]
async fn test_batch_of_twenty_files() {
    let harness = TestHarness::new();
    let files = (0..20)
        .map(|i| {
            ParameterFileBuilder::new()
                .cross_section(i as f64, 100.0 + i as f64)
                .upload(&format!("span_{}.txt", i))
        })
        .collect();

    let result = harness.upload(files);
    assert_eq!(result.batch_job.total_files, 20);
    assert_eq!(result.job_files.len(), 20);

    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    assert_eq!(job.processed_files, 20);
    assert_eq!(job.failed_files, 0);
}

#[tokio::test]
async fn test_mixed_batch_counts_every_finished_file() {
    let harness = TestHarness::new();
    let result = harness.upload(vec![
        ParameterFileBuilder::new().upload("good.txt"),
        ParameterFileBuilder::new().scale1("wide").upload("bad_number.txt"),
        ParameterFileBuilder::new().noch("0").upload("bad_noch.txt"),
    ]);
    assert_eq!(result.batch_job.failed_files, 2);

    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    let files = harness.files(&job.id);
    let finished = files.iter().filter(|f| f.status.is_finished()).count() as u32;
    assert_eq!(job.processed_files, finished);
    assert_eq!(job.processed_files, 3);
    assert_eq!(job.failed_files, 2);

    assert!(files[1]
        .error_message
        .as_deref()
        .unwrap()
        .contains("failed to parse numeric values"));
    assert!(files[2].error_message.as_deref().unwrap().contains("noch"));
}

#[tokio::test]
async fn test_progress_events_follow_fixed_steps() {
    let harness = TestHarness::new();
    let mut rx = harness.progress.subscribe();

    let result = harness.upload(vec![ParameterFileBuilder::new().upload("span.txt")]);
    harness.drain().await;

    let file_id = result.job_files[0].id.clone();
    let mut progress = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.file_id == file_id && progress.last() != Some(&event.progress) {
            progress.push(event.progress);
        }
    }
    assert_eq!(progress, vec![0, 20, 40, 60, 80, 100]);
}

#[tokio::test]
async fn test_resubmitting_running_job_processes_once() {
    let harness = TestHarness::new();
    let mut rx = harness.progress.subscribe();

    let result = harness.upload(vec![ParameterFileBuilder::new().upload("span.txt")]);
    // Upload already queued the job; a second submission is ignored.
    assert!(!harness.queue.submit(&result.batch_job.id).unwrap());
    harness.drain().await;

    let mut starts = 0;
    while let Ok(event) = rx.try_recv() {
        if event.status == ProcessingStatus::Processing && event.progress == 0 {
            starts += 1;
        }
    }
    assert_eq!(starts, 1);
}

#[tokio::test]
async fn test_export_after_processing() {
    let harness = TestHarness::new();
    let content = ParameterFileBuilder::new().build();
    let result = harness.upload(vec![
        upload("span_a.txt", &content),
        upload("broken.txt", "1\n2\n"),
    ]);
    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    let files = harness.files(&job.id);

    let manifest = export_manifest(&job, &files);
    assert_eq!(manifest.total_files, 1);
    assert_eq!(manifest.total_size, 3 * content.len() as u64);

    let bytes = build_archive(&job, &files).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(names, vec!["manifest.json", "span_a.dwg", "span_a.pdf"]);
}

#[tokio::test]
async fn test_sqlite_backend_runs_full_flow() {
    let harness = TestHarness::sqlite();

    let result = harness.upload(vec![
        ParameterFileBuilder::new()
            .cross_section(0.0, 101.5)
            .cross_section(5.0, 101.2)
            .upload("span.txt"),
        upload("short.txt", "1\n"),
    ]);
    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    assert_eq!(job.processed_files, 2);
    assert_eq!(job.failed_files, 1);

    let project_id = result.job_files[0].project_id.clone().unwrap();
    let sections = harness.store.list_cross_sections(&project_id).unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[1].level, 101.2);
}

#[tokio::test]
async fn test_download_with_repeated_file_names() {
    let harness = TestHarness::new();
    let result = harness.upload(vec![
        ParameterFileBuilder::new().upload("span.txt"),
        ParameterFileBuilder::new().upload("span.txt"),
    ]);
    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;
    let files = harness.files(&job.id);

    let bytes = build_archive(&job, &files).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 5);
    assert!(archive.file_names().any(|n| n == "span_2.pdf"));
}

#[tokio::test]
async fn test_export_with_huge_reported_size() {
    let harness = TestHarness::new();
    let content = ParameterFileBuilder::new().build();
    let mut file = upload("span.txt", &content);
    file.size = u64::MAX / 2;

    let result = harness.upload(vec![file]);
    let job = harness
        .wait_for_status(&result.batch_job.id, ProcessingStatus::Completed)
        .await;

    let manifest = export_manifest(&job, &harness.files(&job.id));
    assert_eq!(manifest.total_size, u64::MAX);
}
