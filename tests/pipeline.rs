//! End-to-end runs of the keyword workflow against the in-memory library.

use anyhow::Result;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use photo_ai_keywords::{
    AppConfig, Language,
    common::SCRATCH_SUBDIR,
    gateway::ModelGateway,
    library::{MemoryLibrary, PhotoBackend, memory::ExportArtifact},
    run,
};
use std::{cell::RefCell, collections::HashSet, io::Cursor};

struct CountingGateway {
    described: RefCell<usize>,
    translated: RefCell<usize>,
}

impl CountingGateway {
    fn new() -> Self {
        Self {
            described: RefCell::new(0),
            translated: RefCell::new(0),
        }
    }
}

impl ModelGateway for CountingGateway {
    fn describe_image(&self, _jpeg_base64: &str) -> Result<String> {
        *self.described.borrow_mut() += 1;
        Ok("1. sky, 2. tree, 3. house".to_string())
    }

    fn translate_keywords(&self, keywords: &[String], language: Language) -> Result<String> {
        assert_eq!(language, Language::French);
        *self.translated.borrow_mut() += 1;
        Ok(keywords
            .iter()
            .map(|k| format!("{k}-fr"))
            .collect::<Vec<_>>()
            .join(", "))
    }
}

fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(48, 24, Rgb([30, 90, 160])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn test_config(root: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        scratch_dir: root.path().join("temporary_ai_photo_export"),
        progress_bar: false,
        resample_width: 32,
        ..AppConfig::default()
    }
}

/// Library with `stills` images and `videos` movies waiting in the intake album.
fn library_with_intake(config: &AppConfig, stills: usize, videos: usize) -> (MemoryLibrary, Vec<String>) {
    let library = MemoryLibrary::new();
    let intake = library.create_album(&config.intake_album).unwrap();
    let bytes = png_bytes();
    let mut ids = Vec::new();
    for i in 0..stills {
        let name = format!("IMG_{i:04}.png");
        let artifact = ExportArtifact::new(name.clone(), bytes.clone());
        ids.push(library.insert_photo(&name, &["holiday"], vec![artifact]).unwrap().id);
    }
    for i in 0..videos {
        ids.push(library.insert_photo(&format!("IMG_{i:04}.MOV"), &[], vec![]).unwrap().id);
    }
    library.add_members(&intake, &ids).unwrap();
    (library, ids)
}

fn ids_in(library: &MemoryLibrary, name: &str) -> HashSet<String> {
    library.member_ids(name).unwrap().into_iter().collect()
}

#[test]
fn intake_of_150_is_split_drained_and_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, ids) = library_with_intake(&config, 150, 0);
    let gateway = CountingGateway::new();

    let summary = run(&config, &library, &gateway).unwrap();
    assert_eq!(summary.distributed, 150);
    assert_eq!(summary.work_units, 2);
    assert_eq!(summary.succeeded + summary.failed, 150);

    let done = ids_in(&library, &config.done_album);
    let failed = ids_in(&library, &config.failed_album);
    assert!(done.is_disjoint(&failed));
    let recorded: HashSet<String> = done.union(&failed).cloned().collect();
    assert_eq!(recorded, ids.iter().cloned().collect());

    // Both work units are gone and the intake is empty again.
    let names = library.album_names().unwrap();
    assert!(!names.iter().any(|name| name.starts_with(&config.work_unit_prefix())));
    assert!(library.member_ids(&config.intake_album).unwrap().is_empty());

    let calls = library.calls().unwrap();
    assert!(calls.removals.iter().all(|size| *size <= config.batch_size));
    assert!(calls.deleted.contains(&"ai-keywords #0".to_string()));
    assert!(calls.deleted.contains(&"ai-keywords #1".to_string()));
    assert_eq!(calls.listings[&config.intake_album], 1);

    assert!(!config.scratch_dir.exists());
}

#[test]
fn keywords_are_written_with_the_marker() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, ids) = library_with_intake(&config, 1, 0);

    run(&config, &library, &CountingGateway::new()).unwrap();
    assert_eq!(
        library.photo(&ids[0]).unwrap().keywords,
        vec!["holiday", "sky (AI)", "tree (AI)", "house (AI)"]
    );
}

#[test]
fn translated_keywords_replace_the_originals() {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig {
        translate_to: Language::French,
        ..test_config(&root)
    };
    let (library, ids) = library_with_intake(&config, 2, 0);
    let gateway = CountingGateway::new();

    run(&config, &library, &gateway).unwrap();
    assert_eq!(*gateway.translated.borrow(), 2);
    assert_eq!(
        library.photo(&ids[1]).unwrap().keywords,
        vec!["holiday", "sky-fr (AI)", "tree-fr (AI)", "house-fr (AI)"]
    );
}

#[test]
fn movies_are_routed_to_the_failed_album() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, _) = library_with_intake(&config, 5, 4);
    let gateway = CountingGateway::new();

    let summary = run(&config, &library, &gateway).unwrap();
    assert_eq!((summary.succeeded, summary.failed), (5, 4));
    assert_eq!(ids_in(&library, &config.failed_album).len(), 4);
    assert_eq!(*gateway.described.borrow(), 5);
}

#[test]
fn interrupted_run_resumes_without_reprocessing() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, ids) = library_with_intake(&config, 30, 0);

    // Listings: intake, unit size, then one per batch. The fifth listing,
    // which would start the third batch, fails like a killed process.
    library.set_listing_budget(Some(4)).unwrap();
    let first = CountingGateway::new();
    assert!(run(&config, &library, &first).is_err());
    assert_eq!(*first.described.borrow(), 20);
    assert_eq!(library.member_ids("ai-keywords #0").unwrap().len(), 10);

    library.set_listing_budget(None).unwrap();
    let second = CountingGateway::new();
    let summary = run(&config, &library, &second).unwrap();
    assert_eq!(*second.described.borrow(), 10);
    assert_eq!(summary.distributed, 0);
    assert_eq!(summary.succeeded, 10);

    let done = ids_in(&library, &config.done_album);
    assert_eq!(done, ids.iter().cloned().collect());
    assert!(library.album("ai-keywords #0").unwrap().is_none());
}

#[test]
fn photos_added_between_runs_join_the_next_run() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, _) = library_with_intake(&config, 3, 0);
    run(&config, &library, &CountingGateway::new()).unwrap();

    let intake = library.album(&config.intake_album).unwrap().unwrap();
    let late = library
        .insert_photo("late.png", &[], vec![ExportArtifact::new("late.png", png_bytes())])
        .unwrap();
    library.add_members(&intake, &[late.id.clone()]).unwrap();

    let gateway = CountingGateway::new();
    let summary = run(&config, &library, &gateway).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(*gateway.described.borrow(), 1);
    assert_eq!(ids_in(&library, &config.done_album).len(), 4);
}

#[test]
fn leftover_scratch_files_are_cleared_at_startup() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let export_dir = config.scratch_dir.join(SCRATCH_SUBDIR);
    std::fs::create_dir_all(&export_dir).unwrap();
    std::fs::write(export_dir.join("IMG_9999.jpeg"), b"crash leftover").unwrap();
    let (library, _) = library_with_intake(&config, 2, 0);

    let summary = run(&config, &library, &CountingGateway::new()).unwrap();
    // A leftover file would have made every export ambiguous.
    assert_eq!((summary.succeeded, summary.failed), (2, 0));
    assert!(!export_dir.exists());
}

#[test]
fn user_files_in_the_scratch_path_are_never_deleted() {
    let root = tempfile::tempdir().unwrap();
    let pictures = root.path().join("Pictures");
    std::fs::create_dir(&pictures).unwrap();
    std::fs::write(pictures.join("holiday.txt"), b"notes").unwrap();
    std::fs::write(pictures.join("IMG_0001.jpeg"), b"a real photo").unwrap();
    let config = AppConfig {
        scratch_dir: pictures.clone(),
        ..test_config(&root)
    };
    let (library, _) = library_with_intake(&config, 3, 0);

    let summary = run(&config, &library, &CountingGateway::new()).unwrap();
    assert_eq!(summary.succeeded, 3);
    assert!(pictures.is_dir());
    assert_eq!(std::fs::read(pictures.join("holiday.txt")).unwrap(), b"notes");
    assert!(pictures.join("IMG_0001.jpeg").exists());
    assert!(!pictures.join(SCRATCH_SUBDIR).exists());
}

#[test]
fn interrupted_rebuild_is_recovered_on_the_next_run() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let (library, ids) = library_with_intake(&config, 25, 0);

    // The first removal dies after the unit is gone and before its
    // replacement got the unit's name.
    library.set_interrupt_rebuilds(true).unwrap();
    let first = CountingGateway::new();
    assert!(run(&config, &library, &first).is_err());
    assert_eq!(*first.described.borrow(), 10);
    assert!(library.album("ai-keywords #0").unwrap().is_none());
    assert_eq!(library.member_ids("ai-keywords #0 (rebuilding)").unwrap().len(), 15);

    library.set_interrupt_rebuilds(false).unwrap();
    let second = CountingGateway::new();
    let summary = run(&config, &library, &second).unwrap();
    assert_eq!(summary.recovered, 15);
    assert_eq!(summary.succeeded, 15);
    assert_eq!(*second.described.borrow(), 15);

    assert_eq!(ids_in(&library, &config.done_album), ids.iter().cloned().collect());
    let names = library.album_names().unwrap();
    assert!(!names.iter().any(|name| name.starts_with(&config.work_unit_prefix())));
}

#[test]
fn stranded_pending_album_is_drained() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let library = MemoryLibrary::new();
    let bytes = png_bytes();
    let ids: Vec<String> = (0..5)
        .map(|i| {
            let name = format!("IMG_{i:04}.png");
            let artifact = ExportArtifact::new(name.clone(), bytes.clone());
            library.insert_photo(&name, &[], vec![artifact]).unwrap().id
        })
        .collect();
    let pending = library.create_album("ai-keywords #0 (rebuilding)").unwrap();
    library.add_members(&pending, &ids).unwrap();
    library.create_album("ai-keywords #0").unwrap();

    let summary = run(&config, &library, &CountingGateway::new()).unwrap();
    assert_eq!(summary.recovered, 5);
    assert_eq!((summary.succeeded, summary.failed), (5, 0));
    assert_eq!(ids_in(&library, &config.done_album).len(), 5);
    assert!(library.album("ai-keywords #0 (rebuilding)").unwrap().is_none());
}

#[test]
fn punctuation_only_reply_is_a_failure() {
    struct DashGateway;
    impl ModelGateway for DashGateway {
        fn describe_image(&self, _jpeg_base64: &str) -> Result<String> {
            Ok("-, ..., 1. -".to_string())
        }
        fn translate_keywords(&self, _keywords: &[String], _language: Language) -> Result<String> {
            unreachable!("translation is disabled")
        }
    }

    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let library = MemoryLibrary::new();
    let intake = library.create_album(&config.intake_album).unwrap();
    let item = library
        .insert_photo("IMG_0001.png", &["keep", "tree (AI)"], vec![ExportArtifact::new("IMG_0001.png", png_bytes())])
        .unwrap();
    library.add_members(&intake, &[item.id.clone()]).unwrap();

    let summary = run(&config, &library, &DashGateway).unwrap();
    assert_eq!((summary.succeeded, summary.failed), (0, 1));
    assert_eq!(library.photo(&item.id).unwrap().keywords, vec!["keep", "tree (AI)"]);
    assert_eq!(ids_in(&library, &config.failed_album).len(), 1);
}

#[test]
fn empty_intake_is_a_no_op() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(&root);
    let library = MemoryLibrary::new();

    let summary = run(&config, &library, &CountingGateway::new()).unwrap();
    assert_eq!(summary.work_units, 0);
    let mut names = library.album_names().unwrap();
    names.sort();
    assert_eq!(names, vec!["ai-keywords", "ai-keywords DONE", "ai-keywords NOT DONE"]);
}
