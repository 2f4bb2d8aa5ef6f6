use image::{ImageFormat, Rgb, RgbImage};
use linkdrop_core::{FileRecord, FileRepository};
use linkdrop_storage::{JsonFileRepository, JsonStore};
use linkdrop_upload::{IncomingFile, Rejection, UploadError, UploadService, UploadSettings};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

async fn service(root: &Path) -> UploadService {
    let repo: JsonFileRepository = JsonStore::open(root.join("data").join("files.json"))
        .await
        .unwrap();
    let repo: Arc<dyn FileRepository> = Arc::new(repo);
    let service = UploadService::new(
        repo,
        UploadSettings::builder()
            .uploads_dir(root.join("uploads"))
            .build(),
    )
    .unwrap();
    service.ensure_dirs().await.unwrap();
    service
}

fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn rejection(result: Result<Vec<FileRecord>, UploadError>) -> Rejection {
    match result {
        Err(UploadError::Rejected { reason, .. }) => reason,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn image_upload_is_stored_under_images_with_compression_info() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path()).await;
    let png = noisy_png(2200, 300);

    let records = service
        .upload(
            vec![IncomingFile::new("holiday.PNG", Some("image/png".into()), png.clone())],
            None,
        )
        .await
        .unwrap();

    let record = &records[0];
    assert!(record.is_image);
    assert_eq!(record.file_id.as_str().len(), 8);
    assert!(record.stored_filename.ends_with(".png"));
    assert_eq!(record.stored_filename.len(), 12 + ".png".len());
    assert!(record.path.starts_with(dir.path().join("uploads").join("images")));
    assert_eq!(record.size, png.len() as u64);

    let info = record.compression.unwrap();
    assert_eq!(info.original_size, png.len() as u64);
    let on_disk = tokio::fs::read(&record.path).await.unwrap();
    assert_eq!(on_disk.len() as u64, info.compressed_size);
    if info.compressed {
        let decoded = image::load_from_memory(&on_disk).unwrap();
        assert_eq!(decoded.width(), 2048);
        assert!(info.compressed_size < info.original_size);
    } else {
        assert_eq!(on_disk, png);
    }
}

#[tokio::test]
async fn metadata_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let service = service(dir.path()).await;
        service
            .upload(
                vec![IncomingFile::new("report.pdf", Some("application/pdf".into()), b"%PDF-1.4".to_vec())],
                Some("agent/1.0".into()),
            )
            .await
            .unwrap()
            .remove(0)
            .file_id
    };

    let reopened = service(dir.path()).await;
    let record = reopened.info(&id).await.unwrap();
    assert_eq!(record.original_name, "report.pdf");
    assert_eq!(record.mimetype, "application/pdf");
    assert!(record.path.starts_with(dir.path().join("uploads").join("files")));
}

#[tokio::test]
async fn rejections_carry_their_reason() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path()).await;

    let reason = rejection(
        service
            .upload(vec![IncomingFile::new("tool.exe", None, vec![0u8; 4])], None)
            .await,
    );
    assert_eq!(reason, Rejection::DangerousExtension(".exe".into()));

    let reason = rejection(
        service
            .upload(
                vec![IncomingFile::new("photo.png", Some("image/jpeg".into()), vec![1, 2, 3])],
                None,
            )
            .await,
    );
    assert!(matches!(reason, Rejection::ExtensionMismatch { .. }));

    let reason = rejection(
        service
            .upload(
                vec![IncomingFile::new("big.txt", Some("text/plain".into()), vec![b'a'; 5 * 1024 * 1024 + 1])],
                None,
            )
            .await,
    );
    assert!(matches!(reason, Rejection::TooLarge { max_mib: 5, .. }));

    let reason = rejection(
        service
            .upload(
                vec![IncomingFile::new("fake.png", Some("image/png".into()), b"GIF89a junk".to_vec())],
                None,
            )
            .await,
    );
    assert_eq!(reason, Rejection::InvalidImage);

    assert!(service.list().await.unwrap().is_empty());
}
