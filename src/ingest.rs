//! Picture pipelines: ingestion, re-crop and the record mutations.
//!
//! # Ingestion
//!
//! ```text
//! validate text → decode → create <id>/ → orig.<ext> → thumb.<ext>
//!               → top crop (best effort) → commit record
//! ```
//!
//! The record is committed last. If anything fails after the directory
//! exists, the directory is removed before the error is returned, so the
//! artifact store never holds files for a record that was not committed.
//!
//! # Re-crop
//!
//! The requested rectangle is clamped to the original's bounds. A crop
//! that is empty or covers the whole image just switches the record back to
//! the original. Otherwise `crop.<ext>` and `thumb_crop.<ext>` are written
//! first and the record is updated only once both are in place.
//!
//! Two concurrent re-crops of the same picture may interleave their file
//! writes; the last record commit wins.

use crate::error::{Error, Result};
use crate::imaging::operations::{encode_image, find_top_crop, make_crop, make_thumbnail};
use crate::imaging::{
    BackendError, DecodedImage, ImageBackend, PictureFormat, clamp_crop_rect,
    disable_crop_condition,
};
use crate::library::Library;
use crate::types::{ANONYMOUS_UPLOADER, Content, CropRequest, PictureRecord, Rect};
use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Printable text accepted in titles and bodies: ASCII word characters,
/// whitespace, German umlauts and a small set of punctuation.
static PLAIN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z0-9_\t\n\f\r äöüÄÖÜ!?"'()&#@=+,\-\[\]]*$"#)
        .expect("plain text pattern is valid")
});

/// Check a free-text field against the plain-text pattern.
pub fn validate_text(field: &str, value: &str) -> Result<()> {
    if PLAIN_TEXT.is_match(value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{field} contains unsupported characters"
        )))
    }
}

fn validate_content(content: &Content) -> Result<()> {
    validate_text("title", &content.title)?;
    validate_text("text", &content.text)
}

/// Everything the caller knows about an uploaded picture.
#[derive(Debug, Clone, Default)]
pub struct PictureUpload {
    /// Encoded PNG or JPEG bytes.
    pub bytes: Vec<u8>,
    /// File name supplied by the client, kept for reference only.
    pub filename: String,
    /// MIME type declared by the client, if any. Must name PNG or JPEG;
    /// the bytes decide the stored format.
    pub content_type: Option<String>,
    pub content: Content,
    /// `None` records the anonymous uploader.
    pub uploader: Option<String>,
}

impl<B: ImageBackend> Library<B> {
    /// Ingest an uploaded picture and commit its record.
    pub fn ingest_picture(&self, upload: PictureUpload) -> Result<PictureRecord> {
        validate_content(&upload.content)?;
        if let Some(mime) = &upload.content_type
            && PictureFormat::from_mime(mime).is_none()
        {
            return Err(Error::UnsupportedFormat(mime.clone()));
        }
        if upload.bytes.len() as u64 > self.max_upload_bytes {
            return Err(Error::InvalidInput(format!(
                "upload of {} bytes exceeds the {} byte limit",
                upload.bytes.len(),
                self.max_upload_bytes
            )));
        }

        let decoded = self.backend.decode(&upload.bytes)?;

        let id = Uuid::new_v4();
        self.pictures.create_record_dir(id)?;

        match self.build_picture(id, &decoded, &upload) {
            Ok(record) => {
                tracing::info!(
                    %id,
                    format = %decoded.format,
                    width = record.original_bounds.width,
                    height = record.original_bounds.height,
                    "picture ingested"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "picture ingestion failed");
                self.rollback(&self.pictures, id);
                Err(e)
            }
        }
    }

    fn build_picture(
        &self,
        id: Uuid,
        decoded: &DecodedImage,
        upload: &PictureUpload,
    ) -> Result<PictureRecord> {
        let format = decoded.format;
        let config = &self.derivatives;

        let original_name = format.original_name();
        let original = encode_image(&self.backend, &decoded.image, format, config)?;
        self.pictures.write_image(id, &original_name, &original)?;

        let thumbnail_name = format.thumbnail_name();
        let thumbnail = make_thumbnail(&self.backend, &decoded.image, format, config)?;
        self.pictures.write_image(id, &thumbnail_name, &thumbnail)?;

        let top_crop = match find_top_crop(&self.backend, &decoded.image, config) {
            Ok(rect) => rect,
            Err(e) => {
                self.diagnostics.saliency_failed(id, &e);
                Rect::default()
            }
        };

        let mut record = PictureRecord::new(
            id,
            upload.content.clone(),
            decoded.bounds(),
            original_name,
            thumbnail_name,
        );
        record.top_crop = top_crop;
        record.uploaded_filename = upload.filename.clone();
        record.uploader = upload
            .uploader
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_UPLOADER.to_string());

        self.repo.put(&record)?;
        Ok(record)
    }

    /// Apply a user-chosen crop to a stored picture.
    pub fn recrop_picture(&self, id: Uuid, request: CropRequest) -> Result<PictureRecord> {
        if request.width < 0 || request.height < 0 {
            return Err(Error::InvalidInput(format!(
                "crop size {}x{} is negative",
                request.width, request.height
            )));
        }

        let mut record: PictureRecord = self.repo.get(id)?;
        let rect = clamp_crop_rect(request, record.original_bounds);

        if disable_crop_condition(rect, record.original_bounds) {
            record.use_cropped = false;
            record.edited = Utc::now();
            self.repo.put(&record)?;
            tracing::info!(%id, ?request, "crop is a no-op, showing original");
            return Ok(record);
        }

        let bytes = self
            .pictures
            .read_image(id, &record.original_path)
            .map_err(Error::Artifact)?;
        let decoded = self.backend.decode(&bytes).map_err(Error::Imaging)?;
        if decoded.bounds() != record.original_bounds {
            return Err(Error::Imaging(BackendError::ProcessingFailed(format!(
                "stored original is {}x{}, record says {}x{}",
                decoded.image.width(),
                decoded.image.height(),
                record.original_bounds.width,
                record.original_bounds.height
            ))));
        }

        let format = decoded.format;
        let variant = make_crop(&self.backend, &decoded.image, rect, format, &self.derivatives)
            .map_err(Error::Imaging)?;

        let crop_name = format.crop_name();
        let thumb_crop_name = format.thumb_crop_name();
        self.pictures
            .write_image(id, &crop_name, &variant.crop)
            .map_err(Error::Artifact)?;
        self.pictures
            .write_image(id, &thumb_crop_name, &variant.thumbnail)
            .map_err(Error::Artifact)?;

        record.cropped_bounds = rect;
        record.cropped_path = crop_name;
        record.thumb_cropped_path = thumb_crop_name;
        record.use_cropped = true;
        record.edited = Utc::now();
        self.repo.put(&record)?;

        tracing::info!(%id, ?rect, "picture re-cropped");
        Ok(record)
    }

    /// Hide or show a picture. Setting the current value again still
    /// succeeds and stamps `edited`.
    pub fn set_picture_disabled(&self, id: Uuid, disabled: bool) -> Result<PictureRecord> {
        let mut record: PictureRecord = self.repo.get(id)?;
        record.disabled = disabled;
        record.edited = Utc::now();
        self.repo.put(&record)?;
        tracing::info!(%id, disabled, "picture visibility changed");
        Ok(record)
    }

    /// Replace the title and text of a picture.
    pub fn edit_picture_content(&self, id: Uuid, content: Content) -> Result<PictureRecord> {
        validate_content(&content)?;
        let mut record: PictureRecord = self.repo.get(id)?;
        record.content = content;
        record.edited = Utc::now();
        self.repo.put(&record)?;
        Ok(record)
    }

    /// Delete a picture record and all of its artifacts.
    pub fn delete_picture(&self, id: Uuid) -> Result<()> {
        // Surface NotFound before touching anything
        let _: PictureRecord = self.repo.get(id)?;
        self.repo.delete::<PictureRecord>(id)?;
        self.pictures.delete_record_dir(id)?;
        tracing::info!(%id, "picture deleted");
        Ok(())
    }

    pub fn get_picture(&self, id: Uuid) -> Result<PictureRecord> {
        Ok(self.repo.get(id)?)
    }

    /// All pictures, most recently uploaded first.
    pub fn list_pictures(&self) -> Result<Vec<PictureRecord>> {
        let mut records: Vec<PictureRecord> = self.repo.list_all()?;
        records.sort_by(|a, b| b.uploaded.cmp(&a.uploaded));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticEvent;
    use crate::error::ErrorKind;
    use crate::imaging::backend::tests::{Op, RecordedOp};
    use crate::test_helpers::{TestLibrary, encode_test_image, upload};

    // =========================================================================
    // Text validation
    // =========================================================================

    #[test]
    fn plain_text_accepts_words_umlauts_and_punctuation() {
        for ok in [
            "",
            "Sunset over the lake",
            "Grüne Äpfel aus Köln!",
            "What's up? (really) #1 @home = fun + more, [ok] & - \"quoted\"",
            "line one\r\nline two\ttabbed",
        ] {
            validate_text("title", ok).unwrap_or_else(|e| panic!("{ok:?}: {e}"));
        }
    }

    #[test]
    fn plain_text_rejects_markup_and_other_symbols() {
        for bad in ["<script>", "a/b", "50%", "semi;colon", "dot."] {
            let err = validate_text("title", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad:?}");
        }
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    #[test]
    fn ingest_writes_original_and_thumbnail() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 800, 600)).unwrap();

        assert_eq!(record.original_path, "orig.png");
        assert_eq!(record.thumbnail_path, "thumb.png");
        assert_eq!(record.original_bounds, Rect::from_size(800, 600));
        assert!(!record.use_cropped);
        assert_eq!(record.uploader, ANONYMOUS_UPLOADER);
        assert_eq!(record.uploaded_filename, "test.png");

        for path in record.artifact_paths() {
            assert!(fx.library.pictures().exists(record.id, path), "{path}");
        }

        let thumb = fx.library.pictures().read_image(record.id, "thumb.png").unwrap();
        let thumb = fx.library.backend().decode(&thumb).unwrap();
        assert_eq!(thumb.bounds(), Rect::from_size(400, 300));
    }

    #[test]
    fn ingest_computes_top_crop_at_target_ratio() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Jpeg, 800, 400)).unwrap();

        assert_eq!(record.original_path, "orig.jpg");
        assert_eq!((record.top_crop.width, record.top_crop.height), (533, 400));
        assert!(record.original_bounds.contains(&record.top_crop));
    }

    #[test]
    fn ingest_records_named_uploader() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Png, 50, 50);
        up.uploader = Some("maria".into());
        let record = fx.library.ingest_picture(up).unwrap();
        assert_eq!(record.uploader, "maria");
    }

    #[test]
    fn ingest_round_trips_through_repository() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 120, 90)).unwrap();
        assert_eq!(fx.library.get_picture(record.id).unwrap(), record);
    }

    #[test]
    fn ingest_rejects_script_title_before_any_work() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Png, 50, 50);
        up.content.title = "<script>".into();

        let err = fx.library.ingest_picture(up).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(fx.library.backend().get_operations().is_empty());
        assert_eq!(fx.picture_dirs(), 0);
    }

    #[test]
    fn ingest_rejects_oversized_upload() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Png, 10, 10);
        up.bytes = vec![0; fx.library.max_upload_bytes() as usize + 1];

        let err = fx.library.ingest_picture(up).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn ingest_rejects_unsupported_declared_type() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Png, 10, 10);
        up.content_type = Some("image/webp".into());

        let err = fx.library.ingest_picture(up).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(fx.library.backend().get_operations().is_empty());
    }

    #[test]
    fn ingest_accepts_declared_jpeg_type() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Jpeg, 10, 10);
        up.content_type = Some("image/jpg".into());
        assert!(fx.library.ingest_picture(up).is_ok());
    }

    #[test]
    fn ingest_rejects_unsupported_format() {
        let fx = TestLibrary::new();
        let mut up = upload(PictureFormat::Png, 10, 10);
        up.bytes = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();

        let err = fx.library.ingest_picture(up).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(fx.picture_dirs(), 0);
    }

    #[test]
    fn thumbnail_failure_rolls_back_everything() {
        let fx = TestLibrary::failing_on(Op::Thumbnail);
        let err = fx
            .library
            .ingest_picture(upload(PictureFormat::Png, 200, 100))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.picture_dirs(), 0);
        assert!(fx.library.list_pictures().unwrap().is_empty());
        // The original was written before the failure
        assert!(fx.library.backend().get_operations().contains(&RecordedOp::Encode {
            format: PictureFormat::Png,
            width: 200,
            height: 100
        }));
    }

    #[test]
    fn thumbnail_store_failure_rolls_back_everything() {
        let fx = TestLibrary::new();
        // The original's encode passes, the thumbnail's fails after the
        // original is already on disk
        fx.library.backend().arm_after(Op::Encode, 1);

        let err = fx
            .library
            .ingest_picture(upload(PictureFormat::Jpeg, 200, 100))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.picture_dirs(), 0);
        assert!(fx.library.list_pictures().unwrap().is_empty());
        let encodes = fx
            .library
            .backend()
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count();
        assert_eq!(encodes, 2);
    }

    #[test]
    fn saliency_failure_is_reported_not_fatal() {
        let fx = TestLibrary::failing_on(Op::SaliencyCrop);
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 200, 100)).unwrap();

        assert_eq!(record.top_crop, Rect::default());
        assert!(matches!(
            fx.diagnostics.events().as_slice(),
            [DiagnosticEvent::SaliencyFailed { id, .. }] if *id == record.id
        ));
        assert_eq!(fx.library.list_pictures().unwrap().len(), 1);
    }

    // =========================================================================
    // Re-crop
    // =========================================================================

    #[test]
    fn recrop_shifts_negative_origin_into_bounds() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Jpeg, 2000, 1000)).unwrap();

        let cropped = fx
            .library
            .recrop_picture(record.id, CropRequest::new(-50, 0, 1800, 900))
            .unwrap();

        assert!(cropped.use_cropped);
        assert_eq!(cropped.cropped_bounds.x, 0);
        assert!(cropped.cropped_bounds.width <= 1800);
        assert!(record.original_bounds.contains(&cropped.cropped_bounds));
        assert_eq!(cropped.cropped_path, "crop.jpg");
        assert_eq!(cropped.thumb_cropped_path, "thumb_crop.jpg");
        assert!(cropped.edited >= record.edited);

        let crop = fx.library.pictures().read_image(record.id, "crop.jpg").unwrap();
        let crop = fx.library.backend().decode(&crop).unwrap();
        assert_eq!(
            (crop.image.width(), crop.image.height()),
            (cropped.cropped_bounds.width, cropped.cropped_bounds.height)
        );
        assert_eq!(fx.library.get_picture(record.id).unwrap(), cropped);
    }

    #[test]
    fn recrop_full_image_disables_crop_without_file_io() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 300, 200)).unwrap();
        let ops_before = fx.library.backend().get_operations().len();

        let updated = fx
            .library
            .recrop_picture(record.id, CropRequest::new(0, 0, 300, 200))
            .unwrap();

        assert!(!updated.use_cropped);
        assert!(updated.cropped_path.is_empty());
        assert_eq!(fx.library.backend().get_operations().len(), ops_before);
        assert!(!fx.library.pictures().exists(record.id, "crop.png"));
    }

    #[test]
    fn recrop_after_crop_can_switch_back_to_original() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 300, 200)).unwrap();
        fx.library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap();

        let updated = fx
            .library
            .recrop_picture(record.id, CropRequest::new(0, 0, 0, 0))
            .unwrap();
        assert!(!updated.use_cropped);
        assert_eq!(updated.active_bounds(), record.original_bounds);
    }

    #[test]
    fn recrop_negative_size_is_invalid() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 30, 20)).unwrap();
        let err = fx
            .library
            .recrop_picture(record.id, CropRequest::new(0, 0, -5, 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn recrop_missing_record_is_not_found() {
        let fx = TestLibrary::new();
        fx.library.ingest_picture(upload(PictureFormat::Png, 30, 20)).unwrap();
        let err = fx
            .library
            .recrop_picture(Uuid::new_v4(), CropRequest::new(0, 0, 10, 10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn recrop_decode_failure_leaves_record_untouched() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 300, 200)).unwrap();
        fx.library.pictures().write_image(record.id, "orig.png", b"corrupt").unwrap();

        let err = fx
            .library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.library.get_picture(record.id).unwrap(), record);
    }

    #[test]
    fn recrop_encode_failure_leaves_record_untouched() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 300, 200)).unwrap();
        fx.library.backend().arm(Op::Encode);

        let err = fx
            .library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.library.get_picture(record.id).unwrap(), record);
        assert!(!fx.library.pictures().exists(record.id, "crop.png"));
        assert!(!fx.library.pictures().exists(record.id, "thumb_crop.png"));
    }

    #[test]
    fn recrop_crop_failure_leaves_record_untouched() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Jpeg, 300, 200)).unwrap();
        fx.library.backend().arm(Op::Crop);

        let err = fx
            .library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(fx.library.get_picture(record.id).unwrap(), record);
        assert!(!fx.library.pictures().exists(record.id, "crop.jpg"));

        fx.library.backend().disarm();
        let cropped = fx
            .library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap();
        assert!(cropped.use_cropped);
    }

    #[test]
    fn recrop_with_missing_original_is_internal() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 300, 200)).unwrap();
        std::fs::remove_file(fx.library.pictures().record_dir(record.id).join("orig.png")).unwrap();

        let err = fx
            .library
            .recrop_picture(record.id, CropRequest::new(10, 10, 100, 100))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    #[test]
    fn disable_is_idempotent_and_stamps_edited() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 30, 20)).unwrap();

        let first = fx.library.set_picture_disabled(record.id, true).unwrap();
        let second = fx.library.set_picture_disabled(record.id, true).unwrap();

        assert!(first.disabled && second.disabled);
        assert!(second.edited >= first.edited);
        let stored = fx.library.get_picture(record.id).unwrap();
        assert_eq!(stored, second);

        let enabled = fx.library.set_picture_disabled(record.id, false).unwrap();
        assert!(!enabled.disabled);
    }

    #[test]
    fn edit_content_validates_and_persists() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 30, 20)).unwrap();

        let content = Content {
            title: "New title".into(),
            text: "Some words".into(),
        };
        let edited = fx.library.edit_picture_content(record.id, content.clone()).unwrap();
        assert_eq!(edited.content, content);

        let err = fx
            .library
            .edit_picture_content(
                record.id,
                Content {
                    title: "ok".into(),
                    text: "<b>bold</b>".into(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(fx.library.get_picture(record.id).unwrap().content, content);
    }

    #[test]
    fn delete_removes_record_and_directory() {
        let fx = TestLibrary::new();
        let record = fx.library.ingest_picture(upload(PictureFormat::Png, 30, 20)).unwrap();

        fx.library.delete_picture(record.id).unwrap();

        assert_eq!(fx.library.get_picture(record.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(!fx.library.pictures().record_dir(record.id).exists());
        assert_eq!(
            fx.library.delete_picture(record.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn list_pictures_is_newest_first() {
        let fx = TestLibrary::new();
        let first = fx.library.ingest_picture(upload(PictureFormat::Png, 20, 20)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = fx.library.ingest_picture(upload(PictureFormat::Png, 20, 20)).unwrap();

        let ids: Vec<Uuid> = fx.library.list_pictures().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn jpeg_payload_is_accepted() {
        let fx = TestLibrary::new();
        let up = PictureUpload {
            bytes: encode_test_image(PictureFormat::Jpeg, 64, 64),
            ..PictureUpload::default()
        };
        let record = fx.library.ingest_picture(up).unwrap();
        assert_eq!(record.thumbnail_path, "thumb.jpg");
    }
}
