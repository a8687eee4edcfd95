//! Multipart bodies for photo and file uploads.

use reqwest::blocking::multipart::{Form, Part};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ApiError, Result};

/// What a generic upload contains; sent to the server as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Photo,
    Document,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Photo => "photo",
            FileKind::Document => "document",
        }
    }
}

impl std::str::FromStr for FileKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "photo" => Ok(FileKind::Photo),
            "document" => Ok(FileKind::Document),
            _ => Err(ApiError::InvalidInput(format!(
                "Invalid file type: {s}. Valid options: photo, document"
            ))),
        }
    }
}

/// Metadata sent alongside a plant photo.
#[derive(Debug, Clone, Copy)]
pub struct PlantPhotoMeta<'a> {
    pub username: &'a str,
    /// Parent or child name shown with the photo.
    pub name: &'a str,
    pub plant_stage: &'a str,
    pub description: &'a str,
}

/// A local file ready to be attached as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
}

impl UploadFile {
    /// Name a plant photo `plant_photo_<username>_<millis>.<ext>`.
    pub fn plant_photo(image_uri: &str, username: &str, now_millis: i64) -> Result<Self> {
        let path = local_path(image_uri);
        let ext = extension(&path)?;
        let mime = match ext.to_ascii_lowercase().as_str() {
            "jpg" => "image/jpeg".to_string(),
            other => format!("image/{other}"),
        };
        Ok(Self {
            file_name: format!("plant_photo_{username}_{now_millis}.{ext}"),
            path,
            mime,
        })
    }

    /// Name a generic upload `generic_file_<millis>.<ext>`.
    pub fn generic(file_uri: &str, kind: FileKind, now_millis: i64) -> Result<Self> {
        let path = local_path(file_uri);
        let ext = extension(&path)?;
        let mime = match (kind, ext.to_ascii_lowercase().as_str()) {
            (FileKind::Photo, "png") => "image/png",
            (FileKind::Photo, "jpg" | "jpeg") => "image/jpeg",
            (FileKind::Document, "pdf") => "application/pdf",
            _ => "application/octet-stream",
        };
        Ok(Self {
            file_name: format!("generic_file_{now_millis}.{ext}"),
            path,
            mime: mime.to_string(),
        })
    }

    pub fn into_part(self) -> Result<Part> {
        let bytes = fs::read(&self.path).map_err(|e| {
            ApiError::InvalidInput(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        Ok(Part::bytes(bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)?)
    }
}

pub fn plant_photo_form(meta: PlantPhotoMeta<'_>, photo: UploadFile) -> Result<Form> {
    Ok(Form::new()
        .text("username", meta.username.to_string())
        .text("name", meta.name.to_string())
        .text("plant_stage", meta.plant_stage.to_string())
        .text("description", meta.description.to_string())
        .part("photo", photo.into_part()?))
}

pub fn generic_file_form(
    file: UploadFile,
    kind: FileKind,
    extra: &BTreeMap<String, String>,
) -> Result<Form> {
    let mut form = Form::new()
        .part("file", file.into_part()?)
        .text("type", kind.as_str());
    for (key, value) in extra {
        form = form.text(key.clone(), value.clone());
    }
    Ok(form)
}

/// Accept both plain paths and `file://` URIs.
pub fn local_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

fn extension(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "Cannot determine file type of {} (no extension)",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_photo_naming() {
        let file = UploadFile::plant_photo("file:///sdcard/DCIM/IMG_0042.JPG", "CGPV104", 1700000000000)
            .unwrap();
        assert_eq!(file.path, PathBuf::from("/sdcard/DCIM/IMG_0042.JPG"));
        assert_eq!(file.file_name, "plant_photo_CGPV104_1700000000000.JPG");
        assert_eq!(file.mime, "image/jpeg");

        let png = UploadFile::plant_photo("/tmp/leaf.png", "u", 1).unwrap();
        assert_eq!(png.mime, "image/png");
        assert!(png.file_name.ends_with(".png"));
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        assert!(matches!(
            UploadFile::plant_photo("/tmp/photo", "u", 1),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generic_mime_depends_on_kind() {
        let doc = UploadFile::generic("/tmp/pledge.pdf", FileKind::Document, 5).unwrap();
        assert_eq!(doc.file_name, "generic_file_5.pdf");
        assert_eq!(doc.mime, "application/pdf");

        let pdf_as_photo = UploadFile::generic("/tmp/pledge.pdf", FileKind::Photo, 5).unwrap();
        assert_eq!(pdf_as_photo.mime, "application/octet-stream");

        let jpeg = UploadFile::generic("/tmp/a.jpeg", FileKind::Photo, 5).unwrap();
        assert_eq!(jpeg.mime, "image/jpeg");
    }

    #[test]
    fn test_unreadable_file_fails_before_sending() {
        let file = UploadFile::plant_photo("/definitely/not/here.jpg", "u", 1).unwrap();
        assert!(matches!(file.into_part(), Err(ApiError::InvalidInput(_))));
    }
}
