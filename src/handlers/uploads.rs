use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use log::warn;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::AppError,
    models::{ClassExercise, ExerciseAnswer, Role},
    services::{ActivityServiceTrait, FileStore, StoredFile},
    types::Result,
};

use super::ActivityServiceType;

/// Plain form values are ids, anything longer is rejected
const MAX_TEXT_FIELD_BYTES: usize = 1024;

/// Non-file parts accepted in one request
const MAX_TEXT_FIELDS: usize = 8;

struct UploadedFile {
    field: String,
    file_name: String,
    bytes: Vec<u8>,
}

/// A fully read multipart form
#[derive(Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation(format!("{}: This field is required", name)))
    }

    fn uuid(&self, name: &str) -> Result<Uuid> {
        let value = self.text(name)?;
        Uuid::parse_str(value)
            .map_err(|_| AppError::Validation(format!("{}: '{}' is not a valid id", name, value)))
    }

    fn take_file(&mut self, name: &str) -> Result<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.field == name)
            .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
        Ok(self.files.remove(index))
    }
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid multipart payload: {}", e))
}

/// Reads one part, charging its bytes against the request-wide `budget`
async fn read_field(field: &mut Field, limit: usize, budget: &mut usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::Validation(format!(
                "Upload exceeds the {} byte limit",
                limit
            )));
        }
        if chunk.len() > *budget {
            return Err(AppError::Validation(
                "Request exceeds the total upload size limit".to_string(),
            ));
        }
        *budget -= chunk.len();
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Reads every part, enforcing the part count and size limits while streaming
async fn read_form(mut payload: Multipart, store: &FileStore) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let mut budget = store.max_request_bytes();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);

        match file_name {
            Some(file_name) => {
                if form.files.len() >= store.max_files() {
                    return Err(AppError::Validation(format!(
                        "At most {} files can be uploaded at once",
                        store.max_files()
                    )));
                }
                let bytes = read_field(&mut field, store.max_file_bytes(), &mut budget).await?;
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    bytes,
                });
            }
            None => {
                if form.fields.len() >= MAX_TEXT_FIELDS {
                    return Err(AppError::Validation("Too many form fields".to_string()));
                }
                let bytes = read_field(&mut field, MAX_TEXT_FIELD_BYTES, &mut budget).await?;
                let value = String::from_utf8(bytes)
                    .map_err(|_| AppError::Validation(format!("{}: must be UTF-8 text", name)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Upload route handler, stores every `files` part
pub async fn upload_handler(
    user: AuthUser,
    payload: Multipart,
    store: web::Data<FileStore>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin, Role::Professor])?;

    let form = read_form(payload, &store).await?;
    let files: Vec<&UploadedFile> = form.files.iter().filter(|f| f.field == "files").collect();
    if files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let urls: Vec<String> = save_all(&store, &files)
        .await?
        .into_iter()
        .map(|f| f.url)
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "urls": urls })))
}

/// Stores every file, or none: files already written are removed when one fails
async fn save_all(store: &FileStore, files: &[&UploadedFile]) -> Result<Vec<StoredFile>> {
    let mut saved: Vec<StoredFile> = Vec::with_capacity(files.len());
    for file in files {
        match store.save(&file.file_name, &file.bytes).await {
            Ok(stored) => saved.push(stored),
            Err(e) => {
                for stored in &saved {
                    discard(store, stored).await;
                }
                return Err(e.into());
            }
        }
    }
    Ok(saved)
}

/// Upload assignment route handler, attaches the file to an activity as a class exercise
pub async fn upload_assignment_handler(
    user: AuthUser,
    payload: Multipart,
    store: web::Data<FileStore>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    user.require_role(&[Role::Admin, Role::Professor])?;

    let mut form = read_form(payload, &store).await?;
    let activity_id = form.uuid("classId")?;
    let file = form.take_file("file")?;

    let stored = store.save(&file.file_name, &file.bytes).await?;
    let exercise = ClassExercise {
        exercise_id: Uuid::new_v4().to_string(),
        title: stored.original_name.clone(),
        description: "Uploaded assignment".to_string(),
        attached_files_url: Some(stored.url.clone()),
    };

    if let Err(e) = service.attach_class_exercise(&activity_id, exercise, &user.claims).await {
        discard(&store, &stored).await;
        return Err(e.into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "url": stored.url,
        "message": "Assignment uploaded successfully",
    })))
}

/// Upload exercise route handler, attaches the file to the caller's own student record
pub async fn upload_exercise_handler(
    user: AuthUser,
    payload: Multipart,
    store: web::Data<FileStore>,
    service: web::Data<ActivityServiceType>,
) -> Result<impl Responder> {
    let mut form = read_form(payload, &store).await?;
    let activity_id = form.uuid("classId")?;
    let student_id = form.text("studentId")?.to_string();
    if !user.is_self(&student_id) {
        return Err(AppError::Forbidden(
            "You can only upload your own exercises".to_string(),
        ));
    }
    let file = form.take_file("file")?;

    let stored = store.save(&file.file_name, &file.bytes).await?;
    let answer = ExerciseAnswer {
        exercise_id: Uuid::new_v4().to_string(),
        answer: "Uploaded exercise".to_string(),
        attached_files_url: Some(stored.url.clone()),
    };

    if let Err(e) = service
        .attach_student_answer(&activity_id, &student_id, answer, &user.claims)
        .await
    {
        discard(&store, &stored).await;
        return Err(e.into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "url": stored.url,
        "message": "Exercise uploaded successfully",
    })))
}

async fn discard(store: &FileStore, stored: &StoredFile) {
    if let Err(e) = store.remove(stored).await {
        warn!("Failed to remove orphaned upload {}: {}", stored.url, e);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::http::header::{self, HeaderMap, HeaderValue};
    use actix_web::web::Bytes;
    use futures_util::stream;

    use super::*;
    use crate::config::UploadConfig;

    const BOUNDARY: &str = "classroom-boundary";

    fn store(max_file_bytes: usize, max_files: usize, max_request_bytes: usize) -> (FileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("classroom-form-{}", Uuid::new_v4()));
        let config = UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            max_file_bytes,
            max_files,
            max_request_bytes,
        };
        (FileStore::new(&config), dir)
    }

    /// (field name, optional file name, content)
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", BOUNDARY)).unwrap(),
        );
        let chunks = vec![Ok::<_, actix_web::error::PayloadError>(Bytes::from(body))];
        Multipart::new(&headers, stream::iter(chunks))
    }

    fn uploaded(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            field: "files".into(),
            file_name: name.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_form_field_accessors() {
        let id = Uuid::new_v4();
        let mut form = UploadForm::default();
        form.fields.insert("classId".into(), format!(" {} ", id));
        form.fields.insert("studentId".into(), "  ".into());
        form.files.push(UploadedFile {
            field: "file".into(),
            file_name: "a.txt".into(),
            bytes: b"a".to_vec(),
        });

        assert_eq!(form.uuid("classId").unwrap(), id);
        assert!(matches!(form.text("studentId"), Err(AppError::Validation(_))));
        assert!(matches!(form.uuid("missing"), Err(AppError::Validation(_))));
        assert_eq!(form.take_file("file").unwrap().file_name, "a.txt");
        assert!(form.take_file("file").is_err());
    }

    #[actix_web::test]
    async fn test_read_form_collects_fields_and_files() {
        let (store, _) = store(64, 2, 256);
        let payload = multipart(&[
            ("classId", None, "abc"),
            ("files", Some("one.txt"), "first"),
            ("files", Some("two.txt"), "second"),
        ]);

        let form = read_form(payload, &store).await.unwrap();
        assert_eq!(form.text("classId").unwrap(), "abc");
        assert_eq!(form.files.len(), 2);
        assert_eq!(form.files[1].file_name, "two.txt");
        assert_eq!(form.files[1].bytes, b"second");
    }

    #[actix_web::test]
    async fn test_read_form_limits_file_count() {
        let (store, _) = store(64, 2, 1024);
        let payload = multipart(&[
            ("files", Some("a.txt"), "a"),
            ("files", Some("b.txt"), "b"),
            ("files", Some("c.txt"), "c"),
        ]);

        let err = read_form(payload, &store).await.err().unwrap();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("At most 2 files")));
    }

    #[actix_web::test]
    async fn test_read_form_limits_total_size() {
        let (store, _) = store(10, 5, 15);
        let payload = multipart(&[
            ("files", Some("a.txt"), "0123456789"),
            ("files", Some("b.txt"), "0123456789"),
        ]);

        let err = read_form(payload, &store).await.err().unwrap();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("total upload size")));
    }

    #[actix_web::test]
    async fn test_save_all_removes_earlier_files_on_failure() {
        let (store, dir) = store(4, 5, 64);
        let small = uploaded("small.txt", b"ok");
        let big = uploaded("big.txt", b"too large");

        let err = save_all(&store, &[&small, &big]).await.err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
