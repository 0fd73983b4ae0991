//! Employee document vault.
//!
//! Uploads start out pending. A reviewer approves or rejects each pending
//! document exactly once. Deleting a document removes its stored file.

use crate::{
    entities::{
        DocumentType, Employee, EmployeeDocument, EmployeeDocumentModel, VerificationStatus,
        employee_document,
    },
    errors::{Error, FieldErrors, Result},
    services::FileStore,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// A document submitted for upload.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub document_type_id: Option<i64>,
    /// Client-side file name
    pub file_name: String,
    /// Declared content type; guessed from the extension when absent
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub notes: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// A stored document ready to be streamed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDownload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Content type for common upload extensions.
#[must_use]
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Finds a document of `employee_id`; a document of another employee is not found.
async fn find_document<C>(db: &C, employee_id: i64, document_id: i64) -> Result<EmployeeDocumentModel>
where
    C: ConnectionTrait,
{
    EmployeeDocument::find_by_id(document_id)
        .filter(employee_document::Column::EmployeeId.eq(employee_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Document", document_id))
}

/// Stores the file and records a pending document.
///
/// # Errors
/// - `NotFound` if the employee does not exist
/// - `Validation` if the document type or the file is missing, or the type is unknown
/// - storage and database errors; a file stored before a failed insert is removed
#[instrument(skip(db, files, upload), fields(file_name = %upload.file_name))]
pub async fn upload_document(
    db: &DatabaseConnection,
    files: &dyn FileStore,
    employee_id: i64,
    upload: DocumentUpload,
) -> Result<EmployeeDocumentModel> {
    if Employee::find_by_id(employee_id).count(db).await? == 0 {
        return Err(Error::not_found("Employee", employee_id));
    }

    let mut errors = FieldErrors::new();
    match upload.document_type_id {
        None => errors.add("document_type_id", "The document type id field is required."),
        Some(id) => {
            if DocumentType::find_by_id(id).count(db).await? == 0 {
                errors.add("document_type_id", "The selected document type id is invalid.");
            }
        }
    }
    if upload.bytes.is_empty() || upload.file_name.trim().is_empty() {
        errors.add("file", "The file field is required.");
    }
    errors.into_result()?;
    let document_type_id = upload
        .document_type_id
        .ok_or_else(|| Error::field("document_type_id", "The document type id field is required."))?;

    let mime_type = upload
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| guess_mime_type(&upload.file_name).to_string());
    let handle = files
        .put(&format!("documents/{employee_id}"), &upload.file_name, upload.bytes)
        .await?;

    let now = Utc::now();
    let inserted = async {
        let txn = db.begin().await?;
        let document = employee_document::ActiveModel {
            employee_id: Set(employee_id),
            document_type_id: Set(document_type_id),
            file_path: Set(handle.clone()),
            original_name: Set(upload.file_name.clone()),
            mime_type: Set(Some(mime_type)),
            notes: Set(upload.notes.filter(|n| !n.trim().is_empty())),
            verification_status: Set(VerificationStatus::Pending),
            expiry_date: Set(upload.expiry_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok::<_, Error>(document)
    }
    .await;

    match inserted {
        Ok(document) => {
            info!("Uploaded document {} for employee {}", document.id, employee_id);
            Ok(document)
        }
        Err(e) => {
            if let Err(cleanup) = files.delete(&handle).await {
                warn!("Failed to remove orphaned upload {}: {}", handle, cleanup);
            }
            Err(e)
        }
    }
}

/// Reads a stored document.
pub async fn download_document(
    db: &DatabaseConnection,
    files: &dyn FileStore,
    employee_id: i64,
    document_id: i64,
) -> Result<DocumentDownload> {
    let document = find_document(db, employee_id, document_id).await?;
    let bytes = files.get(&document.file_path).await?;
    Ok(DocumentDownload {
        mime_type: document
            .mime_type
            .unwrap_or_else(|| guess_mime_type(&document.original_name).to_string()),
        file_name: document.original_name,
        bytes,
    })
}

/// Deletes a document row, then its file (best effort).
#[instrument(skip(db, files))]
pub async fn delete_document(
    db: &DatabaseConnection,
    files: &dyn FileStore,
    employee_id: i64,
    document_id: i64,
) -> Result<EmployeeDocumentModel> {
    let document = find_document(db, employee_id, document_id).await?;
    EmployeeDocument::delete_by_id(document.id).exec(db).await?;

    if let Err(e) = files.delete(&document.file_path).await {
        warn!("Failed to remove document file {}: {}", document.file_path, e);
    }
    info!("Deleted document {} of employee {}", document_id, employee_id);
    Ok(document)
}

async fn review(
    db: &DatabaseConnection,
    employee_id: i64,
    document_id: i64,
    outcome: VerificationStatus,
) -> Result<EmployeeDocumentModel> {
    let txn = db.begin().await?;
    let document = find_document(&txn, employee_id, document_id).await?;
    if document.verification_status != VerificationStatus::Pending {
        return Err(Error::InvalidState {
            message: format!(
                "Only pending documents can be reviewed; this document is already {}.",
                document.verification_status.as_str()
            ),
        });
    }

    let mut active: employee_document::ActiveModel = document.into();
    active.verification_status = Set(outcome);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!("Document {} marked {}", document_id, outcome.as_str());
    Ok(updated)
}

/// Marks a pending document verified.
#[instrument(skip(db))]
pub async fn approve_document(
    db: &DatabaseConnection,
    employee_id: i64,
    document_id: i64,
) -> Result<EmployeeDocumentModel> {
    review(db, employee_id, document_id, VerificationStatus::Verified).await
}

/// Marks a pending document rejected.
#[instrument(skip(db))]
pub async fn reject_document(
    db: &DatabaseConnection,
    employee_id: i64,
    document_id: i64,
) -> Result<EmployeeDocumentModel> {
    review(db, employee_id, document_id, VerificationStatus::Rejected).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryFileStore;
    use crate::test_utils::*;

    fn passport(document_type_id: i64) -> DocumentUpload {
        DocumentUpload {
            document_type_id: Some(document_type_id),
            file_name: "x.pdf".to_string(),
            bytes: b"%PDF-1.4 scan".to_vec(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upload_approve_once() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let files = MemoryFileStore::new();
        let employee = create_test_employee(&db, "Ines Costa", "ines@example.com").await?;

        let doc = upload_document(&db, &files, employee.id, passport(reference.document_type_id)).await?;
        assert_eq!(doc.verification_status, VerificationStatus::Pending);
        assert_eq!(doc.mime_type.as_deref(), Some("application/pdf"));

        let approved = approve_document(&db, employee.id, doc.id).await?;
        assert_eq!(approved.verification_status, VerificationStatus::Verified);
        assert!(matches!(
            approve_document(&db, employee.id, doc.id).await,
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(
            reject_document(&db, employee.id, doc.id).await,
            Err(Error::InvalidState { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_requires_type_and_file() -> Result<()> {
        let db = setup_test_db().await?;
        let files = MemoryFileStore::new();
        let employee = create_test_employee(&db, "Ines Costa", "ines@example.com").await?;

        let Err(Error::Validation { errors }) =
            upload_document(&db, &files, employee.id, DocumentUpload::default()).await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("document_type_id"), Some("The document type id field is required."));
        assert_eq!(errors.get("file"), Some("The file field is required."));
        assert_eq!(files.len().await, 0);

        assert!(matches!(
            upload_document(&db, &files, 999, passport(1)).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_download_reject_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let reference = seed_test_reference(&db).await?;
        let files = MemoryFileStore::new();
        let employee = create_test_employee(&db, "Ines Costa", "ines@example.com").await?;
        let other = create_test_employee(&db, "Tom Berg", "tom@example.com").await?;

        let doc = upload_document(&db, &files, employee.id, passport(reference.document_type_id)).await?;
        let download = download_document(&db, &files, employee.id, doc.id).await?;
        assert_eq!(download.file_name, "x.pdf");
        assert_eq!(download.bytes, b"%PDF-1.4 scan".to_vec());

        // scoped to the owning employee
        assert!(matches!(
            download_document(&db, &files, other.id, doc.id).await,
            Err(Error::NotFound { .. })
        ));

        let rejected = reject_document(&db, employee.id, doc.id).await?;
        assert_eq!(rejected.verification_status, VerificationStatus::Rejected);

        delete_document(&db, &files, employee.id, doc.id).await?;
        assert!(!files.contains(&doc.file_path).await);
        assert_eq!(EmployeeDocument::find().count(&db).await?, 0);
        Ok(())
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("scan.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("noext"), "application/octet-stream");
    }
}
