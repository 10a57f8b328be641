use std::time::Instant;

use bytes::Bytes;
use tracing::{info, warn};

use crate::lifecycle::{LifecycleState, Operation, StateViolation};
use crate::model::{Account, AccountId, ApprovalStatus, AvailabilitySlot};
use crate::schedule::{derive_snapshot, AvailabilitySnapshot};
use crate::session::Session;

use super::{record, Consultation, FileUpload, ServiceError};

impl Consultation {
    /// An approved teacher replaces their own availability.
    ///
    /// The timetable file is kept in the blob store and linked from the
    /// account as `schedule_url`.
    pub async fn upload_schedule(&self, session: &Session, upload: FileUpload) -> Result<AvailabilitySnapshot, ServiceError> {
        let result = self.upload_schedule_inner(session, upload).await;
        record_upload("self", &result);
        result
    }

    async fn upload_schedule_inner(&self, session: &Session, upload: FileUpload) -> Result<AvailabilitySnapshot, ServiceError> {
        let mut teacher = self.authorize(session, Operation::UploadAvailability).await?;
        upload.validate()?;

        let snapshot = self.derive(&upload.file_name, upload.bytes.clone()).await?;
        let url = self
            .blobs
            .put(&format!("schedules/{}/{}", teacher.id, upload.file_name), upload.bytes)
            .await?;

        teacher.schedule_url = Some(url);
        teacher.occupied_slots = snapshot.occupied.clone();
        teacher.available_slots = snapshot.slots.clone();
        let teacher = self.commit(teacher).await?;

        info!(
            teacher = %teacher.id,
            available = snapshot.available().count(),
            booked = snapshot.booked().count(),
            "availability uploaded"
        );
        Ok(snapshot)
    }

    /// An admin replaces an approved teacher's availability. The timetable
    /// file itself is not kept.
    pub async fn upload_schedule_for(
        &self,
        session: &Session,
        teacher: &AccountId,
        upload: FileUpload,
    ) -> Result<AvailabilitySnapshot, ServiceError> {
        let result = self.upload_schedule_for_inner(session, teacher, upload).await;
        record_upload("admin", &result);
        result
    }

    async fn upload_schedule_for_inner(
        &self,
        session: &Session,
        teacher_id: &AccountId,
        upload: FileUpload,
    ) -> Result<AvailabilitySnapshot, ServiceError> {
        let admin = self
            .authorize(session, Operation::UploadAvailabilityForTeacher)
            .await?;
        let mut teacher = self.approved_teacher(teacher_id).await?;
        upload.validate()?;

        let snapshot = self.derive(&upload.file_name, upload.bytes).await?;
        teacher.occupied_slots = snapshot.occupied.clone();
        teacher.available_slots = snapshot.slots.clone();
        let teacher = self.commit(teacher).await?;

        info!(
            admin = %admin.id,
            teacher = %teacher.id,
            available = snapshot.available().count(),
            booked = snapshot.booked().count(),
            "availability uploaded on behalf of teacher"
        );
        Ok(snapshot)
    }

    /// The stored availability grid of an approved teacher. Empty until their
    /// first upload.
    pub async fn availability(&self, session: &Session, teacher: &AccountId) -> Result<Vec<AvailabilitySlot>, ServiceError> {
        let result: Result<Vec<AvailabilitySlot>, ServiceError> = async {
            self.authorize(session, Operation::ViewAvailability).await?;
            let teacher = self.approved_teacher(teacher).await?;
            Ok(teacher.available_slots)
        }
        .await;
        record("availability", &result);
        result
    }

    async fn approved_teacher(&self, id: &AccountId) -> Result<Account, ServiceError> {
        let account = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        if LifecycleState::of(&account) != LifecycleState::Teacher(ApprovalStatus::Approved) {
            return Err(StateViolation::NotAnApprovedTeacher(id.clone()).into());
        }
        Ok(account)
    }

    /// Ingest, parse, normalize and derive on the blocking pool. The file
    /// extension picks the ingestor.
    async fn derive(&self, file_name: &str, bytes: Bytes) -> Result<AvailabilitySnapshot, ServiceError> {
        let grid = self.grid.clone();
        let tables = self.tables.clone();
        let file_name = file_name.to_string();
        let start = Instant::now();

        let snapshot = tokio::task::spawn_blocking(move || {
            let rows = tables.rows(&file_name, bytes)?;
            derive_snapshot(&grid, rows)
        })
        .await
        .map_err(|e| ServiceError::TaskFailed(e.to_string()))??;

        metrics::histogram!(crate::observability::DERIVATION_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        if !snapshot.misses.is_empty() {
            metrics::counter!(crate::observability::NORMALIZATION_MISSES_TOTAL)
                .increment(snapshot.misses.len() as u64);
            for miss in &snapshot.misses {
                warn!(raw = %miss.raw, normalized = ?miss.normalized, "time label matched no slot, row dropped");
            }
        }
        Ok(snapshot)
    }
}

fn record_upload(path: &'static str, result: &Result<AvailabilitySnapshot, ServiceError>) {
    metrics::counter!(
        crate::observability::UPLOADS_TOTAL,
        "path" => path,
        "status" => crate::observability::status_label(result)
    )
    .increment(1);
    record(
        if path == "self" { "upload_schedule" } else { "upload_schedule_for" },
        result,
    );
}
