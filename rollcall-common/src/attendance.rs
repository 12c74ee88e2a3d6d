//! Attendance eligibility engine
//!
//! A single-pass, ordered gate sequence evaluated once per attendance attempt:
//!
//! 1. location supplied
//! 2. location inside the campus geofence
//! 3. current time inside a slot window
//! 4. student has a complete stored face descriptor
//! 5. submitted descriptor is well-formed
//! 6. submitted descriptor matches the stored one
//! 7. no event yet for (student, slot, today), enforced by the store atomically
//!
//! The first failing gate ends the attempt. Cheap checks run first.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::face::{self, FaceDescriptor, DEFAULT_MATCH_THRESHOLD, DESCRIPTOR_LEN};
use crate::geo::{Coordinate, GeoFence};
use crate::slot::{Slot, SlotWindows};
use crate::time::SharedClock;
use crate::Error;

/// Outcome recorded for a student in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Late => "Late",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            "Late" => Ok(AttendanceStatus::Late),
            other => Err(Error::Validation(format!("Unknown attendance status '{}'", other))),
        }
    }
}

/// Location as submitted by the client
///
/// Presence is explicit: a latitude of exactly 0.0 is a real coordinate, only
/// an absent (or non-finite) component counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
}

impl LocationInput {
    /// Coordinate if both components are present and finite
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }
}

/// Attendance attempt payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    #[serde(default)]
    pub face_descriptor: Option<Vec<f64>>,
    #[serde(default)]
    pub location: Option<LocationInput>,
}

/// Location stored with an attendance event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Append-only attendance ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub student_id: Uuid,
    pub calendar_date: NaiveDate,
    pub slot: Slot,
    pub status: AttendanceStatus,
    pub location: RecordedLocation,
    pub face_verified: bool,
    pub marked_at: NaiveDateTime,
}

/// Why an attendance attempt was refused
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Location is required")]
    MissingLocation,

    #[error("Invalid location. You must be inside college campus to mark attendance.")]
    OutOfRange { distance_km: f64, radius_km: f64 },

    #[error("Attendance can only be marked between {windows}.")]
    OutsideWindow { windows: String },

    #[error("Student not found")]
    StudentNotFound,

    #[error("Please set your face verification image in your Profile before marking attendance.")]
    ProfileIncomplete,

    #[error("Valid face descriptor is required to mark attendance.")]
    InvalidDescriptor,

    #[error("Face not recognized. Please ensure good lighting and look directly at the camera.")]
    FaceMismatch { distance: f64 },

    #[error("Attendance already marked for today ({slot} session).")]
    AlreadyMarked { slot: Slot },

    #[error(transparent)]
    Store(#[from] Error),
}

impl AttendanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttendanceError::MissingLocation | AttendanceError::InvalidDescriptor => {
                ErrorKind::Validation
            }
            AttendanceError::OutOfRange { .. }
            | AttendanceError::OutsideWindow { .. }
            | AttendanceError::ProfileIncomplete
            | AttendanceError::FaceMismatch { .. }
            | AttendanceError::AlreadyMarked { .. } => ErrorKind::BusinessRule,
            AttendanceError::StudentNotFound => ErrorKind::NotFound,
            AttendanceError::Store(e) => e.kind(),
        }
    }
}

/// Static rules an attempt is judged against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityPolicy {
    pub geofence: GeoFence,
    pub windows: SlotWindows,
    pub match_threshold: f64,
}

impl EligibilityPolicy {
    pub fn new(geofence: GeoFence, windows: SlotWindows) -> Self {
        Self {
            geofence,
            windows,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Gates 1 and 2
    pub fn check_location(&self, location: Option<&LocationInput>) -> Result<Coordinate, AttendanceError> {
        let point = location
            .and_then(LocationInput::coordinate)
            .ok_or(AttendanceError::MissingLocation)?;

        let (inside, distance_km) = self.geofence.evaluate(&point);
        if !inside {
            return Err(AttendanceError::OutOfRange {
                distance_km,
                radius_km: self.geofence.radius_km,
            });
        }
        Ok(point)
    }

    /// Gate 3
    pub fn check_slot(&self, now: NaiveDateTime) -> Result<Slot, AttendanceError> {
        self.windows
            .resolve(now.time())
            .ok_or_else(|| AttendanceError::OutsideWindow {
                windows: self.windows.describe(),
            })
    }

    /// Gates 4 to 6
    pub fn check_face(&self, stored: Option<&[f64]>, submitted: Option<&[f64]>) -> Result<f64, AttendanceError> {
        let stored = match stored {
            Some(values) if values.len() == DESCRIPTOR_LEN => values,
            _ => return Err(AttendanceError::ProfileIncomplete),
        };

        let submitted = submitted
            .ok_or(AttendanceError::InvalidDescriptor)
            .and_then(|values| {
                FaceDescriptor::try_from(values.to_vec()).map_err(|_| AttendanceError::InvalidDescriptor)
            })?;

        let distance = face::euclidean_distance(submitted.as_slice(), stored);
        info!(
            "Face descriptor distance: {:.4} (threshold: {})",
            distance, self.match_threshold
        );

        if !face::is_match(distance, self.match_threshold) {
            return Err(AttendanceError::FaceMismatch { distance });
        }
        Ok(distance)
    }
}

/// Face data held for a student
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFace {
    pub descriptor: Option<Vec<f64>>,
}

/// Persistence collaborator for the engine
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Stored face data, or None when the student does not exist
    async fn student_face(&self, student_id: Uuid) -> crate::Result<Option<StudentFace>>;

    /// Insert unless an event already exists for (student, slot, calendar date)
    ///
    /// Must be atomic. Returns false when an event was already present.
    async fn record_if_absent(&self, event: &AttendanceEvent) -> crate::Result<bool>;
}

/// Evaluates attendance attempts and records accepted ones
pub struct AttendanceEngine<S> {
    policy: EligibilityPolicy,
    store: S,
    clock: SharedClock,
}

impl<S: AttendanceStore> AttendanceEngine<S> {
    pub fn new(policy: EligibilityPolicy, store: S, clock: SharedClock) -> Self {
        Self { policy, store, clock }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the full gate sequence for one attempt
    pub async fn submit(
        &self,
        student_id: Uuid,
        submission: &AttendanceSubmission,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let result = self.evaluate(student_id, submission).await;
        match &result {
            Ok(event) => info!(
                "Attendance recorded for student {} ({} session, {})",
                student_id, event.slot, event.calendar_date
            ),
            Err(e) => warn!("Attendance rejected for student {}: {:?}", student_id, e),
        }
        result
    }

    async fn evaluate(
        &self,
        student_id: Uuid,
        submission: &AttendanceSubmission,
    ) -> Result<AttendanceEvent, AttendanceError> {
        let point = self.policy.check_location(submission.location.as_ref())?;

        let now = self.clock.now();
        let slot = self.policy.check_slot(now)?;

        let face = self
            .store
            .student_face(student_id)
            .await?
            .ok_or(AttendanceError::StudentNotFound)?;
        self.policy
            .check_face(face.descriptor.as_deref(), submission.face_descriptor.as_deref())?;

        let address = submission
            .location
            .as_ref()
            .and_then(|l| l.address.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| point.to_address());

        let event = AttendanceEvent {
            id: Uuid::new_v4(),
            student_id,
            calendar_date: now.date(),
            slot,
            status: AttendanceStatus::Present,
            location: RecordedLocation {
                latitude: point.latitude,
                longitude: point.longitude,
                address,
            },
            face_verified: true,
            marked_at: now,
        };

        if !self.store.record_if_absent(&event).await? {
            return Err(AttendanceError::AlreadyMarked { slot });
        }
        Ok(event)
    }
}
