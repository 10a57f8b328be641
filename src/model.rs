use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// School days, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const COUNT: usize = 5;

    pub const ALL: [Weekday; Self::COUNT] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Column offset of this day in a timetable row (after the time label).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `"H:MM-H:MM"` half-hour label. Validity is defined by the catalog,
/// not by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlotLabel(String);

impl TimeSlotLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimeSlotLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimeSlotLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A non-empty timetable cell, resolved to a catalog slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupiedEntry {
    pub day: Weekday,
    pub slot: TimeSlotLabel,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
}

/// One cell of the derived grid. `subject` is set only for booked slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day: Weekday,
    pub slot: TimeSlotLabel,
    pub status: SlotStatus,
    pub subject: Option<String>,
}

impl AvailabilitySlot {
    pub fn available(day: Weekday, slot: TimeSlotLabel) -> Self {
        Self {
            day,
            slot,
            status: SlotStatus::Available,
            subject: None,
        }
    }

    pub fn booked(day: Weekday, slot: TimeSlotLabel, subject: impl Into<String>) -> Self {
        Self {
            day,
            slot,
            status: SlotStatus::Booked,
            subject: Some(subject.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

// ── Accounts ─────────────────────────────────────────────────────

/// Stable identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        })
    }
}

/// The account document. Every store write replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub status: ApprovalStatus,
    pub name: String,
    pub email: String,
    /// Students only.
    pub student_id: Option<String>,
    /// Blob URL of the Certificate of Registration image (students only).
    pub cor_url: Option<String>,
    /// Teachers only.
    pub subjects: Vec<String>,
    pub schedule_url: Option<String>,
    pub occupied_slots: Vec<OccupiedEntry>,
    pub available_slots: Vec<AvailabilitySlot>,
}

impl Account {
    /// A freshly registered student, always pending.
    pub fn student(id: AccountId, name: String, email: String, student_id: String, cor_url: String) -> Self {
        Self {
            id,
            role: Role::Student,
            status: ApprovalStatus::Pending,
            name,
            email,
            student_id: Some(student_id),
            cor_url: Some(cor_url),
            subjects: Vec::new(),
            schedule_url: None,
            occupied_slots: Vec::new(),
            available_slots: Vec::new(),
        }
    }

    /// An externally provisioned teacher or admin. Both start approved.
    pub fn provisioned(id: AccountId, role: Role, name: String, email: String, subjects: Vec<String>) -> Self {
        Self {
            id,
            role,
            status: ApprovalStatus::Approved,
            name,
            email,
            student_id: None,
            cor_url: None,
            subjects,
            schedule_url: None,
            occupied_slots: Vec::new(),
            available_slots: Vec::new(),
        }
    }
}
