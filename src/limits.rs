//! Hard limits on user-supplied input.

/// Largest timetable or COR image accepted in one upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_STUDENT_ID_LEN: usize = 64;
pub const MAX_FILE_NAME_LEN: usize = 255;
pub const MAX_SUBJECTS: usize = 32;

/// Matches the identity provider's minimum.
pub const MIN_PASSWORD_LEN: usize = 6;
