/// Collection holding one balance record per account
pub const POINTS_COLLECTION: &str = "userPoints";

/// Field of a balance record holding the point total
pub const POINTS_FIELD: &str = "points";

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Lifetime of a password reset token in seconds (1 hour)
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Cookie carrying the browser session id
pub const SESSION_COOKIE: &str = "slaypoints_session";

// =============================================================================
// Messages
// =============================================================================

pub const ERR_INVALID_NUMBER: &str = "Please enter a valid number.";

pub const ERR_INIT_USER_DATA: &str = "Failed to initialize user data.";

pub const ERR_UPDATE_POINTS: &str = "Failed to update points.";

pub const ERR_RESET_EMAIL_REQUIRED: &str =
    "Please enter your email address to reset the password.";

pub const INFO_RESET_EMAIL_SENT: &str = "Password reset email sent! Check your inbox.";

pub const INFO_PASSWORD_CHANGED: &str = "Password updated. You can now log in.";
