//! Media types sent in the `Accept` header of GitHub requests.

/// Media type used by GitHub Apps during the preview period.
pub const APP_PREVIEW: &str = "application/vnd.github.machine-man-preview+json";
/// Stable GitHub REST v3 JSON media type.
pub const JSON_V3: &str = "application/vnd.github.v3+json";
