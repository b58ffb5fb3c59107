//! Application-wide constants
//!
//! Meta keys and discriminators shared between the video repository and the
//! default collaborator implementations.

/// Discriminator stored in the `type` column of the shared media table.
pub const VIDEO_MEDIA_TYPE: &str = "video";

/// Activity meta key holding the comma-joined ids of videos an activity displays.
pub const ACTIVITY_VIDEO_IDS_META: &str = "bp_video_ids";

/// Attachment meta key holding the comma-joined ids of auto-generated thumbnails.
pub const VIDEO_PREVIEW_THUMBNAILS_META: &str = "video_preview_thumbnails";

/// Attachment meta key holding the id of a poster image chosen by the uploader.
pub const VIDEO_POSTER_META: &str = "bp_video_preview_thumbnail_id";

/// Attachment meta key pointing back at the activity the video was posted with.
pub const VIDEO_PARENT_ACTIVITY_META: &str = "bp_video_parent_activity_id";

/// Attachment meta key holding generated image metadata as JSON.
/// Expected shape: `{"width": .., "height": .., "sizes": {"<size>": {"file": ".."}}}`
pub const ATTACHMENT_METADATA_META: &str = "attachment_metadata";

/// Activity type used for replies in the activity stream.
pub const ACTIVITY_COMMENT_TYPE: &str = "activity_comment";

/// Sentinel accepted for `album_id` meaning "videos without an album".
pub const EXISTING_VIDEO_ALBUM: &str = "existing-video";

/// Default number of videos per page.
pub const DEFAULT_PER_PAGE: u32 = 20;
