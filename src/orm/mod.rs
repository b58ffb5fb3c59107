pub mod activities;
pub mod activity_meta;
pub mod attachment_meta;
pub mod attachments;
pub mod users;
pub mod videos;
