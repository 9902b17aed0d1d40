mod avatar;
mod hub;
mod upload;


pub use avatar::{AvatarGenerator, DisabledAvatarGenerator};
pub use hub::ServiceHub;
pub use upload::{LocalUploadService, UploadCategory, UploadService};
