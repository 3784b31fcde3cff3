/// Typed views over table rows
///
/// Each record keeps the 1-indexed row number it was read from so services
/// can address follow-up writes to the same row.
///
/// - [`user`]: Users rows
/// - [`instance`]: Instances rows and their public projection
/// - [`setting`]: Settings rows and template keys

pub mod instance;
pub mod setting;
pub mod user;

pub use instance::{InstanceRecord, InstanceSummary};
pub use setting::SettingRecord;
pub use user::UserRecord;
