pub mod call_record;

pub use call_record::{CallRecord, FollowUpRecord};
