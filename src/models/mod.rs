mod call;

pub use call::{CallIdentity, CallOutcome, ClassifiedCall, RawCallEntry};
