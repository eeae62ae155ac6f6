mod digest;

pub use digest::DigestScheduleTask;
