pub mod record;

pub use record::IntervalRecord;
