mod bucket;
mod reservoir;

pub use bucket::{BucketModel, BucketParameters};
pub use reservoir::{LinearReservoir, LinearReservoirParameters};
