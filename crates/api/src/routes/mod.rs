pub mod booking;
pub mod ops;
