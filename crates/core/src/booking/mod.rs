//! Booking Pipeline

pub mod pipeline;

pub use pipeline::{BookingPipeline, BookingTicket};
