mod booking;
mod reservation;

pub use booking::{Booking, Estimate, Stage};
pub use reservation::{Address, DraftPatch, ReservationDraft, TripType};
