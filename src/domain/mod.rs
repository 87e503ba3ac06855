//! Ride booking and seat-inventory rules.
//!
//! Everything in here is pure: no I/O, no clocks. Callers pass `today` / `now`
//! explicitly so the rules can be exercised deterministically.

pub mod conflict;
pub mod edit;
pub mod lifecycle;
pub mod ride;
pub mod validator;

pub use conflict::{BookingConflict, ConflictDetector};
pub use edit::{apply_patch, DriverPatch, RidePatch};
pub use lifecycle::LifecycleError;
pub use ride::{
    Booking, BookingStatus, Coordinates, Driver, PaymentStatus, Ride, RideDraft, RideRejection,
    RideStatus,
};
pub use validator::{validate_booking, BookingRejection};
