pub mod slots;
pub mod availability;
pub mod directory;
pub mod cache;
pub mod memory;

pub use slots::{generate_slots, expand_window, validate_window, SLOT_MINUTES};
pub use availability::{AvailabilityService, AvailabilityStore, SupabaseAvailabilityStore};
pub use directory::{DoctorDirectory, DoctorListingService, SupabaseDoctorDirectory};
pub use cache::TtlCache;
pub use memory::{InMemoryAvailabilityStore, InMemoryDoctorDirectory};
