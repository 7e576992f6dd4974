pub mod store;
pub mod memory;
pub mod lifecycle;
pub mod booking;
pub mod history;
pub mod records;

pub use store::{AppointmentStore, MedicalRecordStore, SupabaseAppointmentStore, SupabaseMedicalRecordStore};
pub use memory::{InMemoryAppointmentStore, InMemoryMedicalRecordStore};
pub use lifecycle::{AppointmentLifecycleService, TransitionActor};
pub use booking::BookingEngine;
pub use history::AppointmentHistoryService;
pub use records::MedicalRecordService;
