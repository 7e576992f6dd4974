use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::services::{
    AppointmentHistoryService, AppointmentStore, BookingEngine, InMemoryAppointmentStore,
    InMemoryMedicalRecordStore, MedicalRecordService, MedicalRecordStore, SupabaseAppointmentStore,
    SupabaseMedicalRecordStore,
};
use doctor_cell::handlers::DoctorState;
use doctor_cell::services::{
    AvailabilityService, AvailabilityStore, DoctorDirectory, DoctorListingService,
    InMemoryAvailabilityStore, InMemoryDoctorDirectory, SupabaseAvailabilityStore,
    SupabaseDoctorDirectory,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use task_queue_cell::handlers::JobState;
use task_queue_cell::{InMemoryJobQueue, JobQueue, RedisJobQueue};

/// Per-cell router state, all sharing one set of stores.
pub struct CellStates {
    pub doctors: Arc<DoctorState>,
    pub appointments: Arc<AppointmentState>,
    pub jobs: Arc<JobState>,
}

struct Stores {
    directory: Arc<dyn DoctorDirectory>,
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    records: Arc<dyn MedicalRecordStore>,
}

fn stores_for(config: &AppConfig) -> Stores {
    match config.storage_backend {
        StorageBackend::Supabase => {
            let supabase = Arc::new(SupabaseClient::new(config));
            Stores {
                directory: Arc::new(SupabaseDoctorDirectory::new(supabase.clone())),
                availability: Arc::new(SupabaseAvailabilityStore::new(supabase.clone())),
                appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                records: Arc::new(SupabaseMedicalRecordStore::new(supabase)),
            }
        }
        StorageBackend::Memory => Stores {
            directory: Arc::new(InMemoryDoctorDirectory::new()),
            availability: Arc::new(InMemoryAvailabilityStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            records: Arc::new(InMemoryMedicalRecordStore::new()),
        },
    }
}

/// Redis is used whenever the deployment is backed by Supabase or names a
/// Redis URL explicitly; otherwise jobs stay in process.
async fn queue_for(config: &AppConfig) -> anyhow::Result<Arc<dyn JobQueue>> {
    if config.storage_backend == StorageBackend::Memory && config.redis_url.is_none() {
        return Ok(Arc::new(InMemoryJobQueue::new()));
    }

    let queue = RedisJobQueue::new(config)
        .await
        .context("failed to connect to the Redis job queue")?;
    Ok(Arc::new(queue))
}

pub async fn build_states(config: Arc<AppConfig>) -> anyhow::Result<CellStates> {
    info!("Wiring {:?} storage backend", config.storage_backend);

    let stores = stores_for(&config);
    let queue = queue_for(&config).await?;

    let listing = Arc::new(DoctorListingService::new(
        stores.directory.clone(),
        Duration::from_secs(config.doctor_listing_cache_ttl_secs),
    ));
    let availability = Arc::new(AvailabilityService::new(
        stores.availability.clone(),
        config.booking_horizon_days,
    ));
    let booking = Arc::new(BookingEngine::new(
        stores.directory,
        stores.availability,
        stores.appointments.clone(),
        config.booking_horizon_days,
    ));

    Ok(CellStates {
        doctors: Arc::new(DoctorState {
            config: config.clone(),
            availability,
            listing,
        }),
        appointments: Arc::new(AppointmentState {
            config: config.clone(),
            booking,
            history: Arc::new(AppointmentHistoryService::new(stores.appointments.clone())),
            records: Arc::new(MedicalRecordService::new(stores.appointments, stores.records)),
        }),
        jobs: Arc::new(JobState { config, queue }),
    })
}
