use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Who is asking for a status change. Patients may only cancel; doctors and
/// admins share the same status rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionActor {
    Patient,
    Doctor,
    Admin,
}

/// Status rules of an appointment: `pending -> confirmed | completed | cancelled`,
/// `confirmed -> confirmed | completed | cancelled`; completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that `actor` may move appointment `id` from `current` to `new_status`.
    pub fn validate_status_transition(
        &self,
        id: i64,
        actor: TransitionActor,
        current: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating transition of appointment {}: {} -> {}", id, current, new_status);

        if actor == TransitionActor::Patient && new_status != AppointmentStatus::Cancelled {
            return Err(AppointmentError::Validation(
                "Patients can only cancel appointments".to_string(),
            ));
        }

        if new_status == AppointmentStatus::Pending {
            return Err(AppointmentError::Validation(
                "Status must be one of confirmed, completed, cancelled".to_string(),
            ));
        }

        match current {
            AppointmentStatus::Cancelled if actor == TransitionActor::Patient => {
                Err(AppointmentError::AlreadyCancelled(id))
            }
            status if status.is_terminal() => {
                warn!("Rejected transition of terminal appointment {} ({} -> {})", id, status, new_status);
                Err(AppointmentError::TerminalState { id, status })
            }
            _ if self.get_valid_transitions(current).contains(&new_status) => Ok(()),
            _ => Err(AppointmentError::Validation(format!(
                "Cannot move appointment from {} to {}",
                current, new_status
            ))),
        }
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use AppointmentStatus::*;
    use TransitionActor::*;

    fn check(actor: TransitionActor, from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppointmentError> {
        AppointmentLifecycleService::new().validate_status_transition(1, actor, from, to)
    }

    #[test]
    fn doctor_moves_open_appointments_forward() {
        assert!(check(Doctor, Pending, Confirmed).is_ok());
        assert!(check(Doctor, Pending, Completed).is_ok());
        assert!(check(Doctor, Confirmed, Completed).is_ok());
        assert!(check(Doctor, Confirmed, Cancelled).is_ok());
    }

    #[test]
    fn pending_is_never_a_target() {
        assert_matches!(check(Doctor, Confirmed, Pending), Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for target in [Confirmed, Completed, Cancelled] {
            assert_matches!(check(Doctor, Completed, target), Err(AppointmentError::TerminalState { .. }));
            assert_matches!(check(Doctor, Cancelled, target), Err(AppointmentError::TerminalState { .. }));
        }
    }

    #[test]
    fn patient_cancel_rules() {
        assert!(check(Patient, Pending, Cancelled).is_ok());
        assert!(check(Patient, Confirmed, Cancelled).is_ok());
        assert_matches!(check(Patient, Cancelled, Cancelled), Err(AppointmentError::AlreadyCancelled(1)));
        assert_matches!(check(Patient, Completed, Cancelled), Err(AppointmentError::TerminalState { .. }));
        assert_matches!(check(Patient, Pending, Confirmed), Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn admin_follows_the_doctor_rules() {
        assert!(check(Admin, Pending, Confirmed).is_ok());
        assert!(check(Admin, Confirmed, Cancelled).is_ok());
        assert_matches!(check(Admin, Confirmed, Pending), Err(AppointmentError::Validation(_)));
        assert_matches!(check(Admin, Completed, Cancelled), Err(AppointmentError::TerminalState { .. }));
        assert_matches!(check(Admin, Cancelled, Cancelled), Err(AppointmentError::TerminalState { .. }));
    }
}
