use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{ContextQuery, OutcomeStore, StoreError};
use crate::workflows::engagement::domain::{
    Applicant, ApplicantId, Appointment, AppointmentId, ContextId, Invitation, InvitationId,
    Participation, ProgramContext,
};
use crate::workflows::notifications::domain::{
    DeliveryOutcome, Notification, NotificationId, NotificationKey,
};

#[derive(Debug, Default)]
struct Tables {
    applicants: HashMap<ApplicantId, Applicant>,
    contexts: BTreeMap<ContextId, ProgramContext>,
    appointments: HashMap<AppointmentId, Appointment>,
    participations: Vec<Participation>,
    invitations: BTreeMap<InvitationId, Invitation>,
    notifications: BTreeMap<NotificationKey, Notification>,
    notification_sequence: u64,
}

/// Mutex-guarded store used by the demo service and the test suites.
///
/// Every trait call takes the lock once, so lookup-or-create on notifications
/// is a single atomic operation.
#[derive(Debug, Default)]
pub struct InMemoryOutcomeStore {
    tables: Mutex<Tables>,
}

impl InMemoryOutcomeStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("store mutex poisoned")
    }

    pub fn insert_applicant(&self, applicant: Applicant) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if tables.applicants.contains_key(&applicant.id) {
            return Err(StoreError::Conflict);
        }
        tables.applicants.insert(applicant.id.clone(), applicant);
        Ok(())
    }

    pub fn insert_program_context(&self, context: ProgramContext) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if !tables.applicants.contains_key(&context.applicant_id) {
            return Err(StoreError::Validation(vec![
                "applicant must exist".to_string()
            ]));
        }
        if tables.contexts.contains_key(&context.id) {
            return Err(StoreError::Conflict);
        }
        tables.contexts.insert(context.id.clone(), context);
        Ok(())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.tables().notifications.values().cloned().collect()
    }
}

impl OutcomeStore for InMemoryOutcomeStore {
    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError> {
        Ok(self.tables().applicants.get(id).cloned())
    }

    fn program_context(&self, id: &ContextId) -> Result<Option<ProgramContext>, StoreError> {
        Ok(self.tables().contexts.get(id).cloned())
    }

    fn contexts(&self, query: &ContextQuery) -> Result<Vec<ProgramContext>, StoreError> {
        Ok(self
            .tables()
            .contexts
            .values()
            .filter(|context| query.matches(context))
            .cloned()
            .collect())
    }

    fn update_program_context(&self, context: ProgramContext) -> Result<(), StoreError> {
        let mut tables = self.tables();
        match tables.contexts.get_mut(&context.id) {
            Some(existing) => {
                *existing = context;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn appointment(&self, id: &AppointmentId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables().appointments.get(id).cloned())
    }

    fn upsert_appointment(&self, appointment: Appointment) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let duplicate_ref = tables.appointments.values().any(|existing| {
            existing.external_ref == appointment.external_ref && existing.id != appointment.id
        });
        if duplicate_ref {
            return Err(StoreError::Validation(vec![
                "external appointment reference is already taken".to_string(),
            ]));
        }
        tables
            .appointments
            .insert(appointment.id.clone(), appointment);
        Ok(())
    }

    fn participations_for_context(
        &self,
        context_id: &ContextId,
    ) -> Result<Vec<Participation>, StoreError> {
        Ok(self
            .tables()
            .participations
            .iter()
            .filter(|participation| &participation.context_id == context_id)
            .cloned()
            .collect())
    }

    fn upsert_participation(&self, participation: Participation) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if !tables.contexts.contains_key(&participation.context_id) {
            return Err(StoreError::Validation(vec![
                "program context must exist".to_string()
            ]));
        }
        let position = tables.participations.iter().position(|existing| {
            existing.applicant_id == participation.applicant_id
                && existing.appointment_id == participation.appointment_id
        });
        match position {
            Some(index) => {
                let existing = &mut tables.participations[index];
                existing.status = participation.status;
                existing.context_id = participation.context_id;
            }
            None => tables.participations.push(participation),
        }
        Ok(())
    }

    fn invitations_for_context(
        &self,
        context_id: &ContextId,
    ) -> Result<Vec<Invitation>, StoreError> {
        Ok(self
            .tables()
            .invitations
            .values()
            .filter(|invitation| &invitation.context_id == context_id)
            .cloned()
            .collect())
    }

    fn insert_invitation(&self, invitation: Invitation) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if !tables.contexts.contains_key(&invitation.context_id) {
            return Err(StoreError::Validation(vec![
                "program context must exist".to_string()
            ]));
        }
        if tables.invitations.contains_key(&invitation.id) {
            return Err(StoreError::Conflict);
        }
        tables.invitations.insert(invitation.id.clone(), invitation);
        Ok(())
    }

    fn find_or_create_notification(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let mut tables = self.tables();
        if let Some(existing) = tables.notifications.get(key) {
            return Ok(existing.clone());
        }
        if !tables.applicants.contains_key(&key.applicant_id) {
            return Err(StoreError::Validation(vec![
                "applicant must exist".to_string()
            ]));
        }

        tables.notification_sequence += 1;
        let id = NotificationId(format!("notif-{:06}", tables.notification_sequence));
        let notification = Notification::pending(id, key.clone(), now);
        tables
            .notifications
            .insert(key.clone(), notification.clone());
        Ok(notification)
    }

    fn notification(&self, key: &NotificationKey) -> Result<Option<Notification>, StoreError> {
        Ok(self.tables().notifications.get(key).cloned())
    }

    fn update_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut tables = self.tables();
        match tables.notifications.get_mut(&notification.key) {
            Some(existing) if existing.id == notification.id => {
                *existing = notification.clone();
                Ok(())
            }
            Some(_) => Err(StoreError::Conflict),
            None => Err(StoreError::NotFound),
        }
    }

    fn mark_notification_failed(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let mut tables = self.tables();
        let existing = tables
            .notifications
            .get_mut(key)
            .ok_or(StoreError::NotFound)?;
        if existing.outcome != DeliveryOutcome::Delivered {
            *existing = existing.with_outcome(DeliveryOutcome::Failed, now);
        }
        Ok(existing.clone())
    }
}
