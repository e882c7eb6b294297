use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{CollegeId, CollegeRecord, ReviewStatus, ReviewTicket};
use super::repository::{ListingStore, StatusTally, StoreError};
use crate::workflows::identity::PrincipalRef;

#[derive(Default)]
struct ListingState {
    records: HashMap<CollegeId, CollegeRecord>,
    tickets: HashMap<CollegeId, ReviewTicket>,
}

/// Mutex-backed [`ListingStore`] used by the bundled server and the test
/// suites. Both maps are keyed by the same id and mutate together.
#[derive(Default)]
pub struct InMemoryListingStore {
    state: Mutex<ListingState>,
}

impl InMemoryListingStore {
    fn state(&self) -> Result<MutexGuard<'_, ListingState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("listing mutex poisoned".to_string()))
    }
}

impl ListingStore for InMemoryListingStore {
    fn create_pair(&self, record: CollegeRecord, ticket: ReviewTicket) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let id = record.college_id.clone();
        if state.records.contains_key(&id) || state.tickets.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        state.records.insert(id.clone(), record);
        state.tickets.insert(id, ticket);
        Ok(())
    }

    fn update_pair(&self, record: CollegeRecord, ticket: ReviewTicket) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let id = record.college_id.clone();
        if !state.records.contains_key(&id) || !state.tickets.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        state.records.insert(id.clone(), record);
        state.tickets.insert(id, ticket);
        Ok(())
    }

    fn update_ticket(&self, ticket: ReviewTicket) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let id = ticket.college_id.clone();
        if !state.tickets.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        state.tickets.insert(id, ticket);
        Ok(())
    }

    fn delete_pair(&self, id: &CollegeId) -> Result<(CollegeRecord, ReviewTicket), StoreError> {
        let mut state = self.state()?;
        match (state.records.remove(id), state.tickets.remove(id)) {
            (Some(record), Some(ticket)) => Ok((record, ticket)),
            _ => Err(StoreError::NotFound),
        }
    }

    fn pair(&self, id: &CollegeId) -> Result<Option<(CollegeRecord, ReviewTicket)>, StoreError> {
        let state = self.state()?;
        let record = state.records.get(id).cloned();
        let ticket = state.tickets.get(id).cloned();
        Ok(record.zip(ticket))
    }

    fn pending(&self) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError> {
        let state = self.state()?;
        let mut pairs: Vec<_> = state
            .tickets
            .values()
            .filter(|ticket| ticket.status == ReviewStatus::Pending)
            .filter_map(|ticket| {
                state
                    .records
                    .get(&ticket.college_id)
                    .map(|record| (record.clone(), ticket.clone()))
            })
            .collect();
        pairs.sort_by(|a, b| b.1.submitted_at.cmp(&a.1.submitted_at));
        Ok(pairs)
    }

    fn by_submitter(
        &self,
        submitter: &PrincipalRef,
    ) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError> {
        let state = self.state()?;
        let mut pairs: Vec<_> = state
            .tickets
            .values()
            .filter(|ticket| &ticket.submitted_by == submitter)
            .filter_map(|ticket| {
                state
                    .records
                    .get(&ticket.college_id)
                    .map(|record| (record.clone(), ticket.clone()))
            })
            .collect();
        pairs.sort_by(|a, b| b.1.submitted_at.cmp(&a.1.submitted_at));
        Ok(pairs)
    }

    fn approved(&self) -> Result<Vec<CollegeRecord>, StoreError> {
        let state = self.state()?;
        let mut records: Vec<_> = state
            .tickets
            .values()
            .filter(|ticket| ticket.status == ReviewStatus::Approved)
            .filter_map(|ticket| state.records.get(&ticket.college_id).cloned())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn recent(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(CollegeRecord, ReviewTicket)>, StoreError> {
        let state = self.state()?;
        let mut pairs: Vec<_> = state
            .tickets
            .values()
            .filter(|ticket| ticket.updated_at >= since)
            .filter_map(|ticket| {
                state
                    .records
                    .get(&ticket.college_id)
                    .map(|record| (record.clone(), ticket.clone()))
            })
            .collect();
        pairs.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        Ok(pairs)
    }

    fn status_tally(&self) -> Result<StatusTally, StoreError> {
        let state = self.state()?;
        let mut tally = StatusTally::default();
        for ticket in state.tickets.values() {
            tally.total += 1;
            match ticket.status {
                ReviewStatus::Pending => tally.pending += 1,
                ReviewStatus::Approved => tally.approved += 1,
                ReviewStatus::Rejected => tally.rejected += 1,
            }
        }
        Ok(tally)
    }
}
