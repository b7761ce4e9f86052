use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rentflow::workflows::rental::{
    DocumentVerifier, NotificationPublisher, NotifyError, PartyRef, RentalRepository,
    RentalRequest, RepositoryError, RequestId, RequestStatus, TransitionNotice,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRentalRepository {
    records: Arc<Mutex<HashMap<RequestId, RentalRequest>>>,
}

impl RentalRepository for InMemoryRentalRepository {
    fn insert(&self, request: RentalRequest) -> Result<RentalRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update_if(
        &self,
        expected: RequestStatus,
        request: RentalRequest,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&request.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Stale {
                expected,
                found: stored.status,
            });
        }
        guard.insert(request.id.clone(), request);
        Ok(())
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RentalRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn active(&self, limit: usize) -> Result<Vec<RentalRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|request| !request.status.is_terminal())
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<TransitionNotice>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notice: TransitionNotice) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<TransitionNotice> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

/// Document directory keyed by renter reference. Renters are treated as
/// verified unless explicitly marked missing, so a fresh instance never
/// blocks intake.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentDirectory {
    missing: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryDocumentDirectory {
    pub(crate) fn mark_missing(&self, renter: &str) {
        self.missing
            .lock()
            .expect("directory mutex poisoned")
            .insert(renter.to_string());
    }
}

impl DocumentVerifier for InMemoryDocumentDirectory {
    fn documents_present(&self, renter: &PartyRef) -> bool {
        !self
            .missing
            .lock()
            .expect("directory mutex poisoned")
            .contains(&renter.0)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|err| format!("failed to parse '{raw}' as a number ({err})"))
}
