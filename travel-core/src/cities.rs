//! Shared trips state and the operations that mutate it.
//!
//! Every operation dispatches [`CitiesAction::Loading`] before its request and
//! exactly one terminal action after it. State lives in a `watch` channel so
//! any number of views can follow it.
//!
//! Reads carry a generation ticket: when a newer read of the same kind was
//! started in the meantime, the older response is dropped
//! ([`CitiesAction::Superseded`]) instead of overwriting fresher data. A
//! successful create or delete also invalidates every collection read that
//! is still in flight. Mutations always apply.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    api::CitiesApi,
    error::ApiError,
    model::{City, CityDraft, CityId},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitiesState {
    pub cities: Vec<City>,
    pub current_city: Option<City>,
    pub is_loading: bool,
    pub error: Option<String>,
    pending: usize,
    collection_loaded: bool,
}

impl CitiesState {
    /// Requests dispatched but not yet resolved.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Whether `cities` mirrors a full collection read from the backend, as
    /// opposed to only the entries created since a failed load.
    pub fn collection_loaded(&self) -> bool {
        self.collection_loaded
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CitiesAction {
    Loading,
    CitiesLoaded(Vec<City>),
    CityLoaded(City),
    CityCreated(City),
    CityDeleted(CityId),
    Rejected(String),
    /// A read resolved after a newer read of the same kind, or a collection
    /// read resolved after a mutation; data is left alone.
    Superseded,
}

pub fn reduce(mut state: CitiesState, action: CitiesAction) -> CitiesState {
    if matches!(action, CitiesAction::Loading) {
        state.pending += 1;
    } else {
        state.pending = state.pending.saturating_sub(1);
    }

    match action {
        CitiesAction::Loading | CitiesAction::Superseded => {}
        CitiesAction::CitiesLoaded(cities) => {
            state.cities = cities;
            state.collection_loaded = true;
            state.error = None;
        }
        CitiesAction::CityLoaded(city) => {
            state.current_city = Some(city);
            state.error = None;
        }
        CitiesAction::CityCreated(city) => {
            // a collection read may already have brought this entry in
            match state.cities.iter_mut().find(|c| c.id == city.id) {
                Some(existing) => *existing = city.clone(),
                None => state.cities.push(city.clone()),
            }
            state.current_city = Some(city);
            state.error = None;
        }
        CitiesAction::CityDeleted(id) => {
            state.cities.retain(|city| city.id != id);
            state.error = None;
        }
        CitiesAction::Rejected(message) => {
            state.error = Some(message);
        }
    }

    state.is_loading = state.pending > 0;
    state
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
}

impl Operation {
    /// The text shown to users when this operation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::List => "There was an error loading cities",
            Operation::Get => "There was an error loading city",
            Operation::Create => "There was an error creating cities",
            Operation::Delete => "There was an error deleting cities",
        }
    }
}

/// A failed provider operation. Displays as the user-facing message; the
/// backend failure is available through `source()`.
#[derive(Debug, Error)]
#[error("{}", .operation.failure_message())]
pub struct CitiesError {
    pub operation: Operation,
    #[source]
    pub source: ApiError,
}

#[derive(Debug)]
pub struct CitiesProvider<A> {
    api: A,
    state: watch::Sender<CitiesState>,
    list_generation: AtomicU64,
    get_generation: AtomicU64,
}

impl<A: CitiesApi> CitiesProvider<A> {
    /// Provider with empty state; nothing is fetched.
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(CitiesState::default());
        Self { api, state, list_generation: AtomicU64::new(0), get_generation: AtomicU64::new(0) }
    }

    /// Provider that has performed its one initial load of the collection.
    /// A failed load is kept in state, not returned.
    pub async fn start(api: A) -> Self {
        let provider = Self::new(api);
        let _ = provider.list_cities().await;
        provider
    }

    pub fn state(&self) -> CitiesState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CitiesState> {
        self.state.subscribe()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn dispatch(&self, action: CitiesAction) {
        self.state.send_modify(|state| *state = reduce(std::mem::take(state), action));
    }

    fn reject(&self, operation: Operation, source: ApiError) -> CitiesError {
        warn!(?operation, error = %source, "cities request failed");
        self.dispatch(CitiesAction::Rejected(operation.failure_message().to_string()));
        CitiesError { operation, source }
    }

    /// Resolves a read whose result must not touch state.
    fn supersede<T>(
        &self,
        operation: Operation,
        result: Result<T, ApiError>,
    ) -> Result<T, CitiesError> {
        self.dispatch(CitiesAction::Superseded);
        result.map_err(|source| {
            warn!(?operation, error = %source, "superseded cities request failed");
            CitiesError { operation, source }
        })
    }

    /// Makes every collection read still in flight stale.
    fn invalidate_lists(&self) {
        self.list_generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn list_cities(&self) -> Result<Vec<City>, CitiesError> {
        let ticket = self.list_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(CitiesAction::Loading);

        let result = self.api.list_cities().await;

        if self.list_generation.load(Ordering::SeqCst) != ticket {
            return self.supersede(Operation::List, result);
        }

        match result {
            Ok(cities) => {
                info!(count = cities.len(), "cities loaded");
                self.dispatch(CitiesAction::CitiesLoaded(cities.clone()));
                Ok(cities)
            }
            Err(err) => Err(self.reject(Operation::List, err)),
        }
    }

    pub async fn get_city(&self, id: &CityId) -> Result<City, CitiesError> {
        let ticket = self.get_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(CitiesAction::Loading);

        let result = self.api.get_city(id).await;

        if self.get_generation.load(Ordering::SeqCst) != ticket {
            return self.supersede(Operation::Get, result);
        }

        match result {
            Ok(city) => {
                self.dispatch(CitiesAction::CityLoaded(city.clone()));
                Ok(city)
            }
            Err(err) => Err(self.reject(Operation::Get, err)),
        }
    }

    /// Persists the draft; does not navigate.
    pub async fn create_city(&self, draft: &CityDraft) -> Result<City, CitiesError> {
        self.dispatch(CitiesAction::Loading);

        match self.api.create_city(draft).await {
            Ok(city) => {
                info!(id = %city.id, city = %city.city_name, "city created");
                self.invalidate_lists();
                self.dispatch(CitiesAction::CityCreated(city.clone()));
                Ok(city)
            }
            Err(err) => Err(self.reject(Operation::Create, err)),
        }
    }

    /// Removes the entry only after the backend acknowledged the deletion.
    pub async fn delete_city(&self, id: &CityId) -> Result<(), CitiesError> {
        self.dispatch(CitiesAction::Loading);

        match self.api.delete_city(id).await {
            Ok(()) => {
                info!(%id, "city deleted");
                self.invalidate_lists();
                self.dispatch(CitiesAction::CityDeleted(id.clone()));
                Ok(())
            }
            Err(err) => Err(self.reject(Operation::Delete, err)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Position;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::{
        error::Error as _,
        sync::{
            Mutex,
            atomic::{AtomicBool, AtomicUsize},
        },
        time::Duration,
    };

    pub(crate) fn city(id: &str, name: &str) -> City {
        City {
            id: CityId::new(id),
            city_name: name.to_string(),
            country: "Somewhere".to_string(),
            date: "2027-05-01T10:00:00Z".parse().expect("valid date"),
            notes: String::new(),
            position: Position { lat: 1.0, lng: 2.0 },
        }
    }

    fn server_error(operation: &'static str) -> ApiError {
        ApiError::Status {
            operation,
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }
    }

    /// In-memory backend. Reads sleep for the configured delays so tests can
    /// make responses arrive out of order under paused time. A collection
    /// read snapshots before sleeping.
    #[derive(Debug, Default)]
    pub(crate) struct FakeApi {
        pub cities: Mutex<Vec<City>>,
        pub fail: AtomicBool,
        pub fail_list: AtomicBool,
        pub list_delay_ms: AtomicU64,
        pub next_id: AtomicUsize,
        pub creates: AtomicUsize,
        pub get_delays_ms: Mutex<Vec<(String, u64)>>,
    }

    impl FakeApi {
        pub(crate) fn with(cities: Vec<City>) -> Self {
            Self { cities: Mutex::new(cities), next_id: AtomicUsize::new(100), ..Self::default() }
        }

        fn failing(&self) -> bool {
            self.fail.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CitiesApi for FakeApi {
        async fn list_cities(&self) -> Result<Vec<City>, ApiError> {
            if self.failing() || self.fail_list.load(Ordering::SeqCst) {
                return Err(server_error("list"));
            }
            let snapshot = self.cities.lock().expect("lock").clone();
            let delay = self.list_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(snapshot)
        }

        async fn get_city(&self, id: &CityId) -> Result<City, ApiError> {
            let delay = self
                .get_delays_ms
                .lock()
                .expect("lock")
                .iter()
                .find(|(key, _)| key == id.as_str())
                .map(|(_, ms)| *ms);
            if let Some(ms) = delay {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if self.failing() {
                return Err(server_error("get"));
            }
            self.cities
                .lock()
                .expect("lock")
                .iter()
                .find(|c| &c.id == id)
                .cloned()
                .ok_or(ApiError::Status {
                    operation: "get",
                    status: StatusCode::NOT_FOUND,
                    body: "{}".to_string(),
                })
        }

        async fn create_city(&self, draft: &CityDraft) -> Result<City, ApiError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.failing() {
                return Err(server_error("create"));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            let created = City::from_draft(CityId::new(id), draft.clone());
            self.cities.lock().expect("lock").push(created.clone());
            Ok(created)
        }

        async fn delete_city(&self, id: &CityId) -> Result<(), ApiError> {
            if self.failing() {
                return Err(server_error("delete"));
            }
            self.cities.lock().expect("lock").retain(|c| &c.id != id);
            Ok(())
        }
    }

    fn draft(name: &str) -> CityDraft {
        CityDraft {
            city_name: name.to_string(),
            country: "France".to_string(),
            date: "2027-03-03T00:00:00Z".parse().expect("valid date"),
            notes: "croissants".to_string(),
            position: Position { lat: 48.8, lng: 2.3 },
        }
    }

    #[test]
    fn loading_then_terminal_clears_flag() {
        let state = reduce(CitiesState::default(), CitiesAction::Loading);
        assert!(state.is_loading);

        let state = reduce(state, CitiesAction::CitiesLoaded(vec![city("1", "Lisbon")]));
        assert!(!state.is_loading);
        assert_eq!(state.cities.len(), 1);
    }

    #[test]
    fn overlapping_requests_keep_loading_until_last_resolves() {
        let state = reduce(CitiesState::default(), CitiesAction::Loading);
        let state = reduce(state, CitiesAction::Loading);
        let state = reduce(state, CitiesAction::Rejected("nope".into()));
        assert!(state.is_loading);
        assert_eq!(state.pending(), 1);

        let state = reduce(state, CitiesAction::Superseded);
        assert!(!state.is_loading);
    }

    #[test]
    fn error_survives_loading_and_clears_on_success() {
        let state = reduce(CitiesState::default(), CitiesAction::Loading);
        let state = reduce(state, CitiesAction::Rejected("bad".into()));
        let state = reduce(state, CitiesAction::Loading);
        assert_eq!(state.error.as_deref(), Some("bad"));

        let state = reduce(state, CitiesAction::CityLoaded(city("1", "Rome")));
        assert_eq!(state.error, None);
    }

    #[test]
    fn delete_keeps_order_of_the_rest() {
        let state = CitiesState {
            cities: vec![city("1", "A"), city("2", "B"), city("3", "C")],
            ..CitiesState::default()
        };
        let state = reduce(state, CitiesAction::Loading);
        let state = reduce(state, CitiesAction::CityDeleted("2".into()));
        let names: Vec<_> = state.cities.iter().map(|c| c.city_name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[tokio::test]
    async fn start_loads_collection_once() {
        let provider = CitiesProvider::start(FakeApi::with(vec![city("1", "Lisbon")])).await;
        let state = provider.state();
        assert_eq!(state.cities, vec![city("1", "Lisbon")]);
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn failed_initial_load_stores_static_message() {
        let api = FakeApi::with(vec![city("1", "Lisbon")]);
        api.fail.store(true, Ordering::SeqCst);

        let provider = CitiesProvider::start(api).await;
        let state = provider.state();
        assert!(state.cities.is_empty());
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("There was an error loading cities"));
    }

    #[tokio::test]
    async fn create_appends_backend_entity_and_sets_current() {
        let provider = CitiesProvider::start(FakeApi::with(vec![city("1", "Lisbon")])).await;

        let created = provider.create_city(&draft("Paris")).await.expect("created");
        let state = provider.state();

        assert_eq!(created.id, CityId::new("100"));
        assert_eq!(state.cities.len(), 2);
        assert_eq!(state.cities.last(), Some(&created));
        assert_eq!(state.current_city.as_ref(), Some(&created));
        assert_eq!(state.cities.iter().filter(|c| c.id == created.id).count(), 1);
    }

    #[tokio::test]
    async fn failed_create_leaves_collection_untouched() {
        let provider = CitiesProvider::start(FakeApi::with(vec![city("1", "Lisbon")])).await;
        provider.api().fail.store(true, Ordering::SeqCst);

        let err = provider.create_city(&draft("Paris")).await.unwrap_err();
        let state = provider.state();

        assert_eq!(err.to_string(), "There was an error creating cities");
        assert!(err.source().is_some());
        assert_eq!(state.cities.len(), 1);
        assert_eq!(state.error.as_deref(), Some("There was an error creating cities"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn delete_removes_only_after_acknowledgement() {
        let provider = CitiesProvider::start(FakeApi::with(vec![
            city("1", "Lisbon"),
            city("2", "Madrid"),
            city("3", "Berlin"),
        ]))
        .await;

        provider.api().fail.store(true, Ordering::SeqCst);
        assert!(provider.delete_city(&CityId::new("2")).await.is_err());
        assert_eq!(provider.state().cities.len(), 3);

        provider.api().fail.store(false, Ordering::SeqCst);
        provider.delete_city(&CityId::new("2")).await.expect("deleted");
        let ids: Vec<_> = provider.state().cities.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[tokio::test]
    async fn get_sets_current_city() {
        let provider = CitiesProvider::new(FakeApi::with(vec![city("7", "Oslo")]));
        provider.get_city(&CityId::new("7")).await.expect("found");
        assert_eq!(provider.state().current_city, Some(city("7", "Oslo")));

        let err = provider.get_city(&CityId::new("8")).await.unwrap_err();
        assert_eq!(err.operation, Operation::Get);
        assert_eq!(provider.state().error.as_deref(), Some("There was an error loading city"));
        // failed read keeps the last good current city
        assert_eq!(provider.state().current_city, Some(city("7", "Oslo")));
    }

    #[tokio::test]
    async fn subscribers_observe_loading_transition() {
        let provider = CitiesProvider::new(FakeApi::with(vec![city("1", "Lisbon")]));
        let mut rx = provider.subscribe();

        provider.list_cities().await.expect("listed");
        assert!(rx.has_changed().expect("sender alive"));
        let seen = rx.borrow_and_update().clone();
        assert!(!seen.is_loading);
        assert_eq!(seen.cities.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_get_response_does_not_overwrite_newer_one() {
        let api = FakeApi::with(vec![city("slow", "Slowtown"), city("fast", "Fastville")]);
        *api.get_delays_ms.lock().expect("lock") =
            vec![("slow".to_string(), 50), ("fast".to_string(), 10)];
        let provider = CitiesProvider::new(api);

        let slow_id = CityId::new("slow");
        let fast_id = CityId::new("fast");
        let (slow, fast) = tokio::join!(provider.get_city(&slow_id), provider.get_city(&fast_id));

        // both requests still succeed for their callers
        assert_eq!(slow.expect("slow ok").city_name, "Slowtown");
        assert_eq!(fast.expect("fast ok").city_name, "Fastville");

        let state = provider.state();
        assert_eq!(
            state.current_city.as_ref().map(|c| c.city_name.as_str()),
            Some("Fastville")
        );
        assert!(!state.is_loading);
        assert_eq!(state.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_failed_get_reports_cause_without_touching_state() {
        let api = FakeApi::with(vec![city("fast", "Fastville")]);
        *api.get_delays_ms.lock().expect("lock") =
            vec![("missing".to_string(), 50), ("fast".to_string(), 10)];
        let provider = CitiesProvider::new(api);

        let missing = CityId::new("missing");
        let fast = CityId::new("fast");
        let (stale, fresh) = tokio::join!(provider.get_city(&missing), provider.get_city(&fast));

        let err = stale.unwrap_err();
        assert_eq!(err.operation, Operation::Get);
        assert!(matches!(err.source, ApiError::Status { status: StatusCode::NOT_FOUND, .. }));
        assert!(fresh.is_ok());

        let state = provider.state();
        assert_eq!(state.error, None);
        assert_eq!(state.current_city, Some(city("fast", "Fastville")));
        assert_eq!(state.pending(), 0);
    }

    #[test]
    fn created_entry_already_listed_is_not_duplicated() {
        let state = reduce(CitiesState::default(), CitiesAction::Loading);
        let listed = vec![city("1", "A"), city("9", "New")];
        let state = reduce(state, CitiesAction::CitiesLoaded(listed));
        let state = reduce(state, CitiesAction::Loading);
        let state = reduce(state, CitiesAction::CityCreated(city("9", "New")));

        let ids: Vec<_> = state.cities.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, ["1", "9"]);
        assert_eq!(state.current_city, Some(city("9", "New")));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_list_does_not_drop_a_created_city() {
        let api = FakeApi::with(vec![city("1", "Lisbon")]);
        api.list_delay_ms.store(50, Ordering::SeqCst);
        let provider = CitiesProvider::new(api);

        let paris = draft("Paris");
        let (listed, created) = tokio::join!(provider.list_cities(), provider.create_city(&paris));

        // the caller still gets its (older) snapshot
        assert_eq!(listed.expect("listed").len(), 1);
        let created = created.expect("created");

        let state = provider.state();
        let ids: Vec<_> = state.cities.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, [CityId::new("1"), created.id.clone()]);
        assert_eq!(state.current_city, Some(created));
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_list_does_not_bring_back_a_deleted_city() {
        let api = FakeApi::with(vec![city("1", "Lisbon"), city("2", "Madrid")]);
        api.list_delay_ms.store(50, Ordering::SeqCst);
        let provider = CitiesProvider::start(api).await;

        let madrid = CityId::new("2");
        let (listed, deleted) = tokio::join!(provider.list_cities(), provider.delete_city(&madrid));
        assert!(listed.is_ok());
        deleted.expect("deleted");

        let state = provider.state();
        let ids: Vec<_> = state.cities.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, ["1"]);
        assert_eq!(state.pending(), 0);
    }

    #[tokio::test]
    async fn list_after_mutation_still_applies() {
        let provider = CitiesProvider::start(FakeApi::with(vec![city("1", "Lisbon")])).await;
        provider.create_city(&draft("Paris")).await.expect("created");

        provider.api().cities.lock().expect("lock").push(city("7", "Oslo"));
        provider.list_cities().await.expect("listed");
        assert_eq!(provider.state().cities.len(), 3);
    }

    #[tokio::test]
    async fn mutation_after_failed_load_leaves_collection_unloaded() {
        let api = FakeApi::with(vec![city("1", "Lisbon")]);
        api.fail_list.store(true, Ordering::SeqCst);
        let provider = CitiesProvider::start(api).await;
        assert!(!provider.state().collection_loaded());

        provider.create_city(&draft("Paris")).await.expect("created");
        let state = provider.state();

        // success clears the error, but the list only holds the new entry
        assert_eq!(state.error, None);
        assert_eq!(state.cities.len(), 1);
        assert!(!state.collection_loaded());
    }
}
