//! Loading persons off the UI thread
//!
//! [`PersonController`] is what the store calls; [`PersonControllerImpl`]
//! runs a [`PersonSource`] on a tokio runtime and dispatches the outcome
//! back to the UI thread as a single [`PersonsLoadedAction`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use mini_flux::{task_failure, task_success, Dispatcher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::actions::PersonsLoadedAction;
use crate::model::{Gender, LatLon, Location, Person, Picture};

/// Starts loads requested by the store
pub trait PersonController: Send + Sync {
    /// Fetch `count` persons. Must not block; the result arrives as a
    /// [`PersonsLoadedAction`].
    fn load_persons(&self, count: usize);
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("person source unavailable: {0}")]
    Unavailable(String),
    #[error("requested {requested} persons, at most {max} per load")]
    TooMany { requested: usize, max: usize },
}

pub type SourceFuture = Pin<Box<dyn Future<Output = Result<Vec<Person>, SourceError>> + Send>>;

/// Where persons come from
pub trait PersonSource: Send + Sync {
    fn fetch(&self, count: usize) -> SourceFuture;
}

pub struct PersonControllerImpl {
    dispatcher: Dispatcher,
    source: Arc<dyn PersonSource>,
    runtime: Handle,
}

impl PersonControllerImpl {
    pub fn new(dispatcher: Dispatcher, source: Arc<dyn PersonSource>, runtime: Handle) -> Self {
        Self {
            dispatcher,
            source,
            runtime,
        }
    }
}

impl PersonController for PersonControllerImpl {
    fn load_persons(&self, count: usize) {
        let dispatcher = self.dispatcher.clone();
        let fetch = self.source.fetch(count);
        self.runtime.spawn(async move {
            let action = match fetch.await {
                Ok(persons) => {
                    debug!(requested = count, loaded = persons.len(), "persons fetched");
                    PersonsLoadedAction {
                        persons,
                        load_task: task_success(()),
                    }
                }
                Err(e) => {
                    warn!(requested = count, error = %e, "persons fetch failed");
                    PersonsLoadedAction {
                        persons: Vec::new(),
                        load_task: task_failure((), Some(e.into())),
                    }
                }
            };
            dispatcher.dispatch_on_ui(action);
        });
    }
}

const FIRST_NAMES: &[(&str, Gender)] = &[
    ("ritthy", Gender::Male),
    ("lucas", Gender::Male),
    ("mateo", Gender::Male),
    ("hugo", Gender::Male),
    ("noah", Gender::Male),
    ("lucia", Gender::Female),
    ("martina", Gender::Female),
    ("sofia", Gender::Female),
    ("julia", Gender::Female),
    ("paula", Gender::Female),
    ("alex", Gender::Other),
    ("sam", Gender::Other),
];

const SURNAMES: &[&str] = &[
    "sanders", "garcia", "lopez", "martin", "sanchez", "perez", "gomez", "ruiz",
];

const STREETS: &[&str] = &[
    "springfield road",
    "calle de alcala",
    "gran via",
    "paseo de la castellana",
    "calle mayor",
];

/// Largest batch a single load may ask for
pub const MAX_PER_LOAD: usize = 500;

/// Deterministic, offline person generator
///
/// Emails repeat across loads, which exercises de-duplication. Roughly half
/// of the persons live within a few hundred metres of Madrid, the rest
/// spread over a wider box.
#[derive(Debug, Clone)]
pub struct SampleSource {
    seed: u64,
    latency: Duration,
    fail: bool,
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

impl SampleSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            latency: Duration::ZERO,
            fail: false,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every fetch fail with [`SourceError::Unavailable`]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Generate `count` persons without waiting
    pub fn generate(&self, count: usize) -> Vec<Person> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count).map(|_| sample_person(&mut rng)).collect()
    }
}

impl PersonSource for SampleSource {
    fn fetch(&self, count: usize) -> SourceFuture {
        let source = self.clone();
        Box::pin(async move {
            if !source.latency.is_zero() {
                tokio::time::sleep(source.latency).await;
            }
            if source.fail {
                return Err(SourceError::Unavailable("sample source set to fail".into()));
            }
            if count > MAX_PER_LOAD {
                return Err(SourceError::TooMany {
                    requested: count,
                    max: MAX_PER_LOAD,
                });
            }
            Ok(source.generate(count))
        })
    }
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

fn sample_person(rng: &mut StdRng) -> Person {
    let (name, gender) = pick(rng, FIRST_NAMES);
    let surname = pick(rng, SURNAMES);
    let street = pick(rng, STREETS);
    let number = rng.random_range(100..9100);
    let index = rng.random_range(0..100);

    // Either a few hundred metres from Madrid or up to ~40km away
    let spread = if rng.random_bool(0.5) { 0.003 } else { 0.4 };
    let lat_lon = LatLon::new(
        LatLon::MADRID.latitude + rng.random_range(-1.0f32..=1.0) * spread,
        LatLon::MADRID.longitude + rng.random_range(-1.0f32..=1.0) * spread,
    );

    Person {
        name: name.to_string(),
        surname: surname.to_string(),
        email: format!("{name}.{surname}@example.com"),
        picture: Picture {
            thumb: format!("https://randomuser.me/api/portraits/thumb/men/{index}.jpg"),
            big: format!("https://randomuser.me/api/portraits/men/{index}.jpg"),
        },
        phone: format!(
            "0{:05} {:05}",
            rng.random_range(0..100_000),
            rng.random_range(0..100_000)
        ),
        gender,
        favorite: false,
        location: Location {
            street: format!("{number} {street}"),
            city: "madrid".to_string(),
            state: "comunidad de madrid".to_string(),
            lat_lon,
        },
    }
}
