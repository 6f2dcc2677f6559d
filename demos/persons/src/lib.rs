//! Random persons sample built on mini-flux
//!
//! A [`PersonsStore`](store::PersonsStore) keeps the loaded persons, a
//! favorite flag per person and the active [`PersonsFilter`](filter::PersonsFilter).
//! Loads run on a tokio runtime through a [`PersonController`](controller::PersonController)
//! and come back to the UI thread as actions.

pub mod actions;
pub mod app;
pub mod controller;
pub mod filter;
pub mod model;
pub mod store;

pub use actions::*;
pub use app::PersonsApp;
pub use controller::{
    PersonController, PersonControllerImpl, PersonSource, SampleSource, SourceError,
};
pub use filter::PersonsFilter;
pub use model::{Gender, LatLon, Location, Person, Picture};
pub use store::{PersonState, PersonsStore};
