//! Actions of the persons feature and the process-level system actions

use mini_flux::prelude::*;

use crate::filter::PersonsFilter;
use crate::model::Person;

/// Fetch `count` more persons
#[derive(Action, Debug, Clone)]
pub struct LoadPersonsAction {
    pub count: usize,
}

/// Outcome of a load, dispatched back by the controller
#[derive(Action, Debug, Clone)]
pub struct PersonsLoadedAction {
    pub persons: Vec<Person>,
    pub load_task: Task,
}

#[derive(Action, Debug, Clone)]
pub struct DeletePersonAction {
    pub person: Person,
}

#[derive(Action, Debug, Clone)]
pub struct TogglePersonFavAction {
    pub person: Person,
}

#[derive(Action, Debug, Clone)]
pub struct UpdateFilterAction {
    pub filter: PersonsFilter,
}

/// Memory pressure hint, higher levels ask for more to be released
#[derive(Action, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnTrimMemoryAction {
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Restarted,
    Destroyed,
}

/// Frequent and uninteresting, left out of the action log
#[derive(Action, Debug, Clone, Copy, PartialEq, Eq)]
#[action(tags(Silent))]
pub struct OnLifecycleAction {
    pub stage: LifecycleStage,
}
