//! Persons state and its store
//!
//! All reducers run on the UI thread. Loading is delegated to a
//! [`PersonController`]; its outcome comes back as a
//! [`PersonsLoadedAction`].

use std::collections::HashSet;

use mini_flux::prelude::*;
use tracing::debug;

use crate::actions::{
    DeletePersonAction, LoadPersonsAction, OnTrimMemoryAction, PersonsLoadedAction,
    TogglePersonFavAction, UpdateFilterAction,
};
use crate::controller::PersonController;
use crate::filter::PersonsFilter;
use crate::model::Person;

#[derive(Debug, Clone, Default, PartialEq, DebugState)]
pub struct PersonState {
    /// `None` until the first load finished
    #[debug(with = "count_persons")]
    pub persons: Option<Vec<Person>>,
    #[debug(label = "load", with = "task_status")]
    pub load_persons_task: Task,
    #[debug(section = "Filter", label = "filter", with = "describe_filter")]
    pub active_filter: PersonsFilter,
}

impl PersonState {
    /// Loaded persons after the active filter
    pub fn visible_persons(&self) -> Vec<Person> {
        match &self.persons {
            Some(persons) => self.active_filter.apply(persons),
            None => Vec::new(),
        }
    }

    pub fn favorites(&self) -> usize {
        self.persons
            .iter()
            .flatten()
            .filter(|p| p.favorite)
            .count()
    }
}

fn count_persons(persons: &Option<Vec<Person>>) -> String {
    match persons {
        Some(persons) => persons.len().to_string(),
        None => "-".to_string(),
    }
}

fn task_status(task: &Task) -> String {
    match &task.error {
        Some(error) => format!("{:?} ({error})", task.status),
        None => format!("{:?}", task.status),
    }
}

fn describe_filter(filter: &PersonsFilter) -> String {
    let mut parts = Vec::new();
    if let Some(text) = &filter.text {
        parts.push(format!("text={text}"));
    }
    if let (Some(km), Some(_)) = (filter.distance_km, filter.current_location) {
        parts.push(format!("within={km}km"));
    }
    if filter.sort_by_name {
        parts.push("sort=name".to_string());
    } else if filter.sort_by_gender {
        parts.push("sort=gender".to_string());
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}

/// Previous persons followed by the new ones, first occurrence of each id wins
fn merge_persons(previous: &[Person], loaded: &[Person]) -> Vec<Person> {
    let mut seen = HashSet::new();
    previous
        .iter()
        .chain(loaded)
        .filter(|p| seen.insert(p.id().to_string()))
        .cloned()
        .collect()
}

pub struct PersonsStore {
    state: StoreState<PersonState>,
    controller: Arc<dyn PersonController>,
}

impl PersonsStore {
    pub fn new(dispatcher: &Dispatcher, controller: Arc<dyn PersonController>) -> Self {
        Self {
            state: StoreState::with_default(dispatcher),
            controller,
        }
    }

    fn on_load(&self, action: &LoadPersonsAction) {
        let state = self.state();
        if state.load_persons_task.is_running() {
            debug!(count = action.count, "persons load already running, ignoring");
            return;
        }
        self.state.set_state(PersonState {
            load_persons_task: task_running(()),
            ..(*state).clone()
        });
        self.controller.load_persons(action.count);
    }

    fn on_loaded(&self, action: &PersonsLoadedAction) {
        self.state.update(|state| {
            let persons = if action.load_task.is_successful() {
                let previous = state.persons.as_deref().unwrap_or_default();
                Some(merge_persons(previous, &action.persons))
            } else {
                state.persons.clone()
            };
            PersonState {
                persons,
                load_persons_task: action.load_task.clone(),
                ..state.clone()
            }
        });
    }

    fn on_delete(&self, action: &DeletePersonAction) {
        self.state.update(|state| PersonState {
            persons: state.persons.as_ref().map(|persons| {
                persons
                    .iter()
                    .filter(|p| **p != action.person)
                    .cloned()
                    .collect()
            }),
            ..state.clone()
        });
    }

    fn on_toggle_favorite(&self, action: &TogglePersonFavAction) {
        self.state.update(|state| PersonState {
            persons: state.persons.as_ref().map(|persons| {
                persons
                    .iter()
                    .map(|p| {
                        if *p == action.person {
                            Person {
                                favorite: !p.favorite,
                                ..p.clone()
                            }
                        } else {
                            p.clone()
                        }
                    })
                    .collect()
            }),
            ..state.clone()
        });
    }

    fn on_update_filter(&self, action: &UpdateFilterAction) {
        self.state.update(|state| PersonState {
            active_filter: action.filter.clone(),
            ..state.clone()
        });
    }
}

impl Store for PersonsStore {
    type State = PersonState;

    fn state_holder(&self) -> &StoreState<PersonState> {
        &self.state
    }

    fn init(self: &Arc<Self>) {
        self.subscribe(|store: &Self, action: &LoadPersonsAction| store.on_load(action));
        self.subscribe(|store: &Self, action: &PersonsLoadedAction| store.on_loaded(action));
        self.subscribe(|store: &Self, action: &DeletePersonAction| store.on_delete(action));
        self.subscribe(|store: &Self, action: &TogglePersonFavAction| {
            store.on_toggle_favorite(action)
        });
        self.subscribe(|store: &Self, action: &UpdateFilterAction| {
            store.on_update_filter(action)
        });
        self.subscribe(|_: &Self, action: &OnTrimMemoryAction| {
            debug!(level = action.level, "trim memory, persons kept");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, LatLon, Location, Picture};

    fn person(name: &str, email: &str) -> Person {
        Person {
            name: name.to_string(),
            surname: "doe".to_string(),
            email: email.to_string(),
            picture: Picture {
                thumb: String::new(),
                big: String::new(),
            },
            phone: String::new(),
            gender: Gender::Other,
            favorite: false,
            location: Location {
                street: String::new(),
                city: String::new(),
                state: String::new(),
                lat_lon: LatLon::new(0.0, 0.0),
            },
        }
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let previous = vec![person("a", "a@x"), person("b", "b@x")];
        let loaded = vec![person("b2", "b@x"), person("c", "c@x"), person("c2", "c@x")];

        let names: Vec<_> = merge_persons(&previous, &loaded)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_debug_sections() {
        let state = PersonState {
            persons: Some(vec![person("a", "a@x")]),
            load_persons_task: task_success(()),
            active_filter: PersonsFilter::new().with_text("a").sorted_by_name(),
        };

        let sections = state.debug_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "PersonState");
        assert_eq!(sections[0].get("persons"), Some("1"));
        assert_eq!(sections[0].get("load"), Some("Success"));
        assert_eq!(sections[1].get("filter"), Some("text=a sort=name"));
    }

    #[test]
    fn test_visible_persons_empty_before_load() {
        assert!(PersonState::default().visible_persons().is_empty());
        assert_eq!(count_persons(&None), "-");
    }
}
