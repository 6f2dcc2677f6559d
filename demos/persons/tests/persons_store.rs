//! Reducers of the persons store, driven on the test thread

mod common;

use std::sync::Arc;

use common::{any_person, person, RecordingController};
use mini_flux::prelude::*;
use mini_flux::testing::{test_dispatcher, TestInterceptorGuard};
use mini_flux::{assert_dispatched, assert_not_dispatched, count_dispatched, UiLoop};
use persons_demo::*;

fn setup() -> (Dispatcher, UiLoop, Arc<PersonsStore>, Arc<RecordingController>) {
    let (dispatcher, ui_loop) = test_dispatcher();
    let controller = Arc::new(RecordingController::default());
    let store = Arc::new(PersonsStore::new(&dispatcher, controller.clone()));
    init_stores(&[store.clone() as Arc<dyn AnyStore>]);
    (dispatcher, ui_loop, store, controller)
}

fn loaded(persons: Vec<Person>) -> PersonsLoadedAction {
    PersonsLoadedAction {
        persons,
        load_task: task_success(()),
    }
}

#[test]
fn test_initial_state() {
    let (_dispatcher, _ui_loop, store, _) = setup();
    let state = store.state();
    assert!(state.persons.is_none());
    assert!(state.load_persons_task.is_idle());
    assert_eq!(state.active_filter, PersonsFilter::default());
}

#[test]
fn test_load_sets_running_and_calls_controller() {
    let (dispatcher, _ui_loop, store, controller) = setup();

    dispatcher.dispatch(LoadPersonsAction { count: 5 });

    assert!(store.state().load_persons_task.is_running());
    assert_eq!(controller.counts(), vec![5]);
}

#[test]
fn test_load_ignored_while_running() {
    let (dispatcher, _ui_loop, store, controller) = setup();

    dispatcher.dispatch(LoadPersonsAction { count: 5 });
    let running = store.state();
    dispatcher.dispatch(LoadPersonsAction { count: 7 });

    assert_eq!(controller.calls(), 1);
    assert!(Arc::ptr_eq(&running, &store.state()));
}

#[test]
fn test_loaded_merges_and_removes_duplicates() {
    let (dispatcher, _ui_loop, store, _) = setup();
    let a = person("a", Gender::Male);
    let b = person("b", Gender::Female);
    let c = person("c", Gender::Other);

    dispatcher.dispatch(loaded(vec![a.clone(), b.clone()]));
    dispatcher.dispatch(loaded(vec![
        Person {
            favorite: true,
            ..b.clone()
        },
        c.clone(),
        c.clone(),
    ]));

    let state = store.state();
    assert_eq!(state.persons, Some(vec![a, b, c]));
    assert!(state.load_persons_task.is_successful());
}

#[test]
fn test_failed_load_keeps_persons() {
    let (dispatcher, _ui_loop, store, controller) = setup();
    store.state_holder().set_test_state(PersonState {
        persons: Some(vec![any_person()]),
        ..PersonState::default()
    });

    dispatcher.dispatch(LoadPersonsAction { count: 1 });
    let error = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
    dispatcher.dispatch(PersonsLoadedAction {
        persons: Vec::new(),
        load_task: task_failure((), Some(error.into())),
    });

    let state = store.state();
    assert_eq!(state.persons, Some(vec![any_person()]));
    assert!(state.load_persons_task.is_failure());
    assert_eq!(
        state.load_persons_task.error.as_ref().map(ToString::to_string),
        Some("timeout".to_string())
    );

    // A failed task is terminal, loading again is allowed
    dispatcher.dispatch(LoadPersonsAction { count: 1 });
    assert_eq!(controller.calls(), 2);
}

#[test]
fn test_delete_person() {
    let (dispatcher, _ui_loop, store, _) = setup();
    let other = person("other", Gender::Female);
    store.state_holder().set_test_state(PersonState {
        persons: Some(vec![any_person(), other.clone()]),
        ..PersonState::default()
    });

    dispatcher.dispatch(DeletePersonAction {
        person: any_person(),
    });

    assert_eq!(store.state().persons, Some(vec![other]));
}

#[test]
fn test_delete_before_load_keeps_none() {
    let (dispatcher, _ui_loop, store, _) = setup();

    dispatcher.dispatch(DeletePersonAction {
        person: any_person(),
    });

    assert!(store.state().persons.is_none());
}

#[test]
fn test_toggle_favorite() {
    let (dispatcher, _ui_loop, store, _) = setup();
    let other = person("other", Gender::Female);
    store.state_holder().set_test_state(PersonState {
        persons: Some(vec![any_person(), other.clone()]),
        ..PersonState::default()
    });

    dispatcher.dispatch(TogglePersonFavAction {
        person: any_person(),
    });

    let state = store.state();
    let persons = state.persons.as_ref().unwrap();
    assert!(persons[0].favorite);
    assert!(!persons[1].favorite);
    assert_eq!(state.favorites(), 1);

    // The toggled person no longer equals the stale copy
    dispatcher.dispatch(TogglePersonFavAction {
        person: any_person(),
    });
    assert_eq!(store.state().favorites(), 1);
}

#[test]
fn test_update_filter_and_visible_persons() {
    let (dispatcher, _ui_loop, store, _) = setup();
    store.state_holder().set_test_state(PersonState {
        persons: Some(vec![
            person("zoe", Gender::Female),
            person("adam", Gender::Male),
            person("zack", Gender::Male),
        ]),
        ..PersonState::default()
    });

    dispatcher.dispatch(UpdateFilterAction {
        filter: PersonsFilter::new().with_text("Z").sorted_by_name(),
    });

    let names: Vec<_> = store
        .state()
        .visible_persons()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["zack", "zoe"]);
}

#[test]
fn test_muted_dispatcher_records_without_reducing() {
    let (dispatcher, _ui_loop, store, controller) = setup();
    let muted = TestInterceptorGuard::install(&dispatcher);

    dispatcher.dispatch(LoadPersonsAction { count: 3 });
    dispatcher.dispatch(UpdateFilterAction {
        filter: PersonsFilter::new().sorted_by_gender(),
    });

    let actions = muted.actions();
    assert_dispatched!(actions, LoadPersonsAction, LoadPersonsAction { count: 3 });
    assert_dispatched!(actions, UpdateFilterAction, UpdateFilterAction { filter } if filter.sort_by_gender);
    assert_not_dispatched!(actions, DeletePersonAction);
    assert_eq!(count_dispatched!(actions, LoadPersonsAction), 1);

    assert_eq!(controller.calls(), 0);
    assert!(store.state().load_persons_task.is_idle());
}

#[test]
fn test_closed_store_stops_reducing() {
    let (dispatcher, _ui_loop, store, controller) = setup();
    Store::close(store.as_ref());

    dispatcher.dispatch(LoadPersonsAction { count: 3 });

    assert_eq!(controller.calls(), 0);
    assert_eq!(store.state_holder().tracked(), 0);
    assert_eq!(dispatcher.subscription_count(Tag::of::<LoadPersonsAction>()), 0);
}
