#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use persons_demo::{Gender, LatLon, Location, Person, PersonController, Picture};

pub fn any_person() -> Person {
    Person {
        name: "ritthy".to_string(),
        surname: "sanders".to_string(),
        email: "ritthy.sanders@example.com".to_string(),
        picture: Picture {
            thumb: "https://randomuser.me/api/portraits/thumb/men/57.jpg".to_string(),
            big: "https://randomuser.me/api/portraits/men/57.jpg".to_string(),
        },
        phone: "017684 89648".to_string(),
        gender: Gender::Male,
        favorite: false,
        location: Location {
            street: "6676 springfield road".to_string(),
            city: "wells".to_string(),
            state: "staffordshire".to_string(),
            lat_lon: LatLon::new(0.0, 0.0),
        },
    }
}

/// `any_person` with another identity
pub fn person(name: &str, gender: Gender) -> Person {
    Person {
        name: name.to_string(),
        email: format!("{name}.sanders@example.com"),
        gender,
        ..any_person()
    }
}

/// Controller that only records the requested counts
#[derive(Default)]
pub struct RecordingController {
    calls: AtomicUsize,
    counts: Mutex<Vec<usize>>,
}

impl RecordingController {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> Vec<usize> {
        self.counts.lock().unwrap().clone()
    }
}

impl PersonController for RecordingController {
    fn load_persons(&self, count: usize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.counts.lock().unwrap().push(count);
    }
}
