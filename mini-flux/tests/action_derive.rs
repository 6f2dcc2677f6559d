//! Tests for #[derive(Action)] macro

#![allow(dead_code)]

use mini_flux::{Action, ActionRef, IntoAction, Silent, Tag};

#[test]
fn test_struct_name_and_self_tag() {
    #[derive(Action, Debug)]
    struct LoadPersonsAction {
        count: usize,
    }

    let action = LoadPersonsAction { count: 2 };
    assert_eq!(action.name(), "LoadPersonsAction");
    assert!(action.tags().contains(Tag::of::<LoadPersonsAction>()));
    assert_eq!(action.tags().len(), 1);
}

#[test]
fn test_explicit_name() {
    #[derive(Action, Debug)]
    #[action(name = "Load")]
    struct LoadPersonsAction;

    assert_eq!(LoadPersonsAction.name(), "Load");
}

#[test]
fn test_extra_tags() {
    struct Audited;

    #[derive(Action, Debug)]
    #[action(tags(Silent, Audited))]
    struct HeartbeatAction;

    let action: ActionRef = HeartbeatAction.into_action();
    let tags: Vec<_> = action.tags().iter().collect();
    assert_eq!(
        tags,
        vec![
            Tag::of::<HeartbeatAction>(),
            Tag::of::<Silent>(),
            Tag::of::<Audited>()
        ]
    );
    assert!(action.has_tag::<Silent>());
}

#[test]
fn test_enum_variant_names() {
    #[derive(Action, Debug)]
    enum LifecycleAction {
        Started,
        Paused(u32),
        #[action(name = "Stopping")]
        Stopped {
            reason: String,
        },
    }

    assert_eq!(LifecycleAction::Started.name(), "Started");
    assert_eq!(LifecycleAction::Paused(1).name(), "Paused");
    assert_eq!(
        LifecycleAction::Stopped {
            reason: "bye".into()
        }
        .name(),
        "Stopping"
    );
}

#[test]
fn test_downcast_from_action_ref() {
    #[derive(Action, Debug, PartialEq)]
    struct DeleteAction {
        id: String,
    }

    let action: ActionRef = DeleteAction { id: "a".into() }.into_action();
    assert!(action.is::<DeleteAction>());
    assert_eq!(
        action.downcast_ref::<DeleteAction>(),
        Some(&DeleteAction { id: "a".into() })
    );
}
