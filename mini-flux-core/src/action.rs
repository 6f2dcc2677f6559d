//! Action trait and routing tags

use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Trait for values that can be dispatched through a [`Dispatcher`](crate::Dispatcher)
///
/// Actions describe something that happened. They should be:
/// - Immutable: interceptors and subscribers only ever see `&self`
/// - Debug: for logging and test assertions
/// - Send + Sync + 'static: actions are shared as [`ActionRef`] across threads
///
/// Use `#[derive(Action)]` from `mini-flux-macros` to implement this trait.
/// Manual implementations must include the concrete type in [`Action::tags`],
/// otherwise typed subscriptions will never see the action.
pub trait Action: Any + Debug + Send + Sync {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;

    /// Routing tags this action is delivered under
    fn tags(&self) -> Tags;

    /// Upcast used by typed subscriptions to recover the concrete type
    fn as_any(&self) -> &dyn Any;
}

/// Shared, type-erased action as it travels through the interceptor chain
pub type ActionRef = Arc<dyn Action>;

/// Conversion into an [`ActionRef`]
///
/// Implemented for every [`Action`] and for `ActionRef` itself, so the
/// dispatch entry points accept both plain values and already shared actions.
pub trait IntoAction {
    /// Wrap the value into a shared action
    fn into_action(self) -> ActionRef;
}

impl<A: Action> IntoAction for A {
    fn into_action(self) -> ActionRef {
        Arc::new(self)
    }
}

impl IntoAction for ActionRef {
    fn into_action(self) -> ActionRef {
        self
    }
}

impl dyn Action {
    /// Returns true if the action is of concrete type `A`
    pub fn is<A: Action>(&self) -> bool {
        self.as_any().is::<A>()
    }

    /// Borrow the action as concrete type `A`
    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        self.as_any().downcast_ref::<A>()
    }

    /// Returns true if the action declares tag `T`
    pub fn has_tag<T: ?Sized + 'static>(&self) -> bool {
        self.tags().contains(Tag::of::<T>())
    }
}

/// A routing key: a Rust type used as an action category
///
/// Every action is tagged with its own type. Extra capability markers
/// (zero-sized structs such as [`Silent`]) let one action reach several
/// subscriber sets.
#[derive(Clone, Copy)]
pub struct Tag {
    id: TypeId,
    name: &'static str,
}

impl Tag {
    /// Tag for type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name of the tag
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.short_name())
    }
}

/// Ordered set of tags declared by an action
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// Empty tag set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Tag set containing only `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(vec![Tag::of::<T>()])
    }

    /// Add tag `T` (builder style)
    pub fn with<T: ?Sized + 'static>(mut self) -> Self {
        self.insert(Tag::of::<T>());
        self
    }

    /// Add a tag, ignoring duplicates
    pub fn insert(&mut self, tag: Tag) {
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    /// Returns true if the set contains `tag`
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    /// Iterate tags in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

/// Capability marker: actions tagged with it are delivered but not logged
///
/// ```ignore
/// #[derive(Action, Debug)]
/// #[action(tags(Silent))]
/// struct HeartbeatAction;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Silent;
