//! Interceptor chain wrapping action delivery
//!
//! Interceptors observe, transform or short-circuit actions on their way to
//! the subscribers. The dispatcher folds its interceptor list around a root
//! link that fans the action out; the first registered interceptor is the
//! outermost one, so it runs first on the way in and last on the way out.
//!
//! ```ignore
//! use mini_flux_core::{interceptor, ActionRef, Chain};
//!
//! // Pass-through interceptor that logs every action
//! dispatcher.add_interceptor(Arc::new(interceptor::from_fn(
//!     |action: ActionRef, chain: &dyn Chain| {
//!         tracing::info!(action = action.name(), "before");
//!         let out = chain.proceed(action);
//!         tracing::info!(action = out.name(), "after");
//!         out
//!     },
//! )));
//! ```

use std::sync::Arc;

use crate::ActionRef;

/// A chain of interceptors
///
/// Call [`proceed`](Chain::proceed) with the intercepted action, or a
/// substitute, to continue delivery.
pub trait Chain: Send + Sync {
    /// Run the rest of the chain for an action
    fn proceed(&self, action: ActionRef) -> ActionRef;
}

/// Observes, modifies and potentially short-circuits dispatched actions
///
/// An interceptor that returns without calling `chain.proceed` prevents
/// every subscriber from seeing the action. Whatever it returns is handed
/// back to the caller of `dispatch`.
pub trait Interceptor: Send + Sync + 'static {
    /// Handle one action
    fn intercept(&self, action: ActionRef, chain: &dyn Chain) -> ActionRef;
}

impl<F> Interceptor for F
where
    F: Fn(ActionRef, &dyn Chain) -> ActionRef + Send + Sync + 'static,
{
    fn intercept(&self, action: ActionRef, chain: &dyn Chain) -> ActionRef {
        self(action, chain)
    }
}

/// Interceptor built from a closure, see [`from_fn`]
#[derive(Clone)]
pub struct FnInterceptor<F> {
    f: F,
}

/// Build an interceptor from a closure
///
/// Prefer this over passing a bare closure: the signature is fixed here so
/// the closure arguments need no annotations.
pub fn from_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(ActionRef, &dyn Chain) -> ActionRef + Send + Sync + 'static,
{
    FnInterceptor { f }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(ActionRef, &dyn Chain) -> ActionRef + Send + Sync + 'static,
{
    fn intercept(&self, action: ActionRef, chain: &dyn Chain) -> ActionRef {
        (self.f)(action, chain)
    }
}

/// One interceptor plus the rest of the chain
struct Link {
    interceptor: Arc<dyn Interceptor>,
    next: Arc<dyn Chain>,
}

impl Chain for Link {
    fn proceed(&self, action: ActionRef) -> ActionRef {
        self.interceptor.intercept(action, self.next.as_ref())
    }
}

/// Fold interceptors around `root`, first element outermost
pub(crate) fn build_chain(
    root: Arc<dyn Chain>,
    interceptors: &[Arc<dyn Interceptor>],
) -> Arc<dyn Chain> {
    interceptors.iter().rev().fold(root, |next, interceptor| {
        Arc::new(Link {
            interceptor: interceptor.clone(),
            next,
        })
    })
}

/// Identity comparison for interceptor handles
pub(crate) fn same_interceptor<I: ?Sized>(a: &Arc<dyn Interceptor>, b: &Arc<I>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, IntoAction, Tags};
    use parking_lot::Mutex;
    use std::any::Any;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Action for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn tags(&self) -> Tags {
            Tags::of::<Self>()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Root;

    impl Chain for Root {
        fn proceed(&self, action: ActionRef) -> ActionRef {
            action
        }
    }

    fn recording(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> Arc<dyn Interceptor> {
        Arc::new(from_fn(move |action, chain| {
            log.lock().push(format!("{label}>"));
            let out = chain.proceed(action);
            log.lock().push(format!("<{label}"));
            out
        }))
    }

    #[test]
    fn test_first_registered_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build_chain(
            Arc::new(Root),
            &[recording(log.clone(), "a"), recording(log.clone(), "b")],
        );

        chain.proceed(Named("x").into_action());

        assert_eq!(*log.lock(), vec!["a>", "b>", "<b", "<a"]);
    }

    #[test]
    fn test_substitution_reaches_root() {
        let replace: Arc<dyn Interceptor> =
            Arc::new(from_fn(|_action, chain| chain.proceed(Named("replaced").into_action())));
        let chain = build_chain(Arc::new(Root), &[replace]);

        let out = chain.proceed(Named("original").into_action());
        assert_eq!(out.name(), "replaced");
    }

    #[test]
    fn test_empty_chain_is_root() {
        let chain = build_chain(Arc::new(Root), &[]);
        let action = Named("x").into_action();
        assert!(Arc::ptr_eq(&chain.proceed(action.clone()), &action));
    }

    #[test]
    fn test_closure_interceptor() {
        let closure = |action: ActionRef, chain: &dyn Chain| chain.proceed(action);
        let interceptor: Arc<dyn Interceptor> = Arc::new(closure);
        let chain = build_chain(Arc::new(Root), &[interceptor.clone()]);
        assert_eq!(chain.proceed(Named("x").into_action()).name(), "x");
        assert!(same_interceptor(&interceptor, &interceptor));
    }
}
