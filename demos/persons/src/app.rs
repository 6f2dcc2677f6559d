//! Composition root: wires the dispatcher, stores and controller together

use std::sync::Arc;

use mini_flux::debug::{LoggerConfig, LoggerInterceptor};
use mini_flux::{init_stores, AnyStore, Dispatcher, Store, UiContext};
use tokio::runtime::Handle;
use tracing::info;

use crate::controller::{PersonControllerImpl, PersonSource};
use crate::store::PersonsStore;

pub struct PersonsApp {
    dispatcher: Dispatcher,
    store: Arc<PersonsStore>,
    logger: Option<Arc<LoggerInterceptor>>,
}

impl PersonsApp {
    /// Build the object graph. Nothing is subscribed until [`start`](Self::start).
    pub fn new(ui: UiContext, source: Arc<dyn PersonSource>, runtime: Handle) -> Self {
        let dispatcher = Dispatcher::new(ui);
        let controller = Arc::new(PersonControllerImpl::new(
            dispatcher.clone(),
            source,
            runtime,
        ));
        let store = Arc::new(PersonsStore::new(&dispatcher, controller));
        Self {
            dispatcher,
            store,
            logger: None,
        }
    }

    /// Log every action and the state changes it caused
    pub fn with_logger(mut self, config: LoggerConfig) -> Self {
        let logger = Arc::new(LoggerInterceptor::new(self.stores(), config));
        self.dispatcher.add_interceptor(logger.clone());
        self.logger = Some(logger);
        self
    }

    /// Initialize the stores on the UI thread
    pub fn start(&self) {
        let stores = self.stores();
        let timings = self.dispatcher.ui().run_sync(move || init_stores(&stores));
        info!(stores = timings.len(), "persons app started");
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<PersonsStore> {
        &self.store
    }

    pub fn logger(&self) -> Option<&Arc<LoggerInterceptor>> {
        self.logger.as_ref()
    }

    /// Close the stores and stop the UI thread
    pub fn shutdown(&self) {
        Store::close(self.store.as_ref());
        self.dispatcher.ui().shutdown();
    }

    fn stores(&self) -> Vec<Arc<dyn AnyStore>> {
        vec![self.store.clone() as Arc<dyn AnyStore>]
    }
}
