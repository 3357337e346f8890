//! The simulation context: one factory and one message queue.

use crate::error::{SimError, SimResult};
use crate::options::SimOptions;
use crate::system::{ComponentSystem, Measured};
use std::sync::Arc;
use tlm_components::{Component, Factory, register_default_components};
use tlm_core::MessageHandler;
use tracing::info;

/// Owns the component factory and the message queue shared by every system
/// it creates. Engines are independent of each other.
#[derive(Debug)]
pub struct Engine {
    factory: Factory,
    messages: Arc<MessageHandler>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the built-in component library registered.
    pub fn new() -> Self {
        Self::with_messages(Arc::new(MessageHandler::new()))
    }

    pub fn with_messages(messages: Arc<MessageHandler>) -> Self {
        let mut factory = Factory::new(messages.clone());
        register_default_components(&mut factory);
        Self { factory, messages }
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// For registering additional component types.
    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    pub fn create_system(&self, name: &str) -> ComponentSystem {
        ComponentSystem::new(name, self.messages.clone())
    }

    pub fn create_component(&self, type_name: &str) -> SimResult<Box<dyn Component>> {
        self.factory
            .create(type_name)
            .ok_or_else(|| SimError::UnknownComponentType {
                type_name: type_name.to_string(),
            })
    }

    /// Create a component of `type_name` and add it to `system`.
    pub fn add_component(
        &self,
        system: &mut ComponentSystem,
        type_name: &str,
        name: &str,
    ) -> SimResult<String> {
        let comp = self.create_component(type_name)?;
        Ok(system.add_component(name, comp))
    }

    /// Initialize, simulate and finalize `system`.
    pub fn run(&self, system: &mut ComponentSystem, options: &SimOptions) -> SimResult<Measured> {
        info!(system = system.name(), stop_time = options.stop_time, "run");
        system.run(options)
    }
}
