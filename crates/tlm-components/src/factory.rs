//! String-keyed component factory.

use crate::traits::Component;
use std::collections::BTreeMap;
use std::sync::Arc;
use tlm_core::MessageHandler;
use tracing::debug;

type Creator = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Maps type names to zero-argument creators.
///
/// Registration problems and unknown keys are warnings on the message queue,
/// never errors: the first registration of a key wins.
pub struct Factory {
    creators: BTreeMap<String, Creator>,
    messages: Arc<MessageHandler>,
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("keys", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Factory {
    pub fn new(messages: Arc<MessageHandler>) -> Self {
        Self {
            creators: BTreeMap::new(),
            messages,
        }
    }

    /// Register `creator` under `key`. Returns false if the key was taken.
    pub fn register<F>(&mut self, key: &str, creator: F) -> bool
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        if self.creators.contains_key(key) {
            self.messages.add_message(
                tlm_core::MessageKind::Warning,
                format!("Key already registered: {key}"),
                key,
            );
            return false;
        }
        debug!(key, "registered component type");
        self.creators.insert(key.to_string(), Box::new(creator));
        true
    }

    /// Register a `Default` component under its own type name.
    pub fn register_type<T>(&mut self) -> bool
    where
        T: Component + Default + 'static,
    {
        let key = T::default().type_name();
        self.register(key, || Box::new(T::default()))
    }

    pub fn create(&self, key: &str) -> Option<Box<dyn Component>> {
        match self.creators.get(key) {
            Some(creator) => Some(creator()),
            None => {
                self.messages.add_message(
                    tlm_core::MessageKind::Warning,
                    format!("Could not create component, key not registered: {key}"),
                    key,
                );
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.creators.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalConstant;
    use tlm_core::MessageKind;

    #[test]
    fn duplicate_key_keeps_first() {
        let messages = Arc::new(MessageHandler::new());
        let mut factory = Factory::new(messages.clone());
        assert!(factory.register_type::<SignalConstant>());
        assert!(!factory.register("SignalConstant", || Box::new(SignalConstant::default())));
        assert_eq!(factory.len(), 1);
        assert_eq!(messages.count(MessageKind::Warning), 1);
    }

    #[test]
    fn unknown_key_warns() {
        let messages = Arc::new(MessageHandler::new());
        let factory = Factory::new(messages.clone());
        assert!(factory.create("NoSuchThing").is_none());
        let msg = messages.get_message().unwrap();
        assert_eq!(msg.kind, MessageKind::Warning);
        assert!(msg.text.contains("NoSuchThing"));
    }

    #[test]
    fn create_returns_fresh_instances() {
        let mut factory = Factory::new(Arc::new(MessageHandler::new()));
        factory.register_type::<SignalConstant>();
        let a = factory.create("SignalConstant").unwrap();
        assert_eq!(a.type_name(), "SignalConstant");
    }
}
