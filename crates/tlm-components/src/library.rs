//! Registration of the built-in component library.

use crate::factory::Factory;
use crate::hydraulic::*;
use crate::mechanic::*;
use crate::signal::*;

/// Register every built-in component type under its type name.
pub fn register_default_components(factory: &mut Factory) {
    factory.register_type::<HydraulicLaminarOrifice>();
    factory.register_type::<HydraulicTurbulentOrifice>();
    factory.register_type::<HydraulicVolume>();
    factory.register_type::<HydraulicVolumeMultiPort>();
    factory.register_type::<HydraulicTLMlossless>();
    factory.register_type::<HydraulicPressureSourceC>();
    factory.register_type::<HydraulicPressureSourceQ>();
    factory.register_type::<HydraulicFlowSourceQ>();
    factory.register_type::<HydraulicTank>();
    factory.register_type::<HydraulicPressureSensor>();

    factory.register_type::<MechanicTranslationalMass>();
    factory.register_type::<MechanicSpring>();
    factory.register_type::<MechanicForceSource>();

    factory.register_type::<SignalConstant>();
    factory.register_type::<SignalStep>();
    factory.register_type::<SignalGain>();
    factory.register_type::<SignalSum>();
    factory.register_type::<SignalUnitDelay>();
    factory.register_type::<SignalTimeDelay>();
    factory.register_type::<SignalVariableTimeDelay>();
    factory.register_type::<SignalFirstOrderFilter>();
    factory.register_type::<SignalSecondOrderFilter>();
    factory.register_type::<Signal1DLookupTable>();
    factory.register_type::<Signal2DLookupTable>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configure::Configurator;
    use std::sync::Arc;
    use tlm_core::MessageHandler;
    use tlm_graph::CqsType;

    #[test]
    fn every_component_configures_cleanly() {
        let messages = Arc::new(MessageHandler::new());
        let mut factory = Factory::new(messages.clone());
        register_default_components(&mut factory);
        assert_eq!(factory.len(), 24);
        assert_eq!(messages.num_waiting(), 0);

        let keys: Vec<String> = factory.keys().map(str::to_string).collect();
        for key in keys {
            let mut comp = factory.create(&key).unwrap();
            assert_eq!(comp.type_name(), key);
            assert_ne!(comp.cqs_type(), CqsType::Undefined);
            let mut cfg = Configurator::new();
            comp.configure(&mut cfg);
            assert!(cfg.problems().is_empty(), "{key}: {:?}", cfg.problems());
            assert!(!cfg.ports().is_empty(), "{key} has no ports");
        }
    }
}
