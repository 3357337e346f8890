//! Node domains and their data slots.
//!
//! Each physical domain fixes an ordered list of named `f64` slots. The order
//! and the names are stable: model files, loggers and components address
//! slots by them.

use tlm_core::Real;

/// Role of a slot in the wave-variable exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotKind {
    /// Through variable (flow, velocity, current).
    Flow,
    /// Across variable (pressure, force, voltage).
    Intensity,
    /// Wave variable or characteristic impedance.
    Tlm,
    /// Not shown to users and never given a start value.
    Hidden,
    Default,
}

/// Static description of one node data slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotInfo {
    pub name: &'static str,
    pub short_name: &'static str,
    pub unit: &'static str,
    pub kind: SlotKind,
    pub default: Real,
}

const fn slot(
    name: &'static str,
    short_name: &'static str,
    unit: &'static str,
    kind: SlotKind,
    default: Real,
) -> SlotInfo {
    SlotInfo {
        name,
        short_name,
        unit,
        kind,
        default,
    }
}

use SlotKind::{Default as Plain, Flow, Hidden, Intensity, Tlm};

const HYDRAULIC: &[SlotInfo] = &[
    slot("Flow", "q", "m^3/s", Flow, 0.0),
    slot("Pressure", "p", "Pa", Intensity, 1e5),
    slot("Temperature", "T", "K", Hidden, 293.0),
    slot("WaveVariable", "c", "Pa", Tlm, 1e5),
    slot("CharImpedance", "Zc", "Pa s/m^3", Tlm, 0.0),
    slot("HeatFlow", "Qdot", "W", Hidden, 0.0),
];

const PNEUMATIC: &[SlotInfo] = &[
    slot("EnergyFlow", "Qdot", "J/s", Flow, 0.0),
    slot("Pressure", "p", "Pa", Intensity, 1e5),
    slot("WaveVariable", "c", "Pa", Tlm, 1e5),
    slot("CharImpedance", "Zc", "s/m^3", Tlm, 0.0),
    slot("MassFlow", "mdot", "kg/s", Flow, 0.0),
    slot("Density", "rho", "kg/m^3", Intensity, 1.225),
    slot("DensityWaveVariable", "crho", "kg/m^3", Tlm, 1.225),
    slot("DensityCharImpedance", "Zcrho", "s/m^3", Tlm, 0.0),
    slot("Temperature", "T", "K", Plain, 293.0),
];

const MECHANIC: &[SlotInfo] = &[
    slot("Velocity", "v", "m/s", Flow, 0.0),
    slot("Force", "f", "N", Intensity, 0.0),
    slot("Position", "x", "m", Plain, 0.0),
    slot("WaveVariable", "c", "N", Tlm, 0.0),
    slot("CharImpedance", "Zc", "N s/m", Tlm, 0.0),
    slot("EquivalentMass", "me", "kg", Plain, 1.0),
];

const MECHANIC_ROTATIONAL: &[SlotInfo] = &[
    slot("AngularVelocity", "w", "rad/s", Flow, 0.0),
    slot("Torque", "T", "Nm", Intensity, 0.0),
    slot("Angle", "a", "rad", Plain, 0.0),
    slot("WaveVariable", "c", "Nm", Tlm, 0.0),
    slot("CharImpedance", "Zc", "N m s/rad", Tlm, 0.0),
    slot("EquivalentInertia", "Je", "kg m^2", Hidden, 0.0),
];

const ELECTRIC: &[SlotInfo] = &[
    slot("Voltage", "U", "V", Intensity, 0.0),
    slot("Current", "I", "A", Flow, 0.0),
    slot("WaveVariable", "c", "V", Tlm, 0.0),
    slot("CharImpedance", "Zc", "V/A", Tlm, 0.0),
];

const SIGNAL: &[SlotInfo] = &[slot("Value", "y", "", Plain, 0.0)];

/// Physical domain of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    Hydraulic,
    Pneumatic,
    Mechanic,
    MechanicRotational,
    Electric,
    Signal,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Hydraulic,
        NodeType::Pneumatic,
        NodeType::Mechanic,
        NodeType::MechanicRotational,
        NodeType::Electric,
        NodeType::Signal,
    ];

    /// Stable type name, e.g. `NodeHydraulic`.
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Hydraulic => "NodeHydraulic",
            NodeType::Pneumatic => "NodePneumatic",
            NodeType::Mechanic => "NodeMechanic",
            NodeType::MechanicRotational => "NodeMechanicRotational",
            NodeType::Electric => "NodeElectric",
            NodeType::Signal => "NodeSignal",
        }
    }

    /// Parse a type name, with or without the `Node` prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("Node").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|t| t.name().strip_prefix("Node") == Some(bare))
    }

    pub fn slots(self) -> &'static [SlotInfo] {
        match self {
            NodeType::Hydraulic => HYDRAULIC,
            NodeType::Pneumatic => PNEUMATIC,
            NodeType::Mechanic => MECHANIC,
            NodeType::MechanicRotational => MECHANIC_ROTATIONAL,
            NodeType::Electric => ELECTRIC,
            NodeType::Signal => SIGNAL,
        }
    }

    pub fn num_slots(self) -> usize {
        self.slots().len()
    }

    pub fn slot_info(self, index: usize) -> Option<&'static SlotInfo> {
        self.slots().get(index)
    }

    /// Slot index by full or short name.
    pub fn slot_index(self, name: &str) -> Option<usize> {
        self.slots()
            .iter()
            .position(|s| s.name == name)
            .or_else(|| self.slots().iter().position(|s| s.short_name == name))
    }

    pub fn default_values(self) -> Vec<Real> {
        self.slots().iter().map(|s| s.default).collect()
    }

    pub fn is_signal(self) -> bool {
        self == NodeType::Signal
    }

    /// Slots that get user-settable start values.
    pub fn start_value_slots(self) -> impl Iterator<Item = usize> {
        self.slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.kind, SlotKind::Flow | SlotKind::Intensity | SlotKind::Default))
            .map(|(i, _)| i)
    }

    /// Pairs of (intensity slot, wave slot) where the wave variable starts at
    /// the intensity value, e.g. `c = p` for hydraulic nodes.
    pub fn wave_start_pairs(self) -> &'static [(usize, usize)] {
        match self {
            NodeType::Hydraulic => &[(1, 3)],
            NodeType::Pneumatic => &[(1, 2)],
            NodeType::Mechanic | NodeType::MechanicRotational => &[(1, 3)],
            NodeType::Electric => &[(0, 2)],
            NodeType::Signal => &[],
        }
    }

    /// Set derived start values after user start values were applied.
    pub fn apply_special_start_values(self, values: &mut [Real]) {
        for &(intensity, wave) in self.wave_start_pairs() {
            if let (Some(p), true) = (values.get(intensity).copied(), wave < values.len()) {
                values[wave] = p;
            }
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed slot of one node domain.
pub trait NodeSlot: Copy {
    const NODE_TYPE: NodeType;
    fn index(self) -> usize;
}

macro_rules! node_slots {
    ($(#[$meta:meta])* $name:ident : $node:expr => { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl NodeSlot for $name {
            const NODE_TYPE: NodeType = $node;
            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

node_slots!(
    /// Slots of `NodeHydraulic`.
    Hydraulic: NodeType::Hydraulic => {
        Flow, Pressure, Temperature, WaveVariable, CharImpedance, HeatFlow,
    }
);

node_slots!(
    /// Slots of `NodePneumatic`.
    Pneumatic: NodeType::Pneumatic => {
        EnergyFlow, Pressure, WaveVariable, CharImpedance, MassFlow, Density,
        DensityWaveVariable, DensityCharImpedance, Temperature,
    }
);

node_slots!(
    /// Slots of `NodeMechanic`.
    Mechanic: NodeType::Mechanic => {
        Velocity, Force, Position, WaveVariable, CharImpedance, EquivalentMass,
    }
);

node_slots!(
    /// Slots of `NodeMechanicRotational`.
    MechanicRotational: NodeType::MechanicRotational => {
        AngularVelocity, Torque, Angle, WaveVariable, CharImpedance, EquivalentInertia,
    }
);

node_slots!(
    /// Slots of `NodeElectric`.
    Electric: NodeType::Electric => {
        Voltage, Current, WaveVariable, CharImpedance,
    }
);

node_slots!(
    /// Slots of `NodeSignal`.
    Signal: NodeType::Signal => { Value }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_slots_match_tables() {
        for (t, typed) in [
            (NodeType::Hydraulic, Hydraulic::CharImpedance.index()),
            (NodeType::Mechanic, Mechanic::CharImpedance.index()),
            (NodeType::MechanicRotational, MechanicRotational::CharImpedance.index()),
            (NodeType::Electric, Electric::CharImpedance.index()),
            (NodeType::Pneumatic, Pneumatic::CharImpedance.index()),
        ] {
            assert_eq!(t.slot_index("CharImpedance"), Some(typed));
            assert_eq!(t.slot_index("Zc"), Some(typed));
        }
        assert_eq!(Pneumatic::Temperature.index(), 8);
        assert_eq!(NodeType::Pneumatic.num_slots(), 9);
        assert_eq!(Signal::Value.index(), 0);
    }

    #[test]
    fn names_round_trip() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::from_name(t.name()), Some(t));
        }
        assert_eq!(NodeType::from_name("Hydraulic"), Some(NodeType::Hydraulic));
        assert_eq!(NodeType::from_name("NodeThermal"), None);
    }

    #[test]
    fn hydraulic_defaults() {
        let d = NodeType::Hydraulic.default_values();
        assert_eq!(d[Hydraulic::Pressure.index()], 1e5);
        assert_eq!(d[Hydraulic::WaveVariable.index()], 1e5);
        assert_eq!(d[Hydraulic::Temperature.index()], 293.0);
        assert_eq!(NodeType::Mechanic.default_values()[Mechanic::EquivalentMass.index()], 1.0);
    }

    #[test]
    fn wave_starts_at_intensity() {
        let mut v = NodeType::Hydraulic.default_values();
        v[Hydraulic::Pressure.index()] = 3e6;
        NodeType::Hydraulic.apply_special_start_values(&mut v);
        assert_eq!(v[Hydraulic::WaveVariable.index()], 3e6);

        for t in NodeType::ALL {
            for &(i, w) in t.wave_start_pairs() {
                assert_eq!(t.slots()[i].kind, SlotKind::Intensity);
                assert_eq!(t.slots()[w].name, "WaveVariable");
            }
        }
    }

    #[test]
    fn start_value_slots_skip_tlm_and_hidden() {
        let slots: Vec<usize> = NodeType::Hydraulic.start_value_slots().collect();
        assert_eq!(slots, vec![Hydraulic::Flow.index(), Hydraulic::Pressure.index()]);
    }
}
