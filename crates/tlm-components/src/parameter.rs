//! Named, string-valued component parameters.
//!
//! A parameter is set as text and evaluated at initialize, either as a float
//! literal or as the name of a system parameter (optionally negated with a
//! leading `-`). Start values of port slots are parameters too, named
//! `<port>#<Slot>`. Text parameters (file names, separators) are never
//! evaluated.

use crate::error::{ComponentError, ComponentResult};
use tlm_core::Real;

/// Index of a parameter within its component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParamIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Constant,
    Text,
    /// Start value of one node slot of one port.
    StartValue { port: usize, slot: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: ParamKind,
    text: String,
    value: Real,
}

impl Parameter {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Value from the last evaluation.
    pub fn value(&self) -> Real {
        self.value
    }
}

fn format_default(value: Real) -> String {
    format!("{value}")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        default: Real,
        kind: ParamKind,
    ) -> ParamIdx {
        self.entries.push(Parameter {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind,
            text: format_default(default),
            value: default,
        });
        ParamIdx(self.entries.len() - 1)
    }

    pub fn add_text(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> ParamIdx {
        self.entries.push(Parameter {
            name: name.into(),
            description: description.into(),
            unit: String::new(),
            kind: ParamKind::Text,
            text: default.into(),
            value: 0.0,
        });
        ParamIdx(self.entries.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    pub fn find(&self, name: &str) -> Option<ParamIdx> {
        self.entries.iter().position(|p| p.name == name).map(ParamIdx)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.find(name).map(|i| &self.entries[i.0])
    }

    /// Evaluated value; zero for an unknown index.
    pub fn value(&self, idx: ParamIdx) -> Real {
        self.entries.get(idx.0).map_or(0.0, |p| p.value)
    }

    /// Raw text; empty for an unknown index.
    pub fn text(&self, idx: ParamIdx) -> &str {
        self.entries.get(idx.0).map_or("", |p| p.text.as_str())
    }

    /// Set the text of a parameter. The value is updated immediately when the
    /// text is a number; otherwise at the next [`Self::evaluate`].
    pub fn set_text(&mut self, name: &str, text: impl Into<String>) -> ComponentResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ComponentError::UnknownParameter {
                name: name.to_string(),
            })?;
        entry.text = text.into();
        if let Ok(v) = entry.text.trim().parse::<Real>() {
            entry.value = v;
        }
        Ok(())
    }

    pub fn set_value(&mut self, name: &str, value: Real) -> ComponentResult<()> {
        self.set_text(name, format_default(value))
    }

    /// Evaluate every parameter text. `lookup` resolves system parameter names.
    pub fn evaluate(&mut self, lookup: &dyn Fn(&str) -> Option<Real>) -> ComponentResult<()> {
        for p in self.entries.iter_mut().filter(|p| p.kind != ParamKind::Text) {
            p.value = evaluate_text(&p.text, lookup).ok_or_else(|| {
                ComponentError::ParameterEvaluation {
                    name: p.name.clone(),
                    text: p.text.clone(),
                }
            })?;
        }
        Ok(())
    }

    /// Names of parameters whose text does not evaluate.
    pub fn check(&self, lookup: &dyn Fn(&str) -> Option<Real>) -> Vec<ComponentError> {
        self.entries
            .iter()
            .filter(|p| p.kind != ParamKind::Text && evaluate_text(&p.text, lookup).is_none())
            .map(|p| ComponentError::ParameterEvaluation {
                name: p.name.clone(),
                text: p.text.clone(),
            })
            .collect()
    }

    /// `(slot, value)` start values registered for `port`.
    pub fn start_values(&self, port: usize) -> impl Iterator<Item = (usize, Real)> + '_ {
        self.entries.iter().filter_map(move |p| match p.kind {
            ParamKind::StartValue { port: pp, slot } if pp == port => Some((slot, p.value)),
            _ => None,
        })
    }
}

fn evaluate_text(text: &str, lookup: &dyn Fn(&str) -> Option<Real>) -> Option<Real> {
    let text = text.trim();
    if let Ok(v) = text.parse::<Real>() {
        return Some(v);
    }
    if let Some(v) = lookup(text) {
        return Some(v);
    }
    text.strip_prefix('-')
        .and_then(|name| lookup(name.trim()))
        .map(|v| -v)
}
