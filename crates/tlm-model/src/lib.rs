//! tlm-model: YAML/JSON model files.
//!
//! A model file describes one component system: simulation options, system
//! parameters, components with their parameters and start values,
//! connections and nested subsystems. [`build_system`] turns it into a
//! [`tlm_sim::ComponentSystem`] through an engine's factory.
//!
//! ```
//! use tlm_model::{build_system, from_yaml_str};
//! use tlm_sim::Engine;
//!
//! let model = from_yaml_str(
//!     r#"
//! name: Pipe
//! options: { stop_time: 0.01, num_log_samples: 0 }
//! components:
//!   - { name: Source, type: HydraulicFlowSourceQ, parameters: { q: 1e-4 } }
//!   - { name: Tank, type: HydraulicTank }
//! connections:
//!   - { from: Source.P1, to: Tank.P1 }
//! "#,
//! )
//! .unwrap();
//!
//! let engine = Engine::new();
//! let mut system = build_system(&engine, &model).unwrap();
//! let run = system.run(&model.options).unwrap();
//! assert!(run.outcome.is_finished());
//! ```

pub mod build;
pub mod schema;
pub mod validate;

pub use build::build_system;
pub use schema::*;
pub use validate::{ValidationError, validate_model};

use std::path::Path;
use tlm_sim::SimError;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("Component name already taken: {name}")]
    NameTaken { name: String },

    #[error("Cannot connect {from} to {to}")]
    BadConnection { from: String, to: String },

    #[error("Unsupported model file: {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> ModelResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(ModelError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

pub fn from_yaml_str(text: &str) -> ModelResult<ModelDef> {
    let model: ModelDef = serde_yaml::from_str(text)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn from_json_str(text: &str) -> ModelResult<ModelDef> {
    let model: ModelDef = serde_json::from_str(text)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn load_yaml(path: &Path) -> ModelResult<ModelDef> {
    from_yaml_str(&std::fs::read_to_string(path)?)
}

pub fn save_yaml(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_yaml::to_string(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ModelResult<ModelDef> {
    from_json_str(&std::fs::read_to_string(path)?)
}

pub fn save_json(path: &Path, model: &ModelDef) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_json::to_string_pretty(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a model file, choosing the format by extension.
pub fn load_model(path: &Path) -> ModelResult<ModelDef> {
    match format_of(path)? {
        Format::Yaml => load_yaml(path),
        Format::Json => load_json(path),
    }
}

/// Save a model file, choosing the format by extension.
pub fn save_model(path: &Path, model: &ModelDef) -> ModelResult<()> {
    match format_of(path)? {
        Format::Yaml => save_yaml(path, model),
        Format::Json => save_json(path, model),
    }
}
