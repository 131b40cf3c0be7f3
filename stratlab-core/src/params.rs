//! Typed strategy parameters with display metadata, validation, and
//! optimization ranges.
//!
//! Every strategy declares its knobs up-front as a descriptor table. The
//! table drives three consumers: typed reads inside the strategy, host-side
//! configuration (display label + group), and the sweep harness
//! (`optimize` ranges). Validation runs once at start; a failing validator
//! fails the start with a `ConfigurationError`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A parameter value. Untagged so TOML/JSON param files read naturally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
        }
    }

    /// Numeric view for validators; text/bool have none.
    fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Inclusive numeric range with a step, declared for the sweep harness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// A single parameter descriptor: identity, current value, metadata,
/// validators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub default: ParamValue,
    pub value: ParamValue,
    pub display: String,
    pub group: String,
    pub optimize: Option<OptimizeRange>,
    pub required: bool,
    pub greater_than_zero: bool,
    pub not_negative: bool,
    pub range: Option<(f64, f64)>,
}

impl ParamDef {
    fn new(name: &str, default: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            value: default.clone(),
            default,
            display: name.to_string(),
            group: "General".to_string(),
            optimize: None,
            required: false,
            greater_than_zero: false,
            not_negative: false,
            range: None,
        }
    }

    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, ParamValue::Int(default))
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self::new(name, ParamValue::Float(default))
    }

    pub fn bool_(name: &str, default: bool) -> Self {
        Self::new(name, ParamValue::Bool(default))
    }

    pub fn text(name: &str, default: &str) -> Self {
        Self::new(name, ParamValue::Text(default.to_string()))
    }

    pub fn display(mut self, label: &str) -> Self {
        self.display = label.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn optimize(mut self, min: f64, max: f64, step: f64) -> Self {
        assert!(step > 0.0, "optimize step must be > 0");
        assert!(max >= min, "optimize max must be >= min");
        self.optimize = Some(OptimizeRange { min, max, step });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn greater_than_zero(mut self) -> Self {
        self.greater_than_zero = true;
        self
    }

    pub fn not_negative(mut self) -> Self {
        self.not_negative = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        assert!(max >= min, "range max must be >= min");
        self.range = Some((min, max));
        self
    }

    /// Candidate values for the sweep harness, `min..=max` stepped.
    /// Empty when no optimize range is declared.
    pub fn optimize_values(&self) -> Vec<ParamValue> {
        let Some(r) = self.optimize else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut v = r.min;
        // Half-step tolerance so `max` itself survives float stepping.
        while v <= r.max + r.step / 2.0 {
            match self.value {
                ParamValue::Int(_) => out.push(ParamValue::Int(v.round() as i64)),
                _ => out.push(ParamValue::Float(v)),
            }
            v += r.step;
        }
        out
    }
}

/// Validation failure at strategy start. Fatal: the strategy does not start.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("parameter `{name}` is required but unset")]
    MissingRequired { name: String },
    #[error("parameter `{name}` must be greater than zero, got {value}")]
    NotPositive { name: String, value: f64 },
    #[error("parameter `{name}` must not be negative, got {value}")]
    Negative { name: String, value: f64 },
    #[error("parameter `{name}` must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("unknown parameter `{name}`")]
    Unknown { name: String },
    #[error("parameter `{name}` expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("parameter `{name}`: cannot parse `{input}` as {expected}")]
    Unparseable {
        name: String,
        input: String,
        expected: &'static str,
    },
}

/// Declarative, typed parameter table for one strategy instance.
///
/// BTreeMap storage keeps iteration (and any serialization) deterministic.
/// Reads are O(log n) and side-effect free; a read of an undeclared name or
/// of the wrong type is a programming error in the strategy and panics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSet {
    defs: BTreeMap<String, ParamDef>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter. Names are unique within a strategy.
    pub fn declare(&mut self, def: ParamDef) {
        assert!(
            !self.defs.contains_key(&def.name),
            "duplicate parameter `{}`",
            def.name
        );
        self.defs.insert(def.name.clone(), def);
    }

    /// Set a value, checking the declared type.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ConfigurationError> {
        let def = self
            .defs
            .get_mut(name)
            .ok_or_else(|| ConfigurationError::Unknown { name: name.into() })?;
        // Int slots accept whole floats (TOML/JSON numbers are ambiguous).
        let value = match (&def.value, value) {
            (ParamValue::Int(_), ParamValue::Float(f)) if f.fract() == 0.0 => {
                ParamValue::Int(f as i64)
            }
            (ParamValue::Float(_), ParamValue::Int(i)) => ParamValue::Float(i as f64),
            (_, v) => v,
        };
        if def.value.type_name() != value.type_name() {
            return Err(ConfigurationError::TypeMismatch {
                name: name.into(),
                expected: def.value.type_name(),
                got: value.type_name(),
            });
        }
        def.value = value;
        Ok(())
    }

    /// Parse and set from a string, per the declared type (CLI `k=v`).
    pub fn set_from_str(&mut self, name: &str, input: &str) -> Result<(), ConfigurationError> {
        let def = self
            .defs
            .get(name)
            .ok_or_else(|| ConfigurationError::Unknown { name: name.into() })?;
        let expected = def.value.type_name();
        let parsed = match def.value {
            ParamValue::Int(_) => input.parse::<i64>().map(ParamValue::Int).ok(),
            ParamValue::Float(_) => input.parse::<f64>().map(ParamValue::Float).ok(),
            ParamValue::Bool(_) => input.parse::<bool>().map(ParamValue::Bool).ok(),
            ParamValue::Text(_) => Some(ParamValue::Text(input.to_string())),
        };
        match parsed {
            Some(v) => self.set(name, v),
            None => Err(ConfigurationError::Unparseable {
                name: name.into(),
                input: input.into(),
                expected,
            }),
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.get(name).value {
            ParamValue::Int(v) => v,
            ref other => panic!("parameter `{name}` is {}, not int", other.type_name()),
        }
    }

    pub fn float(&self, name: &str) -> f64 {
        match self.get(name).value {
            ParamValue::Float(v) => v,
            ParamValue::Int(v) => v as f64,
            ref other => panic!("parameter `{name}` is {}, not float", other.type_name()),
        }
    }

    pub fn bool_(&self, name: &str) -> bool {
        match self.get(name).value {
            ParamValue::Bool(v) => v,
            ref other => panic!("parameter `{name}` is {}, not bool", other.type_name()),
        }
    }

    pub fn text(&self, name: &str) -> &str {
        match self.get(name).value {
            ParamValue::Text(ref v) => v,
            ref other => panic!("parameter `{name}` is {}, not text", other.type_name()),
        }
    }

    fn get(&self, name: &str) -> &ParamDef {
        self.defs
            .get(name)
            .unwrap_or_else(|| panic!("undeclared parameter `{name}`"))
    }

    pub fn defs(&self) -> impl Iterator<Item = &ParamDef> {
        self.defs.values()
    }

    /// Run every declared validator. First failure wins.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for def in self.defs.values() {
            if def.required {
                if let ParamValue::Text(ref s) = def.value {
                    if s.is_empty() {
                        return Err(ConfigurationError::MissingRequired {
                            name: def.name.clone(),
                        });
                    }
                }
            }
            let Some(v) = def.value.as_f64() else {
                continue;
            };
            if def.greater_than_zero && v <= 0.0 {
                return Err(ConfigurationError::NotPositive {
                    name: def.name.clone(),
                    value: v,
                });
            }
            if def.not_negative && v < 0.0 {
                return Err(ConfigurationError::Negative {
                    name: def.name.clone(),
                    value: v,
                });
            }
            if let Some((min, max)) = def.range {
                if v < min || v > max {
                    return Err(ConfigurationError::OutOfRange {
                        name: def.name.clone(),
                        value: v,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Parameters that declare an optimization range, with their candidate
    /// value lists, in deterministic name order.
    pub fn optimization_axes(&self) -> Vec<(String, Vec<ParamValue>)> {
        self.defs
            .values()
            .filter(|d| d.optimize.is_some())
            .map(|d| (d.name.clone(), d.optimize_values()))
            .collect()
    }
}
