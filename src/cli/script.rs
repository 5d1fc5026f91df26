//! Override Scripts
//!
//! A script is a JSON document describing a base value and a sequence of
//! override operations. Replaying it against a `LayeredValue<Value>` records
//! the perceived value and every change notification after each step.
//!
//! ```json
//! {
//!   "base": 10,
//!   "steps": [
//!     { "op": "add", "layer": "a", "value": 20 },
//!     { "op": "set", "layer": "a", "value": 25 },
//!     { "op": "is_top", "layer": "a" },
//!     { "op": "remove", "layer": "a" }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::mpsc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{LayeredError, Result};
use crate::layers::{LayerId, LayeredValue};

/// A single scripted operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Push an override and bind it to a label
    Add { layer: String, value: Value },
    /// Overwrite the value of a labelled override
    Set { layer: String, value: Value },
    /// Overwrite the base value
    SetBase { value: Value },
    /// Remove a labelled override
    Remove { layer: String },
    /// Query whether a labelled override is perceived
    IsTop { layer: String },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Add { .. } => "add",
            Step::Set { .. } => "set",
            Step::SetBase { .. } => "set_base",
            Step::Remove { .. } => "remove",
            Step::IsTop { .. } => "is_top",
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Step::Add { layer, .. }
            | Step::Set { layer, .. }
            | Step::Remove { layer }
            | Step::IsTop { layer } => Some(layer.as_str()),
            Step::SetBase { .. } => None,
        }
    }
}

/// A base value plus the operations to replay on top of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub base: Value,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse and validate a script
    pub fn from_json(text: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    /// Load a script from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check that every step names a non-empty label
    pub fn validate(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(label) = step.label() {
                if label.trim().is_empty() {
                    return Err(LayeredError::InvalidScript {
                        reason: format!(
                            "step {} ({}) has an empty layer label",
                            index,
                            step.name()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Base 10, two overrides, a buried write, then both removals
    pub fn demo() -> Self {
        Self {
            base: json!(10),
            steps: vec![
                Step::Add {
                    layer: "a".to_string(),
                    value: json!(20),
                },
                Step::Add {
                    layer: "b".to_string(),
                    value: json!(30),
                },
                Step::Set {
                    layer: "a".to_string(),
                    value: json!(25),
                },
                Step::Remove {
                    layer: "b".to_string(),
                },
                Step::Remove {
                    layer: "a".to_string(),
                },
            ],
        }
    }
}

/// Replay behaviour
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Continue past a rejected step instead of stopping
    pub keep_going: bool,
}

/// What happened during one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    /// Perceived value after the step
    pub perceived: Value,
    /// Values passed to the change callback during the step
    pub notifications: Vec<Value>,
    /// Result of an `is_top` query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of replaying a whole script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub base: Value,
    pub perceived: Value,
    pub steps: Vec<StepOutcome>,
}

impl ReplayReport {
    /// Number of steps that were rejected
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }

    /// Every notification in replay order
    pub fn notifications(&self) -> impl Iterator<Item = &Value> {
        self.steps.iter().flat_map(|s| s.notifications.iter())
    }
}

/// Replays a script against a fresh container, binding labels to layer handles
struct Replayer {
    value: LayeredValue<Value>,
    notifications: mpsc::Receiver<Value>,
    labels: HashMap<String, LayerId>,
}

impl Replayer {
    fn new(base: Value) -> Self {
        let (sender, notifications) = mpsc::channel();
        let value = LayeredValue::with_callback(base, move |v: &Value| {
            // The receiver lives as long as the replayer
            let _ = sender.send(v.clone());
        });
        Self {
            value,
            notifications,
            labels: HashMap::new(),
        }
    }

    fn lookup(&self, label: &str) -> Result<LayerId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| LayeredError::UnknownLabel {
                label: label.to_string(),
            })
    }

    fn apply(&mut self, step: &Step) -> Result<Option<bool>> {
        match step {
            Step::Add { layer, value } => {
                if let Some(&existing) = self.labels.get(layer) {
                    if self.value.contains(existing) {
                        return Err(LayeredError::DuplicateLabel {
                            label: layer.clone(),
                        });
                    }
                }
                let id = self.value.add_override_layer(value.clone());
                self.labels.insert(layer.clone(), id);
                Ok(None)
            }
            Step::Set { layer, value } => {
                let id = self.lookup(layer)?;
                self.value.set_layer_value(id, value.clone())?;
                Ok(None)
            }
            Step::SetBase { value } => {
                self.value.set_base_value(value.clone());
                Ok(None)
            }
            Step::Remove { layer } => {
                // The label stays bound so a second removal is reported as stale
                let id = self.lookup(layer)?;
                self.value.remove_override_layer(id)?;
                Ok(None)
            }
            Step::IsTop { layer } => {
                let id = self.lookup(layer)?;
                Ok(Some(self.value.is_top_of_stack(id)?))
            }
        }
    }
}

/// Replay `script` and report the perceived value and notifications per step.
///
/// Unless `options.keep_going` is set, replay stops after the first rejected
/// step; that step is still included in the report.
pub fn replay(script: &Script, options: &ReplayOptions) -> ReplayReport {
    let mut replayer = Replayer::new(script.base.clone());
    let mut steps = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        debug!("Replaying step {} ({})", index, step.name());
        let result = replayer.apply(step);
        let notifications: Vec<Value> = replayer.notifications.try_iter().collect();

        let (top, error) = match result {
            Ok(top) => (top, None),
            Err(e) => {
                warn!("Step {} ({}) rejected: {}", index, step.name(), e);
                (None, Some(e.to_string()))
            }
        };
        let failed = error.is_some();

        steps.push(StepOutcome {
            index,
            op: step.name(),
            perceived: replayer.value.perceived_value().clone(),
            notifications,
            top,
            error,
        });

        if failed && !options.keep_going {
            break;
        }
    }

    ReplayReport {
        base: replayer.value.base_value().clone(),
        perceived: replayer.value.perceived_value().clone(),
        steps,
    }
}
