//! Action types
//!
//! Actions are the nodes of a sequence tree. Leaf actions (click, drag, type,
//! wait, template search, text wait) are performed by a [`LeafActions`]
//! collaborator; data actions and flow-control actions are handled by the
//! executor itself.
//!
//! Serialized form is a tagged map:
//!
//! ```yaml
//! type: loop
//! description: Collect rewards
//! mode: bounded
//! count: 3
//! actions:
//!   - type: click
//!     x: 120
//!     y: 480
//! ```
//!
//! Payload fields default when absent so that malformed nodes deserialize and
//! are rejected by [`ActionNode::validate`] at dispatch time instead.
//!
//! [`LeafActions`]: crate::leaf::LeafActions

use scout_core::Value;
use serde::{Deserialize, Serialize};

use crate::error::{SequenceError, SequenceResult};

fn default_true() -> bool {
    true
}

/// A single node of a sequence tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    /// Disabled nodes fail validation
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Human-readable description used in log lines
    #[serde(default)]
    pub description: String,

    /// Kind-specific payload
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl ActionNode {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            enabled: true,
            description: String::new(),
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Borrowed view of the leaf payload, if this is a leaf action
    pub fn as_leaf(&self) -> Option<Leaf<'_>> {
        match &self.kind {
            ActionKind::Click(p) => Some(Leaf::Click(p)),
            ActionKind::Drag(p) => Some(Leaf::Drag(p)),
            ActionKind::TypeText(p) => Some(Leaf::TypeText(p)),
            ActionKind::Wait(p) => Some(Leaf::Wait(p)),
            ActionKind::TemplateSearch(p) => Some(Leaf::TemplateSearch(p)),
            ActionKind::WaitForText(p) => Some(Leaf::WaitForText(p)),
            _ => None,
        }
    }

    /// Nested action lists, in declaration order
    pub fn children(&self) -> Vec<&[ActionNode]> {
        match &self.kind {
            ActionKind::Conditional(p) => {
                vec![p.then_actions.as_slice(), p.else_actions.as_slice()]
            }
            ActionKind::Loop(p) => vec![p.actions.as_slice()],
            ActionKind::Sequence(p) => vec![p.actions.as_slice()],
            ActionKind::SwitchCase(p) => p
                .cases
                .iter()
                .map(|case| case.actions.as_slice())
                .chain(std::iter::once(p.default_actions.as_slice()))
                .collect(),
            ActionKind::TryCatch(p) => vec![
                p.try_actions.as_slice(),
                p.catch_actions.as_slice(),
                p.finally_actions.as_slice(),
            ],
            ActionKind::Parallel(p) => p.branches.iter().map(Vec::as_slice).collect(),
            _ => Vec::new(),
        }
    }

    /// Check the node can be dispatched
    pub fn validate(&self) -> SequenceResult<()> {
        if !self.enabled {
            return Err(SequenceError::Disabled);
        }

        let invalid = |reason: &str| -> SequenceResult<()> {
            Err(SequenceError::Invalid(reason.to_string()))
        };

        match &self.kind {
            ActionKind::TypeText(p) if p.text.is_empty() => invalid("type_text requires text"),
            ActionKind::TemplateSearch(p) if p.template_path.trim().is_empty() => {
                invalid("template_search requires template_path")
            }
            ActionKind::WaitForText(p) if p.text.trim().is_empty() => {
                invalid("wait_for_text requires text")
            }
            ActionKind::SetVariable(p) if p.variable_name.trim().is_empty() => {
                invalid("set_variable requires variable_name")
            }
            ActionKind::IncrementVariable(p) if p.variable_name.trim().is_empty() => {
                invalid("increment_variable requires variable_name")
            }
            ActionKind::Log(p) if p.message.is_empty() => invalid("log requires message"),
            ActionKind::StringOperation(p) => p.validate(),
            ActionKind::ListOperation(p) if p.list_variable.trim().is_empty() => {
                invalid("list_operation requires list_variable")
            }
            ActionKind::MathOperation(p) => p.validate(),
            ActionKind::Conditional(p) if p.condition.trim().is_empty() => {
                invalid("conditional requires condition")
            }
            ActionKind::Loop(p) => p.validate(),
            ActionKind::CallSequence(p) if p.name.trim().is_empty() => {
                invalid("call_sequence requires name")
            }
            ActionKind::SwitchCase(p) if p.expression.trim().is_empty() => {
                invalid("switch_case requires expression")
            }
            ActionKind::SwitchCase(p) if p.cases.is_empty() => {
                invalid("switch_case requires at least one case")
            }
            ActionKind::TryCatch(p) if p.try_actions.is_empty() => {
                invalid("try_catch requires try_actions")
            }
            ActionKind::Parallel(p) if p.branches.is_empty() => {
                invalid("parallel requires at least one branch")
            }
            ActionKind::Parallel(p) if p.max_workers == 0 => {
                invalid("parallel requires max_workers > 0")
            }
            _ => Ok(()),
        }
    }
}

impl From<ActionKind> for ActionNode {
    fn from(kind: ActionKind) -> Self {
        Self::new(kind)
    }
}

/// Action payload, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    // Leaf actions
    Click(ClickParams),
    Drag(DragParams),
    TypeText(TypeTextParams),
    Wait(WaitParams),
    TemplateSearch(TemplateSearchParams),
    WaitForText(WaitForTextParams),

    // Data actions
    SetVariable(SetVariableParams),
    IncrementVariable(IncrementVariableParams),
    Log(LogParams),
    StringOperation(StringOperationParams),
    ListOperation(ListOperationParams),
    MathOperation(MathOperationParams),

    // Basic flow
    Conditional(ConditionalParams),
    Loop(LoopParams),
    Sequence(SequenceParams),
    CallSequence(CallSequenceParams),

    // Advanced flow
    SwitchCase(SwitchCaseParams),
    TryCatch(TryCatchParams),
    Parallel(ParallelParams),
    Breakpoint(BreakpointParams),
}

impl ActionKind {
    /// Upper-case kind name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click(_) => "CLICK",
            ActionKind::Drag(_) => "DRAG",
            ActionKind::TypeText(_) => "TYPE_TEXT",
            ActionKind::Wait(_) => "WAIT",
            ActionKind::TemplateSearch(_) => "TEMPLATE_SEARCH",
            ActionKind::WaitForText(_) => "WAIT_FOR_TEXT",
            ActionKind::SetVariable(_) => "SET_VARIABLE",
            ActionKind::IncrementVariable(_) => "INCREMENT_VARIABLE",
            ActionKind::Log(_) => "LOG",
            ActionKind::StringOperation(_) => "STRING_OPERATION",
            ActionKind::ListOperation(_) => "LIST_OPERATION",
            ActionKind::MathOperation(_) => "MATH_OPERATION",
            ActionKind::Conditional(_) => "CONDITIONAL",
            ActionKind::Loop(_) => "LOOP",
            ActionKind::Sequence(_) => "SEQUENCE",
            ActionKind::CallSequence(_) => "CALL_SEQUENCE",
            ActionKind::SwitchCase(_) => "SWITCH_CASE",
            ActionKind::TryCatch(_) => "TRY_CATCH",
            ActionKind::Parallel(_) => "PARALLEL",
            ActionKind::Breakpoint(_) => "BREAKPOINT",
        }
    }
}

// ============================================================================
// Leaf actions
// ============================================================================

/// Borrowed view of a leaf action's payload, handed to the collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaf<'a> {
    Click(&'a ClickParams),
    Drag(&'a DragParams),
    TypeText(&'a TypeTextParams),
    Wait(&'a WaitParams),
    TemplateSearch(&'a TemplateSearchParams),
    WaitForText(&'a WaitForTextParams),
}

impl Leaf<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Leaf::Click(_) => "CLICK",
            Leaf::Drag(_) => "DRAG",
            Leaf::TypeText(_) => "TYPE_TEXT",
            Leaf::Wait(_) => "WAIT",
            Leaf::TemplateSearch(_) => "TEMPLATE_SEARCH",
            Leaf::WaitForText(_) => "WAIT_FOR_TEXT",
        }
    }

    /// Short human-readable summary of the intended effect
    pub fn describe(&self) -> String {
        match self {
            Leaf::Click(p) => format!("{} click at ({}, {})", p.button, p.x, p.y),
            Leaf::Drag(p) => format!(
                "drag from ({}, {}) to ({}, {})",
                p.start_x, p.start_y, p.end_x, p.end_y
            ),
            Leaf::TypeText(p) => format!("type '{}'", p.text),
            Leaf::Wait(p) => format!("wait {:.2}s", p.duration),
            Leaf::TemplateSearch(p) => format!("search for template '{}'", p.template_path),
            Leaf::WaitForText(p) => format!("wait up to {:.1}s for text '{}'", p.timeout, p.text),
        }
    }
}

fn default_button() -> String {
    "left".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickParams {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// left, right or middle
    #[serde(default = "default_button")]
    pub button: String,
    /// Seconds spent moving the pointer before clicking
    #[serde(default = "default_move_duration")]
    pub move_duration: f64,
}

fn default_move_duration() -> f64 {
    0.2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragParams {
    #[serde(default)]
    pub start_x: i32,
    #[serde(default)]
    pub start_y: i32,
    #[serde(default)]
    pub end_x: i32,
    #[serde(default)]
    pub end_y: i32,
    #[serde(default = "default_button")]
    pub button: String,
    #[serde(default = "default_drag_duration")]
    pub duration: f64,
}

fn default_drag_duration() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTextParams {
    #[serde(default)]
    pub text: String,
    /// Delay between keystrokes in seconds
    #[serde(default = "default_key_delay")]
    pub delay: f64,
    #[serde(default)]
    pub use_clipboard: bool,
}

fn default_key_delay() -> f64 {
    0.05
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitParams {
    /// Seconds
    #[serde(default = "default_wait")]
    pub duration: f64,
    /// Maximum random extra seconds
    #[serde(default)]
    pub random_variation: f64,
}

fn default_wait() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSearchParams {
    #[serde(default)]
    pub template_path: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// `[x, y, width, height]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_region: Option<[i32; 4]>,
    #[serde(default = "default_max_matches")]
    pub max_matches: u32,
    /// Variable that receives the match position as `[x, y]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_to_variable: Option<String>,
}

fn default_confidence() -> f64 {
    0.8
}

fn default_max_matches() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitForTextParams {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<[i32; 4]>,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Seconds
    #[serde(default = "default_text_timeout")]
    pub timeout: f64,
    /// Variable that receives the recognized text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_to_variable: Option<String>,
}

fn default_text_timeout() -> f64 {
    30.0
}

// ============================================================================
// Data actions
// ============================================================================

/// How `set_variable` interprets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Substitute, then parse as a literal
    #[default]
    Auto,
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVariableParams {
    #[serde(default)]
    pub variable_name: String,
    #[serde(default = "default_value")]
    pub value: Value,
    #[serde(default)]
    pub value_type: ValueType,
}

fn default_value() -> Value {
    Value::String(String::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementVariableParams {
    #[serde(default)]
    pub variable_name: String,
    #[serde(default = "default_increment")]
    pub increment_by: f64,
}

fn default_increment() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
}

/// String operation applied to the values of `input_variables`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOperation {
    /// Join every input
    #[default]
    Concat,
    /// Characters `start..end` of the first input; negative bounds count from the end
    Substring,
    /// Replace every `old` with `new` in the first input
    Replace,
    /// Character count of the first input
    Length,
    /// Split the first input on `delimiter` into a list
    Split,
    Trim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringOperationParams {
    #[serde(default)]
    pub operation: StringOperation,
    #[serde(default)]
    pub input_variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
    #[serde(default)]
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default)]
    pub old: String,
    #[serde(default)]
    pub new: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    " ".to_string()
}

impl StringOperationParams {
    fn validate(&self) -> SequenceResult<()> {
        let reason = match self.operation {
            StringOperation::Concat => return Ok(()),
            _ if self.input_variables.is_empty() => {
                "string operation requires at least one input variable"
            }
            StringOperation::Replace if self.old.is_empty() => "replace requires old",
            StringOperation::Split if self.delimiter.is_empty() => "split requires a delimiter",
            _ => return Ok(()),
        };
        Err(SequenceError::Invalid(reason.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOperation {
    /// Bind `list_variable` to an empty list
    #[default]
    Create,
    Append,
    /// Element at `index`, into `output_variable`
    Get,
    /// Element count, into `output_variable`
    Length,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOperationParams {
    #[serde(default)]
    pub operation: ListOperation,
    #[serde(default)]
    pub list_variable: String,
    /// Appended element; text is substituted and parsed like `set_variable`
    #[serde(default = "default_value", alias = "item", alias = "input_value")]
    pub value: Value,
    #[serde(default)]
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Abs,
    /// Half to even; an optional second operand gives the decimal places
    Round,
    Floor,
    Ceil,
    Min,
    Max,
}

impl MathOperation {
    /// Accepted operand counts
    pub fn arity(&self) -> std::ops::RangeInclusive<usize> {
        match self {
            MathOperation::Add
            | MathOperation::Multiply
            | MathOperation::Min
            | MathOperation::Max => 1..=usize::MAX,
            MathOperation::Subtract | MathOperation::Divide => 2..=usize::MAX,
            MathOperation::Modulo | MathOperation::Power => 2..=2,
            MathOperation::Abs | MathOperation::Floor | MathOperation::Ceil => 1..=1,
            MathOperation::Round => 1..=2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathOperationParams {
    #[serde(default)]
    pub operation: MathOperation,
    /// Numbers, or text that substitutes to a number
    #[serde(default)]
    pub operands: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
}

impl MathOperationParams {
    fn validate(&self) -> SequenceResult<()> {
        if self.operation.arity().contains(&self.operands.len()) {
            return Ok(());
        }
        Err(SequenceError::Invalid(format!(
            "math {:?} does not take {} operand(s)",
            self.operation,
            self.operands.len()
        )))
    }
}

// ============================================================================
// Basic flow
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalParams {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub then_actions: Vec<ActionNode>,
    #[serde(default)]
    pub else_actions: Vec<ActionNode>,
}

/// Loop flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Run `count` times
    #[default]
    #[serde(alias = "count")]
    Bounded,
    /// Run while `condition` holds, up to `max_iterations`
    #[serde(alias = "while")]
    Conditioned,
    /// Run once per element of `collection`, bound to `variable`
    #[serde(alias = "for-each")]
    ForEach,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopParams {
    #[serde(default)]
    pub mode: LoopMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub actions: Vec<ActionNode>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    100
}

impl LoopParams {
    fn validate(&self) -> SequenceResult<()> {
        let reason = match self.mode {
            LoopMode::Bounded if self.count.unwrap_or(0) == 0 => "bounded loop requires count > 0",
            LoopMode::Conditioned if self.condition.trim().is_empty() => {
                "conditioned loop requires condition"
            }
            LoopMode::Conditioned if self.max_iterations == 0 => {
                "conditioned loop requires max_iterations > 0"
            }
            LoopMode::ForEach if self.variable.trim().is_empty() => {
                "for_each loop requires variable"
            }
            LoopMode::ForEach if self.collection.trim().is_empty() => {
                "for_each loop requires collection"
            }
            _ => return Ok(()),
        };
        Err(SequenceError::Invalid(reason.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceParams {
    #[serde(default)]
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSequenceParams {
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// Advanced flow
// ============================================================================

/// One arm of a switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Value,
    #[serde(default)]
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCaseParams {
    #[serde(default)]
    pub expression: String,
    /// Scanned in declaration order; first match wins
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
    #[serde(default)]
    pub default_actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryCatchParams {
    #[serde(default)]
    pub try_actions: Vec<ActionNode>,
    #[serde(default)]
    pub catch_actions: Vec<ActionNode>,
    #[serde(default)]
    pub finally_actions: Vec<ActionNode>,
    /// Receives the failure message before `catch_actions` run
    #[serde(
        default,
        alias = "error_variable",
        skip_serializing_if = "Option::is_none"
    )]
    pub store_error_variable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelParams {
    #[serde(default)]
    pub branches: Vec<Vec<ActionNode>>,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_true")]
    pub wait_for_all: bool,
}

fn default_max_workers() -> usize {
    4
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakpointParams {
    /// Absent means always trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
