//! Built-in Excel functions

pub mod conditional;
pub mod criteria;
pub mod database;
pub mod date;
pub mod distribution;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

mod number_format;

use std::sync::OnceLock;

use ahash::AHashMap;
use tracing::trace;

use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::value::{EvalResult, FormulaValue};

/// Function implementation signature
///
/// Functions consult the evaluation context for references, the date
/// system and the locale. `Err` carries the spreadsheet error result.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> EvalResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Is volatile (recalculates every time)
    pub volatile: bool,
}

impl FunctionDef {
    /// Run the implementation, turning an `Err` into an error value
    pub fn call(&self, args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaValue {
        (self.implementation)(args, ctx).unwrap_or_else(FormulaValue::Error)
    }

    fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        let within = actual >= self.min_args && self.max_args.map_or(true, |max| actual <= max);
        if within {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(FormulaError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual,
        })
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        math::register(&mut registry);
        statistical::register(&mut registry);
        distribution::register(&mut registry);
        financial::register(&mut registry);
        date::register(&mut registry);
        conditional::register(&mut registry);
        database::register(&mut registry);
        logical::register(&mut registry);
        info::register(&mut registry);
        text::register(&mut registry);
        lookup::register(&mut registry);

        registry
    }

    /// A registry without any functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any previous definition of the name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Register a non-volatile function
    pub(crate) fn add(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation,
            volatile: false,
        });
    }

    /// Register a function whose result changes on every evaluation
    pub(crate) fn add_volatile(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation,
            volatile: true,
        });
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of built-in functions
pub fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Evaluate a function call with already evaluated arguments
///
/// Spreadsheet errors come back as `Ok(FormulaValue::Error(..))`; `Err` is
/// reserved for unknown names and wrong argument counts.
///
/// # Examples
/// ```
/// use xlcalc_formula::{evaluate_function, EvaluationContext, FormulaValue};
///
/// let ctx = EvaluationContext::simple();
/// let result = evaluate_function("round", &[2.5.into(), 0.0.into()], &ctx).unwrap();
/// assert_eq!(result, FormulaValue::Number(3.0));
/// ```
pub fn evaluate_function(
    name: &str,
    args: &[FormulaValue],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let func = get_function_registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;
    func.check_arity(args.len())?;
    trace!(function = func.name, args = args.len(), "evaluating function");
    Ok(func.call(args, ctx))
}
