//! Translator configuration.
//!
//! The emitted Java references a small executor API by name; which class
//! provides it, and how many workers a region gets when its pragma carries
//! no `threadNum` clause, are configuration, not code. The defaults match
//! the `jpragma.runtime` reference scheduler.

use serde::{Deserialize, Serialize};

/// Settings consumed by the translation stage.
///
/// Deserializable so build tooling can ship it as JSON next to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslatorConfig {
    /// Fully qualified name of the executor class the generated code
    /// instantiates once per parallel region. The class must expose
    /// `execute(Runnable)`, `getThreadNum()`, `getThreadCount()`,
    /// `waitForExecution()` and `barrier()`.
    pub executor_class: String,

    /// Java expression for the worker count of a region whose pragma has
    /// no `threadNum` clause. Evaluated once, at executor construction.
    pub default_thread_count: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            executor_class: "jpragma.runtime.StaticExecutor".to_string(),
            default_thread_count: "Runtime.getRuntime().availableProcessors()".to_string(),
        }
    }
}
