//! Fuzzing harness generator for C++ classes.
//!
//! Takes the declaration dumps of one or more translation units and emits
//! two C++ streams: a header holding one `harness<C>` specialization per
//! eligible class, and a source file holding their definitions.

pub mod config;
pub mod harness;
pub mod inheritance;
pub mod printer;

use ramfuzz_ast::{ClassVisitor, DeclIndex, Diagnostic, TranslationUnit};
use serde::Serialize;
use tracing::{info, warn};

pub use config::{validate_config, ConfigError, GenConfig};
pub use harness::{GeneratorState, HarnessGenerator, SkipReason};
pub use inheritance::{ClassDetails, ClassDetailsRegistry, Detail, Inheritance, InheritanceBuilder};
pub use printer::{valident, PrintingPolicy, TypePrinter};

/// C++ runtime the generated code builds against. Write it next to the
/// outputs under [`GenConfig::runtime_header`].
pub const RUNTIME_HEADER: &str = include_str!("../runtime/ramfuzz-rt.hpp");

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Invalid configuration: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Config(Vec<ConfigError>),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// Outcome of a run, in order of precedence. The discriminant is the
/// driver's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success = 0,
    /// The front end reported errors; output covers what it could analyze.
    FrontEndError = 1,
    /// Generated code references harnesses that were never generated.
    Incomplete = 2,
}

impl GenerationStatus {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub status: GenerationStatus,
    /// Classes with a harness, in emission order.
    pub processed: Vec<String>,
    /// Referenced classes lacking a harness.
    pub missing: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Front-end errors and fatals.
    pub errors: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct GeneratedCode {
    pub header: String,
    pub source: String,
    pub report: GenerationReport,
}

/// Generates harnesses for every eligible class in `units`.
pub fn generate(units: &[TranslationUnit], config: &GenConfig) -> Result<GeneratedCode, GenerateError> {
    // 1. Validate
    validate_config(config).map_err(GenerateError::Config)?;

    // 2. Index declarations
    let index = DeclIndex::new(units);
    let inputs: Vec<&str> = units.iter().map(|tu| tu.file.as_str()).collect();

    // 3. One walk builds inheritance and emits harnesses; submakers wait for
    //    finish, when inheritance is complete.
    let mut builder = InheritanceBuilder::new();
    let mut generator = HarnessGenerator::new(config, &inputs)?;
    let mut visitors: [&mut dyn ClassVisitor; 2] = [&mut builder, &mut generator];
    index.walk(&mut visitors);
    let (inheritance, details) = builder.into_parts();
    let emitted = generator.finish(&index, &inheritance, &details)?;

    // 4. Reconcile
    let missing = emitted.state.missing();
    for name in &missing {
        warn!(class = %name, "referenced class has no harness");
    }
    let errors: Vec<Diagnostic> = index
        .diagnostics()
        .filter(|d| d.is_error())
        .cloned()
        .collect();
    let status = if !errors.is_empty() {
        GenerationStatus::FrontEndError
    } else if !missing.is_empty() {
        GenerationStatus::Incomplete
    } else {
        GenerationStatus::Success
    };
    info!(
        processed = emitted.state.processed.len(),
        skipped = emitted.state.skipped.len(),
        missing = missing.len(),
        ?status,
        "generation finished"
    );

    Ok(GeneratedCode {
        header: emitted.header,
        source: emitted.source,
        report: GenerationReport {
            status,
            processed: emitted.state.processed,
            missing,
            skipped: emitted.state.skipped,
            errors,
        },
    })
}
