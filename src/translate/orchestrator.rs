//! Directive orchestration.
//!
//! Drives one compilation unit end to end: parse, build the class model,
//! scan pragmas, validate nesting, then translate directive by directive
//! in document order — a nested directive always runs after its enclosing
//! one, so the enclosing capture set threads into it and nested regions
//! re-capture outer variables through the enclosing context. Synthesis
//! follows each directive's own pass; zero-width insert ordering in the
//! rewriter makes wrappings that share a boundary nest correctly.

use tracing::{debug, error};

use crate::config::TranslatorConfig;
use crate::error::{JpError, Result};
use crate::model::UnitModel;
use crate::parse;
use crate::pragma::{self, Directive, DirectiveKind};
use crate::rewrite::TokenRewriter;
use crate::translate::synthesis;
use crate::translate::visitor::{ParentScope, TranslationVisitor};
use crate::translate::{DirectiveReport, TranslationOutput};

/// The translation stage for Java units with `// omp` pragmas.
#[derive(Debug, Default)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Translator { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate one compilation unit.
    ///
    /// A unit without pragmas passes through byte-identical. Unit-fatal
    /// faults (parse errors, invalid directives, unsupported constructs,
    /// internal inconsistencies) abort the unit; callers driving many
    /// units log and continue.
    pub fn translate_unit(&self, source: &str) -> Result<TranslationOutput> {
        let tree = parse::parse_unit(source)?;
        let model = UnitModel::build(&tree, source)?;
        let mut directives = pragma::scan(&tree, source)?;

        if directives.is_empty() {
            debug!("no pragmas; unit passes through untouched");
            return Ok(TranslationOutput {
                text: source.to_string(),
                reports: Vec::new(),
            });
        }
        debug!(count = directives.len(), "translating unit");
        validate_nesting(&directives)?;

        let mut rw = TokenRewriter::new(source);
        for i in 0..directives.len() {
            self.translate_directive(i, &mut directives, &model, source, &mut rw)?;
        }

        let reports = directives
            .iter()
            .map(|d| DirectiveReport::new(d, &model))
            .collect();
        Ok(TranslationOutput {
            text: rw.render(),
            reports,
        })
    }

    /// Translate many named units, skipping failed ones with a diagnostic.
    pub fn translate_units<'a, I>(&self, units: I) -> Vec<(String, Result<TranslationOutput>)>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        units
            .into_iter()
            .map(|(name, source)| {
                let result = self.translate_unit(source);
                if let Err(e) = &result {
                    error!(unit = name, error = %e, "unit skipped");
                }
                (name.to_string(), result)
            })
            .collect()
    }

    /// Read and translate a file.
    pub fn translate_file(&self, path: impl AsRef<std::path::Path>) -> Result<TranslationOutput> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| JpError::io_with_path(e, path))?;
        debug!(path = %path.display(), "translating file");
        self.translate_unit(&source)
    }

    fn translate_directive(
        &self,
        i: usize,
        directives: &mut [Directive],
        model: &UnitModel,
        source: &str,
        rw: &mut TokenRewriter,
    ) -> Result<()> {
        let kind = directives[i].kind;
        debug!(kind = %kind, line = directives[i].line(), "translating directive");

        if kind.owns_context() {
            let parent_scope = match nearest_owning_ancestor(directives, i) {
                Some(p) => ParentScope {
                    context_var: Some(directives[p].context_var.clone()),
                    captured: directives[p].captured.clone(),
                    captured_this: directives[p].captured_this,
                    directive_class: directives[p].directive_class,
                },
                None => ParentScope::default(),
            };

            let visitor = TranslationVisitor::new(&directives[i], parent_scope, model, source);
            let outcome = visitor.translate(rw)?;
            directives[i].captured = outcome.captured;
            directives[i].captured_this = outcome.captured_this;
            directives[i].directive_class = outcome.directive_class;

            rw.replace(directives[i].comment, "")?;
            synthesis::synthesize_parallel(&directives[i], model, &self.config, rw)?;
            if kind == DirectiveKind::ParallelFor {
                let exec = directives[i].executor_var.clone();
                synthesis::split_for_header(directives[i].region, &exec, rw, source)?;
            }
            return Ok(());
        }

        // Guard kinds bind to the nearest enclosing parallel directive.
        let owner = nearest_owning_ancestor(directives, i).ok_or_else(|| {
            JpError::internal("validated directive lost its parallel ancestor")
        })?;
        let exec = directives[owner].executor_var.clone();
        let monitor = directives[owner].context_var.clone();

        let section_index = if kind == DirectiveKind::Section {
            directives
                .iter()
                .filter(|s| {
                    s.kind == DirectiveKind::Section
                        && s.parent == directives[i].parent
                        && s.ordinal < directives[i].ordinal
                })
                .count()
        } else {
            0
        };

        let d = &directives[i];
        match kind {
            DirectiveKind::For => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_for(d, &exec, rw, source)?;
            }
            DirectiveKind::Sections => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_sections(d, &exec, rw)?;
            }
            DirectiveKind::Section => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_section(d, section_index, &exec, rw)?;
            }
            DirectiveKind::Single => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_single(d, &exec, rw)?;
            }
            DirectiveKind::Master => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_master(d, &exec, rw)?;
            }
            DirectiveKind::Critical | DirectiveKind::Atomic => {
                rw.replace(d.comment, "")?;
                synthesis::synthesize_critical(d, &monitor, rw)?;
            }
            DirectiveKind::Barrier => {
                synthesis::synthesize_barrier(d, &exec, rw)?;
            }
            DirectiveKind::Parallel | DirectiveKind::ParallelFor => unreachable!(),
        }
        Ok(())
    }
}

/// Walk the lexical parent chain to the nearest context-owning directive.
fn nearest_owning_ancestor(directives: &[Directive], i: usize) -> Option<usize> {
    let mut cur = directives[i].parent;
    while let Some(p) = cur {
        if directives[p].kind.owns_context() {
            return Some(p);
        }
        cur = directives[p].parent;
    }
    None
}

/// Nesting rules checked before any token moves.
fn validate_nesting(directives: &[Directive]) -> Result<()> {
    for (i, d) in directives.iter().enumerate() {
        if d.kind.requires_parallel_ancestor() && nearest_owning_ancestor(directives, i).is_none()
        {
            return Err(JpError::directive_at(
                d.line(),
                format!("`{}` must be nested inside a parallel region", d.kind),
            ));
        }
        match d.kind {
            DirectiveKind::Section => {
                let ok = d
                    .parent
                    .is_some_and(|p| directives[p].kind == DirectiveKind::Sections);
                if !ok {
                    return Err(JpError::directive_at(
                        d.line(),
                        "`section` must sit directly in a `sections` region",
                    ));
                }
            }
            DirectiveKind::Sections => {
                if d.region.kind() != "block" {
                    return Err(JpError::directive_at(
                        d.line(),
                        "`sections` requires a block region",
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
