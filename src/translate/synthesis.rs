//! Directive-kind-specific code synthesis.
//!
//! Parallel kinds get the full scaffold: a local context class, executor
//! acquisition, context initialization, a task-launch loop whose body is
//! the rewritten region, the join, and write-back of shared captures.
//! Worksharing and synchronization kinds splice guard templates against
//! the executor of the nearest enclosing parallel directive. Everything
//! here is plain text insertion; the region's own tokens were already
//! rewritten by the visitor.

use tree_sitter::Node;

use crate::config::TranslatorConfig;
use crate::error::{JpError, Result};
use crate::model::UnitModel;
use crate::parse::{line_of, node_text};
use crate::pragma::Directive;
use crate::rewrite::TokenRewriter;

/// Wrap a parallel region: context class, executor, launch loop, join,
/// write-backs.
pub fn synthesize_parallel(
    d: &Directive,
    model: &UnitModel,
    config: &TranslatorConfig,
    rw: &mut TokenRewriter,
) -> Result<()> {
    rw.insert_before(d.region.start_byte(), prologue(d, model, config))?;
    rw.insert_after(d.region.end_byte(), epilogue(d, model))?;
    Ok(())
}

fn prologue(d: &Directive, model: &UnitModel, config: &TranslatorConfig) -> String {
    let ctx = &d.context_var;
    let exec = &d.executor_var;
    let class = &d.context_class;
    let thread_count = d.thread_count_expr(config);

    let mut s = String::new();
    s.push_str("{\n");

    s.push_str(&format!("class {class} {{\n"));
    for r in d.own_captures() {
        let full = r.var.full_name(model);
        if r.privatized() {
            s.push_str(&format!("public {}[] {full};\n", r.var.type_text()));
        } else {
            s.push_str(&format!("public {} {full};\n", r.var.type_text()));
        }
    }
    if d.captured_this {
        s.push_str(&format!("public {} THAT;\n", that_type(d, model)));
    }
    s.push_str("}\n");

    s.push_str(&format!(
        "final {0} {exec} = new {0}({thread_count});\n",
        config.executor_class
    ));
    s.push_str(&format!("final {class} {ctx} = new {class}();\n"));

    for r in d.own_captures() {
        let full = r.var.full_name(model);
        let name = r.var.name();
        if r.privatized() {
            s.push_str(&format!(
                "{ctx}.{full} = {};\n",
                new_array_expr(r.var.type_text(), &format!("{exec}.getThreadCount()"))
            ));
            if d.clauses.firstprivate_vars.iter().any(|n| n == name) {
                let it = format!("ompInit_{}", d.ordinal);
                s.push_str(&format!(
                    "for (int {it} = 0; {it} < {exec}.getThreadCount(); {it}++) {{ {ctx}.{full}[{it}] = {name}; }}\n"
                ));
            }
        } else {
            s.push_str(&format!("{ctx}.{full} = {name};\n"));
        }
    }
    if d.captured_this {
        s.push_str(&format!("{ctx}.THAT = this;\n"));
    }

    let spawn = format!("ompSpawn_{}", d.ordinal);
    s.push_str(&format!(
        "for (int {spawn} = 0; {spawn} < {exec}.getThreadCount(); {spawn}++) {{\n"
    ));
    s.push_str(&format!(
        "{exec}.execute(new Runnable() {{\n@Override\npublic void run() {{\n"
    ));
    s
}

fn epilogue(d: &Directive, model: &UnitModel) -> String {
    let mut s = String::from("\n}\n});\n}\n");
    s.push_str(&format!("{}.waitForExecution();\n", d.executor_var));
    for r in d.own_captures() {
        if !r.privatized() {
            s.push_str(&format!(
                "{} = {}.{};\n",
                r.var.name(),
                d.context_var,
                r.var.full_name(model)
            ));
        }
    }
    s.push('}');
    s
}

/// The Java type of the context's `THAT` back-reference.
fn that_type(d: &Directive, model: &UnitModel) -> String {
    match d.directive_class {
        Some(id) => {
            let entry = model.entry(id);
            entry
                .name
                .clone()
                .or_else(|| entry.super_name.clone())
                .unwrap_or_else(|| "Object".to_string())
        }
        None => "Object".to_string(),
    }
}

/// `new T[len]`, placing the length before any existing array dimensions
/// so `int[]` privatizes as `new int[len][]`.
fn new_array_expr(type_text: &str, len: &str) -> String {
    match type_text.find('[') {
        Some(i) => format!("new {}[{len}]{}", &type_text[..i], &type_text[i..]),
        None => format!("new {type_text}[{len}]"),
    }
}

/// Rewrite a canonical `for` header for round-robin worksharing: the
/// initial value gains the worker offset, the stride scales by the worker
/// count, the bound stays.
pub fn split_for_header(
    region: Node,
    exec: &str,
    rw: &mut TokenRewriter,
    source: &str,
) -> Result<()> {
    let line = line_of(region);
    let unsupported = |what: &str| JpError::UnsupportedConstruct {
        line,
        what: what.to_string(),
    };

    if region.kind() != "for_statement" {
        return Err(unsupported("worksharing requires a canonical for statement"));
    }

    let init = region
        .child_by_field_name("init")
        .ok_or_else(|| unsupported("for header without an initializer"))?;
    if init.kind() != "local_variable_declaration" {
        return Err(unsupported("loop variable must be declared in the for header"));
    }
    let mut declarators = init
        .children(&mut init.walk())
        .filter(|c| c.kind() == "variable_declarator")
        .collect::<Vec<_>>();
    if declarators.len() != 1 {
        return Err(unsupported("for header must declare exactly one loop variable"));
    }
    let declarator = declarators.remove(0);
    let name = declarator
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .ok_or_else(|| unsupported("unnamed loop variable"))?;
    let value = declarator
        .child_by_field_name("value")
        .ok_or_else(|| unsupported("loop variable needs an initial value"))?;

    rw.insert_before(value.start_byte(), "(")?;
    rw.insert_after(value.end_byte(), format!(") + {exec}.getThreadNum()"))?;

    let condition = region
        .child_by_field_name("condition")
        .ok_or_else(|| unsupported("for header without a condition"))?;
    if condition.kind() != "binary_expression" {
        return Err(unsupported("loop condition must compare the loop variable"));
    }
    let op = condition
        .child_by_field_name("operator")
        .map(|o| node_text(o, source))
        .unwrap_or("");
    if !matches!(op, "<" | "<=") {
        return Err(unsupported("loop condition must use < or <="));
    }

    let update = region
        .child_by_field_name("update")
        .ok_or_else(|| unsupported("for header without an update"))?;
    match update.kind() {
        "update_expression" => {
            if !node_text(update, source).contains("++") {
                return Err(unsupported("loop update must increment"));
            }
            rw.replace(update, format!("{name} = {name} + {exec}.getThreadCount()"))?;
        }
        "assignment_expression" => {
            let op = update
                .child_by_field_name("operator")
                .map(|o| node_text(o, source))
                .unwrap_or("");
            if op != "+=" {
                return Err(unsupported("loop update must use ++ or += with a constant"));
            }
            let right = update
                .child_by_field_name("right")
                .ok_or_else(|| unsupported("loop update without a stride"))?;
            if !is_int_literal(right.kind()) {
                return Err(unsupported("loop stride must be an integer literal"));
            }
            let stride = node_text(right, source);
            rw.replace(
                update,
                format!("{name} = {name} + ({stride}) * {exec}.getThreadCount()"),
            )?;
        }
        _ => return Err(unsupported("unrecognized loop update")),
    }
    Ok(())
}

fn is_int_literal(kind: &str) -> bool {
    matches!(
        kind,
        "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
    )
}

/// Worksharing `for` inside a parallel region: split the header against
/// the enclosing executor, then the implied barrier.
pub fn synthesize_for(
    d: &Directive,
    exec: &str,
    rw: &mut TokenRewriter,
    source: &str,
) -> Result<()> {
    split_for_header(d.region, exec, rw, source)?;
    rw.insert_after(d.region.end_byte(), format!("\n{exec}.barrier();"))
}

/// `sections` container: the block runs in every worker; each `section`
/// inside guards itself. Implied barrier at the end.
pub fn synthesize_sections(d: &Directive, exec: &str, rw: &mut TokenRewriter) -> Result<()> {
    rw.insert_after(d.region.end_byte(), format!("\n{exec}.barrier();"))
}

/// One `section`: statically assigned to a worker by index.
pub fn synthesize_section(
    d: &Directive,
    index: usize,
    exec: &str,
    rw: &mut TokenRewriter,
) -> Result<()> {
    wrap_guard(
        d,
        rw,
        format!("{index} % {exec}.getThreadCount() == {exec}.getThreadNum()"),
        None,
    )
}

/// `single`: one worker runs the region, everyone syncs after it.
pub fn synthesize_single(d: &Directive, exec: &str, rw: &mut TokenRewriter) -> Result<()> {
    wrap_guard(d, rw, format!("{exec}.getThreadNum() == 0"), Some(exec))
}

/// `master`: thread 0 only, no implied barrier.
pub fn synthesize_master(d: &Directive, exec: &str, rw: &mut TokenRewriter) -> Result<()> {
    wrap_guard(d, rw, format!("{exec}.getThreadNum() == 0"), None)
}

/// `critical` / `atomic`: mutual exclusion on the shared context
/// instance of the enclosing parallel region.
pub fn synthesize_critical(d: &Directive, monitor: &str, rw: &mut TokenRewriter) -> Result<()> {
    rw.insert_before(d.region.start_byte(), format!("synchronized ({monitor}) {{\n"))?;
    rw.insert_after(d.region.end_byte(), "\n}")
}

/// `barrier`: the pragma comment itself becomes the executor call.
pub fn synthesize_barrier(d: &Directive, exec: &str, rw: &mut TokenRewriter) -> Result<()> {
    rw.replace(d.comment, format!("{exec}.barrier();"))
}

fn wrap_guard(
    d: &Directive,
    rw: &mut TokenRewriter,
    condition: String,
    barrier_exec: Option<&str>,
) -> Result<()> {
    rw.insert_before(d.region.start_byte(), format!("if ({condition}) {{\n"))?;
    let mut tail = String::from("\n}");
    if let Some(exec) = barrier_exec {
        tail.push_str(&format!("\n{exec}.barrier();"));
    }
    rw.insert_after(d.region.end_byte(), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_array_expr() {
        assert_eq!(new_array_expr("int", "n"), "new int[n]");
        assert_eq!(new_array_expr("int[]", "n"), "new int[n][]");
        assert_eq!(new_array_expr("double[][]", "4"), "new double[4][][]");
    }
}
