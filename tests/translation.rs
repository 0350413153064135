//! End-to-end translation scenarios.
//!
//! Each test feeds a small annotated Java unit through the translator and
//! checks the rewritten text and the capture reports.

use jpragma::{JpError, Translator};

fn translate(source: &str) -> jpragma::TranslationOutput {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Translator::default()
        .translate_unit(source)
        .expect("translation should succeed")
}

fn translate_err(source: &str) -> JpError {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Translator::default()
        .translate_unit(source)
        .expect_err("translation should fail")
}

#[test]
fn captures_a_local_int() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        x = x + 1;
    }
}
"#,
    );

    assert!(output.text.contains("ompContext_0.L_0_x = ompContext_0.L_0_x + 1;"));
    assert!(output.text.contains("class OMPContext_0 {"));
    assert!(output.text.contains("public int L_0_x;"));
    // Shared capture: initialized before launch, written back after join.
    assert!(output.text.contains("ompContext_0.L_0_x = x;"));
    assert!(output.text.contains("x = ompContext_0.L_0_x;"));
    assert!(output.text.contains("ompExecutor_0.waitForExecution();"));
    assert!(!output.text.contains("// omp"));

    assert_eq!(output.reports.len(), 1);
    let report = &output.reports[0];
    assert!(!report.captured_this);
    assert_eq!(report.captured.len(), 1);
    assert_eq!(report.captured[0].name, "x");
    assert_eq!(report.captured[0].kind, "local");
    assert_eq!(report.captured[0].full_name, "L_0_x");
    assert!(!report.captured[0].privatized);
}

#[test]
fn private_variable_is_indexed_per_thread() {
    let output = translate(
        r#"
class Main {
    void work(int[] a) {
        int sum = 0;
        int i = 0;
        // omp parallel private(sum) threadNum(2)
        sum += a[i];
    }
}
"#,
    );

    assert!(output.text.contains(
        "ompContext_0.L_0_sum[ompExecutor_0.getThreadNum()] += ompContext_0.P_0_a[ompContext_0.L_0_i];"
    ));
    assert!(output.text.contains("public int[] L_0_sum;"));
    assert!(output.text.contains("public int[] P_0_a;"));
    assert!(output.text.contains("public int L_0_i;"));
    assert!(output
        .text
        .contains("ompContext_0.L_0_sum = new int[ompExecutor_0.getThreadCount()];"));
    assert!(output.text.contains("new jpragma.runtime.StaticExecutor(2);"));
    // Privatized values are discarded, never written back.
    assert!(!output.text.contains("sum = ompContext_0.L_0_sum"));

    let captured = &output.reports[0].captured;
    let names: Vec<&str> = captured.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["sum", "a", "i"]);
    assert!(captured[0].privatized);
    assert_eq!(captured[1].kind, "param");
}

#[test]
fn this_field_access_goes_through_the_context() {
    let output = translate(
        r#"
class Counter {
    int count;
    void tick() {
        // omp parallel
        this.count++;
    }
}
"#,
    );

    assert!(output.text.contains("ompContext_0.F_Counter_count++;"));
    assert!(output.text.contains("public int F_Counter_count;"));
    assert!(output.text.contains("public Counter THAT;"));
    assert!(output.text.contains("ompContext_0.F_Counter_count = count;"));
    assert!(output.text.contains("ompContext_0.THAT = this;"));
    assert!(output.text.contains("count = ompContext_0.F_Counter_count;"));

    let report = &output.reports[0];
    assert!(report.captured_this);
    assert_eq!(report.captured[0].full_name, "F_Counter_count");
    assert_eq!(report.captured[0].kind, "field");
}

#[test]
fn method_call_on_enclosing_object_uses_that() {
    let output = translate(
        r#"
class Worker {
    void doIt() { }
    void go() {
        // omp parallel
        this.doIt();
    }
}
"#,
    );

    assert!(output.text.contains("ompContext_0.THAT.doIt();"));
    assert!(output.text.contains("public Worker THAT;"));
    let report = &output.reports[0];
    assert!(report.captured_this);
    assert!(report.captured.is_empty());
}

#[test]
fn nested_directive_recaptures_through_parent_context() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        {
            x = x + 1;
            // omp parallel
            x = x + 2;
        }
    }
}
"#,
    );

    // The inner region references the outer context, not its own.
    assert!(output.text.contains("ompContext_0.L_0_x = ompContext_0.L_0_x + 2;"));
    assert!(!output.text.contains("ompContext_1.L_0_x"));
    // The inner scaffold still exists, with an empty context.
    assert!(output.text.contains("class OMPContext_1 {"));

    assert_eq!(output.reports.len(), 2);
    assert_eq!(output.reports[0].captured.len(), 1);
    assert!(output.reports[1].captured.is_empty());
}

#[test]
fn nested_directive_captures_its_own_new_variables() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        {
            int y = 5;
            // omp parallel
            x = x + y;
        }
    }
}
"#,
    );

    assert!(output
        .text
        .contains("ompContext_0.L_0_x = ompContext_0.L_0_x + ompContext_1.L_0_y;"));
    assert!(output.text.contains("ompContext_1.L_0_y = y;"));
    assert!(output.text.contains("y = ompContext_1.L_0_y;"));

    let inner = &output.reports[1].captured;
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].name, "y");
}

#[test]
fn this_inside_anonymous_class_is_untouched() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        {
            Runnable r = new Runnable() {
                public void run() {
                    this.toString();
                    x++;
                }
            };
            r.run();
        }
    }
}
"#,
    );

    assert!(output.text.contains("this.toString();"));
    assert!(output.text.contains("ompContext_0.L_0_x++;"));
    assert!(output.text.contains("r.run();"));

    let report = &output.reports[0];
    assert!(!report.captured_this);
    assert_eq!(report.captured.len(), 1);
    assert_eq!(report.captured[0].name, "x");
}

#[test]
fn region_local_shadowing_a_field_stays_untouched() {
    let output = translate(
        r#"
class C {
    int v;
    void m() {
        // omp parallel
        {
            int v = 0;
            v = v + 1;
        }
    }
}
"#,
    );

    assert!(output.text.contains("v = v + 1;"));
    assert!(!output.text.contains("F_C_v"));
    assert!(output.reports[0].captured.is_empty());
}

#[test]
fn region_local_declared_after_use_is_still_a_local() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        {
            x = 1;
            int x = 2;
        }
    }
}
"#,
    );

    // The name matches a declaration later in the same region block, so
    // it is never treated as a free variable.
    assert!(output.text.contains("x = 1;"));
    assert!(!output.text.contains("L_0_x"));
    assert!(output.reports[0].captured.is_empty());
}

#[test]
fn only_the_leftmost_segment_of_a_dotted_name_is_rewritten() {
    let output = translate(
        r#"
class Main {
    void work() {
        int[] data = new int[4];
        int n = 0;
        // omp parallel
        n = data.length;
    }
}
"#,
    );

    assert!(output
        .text
        .contains("ompContext_0.L_0_n = ompContext_0.L_0_data.length;"));
}

#[test]
fn private_index_extension_lands_on_the_leftmost_token() {
    let output = translate(
        r#"
class Main {
    void work() {
        int i = 0;
        int[] a = new int[8];
        // omp parallel private(i)
        a[i] = 0;
    }
}
"#,
    );

    assert!(output.text.contains(
        "ompContext_0.L_0_a[ompContext_0.L_0_i[ompExecutor_0.getThreadNum()]] = 0;"
    ));
}

#[test]
fn firstprivate_initializes_every_slot() {
    let output = translate(
        r#"
class Main {
    void work() {
        int seed = 7;
        // omp parallel firstprivate(seed)
        seed += 1;
    }
}
"#,
    );

    assert!(output
        .text
        .contains("ompContext_0.L_0_seed = new int[ompExecutor_0.getThreadCount()];"));
    assert!(output.text.contains("ompContext_0.L_0_seed[ompInit_0] = seed;"));
    assert!(output
        .text
        .contains("ompContext_0.L_0_seed[ompExecutor_0.getThreadNum()] += 1;"));
}

#[test]
fn parallel_for_splits_the_loop_header() {
    let output = translate(
        r#"
class Main {
    void work(int n) {
        int sum = 0;
        // omp parallel for private(sum)
        for (int i = 0; i < n; i++) {
            sum += i;
        }
    }
}
"#,
    );

    assert!(output.text.contains("int i = (0) + ompExecutor_0.getThreadNum();"));
    assert!(output.text.contains("i < ompContext_0.P_0_n;"));
    assert!(output.text.contains("i = i + ompExecutor_0.getThreadCount()"));
    assert!(output
        .text
        .contains("ompContext_0.L_0_sum[ompExecutor_0.getThreadNum()] += i;"));
}

#[test]
fn worksharing_kinds_splice_guards_against_the_parallel_executor() {
    let output = translate(
        r#"
class Main {
    void work(int n) {
        int done = 0;
        // omp parallel
        {
            // omp for
            for (int i = 0; i < n; i++) {
                done += i;
            }
            // omp single
            done = 1;
            // omp barrier
            done = 2;
            // omp critical
            done = 3;
            // omp master
            done = 4;
        }
    }
}
"#,
    );

    let text = &output.text;
    // `for`: header split against the enclosing executor + barrier.
    assert!(text.contains("int i = (0) + ompExecutor_0.getThreadNum();"));
    assert!(text.contains("i = i + ompExecutor_0.getThreadCount()"));
    // `single` and `master`: thread-0 guard.
    assert!(text.contains("if (ompExecutor_0.getThreadNum() == 0) {"));
    // `barrier`: the pragma comment itself became the call.
    assert!(text.contains("ompExecutor_0.barrier();"));
    // `critical`: mutual exclusion on the shared context.
    assert!(text.contains("synchronized (ompContext_0) {"));
    // Region tokens were rewritten by the enclosing parallel directive.
    assert!(text.contains("ompContext_0.L_0_done = 1;"));
    assert!(text.contains("ompContext_0.L_0_done = 3;"));
}

#[test]
fn sections_distribute_statically() {
    let output = translate(
        r#"
class Main {
    void work() {
        int a = 0;
        int b = 0;
        // omp parallel
        {
            // omp sections
            {
                // omp section
                a = 1;
                // omp section
                b = 2;
            }
        }
    }
}
"#,
    );

    let text = &output.text;
    assert!(text.contains(
        "if (0 % ompExecutor_0.getThreadCount() == ompExecutor_0.getThreadNum()) {"
    ));
    assert!(text.contains(
        "if (1 % ompExecutor_0.getThreadCount() == ompExecutor_0.getThreadNum()) {"
    ));
    assert!(text.contains("ompContext_0.L_0_a = 1;"));
    assert!(text.contains("ompContext_0.L_0_b = 2;"));
}

#[test]
fn stacked_pragmas_nest_around_one_statement() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        // omp single
        x = 1;
    }
}
"#,
    );

    let text = &output.text;
    let run = text.find("public void run() {").unwrap();
    let guard = text.find("if (ompExecutor_0.getThreadNum() == 0) {").unwrap();
    let body = text.find("ompContext_0.L_0_x = 1;").unwrap();
    let barrier = text.find("ompExecutor_0.barrier();").unwrap();
    let join = text.find("ompExecutor_0.waitForExecution();").unwrap();
    assert!(run < guard && guard < body && body < barrier && barrier < join);
}

#[test]
fn pragma_free_source_passes_through_byte_identical() {
    let source = r#"
class Untouched {
    // a comment that stays   exactly as written
    void m(int n) {
        int x = n; /* block comment */
        x++;
    }
}
"#;
    let output = translate(source);
    assert_eq!(output.text, source);
    assert!(output.reports.is_empty());
}

#[test]
fn translation_is_deterministic() {
    let source = r#"
class Main {
    int f;
    void work(int n) {
        int x = 0;
        // omp parallel private(x)
        {
            x = n + this.f;
        }
    }
}
"#;
    let first = translate(source);
    let second = translate(source);
    assert_eq!(first.text, second.text);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn orphan_worksharing_is_rejected() {
    let err = translate_err(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp single
        x = 1;
    }
}
"#,
    );
    assert!(matches!(err, JpError::InvalidDirective { .. }));
}

#[test]
fn lambda_inside_region_is_unsupported() {
    let err = translate_err(
        r#"
class Main {
    void work() {
        // omp parallel
        {
            Runnable r = () -> { };
        }
    }
}
"#,
    );
    assert!(matches!(err, JpError::UnsupportedConstruct { .. }));
}

#[test]
fn non_canonical_parallel_for_is_unsupported() {
    let err = translate_err(
        r#"
class Main {
    void work(int n) {
        // omp parallel for
        for (int i = n; i > 0; i--) {
            use(i);
        }
    }
    void use(int v) { }
}
"#,
    );
    assert!(matches!(err, JpError::UnsupportedConstruct { .. }));
}

#[test]
fn report_serializes_to_json() {
    let output = translate(
        r#"
class Main {
    void work() {
        int x = 0;
        // omp parallel
        x = x + 1;
    }
}
"#,
    );
    let json = output.to_json().unwrap();
    assert!(json.contains("\"kind\": \"parallel\""));
    assert!(json.contains("\"full_name\": \"L_0_x\""));
}
