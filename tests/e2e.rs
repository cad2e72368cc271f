use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use template_placeholder_evaluation as tpe;
use tpe::{escape, Context, EscapeFunctions, KnownReplacements, TemplateEngine, Value, WILDCARD};

fn none() -> (KnownReplacements, EscapeFunctions) {
    (KnownReplacements::new(), EscapeFunctions::new())
}

#[test]
fn test_absent_and_empty_templates() {
    let (known, escapes) = none();
    assert_eq!(tpe::evaluate_template(None, &Context::Empty, &known, &escapes).unwrap(), None);
    assert_eq!(
        tpe::evaluate_template(Some(""), &Context::Empty, &known, &escapes).unwrap(),
        Some(String::new())
    );
}

#[test]
fn test_example_mail_summary() {
    let ctx = Context::mapping([
        ("Subject", Value::from("Invoice 2024-117 overdue")),
        ("From", Value::from("billing@example.com")),
    ]);
    let template = "{{UPPER(From)}}: {{Subject}} (#{{REGEX(Subject, \"Invoice (\\d+-\\d+)\")}})";
    let out = tpe::render(template, &ctx).unwrap();
    assert_eq!(out, "BILLING@EXAMPLE.COM: Invoice 2024-117 overdue (#2024-117)");
}

#[test]
fn test_known_replacement_then_escape() {
    let known = KnownReplacements::new().with("[CODE]", |_| Ok("12345".to_string()));
    let escapes = EscapeFunctions::new().with("[CODE]", |t: Option<&str>| t.map(|s| format!("<b>{s}</b>")));
    let out = tpe::evaluate_template(Some("Code [CODE] / [CODE]"), &Context::Empty, &known, &escapes)
        .unwrap()
        .unwrap();
    assert_eq!(out, "Code <b>12345</b> / <b>12345</b>");
}

#[test]
fn test_replacement_can_introduce_placeholders() {
    let ctx = Context::mapping([("Name", "Ada")]);
    let known = KnownReplacements::new().with("$greeting", |_| Ok("Hello {{UPPER(Name)}}".into()));
    let out = tpe::evaluate_template(Some("$greeting!"), &ctx, &known, &EscapeFunctions::new())
        .unwrap()
        .unwrap();
    assert_eq!(out, "Hello ADA!");
}

#[test]
fn test_exact_escape_overrides_wildcard() {
    let ctx = Context::mapping([("Body", "<p>"), ("Title", "<h1>")]);
    let escapes = EscapeFunctions::new()
        .with(WILDCARD, escape::html)
        .with("Title", |t: Option<&str>| t.map(str::to_string));
    let out = TemplateEngine::new()
        .render("{{Title}} {{Body}}", &ctx, &KnownReplacements::new(), &escapes)
        .unwrap();
    assert_eq!(out, "<h1> &lt;p&gt;");
}

#[test]
fn test_repeated_placeholders_share_one_value() {
    let out = tpe::render("{{DateTime.Now}}|{{ DateTime.Now }}|{{DateTime.Now}}", &Context::Empty).unwrap();
    let parts: Vec<&str> = out.split('|').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], parts[1]);
    assert_eq!(parts[1], parts[2]);
    assert!(!parts[0].contains("{{"));
}

#[test]
fn test_repeated_expressions_evaluate_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut engine = TemplateEngine::new();
    let seen = Arc::clone(&counter);
    engine.types_mut().register("Counter", "Next", move || {
        Value::Int(seen.fetch_add(1, Ordering::SeqCst) as i64)
    });
    let (known, escapes) = none();
    let out = engine
        .render("{{Counter.Next}} {{Counter.Next}}", &Context::Empty, &known, &escapes)
        .unwrap();
    assert_eq!(out, "0 0");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // a new render starts with an empty cache
    let out = engine.render("{{Counter.Next}}", &Context::Empty, &known, &escapes).unwrap();
    assert_eq!(out, "1");
}

#[test]
fn test_engine_eval_expression() {
    let ctx = Context::mapping([("n", 5)]);
    let v = TemplateEngine::new().eval("IF(EQUALS(n, 5), 'five', 'other')", &ctx).unwrap();
    assert_eq!(v, Value::from("five"));
}

proptest! {
    // Text with no braces and no replacement keys comes back unchanged.
    #[test]
    fn identity_without_placeholders(text in "[^{}]*") {
        let out = tpe::render(&text, &Context::Empty).unwrap();
        prop_assert_eq!(out, text);
    }

    // Roots missing from the context and from the type registry stay verbatim.
    #[test]
    fn unknown_roots_stay_verbatim(root in "zz[a-z]{1,8}", member in "[a-z]{1,8}") {
        let template = format!("{{{{{root}.{member}}}}}");
        let out = tpe::render(&template, &Context::Empty).unwrap();
        prop_assert_eq!(out, template);
    }
}
