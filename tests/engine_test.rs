use std::sync::Arc;

use stencil::engine::strip_comments;
use stencil::{render, Error, Map, Object, Renderer, Scope, Value};

fn product(name: &str, in_stock: bool) -> Value {
    let mut map = Map::new();
    map.insert("Name".to_string(), Value::from(name));
    map.insert("InStock".to_string(), Value::from(in_stock));
    Value::Map(map)
}

fn strings(items: &[&str]) -> Value {
    Value::List(items.iter().map(|s| Value::from(*s)).collect())
}

#[test]
fn test_interpolation_with_pipe() {
    let mut scope = Scope::new();
    scope.set("Name", "john doe");
    assert_eq!(render("Hello, ${Context.Name | upper}!", &scope).unwrap(), "Hello, JOHN DOE!");
}

#[test]
fn test_plain_text_is_unchanged() {
    let template = "plain text\n  with {braces}, $dollars and @handles\n\nend\n";
    assert_eq!(render(template, &Scope::new()).unwrap(), template);
}

#[test]
fn test_foreach_with_nested_if_on_one_line() {
    let mut scope = Scope::new();
    scope.set("Items", Value::List(vec![product("A", true), product("B", false)]));

    let template = "@foreach (var p in Context.Items) {@if (p.InStock) {- ${p.Name}\n}}";
    let output = render(template, &scope).unwrap();
    assert_eq!(output, "- A\n");
    assert!(!output.contains('B'));
}

#[test]
fn test_else_if_chain() {
    let template = "@if (Context.Score >= 90) {\nA\n} else if (Context.Score >= 80) {\nB\n\
                    } else if (Context.Score >= 70) {\nC\n} else {\nF\n}\n";
    let expectations = [(95, "A\n"), (85, "B\n"), (75, "C\n"), (10, "F\n")];
    for (score, expected) in expectations {
        let mut scope = Scope::new();
        scope.set("Score", score);
        assert_eq!(render(template, &scope).unwrap(), expected, "score {score}");
    }
}

#[test]
fn test_if_without_match_renders_nothing() {
    let template = "before\n@if (Context.Off) {\nhidden\n}\nafter";
    assert_eq!(render(template, &Scope::new()).unwrap(), "before\nafter");
}

#[test]
fn test_indented_region_keeps_body_indentation() {
    let mut scope = Scope::new();
    scope.set("On", true);
    let template = "  @if (Context.On) {\n    inner\n  }\nafter\n";
    assert_eq!(render(template, &scope).unwrap(), "    inner\nafter\n");
}

#[test]
fn test_foreach_over_string_fails() {
    let mut scope = Scope::new();
    scope.set("Name", "Ada");

    let err = render("@foreach (var c in Context.Name) {\n${c}\n}\n", &scope).unwrap_err();
    assert!(matches!(err, Error::ControlFlowError { .. }));
    assert!(err.to_string().contains("Name"));

    let err = render("@foreach(var x in Context.Name){${x}}", &scope).unwrap_err();
    assert!(err.to_string().contains("Name"));
}

#[test]
fn test_foreach_over_missing_collection_is_empty() {
    let template = "before\n@foreach (var x in Context.Missing) {\n${x}\n}\nafter";
    assert_eq!(render(template, &Scope::new()).unwrap(), "before\nafter");
}

#[test]
fn test_foreach_cursor_variables() {
    let mut scope = Scope::new();
    scope.set("Items", strings(&["a", "b"]));

    let template = "@foreach (var x in Context.Items) {\n${CurrentIndex}:${x}:${Current}\n}\n";
    assert_eq!(render(template, &scope).unwrap(), "0:a:a\n1:b:b\n");
}

#[test]
fn test_foreach_over_map_yields_entries() {
    let mut settings = Map::new();
    settings.insert("A".to_string(), Value::Int(1));
    settings.insert("B".to_string(), Value::Int(2));
    let mut scope = Scope::new();
    scope.set("Settings", Value::Map(settings));

    let template = "@foreach (var kv in Context.Settings) {\n${kv.Key}=${kv.Value} (${CurrentKey})\n}\n";
    assert_eq!(render(template, &scope).unwrap(), "A=1 (A)\nB=2 (B)\n");
}

#[test]
fn test_foreach_over_scalar_runs_once() {
    let mut scope = Scope::new();
    scope.set("Total", 7);
    assert_eq!(render("@foreach (var t in Context.Total) {[${t}]}", &scope).unwrap(), "[7]");
}

#[test]
fn test_expanded_output_is_interpolated_again() {
    let mut scope = Scope::new();
    scope.set("Name", "Ada");
    scope.set("Items", strings(&["${Context.Name}", "plain"]));

    let template = "@foreach (var x in Context.Items) {${x};}";
    assert_eq!(render(template, &scope).unwrap(), "Ada;plain;");
}

#[test]
fn test_loop_variable_does_not_leak() {
    let mut scope = Scope::new();
    scope.set("Items", strings(&["a", "b"]));

    let template = "@foreach (var x in Context.Items) {${x}}\n[${x}]";
    assert_eq!(render(template, &scope).unwrap(), "ab[]");
    assert!(!scope.has("x"));
}

#[test]
fn test_nested_loops() {
    let mut row = Map::new();
    row.insert("Cells".to_string(), strings(&["1", "2"]));
    let mut scope = Scope::new();
    scope.set("Rows", Value::List(vec![Value::Map(row.clone()), Value::Map(row)]));

    let template = "@foreach (var r in Context.Rows) {\n@foreach (var c in r.Cells) {\n${c};\n}\n|\n}\n";
    assert_eq!(render(template, &scope).unwrap(), "1;\n2;\n|\n1;\n2;\n|\n");
}

#[test]
fn test_comments_are_removed() {
    let mut scope = Scope::new();
    scope.set("Name", "Ada");
    let template = "a@* hidden\n ${Context.Name} *@b ${Context.Name}";
    assert_eq!(render(template, &scope).unwrap(), "ab Ada");
    assert_eq!(strip_comments("x @* note *@ y"), "x  y");
}

#[test]
fn test_unclosed_region_runs_to_end() {
    let mut scope = Scope::new();
    scope.set("On", true);
    assert_eq!(render("@if (Context.On) {\nopen\n", &scope).unwrap(), "open\n");
}

#[test]
fn test_malformed_header_is_plain_text() {
    let template = "@if Context.On {\nx\n}\n";
    assert_eq!(render(template, &Scope::new()).unwrap(), template);
}

#[test]
fn test_depth_limit() {
    let mut scope = Scope::new();
    scope.set("On", true);
    let template = "@if (Context.On) {@if (Context.On) {@if (Context.On) {@if (Context.On) {deep}}}}";

    let err = Renderer::new().with_max_depth(2).render(template, &scope).unwrap_err();
    assert!(matches!(err, Error::RecursionLimitError { limit: 2 }));
    assert_eq!(Renderer::new().render(template, &scope).unwrap(), "deep");
}

#[test]
fn test_services_inside_loop() {
    let mut scope = Scope::new();
    scope.set("Items", strings(&["a", "b"]));
    scope.register_service("shout", |v| Ok(Value::String(v.to_string().to_uppercase())));

    let template = "@foreach (var x in Context.Items) {${Services('shout')(x)};}";
    assert_eq!(render(template, &scope).unwrap(), "A;B;");
}

#[test]
fn test_custom_helper() {
    let mut renderer = Renderer::new();
    renderer.register_helper("shout", |v, _| Ok(Value::String(format!("{v}!"))));
    let mut scope = Scope::new();
    scope.set("Name", "ada");

    assert_eq!(renderer.render("${Context.Name | shout}", &scope).unwrap(), "ada!");
    assert_eq!(render("${Context.Name | shout}", &scope).unwrap(), "ada");
}

#[test]
fn test_helper_error_aborts_render() {
    let mut renderer = Renderer::new();
    renderer.register_helper("fail", |_, _| {
        Err(Error::HelperError {
            name: "fail".to_string(),
            message: "bad input".to_string(),
        })
    });
    let mut scope = Scope::new();
    scope.set("Items", strings(&["a"]));

    let template = "@foreach (var x in Context.Items) {\n${x | fail}\n}\n";
    let err = renderer.render(template, &scope).unwrap_err();
    assert!(matches!(err, Error::HelperError { .. }));
}

#[derive(Debug)]
struct Product {
    name: &'static str,
    price: f64,
}

impl Object for Product {
    fn type_name(&self) -> &str {
        "Product"
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Name" => Some(Value::from(self.name)),
            "Price" => Some(Value::Float(self.price)),
            _ => None,
        }
    }

    fn field_names(&self) -> Vec<String> {
        vec!["Name".to_string(), "Price".to_string()]
    }
}

#[test_log::test]
fn test_host_objects_in_templates() {
    let products: Vec<Arc<dyn Object>> = vec![
        Arc::new(Product {
            name: "Lamp",
            price: 19.5,
        }),
        Arc::new(Product {
            name: "Desk",
            price: 120.0,
        }),
    ];
    let mut scope = Scope::new();
    scope.set("Products", Value::List(products.into_iter().map(Value::from).collect()));
    scope.set("Budget", 100);

    let template = "\
@foreach (var p in Context.Products) {
@if (p.Price > Context.Budget) {
${p.name}: over budget
} else {
${p.name}: ${p.price | format:'0.00'}
}
}
";
    assert_eq!(render(template, &scope).unwrap(), "Lamp: 19.50\nDesk: over budget\n");
}
