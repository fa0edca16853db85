use formic::{decl, FieldValue, FormState, Mode};

const DECLARATION: &str = r#"{
    "department": {
        "kind": "select",
        "rules": { "required": ["Department is required!"] }
    },
    "budget_code": {
        "kind": "text",
        "rules": {
            "required": ["Budget code is required!"],
            "regexp":   ["^[A-Z]{2}-[0-9]{4}$", "Budget codes look like XX-0000"],
            "dependencies": [{ "department": ["Sales", "Marketing"] }]
        }
    },
    "contact": {
        "kind": "text",
        "rules": {
            "required": ["Contact address is required!"],
            "email":    ["Contact address seems to be invalid!"]
        }
    }
}"#;

fn main() {
    // The same declaration drives the authoring surface and the submission
    // check; this is the submission side.
    let form = decl::from_json(DECLARATION)
        .expect("declaration did not parse")
        .compile()
        .expect("declaration did not compile");

    let submission = FormState::new()
        .set("department", FieldValue::selected(["Sales"]))
        .set("budget_code", "sales-42")
        .set("contact", "ops@example.com");

    let report = form
        .validate(&submission, Mode::CollectAll)
        .expect("pass aborted");

    for (field, outcome) in report.outcomes() {
        match outcome.message() {
            Some(message) => println!("{field}: {message}"),
            None => println!("{field}: ok"),
        }
    }
}
