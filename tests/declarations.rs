use std::sync::{Arc, Mutex};

use formic::{decl, FieldOutcome, FieldValue, FormState, Mode};

#[test]
fn declaration_round_trip() {
    let form = decl::from_json(
        r#"{
            "name": {
                "kind": "text",
                "rules": { "required": ["Name is required!"] }
            },
            "email": {
                "kind": "text",
                "rules": {
                    "required": ["Email is required!"],
                    "email":    ["Email address seems to be invalid!"]
                }
            }
        }"#,
    )
    .unwrap()
    .compile()
    .unwrap();

    assert_eq!(form.field_order(), vec!["name", "email"]);

    let state = FormState::new().set("name", "Ada").set("email", "not-an-email");
    let report = form.validate(&state, Mode::CollectAll).unwrap();
    let outcome = report.outcome("email").unwrap();
    assert_eq!(outcome.failing_rule(), Some("email"));
    assert_eq!(outcome.message(), Some("Email address seems to be invalid!"));
}

#[test]
fn declared_rule_order_is_preserved() {
    let form = decl::from_json(
        r#"{
            "code": {
                "rules": {
                    "digits": ["Digits only"],
                    "length": [4, 8, "Between 4 and 8"]
                }
            }
        }"#,
    )
    .unwrap()
    .compile()
    .unwrap();

    // "ab" violates both; the first declared rule wins.
    let report = form
        .validate(&FormState::new().set("code", "ab"), Mode::FailFast)
        .unwrap();
    assert_eq!(report.outcome("code").unwrap().failing_rule(), Some("digits"));
}

#[test]
fn declared_field_order_is_preserved() {
    let form = decl::from_json(
        r#"{
            "gamma": { "rules": { "required": ["g"] } },
            "alpha": { "rules": { "required": ["a"] } },
            "beta":  { "rules": { "required": ["b"] } }
        }"#,
    )
    .unwrap()
    .compile()
    .unwrap();
    assert_eq!(form.field_order(), vec!["gamma", "alpha", "beta"]);
}

#[test]
fn after_anchor_reorders_fields() {
    let form = decl::from_json(
        r#"{
            "first":  { "rules": { "required": ["1"] } },
            "third":  { "rules": { "required": ["3"] } },
            "second": { "after": "first", "rules": { "required": ["2"] } }
        }"#,
    )
    .unwrap()
    .compile()
    .unwrap();
    assert_eq!(form.field_order(), vec!["first", "second", "third"]);
}

#[test]
fn length_message_positions() {
    // Message in position 2 with a single bound.
    let form = decl::from_json(r#"{ "pin": { "rules": { "length": [4, "Too short"] } } }"#)
        .unwrap()
        .compile()
        .unwrap();
    let report = form
        .validate(&FormState::new().set("pin", "12"), Mode::FailFast)
        .unwrap();
    assert_eq!(report.outcome("pin").unwrap().message(), Some("Too short"));

    // Message in position 3 of 4 with both bounds and a trailing flag.
    let form = decl::from_json(
        r#"{ "pin": { "rules": { "length": [4, 6, "Between 4 and 6", true] } } }"#,
    )
    .unwrap()
    .compile()
    .unwrap();
    let report = form
        .validate(&FormState::new().set("pin", "1234567"), Mode::FailFast)
        .unwrap();
    assert_eq!(
        report.outcome("pin").unwrap().message(),
        Some("Between 4 and 6")
    );
}

#[test]
fn declared_dependencies_with_callback() {
    let log: Arc<Mutex<Vec<(bool, Vec<String>)>>> = Arc::default();
    let sink = Arc::clone(&log);

    let form = decl::from_json(
        r#"{
            "room": { "kind": "radios", "rules": { "required": ["Pick a room"] } },
            "extras": {
                "kind": "checkboxes",
                "rules": {
                    "required": ["Pick extras"],
                    "dependencies": [{ "room": "A" }, "toggle_extras, fade, 200"]
                }
            }
        }"#,
    )
    .unwrap()
    .callback("toggle_extras", move |satisfied, args| {
        sink.lock().unwrap().push((satisfied, args.to_vec()));
    })
    .compile()
    .unwrap();

    let state = FormState::new().set("room", FieldValue::selected(["B"]));
    let report = form.validate(&state, Mode::CollectAll).unwrap();
    assert_eq!(report.outcome("extras"), Some(&FieldOutcome::Exempt));

    form.proxy_changed("room", &state).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![(false, vec!["fade".to_owned(), "200".to_owned()])]
    );
}

#[test]
fn declared_any_of_dependency() {
    let form = decl::from_json(
        r#"{
            "plan": { "kind": "select", "rules": { "required": ["Pick a plan"] } },
            "card": {
                "rules": { "required": ["Card number required"] },
                "dependencies": { "plan": ["pro", "team"] }
            }
        }"#,
    )
    .unwrap()
    .compile()
    .unwrap();

    let state = FormState::new().set("plan", FieldValue::selected(["free"]));
    let report = form.validate(&state, Mode::CollectAll).unwrap();
    assert_eq!(report.outcome("card"), Some(&FieldOutcome::Exempt));

    let state = FormState::new().set("plan", FieldValue::selected(["pro"]));
    let report = form.validate(&state, Mode::CollectAll).unwrap();
    assert_eq!(
        report.outcome("card").unwrap().failing_rule(),
        Some("required")
    );
}

#[test]
fn custom_rule_names_resolve_through_the_registry() {
    let form = decl::from_json(
        r#"{
            "coupon": {
                "rules": { "custom": ["starts_with", "SAVE", "Invalid coupon"] }
            }
        }"#,
    )
    .unwrap()
    .custom_fn("starts_with", |value, args| {
        let prefix = args.first().map(String::as_str).unwrap_or_default();
        value.as_text().is_some_and(|t| t.starts_with(prefix))
    })
    .compile()
    .unwrap();

    let report = form
        .validate(&FormState::new().set("coupon", "SAVE20"), Mode::FailFast)
        .unwrap();
    assert!(report.is_valid());

    let report = form
        .validate(&FormState::new().set("coupon", "NOPE"), Mode::FailFast)
        .unwrap();
    assert_eq!(report.outcome("coupon").unwrap().failing_rule(), Some("custom"));
}

#[test]
fn unregistered_custom_name_fails_compile_not_validation() {
    let result = decl::from_json(
        r#"{ "coupon": { "rules": { "custom": ["missing_fn", "Invalid"] } } }"#,
    )
    .unwrap()
    .compile();
    assert!(result.is_err());
}

#[test]
fn malformed_declarations_are_rejected() {
    assert!(decl::from_json("[]").is_err());
    assert!(decl::from_json(r#"{ "f": { "kind": "hologram" } }"#).is_err());
    assert!(decl::from_json(r#"{ "f": { "rules": { "length": [1, 2] } } }"#).is_err());
    assert!(decl::from_json(r#"{ "f": { "rules": { "telepathy": ["msg"] } } }"#).is_err());
}

#[test]
fn filetype_declaration_with_mime_table() {
    let mimes = formic::MimeTable::from_json(
        r#"{ "jpg": ["image/jpeg", "image/pjpeg"], "pdf": "application/pdf" }"#,
    )
    .unwrap();

    let form = decl::from_json(
        r#"{
            "attachment": {
                "kind": "file",
                "rules": { "filetype": ["jpg, pdf", "Only jpg or pdf"] }
            }
        }"#,
    )
    .unwrap()
    .mime_table(mimes)
    .compile()
    .unwrap();

    let ok = FormState::new().set(
        "attachment",
        formic::UploadInfo {
            file_name: "scan.pdf".into(),
            mime_type: "application/pdf".into(),
            error_code: 0,
            byte_size: 100,
        },
    );
    assert!(form.validate(&ok, Mode::FailFast).unwrap().is_valid());

    let bad = FormState::new().set(
        "attachment",
        formic::UploadInfo {
            file_name: "movie.mp4".into(),
            mime_type: "video/mp4".into(),
            error_code: 0,
            byte_size: 100,
        },
    );
    let report = form.validate(&bad, Mode::FailFast).unwrap();
    assert_eq!(
        report.outcome("attachment").unwrap().failing_rule(),
        Some("filetype")
    );
}
