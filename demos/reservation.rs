use formic::{
    DateOp, DependencyBinding, Expected, FieldKind, FieldValue, FormBuilder, Mode, Rule,
};

fn main() {
    // A meeting-room reservation form: extras are only validated when room A
    // is picked, and the two dates must be ordered.
    let form = FormBuilder::new()
        .field("name", FieldKind::Text, |f| {
            f.rule(Rule::required("Name is required!"))
        })
        .field("email", FieldKind::Text, |f| {
            f.rule(Rule::required("Email is required!"))
                .rule(Rule::email("Email address seems to be invalid!"))
        })
        .field("room", FieldKind::ChoiceOne, |f| {
            f.rule(Rule::required("Room selection is required!"))
        })
        .field("extras", FieldKind::BoolGroup, |f| {
            f.rule(Rule::required("Pick at least one extra!"))
                .depends_on(DependencyBinding::new().when("room", Expected::equals("A")))
        })
        .field("from", FieldKind::Text, |f| {
            f.rule(Rule::required("Start date is required!"))
                .rule(Rule::date("Y-m-d", "Start date is invalid!"))
        })
        .field("to", FieldKind::Text, |f| {
            f.rule(Rule::required("End date is required!"))
                .rule(Rule::date("Y-m-d", "End date is invalid!"))
                .rule(Rule::datecompare(
                    "from",
                    DateOp::AfterOrEqual,
                    "End date must not precede the start date!",
                ))
        })
        .compile()
        .expect("failed to compile form");

    println!("{form}");

    let mut session = form.session().with_mode(Mode::CollectAll);
    session.set_value("name", "Ada Lovelace");
    session.set_value("email", "ada@example");
    session.set_value("room", FieldValue::selected(["A"]));
    session.set_value("from", "2024-06-10");
    session.set_value("to", "2024-06-08");

    let report = session.validate_all().expect("pass aborted");
    println!("{report}");
    for (field, outcome) in report.outcomes() {
        match outcome.failing_rule() {
            Some(rule) => println!(
                "  {field}: failed '{rule}' - {}",
                outcome.message().unwrap_or_default()
            ),
            None => println!("  {field}: ok"),
        }
    }
}
