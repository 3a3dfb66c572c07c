//! Property tests over whole sessions.

use proptest::prelude::*;
use stepwise_core::{compile, Model, Parameter, ParametersCollection};
use stepwise_eval::{Engine, History};

const SCRIPT: &str = include_str!("../../../fixtures/zorgtoeslag.yaml");

fn model() -> Model {
    compile(SCRIPT).unwrap()
}

fn answers(single: bool, income: Option<u32>) -> ParametersCollection {
    let mut params = ParametersCollection::new();
    let choice = if single {
        "alleenstaande"
    } else {
        "aanvrager_met_toeslagpartner"
    };
    params.upsert(Parameter::from_text(choice, "ja"));
    if let Some(income) = income {
        params.upsert(Parameter::from_text("toetsingsinkomen", &income.to_string()));
    }
    params
}

proptest! {
    #[test]
    fn execution_is_deterministic(single in any::<bool>(), income in proptest::option::of(0u32..100_000)) {
        let model = model();
        let engine = Engine::default();
        let input = answers(single, income);
        prop_assert_eq!(engine.execute(&model, &input).unwrap(), engine.execute(&model, &input).unwrap());
    }

    #[test]
    fn replay_is_idempotent(single in any::<bool>(), income in 0u32..100_000) {
        let model = model();
        let engine = Engine::default();
        let mut history = History::new();
        history.push(engine.execute(&model, &ParametersCollection::new()).unwrap());
        let latest = history.push(engine.execute(&model, &answers(single, Some(income))).unwrap());
        let once = history.display(0, latest).unwrap();
        let twice = history.display(0, latest).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.parameters.len(), 1);
    }

    #[test]
    fn upsert_keeps_names_unique(names in proptest::collection::vec("[a-c]{1,2}", 0..20)) {
        let mut params = ParametersCollection::new();
        for (i, name) in names.iter().enumerate() {
            params.upsert(Parameter::from_text(name.as_str(), &i.to_string()));
        }
        let mut seen = params.names();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), params.len());
        // Last write wins.
        for name in &names {
            let last = names.iter().rposition(|n| n == name).unwrap();
            prop_assert_eq!(params.get_parameter(name).unwrap().value_as_string(), last.to_string());
        }
    }

    #[test]
    fn answering_forward_grows_parameters(single in any::<bool>(), income in 0u32..100_000) {
        let model = model();
        let engine = Engine::default();
        let mut input = ParametersCollection::new();
        let mut previous = engine.execute(&model, &input).unwrap();
        for answer in answers(single, Some(income)).get_all() {
            input.upsert(answer.clone());
            let next = engine.execute(&model, &input).unwrap();
            prop_assert!(next.stacktrace.len() > previous.stacktrace.len());
            for name in previous.parameters.names() {
                prop_assert!(next.parameters.contains(name));
            }
            previous = next;
        }
        prop_assert!(previous.is_terminal());
    }
}
