//! Proptest strategies for actions and action sequences.
//!
//! Generation is a pure function of the `TestRng` seed, so any failing
//! sequence can be regenerated for replay, and proptest's built-in
//! shrinkers minimize failing sequences toward shorter, simpler ones.

use proptest::prelude::*;

use crate::harness::action::Action;

/// Departments used to form employee numbers.
pub const DEPARTMENTS: [&str; 5] = ["Frontend", "Backend", "HR", "Creative", "DevOps"];

/// Department query values in assorted letter casings, exercising the
/// case-insensitive prefix contract.
pub const DEPARTMENT_CASINGS: [&str; 15] = [
    "frontend", "backend", "hr", "creative", "devops", "FRONTEND", "BACKEND", "HR", "CREATIVE",
    "DEVOPS", "fROntEND", "backEND", "Hr", "crEATive", "devOPS",
];

/// Employee numbers of the form `<Department>-<Id>` with Id in `[1, 200]`.
///
/// The narrow id range deliberately creates a high collision rate so both
/// branches of create (fresh vs. duplicate) and update (present vs.
/// absent) are exercised often within one sequence.
pub fn employee_no() -> impl Strategy<Value = String> {
    (prop::sample::select(&DEPARTMENTS[..]), 1u32..=200)
        .prop_map(|(department, id)| format!("{department}-{id}"))
}

/// Alphabetic names, minimum length 1.
pub fn alpha_name() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,12}"
}

/// Department query strings: a valid department in some casing, or
/// arbitrary printable garbage (minimum length 1) that must produce an
/// empty result rather than an error.
pub fn department() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(&DEPARTMENT_CASINGS[..]).prop_map(str::to_string),
        "[ -~]{1,8}",
    ]
}

/// One action, drawn uniformly across the five constructors.
pub fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        employee_no().prop_map(|employee_no| Action::GetOne { employee_no }),
        Just(Action::GetAll),
        department().prop_map(|department| Action::GetByDepartment { department }),
        (employee_no(), alpha_name())
            .prop_map(|(employee_no, name)| Action::Create { employee_no, name }),
        (employee_no(), alpha_name())
            .prop_map(|(employee_no, new_name)| Action::Update {
                employee_no,
                new_name
            }),
    ]
}

/// A randomly sized, randomly ordered action sequence — the unit of one
/// trial.
pub fn action_sequence(max_actions: usize) -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec(action(), 1..=max_actions.max(1))
}

#[cfg(test)]
mod tests {
    use proptest::strategy::ValueTree;
    use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

    use super::*;

    fn runner_with_seed(seed: &[u8; 32]) -> TestRunner {
        TestRunner::new_with_rng(
            Config::default(),
            TestRng::from_seed(RngAlgorithm::ChaCha, seed),
        )
    }

    fn sample<S: Strategy>(runner: &mut TestRunner, strategy: &S) -> S::Value {
        strategy
            .new_tree(runner)
            .expect("strategy must produce a value")
            .current()
    }

    #[test]
    fn employee_numbers_have_department_dash_id_shape() {
        let mut runner = TestRunner::default();
        for _ in 0..256 {
            let no = sample(&mut runner, &employee_no());
            let (department, id) = no.split_once('-').expect("must contain a dash");
            assert!(
                DEPARTMENTS.contains(&department),
                "unknown department in {no}"
            );
            let id: u32 = id.parse().expect("id must be numeric");
            assert!((1..=200).contains(&id), "id out of range in {no}");
        }
    }

    #[test]
    fn names_are_alphabetic_and_non_empty() {
        let mut runner = TestRunner::default();
        for _ in 0..256 {
            let name = sample(&mut runner, &alpha_name());
            assert!(!name.is_empty());
            assert!(name.chars().all(|c| c.is_ascii_alphabetic()), "name: {name}");
        }
    }

    #[test]
    fn departments_are_non_empty_and_include_garbage() {
        let mut runner = TestRunner::default();
        let mut saw_invalid = false;
        for _ in 0..512 {
            let dept = sample(&mut runner, &department());
            assert!(!dept.is_empty());
            if !DEPARTMENT_CASINGS.contains(&dept.as_str()) {
                saw_invalid = true;
            }
        }
        assert!(saw_invalid, "garbage departments must appear in the mix");
    }

    #[test]
    fn sequences_respect_the_length_bound() {
        let mut runner = TestRunner::default();
        for _ in 0..64 {
            let sequence = sample(&mut runner, &action_sequence(17));
            assert!((1..=17).contains(&sequence.len()));
        }
    }

    #[test]
    fn all_five_variants_are_generated() {
        let mut runner = TestRunner::default();
        let mut seen = [false; 5];
        for _ in 0..512 {
            match sample(&mut runner, &action()) {
                Action::GetOne { .. } => seen[0] = true,
                Action::GetAll => seen[1] = true,
                Action::GetByDepartment { .. } => seen[2] = true,
                Action::Create { .. } => seen[3] = true,
                Action::Update { .. } => seen[4] = true,
            }
        }
        assert_eq!(seen, [true; 5], "every variant must be reachable");
    }

    #[test]
    fn generation_is_reproducible_from_the_seed() {
        let seed = [7u8; 32];
        let first: Vec<Action> = {
            let mut runner = runner_with_seed(&seed);
            (0..16)
                .map(|_| sample(&mut runner, &action()))
                .collect()
        };
        let second: Vec<Action> = {
            let mut runner = runner_with_seed(&seed);
            (0..16)
                .map(|_| sample(&mut runner, &action()))
                .collect()
        };
        assert_eq!(first, second, "same seed must reproduce the same actions");
    }
}
