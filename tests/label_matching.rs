// tests/label_matching.rs

use proptest::prelude::*;

use ci_auto::job::{label_for, match_label};
use ci_auto::types::{ActionKind, Compiler};

const APPROVED: [ActionKind; 3] = [ActionKind::Build, ActionKind::EndToEnd, ActionKind::Regression];

fn compiler() -> impl Strategy<Value = Compiler> {
    prop_oneof![Just(Compiler::Intel), Just(Compiler::Gnu)]
}

fn action() -> impl Strategy<Value = ActionKind> {
    prop_oneof![
        Just(ActionKind::Build),
        Just(ActionKind::EndToEnd),
        Just(ActionKind::Regression)
    ]
}

proptest! {
    #[test]
    fn generated_labels_match_their_own_machine(
        machine in "[a-z][a-z0-9]{1,8}",
        compiler in compiler(),
        action in action(),
    ) {
        let label = label_for(&machine, compiler, action);
        let m = match_label(&label, &machine, &APPROVED).expect("own label must match");
        prop_assert_eq!(m.compiler, compiler);
        prop_assert_eq!(m.action, action);
    }

    #[test]
    fn wrong_arity_never_matches(parts in proptest::collection::vec("[a-z]{1,6}", 0..8)) {
        prop_assume!(parts.len() != 3);
        let label = std::iter::once("ci".to_string()).chain(parts).collect::<Vec<_>>().join("-");
        prop_assert!(match_label(&label, "hera", &APPROVED).is_none());
    }

    #[test]
    fn unknown_compilers_never_match(compiler in "[a-zA-Z]{1,8}") {
        prop_assume!(compiler != "intel" && compiler != "gnu");
        let label = format!("ci-hera-{compiler}-build");
        prop_assert!(match_label(&label, "hera", &APPROVED).is_none());
    }

    #[test]
    fn arbitrary_text_never_panics(label in ".{0,40}", machine in "[a-z]{0,8}") {
        let _ = match_label(&label, &machine, &APPROVED);
    }
}
