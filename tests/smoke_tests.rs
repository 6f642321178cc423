//! Smoke tests for the prover core.
//!
//! These run the kernel and the search over group theory and check that
//! well known rewrites are found.

use eqprover::{
    parse_statement, parse_statements, IterativeDeepeningSolver, IteratorManager, KernelSettings,
    KnowledgeKernel, ModelContext, ProofCompletionState, SearchSettings, Statement,
};
use std::collections::BTreeSet;
use std::rc::Rc;

fn group_context() -> Rc<ModelContext> {
    let ctx = ModelContext::builder("group theory")
        .define("e", 0)
        .and_then(|b| b.define("i", 1))
        .and_then(|b| b.define("*", 2))
        .map(|b| {
            b.axiom("*(*(x, y), z) = *(x, *(y, z))")
                .axiom("*(x, e) = x")
                .axiom("*(e, x) = x")
                .axiom("*(x, i(x)) = e")
                .axiom("*(i(x), x) = e")
        })
        .and_then(|b| b.build())
        .expect("group context");
    Rc::new(ctx)
}

fn group_kernel(settings: KernelSettings) -> Rc<KnowledgeKernel> {
    Rc::new(KnowledgeKernel::new(group_context(), settings).expect("kernel"))
}

fn stmt(ker: &KnowledgeKernel, text: &str) -> Statement {
    parse_statement(&ker.context(), text).expect("statement should parse")
}

fn has_successor(ker: &Rc<KnowledgeKernel>, from: &str, to: &str) -> bool {
    let expected = stmt(ker, to);
    ker.begin_proof_of(&stmt(ker, from))
        .successors()
        .any(|succ| succ.forefront().equivalent(&expected))
}

#[test]
fn test_axiom_instances_are_proven() {
    let ker = group_kernel(KernelSettings::default());
    for text in [
        "*(*(x, y), z) = *(x, *(y, z))",
        "e = e",
        "x = x",
        "i(x) = i(x)",
        "e = *(i(y), y)",
        "*(x, y) = *(x, y)",
        "*(i(x), i(i(x))) = e",
        "*(e, e) = e",
    ] {
        let state = ker.begin_proof_of(&stmt(&ker, text));
        assert_eq!(state.completion_state(), ProofCompletionState::Proven, "{}", text);
    }
}

#[test]
fn test_open_targets_are_unfinished() {
    let ker = group_kernel(KernelSettings::default());
    for text in ["i(e) = e", "*(x, y) = *(y, x)"] {
        let state = ker.begin_proof_of(&stmt(&ker, text));
        assert_eq!(state.completion_state(), ProofCompletionState::Unfinished, "{}", text);
    }
}

#[test]
fn test_single_rewrites() {
    let ker = group_kernel(KernelSettings::default());
    let pairs = [
        ("x = i(x)", "x = *(e, i(x))"),
        ("x = *(x, i(x))", "x = e"),
        (
            "*(*(x, y), i(*(x, y))) = *(*(x, y), *(i(y), i(x)))",
            "*(*(x, y), i(*(x, y))) = *(x, *(y, *(i(y), i(x))))",
        ),
        (
            "*(*(x, y), i(*(x, y))) = *(x, i(x))",
            "*(*(x, y), i(*(x, y))) = *(x, *(e, i(x)))",
        ),
    ];
    for (from, to) in pairs {
        assert!(has_successor(&ker, from, to), "{} should rewrite to {}", from, to);
    }
}

#[test]
fn test_commutativity_is_not_one_rewrite_away() {
    let ker = group_kernel(KernelSettings::default());
    assert!(!has_successor(&ker, "*(x, y) = *(y, x)", "*(x, y) = *(x, y)"));
}

#[test]
fn test_inverse_of_product_chain() {
    let ker = group_kernel(KernelSettings::default());
    let lemma = parse_statements(&ker.context(), "e = *(*(x, y), i(*(x, y)))").expect("lemma");
    ker.add_theorems(&lemma);

    let rhs = [
        "*(i(y), i(x))",
        "*(*(i(y), i(x)), e)",
        "*(*(i(y), i(x)), *(*(x, y), i(*(x, y))))",
        "*(i(y), *(i(x), *(*(x, y), i(*(x, y)))))",
        "*(i(y), *(i(x), *(x, *(y, i(*(x, y))))))",
        "*(i(y), *(*(i(x), x), *(y, i(*(x, y)))))",
        "*(i(y), *(e, *(y, i(*(x, y)))))",
        "*(i(y), *(y, i(*(x, y))))",
        "*(*(i(y), y), i(*(x, y)))",
        "*(e, i(*(x, y)))",
        "i(*(x, y))",
    ];
    let chain: Vec<String> = rhs.iter().map(|r| format!("i(*(x, y)) = {}", r)).collect();
    for step in chain.windows(2) {
        assert!(
            has_successor(&ker, &step[0], &step[1]),
            "{} should rewrite to {}",
            step[0],
            step[1]
        );
    }
}

#[test]
fn test_one_step_proof_without_repeats() {
    let ker = group_kernel(KernelSettings {
        no_repeats: true,
        ..KernelSettings::default()
    });
    let root = ker.begin_proof_of(&stmt(&ker, "*(x, e) = *(e, x)"));
    let proof = root
        .successors()
        .take(3)
        .find(|succ| succ.completion_state() == ProofCompletionState::Proven)
        .expect("a proof among the first successors");
    assert_eq!(proof.depth(), 1);
    assert!(proof.target().identical(root.forefront()));

    let usage = proof.get_usage(&ker.axioms());
    assert_eq!(usage.len(), 5);
    assert!(usage.iter().sum::<usize>() >= 1);
}

#[test]
fn test_no_repeats_keeps_paths_fresh() {
    let ker = group_kernel(KernelSettings {
        no_repeats: true,
        ..KernelSettings::default()
    });
    let mut state = ker.begin_proof_of(&stmt(&ker, "i(e) = e"));
    for _ in 0..4 {
        state = state.successors().next().expect("successor");
    }
    let path = state.path();
    assert_eq!(path.len(), 5);
    for (idx, a) in path.iter().enumerate() {
        for b in &path[idx + 1..] {
            assert!(!a.equivalent(b), "{} repeats {}", b, a);
        }
    }
}

#[test]
fn test_randomised_order_is_seeded() {
    let target_text = "*(i(x), x) = i(e)";
    let plain = group_kernel(KernelSettings::default());
    let expected: BTreeSet<String> = plain
        .begin_proof_of(&stmt(&plain, target_text))
        .successors()
        .map(|succ| succ.forefront().to_str())
        .collect();

    let ker = group_kernel(KernelSettings {
        randomised: true,
        seed: 17,
        ..KernelSettings::default()
    });
    let target = stmt(&ker, target_text);
    let enumerate = || -> Vec<String> {
        ker.set_seed(17);
        ker.begin_proof_of(&target)
            .successors()
            .map(|succ| succ.forefront().to_str())
            .collect()
    };
    let first = enumerate();
    let second = enumerate();
    assert_eq!(first, second);
    assert_eq!(first.into_iter().collect::<BTreeSet<_>>(), expected);
}

#[test]
fn test_bounded_search_gives_up_on_commutativity() {
    let ker = group_kernel(KernelSettings::default());
    let mut solver = IterativeDeepeningSolver::new(IteratorManager::new(ker.clone()), 2, 1);
    solver.set_targets(&parse_statements(&ker.context(), "*(x, y) = *(y, x)").expect("target"));
    while solver.any_proof_not_done() {
        solver.step(10_000);
    }
    assert_eq!(solver.states(), vec![ProofCompletionState::NoProof]);
    assert_eq!(solver.max_mem(), vec![2]);
}

#[test]
fn test_settings_driven_search() {
    let settings = SearchSettings::from_json_str(
        r#"{
            "name": "smoke",
            "seed": 5,
            "max_steps": 50,
            "step_size": 1000,
            "solver": {"max_depth": 4, "starting_depth": 1},
            "heuristic": {"edit_distance": {"symbol_mismatch_cost": 1.0, "p": 2.0}},
            "stopping_strategy": {"fixed": {"n": 8}}
        }"#,
    )
    .expect("settings");
    let ker = group_kernel(settings.kernel_settings());
    let targets =
        parse_statements(&ker.context(), "*(x, e) = *(e, x)\ni(e) = e").expect("targets");

    let mut solver = settings.create_solver(ker);
    solver.set_targets(&targets);
    for _ in 0..settings.max_steps {
        if !solver.any_proof_not_done() {
            break;
        }
        solver.step(settings.step_size);
    }

    assert_eq!(
        solver.states(),
        vec![ProofCompletionState::Proven, ProofCompletionState::Proven]
    );
    for (proof, target) in solver.proofs().iter().zip(targets.iter()) {
        let proof = proof.as_ref().expect("proof");
        assert!(proof.target().identical(target));
        assert_eq!(proof.completion_state(), ProofCompletionState::Proven);
    }
}
