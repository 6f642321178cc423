use eqprover::data::FreeVarMap;
use eqprover::{
    parse_statement, parse_statements, ArchiveError, Expression, KernelSettings, KnowledgeKernel,
    ModelContext, Statement, StatementArray,
};
use std::rc::Rc;

fn group_context() -> Rc<ModelContext> {
    let ctx = ModelContext::from_json_str(
        r#"{
            "name": "group theory",
            "definitions": [
                {"name": "e", "arity": 0},
                {"name": "i", "arity": 1},
                {"name": "*", "arity": 2}
            ],
            "axioms": [
                "*(*(x, y), z) = *(x, *(y, z))",
                "*(x, e) = x",
                "*(e, x) = x",
                "*(x, i(x)) = e",
                "*(i(x), x) = e"
            ]
        }"#,
    )
    .expect("group context");
    Rc::new(ctx)
}

fn stmt(ctx: &Rc<ModelContext>, text: &str) -> Statement {
    parse_statement(ctx, text).expect("statement should parse")
}

const SAMPLES: &[&str] = &[
    "*(x, y) = *(y, x)",
    "*(y, x) = *(x, y)",
    "*(a, b) = *(b, a)",
    "i(e) = e",
    "e = i(e)",
    "*(*(x, y), z) = *(x, *(y, z))",
    "*(x, *(y, z)) = *(*(x, y), z)",
    "x = i(i(x))",
    "*(x, x) = e",
];

#[test]
fn transpose_round_trips() {
    let ctx = group_context();
    for text in SAMPLES {
        let s = stmt(&ctx, text);
        assert!(s.transpose().transpose().identical(&s), "{}", text);
    }
}

#[test]
fn reflexive_statements_are_trivial() {
    let ctx = group_context();
    let ker = KnowledgeKernel::new(ctx.clone(), KernelSettings::default()).expect("kernel");
    for text in SAMPLES {
        let s = stmt(&ctx, text);
        for side in [s.lhs(), s.rhs()] {
            let refl = Statement::new(side.clone(), side.clone());
            assert!(refl.true_by_reflexivity());
            assert!(ker.is_trivial(&refl), "{} should be trivial", refl);
        }
    }
}

#[test]
fn equivalence_is_an_equivalence_relation() {
    let ctx = group_context();
    let stmts: Vec<Statement> = SAMPLES.iter().map(|t| stmt(&ctx, t)).collect();
    for a in &stmts {
        assert!(a.equivalent(a));
        for b in &stmts {
            assert_eq!(a.equivalent(b), b.equivalent(a), "{} / {}", a, b);
            for c in &stmts {
                if a.equivalent(b) && b.equivalent(c) {
                    assert!(a.equivalent(c), "{} / {} / {}", a, b, c);
                }
            }
        }
    }
    // Renaming and orientation do not matter, structure does.
    assert!(stmts[0].equivalent(&stmts[1]));
    assert!(stmts[0].equivalent(&stmts[2]));
    assert!(stmts[3].equivalent(&stmts[4]));
    assert!(stmts[5].equivalent(&stmts[6]));
    assert!(!stmts[7].equivalent(&stmts[8]));
}

#[test]
fn identical_requires_the_same_free_ids() {
    let ctx = group_context();
    let a = stmt(&ctx, "*(x, y) = e");
    let b = stmt(&ctx, "*(y, x) = e");
    assert!(a.identical(&b), "both number free variables by first occurrence");
    let c = a.replace_free_with_free(0, 5);
    assert!(!a.identical(&c));
    assert!(a.equivalent(&c));
}

#[test]
fn successful_match_reproduces_target() {
    let ctx = group_context();
    let pattern = stmt(&ctx, "*(x, i(y)) = e").lhs().clone();
    let target = stmt(&ctx, "*(i(e), i(*(e, z))) = e").lhs().clone();
    let mut subs = FreeVarMap::new();
    assert!(pattern.try_match(&target, &mut subs));
    assert!(pattern.map_free_vars(&subs).identical(&target));
}

#[test]
fn inconsistent_bindings_do_not_match() {
    let ctx = group_context();
    let pattern = stmt(&ctx, "*(x, x) = e").lhs().clone();
    let mut subs = FreeVarMap::new();
    assert!(!pattern.try_match(&stmt(&ctx, "*(e, i(e)) = e").lhs().clone(), &mut subs));
    assert!(subs.is_empty());
    assert!(pattern.try_match(&stmt(&ctx, "*(i(y), i(y)) = e").lhs().clone(), &mut subs));
}

#[test]
fn merge_preserves_structure() {
    let ctx = group_context();
    let a = stmt(&ctx, "*(x, e) = e").lhs().clone();
    let b = stmt(&ctx, "i(*(e, y)) = e").lhs().clone();
    let mut merged = a.tree().clone();
    let (id, ty) = merged.merge_from(b.tree());
    let view = Expression::from_tree(ctx.clone(), merged.clone());
    assert!(view.sub_expression(id, ty).identical(&b));
    assert!(view.identical(&a), "the original root is untouched");
    assert!(!merged.shares_storage_with(a.tree()), "merging copies on write");
}

#[test]
fn statement_archive_round_trip() {
    let ctx = group_context();
    let s = stmt(&ctx, "*(i(x), *(x, y)) = y");
    let mut bytes = Vec::new();
    s.save(&mut bytes).expect("save");
    let loaded = Statement::load_from_bin(ctx.clone(), bytes.as_slice()).expect("load");
    assert!(loaded.identical(&s));
}

#[test]
fn archive_checks_symbols_against_context() {
    let ctx = group_context();
    let s = stmt(&ctx, "*(i(x), x) = e");
    let mut bytes = Vec::new();
    s.save(&mut bytes).expect("save");

    let small = ModelContext::builder("tiny")
        .define("e", 0)
        .and_then(|b| b.build())
        .expect("tiny context");
    let result = Statement::load_from_bin(Rc::new(small), bytes.as_slice());
    assert!(matches!(result, Err(ArchiveError::UnknownSymbol(_))));
}

#[test]
fn theorem_batches_change_the_active_rules() {
    let ctx = group_context();
    let ker = KnowledgeKernel::new(ctx.clone(), KernelSettings::default()).expect("kernel");
    let target = stmt(&ctx, "i(e) = e");
    let before = ker.get_integrity_code();
    assert!(!ker.is_trivial(&target));

    let batch = parse_statements(&ctx, "e = i(e)").expect("theorem");
    let handle = ker.add_theorems(&batch);
    assert_eq!(ker.num_active_rules(), 6);
    assert!(ker.is_trivial(&target));
    assert_ne!(ker.get_integrity_code(), before);

    ker.remove_theorems(handle);
    assert_eq!(ker.num_active_rules(), 5);
    assert!(!ker.is_trivial(&target));
    assert_eq!(ker.get_integrity_code(), before);
}

#[test]
fn kernels_over_the_same_theory_agree() {
    let ctx = group_context();
    let a = KnowledgeKernel::new(ctx.clone(), KernelSettings::default()).expect("kernel");
    let b = KnowledgeKernel::new(ctx, KernelSettings { seed: 99, ..KernelSettings::default() })
        .expect("kernel");
    assert_eq!(a.get_integrity_code(), b.get_integrity_code());
}

#[test]
fn statement_arrays_slice_and_concat() {
    let ctx = group_context();
    let arr = parse_statements(&ctx, &SAMPLES.join("\n")).expect("samples");
    assert_eq!(arr.len(), SAMPLES.len());
    let evens = arr.slice(0, arr.len(), 2);
    assert_eq!(evens.len(), (SAMPLES.len() + 1) / 2);
    assert!(evens.at(1).identical(arr.at(2)));
    let joined = evens.concat(&arr.slice(1, 2, 1));
    assert_eq!(joined.len(), evens.len() + 1);
    assert_eq!(StatementArray::new().concat(&arr).to_str(), arr.to_str());
}

#[test]
fn kernel_validates_against_its_symbols() {
    let ctx = group_context();
    let ker = KnowledgeKernel::new(ctx.clone(), KernelSettings::default()).expect("kernel");
    assert!(ker.valid(&parse_statements(&ctx, "*(x, e) = i(x)").expect("stmts")));
    assert!(!ker.is_defined("f"));
    ker.define_symbol("f", 1);
    assert!(ker.is_defined("f"));
    assert_eq!(ker.symbol_arity("f"), Some(1));
}

#[test]
fn malformed_statements_report_positions() {
    let ctx = group_context();
    let err = parse_statements(&ctx, "e = e\n*(x) = e").expect_err("wrong arity");
    assert_eq!(err.line, 1);
    assert!(parse_statement(&ctx, "i(x, y) = e").is_err());
    assert!(parse_statement(&ctx, "x(y) = e").is_err(), "free variables take no arguments");
    assert!(parse_statement(&ctx, "*(x, y)").is_err(), "a statement needs an equality");
}
