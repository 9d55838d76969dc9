use super::*;
use ruff_python_parser::parse_module;

fn first_stmt(source: &str) -> ruff_python_ast::ModModule {
    parse_module(source).expect("fixture parses").into_syntax()
}

fn dump_of(source: &str) -> String {
    let module = first_stmt(source);
    dump_stmt(&module.body[0], &NormalizeConfig::default())
}

fn dump_raw_of(source: &str) -> String {
    let module = first_stmt(source);
    dump_stmt(&module.body[0], &NormalizeConfig::raw())
}

#[test]
fn test_names_and_constants_erased() {
    assert_eq!(dump_of("x = 1"), dump_of("y = 2"));
    assert_eq!(dump_of("count = 'a'"), dump_of("total = b'bytes'"));
}

#[test]
fn test_attribute_names_erased() {
    assert_eq!(dump_of("self.first = x"), dump_of("self.second = y"));
}

#[test]
fn test_raw_dump_preserves_identifiers() {
    let dump = dump_raw_of("total = price");
    assert!(dump.contains("Name(id='total')"), "{dump}");
    assert!(dump.contains("Name(id='price')"), "{dump}");
}

#[test]
fn test_call_targets_are_preserved() {
    let load = dump_of("load_user(x)");
    let delete = dump_of("delete_user(x)");
    assert_ne!(load, delete);
    assert!(load.contains("_CALL_load_user_"), "{load}");
}

#[test]
fn test_dotted_call_target_tail_preserved() {
    let dump = dump_of("repo.load_user(x)");
    assert!(dump.contains("attr='_CALL_load_user_'"), "{dump}");
    assert!(dump.contains("Name(id='_VAR_')"), "{dump}");
}

#[test]
fn test_computed_call_target_not_preserved() {
    // The callee is a call result, not a dotted name: normal erasure.
    let dump = dump_of("factory().run(x)");
    assert!(!dump.contains("_CALL_run_"), "{dump}");
}

#[test]
fn test_call_arguments_still_erased() {
    assert_eq!(dump_of("load_user(a, b)"), dump_of("load_user(x, y)"));
}

#[test]
fn test_docstring_removed_from_function_body() {
    let with_doc = dump_of("def f():\n    \"doc\"\n    return 1\n");
    let without_doc = dump_of("def f():\n    return 1\n");
    assert_eq!(with_doc, without_doc);
}

#[test]
fn test_annotations_removed() {
    let annotated = dump_of("def f(x: int) -> str:\n    y: int = x\n    return y\n");
    let bare = dump_of("def f(x):\n    y = x\n    return y\n");
    assert_eq!(annotated, bare);
}

#[test]
fn test_aug_assign_expands_to_assign() {
    assert_eq!(dump_of("x += 1"), dump_of("x = x + 1"));
    assert_eq!(dump_of("x -= y"), dump_of("x = x - y"));
}

#[test]
fn test_commutative_operands_sorted_when_side_effect_free() {
    let raw = NormalizeConfig {
        normalize_names: false,
        normalize_attributes: false,
        normalize_constants: false,
        ..NormalizeConfig::default()
    };
    let module_a = first_stmt("r = a + obj.field\n");
    let module_b = first_stmt("r = obj.field + a\n");
    assert_eq!(
        dump_stmt(&module_a.body[0], &raw),
        dump_stmt(&module_b.body[0], &raw)
    );
}

#[test]
fn test_calls_inhibit_commutative_reordering() {
    let raw = NormalizeConfig {
        normalize_names: false,
        normalize_attributes: false,
        normalize_constants: false,
        ..NormalizeConfig::default()
    };
    let module_a = first_stmt("r = f() + g()\n");
    let module_b = first_stmt("r = g() + f()\n");
    assert_ne!(
        dump_stmt(&module_a.body[0], &raw),
        dump_stmt(&module_b.body[0], &raw)
    );
}

#[test]
fn test_non_commutative_operator_keeps_order() {
    let raw = NormalizeConfig {
        normalize_names: false,
        normalize_attributes: false,
        normalize_constants: false,
        ..NormalizeConfig::default()
    };
    let module_a = first_stmt("r = b - a\n");
    let module_b = first_stmt("r = a - b\n");
    assert_ne!(
        dump_stmt(&module_a.body[0], &raw),
        dump_stmt(&module_b.body[0], &raw)
    );
}

#[test]
fn test_not_in_equivalence() {
    assert_eq!(dump_of("r = not (x in y)"), dump_of("r = x not in y"));
    assert_eq!(dump_of("r = not (x is y)"), dump_of("r = x is not y"));
}

#[test]
fn test_no_de_morgan() {
    assert_ne!(
        dump_of("r = not (a and b)"),
        dump_of("r = (not a) or (not b)")
    );
}

#[test]
fn test_not_of_other_comparison_unchanged() {
    let dump = dump_of("r = not (x < y)");
    assert!(dump.contains("UnaryOp(op=Not()"), "{dump}");
}

#[test]
fn test_meta_prefix_cannot_collide_with_identifiers() {
    // Parsed identifiers can never contain ':', so only the CFG builder can
    // emit names under this prefix.
    assert!(CFG_META_PREFIX.contains(':'));
    // A user identifier that merely resembles the prefix is still erased.
    let dump = dump_of("__CC_META__x = 1");
    assert!(dump.contains("_VAR_"), "{dump}");
}

#[test]
fn test_stmt_hash_stable_across_rename() {
    let module_a = first_stmt("total = price * quantity\n");
    let module_b = first_stmt("subtotal = cost * count\n");
    let config = NormalizeConfig::default();
    assert_eq!(
        stmt_hash(&module_a.body[0], &config),
        stmt_hash(&module_b.body[0], &config)
    );
}

#[test]
fn test_skip_docstring_only_strips_leading_string() {
    let module = first_stmt("\"mod doc\"\nx = 1\n");
    let config = NormalizeConfig::default();
    let body = skip_docstring(&module.body, &config);
    assert_eq!(body.len(), 1);

    let module = first_stmt("x = 1\n\"not a docstring\"\n");
    let body = skip_docstring(&module.body, &config);
    assert_eq!(body.len(), 2);
}

#[test]
fn test_match_statement_dump_includes_patterns() {
    let dump = dump_of(
        "match cmd:\n    case 'start':\n        run()\n    case _:\n        stop()\n",
    );
    assert!(dump.contains("MatchValue"), "{dump}");
    assert!(dump.contains("MatchAs"), "{dump}");
}

#[test]
fn test_fstring_interpolation_keeps_structure() {
    let plain = dump_of("msg = f'hello'\n");
    let interpolated = dump_of("msg = f'hello {name}'\n");
    assert_ne!(plain, interpolated);
}
