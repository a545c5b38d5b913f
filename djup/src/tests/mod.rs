/*!

End-to-end tests that drive the engine through the parser: the pattern-matching scenarios, the
counting properties of variadic splits, round-trip soundness, and canonicalization.

*/

use std::sync::Arc;

use djup_abs::IString;
use djup_lib::{always_equal, Expr, MatchResult, Namespace, Pattern};

use crate::parser::parse_expression;

fn parse(source: &str, namespace: &Arc<Namespace>) -> Expr {
  parse_expression(source, namespace)
      .unwrap_or_else(|error| panic!("parse error in {:?}: {}", source, error))
}

fn binding(result: &MatchResult, name: &str) -> String {
  result
      .binding(&IString::from(name))
      .unwrap_or_else(|| panic!("no binding for {}", name))
      .to_string()
}

/// Matches `pattern_source` against `target_source`, checks the solution count, and checks that
/// reapplying every solution's substitutions to the pattern reproduces the target.
fn pattern_test(pattern_source: &str, target_source: &str, expected_solutions: usize) -> Vec<MatchResult> {
  let namespace = Namespace::standard();
  let pattern = Pattern::new(&namespace, parse(pattern_source, &namespace), None)
      .unwrap_or_else(|error| panic!("bad pattern {:?}: {}", pattern_source, error));
  let target = parse(target_source, &namespace);

  let solutions = pattern.match_all(&target, None);
  assert_eq!(
    solutions.len(),
    expected_solutions,
    "solution count for {} vs {}",
    pattern_source,
    target_source
  );

  for solution in &solutions {
    let after = pattern.apply(solution).unwrap();
    assert!(
      always_equal(&after, &target),
      "round trip failed for {} vs {}: got {}",
      pattern_source,
      target_source,
      after
    );
  }

  solutions
}

// region Core scenarios

#[test]
fn scenario_plain_identifiers() {
  let solutions = pattern_test("g(1, 2, 3, any a, any b, any c)", "g(1, 2, 3, 4, 5, 6)", 1);
  assert_eq!(binding(&solutions[0], "a"), "4");
  assert_eq!(binding(&solutions[0], "b"), "5");
  assert_eq!(binding(&solutions[0], "c"), "6");
}

#[test]
fn scenario_empty_variadic() {
  let solutions = pattern_test("f(real x...)", "f()", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple()");
}

#[test]
fn scenario_two_variadics_split_seven_ways() {
  pattern_test("f(real x..., real y...)", "f(1, 2, 3, 4, 5, 6)", 7);
}

#[test]
fn scenario_associative_function() {
  // MatMul is associative: x and y absorb one or more factors each.
  pattern_test("MatMul(1, 2, real x, real y, 7)", "MatMul(1, 2, 3, 4, 5, 6, 7)", 3);
}

#[test]
fn scenario_repeated_sub_pattern() {
  let solutions = pattern_test("f(Sin(real x)...)", "f(Sin(1), Sin(2), Sin(3), Sin(4))", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple(1, 2, 3, 4)");
}

#[test]
fn scenario_nested_variadic() {
  let solutions = pattern_test("g(f(1, real x...)...)", "g(f(1, 2, 3, 4), f(1, 7, 8, 9))", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple(Tuple(2, 3, 4), Tuple(7, 8, 9))");
}

// endregion Core scenarios

// region Further matching scenarios

#[test]
fn contradictory_bindings_yield_nothing() {
  // `a` cannot be both 4 and 6.
  pattern_test("g(1, 2, 3, any a, any b, any a)", "g(1, 2, 3, 4, 5, 6)", 0);
  // But a consistent double binding works.
  pattern_test("g(1, 2, 3, any a, any b, any a)", "g(1, 2, 3, 4, 5, 4)", 1);
}

#[test]
fn nested_calls() {
  let solutions = pattern_test("g(1, 2, 3, f(real a, h(real b)), real c)", "g(1, 2, 3, f(4, h(5)), 6)", 1);
  assert_eq!(binding(&solutions[0], "a"), "4");
  assert_eq!(binding(&solutions[0], "b"), "5");
  assert_eq!(binding(&solutions[0], "c"), "6");
}

#[test]
fn variadic_after_literal() {
  let solutions = pattern_test("f(1, real x...)", "f(1, 2, 5, 6, 7, 8, 9)", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple(2, 5, 6, 7, 8, 9)");
}

#[test]
fn literals_pin_the_split() {
  pattern_test("Sin(1, real x..., 4, 5)", "Sin(1, 2, 3, 4, 5)", 1);
  pattern_test(
    "f(1, 2, real x..., 6, 7, 8, real y..., 12, 13, 14, 15)",
    "f(1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15)",
    1,
  );
}

#[test]
fn mismatching_literal_after_variadic() {
  pattern_test("f(1, real x..., 5)", "f(1, 2, 3, 4)", 0);
}

#[test]
fn three_way_split() {
  // Compositions of 3 into 3 ordered nonnegative parts: C(5, 2) = 10.
  pattern_test("f(Sin(real x..., real y..., real z...))", "f(Sin(1, 2, 3))", 10);
}

#[test]
fn independent_splits_multiply() {
  // 4 splits of (1, 2, 3) times 5 splits of (5, 6, 7, 8).
  pattern_test(
    "f(Cos(2, 4), Sin(real x..., real y...), Sin(real z..., real w...))",
    "f(Cos(2, 4), Sin(1, 2, 3), Sin(5, 6, 7, 8))",
    20,
  );
}

#[test]
fn variadic_splits_across_repetition_instances() {
  // Inner splits multiply across the two f instances: 5 * 7.
  pattern_test(
    "g(f(1, real x..., real y...)...)",
    "g(f(1, 2, 3, 4, 5), f(1, 2, 5, 6, 7, 8, 9))",
    35,
  );
}

#[test]
fn tuple_repetition_matches_pairs() {
  let solutions = pattern_test(
    "If((bool c, real v)..., real default)",
    "If(true, 1, true, 1, false, 2, 5)",
    1,
  );
  assert_eq!(binding(&solutions[0], "c"), "Tuple(true, true, false)");
  assert_eq!(binding(&solutions[0], "v"), "Tuple(1, 1, 2)");
  assert_eq!(binding(&solutions[0], "default"), "5");
}

#[test]
fn partial_pairs_cannot_match() {
  pattern_test("If((bool c, real v)..., real default)", "If(true, 1, 5)", 1);
  // An even target count leaves no slot for the default.
  pattern_test("If((bool c, real v)..., real default)", "If(true, 1, false, 5)", 0);
  // The default slot gets a bool, which is not a real.
  pattern_test("If((bool c, real v)..., real default)", "If(true, 1, false)", 0);
}

#[test]
fn associative_identifiers_absorb_spans() {
  let solutions = pattern_test("MatMul(1, real x, 3, 4, real y, 6, 7)", "MatMul(1, 2, 77, 3, 4, 5, 6, 7)", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple(2, 77)");
  assert_eq!(binding(&solutions[0], "y"), "Tuple(5)");

  pattern_test("MatMul(1, real x, 3, 4, real y, 6, 7)", "MatMul(1, 2, 3, 4, 5, 6, 7)", 1);
}

#[test]
fn bare_patterns() {
  let solutions = pattern_test("real y", "3", 1);
  assert_eq!(binding(&solutions[0], "y"), "3");

  pattern_test("2", "2", 1);
  pattern_test("2", "3", 0);
  pattern_test("f(1, 2, 3)", "f(1, 2, 3)", 1);
}

#[test]
fn type_filtering() {
  // A bool identifier accepts bool literals only.
  pattern_test("f(bool b)", "f(true)", 1);
  pattern_test("f(bool b)", "f(3)", 0);
  // int belongs to real, bool does not.
  pattern_test("f(real x)", "f(3)", 1);
  pattern_test("f(real x)", "f(true)", 0);
}

#[test]
fn optional_argument() {
  let solutions = pattern_test("f(1, real x?, 2)", "f(1, 9, 2)", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple(9)");

  let solutions = pattern_test("f(1, real x?, 2)", "f(1, 2)", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple()");

  pattern_test("f(1, real x?, 2)", "f(1, 9, 9, 2)", 0);
}

#[test]
fn one_to_many_needs_at_least_one() {
  pattern_test("f(real x..)", "f()", 0);
  pattern_test("f(real x..)", "f(1)", 1);
  pattern_test("f(real x..)", "f(1, 2)", 1);
}

#[test]
fn three_levels_of_nesting() {
  // Tuple nesting depth equals the open-scope count.
  let solutions = pattern_test(
    "g(h(f(real x...)...)...)",
    "g(h(f(1, 2), f(3)), h(f(4)))",
    1,
  );
  assert_eq!(
    binding(&solutions[0], "x"),
    "Tuple(Tuple(Tuple(1, 2), Tuple(3)), Tuple(Tuple(4)))"
  );

  let solutions = pattern_test("g(h(f(real x...)...)...)", "g()", 1);
  assert_eq!(binding(&solutions[0], "x"), "Tuple()");
}

#[test]
fn many_patterns_in_one_tree() {
  use djup_lib::{DiscriminationTree, SubstitutionGraph};

  let namespace = Namespace::standard();
  let patterns = [
    "g(1, 2, 3, any a, any b, any c)",
    "g(3, z(real r)..., p(real), 6)",
    "Func(1, 2, 3)",
    "f(1, 2, real x..., 6, 7, 8, real y..., 12, 13, 14, 15)",
  ];

  let mut tree = DiscriminationTree::new();
  for (index, source) in patterns.iter().enumerate() {
    tree.add_pattern(index as u32, &parse(source, &namespace), None).unwrap();
  }

  let target = parse("g(1, 2, 3, 4, 5, 6)", &namespace);
  let mut graph = SubstitutionGraph::new(&tree);
  graph.find_matches(&namespace, &target, None);

  let solutions = graph.solutions();
  assert_eq!(solutions.len(), 1);
  assert_eq!(solutions[0].pattern_id, 0);

  let target = parse("Func(1, 2, 3)", &namespace);
  graph.find_matches(&namespace, &target, None);
  assert_eq!(graph.solutions().len(), 1);
  assert_eq!(graph.solutions()[0].pattern_id, 2);
}

#[test]
fn shared_repetition_prefixes_discriminate() {
  use djup_lib::{DiscriminationTree, SubstitutionGraph};

  let namespace = Namespace::standard();
  let mut tree = DiscriminationTree::new();
  tree
      .add_pattern(0, &parse("f(1, 2, Sin(real x)..., 3, Sin(real y)...)", &namespace), None)
      .unwrap();
  tree
      .add_pattern(1, &parse("f(1, 2, Cos(real x)..., 3, Cos(real y)...)", &namespace), None)
      .unwrap();

  let target = parse("f(1, 2, Sin(10), Sin(11), 3, Sin(12))", &namespace);
  let mut graph = SubstitutionGraph::new(&tree);
  graph.find_matches(&namespace, &target, None);

  let solutions = graph.solutions();
  assert_eq!(solutions.len(), 1);
  assert_eq!(solutions[0].pattern_id, 0);

  let x = solutions[0]
      .substitutions
      .iter()
      .find(|s| s.identifier_name.as_ref() == "x")
      .unwrap();
  assert_eq!(x.value.to_string(), "Tuple(10, 11)");

  let target = parse("f(1, 2, Cos(10), 3, Cos(11))", &namespace);
  graph.find_matches(&namespace, &target, None);
  assert_eq!(graph.solutions().len(), 1);
  assert_eq!(graph.solutions()[0].pattern_id, 1);
}

#[test]
fn artifact_directory_receives_graphs() {
  let directory = std::env::temp_dir().join("djup_match_artifacts_test");
  let _ = std::fs::remove_dir_all(&directory);

  let namespace = Namespace::standard();
  let pattern = Pattern::new(&namespace, parse("f(real x...)", &namespace), None).unwrap();
  let target = parse("f(1, 2)", &namespace);

  let solutions = pattern.match_all(&target, Some(&directory));
  assert_eq!(solutions.len(), 1);
  assert!(directory.join("discrimination_tree.dot").exists());
  assert!(directory.join("step_1.dot").exists());

  let _ = std::fs::remove_dir_all(&directory);
}

// endregion Further matching scenarios

// region Counting and soundness properties

#[test]
fn cardinality_coverage() {
  // f(x..., y...) against f(t1..tn) has exactly n+1 solutions, one per split point.
  for n in 0..7 {
    let arguments = (1..=n).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let target = format!("f({})", arguments);
    pattern_test("f(real x..., real y...)", &target, n + 1);
  }
}

#[test]
fn randomized_round_trip() {
  use rand::Rng;
  let mut rng = rand::thread_rng();

  for _ in 0..32 {
    let count = rng.gen_range(0..7usize);
    let arguments = (0..count)
        .map(|_| rng.gen_range(0i64..100).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let target = format!("f({})", arguments);

    // Counting: one solution per split point; soundness is checked by the harness round trip.
    pattern_test("f(real x..., real y...)", &target, count + 1);
    pattern_test("f(real x...)", &target, 1);
  }
}

#[test]
fn match_one_returns_the_first_solution() {
  let namespace = Namespace::standard();
  let pattern = Pattern::new(&namespace, parse("f(real x..., real y...)", &namespace), None).unwrap();
  let target = parse("f(1, 2)", &namespace);

  let first = pattern.match_one(&target, None).unwrap();
  let all = pattern.match_all(&target, None);
  assert_eq!(all.len(), 3);
  assert_eq!(binding(&first, "x"), binding(&all[0], "x"));
  assert_eq!(binding(&first, "y"), binding(&all[0], "y"));
}

// endregion Counting and soundness properties

// region Canonicalization through the parser

#[test]
fn canonicalize_with_parsed_axioms() {
  let mut namespace = Namespace::new(IString::from("user"), Some(Namespace::root()));
  let shared = Namespace::standard();

  let lhs = parse("Double(real x)", &shared);
  let rhs = parse("Mul(2, x)", &shared);
  namespace.add_substitution_axiom(&lhs, &rhs, None).unwrap();

  let namespace = Arc::new(namespace);
  let canonical = namespace.canonicalize(&parse("Double(5)", &namespace)).unwrap();
  assert!(always_equal(&canonical, &parse("Mul(2, 5)", &namespace)));

  // Idempotence.
  let again = namespace.canonicalize(&canonical).unwrap();
  assert!(always_equal(&again, &canonical));
}

#[test]
fn variadic_axiom_flattens_into_rhs() {
  let mut namespace = Namespace::new(IString::from("user"), Some(Namespace::root()));
  let shared = Namespace::standard();

  // f(x...) -> g(x..., 7)
  let lhs = parse("f(real x...)", &shared);
  let rhs = parse("g(x..., 7)", &shared);
  namespace.add_substitution_axiom(&lhs, &rhs, None).unwrap();

  let namespace = Arc::new(namespace);
  let canonical = namespace.canonicalize(&parse("f(1, 2, 3)", &namespace)).unwrap();
  assert!(always_equal(&canonical, &parse("g(1, 2, 3, 7)", &namespace)));
}

#[test]
fn axioms_chain_to_a_fixpoint() {
  let mut namespace = Namespace::new(IString::from("user"), Some(Namespace::root()));
  let shared = Namespace::standard();

  // Triple(x) -> Double(x) + x, Double(x) -> x + x
  namespace
      .add_substitution_axiom(&parse("Triple(real x)", &shared), &parse("Add(Double(x), x)", &shared), None)
      .unwrap();
  namespace
      .add_substitution_axiom(&parse("Double(real x)", &shared), &parse("Add(x, x)", &shared), None)
      .unwrap();

  let namespace = Arc::new(namespace);
  let canonical = namespace.canonicalize(&parse("Triple(3)", &namespace)).unwrap();
  assert!(always_equal(&canonical, &parse("Add(Add(3, 3), 3)", &namespace)));
}

// endregion Canonicalization through the parser
