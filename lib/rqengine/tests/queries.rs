//! End-to-end query evaluation tests.

use rqengine::{QueryEvaluator, QueryLimits, QueryResults, ServiceSolutions};
use rqrdf::{Dataset, NQuadsParser, Term, Variable};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn dataset(document: &str) -> Dataset {
    NQuadsParser::new()
        .parse_str(document)
        .unwrap()
        .into_iter()
        .collect()
}

/// Runs a SELECT query and renders every solution as `(variable, term)`
/// pairs in projection order, unbound variables skipped.
fn select(document: &str, query: &str) -> Vec<Vec<(String, String)>> {
    let evaluator = QueryEvaluator::new();
    let prepared = evaluator.prepare(query, None).unwrap();
    let QueryResults::Solutions(solutions) =
        evaluator.execute(dataset(document), &prepared.query).unwrap()
    else {
        panic!("SELECT results expected");
    };
    solutions
        .map(|solution| {
            solution
                .unwrap()
                .iter()
                .map(|(variable, value)| (variable.as_str().to_owned(), value.to_string()))
                .collect()
        })
        .collect()
}

fn ask(document: &str, query: &str) -> bool {
    let evaluator = QueryEvaluator::new();
    let prepared = evaluator.prepare(query, None).unwrap();
    match evaluator.execute(dataset(document), &prepared.query) {
        Ok(QueryResults::Boolean(value)) => value,
        _ => panic!("ASK result expected"),
    }
}

const EXAMPLE_DATA: &str = r#"<http://example.com/a> <http://example.com/p> "1"^^<http://www.w3.org/2001/XMLSchema#integer> .
"#;

#[test]
fn bind_over_used_variable_fails_preparation() {
    let error = QueryEvaluator::new()
        .prepare(
            "SELECT ?x WHERE { ?s ?p ?o . BIND(?o AS ?x) . BIND(1 AS ?x) }",
            None,
        )
        .unwrap_err();
    assert!(error.to_string().contains("?x"));
}

#[test]
fn optional_with_unbound_side() {
    let results = select(
        EXAMPLE_DATA,
        "SELECT ?s ?v WHERE { ?s <http://example.com/p> 1 . OPTIONAL { ?s <http://example.com/q> ?v } }",
    );
    assert_eq!(
        results,
        [vec![("s".to_owned(), "<http://example.com/a>".to_owned())]]
    );

    // BOUND is defined on the unbound variable and is false there.
    assert!(select(
        EXAMPLE_DATA,
        "SELECT ?s WHERE { ?s <http://example.com/p> 1 . OPTIONAL { ?s <http://example.com/q> ?v } FILTER(BOUND(?v)) }",
    )
    .is_empty());
    assert_eq!(
        select(
            EXAMPLE_DATA,
            "SELECT ?s WHERE { ?s <http://example.com/p> 1 . OPTIONAL { ?s <http://example.com/q> ?v } FILTER(!BOUND(?v)) }",
        )
        .len(),
        1
    );

    // Arithmetic over the unbound variable is a type error dropping the row.
    assert!(select(
        EXAMPLE_DATA,
        "SELECT ?s WHERE { ?s <http://example.com/p> 1 . OPTIONAL { ?s <http://example.com/q> ?v } FILTER(?v + 1 > 0) }",
    )
    .is_empty());
}

#[test]
fn union_widens_columns() {
    let data = r#"<http://example.com/a> <http://example.com/p> "x" .
<http://example.com/b> <http://example.com/q> "y" .
"#;
    let results = select(
        data,
        "SELECT * WHERE { { ?s <http://example.com/p> ?o } UNION { ?s <http://example.com/q> ?o2 } }",
    );
    assert_eq!(
        results,
        [
            vec![
                ("s".to_owned(), "<http://example.com/a>".to_owned()),
                ("o".to_owned(), "\"x\"".to_owned()),
            ],
            vec![
                ("s".to_owned(), "<http://example.com/b>".to_owned()),
                ("o2".to_owned(), "\"y\"".to_owned()),
            ],
        ]
    );
}

#[test]
fn order_by_directions_and_stability() {
    let results = select(
        "",
        r#"SELECT ?a ?b WHERE { VALUES (?a ?b) { (2 "m") (1 "n") (2 "k") } } ORDER BY ?a DESC(?b)"#,
    );
    let keys: Vec<(String, String)> = results
        .into_iter()
        .map(|row| (row[0].1.clone(), row[1].1.clone()))
        .collect();
    assert_eq!(
        keys,
        [
            ("\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned(), "\"m\"".to_owned()),
            ("\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned(), "\"k\"".to_owned()),
            ("\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned(), "\"n\"".to_owned()),
        ]
    );
}

#[test]
fn order_by_is_stable_on_equal_keys() {
    let results = select(
        "",
        r#"SELECT ?b WHERE { VALUES (?a ?b) { (1 "first") (1 "second") (1 "third") } } ORDER BY ?a"#,
    );
    assert_eq!(
        results.iter().map(|row| row[0].1.as_str()).collect::<Vec<_>>(),
        ["\"first\"", "\"second\"", "\"third\""]
    );
}

const GROUP_DATA: &str = r#"<http://example.com/a> <http://example.com/p> "1"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.com/a> <http://example.com/p> "2"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.com/b> <http://example.com/p> "5"^^<http://www.w3.org/2001/XMLSchema#integer> .
"#;

#[test]
fn group_by_with_sum_and_count() {
    let results = select(
        GROUP_DATA,
        "SELECT ?s (SUM(?o) AS ?t) WHERE { ?s <http://example.com/p> ?o } GROUP BY ?s",
    );
    assert_eq!(
        results,
        [
            vec![
                ("s".to_owned(), "<http://example.com/a>".to_owned()),
                (
                    "t".to_owned(),
                    "\"3\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned()
                ),
            ],
            vec![
                ("s".to_owned(), "<http://example.com/b>".to_owned()),
                (
                    "t".to_owned(),
                    "\"5\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned()
                ),
            ],
        ]
    );

    let counts = select(
        GROUP_DATA,
        "SELECT (COUNT(*) AS ?c) WHERE { ?s <http://example.com/p> ?o } GROUP BY ?s",
    );
    assert_eq!(
        counts
            .iter()
            .map(|row| row[0].1.as_str())
            .collect::<Vec<_>>(),
        [
            "\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>",
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        ]
    );
}

#[test]
fn count_without_group_by_over_empty_input() {
    let results = select("", "SELECT (COUNT(*) AS ?c) WHERE { ?s ?p ?o }");
    assert_eq!(
        results,
        [vec![(
            "c".to_owned(),
            "\"0\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned()
        )]]
    );
}

#[test]
fn avg_accumulates_in_decimal() {
    let results = select(
        GROUP_DATA,
        "SELECT (AVG(?o) AS ?a) WHERE { <http://example.com/a> <http://example.com/p> ?o }",
    );
    assert_eq!(
        results[0][0].1,
        "\"1.5\"^^<http://www.w3.org/2001/XMLSchema#decimal>"
    );
}

#[test]
fn group_concat_with_separator() {
    let results = select(
        "",
        r#"SELECT (GROUP_CONCAT(?x; SEPARATOR = "|") AS ?all) WHERE { VALUES ?x { "a" "b" } }"#,
    );
    assert_eq!(results[0][0].1, "\"a|b\"");
}

#[test]
fn exists_honours_graph_origin() {
    let data = r#"<http://example.com/a> <http://example.com/p> <http://example.com/b> <http://example.com/G> .
"#;
    let results = select(
        data,
        "SELECT ?a WHERE { GRAPH <http://example.com/G> { ?a <http://example.com/p> ?b . FILTER EXISTS { ?a <http://example.com/p> <http://example.com/b> } } }",
    );
    assert_eq!(
        results,
        [vec![("a".to_owned(), "<http://example.com/a>".to_owned())]]
    );

    // Outside of the GRAPH clause the triple is invisible.
    assert!(select(
        data,
        "SELECT ?a WHERE { GRAPH <http://example.com/G> { ?a <http://example.com/p> ?b } FILTER EXISTS { ?a <http://example.com/p> <http://example.com/b> } }",
    )
    .is_empty());
}

#[test]
fn exists_is_restricted_by_the_current_row() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" .
<http://example.com/b> <http://example.com/p> "2" .
<http://example.com/a> <http://example.com/q> "3" .
"#;
    let results = select(
        data,
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o . FILTER EXISTS { ?s <http://example.com/q> ?x } }",
    );
    assert_eq!(
        results,
        [vec![("s".to_owned(), "<http://example.com/a>".to_owned())]]
    );
}

#[test]
fn graph_variable_iterates_named_graphs() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" <http://example.com/g1> .
<http://example.com/b> <http://example.com/p> "2" <http://example.com/g2> .
<http://example.com/c> <http://example.com/p> "3" .
"#;
    let results = select(data, "SELECT ?g ?s WHERE { GRAPH ?g { ?s ?p ?o } }");
    assert_eq!(
        results,
        [
            vec![
                ("g".to_owned(), "<http://example.com/g1>".to_owned()),
                ("s".to_owned(), "<http://example.com/a>".to_owned()),
            ],
            vec![
                ("g".to_owned(), "<http://example.com/g2>".to_owned()),
                ("s".to_owned(), "<http://example.com/b>".to_owned()),
            ],
        ]
    );
}

#[test]
fn minus_removes_overlapping_solutions() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" .
<http://example.com/b> <http://example.com/p> "2" .
<http://example.com/a> <http://example.com/q> "x" .
"#;
    let results = select(
        data,
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o MINUS { ?s <http://example.com/q> ?x } }",
    );
    assert_eq!(
        results,
        [vec![("s".to_owned(), "<http://example.com/b>".to_owned())]]
    );

    // Disjoint domains share no binding, so MINUS removes nothing.
    let kept = select(
        data,
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o MINUS { ?z <http://example.com/missing> ?w } }",
    );
    assert_eq!(kept.len(), 2);
}

#[test]
fn left_join_yields_at_least_as_many_rows_as_join() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" .
<http://example.com/b> <http://example.com/p> "2" .
<http://example.com/a> <http://example.com/q> "x" .
"#;
    let join = select(
        data,
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o . ?s <http://example.com/q> ?v }",
    );
    let left_join = select(
        data,
        "SELECT ?s WHERE { ?s <http://example.com/p> ?o OPTIONAL { ?s <http://example.com/q> ?v } }",
    );
    assert!(left_join.len() >= join.len());
}

#[test]
fn evaluation_is_deterministic() {
    let query = "SELECT ?s ?o WHERE { ?s <http://example.com/p> ?o OPTIONAL { ?s <http://example.com/q> ?v } } ORDER BY ?o";
    assert_eq!(select(GROUP_DATA, query), select(GROUP_DATA, query));
}

#[test]
fn distinct_is_idempotent() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" .
<http://example.com/a> <http://example.com/q> "1" .
"#;
    let once = select(data, "SELECT DISTINCT ?s WHERE { ?s ?p ?o }");
    let twice = select(
        data,
        "SELECT DISTINCT ?s WHERE { { SELECT DISTINCT ?s WHERE { ?s ?p ?o } } }",
    );
    assert_eq!(once, twice);
    assert_eq!(once.len(), 1);
}

#[test]
fn constant_folding_preserves_semantics() {
    let query = "SELECT ?s WHERE { ?s <http://example.com/p> ?o . FILTER(1 + 1 = 2 && SUBSTR(\"hello\", 1, 2) = \"he\") }";
    let evaluator = QueryEvaluator::new();
    let raw = rqalgebra::Query::parse(query, None).unwrap();
    let prepared = evaluator.prepare(query, None).unwrap();
    let run = |query: &rqalgebra::Query| {
        let QueryResults::Solutions(solutions) =
            evaluator.execute(dataset(GROUP_DATA), query).unwrap()
        else {
            panic!()
        };
        solutions
            .map(|s| s.unwrap().iter().map(|(_, t)| t.to_string()).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(&raw), run(&prepared.query));
    assert_eq!(run(&prepared.query).len(), 3);
}

#[test]
fn select_star_projects_bound_named_variables() {
    let results = select(EXAMPLE_DATA, "SELECT * WHERE { ?s ?p ?o }");
    assert_eq!(
        results[0].iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
        ["s", "p", "o"]
    );
}

#[test]
fn values_with_undef() {
    let results = select(
        "",
        r#"SELECT ?x ?y WHERE { VALUES (?x ?y) { (1 2) (UNDEF "a") } }"#,
    );
    assert_eq!(results.len(), 2);
    assert_eq!(results[1], [("y".to_owned(), "\"a\"".to_owned())]);
}

#[test]
fn expression_semantics() {
    // Numeric promotion: integer + decimal is decimal.
    assert_eq!(
        select("", r#"SELECT (1 + 0.5 AS ?r) WHERE {}"#)[0][0].1,
        "\"1.5\"^^<http://www.w3.org/2001/XMLSchema#decimal>"
    );
    // Integer division yields a decimal.
    assert_eq!(
        select("", r#"SELECT (7 / 2 AS ?r) WHERE {}"#)[0][0].1,
        "\"3.5\"^^<http://www.w3.org/2001/XMLSchema#decimal>"
    );
    // Division by zero is a type error: the projected value stays unbound.
    assert!(select("", r#"SELECT (1 / 0 AS ?r) WHERE {}"#)[0].is_empty());
    // Value equality across lexical forms, sameTerm is stricter.
    assert!(ask(
        "",
        r#"ASK { FILTER("01"^^<http://www.w3.org/2001/XMLSchema#integer> = 1) }"#
    ));
    assert!(!ask(
        "",
        r#"ASK { FILTER(sameTerm("01"^^<http://www.w3.org/2001/XMLSchema#integer>, 1)) }"#
    ));
    // Kleene logic: true || error is true, false && error is false.
    assert!(ask("", r#"ASK { FILTER(true || 1 / 0 = 1) }"#));
    assert!(ask("", r#"ASK { FILTER(!(false && 1 / 0 = 1)) }"#));
    // IF only evaluates the taken branch, COALESCE skips errors.
    assert!(ask("", r#"ASK { FILTER(IF(true, 1, 1 / 0) = 1) }"#));
    assert!(ask("", r#"ASK { FILTER(COALESCE(1 / 0, 42) = 42) }"#));
    // IN over mixed members.
    assert!(ask("", r#"ASK { FILTER(2 IN (1, 2, 3)) }"#));
    assert!(!ask("", r#"ASK { FILTER(9 IN (1, 2, 3)) }"#));
}

#[test]
fn string_functions() {
    assert_eq!(
        select("", r#"SELECT (SUBSTR("foobar", 4) AS ?r) WHERE {}"#)[0][0].1,
        "\"bar\""
    );
    assert_eq!(
        select("", r#"SELECT (SUBSTR("foobar", 4, 1) AS ?r) WHERE {}"#)[0][0].1,
        "\"b\""
    );
    assert_eq!(
        select("", r#"SELECT (STRLEN("héllo") AS ?r) WHERE {}"#)[0][0].1,
        "\"5\"^^<http://www.w3.org/2001/XMLSchema#integer>"
    );
    // CONCAT keeps the language only when every argument carries it.
    assert_eq!(
        select("", r#"SELECT (CONCAT("a"@en, "b"@en) AS ?r) WHERE {}"#)[0][0].1,
        "\"ab\"@en"
    );
    assert_eq!(
        select("", r#"SELECT (CONCAT("a"@en, "b") AS ?r) WHERE {}"#)[0][0].1,
        "\"ab\""
    );
    assert_eq!(
        select("", r#"SELECT (UCASE("mixed"@en) AS ?r) WHERE {}"#)[0][0].1,
        "\"MIXED\"@en"
    );
    assert_eq!(
        select("", r#"SELECT (ENCODE_FOR_URI("Los Angeles") AS ?r) WHERE {}"#)[0][0].1,
        "\"Los%20Angeles\""
    );
    assert_eq!(
        select("", r#"SELECT (STRBEFORE("abc", "b") AS ?r) WHERE {}"#)[0][0].1,
        "\"a\""
    );
    assert_eq!(
        select("", r#"SELECT (STRAFTER("abc", "b") AS ?r) WHERE {}"#)[0][0].1,
        "\"c\""
    );
    // Language-tag mismatch on the second argument is a type error.
    assert!(select("", r#"SELECT (STRSTARTS("ab"@en, "a"@fr) AS ?r) WHERE {}"#)[0].is_empty());
    assert!(ask("", r#"ASK { FILTER(STRSTARTS("abc"@en, "ab"@en)) }"#));
    assert!(ask("", r#"ASK { FILTER(REGEX("Abc", "^ab", "i")) }"#));
    assert!(!ask("", r#"ASK { FILTER(REGEX("Abc", "^ab")) }"#));
    assert_eq!(
        select("", r#"SELECT (REPLACE("banana", "a", "o") AS ?r) WHERE {}"#)[0][0].1,
        "\"bonono\""
    );
}

#[test]
fn date_time_functions() {
    let value = r#""2011-01-10T14:45:13.815-05:00"^^<http://www.w3.org/2001/XMLSchema#dateTime>"#;
    let row = &select(
        "",
        &format!(
            "SELECT (YEAR({value}) AS ?y) (SECONDS({value}) AS ?s) (TZ({value}) AS ?tz) (TIMEZONE({value}) AS ?d) WHERE {{}}"
        ),
    )[0];
    assert_eq!(
        row[0].1,
        "\"2011\"^^<http://www.w3.org/2001/XMLSchema#integer>"
    );
    assert_eq!(
        row[1].1,
        "\"13.815\"^^<http://www.w3.org/2001/XMLSchema#decimal>"
    );
    assert_eq!(row[2].1, "\"-05:00\"");
    assert_eq!(
        row[3].1,
        "\"-PT5H\"^^<http://www.w3.org/2001/XMLSchema#dayTimeDuration>"
    );
}

#[test]
fn casts() {
    assert_eq!(
        select(
            "",
            r#"SELECT (<http://www.w3.org/2001/XMLSchema#integer>("42.7"^^<http://www.w3.org/2001/XMLSchema#decimal>) AS ?r) WHERE {}"#
        )[0][0]
            .1,
        "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
    );
    assert_eq!(
        select(
            "",
            r#"SELECT (<http://www.w3.org/2001/XMLSchema#boolean>("1") AS ?r) WHERE {}"#
        )[0][0]
            .1,
        "\"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>"
    );
    // A failing cast is a type error, not an abort.
    assert!(select(
        "",
        r#"SELECT (<http://www.w3.org/2001/XMLSchema#integer>("nope") AS ?r) WHERE {}"#
    )[0]
    .is_empty());
}

#[test]
fn ask_and_construct() {
    assert!(ask(EXAMPLE_DATA, "ASK { ?s ?p ?o }"));
    assert!(!ask(EXAMPLE_DATA, "ASK { ?s <http://example.com/missing> ?o }"));

    let evaluator = QueryEvaluator::new();
    let prepared = evaluator
        .prepare(
            "CONSTRUCT { ?s <http://example.com/copied> ?o . ?s <http://example.com/extra> ?v } WHERE { ?s <http://example.com/p> ?o OPTIONAL { ?s <http://example.com/q> ?v } }",
            None,
        )
        .unwrap();
    let QueryResults::Graph(triples) = evaluator
        .execute(dataset(EXAMPLE_DATA), &prepared.query)
        .unwrap()
    else {
        panic!("CONSTRUCT results expected")
    };
    let triples: Vec<_> = triples.map(Result::unwrap).collect();
    // The template triple with the unbound ?v is skipped.
    assert_eq!(triples.len(), 1);
    assert_eq!(
        triples[0].to_string(),
        "<http://example.com/a> <http://example.com/copied> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
    );
}

#[test]
fn subselect_projection_is_a_boundary() {
    let data = r#"<http://example.com/a> <http://example.com/p> "1" .
"#;
    let results = select(
        data,
        "SELECT ?s ?o WHERE { { SELECT ?s WHERE { ?s <http://example.com/p> ?o } } }",
    );
    // ?o is not projected by the inner SELECT, so it stays unbound outside.
    assert_eq!(
        results,
        [vec![("s".to_owned(), "<http://example.com/a>".to_owned())]]
    );
}

#[test]
fn service_uses_the_registered_handler() {
    let evaluator = QueryEvaluator::new().with_service_handler(
        |_: &rqrdf::NamedNode, _: &rqalgebra::GraphPattern| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(ServiceSolutions {
                variables: vec![Variable::new_unchecked("x")],
                solutions: vec![vec![Some(Term::from_str("\"remote\"").unwrap())]],
            })
        },
    );
    let prepared = evaluator
        .prepare(
            "SELECT ?x WHERE { SERVICE <http://example.com/sparql> { ?x ?p ?o } }",
            None,
        )
        .unwrap();
    let QueryResults::Solutions(solutions) =
        evaluator.execute(Dataset::new(), &prepared.query).unwrap()
    else {
        panic!()
    };
    let solutions: Vec<_> = solutions.map(Result::unwrap).collect();
    assert_eq!(solutions.len(), 1);
    assert_eq!(
        solutions[0].get("x"),
        Some(&Term::from_str("\"remote\"").unwrap())
    );
}

#[test]
fn silent_service_without_handler_is_empty() {
    let evaluator = QueryEvaluator::new();
    let prepared = evaluator
        .prepare(
            "SELECT ?x WHERE { SERVICE SILENT <http://example.com/sparql> { ?x ?p ?o } }",
            None,
        )
        .unwrap();
    let QueryResults::Solutions(solutions) =
        evaluator.execute(Dataset::new(), &prepared.query).unwrap()
    else {
        panic!()
    };
    assert_eq!(solutions.count(), 0);

    let failing = evaluator
        .prepare(
            "SELECT ?x WHERE { SERVICE <http://example.com/sparql> { ?x ?p ?o } }",
            None,
        )
        .unwrap();
    assert!(evaluator.execute(Dataset::new(), &failing.query).is_err());
}

#[test]
fn stop_flag_cancels_execution() {
    let stop = Arc::new(AtomicBool::new(false));
    let evaluator = QueryEvaluator::new()
        .with_limits(QueryLimits::new().with_stop_flag(Arc::clone(&stop)));
    let prepared = evaluator.prepare("SELECT * WHERE { ?s ?p ?o }", None).unwrap();
    stop.store(true, Ordering::Relaxed);
    let QueryResults::Solutions(mut solutions) = evaluator
        .execute(dataset(EXAMPLE_DATA), &prepared.query)
        .unwrap()
    else {
        panic!()
    };
    assert!(solutions.next().unwrap().is_err());
    // The stream is flushed after the first fatal error.
    assert!(solutions.next().is_none());
}

#[test]
fn slice_applies_offset_and_limit() {
    let results = select(
        GROUP_DATA,
        "SELECT ?o WHERE { ?s <http://example.com/p> ?o } ORDER BY ?o LIMIT 1 OFFSET 1",
    );
    assert_eq!(
        results,
        [vec![(
            "o".to_owned(),
            "\"2\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned()
        )]]
    );
}

#[test]
fn blank_nodes_in_patterns_join_like_variables() {
    let data = r#"<http://example.com/a> <http://example.com/p> _:x .
"#;
    // The pattern blank node behaves as an anonymous variable.
    let results = select(data, "SELECT ?s WHERE { ?s <http://example.com/p> _:any }");
    assert_eq!(results.len(), 1);
    let bracket = select(data, "SELECT ?s WHERE { [] <http://example.com/q> ?s }");
    assert!(bracket.is_empty());
}
