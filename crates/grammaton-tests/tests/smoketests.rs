use grammaton::{
    conflict::ConflictError,
    grammar::{Grammar, GrammarError},
    lr0::{AutomatonError, Config, LRAutomaton},
};
use grammaton_tests::{driver::parse, grammars};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn smoketest_grammar(mut g: Grammar) -> anyhow::Result<(Grammar, LRAutomaton)> {
    init_tracing();
    g.compute_shortest_lengths()?;
    eprintln!("grammar:\n{}", g);
    eprintln!();
    let automaton = LRAutomaton::generate(&g)?;
    tracing::debug!("generated {} states", automaton.len());
    eprintln!("automaton:\n---\n{}", automaton.display(&g));
    Ok((g, automaton))
}

#[test]
fn smoketest_g_simple1() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_simple1())?;
    assert_eq!(parse(&g, &automaton, &["ID"])?, ["A.ident"]);
    assert_eq!(
        parse(&g, &automaton, &["ID", "EQUAL", "NUM", "PLUS", "ID"])?,
        ["T.ident", "E.term", "T.num", "E.term", "T.ident", "E.add", "A.assign"]
    );
    Ok(())
}

#[test]
fn smoketest_g_simple2() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_simple2())?;
    assert_eq!(
        parse(&g, &automaton, &["NUM", "PLUS", "NUM", "STAR", "NUM"])?,
        [
            "TERM.num",
            "FACTOR.term",
            "EXPR.factor",
            "TERM.num",
            "FACTOR.term",
            "TERM.num",
            "FACTOR.mul",
            "EXPR.add",
        ]
    );
    assert!(parse(&g, &automaton, &["NUM", "PLUS"]).is_err());
    Ok(())
}

#[test]
fn smoketest_g2() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g2())?;
    assert_eq!(
        parse(&g, &automaton, &["ID", "ID", "COMMA"])?,
        ["TYPE", "PARAM_SPEC.type", "TYPE", "RETURN_SPEC.type", "DEF"]
    );
    assert_eq!(
        parse(
            &g,
            &automaton,
            &["ID", "COMMA", "ID", "COLON", "ID", "ID", "COLON", "ID", "COMMA"]
        )?,
        [
            "NAME",
            "NAME",
            "NAME_LIST.one",
            "NAME_LIST.more",
            "TYPE",
            "PARAM_SPEC.names",
            "NAME",
            "TYPE",
            "RETURN_SPEC.name",
            "DEF",
        ]
    );
    Ok(())
}

#[test]
fn smoketest_g_calc() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_calc())?;
    assert_eq!(
        parse(&g, &automaton, &["n", "+", "n", "*", "n"])?,
        ["E.num", "E.num", "E.num", "E.mul", "E.add"]
    );
    assert_eq!(
        parse(&g, &automaton, &["n", "*", "n", "+", "n"])?,
        ["E.num", "E.num", "E.mul", "E.num", "E.add"]
    );
    assert_eq!(
        parse(&g, &automaton, &["n", "-", "n", "-", "n"])?,
        ["E.num", "E.num", "E.sub", "E.num", "E.sub"]
    );
    assert_eq!(
        parse(&g, &automaton, &["-", "n", "+", "n"])?,
        ["E.num", "E.neg", "E.num", "E.add"]
    );
    assert_eq!(
        parse(&g, &automaton, &["(", "n", "+", "n", ")", "/", "n"])?,
        ["E.num", "E.num", "E.add", "E.paren", "E.num", "E.div"]
    );
    Ok(())
}

#[test]
fn smoketest_g_power() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_power())?;
    assert_eq!(
        parse(&g, &automaton, &["n", "^", "n", "^", "n"])?,
        ["E.num", "E.num", "E.num", "E.pow", "E.pow"]
    );
    Ok(())
}

#[test]
fn smoketest_g_two_tokens() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_two_tokens())?;
    assert_eq!(parse(&g, &automaton, &["a", "x", "y"])?, ["A", "S.first"]);
    assert_eq!(parse(&g, &automaton, &["a", "x", "z"])?, ["B", "S.second"]);
    Ok(())
}

#[test]
fn smoketest_g_balanced() -> anyhow::Result<()> {
    let (g, automaton) = smoketest_grammar(grammars::g_balanced())?;
    assert_eq!(parse(&g, &automaton, &[])?, ["S.empty"]);
    assert_eq!(
        parse(&g, &automaton, &["a", "a", "b", "b"])?,
        ["S.empty", "S.nested", "S.nested"]
    );
    assert!(parse(&g, &automaton, &["a", "b", "b"]).is_err());
    Ok(())
}

#[test]
fn ambiguity_is_reported() {
    init_tracing();
    let g = grammars::g_ambiguous();
    let err = LRAutomaton::generate(&g).unwrap_err();
    eprintln!("{}", err);
    assert!(matches!(
        err,
        AutomatonError::ConflictResolution(ConflictError::Confirmed { .. })
    ));
}

#[test]
fn priorities_can_be_ignored() {
    init_tracing();
    let g = grammars::g_calc();
    let err = LRAutomaton::generate_with_config(&g, Config::new().ignore_priorities())
        .unwrap_err();
    assert!(matches!(
        err,
        AutomatonError::ConflictResolution(ConflictError::Confirmed { .. })
    ));
}

#[test]
fn lookahead_limit_is_reported() {
    init_tracing();
    let g = grammars::g_two_tokens();
    let err = LRAutomaton::generate_with_config(&g, Config::new().max_lookahead(1))
        .unwrap_err();
    assert!(matches!(
        err,
        AutomatonError::ConflictResolution(ConflictError::Unresolved { .. })
    ));
}

#[test]
fn useless_grammar_is_rejected() {
    init_tracing();
    let mut g = grammars::g_useless();
    let err = g.compute_shortest_lengths().unwrap_err();
    assert!(matches!(err, GrammarError::UselessProduction { .. }));
}

#[test]
fn generation_is_deterministic() -> anyhow::Result<()> {
    let g = grammars::g_calc();
    let first = LRAutomaton::generate(&g)?;
    let second = LRAutomaton::generate(&g)?;
    assert_eq!(first.len(), second.len());
    assert_eq!(
        first.display(&g).to_string(),
        second.display(&g).to_string()
    );
    Ok(())
}
