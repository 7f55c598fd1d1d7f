use criterion::{criterion_group, criterion_main, Criterion};
use grammaton::{grammar::Grammar, lr0::LRAutomaton};
use grammaton_tests::grammars;
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_simple, bench_priorities, bench_lookahead);

fn bench_simple(c: &mut Criterion) {
    bench_automaton_gen(c, "g_simple1", grammars::g_simple1);
    bench_automaton_gen(c, "g_simple2", grammars::g_simple2);
}

fn bench_priorities(c: &mut Criterion) {
    bench_automaton_gen(c, "g_calc", grammars::g_calc);
    bench_automaton_gen(c, "g_power", grammars::g_power);
}

fn bench_lookahead(c: &mut Criterion) {
    bench_automaton_gen(c, "g2", grammars::g2);
    bench_automaton_gen(c, "g_two_tokens", grammars::g_two_tokens);
}

fn bench_automaton_gen(c: &mut Criterion, name: &str, f: impl FnOnce() -> Grammar) {
    let grammar = f();
    c.bench_function(name, |b| {
        b.iter(|| {
            let _automaton = black_box(LRAutomaton::generate(&grammar));
        });
    });
}
