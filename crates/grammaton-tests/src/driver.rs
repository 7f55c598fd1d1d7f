//! A minimal shift/reduce driver over the generated automaton.

use anyhow::{anyhow, bail};
use grammaton::{
    conflict::Action,
    grammar::{Grammar, TokenID},
    lr0::{LRAutomaton, StateID},
};

/// Parse a sequence of token names and return the full names of the
/// alternatives in reduction order.
pub fn parse(g: &Grammar, automaton: &LRAutomaton, input: &[&str]) -> anyhow::Result<Vec<String>> {
    let tokens = input
        .iter()
        .map(|name| {
            g.find_token(name)
                .ok_or_else(|| anyhow!("unknown token: {}", name))
        })
        .chain(Some(Ok(g.end_token())))
        .collect::<anyhow::Result<Vec<TokenID>>>()?;

    let mut stack = vec![StateID::START];
    let mut pos = 0;
    let mut reductions = vec![];
    loop {
        let current = *stack.last().ok_or_else(|| anyhow!("empty stack"))?;
        let state = automaton.state(current);
        let action = state
            .actions()
            .iter()
            .find(|action| accepts(g, action, &tokens[pos..]))
            .ok_or_else(|| anyhow!("syntax error at token #{} in {:?}", pos, current))?;

        match action {
            Action::Shift { .. } => {
                let token = *tokens
                    .get(pos)
                    .ok_or_else(|| anyhow!("unexpected end of input"))?;
                let next = state
                    .target_token(token)
                    .ok_or_else(|| anyhow!("unexpected token {} in {:?}", g[token], current))?;
                stack.push(next);
                pos += 1;
            }

            Action::Reduce { alternative, .. } => {
                if *alternative == g.start_alternative() {
                    return Ok(reductions);
                }
                let alternative = &g[*alternative];
                let len = alternative.elements().len();
                if len >= stack.len() {
                    bail!("stack underflow while reducing {}", alternative.full_name(g));
                }
                stack.truncate(stack.len() - len);

                let top = *stack.last().ok_or_else(|| anyhow!("empty stack"))?;
                let next = automaton
                    .state(top)
                    .target_production(alternative.production())
                    .ok_or_else(|| anyhow!("missing goto from {:?}", top))?;
                stack.push(next);
                reductions.push(alternative.full_name(g));
            }
        }
    }
}

fn accepts(g: &Grammar, action: &Action, rest: &[TokenID]) -> bool {
    match action.lookahead() {
        None => true,
        Some(lookahead) => (1..=lookahead.max_distance()).all(|distance| {
            rest.get(distance - 1)
                .map_or(true, |&token| lookahead.tokens(g, distance).contains(token))
        }),
    }
}
