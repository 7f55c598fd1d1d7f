//! Grammar definitions for integration tests.

use grammaton::{
    grammar::{ElementKind::Production as P, ElementKind::Token as T, Grammar},
    priority::PriorityType,
};

pub fn g_simple1() -> Grammar {
    Grammar::define("A", |g| {
        let equal = g.token("EQUAL");
        let plus = g.token("PLUS");
        let ident = g.token("ID");
        let num = g.token("NUM");

        let a = g.production("A");
        let e = g.production("E");
        let t = g.production("T");

        g.rule(a, "assign", [P(e), T(equal), P(e)]);
        g.rule(a, "ident", [T(ident)]);
        g.rule(e, "add", [P(e), T(plus), P(t)]);
        g.rule(e, "term", [P(t)]);
        g.rule(t, "num", [T(num)]);
        g.rule(t, "ident", [T(ident)]);
    })
}

pub fn g_simple2() -> Grammar {
    Grammar::define("EXPR", |g| {
        // declare tokens.
        let lparen = g.token("LPAREN");
        let rparen = g.token("RPAREN");
        let plus = g.token("PLUS");
        let minus = g.token("MINUS");
        let star = g.token("STAR");
        let slash = g.token("SLASH");
        let num = g.token("NUM");

        // declare productions.
        let expr = g.production("EXPR");
        let factor = g.production("FACTOR");
        let term = g.production("TERM");

        g.rule(expr, "add", [P(expr), T(plus), P(factor)]);
        g.rule(expr, "sub", [P(expr), T(minus), P(factor)]);
        g.rule(expr, "factor", [P(factor)]);

        g.rule(factor, "mul", [P(factor), T(star), P(term)]);
        g.rule(factor, "div", [P(factor), T(slash), P(term)]);
        g.rule(factor, "term", [P(term)]);

        g.rule(term, "num", [T(num)]);
        g.rule(term, "paren", [T(lparen), P(expr), T(rparen)]);
    })
}

/// Pager's grammar, whose LR(0) state after `ID` mixes two contexts.
pub fn g2() -> Grammar {
    Grammar::define("DEF", |g| {
        let comma = g.token("COMMA");
        let colon = g.token("COLON");
        let ident = g.token("ID");

        let def = g.production("DEF");
        let param_spec = g.production("PARAM_SPEC");
        let return_spec = g.production("RETURN_SPEC");
        let type_ = g.production("TYPE");
        let name = g.production("NAME");
        let name_list = g.production("NAME_LIST");

        g.rule(def, "", [P(param_spec), P(return_spec), T(comma)]);
        g.rule(param_spec, "type", [P(type_)]);
        g.rule(param_spec, "names", [P(name_list), T(colon), P(type_)]);
        g.rule(return_spec, "type", [P(type_)]);
        g.rule(return_spec, "name", [P(name), T(colon), P(type_)]);
        g.rule(type_, "", [T(ident)]);
        g.rule(name, "", [T(ident)]);
        g.rule(name_list, "one", [P(name)]);
        g.rule(name_list, "more", [P(name), T(comma), P(name_list)]);
    })
}

/// Binary and unary operators disambiguated by priorities.
pub fn g_calc() -> Grammar {
    Grammar::define("E", |g| {
        let plus = g.token("+");
        let minus = g.token("-");
        let star = g.token("*");
        let slash = g.token("/");
        let lparen = g.token("(");
        let rparen = g.token(")");
        let n = g.token("n");

        let e = g.production("E");

        let add = g.rule(e, "add", [P(e), T(plus), P(e)]);
        let sub = g.rule(e, "sub", [P(e), T(minus), P(e)]);
        let mul = g.rule(e, "mul", [P(e), T(star), P(e)]);
        let div = g.rule(e, "div", [P(e), T(slash), P(e)]);
        let neg = g.rule(e, "neg", [T(minus), P(e)]);
        g.rule(e, "paren", [T(lparen), P(e), T(rparen)]);
        g.rule(e, "num", [T(n)]);

        g.declare_priority(e, PriorityType::Right, [neg])
            .expect("negation is right recursive");
        g.declare_priority(e, PriorityType::Left, [mul, div])
            .expect("products are left recursive");
        g.declare_priority(e, PriorityType::Left, [add, sub])
            .expect("sums are left recursive");
    })
}

/// `E = E '^' E | 'n'` where `^` associates to the right.
pub fn g_power() -> Grammar {
    Grammar::define("E", |g| {
        let caret = g.token("^");
        let n = g.token("n");
        let e = g.production("E");

        let pow = g.rule(e, "pow", [P(e), T(caret), P(e)]);
        g.rule(e, "num", [T(n)]);

        g.declare_priority(e, PriorityType::Right, [pow])
            .expect("power is recursive");
    })
}

/// An ambiguous sum without any priority.
pub fn g_ambiguous() -> Grammar {
    Grammar::define("E", |g| {
        let plus = g.token("+");
        let n = g.token("n");
        let e = g.production("E");

        g.rule(e, "add", [P(e), T(plus), P(e)]);
        g.rule(e, "num", [T(n)]);
    })
}

/// Needs two tokens of lookahead after `a`.
pub fn g_two_tokens() -> Grammar {
    Grammar::define("S", |g| {
        let a = g.token("a");
        let x = g.token("x");
        let y = g.token("y");
        let z = g.token("z");

        let s = g.production("S");
        let p = g.production("A");
        let q = g.production("B");

        g.rule(s, "first", [P(p), T(x), T(y)]);
        g.rule(s, "second", [P(q), T(x), T(z)]);
        g.rule(p, "", [T(a)]);
        g.rule(q, "", [T(a)]);
    })
}

/// `S = 'a' S 'b' | ;`
pub fn g_balanced() -> Grammar {
    Grammar::define("S", |g| {
        let a = g.token("a");
        let b = g.token("b");
        let s = g.production("S");

        g.rule(s, "nested", [T(a), P(s), T(b)]);
        g.rule(s, "empty", []);
    })
}

/// `S = A ; A = B ; B = A ;`, deriving no finite sentence.
pub fn g_useless() -> Grammar {
    Grammar::define("S", |g| {
        let s = g.production("S");
        let a = g.production("A");
        let b = g.production("B");

        g.rule(s, "", [P(a)]);
        g.rule(a, "", [P(b)]);
        g.rule(b, "", [P(a)]);
    })
}
