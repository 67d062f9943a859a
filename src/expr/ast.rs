// expr/ast.rs
// Expression tree, evaluation, and symbolic differentiation

/// The fixed transcendental-function library available in formulas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Step,
    Min,
    Max,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "step" => Func::Step,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    pub fn arity(&self) -> usize {
        match self {
            Func::Min | Func::Max => 2,
            _ => 1,
        }
    }

    fn apply1(&self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Exp => x.exp(),
            Func::Log => x.ln(),
            Func::Sqrt => x.sqrt(),
            Func::Abs => x.abs(),
            Func::Floor => x.floor(),
            Func::Ceil => x.ceil(),
            Func::Step => {
                if x < 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Func::Min | Func::Max => f64::NAN,
        }
    }

    fn apply2(&self, a: f64, b: f64) -> f64 {
        match self {
            Func::Min => a.min(b),
            Func::Max => a.max(b),
            _ => f64::NAN,
        }
    }
}

/// A compiled expression node. Variables are dense slot indices resolved at
/// parse time; evaluation walks the tree over a flat slot array and never
/// touches symbol names.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(usize),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Call(Func, Vec<Expr>),
}

impl Expr {
    /// Evaluate against a slot array. Singular inputs (division by zero,
    /// log of a negative) propagate NaN/Inf rather than failing.
    pub fn eval(&self, slots: &[f64]) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(i) => slots[*i],
            Expr::Add(a, b) => a.eval(slots) + b.eval(slots),
            Expr::Sub(a, b) => a.eval(slots) - b.eval(slots),
            Expr::Mul(a, b) => a.eval(slots) * b.eval(slots),
            Expr::Div(a, b) => a.eval(slots) / b.eval(slots),
            Expr::Pow(a, b) => a.eval(slots).powf(b.eval(slots)),
            Expr::Neg(a) => -a.eval(slots),
            Expr::Call(f, args) => match args.as_slice() {
                [a] => f.apply1(a.eval(slots)),
                [a, b] => f.apply2(a.eval(slots), b.eval(slots)),
                _ => f64::NAN,
            },
        }
    }

    /// Symbolic derivative with respect to the slot index `var`. The result
    /// is folded through the smart constructors, so constant subtrees
    /// collapse and identity operations vanish.
    pub fn diff(&self, var: usize) -> Expr {
        match self {
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Var(i) => Expr::Const(if *i == var { 1.0 } else { 0.0 }),
            Expr::Add(a, b) => add(a.diff(var), b.diff(var)),
            Expr::Sub(a, b) => sub(a.diff(var), b.diff(var)),
            Expr::Mul(a, b) => add(
                mul(a.diff(var), (**b).clone()),
                mul((**a).clone(), b.diff(var)),
            ),
            Expr::Div(a, b) => div(
                sub(
                    mul(a.diff(var), (**b).clone()),
                    mul((**a).clone(), b.diff(var)),
                ),
                mul((**b).clone(), (**b).clone()),
            ),
            Expr::Pow(a, b) => {
                if let Expr::Const(n) = **b {
                    // u^c -> c * u^(c-1) * u'
                    mul(
                        mul(Expr::Const(n), pow((**a).clone(), Expr::Const(n - 1.0))),
                        a.diff(var),
                    )
                } else {
                    // u^v = exp(v ln u): (u^v)' = u^v * (v' ln u + v u'/u)
                    mul(
                        pow((**a).clone(), (**b).clone()),
                        add(
                            mul(b.diff(var), call1(Func::Log, (**a).clone())),
                            div(mul((**b).clone(), a.diff(var)), (**a).clone()),
                        ),
                    )
                }
            }
            Expr::Neg(a) => neg(a.diff(var)),
            Expr::Call(f, args) => diff_call(*f, args, var),
        }
    }
}

fn diff_call(f: Func, args: &[Expr], var: usize) -> Expr {
    match f {
        Func::Min | Func::Max => {
            let (a, b) = (args[0].clone(), args[1].clone());
            let (da, db) = (args[0].diff(var), args[1].diff(var));
            // The active branch is selected through step(), keeping the
            // derivative exact almost everywhere.
            let pick_a = match f {
                Func::Min => call1(Func::Step, sub(b, a.clone())),
                _ => call1(Func::Step, sub(a.clone(), b)),
            };
            add(
                mul(pick_a.clone(), da),
                mul(sub(Expr::Const(1.0), pick_a), db),
            )
        }
        Func::Floor | Func::Ceil | Func::Step => Expr::Const(0.0),
        _ => {
            let u = args[0].clone();
            let du = args[0].diff(var);
            let outer = match f {
                Func::Sin => call1(Func::Cos, u),
                Func::Cos => neg(call1(Func::Sin, u)),
                Func::Tan => div(
                    Expr::Const(1.0),
                    pow(call1(Func::Cos, u), Expr::Const(2.0)),
                ),
                Func::Asin => div(
                    Expr::Const(1.0),
                    call1(Func::Sqrt, sub(Expr::Const(1.0), pow(u, Expr::Const(2.0)))),
                ),
                Func::Acos => neg(div(
                    Expr::Const(1.0),
                    call1(Func::Sqrt, sub(Expr::Const(1.0), pow(u, Expr::Const(2.0)))),
                )),
                Func::Atan => div(
                    Expr::Const(1.0),
                    add(Expr::Const(1.0), pow(u, Expr::Const(2.0))),
                ),
                Func::Sinh => call1(Func::Cosh, u),
                Func::Cosh => call1(Func::Sinh, u),
                Func::Tanh => div(
                    Expr::Const(1.0),
                    pow(call1(Func::Cosh, u), Expr::Const(2.0)),
                ),
                Func::Exp => call1(Func::Exp, u),
                Func::Log => div(Expr::Const(1.0), u),
                Func::Sqrt => div(
                    Expr::Const(1.0),
                    mul(Expr::Const(2.0), call1(Func::Sqrt, u)),
                ),
                Func::Abs => div(u.clone(), call1(Func::Abs, u)),
                _ => Expr::Const(f64::NAN),
            };
            mul(outer, du)
        }
    }
}

// Smart constructors: fold constants and strip identity operations so the
// derivative trees stay small enough for the hot loop.

pub(crate) fn add(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x + y),
        (Expr::Const(x), _) if *x == 0.0 => b,
        (_, Expr::Const(y)) if *y == 0.0 => a,
        _ => Expr::Add(Box::new(a), Box::new(b)),
    }
}

pub(crate) fn sub(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x - y),
        (_, Expr::Const(y)) if *y == 0.0 => a,
        (Expr::Const(x), _) if *x == 0.0 => neg(b),
        _ => Expr::Sub(Box::new(a), Box::new(b)),
    }
}

pub(crate) fn mul(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x * y),
        (Expr::Const(x), _) if *x == 0.0 => Expr::Const(0.0),
        (_, Expr::Const(y)) if *y == 0.0 => Expr::Const(0.0),
        (Expr::Const(x), _) if *x == 1.0 => b,
        (_, Expr::Const(y)) if *y == 1.0 => a,
        _ => Expr::Mul(Box::new(a), Box::new(b)),
    }
}

pub(crate) fn div(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Const(x), Expr::Const(y)) if *y != 0.0 => Expr::Const(x / y),
        (_, Expr::Const(y)) if *y == 1.0 => a,
        _ => Expr::Div(Box::new(a), Box::new(b)),
    }
}

pub(crate) fn pow(a: Expr, b: Expr) -> Expr {
    match (&a, &b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x.powf(*y)),
        (_, Expr::Const(y)) if *y == 1.0 => a,
        (_, Expr::Const(y)) if *y == 0.0 => Expr::Const(1.0),
        _ => Expr::Pow(Box::new(a), Box::new(b)),
    }
}

pub(crate) fn neg(a: Expr) -> Expr {
    match a {
        Expr::Const(x) => Expr::Const(-x),
        Expr::Neg(inner) => *inner,
        _ => Expr::Neg(Box::new(a)),
    }
}

pub(crate) fn call1(f: Func, a: Expr) -> Expr {
    if let Expr::Const(x) = a {
        return Expr::Const(f.apply1(x));
    }
    Expr::Call(f, vec![a])
}
