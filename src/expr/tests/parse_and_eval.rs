// Tests for formula parsing, symbol resolution, and evaluation
#[cfg(test)]
mod parse_and_eval {
    use crate::error::ExprError;
    use crate::expr::compile;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn arithmetic_precedence() {
        let e = compile("1+2*3^2", &[], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[], &[], &[]), 19.0);
    }

    #[test]
    fn caret_is_right_associative() {
        let e = compile("2^3^2", &[], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[], &[], &[]), 512.0);
    }

    #[test]
    fn unary_minus_binds_looser_than_caret() {
        let e = compile("-2^2", &[], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[], &[], &[]), -4.0);
        let e = compile("2^-1", &[], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[], &[], &[]), 0.5);
    }

    #[test]
    fn scientific_literals() {
        let e = compile("1.5e2 + 2.5E-1", &[], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[], &[], &[]), 150.25);
    }

    #[test]
    fn feature_params_and_globals_resolve_in_order() {
        let e = compile(
            "scale*k*(r-r0)",
            &["r"],
            &names(&["r0", "k"]),
            &names(&["scale"]),
        )
        .unwrap();
        // r=3, r0=1, k=2, scale=0.5 -> 0.5*2*(3-1) = 2
        assert_eq!(e.evaluate(&[3.0], &[1.0, 2.0], &[0.5]), 2.0);
    }

    #[test]
    fn function_library() {
        let e = compile("sin(x)^2 + cos(x)^2", &["x"], &[], &[]).unwrap();
        assert!((e.evaluate(&[0.7], &[], &[]) - 1.0).abs() < 1e-12);
        let e = compile("max(x, 2) + min(x, 0) + step(x)", &["x"], &[], &[]).unwrap();
        assert_eq!(e.evaluate(&[1.0], &[], &[]), 3.0);
        assert_eq!(e.evaluate(&[-1.0], &[], &[]), 1.0);
        let e = compile("log(exp(x)) + sqrt(x^2)", &["x"], &[], &[]).unwrap();
        assert!((e.evaluate(&[2.0], &[], &[]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_symbol_is_a_compile_error() {
        let err = compile("k*(r-r0)", &["r"], &names(&["r0"]), &[]).unwrap_err();
        assert_eq!(err, ExprError::UnknownSymbol("k".into()));
    }

    #[test]
    fn malformed_syntax_reports_offset() {
        match compile("1 + * 2", &[], &[], &[]) {
            Err(ExprError::UnexpectedToken { token, offset }) => {
                assert_eq!(token, "*");
                assert_eq!(offset, 4);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn dangling_operator_is_rejected() {
        assert!(matches!(
            compile("1 +", &[], &[], &[]),
            Err(ExprError::UnexpectedEnd)
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            compile("min(1)", &[], &[], &[]),
            Err(ExprError::WrongArity { .. })
        ));
        assert!(matches!(
            compile("sin(1, 2)", &[], &[], &[]),
            Err(ExprError::WrongArity { .. })
        ));
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert_eq!(
            compile("sinc(1)", &[], &[], &[]).unwrap_err(),
            ExprError::UnknownSymbol("sinc".into())
        );
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(matches!(
            compile("1 2", &[], &[], &[]),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn identical_formulas_share_one_compilation() {
        let a = compile("x^2", &["x"], &[], &[]).unwrap();
        let b = compile("x^2", &["x"], &[], &[]).unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn same_formula_different_schema_compiles_separately() {
        let a = compile("x", &["x"], &[], &[]).unwrap();
        let b = compile("x", &["x", "y"], &[], &[]).unwrap();
        assert!(!std::sync::Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn division_by_zero_propagates_nonfinite() {
        let e = compile("1/x", &["x"], &[], &[]).unwrap();
        assert!(e.evaluate(&[0.0], &[], &[]).is_infinite());
    }
}
