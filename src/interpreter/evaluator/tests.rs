use crate::interpreter::error::Error;
use crate::interpreter::lexer::tokenize;
use crate::interpreter::parser::parse;
use super::*;

fn run_in(source: &str, environment: &EnvRef, evaluator: &mut Evaluator<Vec<u8>>) -> Result<Value, Error> {
    let program = parse(tokenize(source)?)?;
    Ok(evaluator.evaluate(&program, environment)?)
}

fn run(source: &str) -> Result<Value, Error> {
    run_in(source, &Environment::new_global(), &mut Evaluator::new(Vec::new()))
}

fn run_kind(source: &str) -> RuntimeErrorKind {
    match run(source) {
        Err(Error::Runtime(error)) => error.kind,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

fn output_of(source: &str) -> String {
    let mut evaluator = Evaluator::new(Vec::new());
    run_in(source, &Environment::new_global(), &mut evaluator).expect("program should run");
    String::from_utf8(evaluator.into_output()).expect("output should be UTF-8")
}

mod arithmetic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn precedence() {
        assert_eq!(run("1 + 2 * 3"), Ok(Value::Number(7.0)));
        assert_eq!(run("(1 + 2) * 3"), Ok(Value::Number(9.0)));
        assert_eq!(run("10 - 4 - 3"), Ok(Value::Number(3.0)));
        assert_eq!(run("7 / 2"), Ok(Value::Number(3.5)));
        assert_eq!(run("-2 * -3"), Ok(Value::Number(6.0)));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(run_kind("1 / 0"), RuntimeErrorKind::DivisionByZeroError);
        assert_eq!(run_kind("1 / (2 - 2)"), RuntimeErrorKind::DivisionByZeroError);
        assert_eq!(run("0 / 1"), Ok(Value::Number(0.0)));
    }

    #[test]
    fn operands_must_be_numbers() {
        assert_eq!(run_kind("1 + 'a'"), RuntimeErrorKind::TypeError);
        assert_eq!(run_kind("'a' * 2"), RuntimeErrorKind::TypeError);
        assert_eq!(run_kind("-'a'"), RuntimeErrorKind::TypeError);
        assert_eq!(run_kind("true - 1"), RuntimeErrorKind::TypeError);
    }

    #[test]
    fn type_error_position_and_message() {
        match run("let a = 1;\na + nil") {
            Err(Error::Runtime(error)) => {
                assert_eq!(error.pos, TokenPos::new(2, 3));
                assert_eq!(error.message, "Operands of '+' must be two numbers or two strings, found number and nil");
            },
            other => panic!("expected a type error, got {:?}", other),
        }
    }
}

mod strings {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn concatenation() {
        assert_eq!(run("'a' + 'b'"), Ok(Value::from("ab")));
        assert_eq!(run(r"'it\'s' + ' ' + 'fine'"), Ok(Value::from("it's fine")));
    }

    #[test]
    fn comparison() {
        assert_eq!(run("'abc' < 'abd'"), Ok(Value::Boolean(true)));
        assert_eq!(run("'b' >= 'a'"), Ok(Value::Boolean(true)));
        assert_eq!(run_kind("'a' < 1"), RuntimeErrorKind::TypeError);
    }
}

mod logic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comparisons_and_equality() {
        assert_eq!(run("1 < 2"), Ok(Value::Boolean(true)));
        assert_eq!(run("2 <= 2"), Ok(Value::Boolean(true)));
        assert_eq!(run("1 > 2"), Ok(Value::Boolean(false)));
        assert_eq!(run("1 == 1"), Ok(Value::Boolean(true)));
        assert_eq!(run("1 == '1'"), Ok(Value::Boolean(false)));
        assert_eq!(run("nil != false"), Ok(Value::Boolean(true)));
        assert_eq!(run_kind("nil < 1"), RuntimeErrorKind::TypeError);
    }

    #[test]
    fn not_uses_truthiness() {
        assert_eq!(run("!nil"), Ok(Value::Boolean(true)));
        assert_eq!(run("!0"), Ok(Value::Boolean(false)));
        assert_eq!(run("!''"), Ok(Value::Boolean(false)));
        assert_eq!(run("!!true"), Ok(Value::Boolean(true)));
    }

    #[test]
    fn short_circuit() {
        assert_eq!(run("false and undefined"), Ok(Value::Boolean(false)));
        assert_eq!(run("true or undefined"), Ok(Value::Boolean(true)));
        assert_eq!(run("nil || 'fallback'"), Ok(Value::from("fallback")));
        assert_eq!(run("1 && 2"), Ok(Value::Number(2.0)));
        assert_eq!(run_kind("true and undefined"), RuntimeErrorKind::NameError);
    }

    #[test]
    fn right_operand_not_evaluated() {
        assert_eq!(output_of("fn loud() { print('evaluated'); return true; } false and loud(); true or loud();"), "");
    }
}

mod scoping {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignment_mutates_enclosing_binding() {
        assert_eq!(run("let x = 1; { x = 2; } x"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn block_definitions_do_not_leak() {
        assert_eq!(run_kind("let x = 1; { let y = 2; } y"), RuntimeErrorKind::NameError);
    }

    #[test]
    fn shadowing_in_block() {
        assert_eq!(run("let x = 1; { let x = 2; x = 3; } x"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assignment_requires_definition() {
        match run("x = 1") {
            Err(Error::Runtime(error)) => {
                assert_eq!(error.kind, RuntimeErrorKind::NameError);
                assert_eq!(error.message, "Cannot assign to undefined variable 'x'");
            },
            other => panic!("expected a name error, got {:?}", other),
        }
    }

    #[test]
    fn unbound_identifier() {
        assert_eq!(run_kind("missing + 1"), RuntimeErrorKind::NameError);
    }

    #[test]
    fn assignment_yields_value() {
        assert_eq!(run("let a; let b; a = b = 4; a + b"), Ok(Value::Number(8.0)));
    }

    #[test]
    fn loop_iterations_get_fresh_scopes() {
        let source = "
            let i = 0;
            let first;
            while (i < 3) {
                let captured = i;
                fn get() { return captured; }
                if (i == 0) { first = get; }
                i = i + 1;
            }
            first()
        ";

        assert_eq!(run(source), Ok(Value::Number(0.0)));
        assert_eq!(run_kind("let i = 0; while (i < 1) { let inner = 1; i = i + 1; } inner"), RuntimeErrorKind::NameError);
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn if_else_uses_truthiness() {
        assert_eq!(run("if (0) { 'yes' } else { 'no' }"), Ok(Value::from("yes")));
        assert_eq!(run("if (nil) { 'yes' } else { 'no' }"), Ok(Value::from("no")));
        assert_eq!(run("if (false) { 'yes' }"), Ok(Value::Nil));
    }

    #[test]
    fn while_loop() {
        assert_eq!(run("let i = 0; let sum = 0; while (i < 5) { i = i + 1; sum = sum + i; } sum"), Ok(Value::Number(15.0)));
        assert_eq!(run("while (false) { 1 }"), Ok(Value::Nil));
    }

    #[test]
    fn return_skips_remaining_statements() {
        let source = "
            fn find(limit) {
                let i = 0;
                while (true) {
                    if (i * i > limit) { return i; }
                    i = i + 1;
                }
                print('unreachable');
            }
            find(50)
        ";

        assert_eq!(run(source), Ok(Value::Number(8.0)));
    }

    #[test]
    fn missing_return_yields_nil() {
        assert_eq!(run("fn f() { 1 + 1; } f()"), Ok(Value::Nil));
        assert_eq!(run("fn f() { return; } f()"), Ok(Value::Nil));
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn closures_outlive_their_call() {
        let source = "
            fn make_adder(n) {
                fn add(x) { return x + n; }
                return add;
            }
            let add_two = make_adder(2);
            add_two(40)
        ";

        assert_eq!(run(source), Ok(Value::Number(42.0)));
    }

    #[test]
    fn closures_share_captured_state() {
        let source = "
            fn counter() {
                let count = 0;
                fn next() { count = count + 1; return count; }
                return next;
            }
            let a = counter();
            let b = counter();
            a(); a(); b();
            a() * 10 + b()
        ";

        assert_eq!(run(source), Ok(Value::Number(32.0)));
    }

    #[test]
    fn calls_use_the_defining_scope() {
        let source = "
            let x = 'global';
            fn show() { return x; }
            fn shadow() { let x = 'local'; return show(); }
            shadow()
        ";

        assert_eq!(run(source), Ok(Value::from("global")));
    }

    #[test]
    fn recursion() {
        let source = "fn fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); } fact(10)";
        assert_eq!(run(source), Ok(Value::Number(3_628_800.0)));
    }

    #[test]
    fn arity_must_match() {
        assert_eq!(run_kind("fn f(a, b) { return a; } f(1)"), RuntimeErrorKind::ArityError);
        assert_eq!(run_kind("fn f() { } f(1)"), RuntimeErrorKind::ArityError);
    }

    #[test]
    fn only_functions_are_callable() {
        assert_eq!(run_kind("let x = 1; x()"), RuntimeErrorKind::TypeError);
        assert_eq!(run_kind("'f'()"), RuntimeErrorKind::TypeError);
    }

    #[test]
    fn arguments_evaluate_left_to_right() {
        assert_eq!(output_of("fn id(x) { print(x); return x; } fn pair(a, b) { } pair(id(1), id(2));"), "1\n2\n");
    }

    #[test]
    fn functions_compare_by_identity() {
        assert_eq!(run("fn f() {} let g = f; g == f"), Ok(Value::Boolean(true)));
        assert_eq!(run("fn f() {} let g = f; fn f() {} g == f"), Ok(Value::Boolean(false)));
    }
}

mod builtins {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn print_writes_to_output() {
        assert_eq!(output_of("print('a', 1, 2.5, true, nil); print();"), "a 1 2.5 true nil\n\n");
    }

    #[test]
    fn print_is_a_side_channel() {
        assert_eq!(run("print('x')"), Ok(Value::Nil));
    }

    #[test]
    fn builtins_can_be_shadowed() {
        assert_eq!(run("let print = 3; print"), Ok(Value::Number(3.0)));
    }
}

mod recursion_limit {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deep_recursion_overflows_cleanly() {
        let environment = Environment::new_global();
        let mut evaluator = Evaluator::new(Vec::new());

        run_in("fn fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); }", &environment, &mut evaluator).unwrap();

        match run_in("fact(100000)", &environment, &mut evaluator) {
            Err(Error::Runtime(error)) => assert_eq!(error.kind, RuntimeErrorKind::StackOverflow),
            other => panic!("expected a stack overflow, got {:?}", other),
        }

        assert_eq!(run_in("fact(5)", &environment, &mut evaluator), Ok(Value::Number(120.0)));
    }

    #[test]
    fn configurable_depth() {
        let environment = Environment::new_global();
        let mut evaluator = Evaluator::with_config(Vec::new(), EvaluatorConfig { max_call_depth: 10 });

        run_in("fn down(n) { if (n == 0) { return 0; } return down(n - 1); }", &environment, &mut evaluator).unwrap();

        assert_eq!(run_in("down(9)", &environment, &mut evaluator), Ok(Value::Number(0.0)));
        assert!(run_in("down(10)", &environment, &mut evaluator).is_err());
    }
}

mod idempotence {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pure_expression_on_copied_environments() {
        let environment = Environment::new_global();
        let mut evaluator = Evaluator::new(Vec::new());
        run_in("let a = 3; fn square(x) { return x * x; }", &environment, &mut evaluator).unwrap();

        let first = run_in("square(a) + 1", &Environment::deep_copy(&environment), &mut evaluator);
        let second = run_in("square(a) + 1", &Environment::deep_copy(&environment), &mut evaluator);

        assert_eq!(first, Ok(Value::Number(10.0)));
        assert_eq!(first, second);
    }

    #[test]
    fn errors_leave_environment_usable() {
        let environment = Environment::new_global();
        let mut evaluator = Evaluator::new(Vec::new());

        run_in("let total = 1;", &environment, &mut evaluator).unwrap();
        assert!(run_in("total = total + 1; total / 0", &environment, &mut evaluator).is_err());
        assert_eq!(run_in("total", &environment, &mut evaluator), Ok(Value::Number(2.0)));
    }
}
