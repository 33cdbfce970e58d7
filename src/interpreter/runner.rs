use std::io::Write;
use tracing::debug;
use crate::interpreter::environment::{EnvRef, Environment};
use crate::interpreter::error::{Diagnostic, Error};
use crate::interpreter::evaluator::{Evaluator, EvaluatorConfig};
use crate::interpreter::lexer;
use crate::interpreter::parser::{Parser, ParserConfig};
use crate::interpreter::value::Value;

/// Runs one unit of source in a fresh global environment.
pub fn run_source<W: Write>(unit: &str, source: &str, out: W) -> Result<Value, Diagnostic> {
    Interpreter::new(out).run(unit, source)
}

/// The root scope of a session. Dropping it unbinds everything, so closures
/// stored in globals release the scopes they captured.
struct Globals(EnvRef);

impl Drop for Globals {
    fn drop(&mut self) {
        if let Ok(mut environment) = self.0.try_borrow_mut() {
            environment.clear();
        }
    }
}

/// Lexer, parser and evaluator chained over a global environment that
/// persists between calls to [`run`](Interpreter::run).
pub struct Interpreter<W: Write> {
    environment: Globals,
    evaluator: Evaluator<W>,
    parser_config: ParserConfig,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Interpreter<W> {
        Interpreter::with_config(out, ParserConfig::default(), EvaluatorConfig::default())
    }

    pub fn with_config(out: W, parser_config: ParserConfig, evaluator_config: EvaluatorConfig) -> Interpreter<W> {
        Interpreter {
            environment: Globals(Environment::new_global()),
            evaluator: Evaluator::with_config(out, evaluator_config),
            parser_config,
        }
    }

    pub fn environment(&self) -> &EnvRef {
        &self.environment.0
    }

    pub fn output(&self) -> &W {
        self.evaluator.output()
    }

    pub fn output_mut(&mut self) -> &mut W {
        self.evaluator.output_mut()
    }

    pub fn into_output(self) -> W {
        self.evaluator.into_output()
    }

    /// Evaluates `source`, naming it `unit` in any diagnostic.
    ///
    /// Bindings made before a runtime error stay in the environment.
    pub fn run(&mut self, unit: &str, source: &str) -> Result<Value, Diagnostic> {
        debug!(unit, length = source.len(), "running source unit");

        self.run_stages(source).map_err(|error| Diagnostic::new(unit, error))
    }

    fn run_stages(&mut self, source: &str) -> Result<Value, Error> {
        let tokens = lexer::tokenize(source)?;
        let program = Parser::with_config(tokens, self.parser_config).parse()?;

        Ok(self.evaluator.evaluate(&program, &self.environment.0)?)
    }
}
