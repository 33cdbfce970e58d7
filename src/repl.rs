use std::io::{BufRead, Write};
use tracing::{debug, info};
use crate::interpreter::runner::Interpreter;
use crate::interpreter::value::Value;

/// Name given to every REPL line in diagnostics.
pub const UNIT: &str = "<stdin>";

/// Line-by-line interactive session. Prompts, echoed results and the output
/// of `print` all go to the interpreter's output; diagnostics go to `errors`.
pub struct Repl<W: Write> {
    interpreter: Interpreter<W>,
    counter: usize,
}

impl<W: Write> Repl<W> {
    pub fn new(interpreter: Interpreter<W>) -> Repl<W> {
        Repl { interpreter, counter: 1 }
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn into_interpreter(self) -> Interpreter<W> {
        self.interpreter
    }

    /// Reads lines from `input` until it ends. Language errors are reported
    /// and the session carries on with the bindings made so far.
    pub fn run<R: BufRead, E: Write>(&mut self, mut input: R, mut errors: E) -> std::io::Result<()> {
        info!("Starting interactive session");
        let mut line = String::new();

        loop {
            self.prompt()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.interpreter.output_mut())?;
                break;
            }

            // Diagnostic columns are relative to the line as typed
            let source = line.trim_end();

            if source.trim_start().is_empty() {
                continue;
            }

            match self.interpreter.run(UNIT, source) {
                Ok(Value::Nil) => {},
                Ok(value) => writeln!(self.interpreter.output_mut(), "<<< [{}]: {:?}", self.counter, value)?,
                Err(diagnostic) => {
                    debug!(line = self.counter, "line failed");
                    writeln!(errors, "{}", diagnostic)?;
                    errors.flush()?;
                },
            }

            self.counter += 1;
        }

        info!(lines = self.counter - 1, "Interactive session ended");
        Ok(())
    }

    fn prompt(&mut self) -> std::io::Result<()> {
        let out = self.interpreter.output_mut();
        write!(out, ">>> [{}]: ", self.counter)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    fn session(input: &str) -> (String, String) {
        let mut repl = Repl::new(Interpreter::new(Vec::new()));
        let mut errors = Vec::new();

        repl.run(input.as_bytes(), &mut errors).unwrap();

        let out = repl.into_interpreter().into_output();
        (String::from_utf8(out).unwrap(), String::from_utf8(errors).unwrap())
    }

    #[test]
    fn numbered_prompts_and_echo() {
        let (out, errors) = session("let x = 20\nx * 2\n");

        assert_eq!(out, ">>> [1]: >>> [2]: <<< [2]: 40\n>>> [3]: \n");
        assert_eq!(errors, "");
    }

    #[test]
    fn empty_lines_keep_the_counter() {
        let (out, _) = session("\n   \n'a'\n");
        assert_eq!(out, ">>> [1]: >>> [1]: >>> [1]: <<< [1]: 'a'\n>>> [2]: \n");
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let (out, errors) = session("let n = 1\nn / 0\nn + 1\n");

        assert_eq!(errors, "[<stdin>:1:3] DivisionByZeroError: Division by zero\n");
        assert!(out.ends_with("<<< [3]: 2\n>>> [4]: \n"));
    }

    #[test]
    fn columns_count_leading_whitespace() {
        let (_, errors) = session("   missing\n");
        assert_eq!(errors, "[<stdin>:1:4] NameError: Undefined variable 'missing'\n");
    }

    #[test]
    fn print_output_interleaves() {
        let (out, _) = session("print('hi')\n");
        assert_eq!(out, ">>> [1]: hi\n>>> [2]: \n");
    }
}
