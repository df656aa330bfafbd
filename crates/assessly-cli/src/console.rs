//! Line-oriented prompts over any reader/writer pair.

use std::io::{BufRead, Write};

use anyhow::Result;

/// Prompts on `output` and reads answers from `input`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Show `prompt` and read one trimmed line. `None` at end of input.
    pub fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Yes/no question. An empty reply takes `default`; `None` at end of input.
    pub fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(reply) = self.ask(&format!("{prompt} {hint} "))? else {
                return Ok(None);
            };
            match reply.to_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn confirm_defaults_and_reprompts() {
        let mut console = Console::new(Cursor::new("\nmaybe\nN\n"), Vec::new());
        assert_eq!(console.confirm("Go?", true).unwrap(), Some(true));
        assert_eq!(console.confirm("Go?", true).unwrap(), Some(false));
        assert_eq!(console.confirm("Go?", false).unwrap(), None);

        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Go? [Y/n]"));
        assert!(output.contains("Please answer y or n."));
    }

    #[test]
    fn ask_trims_and_detects_eof() {
        let mut console = Console::new(Cursor::new("  b  \n"), Vec::new());
        assert_eq!(console.ask("> ").unwrap().as_deref(), Some("b"));
        assert_eq!(console.ask("> ").unwrap(), None);
    }
}
