//! Interactive console channel (rustyline + colored)

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use super::HumanChannel;
use crate::session::{InputSpec, InputValues};

/// Reads answers from the terminal
///
/// Values passed to `with_prefill` answer the first matching field without
/// prompting, so `mb run --problem ...` skips that question.
pub struct ConsoleChannel {
    editor: DefaultEditor,
    prefill: InputValues,
}

impl ConsoleChannel {
    pub fn new() -> Result<Self> {
        debug!("ConsoleChannel::new: called");
        let editor = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self {
            editor,
            prefill: InputValues::new(),
        })
    }

    pub fn with_prefill(mut self, prefill: InputValues) -> Self {
        self.prefill = prefill;
        self
    }

    /// One line of input; `None` on Ctrl-D or Ctrl-C
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(&format!("{} ", prompt.bright_green())) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(Some(trimmed.to_string()))
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                debug!("ConsoleChannel::read_line: input closed");
                println!();
                Ok(None)
            }
            Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
        }
    }
}

impl HumanChannel for ConsoleChannel {
    fn collect(&mut self, spec: &InputSpec) -> Result<Option<InputValues>> {
        debug!(fields = spec.fields.len(), "ConsoleChannel::collect: called");
        if !spec.options.is_empty() {
            println!();
            for option in &spec.options {
                println!("  {} {}", format!("{}:", option.key).bold(), option.label);
            }
        }

        let mut values = InputValues::new();
        for field in &spec.fields {
            if let Some(value) = self.prefill.remove(&field.name) {
                println!("{} {}", field.prompt.bright_green(), value);
                values.insert(field.name.clone(), value);
                continue;
            }

            // Multi-line prompts are printed whole, then read after a short marker
            let prompt = if field.prompt.contains('\n') {
                println!("\n{}", field.prompt);
                ">"
            } else {
                field.prompt.as_str()
            };

            match self.read_line(prompt)? {
                Some(answer) => {
                    values.insert(field.name.clone(), answer);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(values))
    }

    fn show(&mut self, text: &str) {
        println!("\n{}", text.cyan());
    }

    fn alert(&mut self, text: &str) {
        if text.starts_with("Error") || text.starts_with("Invalid") {
            println!("{}", text.red());
        } else {
            println!("{}", text.yellow());
        }
    }

    fn confirm(&mut self, question: &str) -> Result<Option<bool>> {
        let Some(answer) = self.read_line(&format!("{question} [y/N]"))? else {
            return Ok(None);
        };
        Ok(Some(matches!(answer.to_lowercase().as_str(), "y" | "yes")))
    }
}
