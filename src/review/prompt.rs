//! Line-based review prompt over any reader/writer pair

use super::picker::Picker;
use crate::model::NetworkDependency;
use std::io::{self, BufRead, Write};

const HELP: &str =
    "Enter numbers to toggle (e.g. 1 3,4), a = all, n = none, ENTER = generate, q = quit";

fn draw<W: Write>(writer: &mut W, picker: &Picker) -> io::Result<()> {
    writeln!(
        writer,
        "segspec: {} dependencies found ({} selected)\n",
        picker.len(),
        picker.selected_count()
    )?;
    for index in 0..picker.len() {
        if let Some(line) = picker.line(index) {
            writeln!(writer, "{:>3}. {}", index + 1, line)?;
        }
    }
    writeln!(writer, "\n{}", HELP)?;
    write!(writer, "> ")?;
    writer.flush()
}

/// Lets the user choose which dependencies to keep.
///
/// Returns `Ok(None)` when the user quits or input ends without confirming.
pub fn run_prompt<R, W>(
    reader: R,
    writer: &mut W,
    deps: Vec<NetworkDependency>,
) -> io::Result<Option<Vec<NetworkDependency>>>
where
    R: BufRead,
    W: Write,
{
    let mut picker = Picker::new(deps);
    draw(writer, &picker)?;

    for line in reader.lines() {
        let line = line?;
        let command = line.trim();

        match command {
            "" => return Ok(Some(picker.selected())),
            "q" | "quit" => return Ok(None),
            "a" => picker.select_all(),
            "n" => picker.select_none(),
            _ => {
                for token in command
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                {
                    match token.parse::<usize>() {
                        Ok(n) if n >= 1 => picker.toggle(n - 1),
                        _ => writeln!(writer, "ignoring {:?}", token)?,
                    }
                }
            }
        }
        draw(writer, &picker)?;
    }

    Ok(None)
}
