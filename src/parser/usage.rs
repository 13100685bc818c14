use std::io::Write;

use terminal_size::{terminal_size, Width};

use crate::api::CmdDesc;
use crate::model::Arity;
use crate::params::ParamInfo;
use crate::parser::run::RunState;

// The description column never shrinks below this, even in a tiny terminal.
const MINIMUM_WRAP_WIDTH: usize = 20;
const FALLBACK_TOTAL_WIDTH: usize = 100;
const INDENT: usize = 4;
const PADDING: usize = 4;

/// Print the full usage page: accumulated errors, the usage line, and the
/// command/argument/flag listings.  Hidden parameters are filtered here;
/// advanced flags appear only when `--advanced` was given.
pub(crate) fn print_usage(w: &mut dyn Write, st: &RunState<'_>, desc: &CmdDesc<'_>) {
    let mut tab = Tabulator::default();

    if !st.errors.is_empty() {
        tab.line("Errors:");
        for error in &st.errors {
            for line in error.to_string().split('\n') {
                let line = line.replace('\t', "    ");
                tab.line(format!("    {line}"));
            }
        }
        tab.line("");
    }

    tab.line("Usage:");
    tab.line(usage_line(st, desc));

    if !desc.short.is_empty() {
        tab.line("");
        tab.line(format!("    {}", desc.short));
    }
    if !desc.long.is_empty() {
        tab.line("");
        for line in desc.long.split('\n') {
            tab.line(format!("    {line}"));
        }
    }

    tab.section("Available commands:");
    for child in &desc.children {
        tab.cells(vec![child.name.clone(), child.short.clone()]);
    }

    tab.section("Arguments:");
    for p in st.pos.params() {
        tab.cells(vec![p.name.clone(), p.desc.clone()]);
    }

    tab.section("Flags:");
    for entry in st.flags.entries() {
        flag_row(&mut tab, entry.as_ref(), st.advanced);
    }

    tab.section("Global flags:");
    for entry in st.gflags.entries() {
        flag_row(&mut tab, entry.as_ref(), st.advanced);
    }

    if !desc.children.is_empty() {
        tab.line("");
        tab.line(format!(
            "Use \"{} [command] --help\" for more information about a command.",
            st.name()
        ));
    }

    let _ = tab.flush(w);
}

/// Print the `--summary` listing: the full path and short help of every
/// executable command under the matched node, in tree order.
pub(crate) fn print_summary(w: &mut dyn Write, st: &RunState<'_>, desc: &CmdDesc<'_>) {
    let mut tab = Tabulator::default();
    tab.line("Available commands:");

    let mut path = st.names.clone();
    summarize(&mut tab, &mut path, desc);

    let _ = tab.flush(w);
}

fn summarize(tab: &mut Tabulator, path: &mut Vec<String>, desc: &CmdDesc<'_>) {
    for child in &desc.children {
        path.push(child.name.clone());
        if child.cmd.is_some() {
            tab.cells(vec![path.join(" "), child.short.clone()]);
        }
        summarize(tab, path, child);
        path.pop();
    }
}

fn usage_line(st: &RunState<'_>, desc: &CmdDesc<'_>) -> String {
    let mut line = format!("    {}", st.name());

    let mut required = 0;
    for p in st.flags.params() {
        if p.hidden {
            continue;
        }
        let (open, close) = if p.required {
            required += 1;
            ('<', '>')
        } else if st.advanced {
            ('[', ']')
        } else {
            continue;
        };
        let label = match &p.type_label {
            Some(label) => format!(" {label}"),
            None => String::new(),
        };
        let repeat = if p.arity == Arity::Repeated { " ..." } else { "" };
        line.push_str(&format!(" {open}--{}{label}{repeat}{close}", p.name));
    }
    if !st.advanced && st.flags.count() > required {
        line.push_str(" [flags]");
    }

    let mut optionals = 0;
    for p in st.pos.params() {
        match p.arity {
            Arity::Repeated => line.push_str(&format!(" [{} ...]", p.name)),
            Arity::Optional => {
                line.push_str(&format!(" [{}", p.name));
                optionals += 1;
            }
            Arity::Single => line.push_str(&format!(" <{}>", p.name)),
        }
    }
    line.push_str(&"]".repeat(optionals));

    if !desc.children.is_empty() {
        line.push_str(" [command]");
    }

    line
}

fn flag_row(tab: &mut Tabulator, entry: Option<&ParamInfo>, advanced: bool) {
    let p = match entry {
        // A separator between flag listings.
        None => {
            tab.cells(Vec::new());
            return;
        }
        Some(p) => p,
    };
    if p.hidden || (p.advanced && !advanced) {
        return;
    }

    let short = match p.short {
        Some(c) => format!("-{c}, "),
        None => "    ".to_string(),
    };
    let label = match &p.type_label {
        Some(label) => format!(" {label}"),
        None => String::new(),
    };
    let left = format!("{short}--{}{label}", p.name);

    let mut right = p.desc.clone();
    if p.required {
        right.push_str(" (required)");
    }
    if p.arity == Arity::Repeated {
        right.push_str(" (repeated)");
    }
    if let Some(var) = &p.env_var {
        right.push_str(&format!(" (env {var})"));
    }
    if let Some(default) = &p.default_display {
        right.push_str(&format!(" (default {default})"));
    }

    tab.cells(vec![left, right.trim_start().to_string()]);
}

enum Row {
    Line(String),
    Cells(Vec<String>),
}

/// Buffers verbatim lines and cell rows, then writes them with the cell
/// columns aligned across the whole page and the final column word-wrapped
/// to the terminal width.  Plays the role the original's tab-alignment
/// writer did, sized from content.
#[derive(Default)]
struct Tabulator {
    rows: Vec<Row>,
    pending_header: Option<String>,
}

impl Tabulator {
    fn line(&mut self, text: impl Into<String>) {
        self.rows.push(Row::Line(text.into()));
    }

    /// Begin a section: the header is only printed if a row follows it.
    fn section(&mut self, header: &str) {
        self.pending_header = Some(header.to_string());
    }

    fn cells(&mut self, cells: Vec<String>) {
        if let Some(header) = self.pending_header.take() {
            self.line("");
            self.line(header);
        }
        self.rows.push(Row::Cells(cells));
    }

    fn flush(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let mut widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            if let Row::Cells(cells) = row {
                for (i, cell) in cells.iter().enumerate() {
                    if i + 1 == cells.len() {
                        continue;
                    }
                    if widths.len() <= i {
                        widths.resize(i + 1, 0);
                    }
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let total = terminal_size()
            .map(|(Width(w), _)| w as usize)
            .unwrap_or(FALLBACK_TOTAL_WIDTH);

        for row in &self.rows {
            match row {
                Row::Line(text) => writeln!(w, "{text}")?,
                Row::Cells(cells) if cells.is_empty() => writeln!(w)?,
                Row::Cells(cells) => {
                    let mut line = " ".repeat(INDENT);
                    for (i, cell) in cells.iter().enumerate() {
                        if i + 1 < cells.len() {
                            let width = widths[i] + PADDING;
                            line.push_str(&format!("{cell:<width$}"));
                        }
                    }
                    let start = line.len();
                    let width = total.saturating_sub(start).max(MINIMUM_WRAP_WIDTH);
                    let parts = wrap(cells.last().expect("cells is non-empty"), width);
                    if parts.is_empty() {
                        writeln!(w, "{}", line.trim_end())?;
                    } else {
                        for (i, part) in parts.iter().enumerate() {
                            if i == 0 {
                                writeln!(w, "{line}{part}")?;
                            } else {
                                writeln!(w, "{}{part}", " ".repeat(start))?;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Word-wrap to the given width.  A word longer than the width overflows on
/// its own line rather than being hyphenated.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ') {
        if word.is_empty() {
            continue;
        }
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
