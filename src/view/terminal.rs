use std::{
    io::{self, Write},
    sync::Mutex,
};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use super::{format::format_duration, LiveReading, Screen, TableModel, TOTAL_LABEL};

enum Mode {
    /// Draw immediately, keeping the live counter on one rewritten line.
    Inline,
    /// Keep only the latest frames until `present` is called.
    Deferred {
        table: Option<TableModel>,
        live: Option<LiveReading>,
    },
}

pub struct TerminalScreen {
    mode: Mutex<Mode>,
}

impl TerminalScreen {
    pub fn inline() -> Self {
        Self {
            mode: Mutex::new(Mode::Inline),
        }
    }

    pub fn deferred() -> Self {
        Self {
            mode: Mutex::new(Mode::Deferred {
                table: None,
                live: None,
            }),
        }
    }

    /// Prints the latest deferred frames. Does nothing in inline mode.
    pub fn present(&self) -> io::Result<()> {
        let (table, live) = match &*self.lock() {
            Mode::Inline => return Ok(()),
            Mode::Deferred { table, live } => (table.clone(), *live),
        };

        let mut out = io::stdout().lock();
        if let Some(table) = table {
            out.write_all(render_table(&table).as_bytes())?;
        }
        if let Some(live) = live {
            writeln!(out, "{}", render_live(&live))?;
        }
        out.flush()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mode> {
        match self.mode.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Screen for TerminalScreen {
    fn show_table(&self, table: &TableModel) {
        match &mut *self.lock() {
            Mode::Inline => {
                // Clear the live line first so the table starts on a fresh row.
                let _ = redraw_line(&mut io::stdout().lock(), &render_table(table));
            }
            Mode::Deferred { table: slot, .. } => *slot = Some(table.clone()),
        }
    }

    fn show_live(&self, reading: &LiveReading) {
        match &mut *self.lock() {
            Mode::Inline => {
                let _ = redraw_line(&mut io::stdout().lock(), &render_live(reading));
            }
            Mode::Deferred { live, .. } => *live = Some(*reading),
        }
    }
}

/// Overwrites the current terminal line with `text`.
fn redraw_line<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(text)
    )?;
    out.flush()
}

pub fn render_table(table: &TableModel) -> String {
    if !table.visible {
        return String::new();
    }

    let mut out = format!(
        "{:>4}  {:<19}  {:<19}  {}\n",
        "#", "Start", "End", "Duration"
    );
    for row in &table.rows {
        let marker = if row.deletable {
            row.index.to_string()
        } else {
            "*".to_string()
        };
        let duration = row
            .duration
            .clone()
            .unwrap_or_else(|| if row.active { "(active)".into() } else { String::new() });
        out.push_str(&format!(
            "{:>4}  {:<19}  {:<19}  {}\n",
            marker,
            row.started,
            row.ended.as_deref().unwrap_or(""),
            duration
        ));
    }
    out
}

pub fn render_live(reading: &LiveReading) -> String {
    format!(
        "{}  {}: {}",
        format_duration(reading.current_ms),
        TOTAL_LABEL,
        format_duration(reading.total_ms)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::TableRow;

    #[test]
    fn hidden_table_renders_nothing() {
        assert_eq!(render_table(&TableModel::default()), "");
    }

    #[test]
    fn active_rows_have_no_delete_index() {
        let table = TableModel {
            visible: true,
            rows: vec![
                TableRow {
                    index: 1,
                    started: "b".into(),
                    ended: None,
                    duration: None,
                    active: true,
                    deletable: false,
                },
                TableRow {
                    index: 0,
                    started: "a".into(),
                    ended: Some("a2".into()),
                    duration: Some("00:00:04".into()),
                    active: false,
                    deletable: true,
                },
            ],
        };

        let rendered = render_table(&table);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].trim_start().starts_with('*'));
        assert!(lines[1].ends_with("(active)"));
        assert!(lines[2].trim_start().starts_with('0'));
        assert!(lines[2].ends_with("00:00:04"));
    }

    #[test]
    fn live_line_shows_both_counters() {
        let line = render_live(&LiveReading {
            running: true,
            current_ms: 4000,
            total_ms: 3_604_000,
        });
        assert_eq!(line, "00:00:04  Your Total Working Time: 01:00:04");
    }

    #[test]
    fn deferred_screen_keeps_latest_frames() {
        let screen = TerminalScreen::deferred();
        screen.show_live(&LiveReading::default());
        screen.show_live(&LiveReading {
            running: false,
            current_ms: 0,
            total_ms: 5,
        });

        let guard = screen.lock();
        match &*guard {
            Mode::Deferred { live, table } => {
                assert_eq!(live.map(|reading| reading.total_ms), Some(5));
                assert!(table.is_none());
            }
            Mode::Inline => panic!("expected deferred mode"),
        };
    }

    #[test]
    fn redraw_clears_the_line_before_writing() {
        let mut out = Vec::new();
        redraw_line(&mut out, "00:00:01").unwrap();

        let written = String::from_utf8(out).unwrap();
        assert!(written.starts_with('\x1b'));
        assert!(written.contains("2K"));
        assert!(written.ends_with("00:00:01"));
    }
}
