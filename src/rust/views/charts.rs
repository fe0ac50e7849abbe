use std::io::{self, Write};

/// Widest bar drawn, in characters.
pub(crate) const BAR_WIDTH: usize = 40;

/// Draws labelled horizontal bars scaled to the largest count.
pub(crate) fn bar_chart(out: &mut dyn Write, bars: &[(String, usize)]) -> io::Result<()> {
    let label_width = bars.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    let max = bars.iter().map(|(_, count)| *count).max().unwrap_or(0);

    for (label, count) in bars {
        let len = if max == 0 { 0 } else { (count * BAR_WIDTH + max - 1) / max };
        writeln!(out, "  {:>width$} | {:<bar$} {}", label, "#".repeat(len), count, width = label_width, bar = BAR_WIDTH)?;
    }
    Ok(())
}

/// Prints rows as a left-aligned table under a header line.
pub(crate) fn table(out: &mut dyn Write, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    writeln!(out, "{}", line(headers).trim_end())?;
    writeln!(out, "{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "))?;
    for row in rows {
        writeln!(out, "{}", line(row.as_slice()).trim_end())?;
    }
    Ok(())
}
