//! Plain-text tables for pretty output.

use unicode_width::UnicodeWidthStr;

const COLUMN_SEPARATOR: &str = " │ ";
const CROSS: &str = "─┼─";
const ELLIPSIS: char = '…';

#[derive(Debug, Clone)]
enum Row {
    Cells(Vec<String>),
    Separator,
}

/// Table with a header row, data rows and optional separators.
///
/// Columns marked with [`Table::enable_auto_merge`] print a value only when it
/// differs from the row above, which groups related rows visually.
///
/// Every row spans all columns. Missing or empty trailing cells still get
/// their separator, so a short row ends in `│`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    title: Option<String>,
    header: Vec<String>,
    rows: Vec<Row>,
    merged_columns: Vec<usize>,
    max_width: Option<usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_header<I, S>(&mut self, header: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = header.into_iter().map(Into::into).collect();
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows
            .push(Row::Cells(cells.into_iter().map(Into::into).collect()));
    }

    pub fn add_separator(&mut self) {
        self.rows.push(Row::Separator);
    }

    pub fn enable_auto_merge(&mut self, columns: &[usize]) {
        self.merged_columns.extend_from_slice(columns);
    }

    /// Fit rows into `width` columns by shortening the widest cells.
    pub fn set_max_width(&mut self, width: usize) {
        self.max_width = Some(width);
    }

    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .filter_map(|row| match row {
                Row::Cells(cells) => Some(cells.len()),
                Row::Separator => None,
            })
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        let body = self.merged_rows();
        let mut widths = vec![0usize; columns];
        for cells in std::iter::once(&self.header).chain(body.iter().flatten()) {
            for (i, cell) in cells.iter().enumerate() {
                widths[i] = widths[i].max(cell_width(cell));
            }
        }
        if let Some(max) = self.max_width {
            shrink_to_fit(&mut widths, max);
        }

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        if !self.header.is_empty() {
            out.push_str(&render_line(&self.header, &widths));
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            out.push_str(rule.join(CROSS).trim_end());
            out.push('\n');
        }
        for row in &body {
            match row {
                Some(cells) => out.push_str(&render_line(cells, &widths)),
                None => {
                    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
                    out.push_str(rule.join(CROSS).trim_end());
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Data rows with auto-merged cells blanked. `None` is a separator.
    fn merged_rows(&self) -> Vec<Option<Vec<String>>> {
        let mut previous: Option<&Vec<String>> = None;
        self.rows
            .iter()
            .map(|row| match row {
                Row::Separator => {
                    previous = None;
                    None
                }
                Row::Cells(cells) => {
                    let mut shown = cells.clone();
                    if let Some(prev) = previous {
                        for &col in &self.merged_columns {
                            if cells.get(col).is_some() && cells.get(col) == prev.get(col) {
                                shown[col] = String::new();
                            }
                        }
                    }
                    previous = Some(cells);
                    Some(shown)
                }
            })
            .collect()
    }
}

fn cell_width(cell: &str) -> usize {
    cell.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let height = cells.iter().map(|c| c.lines().count().max(1)).max().unwrap_or(1);
    let mut out = String::new();
    for line_no in 0..height {
        let parts: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let text = cells
                    .get(i)
                    .and_then(|c| c.lines().nth(line_no))
                    .unwrap_or("");
                pad(&truncate(text, *width), *width)
            })
            .collect();
        out.push_str(parts.join(COLUMN_SEPARATOR).trim_end());
        out.push('\n');
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        let next = format!("{out}{ch}");
        if next.width() + 1 > width {
            break;
        }
        out = next;
    }
    out.push(ELLIPSIS);
    out
}

fn shrink_to_fit(widths: &mut [usize], max: usize) {
    let overhead = COLUMN_SEPARATOR.width() * widths.len().saturating_sub(1);
    while widths.iter().sum::<usize>() + overhead > max {
        let Some((idx, widest)) = widths
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|(_, w)| *w)
        else {
            return;
        };
        if widest <= 4 {
            return;
        }
        widths[idx] = widest - 1;
    }
}
