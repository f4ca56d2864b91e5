//! In-memory table produced by the parse stage.

use chrono::NaiveDateTime;

/// One parsed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Empty or unparseable.
    Null,
    /// Raw text.
    Text(String),
    /// Coerced number.
    Number(f64),
    /// Parsed date/time.
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Whether the cell holds no value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Cell rendered as text; `None` for nulls and blank text.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(n) => Some(n.to_string()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Cell as a number; text is cleaned and parsed on the fly.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => crate::numeric::parse_number(s),
            Self::Null | Self::DateTime(_) => None,
        }
    }

    /// Cell as a date/time.
    #[must_use]
    pub const fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

/// Column-named rows of [`Cell`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a table; short rows are padded with nulls and long rows
    /// truncated to the column count.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Column names, in file order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column named exactly `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether a column named exactly `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates over rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row { table: self, cells })
    }

    pub(crate) fn rename_column(&mut self, index: usize, name: &str) {
        if let Some(column) = self.columns.get_mut(index) {
            *column = name.to_string();
        }
    }

    pub(crate) fn column_cells_mut(&mut self, index: usize) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().filter_map(move |row| row.get_mut(index))
    }

    pub(crate) fn retain_rows(&mut self, keep: impl FnMut(&Vec<Cell>) -> bool) {
        self.rows.retain(keep);
    }
}

/// A borrowed row with by-name access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// Cell under column `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Cell> {
        self.table
            .column_index(name)
            .and_then(|idx| self.cells.get(idx))
    }

    /// Non-blank text under `name`.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Cell::as_text)
    }

    /// Number under `name`.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Cell::as_number)
    }

    /// Date/time under `name`.
    #[must_use]
    pub fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        self.get(name).and_then(Cell::as_datetime)
    }

    /// First non-blank text among `names`.
    #[must_use]
    pub fn first_text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    /// First number among `names`.
    #[must_use]
    pub fn first_number(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| self.number(name))
    }

    /// First date/time among `names`.
    #[must_use]
    pub fn first_datetime(&self, names: &[&str]) -> Option<NaiveDateTime> {
        names.iter().find_map(|name| self.datetime(name))
    }

    /// `(column, cell)` pairs in column order.
    pub fn cells(&self) -> impl Iterator<Item = (&'a str, &'a Cell)> {
        self.table
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["Name".to_string(), "Price".to_string(), "Alt".to_string()],
            vec![
                vec![Cell::Text(" WEST ".to_string()), Cell::Null],
                vec![
                    Cell::Text(String::new()),
                    Cell::Number(1.5),
                    Cell::Text("$2,000".to_string()),
                ],
            ],
        )
    }

    #[test]
    fn pads_short_rows() {
        let t = table();
        let first = t.rows().next().unwrap();
        assert_eq!(first.get("Alt"), Some(&Cell::Null));
        assert_eq!(first.text("Name").as_deref(), Some("WEST"));
    }

    #[test]
    fn falls_back_across_columns() {
        let t = table();
        let second = t.rows().nth(1).unwrap();
        assert_eq!(second.first_text(&["Name", "Alt"]).as_deref(), Some("$2,000"));
        assert_eq!(second.number("Alt"), Some(2000.0));
        assert_eq!(second.first_number(&["Missing", "Price"]), Some(1.5));
    }
}
