use crate::core::Operation;
use crate::utils::string::truncate;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};

const SUMMARY_WIDTH: usize = 60;

/// Formatter for tabular CLI output
pub struct TableDisplay {
    max_width: Option<usize>,
    use_colors: bool,
}

impl TableDisplay {
    /// Width follows the terminal when attached to one
    pub fn new() -> Self {
        Self {
            max_width: None,
            use_colors: true,
        }
    }

    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width.max(40));
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Dispatch table listing: name, accepted argument count, summary
    pub fn render_operations<'a>(&self, operations: impl IntoIterator<Item = &'a Operation>) -> String {
        let mut table = self.new_table(&["Name", "Args", "Summary"]);
        let mut count = 0;

        for op in operations {
            count += 1;
            table.add_row(vec![
                self.accent(Cell::new(op.name()), Color::Cyan),
                Cell::new(op.arity().to_string()),
                Cell::new(truncate(op.summary(), SUMMARY_WIDTH, "...")),
            ]);
        }

        format!("{}\n{} operations", table, count)
    }

    /// Key/value listing for `config show`
    pub fn render_key_values(&self, entries: &[(&str, String)]) -> String {
        let mut table = self.new_table(&["Key", "Value"]);
        for (key, value) in entries {
            table.add_row(vec![
                self.accent(Cell::new(key), Color::Cyan),
                Cell::new(value),
            ]);
        }
        table.to_string()
    }

    fn new_table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        if self.use_colors {
            table.set_header(headers.iter().map(|h| {
                Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Green)
            }));
        } else {
            table.set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
        }
        table
    }

    fn accent(&self, cell: Cell, color: Color) -> Cell {
        if self.use_colors { cell.fg(color) } else { cell }
    }
}

impl Default for TableDisplay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Registry;

    fn plain() -> TableDisplay {
        TableDisplay::new().with_colors(false).with_max_width(120)
    }

    #[test]
    fn test_table_display_creation() {
        let display = TableDisplay::new();
        assert!(display.use_colors);
        assert!(display.max_width.is_none());
        assert_eq!(TableDisplay::new().with_max_width(10).max_width, Some(40));
    }

    #[test]
    fn test_render_operations() {
        let registry = Registry::builtin();
        let output = plain().render_operations(registry.operations());

        assert!(output.contains("Name"));
        assert!(output.contains("group_by"));
        assert!(output.ends_with(&format!("{} operations", registry.len())));
    }

    #[test]
    fn test_render_key_values() {
        let output = plain().render_key_values(&[("template.missing", "error".to_string())]);
        assert!(output.contains("template.missing"));
        assert!(output.contains("error"));
    }
}
