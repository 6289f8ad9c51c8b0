//! Tabular data pasted from spreadsheets, and `Table.input` expressions built from it.

use crate::construct::{Ident, TextLiteral, Vector};
use crate::error::{AstError, AstResult};
use crate::module::MutableModule;
use crate::node::Owned;
use crate::pattern::Pattern;
use csv::{ReaderBuilder, Terminator, WriterBuilder};

pub const DEFAULT_COLUMN_PREFIX: &str = "Column #";
pub const NOTHING_NAME: &str = "Nothing";

fn tsv_error(err: csv::Error) -> AstError {
    AstError::InvalidTsv(err.to_string())
}

/// Every row must have as many cells as the first one.
fn check_columns(rows: &[Vec<String>]) -> AstResult<()> {
    let Some(expected) = rows.first().map(Vec::len) else {
        return Ok(());
    };
    match rows.iter().enumerate().find(|(_, row)| row.len() != expected) {
        Some((index, row)) => Err(AstError::InconsistentColumns {
            row: index,
            expected,
            found: row.len(),
        }),
        None => Ok(()),
    }
}

/// Parse tab-separated data with RFC 4180 quoting. Every row must have the same number of cells.
pub fn parse_tsv_data(text: &str) -> AstResult<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let rows = reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(tsv_error)
        })
        .collect::<AstResult<Vec<Vec<String>>>>()?;
    check_columns(&rows)?;
    Ok(rows)
}

/// Serialize rows as tab-separated data; the inverse of [`parse_tsv_data`].
pub fn rows_to_tsv(rows: &[Vec<String>]) -> AstResult<String> {
    check_columns(rows)?;
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row).map_err(tsv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| AstError::InvalidTsv(err.error().to_string()))?;
    String::from_utf8(bytes).map_err(|err| AstError::InvalidTsv(err.to_string()))
}

fn column_name(column_names: Option<&[String]>, index: usize) -> String {
    column_names
        .and_then(|names| names.get(index))
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("{DEFAULT_COLUMN_PREFIX}{}", index + 1))
}

fn cell_value(module: &mut MutableModule, cell: &str) -> AstResult<Owned> {
    if cell.is_empty() {
        Ident::new(module, NOTHING_NAME)
    } else {
        Ok(TextLiteral::new(module, cell))
    }
}

/// Code of a `Table.input` expression producing a table with the given rows.
/// Empty cells become `Nothing`; columns without a name are numbered.
pub fn table_to_enso_expression(rows: &[Vec<String>], column_names: Option<&[String]>) -> AstResult<String> {
    check_columns(rows)?;
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let mut module = MutableModule::transient();

    let mut columns = Vec::with_capacity(width);
    for index in 0..width {
        let name = TextLiteral::new(&mut module, &column_name(column_names, index));
        let values = rows
            .iter()
            .map(|row| cell_value(&mut module, &row[index]))
            .collect::<AstResult<Vec<_>>>()?;
        let values = Vector::new(&mut module, values);
        columns.push(Vector::new(&mut module, vec![name, values]));
    }
    let table = Vector::new(&mut module, columns);

    let pattern = Pattern::parse_expression("Table.input __")?;
    let expression = pattern.instantiate(&mut module, vec![table])?;
    Ok(module.get_version(expression.id())?.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expression_for(tsv: &str) -> String {
        let rows = parse_tsv_data(tsv).unwrap();
        table_to_enso_expression(&rows, None).unwrap()
    }

    #[test]
    fn test_empty_cell() {
        assert_eq!(
            expression_for("1\t2\n3\t"),
            "Table.input [['Column #1', ['1', '3']], ['Column #2', ['2', Nothing]]]"
        );
    }

    #[test]
    fn test_line_feed_in_cell() {
        assert_eq!(
            expression_for("1\t\"2\n3\"\n4\t5"),
            "Table.input [['Column #1', ['1', '4']], ['Column #2', ['2\\n3', '5']]]"
        );
    }

    #[test]
    fn test_quotes_in_quoted_cell() {
        assert_eq!(
            expression_for("1\t4\n2\t\"\"\"5\n6\"\"\""),
            "Table.input [['Column #1', ['1', '2']], ['Column #2', ['4', '\"5\\n6\"']]]"
        );
    }

    #[test]
    fn test_non_ascii_cell() {
        assert_eq!(
            expression_for("ðŒ†\tx"),
            "Table.input [['Column #1', ['ðŒ†']], ['Column #2', ['x']]]"
        );
    }

    #[test]
    fn test_many_rows_with_empty_cells() {
        let tsv = ["\t36\t52", "11\t\t4.7", "30\t1.2\t"].join("\n");
        assert_eq!(
            expression_for(&tsv),
            "Table.input [['Column #1', [Nothing, '11', '30']], ['Column #2', ['36', Nothing, '1.2']], ['Column #3', ['52', '4.7', Nothing]]]"
        );
    }

    #[test]
    fn test_column_names() {
        let rows = vec![vec!["1".to_string(), "2".to_string()]];
        let names = vec!["Id".to_string(), String::new()];
        assert_eq!(
            table_to_enso_expression(&rows, Some(&names)).unwrap(),
            "Table.input [['Id', ['1']], ['Column #2', ['2']]]"
        );
    }

    #[test]
    fn test_inconsistent_rows() {
        assert_eq!(
            parse_tsv_data("a\tb\nc"),
            Err(AstError::InconsistentColumns { row: 1, expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_trailing_newline_and_crlf() {
        let rows = parse_tsv_data("a\tb\r\nc\td\r\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_tsv_roundtrip_with_special_cells() {
        let rows = vec![
            vec!["plain".to_string(), "tab\there".to_string()],
            vec!["quote \"q\"".to_string(), "line\nbreak".to_string()],
        ];
        assert_eq!(parse_tsv_data(&rows_to_tsv(&rows).unwrap()).unwrap(), rows);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let rows = vec![vec!["it's".to_string()], vec!["a\\b".to_string(), "x".to_string()]];
        let expected = Err(AstError::InconsistentColumns { row: 1, expected: 1, found: 2 });
        assert_eq!(table_to_enso_expression(&rows, None), expected);
        assert_eq!(rows_to_tsv(&rows), expected);
    }
}
