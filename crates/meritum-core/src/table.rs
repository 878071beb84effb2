//! Table locator: finds ledger tables inside a sheet snapshot.
//!
//! A sheet is read once as a grid of cell strings. It may hold several
//! stacked tables, each introduced by an ALL-CAPS section label row and a
//! header row carrying the `Name`/`Merits`/`Rank` columns. Column positions
//! are discovered by label, never assumed by position.

use crate::error::{Error, Result};

/// Bulk snapshot of one sheet: rows of cell strings, as returned by the
/// spreadsheet service's "all values" read.
pub type Grid = Vec<Vec<String>>;

const NAME_LABEL: &str = "Name";
const MERITS_LABEL: &str = "Merits";
const RANK_LABEL: &str = "Rank";

/// One located ledger table: header coordinates plus the data row range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Section label above the header, if any (e.g. `SEVENTH REGIMENT`)
    pub section: Option<String>,
    /// 0-based grid row of the header
    pub header_row: usize,
    /// First data row (header + 1)
    pub data_start: usize,
    /// One past the last data row
    pub data_end: usize,
    /// Column index of the `Name` label
    pub name_col: usize,
    /// Column index of the `Merits` label
    pub merits_col: usize,
    /// Column index of the `Rank` label
    pub rank_col: usize,
}

impl Table {
    /// Locate every table in the grid, in row order.
    #[must_use]
    pub fn locate_all(grid: &Grid) -> Vec<Table> {
        let mut tables = Vec::new();
        let mut section: Option<String> = None;
        let mut row = 0;
        while row < grid.len() {
            if let Some((name_col, merits_col, rank_col)) = header_columns(&grid[row]) {
                let data_start = row + 1;
                let mut data_end = data_start;
                while data_end < grid.len()
                    && !is_section_label(&grid[data_end])
                    && header_columns(&grid[data_end]).is_none()
                {
                    data_end += 1;
                }
                tables.push(Table {
                    section: section.take(),
                    header_row: row,
                    data_start,
                    data_end,
                    name_col,
                    merits_col,
                    rank_col,
                });
                row = data_end;
            } else {
                if is_section_label(&grid[row]) {
                    section = Some(grid[row][0].trim().to_string());
                }
                row += 1;
            }
        }
        tables
    }

    /// Locate the first table, failing with [`Error::HeadersNotFound`]
    /// when the grid has none.
    pub fn locate(grid: &Grid, sheet_name: &str) -> Result<Table> {
        Self::locate_all(grid)
            .into_iter()
            .next()
            .ok_or_else(|| Error::HeadersNotFound {
                sheet: sheet_name.to_string(),
            })
    }

    /// Locate the table under the given section label. A sheet whose
    /// tables carry no labels at all holds a single anonymous table, so the
    /// first one is returned; when labels exist and none matches, the
    /// lookup fails rather than route rows into another section's table.
    pub fn locate_section(grid: &Grid, sheet_name: &str, section: &str) -> Result<Table> {
        let mut tables = Table::locate_all(grid);
        if tables.is_empty() {
            return Err(Error::HeadersNotFound {
                sheet: sheet_name.to_string(),
            });
        }
        let wanted = tables.iter().position(|t| {
            t.section
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(section))
        });
        match wanted {
            Some(i) => Ok(tables.swap_remove(i)),
            None if tables.iter().all(|t| t.section.is_none()) => Ok(tables.swap_remove(0)),
            None => Err(Error::SectionNotFound {
                sheet: sheet_name.to_string(),
                section: section.to_string(),
            }),
        }
    }

    /// Trimmed name-column values per data row, in row order. Blank entries
    /// are free slots available for a new ledger row.
    pub fn identities<'a>(&'a self, grid: &'a Grid) -> impl Iterator<Item = &'a str> + 'a {
        grid[self.data_start..self.data_end.min(grid.len())]
            .iter()
            .map(|row| row.get(self.name_col).map_or("", |c| c.trim()))
    }

    /// Cell content at (data row, column), trimmed; empty when absent
    #[must_use]
    pub fn cell<'a>(&self, grid: &'a Grid, row: usize, col: usize) -> &'a str {
        grid.get(row)
            .and_then(|r| r.get(col))
            .map_or("", |c| c.trim())
    }
}

/// Order-independent header discovery: all three labels present in one row
fn header_columns(row: &[String]) -> Option<(usize, usize, usize)> {
    let find = |label: &str| row.iter().position(|c| c.trim() == label);
    Some((find(NAME_LABEL)?, find(MERITS_LABEL)?, find(RANK_LABEL)?))
}

/// A section boundary: first cell is an upper-case token and the rest of
/// the row is blank. Distinguishes `SEVENTH REGIMENT` from a data row whose
/// name merely happens to be capitalized.
fn is_section_label(row: &[String]) -> bool {
    let Some(first) = row.first() else {
        return false;
    };
    let label = first.trim();
    if label.is_empty()
        || !label.chars().any(|c| c.is_alphabetic())
        || label.chars().any(|c| c.is_lowercase())
    {
        return false;
    }
    row[1..].iter().all(|c| c.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_locate_single_table() {
        let g = grid(&[
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
            &["Mara", "40", "Corporal"],
        ]);
        let t = Table::locate(&g, "main").unwrap();
        assert_eq!(t.header_row, 0);
        assert_eq!(t.data_start, 1);
        assert_eq!(t.data_end, 3);
        assert_eq!((t.name_col, t.merits_col, t.rank_col), (0, 1, 2));
    }

    #[test]
    fn test_columns_discovered_by_label_not_position() {
        let g = grid(&[
            &["Rank", "Name", "Joined", "Merits"],
            &["Private", "Kael", "May", "12"],
        ]);
        let t = Table::locate(&g, "main").unwrap();
        assert_eq!((t.name_col, t.merits_col, t.rank_col), (1, 3, 0));
    }

    #[test]
    fn test_missing_label_is_headers_not_found() {
        let g = grid(&[&["Name", "Points", "Rank"], &["Kael", "12", "Private"]]);
        let err = Table::locate(&g, "special").unwrap_err();
        assert!(matches!(err, Error::HeadersNotFound { sheet } if sheet == "special"));
    }

    #[test]
    fn test_stacked_tables_split_on_section_labels() {
        let g = grid(&[
            &["SEVENTH REGIMENT"],
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
            &["", "", ""],
            &["AUXILIARY"],
            &["Name", "Merits", "Rank"],
            &["Mara", "40", "Corporal"],
        ]);
        let tables = Table::locate_all(&g);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].section.as_deref(), Some("SEVENTH REGIMENT"));
        assert_eq!(tables[0].data_end, 4);
        assert_eq!(tables[1].section.as_deref(), Some("AUXILIARY"));
        assert_eq!(tables[1].data_start, 6);
    }

    #[test]
    fn test_locate_section_on_unlabeled_sheet_takes_first() {
        let g = grid(&[&["Name", "Merits", "Rank"], &["Kael", "12", "Private"]]);
        let t = Table::locate_section(&g, "main", "AUXILIARY").unwrap();
        assert_eq!(t.header_row, 0);
    }

    #[test]
    fn test_locate_section_mismatched_label_is_an_error() {
        let g = grid(&[
            &["SEVENTH REGIMENT"],
            &["Name", "Merits", "Rank"],
            &["Kael", "12", "Private"],
        ]);
        let err = Table::locate_section(&g, "main", "AUXILIARY").unwrap_err();
        assert!(matches!(
            err,
            Error::SectionNotFound { section, .. } if section == "AUXILIARY"
        ));

        let t = Table::locate_section(&g, "main", "seventh regiment").unwrap();
        assert_eq!(t.data_start, 2);
    }

    #[test]
    fn test_identities_trim_and_keep_blanks() {
        let g = grid(&[
            &["Name", "Merits", "Rank"],
            &["  Kael  ", "12", "Private"],
            &["", "", ""],
            &["Mara", "40", "Corporal"],
        ]);
        let t = Table::locate(&g, "main").unwrap();
        let ids: Vec<&str> = t.identities(&g).collect();
        assert_eq!(ids, vec!["Kael", "", "Mara"]);
    }

    #[test]
    fn test_uppercase_data_row_is_not_a_boundary() {
        let g = grid(&[
            &["Name", "Merits", "Rank"],
            &["KAEL", "12", "Private"],
            &["Mara", "40", "Corporal"],
        ]);
        let t = Table::locate(&g, "main").unwrap();
        assert_eq!(t.data_end, 3);
    }
}
