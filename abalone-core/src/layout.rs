//! Starting layouts

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::board::{row_min_q, row_width, Hex, BOARD_RADIUS, ROW_COUNT};
use crate::error::LayoutError;
use crate::game::{Board, Player};

/// Offset rows, top row (I) first: 0 = empty, 1 = black, 2 = white
pub type LayoutRows = Vec<Vec<u8>>;

const STANDARD: [&[u8]; ROW_COUNT] = [
    &[1, 1, 1, 1, 1],
    &[1, 1, 1, 1, 1, 1],
    &[0, 0, 1, 1, 1, 0, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 0, 2, 2, 2, 0, 0],
    &[2, 2, 2, 2, 2, 2],
    &[2, 2, 2, 2, 2],
];

const GERMAN_DAISY: [&[u8]; ROW_COUNT] = [
    &[0, 0, 0, 0, 0],
    &[1, 1, 0, 0, 2, 2],
    &[1, 1, 1, 0, 2, 2, 2],
    &[0, 1, 1, 0, 0, 2, 2, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 2, 2, 0, 0, 1, 1, 0],
    &[2, 2, 2, 0, 1, 1, 1],
    &[2, 2, 0, 0, 1, 1],
    &[0, 0, 0, 0, 0],
];

const BELGIAN_DAISY: [&[u8]; ROW_COUNT] = [
    &[1, 1, 0, 2, 2],
    &[1, 1, 1, 2, 2, 2],
    &[0, 1, 1, 0, 2, 2, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 0, 0, 0, 0, 0, 0, 0],
    &[0, 2, 2, 0, 1, 1, 0],
    &[2, 2, 2, 1, 1, 1],
    &[2, 2, 0, 1, 1],
];

/// Built-in starting layouts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardLayout {
    Standard,
    #[default]
    GermanDaisy,
    BelgianDaisy,
}

impl BoardLayout {
    pub const ALL: [BoardLayout; 3] = [
        BoardLayout::Standard,
        BoardLayout::GermanDaisy,
        BoardLayout::BelgianDaisy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoardLayout::Standard => "standard",
            BoardLayout::GermanDaisy => "german_daisy",
            BoardLayout::BelgianDaisy => "belgian_daisy",
        }
    }

    pub fn rows(self) -> LayoutRows {
        let rows = match self {
            BoardLayout::Standard => &STANDARD,
            BoardLayout::GermanDaisy => &GERMAN_DAISY,
            BoardLayout::BelgianDaisy => &BELGIAN_DAISY,
        };
        rows.iter().map(|row| row.to_vec()).collect()
    }

    /// Fresh board in this layout
    pub fn setup_board(self) -> Board {
        let rows = self.rows();
        // Built-in rows are well formed
        Board::from_rows(&rows).unwrap_or_default()
    }
}

impl std::str::FromStr for BoardLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoardLayout::ALL
            .into_iter()
            .find(|layout| layout.name() == s.replace('-', "_"))
            .ok_or_else(|| format!("unknown layout: {}", s))
    }
}

/// Custom layout file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutFile {
    pub name: Option<String>,
    pub rows: LayoutRows,
}

impl LayoutFile {
    /// Load a JSON layout: either `{"name": .., "rows": [[..]]}` or a bare
    /// array of rows
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let content = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if let Ok(rows) = serde_json::from_str::<LayoutRows>(&content) {
            return Ok(Self { name: None, rows });
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_board(&self) -> Result<Board, LayoutError> {
        Board::from_rows(&self.rows)
    }
}

impl Board {
    /// Board from offset rows; the rows are also its starting layout
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Board, LayoutError> {
        if rows.len() != ROW_COUNT {
            return Err(LayoutError::RowCount {
                expected: ROW_COUNT,
                found: rows.len(),
            });
        }

        let mut pieces = Vec::new();
        for (row, line) in rows.iter().enumerate() {
            let r = row as i8 - BOARD_RADIUS;
            if line.len() != row_width(r) {
                return Err(LayoutError::RowWidth {
                    row,
                    expected: row_width(r),
                    found: line.len(),
                });
            }
            for (column, &value) in line.iter().enumerate() {
                let cell = Hex::new(row_min_q(r) + column as i8, r);
                match value {
                    0 => {}
                    1 => pieces.push((cell, Player::Black)),
                    2 => pieces.push((cell, Player::White)),
                    _ => return Err(LayoutError::CellValue { row, column, value }),
                }
            }
        }

        Ok(Board::from_pieces(&pieces))
    }

    /// Current position as offset rows
    pub fn to_rows(&self) -> LayoutRows {
        (-BOARD_RADIUS..=BOARD_RADIUS)
            .map(|r| {
                (0..row_width(r) as i8)
                    .map(|i| match self.get(Hex::new(row_min_q(r) + i, r)) {
                        Some(Player::Black) => 1,
                        Some(Player::White) => 2,
                        None => 0,
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_piece_counts() {
        for layout in BoardLayout::ALL {
            let board = layout.setup_board();
            assert_eq!(board.marble_count(Player::Black), 14, "{:?}", layout);
            assert_eq!(board.marble_count(Player::White), 14, "{:?}", layout);
            assert_eq!(board.score(Player::Black), 0);
            assert_eq!(board.score(Player::White), 0);
        }
    }

    #[test]
    fn test_rows_round_trip() {
        for layout in BoardLayout::ALL {
            assert_eq!(layout.setup_board().to_rows(), layout.rows());
        }
    }

    #[test]
    fn test_standard_orientation() {
        let board = BoardLayout::Standard.setup_board();
        assert_eq!(board.get("I5".parse().unwrap()), Some(Player::Black));
        assert_eq!(board.get("A1".parse().unwrap()), Some(Player::White));
        assert_eq!(board.get("E5".parse().unwrap()), None);
    }

    #[test]
    fn test_bad_rows_rejected() {
        let mut rows = BoardLayout::Standard.rows();
        rows[3].push(0);
        assert!(matches!(
            Board::from_rows(&rows),
            Err(LayoutError::RowWidth { row: 3, .. })
        ));

        let mut rows = BoardLayout::Standard.rows();
        rows[4][0] = 7;
        assert!(matches!(
            Board::from_rows(&rows),
            Err(LayoutError::CellValue { value: 7, .. })
        ));

        assert!(matches!(
            Board::from_rows(&[]),
            Err(LayoutError::RowCount { found: 0, .. })
        ));
    }

    #[test]
    fn test_layout_names() {
        for layout in BoardLayout::ALL {
            assert_eq!(layout.name().parse::<BoardLayout>().unwrap(), layout);
        }
        assert_eq!("german-daisy".parse::<BoardLayout>().unwrap(), BoardLayout::GermanDaisy);
        assert!("spiral".parse::<BoardLayout>().is_err());
    }
}
