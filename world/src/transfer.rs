//! Text serialization of game states.
//!
//! The persisted form is a single line suitable for clipboard or key-value
//! storage: `twenty48:v1:<size>x<size>:<base64 of JSON payload>`. Decoding
//! re-validates everything the payload claims — the embedded configuration,
//! the declared dimensions, and the grid's structural invariants — and names
//! the violated rule in its error instead of silently coercing.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use twenty48_core::{validate_game_config, CellCoord, ConfigError, Grid};

use crate::GameState;

const SNAPSHOT_DOMAIN: &str = "twenty48";
const SNAPSHOT_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Encodes the full game state into a single-line string.
#[must_use]
pub fn serialize_game_state(state: &GameState) -> String {
    let json = serde_json::to_vec(state).expect("game state serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    let size = state.grid.size();
    format!("{SNAPSHOT_DOMAIN}:{SNAPSHOT_VERSION}:{size}x{size}:{encoded}")
}

/// Decodes a game state from its serialized string representation.
pub fn deserialize_game_state(value: &str) -> Result<GameState, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
    let version = parts.next().ok_or(TransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(TransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let declared_size = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(TransferError::InvalidEncoding)?;
    let state: GameState =
        serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

    let violations = validate_game_config(&state.config);
    if !violations.is_empty() {
        return Err(TransferError::InvalidConfig(ConfigError::new(violations)));
    }
    if state.grid.size() != declared_size {
        return Err(TransferError::DimensionMismatch {
            declared: declared_size,
            actual: state.grid.size(),
        });
    }
    verify_state(&state)?;

    Ok(state)
}

/// Errors that can occur while decoding a serialized game state.
#[derive(Debug)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded state.
    MissingPrefix,
    /// The encoded state did not contain a version segment.
    MissingVersion,
    /// The encoded state did not include grid dimensions.
    MissingDimensions,
    /// The encoded state did not include the payload segment.
    MissingPayload,
    /// The encoded state used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded state used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded state.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// The embedded configuration failed validation.
    InvalidConfig(ConfigError),
    /// The declared dimensions disagree with the payload's grid.
    DimensionMismatch {
        /// Edge length named in the header.
        declared: u32,
        /// Edge length the payload's grid actually has.
        actual: u32,
    },
    /// The payload's grid violates a structural invariant.
    CorruptGrid(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "serialized state was empty"),
            Self::MissingPrefix => write!(f, "serialized state is missing the prefix"),
            Self::MissingVersion => write!(f, "serialized state is missing the version"),
            Self::MissingDimensions => {
                write!(f, "serialized state is missing the grid dimensions")
            }
            Self::MissingPayload => write!(f, "serialized state is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "state prefix '{prefix}' is not supported")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "state version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode state payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse state payload: {error}")
            }
            Self::InvalidConfig(error) => write!(f, "{error}"),
            Self::DimensionMismatch { declared, actual } => write!(
                f,
                "header declares a {declared}x{declared} grid but the payload carries {actual}x{actual}"
            ),
            Self::CorruptGrid(detail) => write!(f, "grid invariant violated: {detail}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidConfig(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<u32, TransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| TransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || columns != rows {
        return Err(TransferError::InvalidDimensions(dimensions.to_owned()));
    }

    Ok(columns)
}

/// Re-checks the structural invariants of a decoded state and every history
/// entry nested inside it.
fn verify_state(state: &GameState) -> Result<(), TransferError> {
    verify_grid(&state.grid, state.config.grid_size)?;
    for previous in &state.previous_states {
        verify_state(previous)?;
    }
    Ok(())
}

fn verify_grid(grid: &Grid, expected_size: u32) -> Result<(), TransferError> {
    if grid.size() != expected_size {
        return Err(TransferError::CorruptGrid(format!(
            "grid edge {} does not match the configured size {expected_size}",
            grid.size()
        )));
    }

    let expected_cells = usize::try_from(u64::from(expected_size) * u64::from(expected_size))
        .unwrap_or(usize::MAX);
    if grid.cell_count() != expected_cells {
        return Err(TransferError::CorruptGrid(format!(
            "grid backing store holds {} slots instead of {expected_cells}",
            grid.cell_count()
        )));
    }

    for row in 0..grid.size() {
        for column in 0..grid.size() {
            let cell = CellCoord::new(column, row);
            let Some(tile) = grid.tile(cell) else {
                continue;
            };
            if tile.cell != cell {
                return Err(TransferError::CorruptGrid(format!(
                    "tile in slot ({column}, {row}) records cell ({}, {})",
                    tile.cell.column(),
                    tile.cell.row()
                )));
            }
            if tile.value < 2 || !tile.value.is_power_of_two() {
                return Err(TransferError::CorruptGrid(format!(
                    "tile at ({column}, {row}) carries non-power-of-two value {}",
                    tile.value
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use twenty48_core::{GameConfig, GameStatus, Tile, TileIdAllocator};

    fn crafted_state() -> GameState {
        let mut ids = TileIdAllocator::new();
        let mut grid = Grid::empty(4);
        for (value, column, row) in [(2, 0, 0), (4, 1, 0), (256, 3, 3)] {
            grid.place(Tile {
                id: ids.allocate(),
                value,
                cell: CellCoord::new(column, row),
                merged_from: None,
            });
        }

        let base = GameState {
            grid: grid.clone(),
            score: 24,
            status: GameStatus::Playing,
            move_count: 3,
            previous_states: Vec::new(),
            config: GameConfig::default(),
            won_and_continued: false,
        };

        let mut with_history = base.clone();
        with_history.previous_states.push(base);
        with_history.score = 32;
        with_history.move_count = 4;
        with_history
    }

    #[test]
    fn round_trip_preserves_the_full_state() {
        let state = crafted_state();
        let encoded = serialize_game_state(&state);
        assert!(encoded.starts_with("twenty48:v1:4x4:"));

        let decoded = deserialize_game_state(&encoded).expect("state decodes");
        assert_eq!(decoded, state);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            deserialize_game_state("   "),
            Err(TransferError::EmptyPayload)
        ));
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        assert!(matches!(
            deserialize_game_state("sudoku:v1:4x4:e30"),
            Err(TransferError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        assert!(matches!(
            deserialize_game_state("twenty48:v9:4x4:e30"),
            Err(TransferError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn malformed_dimensions_are_rejected() {
        assert!(matches!(
            deserialize_game_state("twenty48:v1:4by4:e30"),
            Err(TransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            deserialize_game_state("twenty48:v1:4x5:e30"),
            Err(TransferError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            deserialize_game_state("twenty48:v1:4x4:!!!"),
            Err(TransferError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let encoded = STANDARD_NO_PAD.encode(b"{\"score\": \"many\"}");
        let input = format!("twenty48:v1:4x4:{encoded}");
        assert!(matches!(
            deserialize_game_state(&input),
            Err(TransferError::InvalidPayload(_))
        ));
    }

    #[test]
    fn embedded_config_is_revalidated() {
        let mut state = crafted_state();
        state.config.grid_size = 2;
        // Bypass serialize_game_state's honest header to exercise the config
        // check in isolation.
        let json = serde_json::to_vec(&state).expect("serialize");
        let input = format!("twenty48:v1:4x4:{}", STANDARD_NO_PAD.encode(json));

        match deserialize_game_state(&input) {
            Err(TransferError::InvalidConfig(error)) => {
                assert!(!error.violations().is_empty());
            }
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn header_and_payload_dimensions_must_agree() {
        let state = crafted_state();
        let json = serde_json::to_vec(&state).expect("serialize");
        let input = format!("twenty48:v1:5x5:{}", STANDARD_NO_PAD.encode(json));

        match deserialize_game_state(&input) {
            Err(TransferError::DimensionMismatch { declared, actual }) => {
                assert_eq!(declared, 5);
                assert_eq!(actual, 4);
            }
            other => panic!("expected a dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn displaced_tiles_are_detected() {
        let state = crafted_state();
        let mut value = serde_json::to_value(&state).expect("serialize");
        let cells = value["grid"]["cells"]
            .as_array_mut()
            .expect("grid cells array");
        // Move the (0, 0) tile into a slot its recorded cell disagrees with.
        cells.swap(0, 5);

        let json = serde_json::to_vec(&value).expect("serialize");
        let input = format!("twenty48:v1:4x4:{}", STANDARD_NO_PAD.encode(json));
        assert!(matches!(
            deserialize_game_state(&input),
            Err(TransferError::CorruptGrid(_))
        ));
    }

    #[test]
    fn non_power_of_two_values_are_detected() {
        let mut state = crafted_state();
        let mut tile = state
            .grid
            .take(CellCoord::new(0, 0))
            .expect("crafted tile present");
        tile.value = 3;
        state.grid.place(tile);

        let json = serde_json::to_vec(&state).expect("serialize");
        let input = format!("twenty48:v1:4x4:{}", STANDARD_NO_PAD.encode(json));
        assert!(matches!(
            deserialize_game_state(&input),
            Err(TransferError::CorruptGrid(_))
        ));
    }
}
