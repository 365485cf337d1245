use std::path::Path;

use crate::error::StandError;
use crate::models::Polygon;

use super::YieldRow;

/// Read polygons from a JSON file holding an array of polygons.
pub fn read_json(path: impl AsRef<Path>) -> Result<Vec<Polygon>, StandError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let polygons: Vec<Polygon> = serde_json::from_str(&content)?;
    Ok(polygons)
}

/// Read polygons from JSON bytes.
pub fn read_json_from_bytes(data: &[u8]) -> Result<Vec<Polygon>, StandError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| StandError::Parse(format!("Invalid UTF-8: {e}")))?;
    let polygons: Vec<Polygon> = serde_json::from_str(content)?;
    Ok(polygons)
}

/// Write yield-table rows to a JSON file.
pub fn write_json(rows: &[YieldRow], path: impl AsRef<Path>, pretty: bool) -> Result<(), StandError> {
    let content = if pretty {
        serde_json::to_string_pretty(rows)?
    } else {
        serde_json::to_string(rows)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}
