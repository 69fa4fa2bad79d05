use crate::error::{Result, TableError};

/// Render a value for text output. `None` gives the shortest form that reads back exactly.
pub fn format_value(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.*}", p, value),
        None => value.to_string(),
    }
}

/// Parse one whitespace-delimited token as a float
pub fn parse_value(token: &str) -> Result<f64> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| TableError::Parse(format!("'{}' is not a number", token)))
}

/// Parse one token as a count or index
pub fn parse_count(token: &str, what: &str) -> Result<usize> {
    token
        .trim()
        .parse::<usize>()
        .map_err(|_| TableError::Parse(format!("expected {} but found '{}'", what, token)))
}

/// Column label for a 1-based column index (1=A, 2=B, ..., 27=AA)
pub fn letters_from_col(col: usize) -> String {
    let mut col = col;
    let mut buf = Vec::new();
    while col > 0 {
        col -= 1;
        let rem = (col % 26) as u8;
        buf.push((b'A' + rem) as char);
        col /= 26;
    }
    buf.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_from_col() {
        assert_eq!(letters_from_col(1), "A");
        assert_eq!(letters_from_col(26), "Z");
        assert_eq!(letters_from_col(27), "AA");
        assert_eq!(letters_from_col(28), "AB");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(2.5, None), "2.5");
        assert_eq!(format_value(3.0, None), "3");
        assert_eq!(format_value(1.0 / 3.0, Some(2)), "0.33");
    }

    #[test]
    fn test_parse_value_rejects_text() {
        assert_eq!(parse_value(" 4.25 ").unwrap(), 4.25);
        assert!(matches!(parse_value("abc"), Err(TableError::Parse(_))));
        assert!(matches!(parse_count("-1", "column count"), Err(TableError::Parse(_))));
    }
}
