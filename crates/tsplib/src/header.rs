/// Splits a `KEY : VALUE` header line. `KEY = VALUE` is accepted too.
/// The key comes back upper-cased, both parts trimmed.
pub(crate) fn split_header(line: &str) -> Option<(String, &str)> {
    line.split_once(':')
        .or_else(|| line.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim()))
}

pub(crate) fn parse_dimension(line: usize, value: &str) -> crate::TsplibResult<usize> {
    let parsed = value.parse::<usize>().map_err(|e| {
        crate::TsplibError::syntax(line, format!("Bad DIMENSION value '{value}': {e}"))
    })?;
    if parsed == 0 {
        return Err(crate::TsplibError::syntax(line, "DIMENSION must be >= 1"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{parse_dimension, split_header};

    #[test]
    fn split_header_trims_and_uppercases_key() {
        assert_eq!(
            split_header(" name :  berlin52 "),
            Some(("NAME".to_string(), "berlin52"))
        );
        assert_eq!(split_header("DIMENSION=5"), Some(("DIMENSION".to_string(), "5")));
        assert_eq!(split_header("NODE_COORD_SECTION"), None);
    }

    #[test]
    fn parse_dimension_rejects_zero_and_garbage() {
        assert_eq!(parse_dimension(1, "52").expect("valid"), 52);
        assert!(parse_dimension(1, "0").is_err());
        assert!(parse_dimension(1, "-3").is_err());
        assert!(parse_dimension(1, "abc").is_err());
    }
}
