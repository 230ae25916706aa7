//! Reader for the NumPy `.npy` vectors written by the training notebook.
//!
//! Only what the threshold artifact needs: a 1-D (or squeezable) array of
//! little-endian `f4` or `f8` in C order. Everything else is rejected as a
//! configuration error rather than guessed at.

use std::path::Path;

use crate::DecisionError;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Read a `.npy` file into a flat `f32` vector.
pub fn read_f32_vector(path: &Path) -> Result<Vec<f32>, DecisionError> {
    let bytes = std::fs::read(path).map_err(|source| DecisionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_f32_vector(&bytes)
}

/// Parse in-memory `.npy` bytes into a flat `f32` vector.
pub fn parse_f32_vector(bytes: &[u8]) -> Result<Vec<f32>, DecisionError> {
    if bytes.len() < 10 || !bytes.starts_with(MAGIC) {
        return Err(DecisionError::config("not a .npy file (bad magic)"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(DecisionError::config("truncated .npy header"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => return Err(DecisionError::config(format!("unsupported .npy version {v}"))),
    };

    let data_start = header_start + header_len;
    let header_bytes = bytes
        .get(header_start..data_start)
        .ok_or_else(|| DecisionError::config("truncated .npy header"))?;
    let header = std::str::from_utf8(header_bytes)
        .map_err(|_| DecisionError::config(".npy header is not valid text"))?;

    let descr = quoted_value(header, "descr")
        .ok_or_else(|| DecisionError::config(".npy header has no 'descr'"))?;
    let width = match descr {
        "<f4" => 4,
        "<f8" => 8,
        other => {
            return Err(DecisionError::config(format!(
                "unsupported .npy dtype {other:?}, expected '<f4' or '<f8'"
            )));
        }
    };

    if raw_value(header, "fortran_order").is_some_and(|v| v.starts_with("True")) {
        return Err(DecisionError::config("fortran-ordered .npy arrays are not supported"));
    }

    let shape = parse_shape(header)?;
    let non_unit = shape.iter().filter(|&&d| d != 1).count();
    if shape.is_empty() || non_unit > 1 {
        return Err(DecisionError::config(format!(
            "expected a 1-D .npy array, got shape {shape:?}"
        )));
    }
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| DecisionError::config(format!(".npy shape {shape:?} is too large")))?;
    let expected = count
        .checked_mul(width)
        .ok_or_else(|| DecisionError::config(format!(".npy shape {shape:?} is too large")))?;

    let data = &bytes[data_start..];
    if data.len() != expected {
        return Err(DecisionError::config(format!(
            ".npy payload is {} bytes, expected {expected} for {count} values",
            data.len()
        )));
    }

    let values = if width == 4 {
        data.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    } else {
        data.chunks_exact(8)
            .map(|c| {
                f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect()
    };
    Ok(values)
}

/// Text following `'key':` in the header dict, leading whitespace trimmed.
fn raw_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("'{key}':");
    let at = header.find(&needle)?;
    Some(header[at + needle.len()..].trim_start())
}

fn quoted_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let rest = raw_value(header, key)?;
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(&inner[..end])
}

fn parse_shape(header: &str) -> Result<Vec<usize>, DecisionError> {
    let rest = raw_value(header, "shape")
        .filter(|r| r.starts_with('('))
        .ok_or_else(|| DecisionError::config(".npy header has no 'shape'"))?;
    let end = rest
        .find(')')
        .ok_or_else(|| DecisionError::config("unterminated .npy shape"))?;

    rest[1..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| DecisionError::config(format!("bad .npy shape entry {s:?}")))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a v1.0 `.npy` file the way `numpy.save` does.
    pub(crate) fn npy_bytes(descr: &str, shape: &str, payload: &[u8]) -> Vec<u8> {
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
        // Pad so magic + version + len + header is a multiple of 64, ending in '\n'.
        let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
        let pad = (64 - unpadded % 64) % 64;
        header.push_str(&" ".repeat(pad));
        header.push('\n');

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    pub(crate) fn f4_npy(values: &[f32]) -> Vec<u8> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        npy_bytes("<f4", &format!("({},)", values.len()), &payload)
    }

    fn f8_npy(values: &[f64]) -> Vec<u8> {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        npy_bytes("<f8", &format!("({},)", values.len()), &payload)
    }

    #[test]
    fn parses_f4_vector() {
        let bytes = f4_npy(&[0.1, 0.25, 0.9]);
        let v = parse_f32_vector(&bytes).unwrap();
        assert_eq!(v, vec![0.1, 0.25, 0.9]);
    }

    #[test]
    fn parses_f8_vector() {
        let bytes = f8_npy(&[0.5, 0.125]);
        let v = parse_f32_vector(&bytes).unwrap();
        assert_eq!(v, vec![0.5, 0.125]);
    }

    #[test]
    fn header_is_64_byte_aligned() {
        let bytes = f4_npy(&[0.5; 14]);
        assert_eq!((bytes.len() - 14 * 4) % 64, 0);
    }

    #[test]
    fn accepts_row_vector_shape() {
        let payload: Vec<u8> = [0.2f32, 0.3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = npy_bytes("<f4", "(1, 2)", &payload);
        assert_eq!(parse_f32_vector(&bytes).unwrap(), vec![0.2, 0.3]);
    }

    #[test]
    fn rejects_matrix_shape() {
        let payload = vec![0u8; 4 * 4];
        let bytes = npy_bytes("<f4", "(2, 2)", &payload);
        let err = parse_f32_vector(&bytes).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("1-D"), "got: {err}");
    }

    #[test]
    fn rejects_integer_dtype() {
        let bytes = npy_bytes("<i8", "(1,)", &[0u8; 8]);
        let err = parse_f32_vector(&bytes).unwrap_err();
        assert!(err.to_string().contains("dtype"), "got: {err}");
    }

    #[test]
    fn rejects_big_endian() {
        let bytes = npy_bytes(">f4", "(1,)", &[0u8; 4]);
        assert!(parse_f32_vector(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = f4_npy(&[0.1, 0.2, 0.3]);
        bytes.truncate(bytes.len() - 2);
        let err = parse_f32_vector(&bytes).unwrap_err();
        assert!(err.to_string().contains("payload"), "got: {err}");
    }

    #[test]
    fn oversized_shape_is_config_error() {
        let bytes = npy_bytes("<f4", "(4611686018427387904,)", &[]);
        let err = parse_f32_vector(&bytes).unwrap_err();
        assert!(matches!(err, DecisionError::Config(_)), "got: {err:?}");
        assert!(err.to_string().contains("too large"), "got: {err}");
    }

    #[test]
    fn oversized_squeezable_shape_is_config_error() {
        let bytes = npy_bytes("<f8", "(1, 18446744073709551615)", &[]);
        assert!(parse_f32_vector(&bytes).unwrap_err().is_config());
    }

    #[test]
    fn rejects_non_npy() {
        assert!(parse_f32_vector(b"[0.5, 0.5]").is_err());
        assert!(parse_f32_vector(&[]).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_f32_vector(Path::new("/nonexistent/thresholds.npy")).unwrap_err();
        assert!(matches!(err, DecisionError::Io { .. }));
        assert!(err.is_config());
    }
}
