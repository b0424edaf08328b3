mod flate;

use crate::error::{PdfError, Result};
use crate::parser::hex_value;
use crate::types::{Dict, PdfObject};

pub use flate::flate_decode;

/// Decode stream data based on Filter(s) and DecodeParms in the stream dictionary
pub fn decode_stream(dict: &Dict, data: &[u8]) -> Result<Vec<u8>> {
    let filters = get_filters(dict)?;

    if filters.is_empty() {
        return Ok(data.to_vec());
    }

    let params = get_decode_params(dict, filters.len());
    let mut result = data.to_vec();

    for (filter, params) in filters.iter().zip(params) {
        result = apply_filter(filter, &result)?;
        if let Some(params) = params {
            result = apply_predictor(params, result)?;
        }
    }

    Ok(result)
}

/// Extract filter names from dictionary
fn get_filters(dict: &Dict) -> Result<Vec<String>> {
    match dict.get("Filter") {
        None | Some(PdfObject::Null) => Ok(vec![]),
        Some(PdfObject::Name(name)) => Ok(vec![name.clone()]),
        Some(PdfObject::Array(arr)) => arr
            .iter()
            .map(|obj| {
                obj.as_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| PdfError::InvalidStructure("Filter must be name".into()))
            })
            .collect(),
        _ => Err(PdfError::InvalidStructure("Invalid Filter type".into())),
    }
}

/// One optional parameter dictionary per filter
fn get_decode_params(dict: &Dict, count: usize) -> Vec<Option<&Dict>> {
    match dict.get("DecodeParms") {
        Some(PdfObject::Dict(d)) => {
            let mut params = vec![None; count];
            params[0] = Some(d);
            params
        }
        Some(PdfObject::Array(arr)) => (0..count)
            .map(|i| arr.get(i).and_then(PdfObject::as_dict))
            .collect(),
        _ => vec![None; count],
    }
}

/// Apply a single filter
fn apply_filter(filter: &str, data: &[u8]) -> Result<Vec<u8>> {
    match filter {
        "FlateDecode" | "Fl" => flate_decode(data),
        "ASCIIHexDecode" | "AHx" => ascii_hex_decode(data),
        other => Err(PdfError::UnsupportedFilter(other.to_string())),
    }
}

/// Undo a TIFF/PNG predictor described by a DecodeParms dictionary
fn apply_predictor(params: &Dict, data: Vec<u8>) -> Result<Vec<u8>> {
    let int_param = |key: &str, default: i64| {
        params
            .get(key)
            .and_then(PdfObject::as_int)
            .unwrap_or(default)
    };

    let predictor = int_param("Predictor", 1);
    if predictor == 1 {
        return Ok(data);
    }
    if predictor < 10 {
        return Err(PdfError::UnsupportedFilter(format!(
            "Predictor {}",
            predictor
        )));
    }

    let colors = int_param("Colors", 1).max(1) as usize;
    let bits = int_param("BitsPerComponent", 8).max(1) as usize;
    let columns = int_param("Columns", 1).max(1) as usize;

    let pixel_bits = colors
        .checked_mul(bits)
        .ok_or_else(|| PdfError::DecompressError("predictor /Colors too large".into()))?;
    let row_bits = pixel_bits
        .checked_mul(columns)
        .ok_or_else(|| PdfError::DecompressError("predictor /Columns too large".into()))?;
    let bytes_per_pixel = pixel_bits.div_ceil(8).max(1);
    // A row can never hold more than the whole stream
    let row_len = row_bits.div_ceil(8).min(data.len());

    png_unpredict(&data, row_len, bytes_per_pixel)
}

/// Reverse PNG row filters; every row is prefixed with its filter type byte
fn png_unpredict(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&filter, encoded) = chunk.split_first().ok_or_else(|| {
            PdfError::DecompressError("Empty predictor row".into())
        })?;

        let mut row = encoded.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };

            row[i] = match filter {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(PdfError::DecompressError(format!(
                        "Unknown PNG filter type {}",
                        other
                    )));
                }
            };
        }

        output.extend_from_slice(&row);
        prev = row;
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Decode ASCII hex encoded data
fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut chars = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .take_while(|&b| b != b'>');

    while let Some(h1) = chars.next() {
        let h2 = chars.next().unwrap_or(b'0');
        if !h1.is_ascii_hexdigit() || !h2.is_ascii_hexdigit() {
            return Err(PdfError::DecompressError(format!(
                "Invalid hex pair: {}{}",
                h1 as char, h2 as char
            )));
        }
        result.push((hex_value(h1) << 4) | hex_value(h2));
    }

    Ok(result)
}
