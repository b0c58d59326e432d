/// Decode an encoded polyline (precision 5) into `[longitude, latitude]`
/// pairs. A truncated string decodes up to its last complete pair.
pub fn decode_polyline(encoded: &str) -> Vec<[f64; 2]> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let Some((dlat, next)) = decode_value(bytes, index) else {
            break;
        };
        let Some((dlng, next)) = decode_value(bytes, next) else {
            break;
        };
        index = next;
        lat += dlat;
        lng += dlng;
        points.push([lng as f64 / 1e5, lat as f64 / 1e5]);
    }

    points
}

// Returns the zigzag-decoded value and the index after it, or None when the
// input ends mid-value.
fn decode_value(bytes: &[u8], mut index: usize) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(index)? as i64 - 63;
        index += 1;
        if byte < 0 || shift > 60 {
            return None;
        }
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }

    let value = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Some((value, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: [f64; 2], expected: [f64; 2]) {
        assert!(
            (actual[0] - expected[0]).abs() < 1e-9 && (actual[1] - expected[1]).abs() < 1e-9,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn decodes_reference_polyline() {
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@");
        assert_eq!(points.len(), 3);
        assert_close(points[0], [-120.2, 38.5]);
        assert_close(points[1], [-120.95, 40.7]);
        assert_close(points[2], [-126.453, 43.252]);
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        assert!(decode_polyline("").is_empty());
    }

    #[test]
    fn truncated_input_keeps_complete_pairs() {
        // Full first pair, then half of the second
        let points = decode_polyline("_p~iF~ps|U_ulL");
        assert_eq!(points.len(), 1);
        assert_close(points[0], [-120.2, 38.5]);
    }
}
