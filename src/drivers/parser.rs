use crate::drivers::error::ParseFailure;

/// Number of raw values a device line must carry: three accelerometer axes
/// followed by three gyroscope axes.
pub const RAW_CHANNELS: usize = 6;

/// Parses one line of device output (`%f %f %f %f %f %f`, whitespace
/// separated) into its six raw channel values.
///
/// A blank or whitespace-only line is not an error; it parses to `None` and
/// the caller skips it. Anything else that is not exactly six numbers is a
/// [`ParseFailure`]. Stateless, no side effects.
pub fn parse_line(line: &str) -> Result<Option<[f64; RAW_CHANNELS]>, ParseFailure> {
    let mut values = [0.0; RAW_CHANNELS];
    let mut found = 0;
    for token in line.split_whitespace() {
        if found < RAW_CHANNELS {
            values[found] = token.parse().map_err(|_| ParseFailure::BadNumber {
                token: token.to_string(),
                line: line.to_string(),
            })?;
        }
        found += 1;
    }
    match found {
        0 => Ok(None),
        RAW_CHANNELS => Ok(Some(values)),
        _ => Err(ParseFailure::FieldCount {
            expected: RAW_CHANNELS,
            found,
            line: line.to_string(),
        }),
    }
}
