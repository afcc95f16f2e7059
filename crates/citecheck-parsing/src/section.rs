use crate::ParseError;

const MARKERS: [&str; 2] = ["reference:", "references:"];

/// Return the citation lines that follow the references marker.
///
/// The marker is the first line containing `reference:` or `references:`
/// in any case. Every later line is returned except blank ones.
pub fn extract_reference_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<String>, ParseError> {
    let marker = lines
        .iter()
        .position(|line| {
            let lower = line.as_ref().to_lowercase();
            MARKERS.iter().any(|m| lower.contains(m))
        })
        .ok_or(ParseError::MissingMarker)?;

    let refs: Vec<String> = lines[marker + 1..]
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.trim().is_empty())
        .map(String::from)
        .collect();

    tracing::debug!(marker_line = marker, count = refs.len(), "references block located");
    Ok(refs)
}
