use crate::models::{ColorCandidate, ColorInfo, ColorPalette, ColorSource};

const SUPPORT_SLOTS: usize = 3;

/// Maps resolved candidates onto palette roles.
///
/// `candidates` is expected in resolution order (most trusted first). The
/// background comes from an explicitly background-tagged candidate when one
/// exists, otherwise from the first candidate. The rest fill primary,
/// secondary and the support slots in order, with background-tagged leftovers
/// queued last.
pub fn assign_roles(candidates: &[ColorCandidate]) -> ColorPalette {
    if candidates.is_empty() {
        return ColorPalette::default();
    }

    let background_idx = candidates
        .iter()
        .position(|c| c.source.is_background())
        .unwrap_or(0);
    let background = &candidates[background_idx];

    let (tagged_bg, brand): (Vec<_>, Vec<_>) = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != background_idx)
        .map(|(_, c)| c)
        .partition(|c| c.source.is_background());

    let ordered: Vec<&ColorCandidate> = brand.into_iter().chain(tagged_bg).collect();
    let mut rest = ordered.iter().copied();
    let mut next = || rest.next().map(info);

    let primary = next();
    let secondary = next();
    let mut support: Vec<Option<ColorInfo>> = (0..SUPPORT_SLOTS).map(|_| next()).collect();
    let support_3 = support.pop().flatten();
    let support_2 = support.pop().flatten();
    let support_1 = support.pop().flatten();

    // Fallback prefers the first support color, then the last brand color.
    let positive = ordered
        .iter()
        .copied()
        .find(|c| suggests_positive(c))
        .or_else(|| ordered.get(2).or(ordered.last()).copied())
        .map(info);

    tracing::debug!(
        background = %background.hex,
        candidates = candidates.len(),
        "Assigned palette roles"
    );

    ColorPalette {
        background: Some(info(background)),
        primary,
        secondary,
        support_1,
        support_2,
        support_3,
        positive,
    }
}

/// Green or blue hues and call-to-action sources read as "positive".
fn suggests_positive(c: &ColorCandidate) -> bool {
    c.approximate_name.contains("green")
        || c.approximate_name.contains("blue")
        || c.source == ColorSource::ComputedButton
}

fn info(c: &ColorCandidate) -> ColorInfo {
    ColorInfo {
        name: c.approximate_name.clone(),
        hex: c.hex.clone(),
    }
}
