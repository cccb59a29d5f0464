//! Euclidean rhythm slots via Bjorklund's pairing algorithm.

/// Distribute `pulses` onsets as evenly as possible over `steps` slots,
/// rotated left by `rotation`. `true` marks an onset.
pub fn bjorklund(pulses: usize, steps: usize, rotation: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    if pulses == 0 {
        return vec![false; steps];
    }
    if pulses >= steps {
        return vec![true; steps];
    }

    let mut groups: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut remainder: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];

    // Fold the remainder into the groups until at most one is left over.
    while remainder.len() > 1 {
        let pairs = groups.len().min(remainder.len());
        let mut merged = Vec::with_capacity(pairs);
        for i in 0..pairs {
            let mut g = groups[i].clone();
            g.extend_from_slice(&remainder[i]);
            merged.push(g);
        }
        let leftover = if groups.len() > pairs {
            groups[pairs..].to_vec()
        } else {
            remainder[pairs..].to_vec()
        };
        groups = merged;
        remainder = leftover;
    }

    let mut result: Vec<bool> = groups
        .into_iter()
        .chain(remainder)
        .flatten()
        .collect();
    if rotation > 0 && !result.is_empty() {
        let r = rotation % result.len();
        result.rotate_left(r);
    }
    result
}
