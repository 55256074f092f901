use crate::shared::face_box::FaceBox;

use super::math::partition;

/// Merges overlapping candidate windows into face boxes.
///
/// Candidates within `eps` of each other (relative to their size) form a
/// group; each group becomes its averaged box. Groups with no more than
/// `min_neighbors` members are dropped, as are weaker groups sitting inside
/// a better-supported one. `min_neighbors == 0` returns the candidates
/// untouched. Output follows the order in which groups were first seen.
pub fn group_rectangles(candidates: &[FaceBox], min_neighbors: u32, eps: f64) -> Vec<FaceBox> {
    if min_neighbors == 0 || candidates.is_empty() {
        return candidates.to_vec();
    }

    let (labels, classes) = partition(candidates, |a, b| similar(a, b, eps));

    let mut sums = vec![[0i64; 4]; classes];
    let mut counts = vec![0u32; classes];
    for (rect, &label) in candidates.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<FaceBox> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let inv = 1.0 / n as f64;
            let avg = |v: i64| (v as f64 * inv).round() as i32;
            FaceBox::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    averaged
        .iter()
        .enumerate()
        .filter(|&(i, r1)| {
            let n1 = counts[i];
            if n1 <= min_neighbors {
                return false;
            }
            !averaged.iter().enumerate().any(|(j, r2)| {
                let n2 = counts[j];
                if j == i || n2 <= min_neighbors {
                    return false;
                }
                let dx = (r2.width as f64 * eps).round() as i32;
                let dy = (r2.height as f64 * eps).round() as i32;
                r1.is_inside(r2, dx, dy) && (n2 > n1.max(3) || n1 < 3)
            })
        })
        .map(|(_, r)| *r)
        .collect()
}

fn similar(a: &FaceBox, b: &FaceBox, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: i32, q: i32| ((p - q).abs() as f64) <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}
