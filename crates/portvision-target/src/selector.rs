use portvision_core::{contour_area, Contour};

/// The contour picked as the target candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate<'a> {
    pub index: usize,
    pub contour: &'a Contour,
    pub area: f64,
}

/// Contour enclosing the largest area; ties go to the earliest contour.
///
/// Returns `None` for an empty list so the caller can drop the frame
/// before any corner or pose work.
pub fn select_largest(contours: &[Contour]) -> Option<Candidate<'_>> {
    let mut best: Option<Candidate<'_>> = None;
    for (index, contour) in contours.iter().enumerate() {
        let area = contour_area(&contour.points);
        if best.is_none_or(|b| area > b.area) {
            best = Some(Candidate {
                index,
                contour,
                area,
            });
        }
    }
    best
}
