//! Pure reorder helpers
//!
//! Both helpers take a borrowed sequence and return a new one; the input is
//! never modified. Targets are clamped to the sequence bounds, the source
//! index is not: an out-of-range source is a caller bug and is reported.

use crate::error::ReorderError;

fn check_index(index: usize, len: usize) -> Result<(), ReorderError> {
    if index >= len {
        return Err(ReorderError::IndexOutOfRange { index, len });
    }
    Ok(())
}

/// Move the element at `index` by `delta` positions.
///
/// Returns the new sequence and the element's new index. When the clamped
/// target equals `index` the sequence is returned unchanged.
pub fn move_by_delta<T: Clone>(
    order: &[T],
    index: usize,
    delta: isize,
) -> Result<(Vec<T>, usize), ReorderError> {
    check_index(index, order.len())?;

    let last = order.len() - 1;
    let target = (index as isize).saturating_add(delta).clamp(0, last as isize) as usize;

    Ok((relocate(order, index, target), target))
}

/// Move the element at `from` to position `to` (clamped to the last index).
pub fn move_to_position<T: Clone>(
    order: &[T],
    from: usize,
    to: usize,
) -> Result<Vec<T>, ReorderError> {
    check_index(from, order.len())?;

    let target = to.min(order.len() - 1);
    Ok(relocate(order, from, target))
}

fn relocate<T: Clone>(order: &[T], from: usize, to: usize) -> Vec<T> {
    let mut copy = order.to_vec();
    if from != to {
        let element = copy.remove(from);
        copy.insert(to, element);
    }
    copy
}
