/*
Copyright 2021 Jakub Lewandowski

This file is part of Ocean Model Skill Assessment (OMSA).

Ocean Model Skill Assessment (OMSA) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Ocean Model Skill Assessment (OMSA) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Ocean Model Skill Assessment (OMSA). If not, see https://www.gnu.org/licenses/.
*/

//! Module containg methods for conducting
//! binary search (bisection) of elements closests
//! to searched values in coordinate arrays.

use crate::errors::SearchError;

/// Returns the first and last element, checking that
/// the value lies between them.
fn edges<'a, T: PartialOrd>(array: &'a [T], x: &T) -> Result<(&'a T, &'a T), SearchError> {
    let (first, last) = match (array.first(), array.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SearchError::EmptyArray),
    };

    if x < first && x < last || x > first && x > last {
        return Err(SearchError::OutOfBounds);
    }

    Ok((first, last))
}

/// Core bisection function, simply an implementation
/// of binary search algorithm adapted to searching values
/// in-between the set items.
///
/// Works for both ascending and descending arrays.
fn binary_search<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let (first, last) = edges(array, x)?;

    let mut lo = 0;
    let mut hi = array.len() - 1;

    // if the array is sorted descendingly we use a function with reversed signs
    if first < last {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] >= *x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    } else {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] <= *x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    }

    Ok(lo)
}

/// Convienience public method to find a closest value
/// to requested to the left of the searched item.
pub fn find_left_closest<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let found_index = binary_search(array, x)?;
    let ascending = array[0] < array[array.len() - 1];

    let on_left = if ascending {
        array[found_index] <= *x
    } else {
        array[found_index] >= *x
    };

    if on_left {
        Ok(found_index)
    } else {
        Ok(found_index - 1)
    }
}

/// Convienience public method to find a closest value
/// to requested to the right of the searched item.
pub fn find_right_closest<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    binary_search(array, x)
}

/// Finds index of the value nearest to the searched one.
/// Values outside the array are clamped to its edges.
pub fn find_nearest(array: &[f64], x: f64) -> Result<usize, SearchError> {
    let left = match find_left_closest(array, &x) {
        Ok(left) => left,
        Err(SearchError::OutOfBounds) => {
            let first_dist = (array[0] - x).abs();
            let last_dist = (array[array.len() - 1] - x).abs();

            return Ok(if first_dist <= last_dist {
                0
            } else {
                array.len() - 1
            });
        }
        Err(err) => return Err(err),
    };

    let right = (left + 1).min(array.len() - 1);

    if (array[right] - x).abs() < (array[left] - x).abs() {
        Ok(right)
    } else {
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::{find_left_closest, find_nearest, find_right_closest};
    use crate::errors::SearchError;

    #[test]
    fn ascending() {
        let array = [0.0, 1.0, 2.0, 3.0];

        assert_eq!(find_left_closest(&array, &1.5).unwrap(), 1);
        assert_eq!(find_right_closest(&array, &1.5).unwrap(), 2);
        assert_eq!(find_left_closest(&array, &2.0).unwrap(), 2);
        assert_eq!(find_right_closest(&array, &2.0).unwrap(), 2);
    }

    #[test]
    fn descending() {
        let array = [3.0, 2.0, 1.0, 0.0];

        assert_eq!(find_left_closest(&array, &1.5).unwrap(), 1);
        assert_eq!(find_right_closest(&array, &1.5).unwrap(), 2);
    }

    #[test]
    fn errors() {
        let empty: [f64; 0] = [];
        assert!(matches!(
            find_left_closest(&empty, &1.0),
            Err(SearchError::EmptyArray)
        ));
        assert!(matches!(
            find_left_closest(&[0.0, 1.0], &2.0),
            Err(SearchError::OutOfBounds)
        ));
    }

    #[test]
    fn nearest() {
        let array = [0.0, 1.0, 2.0, 3.0];

        assert_eq!(find_nearest(&array, 1.4).unwrap(), 1);
        assert_eq!(find_nearest(&array, 1.6).unwrap(), 2);
        assert_eq!(find_nearest(&array, -5.0).unwrap(), 0);
        assert_eq!(find_nearest(&array, 50.0).unwrap(), 3);
        assert_eq!(find_nearest(&[7.0], 50.0).unwrap(), 0);
    }
}
