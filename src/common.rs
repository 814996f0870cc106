/* Copyright (C) 2022 Antmicro
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

/* Splits a range into `slices` possibly even ranges  */
pub fn split_range_nicely(range: std::ops::Range<usize>, slices: usize)
    -> impl Iterator<Item = std::ops::Range<usize>>
{
    let start = range.start;
    let len = range.end.saturating_sub(range.start);
    let slices = slices.max(1);
    let split_sz = len / slices;
    let left = len - split_sz * slices;

    (0 .. slices)
        .scan((start, left), move |(current_idx, left), _| {
            let my_len = if *left > 0 {
                *left -= 1;
                split_sz + 1
            } else {
                split_sz
            };
            let range = *current_idx .. (*current_idx + my_len);
            *current_idx += my_len;
            Some(range)
        })
        .filter(|range| range.start != range.end)
}

/// Renders a sequence as a comma-separated list, the textual form used for
/// multi-valued ptc numbers.
pub fn join_comma<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let mut out = String::new();
    for (idx, item) in items.into_iter().enumerate() {
        if idx != 0 {
            out.push(',');
        }
        out.push_str(&item.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_range_covers_everything() {
        let ranges: Vec<_> = split_range_nicely(3 .. 13, 3).collect();
        assert_eq!(ranges, vec![3 .. 7, 7 .. 10, 10 .. 13]);

        let ranges: Vec<_> = split_range_nicely(0 .. 2, 4).collect();
        assert_eq!(ranges, vec![0 .. 1, 1 .. 2]);
    }

    #[test]
    fn test_join_comma() {
        assert_eq!(join_comma([1, 2, 3]), "1,2,3");
        assert_eq!(join_comma(Vec::<i16>::new()), "");
    }
}
