// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `--order` parsing: a comma-separated list of `file:page` pairs, both
// zero-based, e.g. `1:0,0:0,0:2`.

use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrder(pub Vec<(usize, usize)>);

impl FromStr for PageOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut seen = HashSet::new();
        let mut picks = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (file, page) = entry
                .split_once(':')
                .ok_or_else(|| format!("\"{entry}\" is not of the form file:page"))?;
            let file: usize = file
                .trim()
                .parse()
                .map_err(|_| format!("\"{entry}\": file index is not a number"))?;
            let page: usize = page
                .trim()
                .parse()
                .map_err(|_| format!("\"{entry}\": page index is not a number"))?;
            if !seen.insert((file, page)) {
                return Err(format!("page {file}:{page} is listed twice"));
            }
            picks.push((file, page));
        }
        if picks.is_empty() {
            return Err("the order lists no pages".into());
        }
        Ok(Self(picks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_in_order() {
        let order: PageOrder = "1:0, 0:0,0:2".parse().unwrap();
        assert_eq!(order.0, vec![(1, 0), (0, 0), (0, 2)]);
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!("1-0".parse::<PageOrder>().is_err());
        assert!("a:0".parse::<PageOrder>().is_err());
        assert!("0:x".parse::<PageOrder>().is_err());
        assert!(",,".parse::<PageOrder>().is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let err = "0:1,0:1".parse::<PageOrder>().unwrap_err();
        assert!(err.contains("twice"));
    }
}
